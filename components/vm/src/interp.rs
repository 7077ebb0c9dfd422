//! The engine instance: state, initialization, allocation, GC
//! orchestration, and the exception machinery.

use crate::frames::{BcodeFrame, Frame};
use core_types::{prop_attr, ErrorKind, JsError, ObjId, Value};
use gc_heap::{Heap, HeapOptions, PropData};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Marker for "a JavaScript exception is pending". The thrown value lives
/// in the engine (`vals.thrown_error`) until consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throw;

/// Result alias for engine operations that can raise.
pub type VmResult<T> = Result<T, Throw>;

/// Error codes surfaced by the fallible host entry points. A non-`Syntax`
/// execution failure leaves the exception payload readable through
/// [`Interp::get_thrown_value`].
#[derive(Debug)]
pub enum ExecError {
    /// Compile-time failure.
    Syntax(JsError),
    /// Script threw and nothing caught it.
    Exception,
    /// The program nests beyond the parser's bound.
    AstTooLarge,
    /// Resource exhaustion or an engine invariant breach.
    Internal(String),
}

impl std::fmt::Display for ExecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecError::Syntax(e) => write!(f, "{}", e),
            ExecError::Exception => write!(f, "uncaught exception"),
            ExecError::AstTooLarge => write!(f, "program too large"),
            ExecError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for ExecError {}

/// A native callable. Arguments are read back through
/// [`Interp::arg`]/[`Interp::argc`], the receiver through
/// [`Interp::this_val`].
pub type NativeFn = fn(&mut Interp) -> VmResult<Value>;

/// Engine construction options.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Arena and string-buffer sizing.
    pub heap: HeapOptions,
    /// Soft cap on the value stack, guarding host memory.
    pub max_stack: usize,
    /// Cap on call-frame depth; exceeding it raises `InternalError`
    /// instead of overflowing the native stack.
    pub max_frames: usize,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            heap: HeapOptions::default(),
            max_stack: 64 * 1024,
            max_frames: 1000,
        }
    }
}

/// Clonable, thread-safe handle that interrupts a running script.
#[derive(Debug, Clone)]
pub struct InterruptHandle(Arc<AtomicBool>);

impl InterruptHandle {
    /// Requests an `InterruptedError` at the next poll point.
    pub fn interrupt(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Every root value the engine holds outside the heap, grouped so the
/// collector glue can enumerate and rewrite them in one place.
#[derive(Debug)]
pub(crate) struct Vals {
    pub global: Value,
    pub object_prototype: Value,
    pub array_prototype: Value,
    pub boolean_prototype: Value,
    pub string_prototype: Value,
    pub number_prototype: Value,
    pub function_prototype: Value,
    pub regexp_prototype: Value,
    pub error_prototype: Value,
    /// Per-kind error prototypes, indexed by `error_kind_slot`.
    pub error_prototypes: [Value; ERROR_KIND_COUNT],
    /// Arguments of the call in flight.
    pub arguments: Value,
    /// Register for `STASH`/`UNSTASH`.
    pub stash: Value,
    /// Pending exception; meaningful while `flags.is_thrown`.
    pub thrown_error: Value,
    /// Pending return value; meaningful while `flags.is_returned`.
    pub returned_value: Value,
    /// Most recent property/variable name, for error messages.
    pub last_name: Value,
    /// Exception pre-built by `CHECK_CALL` for `CALL`/`NEW` to raise.
    pub call_check_ex: Value,
}

pub(crate) const ERROR_KIND_COUNT: usize = 8;

pub(crate) fn error_kind_slot(kind: ErrorKind) -> usize {
    match kind {
        ErrorKind::Error => 0,
        ErrorKind::SyntaxError => 1,
        ErrorKind::TypeError => 2,
        ErrorKind::ReferenceError => 3,
        ErrorKind::RangeError => 4,
        ErrorKind::EvalError => 5,
        ErrorKind::InternalError => 6,
        ErrorKind::InterruptedError => 7,
    }
}

#[derive(Debug, Default)]
pub(crate) struct Flags {
    pub is_thrown: bool,
    pub is_returned: bool,
    pub is_breaking: bool,
    pub is_continuing: bool,
    pub is_stashed: bool,
    pub inhibit_gc: bool,
    pub gc_enabled: bool,
    pub creating_exception: bool,
}

/// One engine instance. Single threaded; never touch one from two host
/// threads concurrently.
pub struct Interp {
    pub(crate) heap: Heap,
    pub(crate) stack: Vec<Value>,
    pub(crate) frames: Vec<Frame>,
    /// Execution of the current entry never unwinds below this frame.
    pub(crate) bottom_frame: usize,
    pub(crate) vals: Vals,
    pub(crate) cfuncs: Vec<NativeFn>,
    /// Host-owned root slots; see `own`/`disown`.
    pub(crate) owned: Vec<Option<Value>>,
    /// Engine-internal temporary roots, live across allocations.
    pub(crate) tmp_roots: Vec<Value>,
    /// Cycle-detection stack for the JSON/debug dumper.
    pub(crate) json_visited: Vec<Value>,
    pub(crate) flags: Flags,
    pub(crate) opts: Options,
    interrupted: Arc<AtomicBool>,
}

impl Default for Interp {
    fn default() -> Self {
        Interp::new()
    }
}

impl Interp {
    /// Creates an engine with default arena sizes.
    pub fn new() -> Interp {
        Interp::with_options(Options::default())
    }

    /// Creates an engine with explicit sizing.
    pub fn with_options(mut opts: Options) -> Interp {
        // Initialization needs a handful of cells; clamp pathological
        // arena configurations.
        opts.heap.object_arena_size = opts.heap.object_arena_size.max(64);
        opts.heap.function_arena_size = opts.heap.function_arena_size.max(16);
        opts.heap.property_arena_size = opts.heap.property_arena_size.max(256);

        let mut heap = Heap::new(opts.heap);
        let raw = |heap: &mut Heap, proto: Value| {
            Value::Object(heap.new_object(proto).expect("fresh arena"))
        };

        let object_prototype = raw(&mut heap, Value::Null);
        let array_prototype = raw(&mut heap, object_prototype);
        let boolean_prototype = raw(&mut heap, object_prototype);
        let string_prototype = raw(&mut heap, object_prototype);
        let number_prototype = raw(&mut heap, object_prototype);
        let function_prototype = raw(&mut heap, object_prototype);
        let regexp_prototype = raw(&mut heap, object_prototype);
        let error_prototype = raw(&mut heap, object_prototype);
        let mut error_prototypes =
            std::array::from_fn(|_| raw(&mut heap, error_prototype));
        // Plain `Error` shares the base prototype, so every error kind
        // sits one step below it and `instanceof Error` holds for all.
        error_prototypes[error_kind_slot(ErrorKind::Error)] = error_prototype;
        let global = raw(&mut heap, object_prototype);

        let mut interp = Interp {
            heap,
            stack: Vec::with_capacity(256),
            frames: Vec::with_capacity(32),
            bottom_frame: 0,
            vals: Vals {
                global,
                object_prototype,
                array_prototype,
                boolean_prototype,
                string_prototype,
                number_prototype,
                function_prototype,
                regexp_prototype,
                error_prototype,
                error_prototypes,
                arguments: Value::Undefined,
                stash: Value::Undefined,
                thrown_error: Value::Undefined,
                returned_value: Value::Undefined,
                last_name: Value::Undefined,
                call_check_ex: Value::Undefined,
            },
            cfuncs: Vec::new(),
            owned: Vec::new(),
            tmp_roots: Vec::new(),
            json_visited: Vec::new(),
            flags: Flags {
                gc_enabled: true,
                ..Flags::default()
            },
            opts,
            interrupted: Arc::new(AtomicBool::new(false)),
        };
        interp.init_primordials();
        interp
    }

    /// Names every error prototype and seeds the primordial globals the
    /// compiler relies on.
    fn init_primordials(&mut self) {
        let kinds = [
            ErrorKind::Error,
            ErrorKind::SyntaxError,
            ErrorKind::TypeError,
            ErrorKind::ReferenceError,
            ErrorKind::RangeError,
            ErrorKind::EvalError,
            ErrorKind::InternalError,
            ErrorKind::InterruptedError,
        ];
        for kind in kinds {
            let proto = self.vals.error_prototypes[error_kind_slot(kind)];
            let name = self.heap.mk_string(kind.name());
            self.define_raw(proto, "name", PropData::Value(name), prop_attr::NON_ENUMERABLE);
        }
        let base_name = self.heap.mk_string("Error");
        let error_proto = self.vals.error_prototype;
        self.define_raw(
            error_proto,
            "name",
            PropData::Value(base_name),
            prop_attr::NON_ENUMERABLE,
        );

        let global = self.vals.global;
        let frozen = prop_attr::NON_ENUMERABLE | prop_attr::NON_WRITABLE | prop_attr::NON_CONFIGURABLE;
        self.define_raw(global, "undefined", PropData::Value(Value::Undefined), frozen);
        self.define_raw(global, "NaN", PropData::Value(Value::nan()), frozen);
        self.define_raw(
            global,
            "Infinity",
            PropData::Value(Value::Number(f64::INFINITY)),
            frozen,
        );
    }

    /// Defines a property directly, bypassing descriptor checks. Only for
    /// engine initialization and trusted internal slots.
    pub(crate) fn define_raw(
        &mut self,
        obj: Value,
        name: &str,
        data: PropData,
        attrs: u8,
    ) {
        let name_v = self.heap.mk_string(name);
        if let Some(existing) = self.heap.find_own_prop(obj, name.as_bytes()) {
            let p = self.heap.prop_mut(existing);
            p.data = data;
            p.attrs = attrs;
            return;
        }
        let prop = self
            .heap
            .new_prop(name_v, data, attrs)
            .expect("property arena exhausted during initialization");
        self.heap.append_prop(obj, prop);
    }

    /* Stack {{{ */

    pub(crate) fn push(&mut self, v: Value) -> VmResult<()> {
        if self.stack.len() >= self.opts.max_stack {
            return Err(self.throwf(ErrorKind::InternalError, "value stack overflow"));
        }
        self.stack.push(v);
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Value {
        self.stack.pop().expect("value stack underflow")
    }

    pub(crate) fn tos(&self) -> Value {
        *self.stack.last().expect("value stack underflow")
    }

    /* }}} */

    /* Allocation with collection retry {{{ */

    pub(crate) fn alloc_object(&mut self, proto: Value) -> VmResult<ObjId> {
        if let Some(id) = self.heap.new_object(proto) {
            return Ok(id);
        }
        self.run_gc();
        self.heap
            .new_object(proto)
            .ok_or_else(|| self.throwf(ErrorKind::InternalError, "object arena exhausted"))
    }

    pub(crate) fn alloc_array(&mut self) -> VmResult<ObjId> {
        let proto = self.vals.array_prototype;
        if let Some(id) = self.heap.new_dense_array(proto) {
            return Ok(id);
        }
        self.run_gc();
        self.heap
            .new_dense_array(proto)
            .ok_or_else(|| self.throwf(ErrorKind::InternalError, "object arena exhausted"))
    }

    pub(crate) fn alloc_function(&mut self, bcode: Rc<bytecode::Bcode>) -> VmResult<Value> {
        if let Some(id) = self.heap.new_function(bcode.clone()) {
            return Ok(Value::Function(id));
        }
        self.run_gc();
        self.heap
            .new_function(bcode)
            .map(Value::Function)
            .ok_or_else(|| self.throwf(ErrorKind::InternalError, "function arena exhausted"))
    }

    /// Appends a fresh property cell, with a collection retry. On the
    /// retry path every involved value is rooted and re-read, since the
    /// collection may relocate owned strings.
    pub(crate) fn alloc_prop(
        &mut self,
        container: Value,
        name: Value,
        data: PropData,
        attrs: u8,
    ) -> VmResult<()> {
        if let Some(cell) = self.heap.new_prop(name, data, attrs) {
            self.heap.append_prop(container, cell);
            return Ok(());
        }
        self.tmp_roots.push(container);
        self.tmp_roots.push(name);
        let (a, b) = match data {
            PropData::Value(v) => (v, Value::Undefined),
            PropData::Accessor { getter, setter } => (getter, setter),
        };
        self.tmp_roots.push(a);
        self.tmp_roots.push(b);
        self.run_gc();
        let b = self.tmp_roots.pop().expect("tmp root imbalance");
        let a = self.tmp_roots.pop().expect("tmp root imbalance");
        let name = self.tmp_roots.pop().expect("tmp root imbalance");
        let container = self.tmp_roots.pop().expect("tmp root imbalance");
        let data = match data {
            PropData::Value(_) => PropData::Value(a),
            PropData::Accessor { .. } => PropData::Accessor { getter: a, setter: b },
        };
        match self.heap.new_prop(name, data, attrs) {
            Some(cell) => {
                self.heap.append_prop(container, cell);
                Ok(())
            }
            None => Err(self.throwf(ErrorKind::InternalError, "property arena exhausted")),
        }
    }

    /* }}} */

    /* Garbage collection {{{ */

    /// Collects now, regardless of the lazy flag.
    pub fn run_gc(&mut self) {
        if self.flags.inhibit_gc || !self.flags.gc_enabled {
            return;
        }
        let roots = self.gather_roots();
        let remap = self.heap.collect(&roots);
        if !remap.is_empty() {
            remap.fix_all(&mut self.stack);
            remap.fix_all(&mut self.tmp_roots);
            remap.fix_all(&mut self.json_visited);
            for slot in self.owned.iter_mut().flatten() {
                remap.fix(slot);
            }
            let v = &mut self.vals;
            for slot in [
                &mut v.global,
                &mut v.object_prototype,
                &mut v.array_prototype,
                &mut v.boolean_prototype,
                &mut v.string_prototype,
                &mut v.number_prototype,
                &mut v.function_prototype,
                &mut v.regexp_prototype,
                &mut v.error_prototype,
                &mut v.arguments,
                &mut v.stash,
                &mut v.thrown_error,
                &mut v.returned_value,
                &mut v.last_name,
                &mut v.call_check_ex,
            ] {
                remap.fix(slot);
            }
            remap.fix_all(&mut v.error_prototypes);
            for frame in &mut self.frames {
                match frame {
                    Frame::Bcode(f) => {
                        remap.fix(&mut f.try_stack);
                        remap.fix(&mut f.this_obj);
                    }
                    Frame::Catch(f) => remap.fix(&mut f.try_stack),
                    Frame::Cfunc(f) => remap.fix(&mut f.this_obj),
                }
            }
        }
    }

    /// Collects when the heap asked for it, at an opcode boundary.
    pub(crate) fn maybe_gc(&mut self) {
        if self.heap.need_gc() && self.flags.gc_enabled && !self.flags.inhibit_gc {
            self.run_gc();
        }
    }

    fn gather_roots(&self) -> Vec<Value> {
        let v = &self.vals;
        let mut roots = Vec::with_capacity(
            self.stack.len() + self.frames.len() * 3 + self.owned.len() + 32,
        );
        roots.extend_from_slice(&self.stack);
        roots.extend_from_slice(&self.tmp_roots);
        roots.extend_from_slice(&self.json_visited);
        roots.extend(self.owned.iter().flatten().copied());
        roots.extend_from_slice(&[
            v.global,
            v.object_prototype,
            v.array_prototype,
            v.boolean_prototype,
            v.string_prototype,
            v.number_prototype,
            v.function_prototype,
            v.regexp_prototype,
            v.error_prototype,
            v.arguments,
            v.stash,
            v.thrown_error,
            v.returned_value,
            v.last_name,
            v.call_check_ex,
        ]);
        roots.extend_from_slice(&v.error_prototypes);
        for frame in &self.frames {
            if let Some(scope) = frame.scope() {
                roots.push(Value::Object(scope));
            }
            match frame {
                Frame::Bcode(f) => {
                    roots.push(f.try_stack);
                    roots.push(f.this_obj);
                }
                Frame::Catch(f) => roots.push(f.try_stack),
                Frame::Cfunc(f) => roots.push(f.this_obj),
            }
        }
        roots
    }

    /* }}} */

    /* Frames and scopes {{{ */

    /// The scope of the innermost frame contributing one, or the global
    /// object outside of any call.
    pub(crate) fn scope(&self) -> ObjId {
        for frame in self.frames.iter().rev() {
            if let Some(scope) = frame.scope() {
                return scope;
            }
        }
        self.vals
            .global
            .as_object()
            .expect("global object missing")
    }

    /// Index of the innermost bcode frame.
    pub(crate) fn cur_bcode_frame(&self) -> Option<usize> {
        self.frames
            .iter()
            .rposition(|f| matches!(f, Frame::Bcode(_)))
    }

    /// Strictness of the code currently executing.
    pub(crate) fn is_strict_mode(&self) -> bool {
        match self.cur_bcode_frame() {
            Some(idx) => match &self.frames[idx] {
                Frame::Bcode(f) => f.bcode.strict,
                _ => false,
            },
            None => false,
        }
    }

    pub(crate) fn push_frame(&mut self, frame: Frame) -> VmResult<()> {
        if self.frames.len() >= self.opts.max_frames {
            return Err(self.throwf(ErrorKind::InternalError, "call stack exhausted"));
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Makes a bcode frame for `bcode` with the given scope and receiver.
    pub(crate) fn mk_bcode_frame(
        &self,
        bcode: Rc<bytecode::Bcode>,
        scope: ObjId,
        this_obj: Value,
        is_constructor: bool,
    ) -> BcodeFrame {
        BcodeFrame {
            scope,
            try_stack: Value::Undefined,
            this_obj,
            bcode,
            ip: 0,
            stack_len: self.stack.len(),
            is_constructor,
            line_no: 1,
        }
    }

    /* }}} */

    /* Exceptions {{{ */

    /// Builds an exception object of the given kind. Falls back to a bare
    /// string when exception construction itself fails or recurses.
    pub(crate) fn create_exception(&mut self, kind: ErrorKind, msg: &str) -> Value {
        if self.flags.creating_exception {
            return self.heap.mk_string(msg);
        }
        self.flags.creating_exception = true;
        let proto = self.vals.error_prototypes[error_kind_slot(kind)];
        let obj = match self.alloc_object(proto) {
            Ok(obj) => {
                let v = Value::Object(obj);
                self.tmp_roots.push(v);
                let msg_v = self.heap.mk_string(msg);
                let v = self.tmp_roots.pop().expect("tmp root imbalance");
                self.define_raw(v, "message", PropData::Value(msg_v), 0);
                v
            }
            Err(_) => self.heap.mk_string(msg),
        };
        self.flags.creating_exception = false;
        obj
    }

    /// Throws a freshly built exception of `kind`.
    pub fn throwf(&mut self, kind: ErrorKind, msg: &str) -> Throw {
        let ex = self.create_exception(kind, msg);
        self.throw_value(ex)
    }

    /// Throws an arbitrary value.
    pub fn throw_value(&mut self, v: Value) -> Throw {
        self.vals.thrown_error = v;
        self.flags.is_thrown = true;
        Throw
    }

    /// The pending exception, if one is set.
    pub fn get_thrown_value(&self) -> Option<Value> {
        if self.flags.is_thrown {
            Some(self.vals.thrown_error)
        } else {
            None
        }
    }

    /// Drops the pending exception.
    pub fn clear_thrown_value(&mut self) {
        self.flags.is_thrown = false;
        self.vals.thrown_error = Value::Undefined;
    }

    /// Re-raises the pending exception, a no-op marker when none is set.
    pub fn rethrow(&mut self) -> Throw {
        Throw
    }

    /// Takes the pending exception, clearing it.
    pub(crate) fn take_thrown(&mut self) -> Value {
        let v = self.vals.thrown_error;
        self.clear_thrown_value();
        v
    }

    /* }}} */

    /* Interrupt {{{ */

    /// Returns a handle other threads or signal handlers may use to stop
    /// the running script.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle(self.interrupted.clone())
    }

    /// Requests interruption from the owning thread.
    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    /// Edge-triggered poll; clears the flag when observed.
    pub(crate) fn interrupt_pending(&self) -> bool {
        self.interrupted.swap(false, Ordering::SeqCst)
    }

    /* }}} */

    /// Enables or inhibits the collector. With collection disabled the
    /// heap grows until the arenas run dry.
    pub fn set_gc_enabled(&mut self, enabled: bool) {
        self.flags.gc_enabled = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_creation() {
        let interp = Interp::new();
        assert!(interp.vals.global.is_generic_object());
        assert!(interp.vals.object_prototype.is_generic_object());
    }

    #[test]
    fn test_primordial_globals() {
        let interp = Interp::new();
        let global = interp.vals.global;
        assert!(interp.heap.find_own_prop(global, b"undefined").is_some());
        assert!(interp.heap.find_own_prop(global, b"NaN").is_some());
        assert!(interp.heap.find_own_prop(global, b"Infinity").is_some());
    }

    #[test]
    fn test_throw_and_clear() {
        let mut interp = Interp::new();
        assert!(interp.get_thrown_value().is_none());
        let _ = interp.throwf(ErrorKind::TypeError, "nope");
        let thrown = interp.get_thrown_value().expect("exception pending");
        assert!(thrown.is_generic_object());
        interp.clear_thrown_value();
        assert!(interp.get_thrown_value().is_none());
    }

    #[test]
    fn test_gc_preserves_engine_state() {
        let mut interp = Interp::new();
        let s = interp.heap.mk_string("a string long enough to be owned");
        interp.tmp_roots.push(s);
        interp.run_gc();
        let s = interp.tmp_roots.pop().unwrap();
        assert_eq!(
            interp.heap.str_text(&s),
            Some("a string long enough to be owned")
        );
        // Prototypes survive.
        assert!(interp.vals.error_prototype.is_generic_object());
    }

    #[test]
    fn test_interrupt_is_edge_triggered() {
        let interp = Interp::new();
        let handle = interp.interrupt_handle();
        handle.interrupt();
        assert!(interp.interrupt_pending());
        assert!(!interp.interrupt_pending());
    }
}
