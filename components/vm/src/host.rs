//! The host binding surface: execution entry points, value construction
//! and inspection, the object and array surfaces, rooting, and native
//! callable registration. Everything the standard library binds through
//! lives here, on the same interface user-facing embedders get.

use crate::frames::Frame;
use crate::interp::{ExecError, Interp, NativeFn, Throw, VmResult};
use crate::object_ops::{parse_index, CFUNC_SLOT};
use core_types::{prop_attr, AttrDesc, CFuncId, ErrorKind, JsError, Value};
use gc_heap::{PropData, RegexpData};
use std::io::Write;
use std::rc::Rc;

/// Handle of a host-owned root slot; see [`Interp::own`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Root(u32);

/// Options for [`Interp::exec_opt`].
#[derive(Debug, Default)]
pub struct ExecOpts<'a> {
    /// Name reported in diagnostics.
    pub filename: Option<&'a str>,
    /// Receiver for the top-level code; the global object when absent.
    pub this: Option<Value>,
    /// Treat the source as strict JSON instead of a script.
    pub is_json: bool,
}

fn translate_compile_error(e: JsError) -> ExecError {
    if e.message.contains("nests too deeply") {
        ExecError::AstTooLarge
    } else {
        ExecError::Syntax(e)
    }
}

impl Interp {
    /* Execution {{{ */

    /// Compiles and runs a script against the global object, returning
    /// the value of its last statement.
    pub fn exec(&mut self, source: &str) -> Result<Value, ExecError> {
        self.exec_opt(source, ExecOpts::default())
    }

    /// Compiles and runs a script with explicit options.
    pub fn exec_opt(&mut self, source: &str, opts: ExecOpts<'_>) -> Result<Value, ExecError> {
        if opts.is_json {
            return self.parse_json(source);
        }
        let bcode = parser::compile_source(source).map_err(translate_compile_error)?;
        self.exec_bcode(bcode, opts.this)
    }

    /// Reads and runs a script file.
    pub fn exec_file(&mut self, path: &str) -> Result<Value, ExecError> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| ExecError::Internal(format!("cannot read {}: {}", path, e)))?;
        self.exec(&source)
    }

    /// Runs an already-compiled script body.
    pub fn exec_bcode(
        &mut self,
        bcode: Rc<bytecode::Bcode>,
        this: Option<Value>,
    ) -> Result<Value, ExecError> {
        // Hoisted script names become global properties before the first
        // statement runs.
        let global = self.vals.global;
        for name in bcode.var_names().to_vec() {
            if self.heap.find_own_prop(global, name.as_bytes()).is_none() {
                self.define_raw(global, &name, PropData::Value(Value::Undefined), 0);
            }
        }

        let bottom = self.frames.len();
        let scope = global.as_object().expect("global object missing");
        let this_v = this.unwrap_or(global);
        let frame = self.mk_bcode_frame(bcode, scope, this_v, false);
        if self.push_frame(Frame::Bcode(frame)).is_err() {
            return Err(ExecError::Exception);
        }
        match self.eval_until(bottom) {
            Ok(()) => Ok(self.pop()),
            Err(Throw) => Err(ExecError::Exception),
        }
    }

    /// Calls a callable value with a receiver and arguments.
    pub fn apply(
        &mut self,
        func: Value,
        this: Value,
        args: &[Value],
    ) -> Result<Value, ExecError> {
        self.apply_internal(func, this, args)
            .map_err(|Throw| ExecError::Exception)
    }

    /// Calls a callable value with arguments taken from a dense array.
    pub fn apply_array(
        &mut self,
        func: Value,
        this: Value,
        args_array: Value,
    ) -> Result<Value, ExecError> {
        let args = match args_array {
            Value::Object(id) if self.heap.is_dense_array(args_array) => {
                let len = self.heap.array_len(id);
                (0..len)
                    .map(|i| {
                        let v = self.heap.array_get(id, i);
                        if v.is_novalue() {
                            Value::Undefined
                        } else {
                            v
                        }
                    })
                    .collect()
            }
            Value::Undefined | Value::Null => Vec::new(),
            other => vec![other],
        };
        self.apply(func, this, &args)
    }

    /// Compiles a script and writes either a binary bcode image or a
    /// disassembly listing to the sink.
    pub fn compile(
        &mut self,
        source: &str,
        binary: bool,
        sink: &mut dyn Write,
    ) -> Result<(), ExecError> {
        let bcode = parser::compile_source(source).map_err(translate_compile_error)?;
        let payload = if binary {
            bytecode::serialize(&bcode)
        } else {
            bytecode::disassemble(&bcode).into_bytes()
        };
        sink.write_all(&payload)
            .map_err(|e| ExecError::Internal(format!("sink write failed: {}", e)))
    }

    /* }}} */

    /* Value construction {{{ */

    pub fn mk_number(&self, n: f64) -> Value {
        Value::Number(n)
    }

    pub fn mk_boolean(&self, b: bool) -> Value {
        Value::Bool(b)
    }

    /// Makes a string value, copying the bytes into engine storage.
    pub fn mk_string(&mut self, s: &str) -> Value {
        self.heap.mk_string(s)
    }

    /// Makes a string value over caller-owned bytes; nothing is copied
    /// and the collector never moves it.
    pub fn mk_string_foreign(&mut self, s: &'static str) -> Value {
        self.heap.mk_string_foreign(s)
    }

    /// Wraps an opaque host pointer.
    pub fn mk_foreign(&self, p: usize) -> Value {
        Value::Foreign(p)
    }

    /// Makes a plain object inheriting from `Object.prototype`.
    pub fn mk_object(&mut self) -> VmResult<Value> {
        Ok(Value::Object(self.alloc_object(self.vals.object_prototype)?))
    }

    /// Makes an object with an explicit prototype.
    pub fn mk_object_with_proto(&mut self, proto: Value) -> VmResult<Value> {
        Ok(Value::Object(self.alloc_object(proto)?))
    }

    /// Makes an empty dense array.
    pub fn mk_array(&mut self) -> VmResult<Value> {
        Ok(Value::Object(self.alloc_array()?))
    }

    /// Registers a native callable as a bare cfunction value.
    pub fn mk_cfunction(&mut self, f: NativeFn) -> Value {
        self.cfuncs.push(f);
        Value::CFunc(CFuncId(self.cfuncs.len() as u32 - 1))
    }

    /// Registers a native callable wrapped in an object, so it can carry
    /// a `prototype` property and participate in `instanceof`. The given
    /// prototype object gains a back-pointing `constructor`.
    pub fn mk_cfunction_obj(&mut self, f: NativeFn, proto: Value) -> VmResult<Value> {
        let cfunc = self.mk_cfunction(f);
        let obj = Value::Object(self.alloc_object(self.vals.function_prototype)?);
        self.tmp_roots.push(obj);
        let slot_name = self.heap.mk_string(CFUNC_SLOT);
        self.alloc_prop(
            obj,
            slot_name,
            PropData::Value(cfunc),
            prop_attr::HIDDEN | prop_attr::NON_ENUMERABLE,
        )?;
        let obj = *self.tmp_roots.last().expect("tmp root imbalance");
        if proto.is_object() {
            let proto_name = self.heap.mk_string("prototype");
            self.alloc_prop(
                obj,
                proto_name,
                PropData::Value(proto),
                prop_attr::NON_ENUMERABLE,
            )?;
            let obj = *self.tmp_roots.last().expect("tmp root imbalance");
            let ctor_name = self.heap.mk_string("constructor");
            self.alloc_prop(
                proto,
                ctor_name,
                PropData::Value(obj),
                prop_attr::NON_ENUMERABLE,
            )?;
        }
        Ok(self.tmp_roots.pop().expect("tmp root imbalance"))
    }

    /// Compiles a regular expression value.
    pub fn mk_regexp(&mut self, source: &str, flags: &str) -> VmResult<Value> {
        match RegexpData::compile(source, flags) {
            Ok(data) => Ok(Value::Regexp(self.heap.new_regexp(data))),
            Err(e) => Err(self.throwf(e.kind, &e.message)),
        }
    }

    /* }}} */

    /* Value inspection {{{ */

    /// The numeric payload of a number value.
    pub fn get_double(&self, v: Value) -> f64 {
        v.as_number().unwrap_or(f64::NAN)
    }

    /// The truncated integer payload of a number value.
    pub fn get_int(&self, v: Value) -> i64 {
        v.as_number().map_or(0, |n| if n.is_nan() { 0 } else { n.trunc() as i64 })
    }

    pub fn get_bool(&self, v: Value) -> bool {
        v.as_bool().unwrap_or(false)
    }

    /// The opaque pointer payload of a foreign value.
    pub fn get_ptr(&self, v: Value) -> Option<usize> {
        v.as_foreign()
    }

    /// The text of a string value. The slice borrows from the engine (or
    /// the value itself for inline strings); copy it before any call that
    /// can collect.
    pub fn get_string<'a>(&'a self, v: &'a Value) -> Option<&'a str> {
        self.heap.str_text(v)
    }

    /* }}} */

    /* Object surface {{{ */

    /// Property read that swallows exceptions, like plain embedding code
    /// wants. A pending exception is preserved.
    pub fn get(&mut self, obj: Value, name: &str) -> Value {
        let saved = self.get_thrown_value();
        let name_v = self.heap.mk_string(name);
        let result = self.get_v(obj, name_v);
        match result {
            Ok(v) => v,
            Err(Throw) => {
                match saved {
                    Some(prev) => {
                        self.vals.thrown_error = prev;
                    }
                    None => self.clear_thrown_value(),
                }
                Value::Undefined
            }
        }
    }

    /// Property read that propagates exceptions.
    pub fn get_throwing(&mut self, obj: Value, name: &str) -> VmResult<Value> {
        let name_v = self.heap.mk_string(name);
        self.get_v(obj, name_v)
    }

    /// Property write with assignment semantics.
    pub fn set(&mut self, obj: Value, name: &str, value: Value) -> VmResult<()> {
        self.tmp_roots.push(value);
        let name_v = self.heap.mk_string(name);
        let value = self.tmp_roots.pop().expect("tmp root imbalance");
        self.set_v(obj, name_v, value)
    }

    /// Property definition with an attribute descriptor.
    pub fn def(
        &mut self,
        obj: Value,
        name: &str,
        value: Value,
        desc: AttrDesc,
    ) -> VmResult<bool> {
        self.tmp_roots.push(value);
        let name_v = self.heap.mk_string(name);
        let value = self.tmp_roots.pop().expect("tmp root imbalance");
        self.def_property_v(obj, name_v, value, desc, false)
    }

    /// Property removal; false means a non-configurable property refused.
    pub fn del(&mut self, obj: Value, name: &str) -> bool {
        let name_v = self.heap.mk_string(name);
        self.delete_v(obj, name_v).unwrap_or(false)
    }

    /// Advances enumeration; `None` handle starts it. Yields the handle
    /// to pass next time plus the key and its value.
    pub fn next_prop(
        &mut self,
        obj: Value,
        handle: Option<Value>,
    ) -> Option<(Value, Value, Value)> {
        let (next, key) = self.next_prop_engine(obj, handle.unwrap_or(Value::Null))?;
        let key_text = self.heap.str_text(&key).unwrap_or("").to_string();
        let value = self.get(obj, &key_text);
        Some((next, key, value))
    }

    /// Attaches opaque host data to an object.
    pub fn set_user_data(&mut self, obj: Value, data: Box<dyn std::any::Any>) {
        if let Value::Object(id) = obj {
            let dtor = self.heap.object(id).dtor;
            self.heap.set_user_data(id, data, dtor);
        }
    }

    /// Borrows the opaque host data attached to an object.
    pub fn get_user_data(&self, obj: Value) -> Option<&dyn std::any::Any> {
        match obj {
            Value::Object(id) => self.heap.user_data(id),
            _ => None,
        }
    }

    /// Registers a destructor to run when the collector reclaims the
    /// object. The callback receives only the user data and must not
    /// re-enter the engine.
    pub fn set_destructor_cb(&mut self, obj: Value, dtor: fn(Box<dyn std::any::Any>)) {
        if let Value::Object(id) = obj {
            let data = self.heap.object_mut(id).user_data.take();
            if let Some(data) = data {
                self.heap.set_user_data(id, data, Some(dtor));
            } else {
                self.heap.object_mut(id).dtor = Some(dtor);
                self.heap.object_mut(id).attrs |= core_types::obj_attr::HAS_DESTRUCTOR;
            }
        }
    }

    /* }}} */

    /* Array surface {{{ */

    /// Element count of an array value.
    pub fn array_length(&self, v: Value) -> usize {
        match v {
            Value::Object(id) if self.heap.is_dense_array(v) => self.heap.array_len(id),
            _ => 0,
        }
    }

    /// Indexed read; out-of-range and holes yield `undefined`.
    pub fn array_get(&self, v: Value, idx: usize) -> Value {
        match v {
            Value::Object(id) if self.heap.is_dense_array(v) => {
                let e = self.heap.array_get(id, idx);
                if e.is_novalue() {
                    Value::Undefined
                } else {
                    e
                }
            }
            _ => Value::Undefined,
        }
    }

    /// Indexed write, growing per the dense-array contract. On non-array
    /// objects this degrades to a property write of the stringified
    /// index.
    pub fn array_set(&mut self, v: Value, idx: usize, value: Value) -> VmResult<()> {
        match v {
            Value::Object(id) if self.heap.is_dense_array(v) => {
                self.heap.array_set(id, idx, value);
                Ok(())
            }
            _ => {
                self.tmp_roots.push(value);
                let name = self.heap.mk_string(&idx.to_string());
                let value = self.tmp_roots.pop().expect("tmp root imbalance");
                self.set_v(v, name, value)
            }
        }
    }

    /// Appends an element.
    pub fn array_push(&mut self, v: Value, value: Value) -> VmResult<()> {
        match v {
            Value::Object(id) if self.heap.is_dense_array(v) => {
                self.heap.array_push(id, value);
                Ok(())
            }
            _ => Err(self.throwf(ErrorKind::TypeError, "not an array")),
        }
    }

    /// Punches a hole at `idx`.
    pub fn array_del(&mut self, v: Value, idx: usize) -> VmResult<()> {
        match v {
            Value::Object(id) if self.heap.is_dense_array(v) => {
                self.heap.array_del(id, idx);
                Ok(())
            }
            _ => Err(self.throwf(ErrorKind::TypeError, "not an array")),
        }
    }

    /* }}} */

    /* Rooting {{{ */

    /// Registers a value with the collector's root set. The returned
    /// handle reads back the current (possibly relocated) value.
    pub fn own(&mut self, v: Value) -> Root {
        for (i, slot) in self.owned.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(v);
                return Root(i as u32);
            }
        }
        self.owned.push(Some(v));
        Root(self.owned.len() as u32 - 1)
    }

    /// The current value of a root slot.
    pub fn rooted(&self, root: Root) -> Value {
        self.owned
            .get(root.0 as usize)
            .and_then(|slot| *slot)
            .unwrap_or(Value::Undefined)
    }

    /// Releases a root slot.
    pub fn disown(&mut self, root: Root) {
        if let Some(slot) = self.owned.get_mut(root.0 as usize) {
            *slot = None;
        }
    }

    /* }}} */

    /* Native-call context {{{ */

    /// Number of arguments of the call in flight.
    pub fn argc(&self) -> usize {
        match self.vals.arguments {
            Value::Object(id) if self.heap.is_dense_array(self.vals.arguments) => {
                self.heap.array_len(id)
            }
            _ => 0,
        }
    }

    /// Argument `i` of the call in flight, `undefined` when absent.
    pub fn arg(&self, i: usize) -> Value {
        match self.vals.arguments {
            Value::Object(id) if self.heap.is_dense_array(self.vals.arguments) => {
                let v = self.heap.array_get(id, i);
                if v.is_novalue() {
                    Value::Undefined
                } else {
                    v
                }
            }
            _ => Value::Undefined,
        }
    }

    /// The receiver of the native call in flight.
    pub fn this_val(&self) -> Value {
        for frame in self.frames.iter().rev() {
            if let Frame::Cfunc(f) = frame {
                return f.this_obj;
            }
        }
        self.vals.global
    }

    /* }}} */

    /* Named objects {{{ */

    /// The shared global object.
    pub fn global(&self) -> Value {
        self.vals.global
    }

    pub fn object_prototype(&self) -> Value {
        self.vals.object_prototype
    }

    pub fn array_prototype(&self) -> Value {
        self.vals.array_prototype
    }

    pub fn string_prototype(&self) -> Value {
        self.vals.string_prototype
    }

    pub fn number_prototype(&self) -> Value {
        self.vals.number_prototype
    }

    pub fn boolean_prototype(&self) -> Value {
        self.vals.boolean_prototype
    }

    pub fn function_prototype(&self) -> Value {
        self.vals.function_prototype
    }

    pub fn regexp_prototype(&self) -> Value {
        self.vals.regexp_prototype
    }

    /// The prototype shared by every error kind.
    pub fn error_prototype(&self) -> Value {
        self.vals.error_prototype
    }

    /// The prototype of one error kind, for wiring constructors.
    pub fn error_kind_prototype(&self, kind: ErrorKind) -> Value {
        self.vals.error_prototypes[crate::interp::error_kind_slot(kind)]
    }

    /* }}} */

    /// Helper shared by host bindings: reads a canonical array index out
    /// of a property-name string.
    pub fn parse_array_index(&self, name: &str) -> Option<usize> {
        parse_index(name)
    }
}

impl Interp {
    /// Marks an object non-extensible; new own properties are refused.
    pub fn prevent_extensions(&mut self, v: Value) {
        match v {
            Value::Object(id) => {
                self.heap.object_mut(id).attrs |= core_types::obj_attr::NOT_EXTENSIBLE;
            }
            Value::Function(id) => {
                self.heap.func_mut(id).attrs |= core_types::obj_attr::NOT_EXTENSIBLE;
            }
            _ => {}
        }
    }

    /// Whether new own properties may be added.
    pub fn is_extensible(&self, v: Value) -> bool {
        v.is_object() && self.heap.obj_attrs(v) & core_types::obj_attr::NOT_EXTENSIBLE == 0
    }

    /// Calls a callable with exception propagation, for native code that
    /// participates in the engine's `Result<_, Throw>` flow.
    pub fn apply_checked(
        &mut self,
        func: Value,
        this: Value,
        args: &[Value],
    ) -> VmResult<Value> {
        self.apply_internal(func, this, args)
    }

    /// The compiled matcher of a regexp value. The handle is cheap to
    /// clone, so native code can run matches without holding a borrow on
    /// the engine.
    pub fn regexp_program(&self, v: Value) -> Option<regex::Regex> {
        match v {
            Value::Regexp(id) => Some(self.heap.regexp(id).prog.clone()),
            _ => None,
        }
    }

    /// Source, flag string, and the global flag of a regexp value.
    pub fn regexp_parts(&self, v: Value) -> Option<(String, String, bool)> {
        match v {
            Value::Regexp(id) => {
                let re = self.heap.regexp(id);
                Some((re.source.clone(), re.flags.to_string(), re.flags.global))
            }
            _ => None,
        }
    }

    /// Resume position for global matching.
    pub fn regexp_last_index(&self, v: Value) -> usize {
        match v {
            Value::Regexp(id) => self.heap.regexp(id).last_index,
            _ => 0,
        }
    }

    /// Updates the resume position after a global match.
    pub fn set_regexp_last_index(&mut self, v: Value, idx: usize) {
        if let Value::Regexp(id) = v {
            self.heap.regexp_mut(id).last_index = idx;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_disown_reuse() {
        let mut interp = Interp::new();
        let a = interp.own(Value::Number(1.0));
        let b = interp.own(Value::Number(2.0));
        assert_eq!(interp.rooted(a).as_number(), Some(1.0));
        interp.disown(a);
        let c = interp.own(Value::Number(3.0));
        assert_eq!(c, a, "freed root slots are reused");
        assert_eq!(interp.rooted(b).as_number(), Some(2.0));
    }

    #[test]
    fn test_get_swallows_and_preserves_thrown() {
        let mut interp = Interp::new();
        let v = interp.get(Value::Undefined, "missing");
        assert!(v.is_undefined());
        assert!(interp.get_thrown_value().is_none());
    }

    #[test]
    fn test_array_surface() {
        let mut interp = Interp::new();
        let arr = interp.mk_array().unwrap();
        interp.array_push(arr, Value::Number(1.0)).unwrap();
        interp.array_set(arr, 3, Value::Number(4.0)).unwrap();
        assert_eq!(interp.array_length(arr), 4);
        assert!(interp.array_get(arr, 1).is_undefined());
        assert_eq!(interp.array_get(arr, 3).as_number(), Some(4.0));
        interp.array_del(arr, 3).unwrap();
        assert!(interp.array_get(arr, 3).is_undefined());
    }

    #[test]
    fn test_cfunction_obj_instanceof_wiring() {
        let mut interp = Interp::new();
        fn ctor(interp: &mut Interp) -> VmResult<Value> {
            Ok(interp.this_val())
        }
        let proto = interp.mk_object().unwrap();
        let ctor_v = interp.mk_cfunction_obj(ctor, proto).unwrap();
        assert!(interp.is_callable(ctor_v));
        let instance = interp.mk_object_with_proto(proto).unwrap();
        assert!(interp.is_instance_of(instance, ctor_v).unwrap());
        let stranger = interp.mk_object().unwrap();
        assert!(!interp.is_instance_of(stranger, ctor_v).unwrap());
    }
}
