//! The fetch/decode/dispatch loop, call machinery, and the try-stack
//! unwinding protocol.
//!
//! Execution state is a `(bcode, ip)` pair cached in locals and synced to
//! the top bcode frame whenever the frame suspends (calls) or control
//! transfers across frames (returns, unwinding). The loop is cooperative:
//! no opcode yields, and the interrupt flag is polled only at back-edges,
//! calls, and returns.

use crate::convert::{to_int32, to_uint32};
use crate::frames::{decode_try_entry, encode_try_entry, CfuncFrame, Frame, TryTag};
use crate::interp::{Interp, Throw, VmResult};
use crate::object_ops::CallTarget;
use bytecode::{read_lit_idx, read_off, Bcode, Lit, Op};
use core_types::{ErrorKind, Value};
use gc_heap::{PropData, RegexpData};
use std::cmp::Ordering;
use std::rc::Rc;

/// What an opcode did to control flow.
enum Flow {
    /// Keep stepping.
    Next,
    /// A frame was pushed or popped; reload `(bcode, ip)` from the top
    /// bcode frame.
    SwitchFrame,
    /// Execution returned to the bottom frame; the entry result is on the
    /// stack.
    Done,
}

impl Interp {
    /// Runs bcode frames until the frame stack shrinks back to `bottom`.
    /// On entry the top frame must be a freshly pushed bcode frame.
    pub(crate) fn eval_until(&mut self, bottom: usize) -> VmResult<()> {
        let (mut bcode, mut ip) = self.load_position();
        loop {
            self.maybe_gc();
            let flow = match self.step(&bcode, &mut ip, bottom) {
                Ok(flow) => flow,
                Err(Throw) => {
                    self.unwind_throw(bottom)?;
                    Flow::SwitchFrame
                }
            };
            match flow {
                Flow::Next => {}
                Flow::SwitchFrame => {
                    let (b, i) = self.load_position();
                    bcode = b;
                    ip = i;
                }
                Flow::Done => return Ok(()),
            }
        }
    }

    /// Reads the resume position from the innermost bcode frame.
    fn load_position(&self) -> (Rc<Bcode>, usize) {
        let idx = self.cur_bcode_frame().expect("no bcode frame to run");
        match &self.frames[idx] {
            Frame::Bcode(f) => (f.bcode.clone(), f.ip),
            _ => unreachable!(),
        }
    }

    /// Saves the local instruction pointer into the innermost bcode frame
    /// before it suspends.
    fn save_position(&mut self, ip: usize) {
        if let Some(idx) = self.cur_bcode_frame() {
            if let Frame::Bcode(f) = &mut self.frames[idx] {
                f.ip = ip;
            }
        }
    }

    fn check_interrupt(&mut self) -> VmResult<()> {
        if self.interrupt_pending() {
            return Err(self.throwf(ErrorKind::InterruptedError, "interrupted"));
        }
        Ok(())
    }

    /// Executes one opcode.
    fn step(&mut self, bcode: &Rc<Bcode>, ip: &mut usize, bottom: usize) -> VmResult<Flow> {
        if *ip >= bcode.ops.len() {
            // End of a script body: its value is on top of the stack.
            let value = self.pop();
            self.vals.returned_value = value;
            self.flags.is_returned = true;
            return self.unwind_return(bottom);
        }

        let op = match Op::from_u8(bcode.ops[*ip]) {
            Some(op) => op,
            None => return Err(self.internal_error("bad opcode")),
        };
        *ip += 1;

        match op {
            /* Stack {{{ */
            Op::Drop => {
                self.pop();
            }
            Op::Dup => {
                let v = self.tos();
                self.push(v)?;
            }
            Op::Dup2 => {
                let b = self.tos();
                let a = self.stack[self.stack.len() - 2];
                self.push(a)?;
                self.push(b)?;
            }
            Op::Swap => {
                let len = self.stack.len();
                self.stack.swap(len - 1, len - 2);
            }
            Op::SwapDrop => {
                let keep = self.pop();
                self.pop();
                self.push(keep)?;
            }
            Op::Stash => {
                self.vals.stash = self.tos();
                self.flags.is_stashed = true;
            }
            Op::Unstash => {
                let v = self.vals.stash;
                self.vals.stash = Value::Undefined;
                self.flags.is_stashed = false;
                *self.stack.last_mut().expect("value stack underflow") = v;
            }
            Op::PushUndefined => self.push(Value::Undefined)?,
            Op::PushNull => self.push(Value::Null)?,
            Op::PushTrue => self.push(Value::Bool(true))?,
            Op::PushFalse => self.push(Value::Bool(false))?,
            Op::PushZero => self.push(Value::Number(0.0))?,
            Op::PushOne => self.push(Value::Number(1.0))?,
            Op::PushThis => {
                let this_v = match self.cur_bcode_frame() {
                    Some(idx) => match &self.frames[idx] {
                        Frame::Bcode(f) => f.this_obj,
                        _ => Value::Undefined,
                    },
                    None => self.vals.global,
                };
                let this_v = if this_v.is_undefined() && !bcode.strict {
                    self.vals.global
                } else {
                    this_v
                };
                self.push(this_v)?;
            }
            Op::PushLit => {
                let (lit, next) = read_lit_idx(&bcode.ops, *ip);
                *ip = next;
                let v = self.lit_value(bcode, lit.0 as usize)?;
                self.push(v)?;
            }
            /* }}} */

            /* Arithmetic and logic {{{ */
            Op::Add => {
                let b = self.pop();
                let a = self.pop();
                let v = self.add_values(a, b)?;
                self.push(v)?;
            }
            Op::Sub | Op::Mul | Op::Div | Op::Rem => {
                let b = self.pop();
                let a = self.pop();
                let (x, y) = self.to_number_pair(a, b)?;
                let n = match op {
                    Op::Sub => x - y,
                    Op::Mul => x * y,
                    Op::Div => x / y,
                    _ => x % y,
                };
                self.push(Value::Number(n))?;
            }
            Op::Lshift | Op::Rshift | Op::Urshift | Op::Or | Op::Xor | Op::And => {
                let b = self.pop();
                let a = self.pop();
                let (x, y) = self.to_number_pair(a, b)?;
                let n = match op {
                    Op::Lshift => (to_int32(x) << (to_uint32(y) & 31)) as f64,
                    Op::Rshift => (to_int32(x) >> (to_uint32(y) & 31)) as f64,
                    Op::Urshift => (to_uint32(x) >> (to_uint32(y) & 31)) as f64,
                    Op::Or => (to_int32(x) | to_int32(y)) as f64,
                    Op::Xor => (to_int32(x) ^ to_int32(y)) as f64,
                    _ => (to_int32(x) & to_int32(y)) as f64,
                };
                self.push(Value::Number(n))?;
            }
            Op::LogicalNot => {
                let v = self.pop();
                let b = self.to_boolean_v(v);
                self.push(Value::Bool(!b))?;
            }
            Op::Not => {
                let v = self.pop();
                let n = self.to_number_v(v)?;
                self.push(Value::Number(!to_int32(n) as f64))?;
            }
            Op::Pos => {
                let v = self.pop();
                let n = self.to_number_v(v)?;
                self.push(Value::Number(n))?;
            }
            Op::Neg => {
                let v = self.pop();
                let n = self.to_number_v(v)?;
                self.push(Value::Number(-n))?;
            }
            /* }}} */

            /* Comparison {{{ */
            Op::Eq | Op::Ne => {
                let b = self.pop();
                let a = self.pop();
                let eq = self.loose_equals(a, b)?;
                self.push(Value::Bool(if op == Op::Eq { eq } else { !eq }))?;
            }
            Op::EqEq | Op::NeNe => {
                let b = self.pop();
                let a = self.pop();
                let eq = self.strict_equals(a, b);
                self.push(Value::Bool(if op == Op::EqEq { eq } else { !eq }))?;
            }
            Op::Lt | Op::Le | Op::Gt | Op::Ge => {
                let b = self.pop();
                let a = self.pop();
                let ord = self.compare(a, b)?;
                let res = match (op, ord) {
                    (_, None) => false,
                    (Op::Lt, Some(o)) => o == Ordering::Less,
                    (Op::Le, Some(o)) => o != Ordering::Greater,
                    (Op::Gt, Some(o)) => o == Ordering::Greater,
                    (_, Some(o)) => o != Ordering::Less,
                };
                self.push(Value::Bool(res))?;
            }
            Op::In => {
                let obj = self.pop();
                let name = self.pop();
                let has = self.has_property(name, obj)?;
                self.push(Value::Bool(has))?;
            }
            Op::Instanceof => {
                let ctor = self.pop();
                let v = self.pop();
                let is = self.instanceof(v, ctor)?;
                self.push(Value::Bool(is))?;
            }
            Op::Typeof => {
                let v = self.pop();
                let text = self.typeof_text(v);
                let s = self.heap.mk_string(text);
                self.push(s)?;
            }
            /* }}} */

            /* Variables and properties {{{ */
            Op::GetVar => {
                let name = self.fetch_lit_str(bcode, ip)?;
                let v = self.get_var(name)?;
                self.push(v)?;
            }
            Op::SafeGetVar => {
                let name = self.fetch_lit_str(bcode, ip)?;
                let v = self.safe_get_var(name)?;
                self.push(v)?;
            }
            Op::SetVar => {
                let name = self.fetch_lit_str(bcode, ip)?;
                let value = self.tos();
                self.set_var(name, value)?;
            }
            Op::DeleteVar => {
                let name = self.fetch_lit_str(bcode, ip)?;
                let ok = self.delete_var(name)?;
                self.push(Value::Bool(ok))?;
            }
            Op::Get => {
                let name = self.pop();
                let obj = self.pop();
                let v = self.get_v(obj, name)?;
                self.push(v)?;
            }
            Op::Set => {
                let value = self.pop();
                let name = self.pop();
                let obj = self.pop();
                // The assignment expression's value survives the write,
                // which can run a setter and collect.
                self.tmp_roots.push(value);
                let result = self.set_v(obj, name, value);
                let value = self.tmp_roots.pop().expect("tmp root imbalance");
                result?;
                self.push(value)?;
            }
            Op::Delete => {
                let name = self.pop();
                let obj = self.pop();
                let ok = self.delete_v(obj, name)?;
                if !ok && self.is_strict_mode() {
                    let text = self.to_string_text(name)?;
                    return Err(self.throwf(
                        ErrorKind::TypeError,
                        &format!("cannot delete '{}'", text),
                    ));
                }
                self.push(Value::Bool(ok))?;
            }
            /* }}} */

            Op::CreateObj => {
                let proto = self.vals.object_prototype;
                let obj = self.alloc_object(proto)?;
                self.push(Value::Object(obj))?;
            }
            Op::CreateArr => {
                let arr = self.alloc_array()?;
                self.push(Value::Object(arr))?;
            }

            /* Control {{{ */
            Op::Jmp => {
                let (target, _) = read_off(&bcode.ops, *ip);
                if (target as usize) < *ip {
                    self.check_interrupt()?;
                }
                *ip = target as usize;
            }
            Op::JmpTrue | Op::JmpFalse | Op::JmpTrueDrop => {
                let (target, next) = read_off(&bcode.ops, *ip);
                let cond = self.pop();
                let truthy = self.to_boolean_v(cond);
                let take = if op == Op::JmpFalse { !truthy } else { truthy };
                if take {
                    if op == Op::JmpTrueDrop {
                        self.pop();
                    }
                    if (target as usize) < *ip {
                        self.check_interrupt()?;
                    }
                    *ip = target as usize;
                } else {
                    *ip = next;
                }
            }
            Op::JmpIfContinue => {
                let (target, next) = read_off(&bcode.ops, *ip);
                if self.flags.is_continuing {
                    self.flags.is_continuing = false;
                    self.check_interrupt()?;
                    *ip = target as usize;
                } else {
                    *ip = next;
                }
            }
            /* }}} */

            /* Calls {{{ */
            Op::CheckCall => {
                let callee = self.tos();
                if !self.is_callable(callee) {
                    let last = self.vals.last_name;
                    let name = self
                        .heap
                        .str_text(&last)
                        .unwrap_or("value")
                        .to_string();
                    let ex = self.create_exception(
                        ErrorKind::TypeError,
                        &format!("{} is not a function", name),
                    );
                    self.vals.call_check_ex = ex;
                }
            }
            Op::Call | Op::New => {
                let n = bcode.ops[*ip] as usize;
                *ip += 1;
                self.check_interrupt()?;
                self.save_position(*ip);
                if self.setup_call(n, op == Op::New)?.is_some() {
                    return Ok(Flow::SwitchFrame);
                }
            }
            Op::FuncLit => {
                let v = self.tos();
                match v {
                    Value::Function(id) => {
                        let scope = self.scope();
                        self.heap.func_mut(id).scope = Some(scope);
                    }
                    _ => return Err(self.internal_error("FUNC_LIT on a non-function")),
                }
            }
            Op::Ret => {
                self.check_interrupt()?;
                let value = self.pop();
                self.vals.returned_value = value;
                self.flags.is_returned = true;
                return self.unwind_return(bottom);
            }
            /* }}} */

            /* Exceptions and unwinding {{{ */
            Op::TryPushCatch | Op::TryPushFinally | Op::TryPushLoop | Op::TryPushSwitch => {
                let (target, next) = read_off(&bcode.ops, *ip);
                *ip = next;
                let tag = match op {
                    Op::TryPushCatch => TryTag::Catch,
                    Op::TryPushFinally => TryTag::Finally,
                    Op::TryPushLoop => TryTag::Loop,
                    _ => TryTag::Switch,
                };
                self.push_try(tag, target)?;
            }
            Op::TryPop => {
                self.pop_try_top();
            }
            Op::EnterCatch => {
                // Allocate the scope before materializing the binding name,
                // so a collection here cannot relocate it out from under us.
                let parent = self.scope();
                let scope = self.alloc_object(Value::Object(parent))?;
                self.push_frame(Frame::Catch(crate::frames::CatchFrame {
                    scope,
                    try_stack: Value::Undefined,
                }))?;
                let name = self.fetch_lit_str(bcode, ip)?;
                let thrown = self.tos();
                self.alloc_prop(Value::Object(scope), name, PropData::Value(thrown), 0)?;
                self.pop();
            }
            Op::ExitCatch => match self.frames.pop() {
                Some(Frame::Catch(_)) => {}
                _ => return Err(self.internal_error("EXIT_CATCH without catch frame")),
            },
            Op::AfterFinally => {
                if self.flags.is_thrown {
                    self.unwind_throw(bottom)?;
                    return Ok(Flow::SwitchFrame);
                }
                if self.flags.is_returned {
                    return self.unwind_return(bottom);
                }
                if self.flags.is_breaking || self.flags.is_continuing {
                    let for_continue = self.flags.is_continuing;
                    self.unwind_break(for_continue)?;
                    return Ok(Flow::SwitchFrame);
                }
            }
            Op::Break => {
                self.flags.is_breaking = true;
                self.unwind_break(false)?;
                return Ok(Flow::SwitchFrame);
            }
            Op::Continue => {
                self.flags.is_continuing = true;
                self.unwind_break(true)?;
                return Ok(Flow::SwitchFrame);
            }
            Op::Throw => {
                let v = self.pop();
                return Err(self.throw_value(v));
            }
            /* }}} */

            Op::NextProp => {
                let handle = self.pop();
                let obj = self.pop();
                match self.next_prop_engine(obj, handle) {
                    Some((next, key)) => {
                        self.push(obj)?;
                        self.push(next)?;
                        self.push(key)?;
                        self.push(Value::Bool(true))?;
                    }
                    None => self.push(Value::Bool(false))?,
                }
            }
        }
        Ok(Flow::Next)
    }

    /// Reads a literal-index operand naming a string literal.
    fn fetch_lit_str(&mut self, bcode: &Rc<Bcode>, ip: &mut usize) -> VmResult<Value> {
        let (lit, next) = read_lit_idx(&bcode.ops, *ip);
        *ip = next;
        match bcode.lits.get(lit.0 as usize) {
            Some(Lit::Str(s)) => {
                let s = s.clone();
                Ok(self.heap.mk_string(&s))
            }
            _ => Err(self.internal_error("literal operand is not a name")),
        }
    }

    /// Materializes a literal-pool entry as a value.
    fn lit_value(&mut self, bcode: &Rc<Bcode>, idx: usize) -> VmResult<Value> {
        match bcode.lits.get(idx) {
            Some(Lit::Number(n)) => Ok(Value::Number(*n)),
            Some(Lit::Str(s)) => {
                let s = s.clone();
                Ok(self.heap.mk_string(&s))
            }
            Some(Lit::Regexp { source, flags }) => {
                let data = match RegexpData::compile(source, flags) {
                    Ok(data) => data,
                    Err(e) => return Err(self.throwf(e.kind, &e.message)),
                };
                Ok(Value::Regexp(self.heap.new_regexp(data)))
            }
            Some(Lit::Func(inner)) => self.alloc_function(inner.clone()),
            None => Err(self.internal_error("literal index out of range")),
        }
    }

    /* Call machinery {{{ */

    /// Performs the call whose operands sit on the stack as
    /// `( this callable arg1..argN )`. Native callees run to completion
    /// and leave their result; JavaScript callees get a frame pushed, and
    /// the callee bcode is returned so the dispatch loop can switch.
    pub(crate) fn setup_call(&mut self, n: usize, is_new: bool) -> VmResult<Option<Rc<Bcode>>> {
        let callable_idx = self.stack.len() - 1 - n;
        let this_idx = callable_idx - 1;
        let callable = self.stack[callable_idx];

        let target = match self.callable_slot(callable) {
            Some(t) => t,
            None => {
                let ex = self.vals.call_check_ex;
                self.vals.call_check_ex = Value::Undefined;
                if ex.is_undefined() {
                    return Err(self.throwf(ErrorKind::TypeError, "value is not a function"));
                }
                return Err(self.throw_value(ex));
            }
        };

        // A constructor call replaces `this` with a fresh object whose
        // prototype comes from the callable's `prototype` property.
        if is_new {
            let proto = if callable.is_function() {
                self.func_prototype_prop(callable)?
            } else {
                let name = self.mk_str_value("prototype");
                self.get_v(callable, name)?
            };
            let proto = if proto.is_object() {
                proto
            } else {
                self.vals.object_prototype
            };
            let this_obj = Value::Object(self.alloc_object(proto)?);
            self.stack[this_idx] = this_obj;
        }

        // Arguments go into a dense array, allocated while everything is
        // still rooted through the stack.
        let args_id = self.alloc_array()?;
        for i in 0..n {
            let v = self.stack[callable_idx + 1 + i];
            self.heap.array_set(args_id, i, v);
        }
        let args_arr = Value::Object(args_id);
        let this_v = self.stack[this_idx];

        match target {
            CallTarget::Native(cid) => {
                self.stack.truncate(this_idx);
                let this_v = if this_v.is_undefined() && !is_new && !self.is_strict_mode() {
                    self.vals.global
                } else {
                    this_v
                };
                self.push_frame(Frame::Cfunc(CfuncFrame {
                    this_obj: this_v,
                    stack_len: self.stack.len(),
                    cfunc: cid.0,
                }))?;
                let saved_args = self.vals.arguments;
                self.vals.arguments = args_arr;
                let saved_inhibit = self.flags.inhibit_gc;
                self.flags.inhibit_gc = true;
                let f = self.cfuncs[cid.0 as usize];
                let result = f(self);
                self.flags.inhibit_gc = saved_inhibit;
                self.vals.arguments = saved_args;
                let frame = self.frames.pop().expect("cfunction frame vanished");
                if let Frame::Cfunc(f) = frame {
                    self.stack.truncate(f.stack_len);
                }
                let value = result?;
                let value = if is_new && !value.is_object() {
                    this_v
                } else {
                    value
                };
                self.push(value)?;
                Ok(None)
            }
            CallTarget::Js(fid) => {
                let callee_bcode = self.heap.func(fid).bcode.clone();
                let func_scope = self.heap.func(fid).scope;
                let this_v = if this_v.is_undefined() && !is_new && !callee_bcode.strict {
                    self.vals.global
                } else {
                    this_v
                };

                // Root the arguments array, the receiver (which may be a
                // relocatable string), and the scope while the bindings
                // allocate.
                let saved_args = self.vals.arguments;
                self.tmp_roots.push(saved_args);
                self.tmp_roots.push(this_v);
                self.vals.arguments = args_arr;

                let scope_proto = match func_scope {
                    Some(id) => Value::Object(id),
                    None => self.vals.global,
                };
                let scope = self.alloc_object(scope_proto)?;
                self.tmp_roots.push(Value::Object(scope));

                let bind = |interp: &mut Interp, name: &str, value: Value| -> VmResult<()> {
                    let name_v = interp.heap.mk_string(name);
                    interp.alloc_prop(
                        Value::Object(scope),
                        name_v,
                        PropData::Value(value),
                        0,
                    )
                };
                bind(self, "arguments", args_arr)?;
                if let Some(name) = callee_bcode.func_name() {
                    let name = name.to_string();
                    bind(self, &name, callable)?;
                }
                for (i, param) in callee_bcode.arg_names().to_vec().iter().enumerate() {
                    let v = if i < n {
                        let v = self.heap.array_get(args_id, i);
                        if v.is_novalue() {
                            Value::Undefined
                        } else {
                            v
                        }
                    } else {
                        Value::Undefined
                    };
                    bind(self, param, v)?;
                }
                for var in callee_bcode.var_names().to_vec() {
                    if self.heap.find_own_prop(Value::Object(scope), var.as_bytes()).is_none() {
                        bind(self, &var, Value::Undefined)?;
                    }
                }

                self.tmp_roots.pop();
                let this_v = self.tmp_roots.pop().expect("tmp root imbalance");
                self.vals.arguments = self.tmp_roots.pop().expect("tmp root imbalance");

                self.stack.truncate(this_idx);
                let frame = self.mk_bcode_frame(callee_bcode.clone(), scope, this_v, is_new);
                self.push_frame(Frame::Bcode(frame))?;
                Ok(Some(callee_bcode))
            }
        }
    }

    /// Calls `func` with an explicit receiver and argument slice, running
    /// nested frames to completion. The workhorse behind coercions,
    /// accessor dispatch, and the host `apply`.
    pub(crate) fn apply_internal(
        &mut self,
        func: Value,
        this: Value,
        args: &[Value],
    ) -> VmResult<Value> {
        if !self.is_callable(func) {
            return Err(self.throwf(ErrorKind::TypeError, "value is not a function"));
        }
        let bottom = self.frames.len();
        self.push(this)?;
        self.push(func)?;
        for arg in args {
            self.push(*arg)?;
        }
        // A nested invocation re-enables collection even when it was
        // inhibited for the surrounding native call; native code roots
        // whatever it holds across this boundary.
        let saved_inhibit = self.flags.inhibit_gc;
        self.flags.inhibit_gc = false;
        let result = (|| -> VmResult<()> {
            if self.setup_call(args.len(), false)?.is_some() {
                self.eval_until(bottom)?;
            }
            Ok(())
        })();
        self.flags.inhibit_gc = saved_inhibit;
        result?;
        Ok(self.pop())
    }

    /* }}} */

    /* Try-stack plumbing {{{ */

    /// Opens a handler on the innermost frame owning a try-stack.
    fn push_try(&mut self, tag: TryTag, target: u32) -> VmResult<()> {
        let entry = encode_try_entry(tag, target, self.stack.len());
        let top = self.frames.len() - 1;
        let slot = match self.frames[top].try_stack() {
            Some(v) => v,
            None => return Err(self.internal_error("try-push outside bcode")),
        };
        let arr = if slot.is_undefined() {
            let arr = Value::Object(self.alloc_array()?);
            self.frames[top].set_try_stack(arr);
            arr
        } else {
            slot
        };
        if let Value::Object(id) = arr {
            self.heap.array_push(id, entry);
        }
        Ok(())
    }

    /// Closes the most recent handler of the innermost frame.
    fn pop_try_top(&mut self) {
        let top = self.frames.len() - 1;
        if let Some(Value::Object(id)) = self.frames[top].try_stack() {
            let len = self.heap.array_len(id);
            if len > 0 {
                self.heap.array_resize(id, len - 1);
            }
        }
    }

    /// The newest entry of a frame's try-stack.
    fn peek_try(&self, frame_idx: usize) -> Option<(TryTag, u32, usize)> {
        match self.frames[frame_idx].try_stack() {
            Some(Value::Object(id)) => {
                let len = self.heap.array_len(id);
                if len == 0 {
                    return None;
                }
                decode_try_entry(self.heap.array_get(id, len - 1))
            }
            _ => None,
        }
    }

    fn pop_try_at(&mut self, frame_idx: usize) {
        if let Some(Value::Object(id)) = self.frames[frame_idx].try_stack() {
            let len = self.heap.array_len(id);
            if len > 0 {
                self.heap.array_resize(id, len - 1);
            }
        }
    }

    /* }}} */

    /* Unwinding {{{ */

    /// Propagates the pending exception: pops handlers and frames until a
    /// catch or finally takes over, or execution escapes to the host.
    /// When a handler is found, the owning frame's `ip` is pointed at it;
    /// the caller reloads its position.
    fn unwind_throw(&mut self, bottom: usize) -> Result<(), Throw> {
        loop {
            if self.frames.len() <= bottom {
                return Err(Throw);
            }
            let top = self.frames.len() - 1;
            if matches!(self.frames[top], Frame::Cfunc(_)) {
                return Err(Throw);
            }

            while let Some((tag, off, depth)) = self.peek_try(top) {
                match tag {
                    TryTag::Catch => {
                        self.stack.truncate(depth);
                        let thrown = self.take_thrown();
                        self.stack.push(thrown);
                        self.transfer_to(off);
                        return Ok(());
                    }
                    TryTag::Finally => {
                        self.stack.truncate(depth);
                        self.transfer_to(off);
                        return Ok(());
                    }
                    _ => self.pop_try_at(top),
                }
            }

            match self.frames.pop().expect("frame stack underflow") {
                Frame::Catch(_) => {}
                Frame::Bcode(f) => self.stack.truncate(f.stack_len),
                Frame::Cfunc(_) => unreachable!("checked above"),
            }
        }
    }

    /// Honors a pending `break`/`continue`: pops nested handlers until
    /// the right loop or switch record, detouring through finally blocks.
    /// `continue` binds only to loops, so it pops switch records on the
    /// way; `break` stops at either.
    fn unwind_break(&mut self, for_continue: bool) -> VmResult<()> {
        loop {
            if self.frames.is_empty() {
                return Err(self.internal_error("break outside of any frame"));
            }
            let top = self.frames.len() - 1;

            while let Some((tag, off, _depth)) = self.peek_try(top) {
                match tag {
                    TryTag::Switch if for_continue => self.pop_try_at(top),
                    TryTag::Loop | TryTag::Switch => {
                        self.flags.is_breaking = false;
                        self.transfer_to(off);
                        return Ok(());
                    }
                    TryTag::Finally => {
                        self.transfer_to(off);
                        return Ok(());
                    }
                    TryTag::Catch => self.pop_try_at(top),
                }
            }

            match &self.frames[top] {
                Frame::Catch(_) => {
                    self.frames.pop();
                }
                _ => return Err(self.internal_error("break with no enclosing loop")),
            }
        }
    }

    /// Honors a pending return: runs intervening finally blocks, then
    /// pops the bcode frame and delivers the value to the caller.
    fn unwind_return(&mut self, bottom: usize) -> VmResult<Flow> {
        loop {
            let top = self.frames.len() - 1;

            while let Some((tag, off, depth)) = self.peek_try(top) {
                match tag {
                    TryTag::Finally => {
                        self.stack.truncate(depth);
                        self.transfer_to(off);
                        return Ok(Flow::SwitchFrame);
                    }
                    _ => self.pop_try_at(top),
                }
            }

            match self.frames.pop().expect("frame stack underflow") {
                Frame::Catch(_) => {}
                Frame::Bcode(f) => {
                    self.stack.truncate(f.stack_len);
                    let mut result = self.vals.returned_value;
                    self.vals.returned_value = Value::Undefined;
                    self.flags.is_returned = false;
                    if f.is_constructor && !result.is_object() {
                        result = f.this_obj;
                    }
                    self.push(result)?;
                    if self.frames.len() <= bottom {
                        return Ok(Flow::Done);
                    }
                    return Ok(Flow::SwitchFrame);
                }
                Frame::Cfunc(_) => {
                    return Err(self.internal_error("return through native frame"))
                }
            }
        }
    }

    /// Points the innermost bcode frame at a handler offset; catch frames
    /// above it share its bcode, so only the ip moves.
    fn transfer_to(&mut self, off: u32) {
        if let Some(idx) = self.cur_bcode_frame() {
            if let Frame::Bcode(f) = &mut self.frames[idx] {
                f.ip = off as usize;
            }
        }
    }

    /* }}} */
}
