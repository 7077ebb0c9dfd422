//! Property access with full language semantics: prototype walks,
//! accessor invocation, primitive receivers, dense-array magic, scope
//! chains, `instanceof`, and enumeration.
//!
//! The heap crate owns the pieces that can never run user code; this
//! module composes them with getter/setter dispatch and coercions.

use crate::interp::{Interp, VmResult};
use core_types::{obj_attr, prop_attr, AttrDesc, CFuncId, ErrorKind, FuncId, ObjId, PropId, Value};
use gc_heap::PropData;

/// Name of the hidden slot carrying the native callable of a wrapped
/// constructor object. The 0x01 prefix keeps it untypeable from script.
pub(crate) const CFUNC_SLOT: &str = "\u{1}cfn";

/// Resolution of a callable value.
#[derive(Debug, Clone, Copy)]
pub(crate) enum CallTarget {
    Js(FuncId),
    Native(CFuncId),
}

/// Iteration handles passed around by `NEXT_PROP`: dense element cursors
/// are small integers, property cursors are offset by this base.
const PROP_HANDLE_BASE: usize = 1 << 32;

impl Interp {
    /* Callables {{{ */

    /// Resolves a value to something invocable.
    pub(crate) fn callable_slot(&self, v: Value) -> Option<CallTarget> {
        match v {
            Value::Function(id) => Some(CallTarget::Js(id)),
            Value::CFunc(id) => Some(CallTarget::Native(id)),
            Value::Object(_) => {
                let prop = self.heap.find_own_prop(v, CFUNC_SLOT.as_bytes())?;
                match self.heap.prop(prop).data {
                    PropData::Value(Value::CFunc(id)) => Some(CallTarget::Native(id)),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Whether the value can be called.
    pub fn is_callable(&self, v: Value) -> bool {
        self.callable_slot(v).is_some()
    }

    /// Whether the value is a dense array.
    pub fn is_array(&self, v: Value) -> bool {
        self.heap.is_dense_array(v)
    }

    /* }}} */

    /* Prototype plumbing {{{ */

    /// The prototype of a value, `Null` at the end of a chain. Function
    /// objects never store one; theirs is the engine's function
    /// prototype.
    pub fn get_proto(&self, v: Value) -> Value {
        match v {
            Value::Object(id) => self.heap.object(id).proto,
            Value::Function(_) | Value::CFunc(_) => self.vals.function_prototype,
            Value::Regexp(_) => self.vals.regexp_prototype,
            _ => Value::Null,
        }
    }

    /// Replaces the prototype of a generic object. Returns false without
    /// throwing for function objects and non-objects.
    pub fn set_proto(&mut self, v: Value, proto: Value) -> bool {
        match v {
            Value::Object(id) if proto.is_generic_object() || proto.is_null() => {
                self.heap.object_mut(id).proto = proto;
                true
            }
            _ => false,
        }
    }

    /// The object whose property lists a lookup on `v` starts at, routing
    /// primitive receivers to their prototype objects.
    fn lookup_container(&mut self, v: Value, name: &str) -> VmResult<Value> {
        match v {
            Value::Object(_) | Value::Function(_) => Ok(v),
            Value::Undefined => Err(self.throwf(
                ErrorKind::TypeError,
                &format!("cannot read property '{}' of undefined", name),
            )),
            Value::Null => Err(self.throwf(
                ErrorKind::TypeError,
                &format!("cannot read property '{}' of null", name),
            )),
            Value::Bool(_) => Ok(self.vals.boolean_prototype),
            Value::Number(_) => Ok(self.vals.number_prototype),
            Value::CFunc(_) => Ok(self.vals.function_prototype),
            Value::Regexp(_) => Ok(self.vals.regexp_prototype),
            _ if v.is_string() => Ok(self.vals.string_prototype),
            _ => Ok(self.vals.object_prototype),
        }
    }

    /* }}} */

    /* Reads {{{ */

    /// Property read with full semantics; `name` is coerced to a string.
    pub fn get_v(&mut self, mut obj: Value, name: Value) -> VmResult<Value> {
        let name_v = if name.is_string() {
            name
        } else {
            // Coercion may run user code; a string receiver could be
            // relocated by a collection in the meantime.
            self.tmp_roots.push(obj);
            let coerced = self.to_string_v(name);
            obj = self.tmp_roots.pop().expect("tmp root imbalance");
            coerced?
        };
        self.vals.last_name = name_v;
        let name_text = self.heap.str_text(&name_v).unwrap_or("").to_string();

        // Subscripting strings yields characters and a length.
        if obj.is_string() {
            let text = self.heap.str_text(&obj).unwrap_or("").to_string();
            if name_text == "length" {
                return Ok(Value::Number(text.chars().count() as f64));
            }
            if let Some(idx) = parse_index(&name_text) {
                if let Some(ch) = text.chars().nth(idx) {
                    let mut buf = [0u8; 4];
                    return Ok(self.heap.mk_string(ch.encode_utf8(&mut buf)));
                }
                return Ok(Value::Undefined);
            }
        }

        // Regexp instances answer their flag properties directly.
        if let Value::Regexp(id) = obj {
            match name_text.as_str() {
                "source" => {
                    let source = self.heap.regexp(id).source.clone();
                    return Ok(self.heap.mk_string(&source));
                }
                "global" => return Ok(Value::Bool(self.heap.regexp(id).flags.global)),
                "ignoreCase" => {
                    return Ok(Value::Bool(self.heap.regexp(id).flags.ignore_case))
                }
                "multiline" => return Ok(Value::Bool(self.heap.regexp(id).flags.multiline)),
                "lastIndex" => {
                    return Ok(Value::Number(self.heap.regexp(id).last_index as f64))
                }
                _ => {}
            }
        }

        let container = self.lookup_container(obj, &name_text)?;

        // Dense arrays bypass property lookup for indexed access.
        if let Value::Object(id) = container {
            if self.heap.object(id).attrs & obj_attr::DENSE_ARRAY != 0 {
                if name_text == "length" {
                    return Ok(Value::Number(self.heap.array_len(id) as f64));
                }
                if let Some(idx) = parse_index(&name_text) {
                    let v = self.heap.array_get(id, idx);
                    return Ok(if v.is_novalue() { Value::Undefined } else { v });
                }
            }
        }

        // Function objects derive their `prototype` lazily.
        if container.is_function() && name_text == "prototype" {
            return self.func_prototype_prop(container);
        }

        let mut cur = container;
        while cur.is_object() {
            if let Some(prop) = self.heap.find_own_prop(cur, name_text.as_bytes()) {
                let p = self.heap.prop(prop);
                if p.attrs & prop_attr::HIDDEN == 0 {
                    return self.property_value(obj, prop);
                }
            }
            cur = self.get_proto(cur);
        }
        Ok(Value::Undefined)
    }

    /// The value of a property, invoking its getter if it is an accessor.
    pub(crate) fn property_value(&mut self, receiver: Value, prop: PropId) -> VmResult<Value> {
        match self.heap.prop(prop).data {
            PropData::Value(v) => Ok(v),
            PropData::Accessor { getter, .. } => {
                if getter.is_undefined() {
                    Ok(Value::Undefined)
                } else {
                    self.apply_internal(getter, receiver, &[])
                }
            }
        }
    }

    /// Own-property read without prototype walk or accessor dispatch; the
    /// raw stored value.
    pub fn get_own_property(&self, obj: Value, name: &str) -> Option<Value> {
        let prop = self.heap.find_own_prop(obj, name.as_bytes())?;
        let p = self.heap.prop(prop);
        if p.attrs & prop_attr::HIDDEN != 0 {
            return None;
        }
        Some(p.data.raw())
    }

    /// Lazily materializes `func.prototype`.
    pub(crate) fn func_prototype_prop(&mut self, func: Value) -> VmResult<Value> {
        if let Some(prop) = self.heap.find_own_prop(func, b"prototype") {
            return Ok(self.heap.prop(prop).data.raw());
        }
        let obj = Value::Object(self.alloc_object(self.vals.object_prototype)?);
        self.tmp_roots.push(obj);
        let name = self.heap.mk_string("constructor");
        let r = self.alloc_prop(
            obj,
            name,
            PropData::Value(func),
            prop_attr::NON_ENUMERABLE,
        );
        let obj = self.tmp_roots.pop().expect("tmp root imbalance");
        r?;
        let proto_name = self.heap.mk_string("prototype");
        self.alloc_prop(
            func,
            proto_name,
            PropData::Value(obj),
            prop_attr::NON_ENUMERABLE,
        )?;
        Ok(obj)
    }

    /* }}} */

    /* Writes {{{ */

    /// Plain assignment semantics.
    pub(crate) fn set_v(&mut self, obj: Value, name: Value, value: Value) -> VmResult<()> {
        self.def_property_v(obj, name, value, AttrDesc::new(), true)
            .map(|_| ())
    }

    /// `[[DefineOwnProperty]]` / assignment. `as_assign` selects the
    /// assignment rules (setter dispatch, silent failures outside strict
    /// mode). Returns whether a property was created or updated.
    pub(crate) fn def_property_v(
        &mut self,
        obj: Value,
        name: Value,
        mut value: Value,
        desc: AttrDesc,
        as_assign: bool,
    ) -> VmResult<bool> {
        let name_v = if name.is_string() {
            name
        } else {
            // Coercion may run user code; keep the incoming value rooted
            // while it does.
            self.tmp_roots.push(value);
            let coerced = self.to_string_v(name);
            value = self.tmp_roots.pop().expect("tmp root imbalance");
            coerced?
        };
        let name_text = self.heap.str_text(&name_v).unwrap_or("").to_string();

        // Assignments to regexp lastIndex are meaningful; everything else
        // about primitives silently no-ops, as assignment always has.
        if let Value::Regexp(id) = obj {
            if name_text == "lastIndex" {
                let n = self.to_number_v(value)?;
                self.heap.regexp_mut(id).last_index = if n.is_finite() && n >= 0.0 {
                    n as usize
                } else {
                    0
                };
                return Ok(true);
            }
            return Ok(false);
        }
        if !obj.is_object() {
            return Ok(false);
        }

        // Dense-array element and length handling.
        if let Value::Object(id) = obj {
            if self.heap.object(id).attrs & obj_attr::DENSE_ARRAY != 0 {
                if let Some(idx) = parse_index(&name_text) {
                    self.heap.array_set(id, idx, value);
                    return Ok(true);
                }
                if name_text == "length" {
                    return self.set_array_length(id, value).map(|_| true);
                }
            }
        }

        match self.heap.find_own_prop(obj, name_text.as_bytes()) {
            None => {
                if self.heap.obj_attrs(obj) & obj_attr::NOT_EXTENSIBLE != 0 {
                    if self.is_strict_mode() || !as_assign {
                        return Err(
                            self.throwf(ErrorKind::TypeError, "object is not extensible")
                        );
                    }
                    return Ok(false);
                }
                let data = self.build_prop_data(value, desc);
                let attrs = desc.apply(0);
                self.alloc_prop(obj, name_v, data, attrs)?;
                Ok(true)
            }
            Some(prop) => {
                let old_attrs = self.heap.prop(prop).attrs;
                let old_data = self.heap.prop(prop).data;

                if old_attrs & prop_attr::NON_WRITABLE != 0 {
                    if as_assign {
                        if self.is_strict_mode() {
                            return Err(self.throwf(
                                ErrorKind::TypeError,
                                &format!("'{}' is read-only", name_text),
                            ));
                        }
                        return Ok(false);
                    }
                    if old_attrs & prop_attr::NON_CONFIGURABLE != 0 && !desc.preserve_value {
                        // Redefining a sealed property is allowed only
                        // with an identical value.
                        let same = self.strict_equals(old_data.raw(), value);
                        if !same {
                            return Err(self.throwf(
                                ErrorKind::TypeError,
                                &format!("cannot redefine '{}'", name_text),
                            ));
                        }
                    }
                } else if as_assign {
                    if let PropData::Accessor { setter, .. } = old_data {
                        if self.is_callable(setter) {
                            self.apply_internal(setter, obj, &[value])?;
                            return Ok(true);
                        }
                        if self.is_strict_mode() {
                            return Err(self.throwf(
                                ErrorKind::TypeError,
                                &format!("'{}' has no setter", name_text),
                            ));
                        }
                        return Ok(false);
                    }
                }

                if !desc.preserve_value {
                    let data = self.build_prop_data(value, desc);
                    self.heap.prop_mut(prop).data = data;
                }
                self.heap.prop_mut(prop).attrs = desc.apply(old_attrs);
                Ok(true)
            }
        }
    }

    /// Shapes the stored payload from a value plus descriptor bits. When
    /// both accessor bits are set the value is a two-element array
    /// carrying getter and setter.
    fn build_prop_data(&self, value: Value, desc: AttrDesc) -> PropData {
        let getter_bit = desc.mask & desc.bits & prop_attr::GETTER != 0;
        let setter_bit = desc.mask & desc.bits & prop_attr::SETTER != 0;
        match (getter_bit, setter_bit) {
            (true, true) => {
                if let Value::Object(id) = value {
                    let getter = self.heap.array_get(id, 0);
                    let setter = self.heap.array_get(id, 1);
                    PropData::Accessor {
                        getter: if getter.is_novalue() { Value::Undefined } else { getter },
                        setter: if setter.is_novalue() { Value::Undefined } else { setter },
                    }
                } else {
                    PropData::Accessor {
                        getter: value,
                        setter: Value::Undefined,
                    }
                }
            }
            (true, false) => PropData::Accessor {
                getter: value,
                setter: Value::Undefined,
            },
            (false, true) => PropData::Accessor {
                getter: Value::Undefined,
                setter: value,
            },
            (false, false) => PropData::Value(value),
        }
    }

    /// `array.length = n`: truncation deletes trailing elements; growth
    /// defines an undefined element at the new end so enumeration sees
    /// the gap.
    pub(crate) fn set_array_length(&mut self, id: ObjId, value: Value) -> VmResult<()> {
        let n = self.to_number_v(value)?;
        if !(n.is_finite() && n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64) {
            return Err(self.throwf(ErrorKind::RangeError, "invalid array length"));
        }
        let new_len = n as usize;
        let cur_len = self.heap.array_len(id);
        if new_len < cur_len {
            self.heap.array_resize(id, new_len);
        } else if new_len > cur_len {
            self.heap.array_set(id, new_len - 1, Value::Undefined);
        }
        Ok(())
    }

    /* }}} */

    /* Deletion {{{ */

    /// Removes an own property. The only failure is a non-configurable
    /// property; the caller decides whether that throws.
    pub(crate) fn delete_v(&mut self, obj: Value, name: Value) -> VmResult<bool> {
        let name_text = self.to_string_text(name)?;
        if !obj.is_object() {
            return Ok(true);
        }
        if let Value::Object(id) = obj {
            if self.heap.object(id).attrs & obj_attr::DENSE_ARRAY != 0 {
                if let Some(idx) = parse_index(&name_text) {
                    self.heap.array_del(id, idx);
                    return Ok(true);
                }
            }
        }
        match self.heap.find_own_prop(obj, name_text.as_bytes()) {
            None => Ok(true),
            Some(prop) => {
                if self.heap.prop(prop).attrs & prop_attr::NON_CONFIGURABLE != 0 {
                    return Ok(false);
                }
                Ok(self.heap.unlink_prop(obj, name_text.as_bytes()))
            }
        }
    }

    /* }}} */

    /* Enumeration {{{ */

    /// Advances property enumeration. The handle starts as `Null`; each
    /// call yields the next enumerable own key. Dense arrays yield their
    /// indices first, then listed properties, in insertion order.
    pub(crate) fn next_prop_engine(
        &mut self,
        obj: Value,
        handle: Value,
    ) -> Option<(Value, Value)> {
        if !obj.is_object() {
            return None;
        }
        let dense = obj
            .as_object()
            .filter(|id| self.heap.object(*id).attrs & obj_attr::DENSE_ARRAY != 0);

        // Decode the cursor.
        let (mut elem_cursor, prop_cursor) = match handle {
            Value::Null => (Some(0usize), None),
            Value::Foreign(h) if h >= PROP_HANDLE_BASE => {
                (None, Some(PropId((h - PROP_HANDLE_BASE) as u32)))
            }
            Value::Foreign(h) => (Some(h), None),
            _ => (Some(0), None),
        };
        if dense.is_none() {
            elem_cursor = elem_cursor.map(|_| usize::MAX);
        }

        // Dense phase: scan for the next non-hole element.
        if let (Some(id), Some(start)) = (dense, elem_cursor) {
            let len = self.heap.array_len(id);
            let mut i = start;
            while i < len {
                if !self.heap.array_get(id, i).is_novalue() {
                    let key = self.heap.mk_string(&i.to_string());
                    return Some((Value::Foreign(i + 1), key));
                }
                i += 1;
            }
        }

        // Property-list phase.
        let mut cur = match prop_cursor {
            // The cursor cell may have been deleted and swept since the
            // previous step; end the walk rather than chase a stale link.
            Some(last) if !self.heap.prop_is_live(last) => None,
            Some(last) => self.heap.prop(last).next,
            None => self.heap.prop_list(obj)?.head,
        };
        while let Some(id) = cur {
            let p = self.heap.prop(id);
            if p.attrs & (prop_attr::NON_ENUMERABLE | prop_attr::HIDDEN) == 0 {
                return Some((
                    Value::Foreign(PROP_HANDLE_BASE + id.0 as usize),
                    p.name,
                ));
            }
            cur = p.next;
        }
        None
    }

    /* }}} */

    /* instanceof and `in` {{{ */

    pub(crate) fn instanceof(&mut self, v: Value, ctor: Value) -> VmResult<bool> {
        if !self.is_callable(ctor) {
            return Err(self.throwf(
                ErrorKind::TypeError,
                "expecting a function in instanceof check",
            ));
        }
        let proto = if ctor.is_function() {
            self.func_prototype_prop(ctor)?
        } else {
            let name = self.mk_str_value("prototype");
            self.get_v(ctor, name)?
        };
        if !proto.is_object() {
            return Ok(false);
        }
        let mut cur = self.get_proto(v);
        while cur.is_object() {
            if cur.identical(&proto) {
                return Ok(true);
            }
            cur = self.get_proto(cur);
        }
        Ok(false)
    }

    /// Public instance check mirroring script `instanceof`.
    pub fn is_instance_of(&mut self, v: Value, ctor: Value) -> VmResult<bool> {
        self.instanceof(v, ctor)
    }

    /// The `in` operator: own or inherited, enumerable or not.
    pub(crate) fn has_property(&mut self, name: Value, obj: Value) -> VmResult<bool> {
        if !obj.is_object() {
            return Err(self.throwf(
                ErrorKind::TypeError,
                "cannot use 'in' operator on a non-object",
            ));
        }
        let name_text = self.to_string_text(name)?;
        if let Value::Object(id) = obj {
            if self.heap.object(id).attrs & obj_attr::DENSE_ARRAY != 0 {
                if let Some(idx) = parse_index(&name_text) {
                    return Ok(!self.heap.array_get(id, idx).is_novalue());
                }
                if name_text == "length" {
                    return Ok(true);
                }
            }
        }
        let mut cur = obj;
        while cur.is_object() {
            if let Some(prop) = self.heap.find_own_prop(cur, name_text.as_bytes()) {
                if self.heap.prop(prop).attrs & prop_attr::HIDDEN == 0 {
                    return Ok(true);
                }
            }
            cur = self.get_proto(cur);
        }
        Ok(false)
    }

    /* }}} */

    /* Scope chain variable access {{{ */

    /// Finds the scope-chain object holding `name`.
    fn lookup_var_holder(&self, name: &str) -> Option<Value> {
        let mut cur = Value::Object(self.scope());
        while cur.is_object() {
            if self.heap.find_own_prop(cur, name.as_bytes()).is_some() {
                return Some(cur);
            }
            cur = self.get_proto(cur);
        }
        None
    }

    /// Identifier read; missing identifiers raise `ReferenceError`.
    pub(crate) fn get_var(&mut self, name: Value) -> VmResult<Value> {
        self.vals.last_name = name;
        let text = self.heap.str_text(&name).unwrap_or("").to_string();
        match self.lookup_var_holder(&text) {
            Some(holder) => self.get_v(holder, name),
            None => Err(self.throwf(
                ErrorKind::ReferenceError,
                &format!("{} is not defined", text),
            )),
        }
    }

    /// Identifier read that yields `undefined` when missing (`typeof`).
    pub(crate) fn safe_get_var(&mut self, name: Value) -> VmResult<Value> {
        let text = self.heap.str_text(&name).unwrap_or("").to_string();
        match self.lookup_var_holder(&text) {
            Some(holder) => self.get_v(holder, name),
            None => Ok(Value::Undefined),
        }
    }

    /// Identifier write. Creates a global in sloppy mode; strict mode
    /// requires an existing binding.
    pub(crate) fn set_var(&mut self, name: Value, value: Value) -> VmResult<()> {
        let text = self.heap.str_text(&name).unwrap_or("").to_string();
        match self.lookup_var_holder(&text) {
            Some(holder) => self.set_v(holder, name, value),
            None if self.is_strict_mode() => Err(self.throwf(
                ErrorKind::ReferenceError,
                &format!("{} is not defined", text),
            )),
            None => {
                let global = self.vals.global;
                self.set_v(global, name, value)
            }
        }
    }

    /// `delete identifier` (sloppy mode only; rejected at compile time in
    /// strict mode).
    pub(crate) fn delete_var(&mut self, name: Value) -> VmResult<bool> {
        let text = self.heap.str_text(&name).unwrap_or("").to_string();
        match self.lookup_var_holder(&text) {
            Some(holder) => self.delete_v(holder, name),
            None => Ok(true),
        }
    }

    /* }}} */
}

/// Parses a canonical array index.
pub(crate) fn parse_index(text: &str) -> Option<usize> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if text.len() > 1 && text.starts_with('0') {
        return None;
    }
    text.parse::<usize>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_index() {
        assert_eq!(parse_index("0"), Some(0));
        assert_eq!(parse_index("42"), Some(42));
        assert_eq!(parse_index("01"), None);
        assert_eq!(parse_index("-1"), None);
        assert_eq!(parse_index("x"), None);
        assert_eq!(parse_index(""), None);
    }

    #[test]
    fn test_get_set_roundtrip() {
        let mut interp = Interp::new();
        let obj = Value::Object(interp.alloc_object(interp.vals.object_prototype).unwrap());
        let name = interp.heap.mk_string("answer");
        interp.set_v(obj, name, Value::Number(42.0)).unwrap();
        let got = interp.get_v(obj, name).unwrap();
        assert_eq!(got.as_number(), Some(42.0));
    }

    #[test]
    fn test_prototype_walk() {
        let mut interp = Interp::new();
        let proto = Value::Object(interp.alloc_object(interp.vals.object_prototype).unwrap());
        let name = interp.heap.mk_string("shared");
        interp.set_v(proto, name, Value::Bool(true)).unwrap();
        let obj = Value::Object(interp.alloc_object(proto).unwrap());
        assert_eq!(interp.get_v(obj, name).unwrap().as_bool(), Some(true));
        // Own lookup does not walk.
        assert!(interp.get_own_property(obj, "shared").is_none());
    }

    #[test]
    fn test_read_of_missing_on_null_throws() {
        let mut interp = Interp::new();
        let name = interp.heap.mk_string("x");
        assert!(interp.get_v(Value::Null, name).is_err());
        assert!(interp.get_v(Value::Undefined, name).is_err());
        interp.clear_thrown_value();
    }

    #[test]
    fn test_readonly_assignment_is_silent_outside_strict() {
        let mut interp = Interp::new();
        let obj = Value::Object(interp.alloc_object(interp.vals.object_prototype).unwrap());
        let name = interp.heap.mk_string("x");
        interp.set_v(obj, name, Value::Number(1.0)).unwrap();
        interp
            .def_property_v(
                obj,
                name,
                Value::Undefined,
                AttrDesc::new().writable(false).preserve_value(),
                false,
            )
            .unwrap();
        interp.set_v(obj, name, Value::Number(2.0)).unwrap();
        assert_eq!(interp.get_v(obj, name).unwrap().as_number(), Some(1.0));
    }

    #[test]
    fn test_delete_rules() {
        let mut interp = Interp::new();
        let obj = Value::Object(interp.alloc_object(interp.vals.object_prototype).unwrap());
        let name = interp.heap.mk_string("gone");
        interp.set_v(obj, name, Value::Bool(true)).unwrap();
        assert!(interp.delete_v(obj, name).unwrap());
        // Deleting a missing property succeeds.
        assert!(interp.delete_v(obj, name).unwrap());
        // Non-configurable properties refuse.
        let sealed = interp.heap.mk_string("sealed");
        interp
            .def_property_v(
                obj,
                sealed,
                Value::Number(0.0),
                AttrDesc::new().configurable(false),
                false,
            )
            .unwrap();
        assert!(!interp.delete_v(obj, sealed).unwrap());
    }

    #[test]
    fn test_array_length_magic() {
        let mut interp = Interp::new();
        let arr = interp.alloc_array().unwrap();
        let arr_v = Value::Object(arr);
        for i in 0..4 {
            interp.heap.array_push(arr, Value::Number(i as f64));
        }
        let len_name = interp.heap.mk_string("length");
        let len = interp.get_v(arr_v, len_name).unwrap();
        assert_eq!(len.as_number(), Some(4.0));
        // Truncation.
        interp.set_v(arr_v, len_name, Value::Number(2.0)).unwrap();
        assert_eq!(interp.heap.array_len(arr), 2);
        // Growth defines an undefined element at the end.
        interp.set_v(arr_v, len_name, Value::Number(5.0)).unwrap();
        assert_eq!(interp.heap.array_len(arr), 5);
        assert!(interp.heap.array_get(arr, 4).is_undefined());
        assert!(interp.heap.array_get(arr, 3).is_novalue());
        // Bad lengths throw RangeError.
        assert!(interp.set_v(arr_v, len_name, Value::Number(-1.0)).is_err());
        interp.clear_thrown_value();
    }

    #[test]
    fn test_enumeration_order_and_holes() {
        let mut interp = Interp::new();
        let arr = interp.alloc_array().unwrap();
        let arr_v = Value::Object(arr);
        interp.heap.array_push(arr, Value::Number(1.0));
        interp.heap.array_push(arr, Value::Novalue);
        interp.heap.array_push(arr, Value::Number(3.0));
        let extra = interp.heap.mk_string("tag");
        interp.set_v(arr_v, extra, Value::Bool(true)).unwrap();

        let mut keys = Vec::new();
        let mut handle = Value::Null;
        while let Some((next, key)) = interp.next_prop_engine(arr_v, handle) {
            keys.push(interp.heap.str_text(&key).unwrap().to_string());
            handle = next;
        }
        assert_eq!(keys, ["0", "2", "tag"]);
    }

    #[test]
    fn test_string_subscripting() {
        let mut interp = Interp::new();
        let s = interp.heap.mk_string("abc");
        let idx = interp.heap.mk_string("1");
        let ch = interp.get_v(s, idx).unwrap();
        assert_eq!(interp.heap.str_text(&ch), Some("b"));
        let len_name = interp.heap.mk_string("length");
        assert_eq!(interp.get_v(s, len_name).unwrap().as_number(), Some(3.0));
    }
}
