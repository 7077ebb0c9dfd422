//! The engine heap: arenas, allocation, string creation, and the
//! user-code-free object model primitives.

use crate::object::{Destructor, FuncData, ObjData, Prop, PropData, PropList};
use crate::regexp::RegexpData;
use crate::strings::{dict, StrBuf};
use bytecode::Bcode;
use core_types::{obj_attr, FuncId, ObjAttrs, ObjId, PropAttrs, PropId, RegexpId, Value};
use std::any::Any;
use std::rc::Rc;

/// Arena sizing. Each arena may grow up to its cap; allocation past the cap
/// fails, which the engine answers with a collection and a retry.
#[derive(Debug, Clone, Copy)]
pub struct HeapOptions {
    /// Maximum generic-object cells.
    pub object_arena_size: usize,
    /// Maximum closure cells.
    pub function_arena_size: usize,
    /// Maximum property cells.
    pub property_arena_size: usize,
    /// Owned-string bytes that arm the lazy-collection flag.
    pub string_gc_threshold: usize,
}

impl Default for HeapOptions {
    fn default() -> Self {
        HeapOptions {
            object_arena_size: 16 * 1024,
            function_arena_size: 4 * 1024,
            property_arena_size: 64 * 1024,
            string_gc_threshold: 256 * 1024,
        }
    }
}

/// All garbage-collected state of one engine instance.
pub struct Heap {
    pub(crate) opts: HeapOptions,

    pub(crate) objects: Vec<Option<ObjData>>,
    pub(crate) obj_free: Vec<u32>,
    pub(crate) obj_marks: Vec<bool>,

    pub(crate) funcs: Vec<Option<FuncData>>,
    pub(crate) func_free: Vec<u32>,
    pub(crate) func_marks: Vec<bool>,

    pub(crate) props: Vec<Option<Prop>>,
    pub(crate) prop_free: Vec<u32>,
    pub(crate) prop_marks: Vec<bool>,

    pub(crate) regexps: Vec<Option<RegexpData>>,
    pub(crate) regexp_marks: Vec<bool>,

    pub(crate) strings: StrBuf,
    pub(crate) foreign_strs: Vec<&'static str>,

    need_gc: bool,
}

impl Heap {
    pub fn new(opts: HeapOptions) -> Heap {
        Heap {
            opts,
            objects: Vec::new(),
            obj_free: Vec::new(),
            obj_marks: Vec::new(),
            funcs: Vec::new(),
            func_free: Vec::new(),
            func_marks: Vec::new(),
            props: Vec::new(),
            prop_free: Vec::new(),
            prop_marks: Vec::new(),
            regexps: Vec::new(),
            regexp_marks: Vec::new(),
            strings: StrBuf::new(),
            foreign_strs: Vec::new(),
            need_gc: false,
        }
    }

    /// True when a collection at the next safe point would be worthwhile.
    pub fn need_gc(&self) -> bool {
        self.need_gc
    }

    pub(crate) fn set_need_gc(&mut self) {
        self.need_gc = true;
    }

    pub(crate) fn clear_need_gc(&mut self) {
        self.need_gc = false;
    }

    /* Allocation {{{ */

    /// Allocates a generic object with the given prototype. `None` means
    /// the arena is exhausted.
    pub fn new_object(&mut self, proto: Value) -> Option<ObjId> {
        let data = ObjData::new(proto);
        if let Some(idx) = self.obj_free.pop() {
            self.objects[idx as usize] = Some(data);
            return Some(ObjId(idx));
        }
        if self.objects.len() >= self.opts.object_arena_size {
            self.need_gc = true;
            return None;
        }
        if self.objects.len() * 4 >= self.opts.object_arena_size * 3 {
            self.need_gc = true;
        }
        self.objects.push(Some(data));
        self.obj_marks.push(false);
        Some(ObjId(self.objects.len() as u32 - 1))
    }

    /// Allocates a dense array object.
    pub fn new_dense_array(&mut self, proto: Value) -> Option<ObjId> {
        let id = self.new_object(proto)?;
        let obj = self.object_mut(id);
        obj.attrs |= obj_attr::DENSE_ARRAY;
        obj.elems = Some(Vec::new());
        Some(id)
    }

    /// Allocates a closure cell. The scope is bound later, when the VM
    /// executes the function-literal binding opcode.
    pub fn new_function(&mut self, bcode: Rc<Bcode>) -> Option<FuncId> {
        let data = FuncData {
            props: PropList::default(),
            attrs: obj_attr::FUNCTION,
            scope: None,
            bcode,
        };
        if let Some(idx) = self.func_free.pop() {
            self.funcs[idx as usize] = Some(data);
            return Some(FuncId(idx));
        }
        if self.funcs.len() >= self.opts.function_arena_size {
            self.need_gc = true;
            return None;
        }
        self.funcs.push(Some(data));
        self.func_marks.push(false);
        Some(FuncId(self.funcs.len() as u32 - 1))
    }

    /// Allocates a property cell, not yet linked to any object.
    pub fn new_prop(&mut self, name: Value, data: PropData, attrs: PropAttrs) -> Option<PropId> {
        let prop = Prop {
            name,
            data,
            attrs,
            next: None,
        };
        if let Some(idx) = self.prop_free.pop() {
            self.props[idx as usize] = Some(prop);
            return Some(PropId(idx));
        }
        if self.props.len() >= self.opts.property_arena_size {
            self.need_gc = true;
            return None;
        }
        self.props.push(Some(prop));
        self.prop_marks.push(false);
        Some(PropId(self.props.len() as u32 - 1))
    }

    /// Registers a compiled regular expression.
    pub fn new_regexp(&mut self, data: RegexpData) -> RegexpId {
        self.regexps.push(Some(data));
        self.regexp_marks.push(false);
        RegexpId(self.regexps.len() as u32 - 1)
    }

    /* }}} */

    /* Cell access {{{ */

    pub fn object(&self, id: ObjId) -> &ObjData {
        self.objects[id.0 as usize].as_ref().expect("stale object handle")
    }

    pub fn object_mut(&mut self, id: ObjId) -> &mut ObjData {
        self.objects[id.0 as usize].as_mut().expect("stale object handle")
    }

    pub fn func(&self, id: FuncId) -> &FuncData {
        self.funcs[id.0 as usize].as_ref().expect("stale function handle")
    }

    pub fn func_mut(&mut self, id: FuncId) -> &mut FuncData {
        self.funcs[id.0 as usize].as_mut().expect("stale function handle")
    }

    pub fn prop(&self, id: PropId) -> &Prop {
        self.props[id.0 as usize].as_ref().expect("stale property handle")
    }

    /// Whether a property cell is still allocated. Enumeration cursors can
    /// outlive their cell when script deletes during iteration.
    pub fn prop_is_live(&self, id: PropId) -> bool {
        self.props
            .get(id.0 as usize)
            .map_or(false, Option::is_some)
    }

    pub fn prop_mut(&mut self, id: PropId) -> &mut Prop {
        self.props[id.0 as usize].as_mut().expect("stale property handle")
    }

    pub fn regexp(&self, id: RegexpId) -> &RegexpData {
        self.regexps[id.0 as usize].as_ref().expect("stale regexp handle")
    }

    pub fn regexp_mut(&mut self, id: RegexpId) -> &mut RegexpData {
        self.regexps[id.0 as usize].as_mut().expect("stale regexp handle")
    }

    /// The property list of an object or function value.
    pub fn prop_list(&self, container: Value) -> Option<PropList> {
        match container {
            Value::Object(id) => Some(self.object(id).props),
            Value::Function(id) => Some(self.func(id).props),
            _ => None,
        }
    }

    fn prop_list_mut(&mut self, container: Value) -> Option<&mut PropList> {
        match container {
            Value::Object(id) => Some(&mut self.object_mut(id).props),
            Value::Function(id) => Some(&mut self.func_mut(id).props),
            _ => None,
        }
    }

    /// Object-level attributes of an object or function value.
    pub fn obj_attrs(&self, container: Value) -> ObjAttrs {
        match container {
            Value::Object(id) => self.object(id).attrs,
            Value::Function(id) => self.func(id).attrs,
            _ => 0,
        }
    }

    /* }}} */

    /* Strings {{{ */

    /// Makes a string value, copying the bytes into engine storage unless
    /// they fit inline or match a dictionary entry.
    pub fn mk_string(&mut self, s: &str) -> Value {
        let bytes = s.as_bytes();
        if let Some(v) = Value::inline_str(bytes) {
            return v;
        }
        if let Some(idx) = dict::lookup(bytes) {
            return Value::StrDict(idx);
        }
        if self.strings.len() >= self.opts.string_gc_threshold {
            self.need_gc = true;
        }
        Value::StrOwned(self.strings.append(bytes))
    }

    /// Makes a string value over caller-owned bytes without copying.
    /// Short strings are still inlined.
    pub fn mk_string_foreign(&mut self, s: &'static str) -> Value {
        if let Some(v) = Value::inline_str(s.as_bytes()) {
            return v;
        }
        if let Some(idx) = dict::lookup(s.as_bytes()) {
            return Value::StrDict(idx);
        }
        self.foreign_strs.push(s);
        Value::StrForeign(self.foreign_strs.len() as u32 - 1)
    }

    /// Returns the bytes of a string value, borrowing either from the value
    /// itself (inline kinds) or from engine storage. Never allocates.
    pub fn str_bytes<'a>(&'a self, v: &'a Value) -> Option<&'a [u8]> {
        match v {
            Value::StrShort { .. } | Value::Str5(_) => v.inline_str_bytes(),
            Value::StrOwned(off) => Some(self.strings.read(*off)),
            Value::StrForeign(idx) => Some(self.foreign_strs[*idx as usize].as_bytes()),
            Value::StrDict(idx) => Some(dict::entry(*idx).as_bytes()),
            _ => None,
        }
    }

    /// Returns the text of a string value.
    pub fn str_text<'a>(&'a self, v: &'a Value) -> Option<&'a str> {
        self.str_bytes(v).map(|b| std::str::from_utf8(b).unwrap_or(""))
    }

    /// Byte-content equality across any pair of string kinds.
    pub fn str_eq(&self, a: &Value, b: &Value) -> bool {
        match (self.str_bytes(a), self.str_bytes(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    /* }}} */

    /* Properties {{{ */

    /// Own-property lookup by name bytes; no prototype walk. Names that fit
    /// inline are compared by inline-string identity, longer ones by byte
    /// content.
    pub fn find_own_prop(&self, container: Value, name: &[u8]) -> Option<PropId> {
        let list = self.prop_list(container)?;
        if let Some(probe) = Value::inline_str(name) {
            let mut cur = list.head;
            while let Some(id) = cur {
                let p = self.prop(id);
                if p.name.identical(&probe) {
                    return Some(id);
                }
                cur = p.next;
            }
            None
        } else {
            let mut cur = list.head;
            while let Some(id) = cur {
                let p = self.prop(id);
                if self.str_bytes(&p.name) == Some(name) {
                    return Some(id);
                }
                cur = p.next;
            }
            None
        }
    }

    /// Appends a property cell at the tail of the container's list.
    pub fn append_prop(&mut self, container: Value, prop: PropId) {
        let list = self.prop_list(container).expect("not a property container");
        match list.tail {
            Some(tail) => {
                self.prop_mut(tail).next = Some(prop);
            }
            None => {
                self.prop_list_mut(container).unwrap().head = Some(prop);
            }
        }
        self.prop_list_mut(container).unwrap().tail = Some(prop);
    }

    /// Unlinks an own property by name; the cell becomes garbage for the
    /// next collection. Returns false when there is no such property.
    pub fn unlink_prop(&mut self, container: Value, name: &[u8]) -> bool {
        let list = match self.prop_list(container) {
            Some(l) => l,
            None => return false,
        };
        let mut prev: Option<PropId> = None;
        let mut cur = list.head;
        while let Some(id) = cur {
            let p = *self.prop(id);
            let matches = match Value::inline_str(name) {
                Some(probe) => p.name.identical(&probe),
                None => self.str_bytes(&p.name) == Some(name),
            };
            if matches {
                match prev {
                    Some(pid) => self.prop_mut(pid).next = p.next,
                    None => self.prop_list_mut(container).unwrap().head = p.next,
                }
                if list.tail == Some(id) {
                    self.prop_list_mut(container).unwrap().tail = prev;
                }
                return true;
            }
            prev = cur;
            cur = p.next;
        }
        false
    }

    /* }}} */

    /* Dense arrays {{{ */

    /// Whether the value is a dense array.
    pub fn is_dense_array(&self, v: Value) -> bool {
        matches!(v, Value::Object(id) if self.object(id).attrs & obj_attr::DENSE_ARRAY != 0)
    }

    /// Element count of a dense array.
    pub fn array_len(&self, id: ObjId) -> usize {
        self.object(id).elems.as_ref().map_or(0, |e| e.len())
    }

    /// Reads an element; holes and out-of-range reads yield `Novalue`.
    pub fn array_get(&self, id: ObjId, idx: usize) -> Value {
        self.object(id)
            .elems
            .as_ref()
            .and_then(|e| e.get(idx).copied())
            .unwrap_or(Value::Novalue)
    }

    /// Writes an element. A write at the current length grows the buffer by
    /// one; a write past it fills the gap with holes.
    pub fn array_set(&mut self, id: ObjId, idx: usize, v: Value) {
        let elems = self
            .object_mut(id)
            .elems
            .as_mut()
            .expect("dense array without backing buffer");
        if idx < elems.len() {
            elems[idx] = v;
        } else {
            while elems.len() < idx {
                elems.push(Value::Novalue);
            }
            elems.push(v);
        }
    }

    /// Appends an element.
    pub fn array_push(&mut self, id: ObjId, v: Value) {
        let elems = self
            .object_mut(id)
            .elems
            .as_mut()
            .expect("dense array without backing buffer");
        elems.push(v);
    }

    /// Punches a hole at `idx` without shifting later elements.
    pub fn array_del(&mut self, id: ObjId, idx: usize) {
        if let Some(elems) = self.object_mut(id).elems.as_mut() {
            if idx < elems.len() {
                elems[idx] = Value::Novalue;
            }
        }
    }

    /// Truncates or extends the backing buffer to exactly `len` slots; new
    /// slots are holes.
    pub fn array_resize(&mut self, id: ObjId, len: usize) {
        if let Some(elems) = self.object_mut(id).elems.as_mut() {
            elems.resize(len, Value::Novalue);
        }
    }

    /* }}} */

    /// Attaches host user data and a destructor to an object.
    pub fn set_user_data(&mut self, id: ObjId, data: Box<dyn Any>, dtor: Option<Destructor>) {
        let obj = self.object_mut(id);
        obj.user_data = Some(data);
        obj.dtor = dtor;
        if dtor.is_some() {
            obj.attrs |= obj_attr::HAS_DESTRUCTOR;
        }
    }

    /// Borrows the user data attached to an object.
    pub fn user_data(&self, id: ObjId) -> Option<&dyn Any> {
        self.object(id).user_data.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::prop_attr;

    fn heap() -> Heap {
        Heap::new(HeapOptions::default())
    }

    #[test]
    fn test_string_kinds() {
        let mut h = heap();
        assert!(matches!(h.mk_string("hi"), Value::StrShort { len: 2, .. }));
        assert!(matches!(h.mk_string("fives"), Value::Str5(_)));
        assert!(matches!(h.mk_string("length"), Value::StrDict(_)));
        assert!(matches!(h.mk_string("certainly not interned"), Value::StrOwned(_)));
    }

    #[test]
    fn test_str_eq_across_kinds() {
        let mut h = heap();
        let owned = Value::StrOwned(h.strings.append(b"hi"));
        let inline = h.mk_string("hi");
        assert!(h.str_eq(&owned, &inline));
        let dict_v = h.mk_string("length");
        let owned2 = Value::StrOwned(h.strings.append(b"length"));
        assert!(h.str_eq(&dict_v, &owned2));
    }

    #[test]
    fn test_prop_insertion_order() {
        let mut h = heap();
        let obj = Value::Object(h.new_object(Value::Null).unwrap());
        for name in ["a", "b", "c"] {
            let n = h.mk_string(name);
            let p = h.new_prop(n, PropData::Value(Value::Number(1.0)), 0).unwrap();
            h.append_prop(obj, p);
        }
        let mut names = Vec::new();
        let mut cur = h.prop_list(obj).unwrap().head;
        while let Some(id) = cur {
            let p = h.prop(id);
            names.push(h.str_text(&p.name).unwrap().to_string());
            cur = p.next;
        }
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn test_unlink_prop_middle_and_tail() {
        let mut h = heap();
        let obj = Value::Object(h.new_object(Value::Null).unwrap());
        for name in ["x", "y", "z"] {
            let n = h.mk_string(name);
            let p = h
                .new_prop(n, PropData::Value(Value::Undefined), prop_attr::NON_ENUMERABLE)
                .unwrap();
            h.append_prop(obj, p);
        }
        assert!(h.unlink_prop(obj, b"y"));
        assert!(!h.unlink_prop(obj, b"y"));
        assert!(h.unlink_prop(obj, b"z"));
        // Appending after tail removal keeps the chain intact.
        let n = h.mk_string("w");
        let p = h.new_prop(n, PropData::Value(Value::Undefined), 0).unwrap();
        h.append_prop(obj, p);
        assert!(h.find_own_prop(obj, b"x").is_some());
        assert!(h.find_own_prop(obj, b"w").is_some());
        assert!(h.find_own_prop(obj, b"z").is_none());
    }

    #[test]
    fn test_dense_array_contract() {
        let mut h = heap();
        let id = h.new_dense_array(Value::Null).unwrap();
        h.array_set(id, 0, Value::Number(1.0));
        h.array_set(id, 1, Value::Number(2.0));
        assert_eq!(h.array_len(id), 2);
        // A write three past the end fills the gap with holes.
        h.array_set(id, 4, Value::Number(5.0));
        assert_eq!(h.array_len(id), 5);
        assert!(h.array_get(id, 2).is_novalue());
        assert!(h.array_get(id, 3).is_novalue());
        assert_eq!(h.array_get(id, 4).as_number(), Some(5.0));
        assert!(h.array_get(id, 99).is_novalue());
    }

    #[test]
    fn test_arena_exhaustion_sets_need_gc() {
        let mut h = Heap::new(HeapOptions {
            object_arena_size: 2,
            ..HeapOptions::default()
        });
        assert!(h.new_object(Value::Null).is_some());
        assert!(h.new_object(Value::Null).is_some());
        assert!(h.new_object(Value::Null).is_none());
        assert!(h.need_gc());
    }
}
