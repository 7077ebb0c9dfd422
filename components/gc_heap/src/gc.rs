//! Mark-sweep collection with owned-string compaction.
//!
//! The engine gathers every root value (global object and prototypes, the
//! value stack, call frames, the explicit ownership buffer, pending thrown
//! and returned values) and hands them to [`Heap::collect`]. Marking walks
//! the object graph through properties, elements, prototypes and closure
//! scopes. Sweeping reclaims unmarked cells, running destructors first.
//! Live owned strings are re-emitted into a fresh buffer; the heap rewrites
//! its own cells and returns a [`StrRemap`] so the engine can rewrite the
//! root slots it owns.

use crate::heap::Heap;
use crate::object::PropData;
use crate::strings::StrBuf;
use core_types::{obj_attr, Value};
use std::collections::HashMap;

/// Relocation table for owned-string offsets produced by one collection.
#[derive(Debug, Default)]
pub struct StrRemap {
    map: HashMap<u32, u32>,
}

impl StrRemap {
    /// Rewrites one value slot in place.
    pub fn fix(&self, v: &mut Value) {
        if let Value::StrOwned(off) = v {
            if let Some(new_off) = self.map.get(off) {
                *off = *new_off;
            }
        }
    }

    /// Rewrites every slot of a buffer.
    pub fn fix_all(&self, values: &mut [Value]) {
        for v in values {
            self.fix(v);
        }
    }

    /// Whether any string actually moved.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

struct Marker {
    worklist: Vec<Value>,
    live_strs: Vec<u32>,
}

impl Heap {
    /// Runs a full collection. `roots` are copies of every root slot the
    /// engine holds; the returned remap must be applied to those slots
    /// before they are used again.
    pub fn collect(&mut self, roots: &[Value]) -> StrRemap {
        let mut m = Marker {
            worklist: roots.to_vec(),
            live_strs: Vec::new(),
        };
        self.mark(&mut m);
        self.sweep();
        let remap = self.compact_strings(&mut m.live_strs);
        if !remap.is_empty() {
            self.rewrite_cells(&remap);
        }
        self.clear_marks();
        self.clear_need_gc();
        remap
    }

    fn mark(&mut self, m: &mut Marker) {
        while let Some(v) = m.worklist.pop() {
            match v {
                Value::StrOwned(off) => m.live_strs.push(off),
                Value::Object(id) => {
                    let idx = id.0 as usize;
                    if self.obj_marks[idx] || self.objects[idx].is_none() {
                        continue;
                    }
                    self.obj_marks[idx] = true;
                    let obj = self.objects[idx].as_ref().unwrap();
                    m.worklist.push(obj.proto);
                    if let Some(elems) = &obj.elems {
                        m.worklist.extend_from_slice(elems);
                    }
                    self.mark_prop_chain(obj.props.head, m);
                }
                Value::Function(id) => {
                    let idx = id.0 as usize;
                    if self.func_marks[idx] || self.funcs[idx].is_none() {
                        continue;
                    }
                    self.func_marks[idx] = true;
                    let func = self.funcs[idx].as_ref().unwrap();
                    if let Some(scope) = func.scope {
                        m.worklist.push(Value::Object(scope));
                    }
                    self.mark_prop_chain(func.props.head, m);
                }
                Value::Regexp(id) => {
                    self.regexp_marks[id.0 as usize] = true;
                }
                _ => {}
            }
        }
    }

    fn mark_prop_chain(&self, head: Option<core_types::PropId>, m: &mut Marker) {
        let mut cur = head;
        while let Some(id) = cur {
            let idx = id.0 as usize;
            let prop = self.props[idx].as_ref().expect("dangling property link");
            m.worklist.push(prop.name);
            match prop.data {
                PropData::Value(v) => m.worklist.push(v),
                PropData::Accessor { getter, setter } => {
                    m.worklist.push(getter);
                    m.worklist.push(setter);
                }
            }
            cur = prop.next;
        }
    }

    /// Marks every property cell reachable from a marked container, then
    /// frees the unmarked remainder of each arena.
    fn sweep(&mut self) {
        // Property marks derive from their owning containers.
        for i in 0..self.objects.len() {
            if self.obj_marks[i] {
                let head = self.objects[i].as_ref().unwrap().props.head;
                self.mark_props_only(head);
            }
        }
        for i in 0..self.funcs.len() {
            if self.func_marks[i] {
                let head = self.funcs[i].as_ref().unwrap().props.head;
                self.mark_props_only(head);
            }
        }

        for i in 0..self.objects.len() {
            if self.objects[i].is_some() && !self.obj_marks[i] {
                let mut data = self.objects[i].take().unwrap();
                if data.attrs & obj_attr::HAS_DESTRUCTOR != 0 {
                    if let (Some(dtor), Some(user_data)) = (data.dtor, data.user_data.take()) {
                        dtor(user_data);
                    }
                }
                self.obj_free.push(i as u32);
            }
        }
        for i in 0..self.funcs.len() {
            if self.funcs[i].is_some() && !self.func_marks[i] {
                self.funcs[i] = None;
                self.func_free.push(i as u32);
            }
        }
        for i in 0..self.props.len() {
            if self.props[i].is_some() && !self.prop_marks[i] {
                self.props[i] = None;
                self.prop_free.push(i as u32);
            }
        }
        for i in 0..self.regexps.len() {
            if self.regexps[i].is_some() && !self.regexp_marks[i] {
                self.regexps[i] = None;
            }
        }
    }

    fn mark_props_only(&mut self, head: Option<core_types::PropId>) {
        let mut cur = head;
        while let Some(id) = cur {
            let idx = id.0 as usize;
            self.prop_marks[idx] = true;
            cur = self.props[idx].as_ref().expect("dangling property link").next;
        }
    }

    /// Re-emits live strings into a fresh buffer, oldest offset first, and
    /// returns the relocation table.
    fn compact_strings(&mut self, live: &mut Vec<u32>) -> StrRemap {
        let mut remap = StrRemap::default();
        if self.strings.is_empty() {
            return remap;
        }
        live.sort_unstable();
        live.dedup();
        let mut fresh = StrBuf::new();
        for &off in live.iter() {
            let new_off = fresh.append(self.strings.read(off));
            if new_off != off {
                remap.map.insert(off, new_off);
            }
        }
        self.strings = fresh;
        remap
    }

    /// Applies a string relocation to every value slot inside the heap.
    fn rewrite_cells(&mut self, remap: &StrRemap) {
        for slot in self.objects.iter_mut().flatten() {
            remap.fix(&mut slot.proto);
            if let Some(elems) = slot.elems.as_mut() {
                remap.fix_all(elems);
            }
        }
        for slot in self.props.iter_mut().flatten() {
            remap.fix(&mut slot.name);
            match &mut slot.data {
                PropData::Value(v) => remap.fix(v),
                PropData::Accessor { getter, setter } => {
                    remap.fix(getter);
                    remap.fix(setter);
                }
            }
        }
    }

    fn clear_marks(&mut self) {
        self.obj_marks.iter_mut().for_each(|m| *m = false);
        self.func_marks.iter_mut().for_each(|m| *m = false);
        self.prop_marks.iter_mut().for_each(|m| *m = false);
        self.regexp_marks.iter_mut().for_each(|m| *m = false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::HeapOptions;
    use crate::object::PropData;
    use core_types::prop_attr;

    fn heap() -> Heap {
        Heap::new(HeapOptions::default())
    }

    #[test]
    fn test_unreachable_object_is_reclaimed() {
        let mut h = heap();
        let live = h.new_object(Value::Null).unwrap();
        let dead = h.new_object(Value::Null).unwrap();
        h.collect(&[Value::Object(live)]);
        assert!(h.objects[live.0 as usize].is_some());
        assert!(h.objects[dead.0 as usize].is_none());
        // The freed cell is reused.
        let reused = h.new_object(Value::Null).unwrap();
        assert_eq!(reused, dead);
    }

    #[test]
    fn test_marking_follows_props_protos_and_elems() {
        let mut h = heap();
        let proto = h.new_object(Value::Null).unwrap();
        let obj = h.new_object(Value::Object(proto)).unwrap();
        let elem_obj = h.new_object(Value::Null).unwrap();
        let arr = h.new_dense_array(Value::Null).unwrap();
        h.array_push(arr, Value::Object(elem_obj));
        let name = h.mk_string("payload");
        let p = h
            .new_prop(name, PropData::Value(Value::Object(arr)), 0)
            .unwrap();
        h.append_prop(Value::Object(obj), p);

        h.collect(&[Value::Object(obj)]);
        for id in [proto, obj, elem_obj, arr] {
            assert!(h.objects[id.0 as usize].is_some(), "{:?} was reclaimed", id);
        }
    }

    #[test]
    fn test_string_compaction_rewrites_offsets() {
        let mut h = heap();
        let dead = h.mk_string("this string will be garbage");
        let live = h.mk_string("this string survives the collection");
        assert!(matches!(dead, Value::StrOwned(_)));
        let before = h.strings.len();

        let obj = h.new_object(Value::Null).unwrap();
        let name = h.mk_string("note-a-long-property-name");
        let p = h.new_prop(name, PropData::Value(live), 0).unwrap();
        h.append_prop(Value::Object(obj), p);

        let mut root = Value::Object(obj);
        let mut live_root = live;
        let remap = h.collect(&[root, live_root]);
        remap.fix(&mut root);
        remap.fix(&mut live_root);

        assert!(h.strings.len() < before);
        assert_eq!(
            h.str_text(&live_root),
            Some("this string survives the collection")
        );
        // The property slot inside the heap was rewritten too.
        let pid = h.find_own_prop(root, b"note-a-long-property-name").unwrap();
        match h.prop(pid).data {
            PropData::Value(v) => {
                assert_eq!(h.str_text(&v), Some("this string survives the collection"))
            }
            _ => panic!("expected data property"),
        }
    }

    #[test]
    fn test_destructor_runs_on_sweep() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static DROPS: AtomicUsize = AtomicUsize::new(0);
        fn dtor(_data: Box<dyn std::any::Any>) {
            DROPS.fetch_add(1, Ordering::SeqCst);
        }

        let mut h = heap();
        let id = h.new_object(Value::Null).unwrap();
        h.set_user_data(id, Box::new(7u32), Some(dtor));
        h.collect(&[]);
        assert_eq!(DROPS.load(Ordering::SeqCst), 1);
        assert!(h.objects[id.0 as usize].is_none());
    }

    #[test]
    fn test_unlinked_prop_is_swept() {
        let mut h = heap();
        let obj = Value::Object(h.new_object(Value::Null).unwrap());
        let name = h.mk_string("gone");
        let p = h
            .new_prop(name, PropData::Value(Value::Number(0.0)), prop_attr::NON_ENUMERABLE)
            .unwrap();
        h.append_prop(obj, p);
        h.unlink_prop(obj, b"gone");
        h.collect(&[obj]);
        assert!(h.props[p.0 as usize].is_none());
    }
}
