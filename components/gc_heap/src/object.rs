//! Object, function and property cell layouts.

use bytecode::Bcode;
use core_types::{ObjAttrs, PropAttrs, PropId, Value};
use std::any::Any;
use std::rc::Rc;

/// Destructor callback for objects carrying host user data. Runs during the
/// sweep, receives only the opaque data, and must not re-enter the engine.
pub type Destructor = fn(Box<dyn Any>);

/// Head and tail of a property chain. Insertion is at the tail so that
/// enumeration yields properties in the order they were first added.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropList {
    pub head: Option<PropId>,
    pub tail: Option<PropId>,
}

/// Payload of a property.
///
/// Accessors are a distinct kind rather than a two-element array sharing
/// the value slot; a property whose attributes carry the getter or setter
/// bit always holds the `Accessor` form.
#[derive(Debug, Clone, Copy)]
pub enum PropData {
    /// Plain data property.
    Value(Value),
    /// Accessor property. An absent getter or setter is `Undefined`.
    Accessor {
        getter: Value,
        setter: Value,
    },
}

impl PropData {
    /// The raw stored value: data value, or the getter for accessors.
    pub fn raw(&self) -> Value {
        match self {
            PropData::Value(v) => *v,
            PropData::Accessor { getter, .. } => *getter,
        }
    }
}

/// One property cell.
#[derive(Debug, Clone, Copy)]
pub struct Prop {
    /// Property name; always a string value.
    pub name: Value,
    pub data: PropData,
    pub attrs: PropAttrs,
    /// Next property of the owning object.
    pub next: Option<PropId>,
}

/// A generic object cell.
pub struct ObjData {
    pub props: PropList,
    pub attrs: ObjAttrs,
    /// Prototype: an object value or `Null`. Chains terminate at `Null`.
    pub proto: Value,
    /// Dense-array backing buffer; holes are `Novalue`. Present exactly
    /// when the dense-array attribute is set.
    pub elems: Option<Vec<Value>>,
    /// Opaque host data, delivered to the destructor at reclamation.
    pub user_data: Option<Box<dyn Any>>,
    pub dtor: Option<Destructor>,
}

impl ObjData {
    pub fn new(proto: Value) -> ObjData {
        ObjData {
            props: PropList::default(),
            attrs: 0,
            proto,
            elems: None,
            user_data: None,
            dtor: None,
        }
    }
}

impl std::fmt::Debug for ObjData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjData")
            .field("props", &self.props)
            .field("attrs", &self.attrs)
            .field("proto", &self.proto)
            .field("elems", &self.elems.as_ref().map(|e| e.len()))
            .field("has_user_data", &self.user_data.is_some())
            .finish()
    }
}

/// A closure cell. Functions carry a property list of their own but no
/// prototype slot: their prototype is always the engine's function
/// prototype.
#[derive(Debug)]
pub struct FuncData {
    pub props: PropList,
    pub attrs: ObjAttrs,
    /// Lexical scope captured at creation; `None` until a function literal
    /// is bound by the VM.
    pub scope: Option<core_types::ObjId>,
    /// Compiled body, shared with the literal that produced the closure.
    pub bcode: Rc<Bcode>,
}
