//! The Object constructor and prototype.

use crate::{set_ctor, set_method};
use core_types::AttrDesc;
use vm::{ErrorKind, Interp, Value, VmResult};

pub(crate) fn install(interp: &mut Interp) -> VmResult<()> {
    let proto = interp.object_prototype();
    set_method(interp, proto, "toString", obj_to_string)?;
    set_method(interp, proto, "valueOf", obj_value_of)?;
    set_method(interp, proto, "hasOwnProperty", obj_has_own_property)?;

    let ctor = set_ctor(interp, "Object", object_ctor, proto)?;
    set_method(interp, ctor, "defineProperty", object_define_property)?;
    set_method(interp, ctor, "keys", object_keys)?;
    set_method(interp, ctor, "getOwnPropertyNames", object_keys)?;
    set_method(interp, ctor, "getPrototypeOf", object_get_prototype_of)?;
    set_method(interp, ctor, "preventExtensions", object_prevent_extensions)?;
    set_method(interp, ctor, "isExtensible", object_is_extensible)?;
    Ok(())
}

fn object_ctor(interp: &mut Interp) -> VmResult<Value> {
    let v = interp.arg(0);
    if v.is_object() {
        return Ok(v);
    }
    interp.mk_object()
}

fn obj_to_string(interp: &mut Interp) -> VmResult<Value> {
    let this = interp.this_val();
    let tag = if interp.is_array(this) {
        "[object Array]"
    } else if interp.is_callable(this) {
        "[object Function]"
    } else {
        "[object Object]"
    };
    Ok(interp.mk_string(tag))
}

fn obj_value_of(interp: &mut Interp) -> VmResult<Value> {
    Ok(interp.this_val())
}

fn obj_has_own_property(interp: &mut Interp) -> VmResult<Value> {
    let this = interp.this_val();
    let name = interp.arg(0);
    let text = interp.to_string_text(name)?;
    if interp.is_array(this) {
        if let Some(idx) = interp.parse_array_index(&text) {
            let present = !interp.array_get(this, idx).is_undefined();
            return Ok(Value::Bool(present));
        }
        if text == "length" {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(interp.get_own_property(this, &text).is_some()))
}

/// `Object.defineProperty(obj, name, descriptor)`. The descriptor keys
/// map onto the engine's structured attribute update; an absent `value`
/// with no accessors means "attributes only".
fn object_define_property(interp: &mut Interp) -> VmResult<Value> {
    let obj = interp.arg(0);
    if !obj.is_object() {
        return Err(interp.throwf(ErrorKind::TypeError, "Object.defineProperty needs an object"));
    }
    let name = interp.arg(1);
    let name_text = interp.to_string_text(name)?;
    let desc_obj = interp.arg(2);
    if !desc_obj.is_object() {
        return Err(interp.throwf(ErrorKind::TypeError, "property descriptor must be an object"));
    }

    let mut desc = AttrDesc::new();
    let writable = interp.get_throwing(desc_obj, "writable")?;
    if !writable.is_undefined() {
        desc = desc.writable(interp.to_boolean_v(writable));
    }
    let enumerable = interp.get_throwing(desc_obj, "enumerable")?;
    if !enumerable.is_undefined() {
        desc = desc.enumerable(interp.to_boolean_v(enumerable));
    }
    let configurable = interp.get_throwing(desc_obj, "configurable")?;
    if !configurable.is_undefined() {
        desc = desc.configurable(interp.to_boolean_v(configurable));
    }

    let getter = interp.get_throwing(desc_obj, "get")?;
    let setter = interp.get_throwing(desc_obj, "set")?;
    let has_getter = interp.is_callable(getter);
    let has_setter = interp.is_callable(setter);

    let value = if has_getter && has_setter {
        let pair = interp.mk_array()?;
        let root = interp.own(pair);
        interp.array_push(pair, getter)?;
        interp.array_push(pair, setter)?;
        let pair = interp.rooted(root);
        interp.disown(root);
        desc = desc.getter(true).setter(true);
        pair
    } else if has_getter {
        desc = desc.getter(true);
        getter
    } else if has_setter {
        desc = desc.setter(true);
        setter
    } else {
        let value = interp.get_throwing(desc_obj, "value")?;
        if value.is_undefined() {
            desc = desc.preserve_value();
        }
        value
    };

    interp.def(obj, &name_text, value, desc)?;
    Ok(obj)
}

fn object_keys(interp: &mut Interp) -> VmResult<Value> {
    let obj = interp.arg(0);
    let out = interp.mk_array()?;
    let root = interp.own(out);
    let mut handle = None;
    while let Some((next, key, _value)) = interp.next_prop(obj, handle) {
        let out_now = interp.rooted(root);
        interp.array_push(out_now, key)?;
        handle = Some(next);
    }
    let out = interp.rooted(root);
    interp.disown(root);
    Ok(out)
}

fn object_get_prototype_of(interp: &mut Interp) -> VmResult<Value> {
    let obj = interp.arg(0);
    Ok(interp.get_proto(obj))
}

fn object_prevent_extensions(interp: &mut Interp) -> VmResult<Value> {
    let obj = interp.arg(0);
    interp.prevent_extensions(obj);
    Ok(obj)
}

fn object_is_extensible(interp: &mut Interp) -> VmResult<Value> {
    let obj = interp.arg(0);
    Ok(Value::Bool(interp.is_extensible(obj)))
}
