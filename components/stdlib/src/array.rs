//! The Array constructor and prototype.

use crate::{set_ctor, set_method};
use vm::{ErrorKind, Interp, Value, VmResult};

pub(crate) fn install(interp: &mut Interp) -> VmResult<()> {
    let proto = interp.array_prototype();
    set_method(interp, proto, "push", array_push)?;
    set_method(interp, proto, "pop", array_pop)?;
    set_method(interp, proto, "join", array_join)?;
    set_method(interp, proto, "map", array_map)?;
    set_method(interp, proto, "forEach", array_for_each)?;
    set_method(interp, proto, "indexOf", array_index_of)?;
    set_method(interp, proto, "slice", array_slice)?;
    set_method(interp, proto, "concat", array_concat)?;
    set_method(interp, proto, "toString", array_to_string)?;

    let ctor = set_ctor(interp, "Array", array_ctor, proto)?;
    set_method(interp, ctor, "isArray", array_is_array)?;
    Ok(())
}

/// `Array(n)` presizes with holes; any other call collects its arguments.
fn array_ctor(interp: &mut Interp) -> VmResult<Value> {
    let arr = interp.mk_array()?;
    if interp.argc() == 1 && interp.arg(0).is_number() {
        let n = interp.get_double(interp.arg(0));
        if !(n.is_finite() && n >= 0.0 && n.fract() == 0.0) {
            return Err(interp.throwf(ErrorKind::RangeError, "invalid array length"));
        }
        let root = interp.own(arr);
        let len_v = interp.mk_number(n);
        interp.set(arr, "length", len_v)?;
        let arr = interp.rooted(root);
        interp.disown(root);
        return Ok(arr);
    }
    let root = interp.own(arr);
    for i in 0..interp.argc() {
        let v = interp.arg(i);
        let arr_now = interp.rooted(root);
        interp.array_push(arr_now, v)?;
    }
    let arr = interp.rooted(root);
    interp.disown(root);
    Ok(arr)
}

fn array_is_array(interp: &mut Interp) -> VmResult<Value> {
    let v = interp.arg(0);
    Ok(Value::Bool(interp.is_array(v)))
}

fn this_array(interp: &mut Interp) -> VmResult<Value> {
    let this = interp.this_val();
    if !interp.is_array(this) {
        return Err(interp.throwf(ErrorKind::TypeError, "receiver is not an array"));
    }
    Ok(this)
}

fn array_push(interp: &mut Interp) -> VmResult<Value> {
    let this = this_array(interp)?;
    for i in 0..interp.argc() {
        let v = interp.arg(i);
        interp.array_push(this, v)?;
    }
    Ok(Value::Number(interp.array_length(this) as f64))
}

fn array_pop(interp: &mut Interp) -> VmResult<Value> {
    let this = this_array(interp)?;
    let len = interp.array_length(this);
    if len == 0 {
        return Ok(Value::Undefined);
    }
    let last = interp.array_get(this, len - 1);
    let len_v = interp.mk_number((len - 1) as f64);
    interp.set(this, "length", len_v)?;
    Ok(last)
}

fn array_join(interp: &mut Interp) -> VmResult<Value> {
    let this = this_array(interp)?;
    let sep = if interp.arg(0).is_undefined() {
        ",".to_string()
    } else {
        let sep_v = interp.arg(0);
        interp.to_string_text(sep_v)?
    };
    let len = interp.array_length(this);
    let mut out = String::new();
    for i in 0..len {
        if i > 0 {
            out.push_str(&sep);
        }
        let elem = interp.array_get(this, i);
        if elem.is_undefined() || elem.is_null() {
            continue;
        }
        out.push_str(&interp.to_string_text(elem)?);
    }
    Ok(interp.mk_string(&out))
}

fn array_to_string(interp: &mut Interp) -> VmResult<Value> {
    array_join(interp)
}

fn array_map(interp: &mut Interp) -> VmResult<Value> {
    let this = this_array(interp)?;
    let callback = interp.arg(0);
    if !interp.is_callable(callback) {
        return Err(interp.throwf(ErrorKind::TypeError, "callback is not a function"));
    }
    let this_arg = interp.arg(1);
    let out = interp.mk_array()?;
    let root = interp.own(out);
    let len = interp.array_length(this);
    for i in 0..len {
        let elem = interp.array_get(this, i);
        let idx = interp.mk_number(i as f64);
        let mapped = interp.apply_checked(callback, this_arg, &[elem, idx, this])?;
        let out_now = interp.rooted(root);
        interp.array_set(out_now, i, mapped)?;
    }
    let out = interp.rooted(root);
    interp.disown(root);
    Ok(out)
}

fn array_for_each(interp: &mut Interp) -> VmResult<Value> {
    let this = this_array(interp)?;
    let callback = interp.arg(0);
    if !interp.is_callable(callback) {
        return Err(interp.throwf(ErrorKind::TypeError, "callback is not a function"));
    }
    let this_arg = interp.arg(1);
    let len = interp.array_length(this);
    for i in 0..len {
        let elem = interp.array_get(this, i);
        let idx = interp.mk_number(i as f64);
        interp.apply_checked(callback, this_arg, &[elem, idx, this])?;
    }
    Ok(Value::Undefined)
}

fn array_index_of(interp: &mut Interp) -> VmResult<Value> {
    let this = this_array(interp)?;
    let needle = interp.arg(0);
    let len = interp.array_length(this);
    let start = interp.to_long(interp.arg(1), 0)?.max(0) as usize;
    for i in start..len {
        let elem = interp.array_get(this, i);
        if interp.strict_equals(elem, needle) {
            return Ok(Value::Number(i as f64));
        }
    }
    Ok(Value::Number(-1.0))
}

fn clamp_range(n: i64, len: usize) -> usize {
    if n < 0 {
        (len as i64 + n).max(0) as usize
    } else {
        (n as usize).min(len)
    }
}

fn array_slice(interp: &mut Interp) -> VmResult<Value> {
    let this = this_array(interp)?;
    let len = interp.array_length(this);
    let start = clamp_range(interp.to_long(interp.arg(0), 0)?, len);
    let end = clamp_range(interp.to_long(interp.arg(1), len as i64)?, len);
    let out = interp.mk_array()?;
    let root = interp.own(out);
    for i in start..end {
        let elem = interp.array_get(this, i);
        let out_now = interp.rooted(root);
        interp.array_push(out_now, elem)?;
    }
    let out = interp.rooted(root);
    interp.disown(root);
    Ok(out)
}

fn array_concat(interp: &mut Interp) -> VmResult<Value> {
    let this = this_array(interp)?;
    let out = interp.mk_array()?;
    let root = interp.own(out);
    let len = interp.array_length(this);
    for i in 0..len {
        let elem = interp.array_get(this, i);
        let out_now = interp.rooted(root);
        interp.array_push(out_now, elem)?;
    }
    for a in 0..interp.argc() {
        let arg = interp.arg(a);
        if interp.is_array(arg) {
            for i in 0..interp.array_length(arg) {
                let elem = interp.array_get(arg, i);
                let out_now = interp.rooted(root);
                interp.array_push(out_now, elem)?;
            }
        } else {
            let out_now = interp.rooted(root);
            interp.array_push(out_now, arg)?;
        }
    }
    let out = interp.rooted(root);
    interp.disown(root);
    Ok(out)
}
