//! The Error constructor hierarchy, wired onto the engine's per-kind
//! prototypes so thrown engine exceptions and script-constructed errors
//! share `instanceof` behavior.

use crate::{set_ctor, set_method};
use core_types::ErrorKind;
use vm::{Interp, Value, VmResult};

const KINDS: [(&str, ErrorKind); 8] = [
    ("Error", ErrorKind::Error),
    ("SyntaxError", ErrorKind::SyntaxError),
    ("TypeError", ErrorKind::TypeError),
    ("ReferenceError", ErrorKind::ReferenceError),
    ("RangeError", ErrorKind::RangeError),
    ("EvalError", ErrorKind::EvalError),
    ("InternalError", ErrorKind::InternalError),
    ("InterruptedError", ErrorKind::InterruptedError),
];

pub(crate) fn install(interp: &mut Interp) -> VmResult<()> {
    let base = interp.error_prototype();
    set_method(interp, base, "toString", error_to_string)?;
    let empty = interp.mk_string("");
    crate::set_member(interp, base, "message", empty)?;

    for (name, kind) in KINDS {
        let proto = interp.error_kind_prototype(kind);
        let ctor = ctor_for(kind);
        set_ctor(interp, name, ctor, proto)?;
    }
    Ok(())
}

fn ctor_for(kind: ErrorKind) -> vm::NativeFn {
    match kind {
        ErrorKind::Error => error_ctor,
        ErrorKind::SyntaxError => syntax_error_ctor,
        ErrorKind::TypeError => type_error_ctor,
        ErrorKind::ReferenceError => reference_error_ctor,
        ErrorKind::RangeError => range_error_ctor,
        ErrorKind::EvalError => eval_error_ctor,
        ErrorKind::InternalError => internal_error_ctor,
        ErrorKind::InterruptedError => interrupted_error_ctor,
    }
}

/// Shared constructor body: reuse `this` when it was made by `new` with
/// our prototype, otherwise build a fresh error object, then attach the
/// message.
fn make_error(interp: &mut Interp, kind: ErrorKind) -> VmResult<Value> {
    let proto = interp.error_kind_prototype(kind);
    let this = interp.this_val();
    let obj = if this.is_generic_object() && interp.get_proto(this).identical(&proto) {
        this
    } else {
        interp.mk_object_with_proto(proto)?
    };
    let msg = interp.arg(0);
    if !msg.is_undefined() {
        let root = interp.own(obj);
        let text = interp.to_string_text(msg)?;
        let msg_v = interp.mk_string(&text);
        let obj_now = interp.rooted(root);
        let result = interp.set(obj_now, "message", msg_v);
        let obj_now = interp.rooted(root);
        interp.disown(root);
        result?;
        return Ok(obj_now);
    }
    Ok(obj)
}

fn error_ctor(interp: &mut Interp) -> VmResult<Value> {
    make_error(interp, ErrorKind::Error)
}

fn syntax_error_ctor(interp: &mut Interp) -> VmResult<Value> {
    make_error(interp, ErrorKind::SyntaxError)
}

fn type_error_ctor(interp: &mut Interp) -> VmResult<Value> {
    make_error(interp, ErrorKind::TypeError)
}

fn reference_error_ctor(interp: &mut Interp) -> VmResult<Value> {
    make_error(interp, ErrorKind::ReferenceError)
}

fn range_error_ctor(interp: &mut Interp) -> VmResult<Value> {
    make_error(interp, ErrorKind::RangeError)
}

fn eval_error_ctor(interp: &mut Interp) -> VmResult<Value> {
    make_error(interp, ErrorKind::EvalError)
}

fn internal_error_ctor(interp: &mut Interp) -> VmResult<Value> {
    make_error(interp, ErrorKind::InternalError)
}

fn interrupted_error_ctor(interp: &mut Interp) -> VmResult<Value> {
    make_error(interp, ErrorKind::InterruptedError)
}

fn error_to_string(interp: &mut Interp) -> VmResult<Value> {
    let this = interp.this_val();
    let name_v = interp.get(this, "name");
    let name = if name_v.is_undefined() {
        "Error".to_string()
    } else {
        interp.to_string_text(name_v)?
    };
    let msg_v = interp.get(this, "message");
    let msg = if msg_v.is_undefined() {
        String::new()
    } else {
        interp.to_string_text(msg_v)?
    };
    let text = if msg.is_empty() {
        name
    } else {
        format!("{}: {}", name, msg)
    };
    Ok(interp.mk_string(&text))
}
