//! The Boolean constructor and prototype.

use crate::{set_ctor, set_method};
use vm::{Interp, Value, VmResult};

pub(crate) fn install(interp: &mut Interp) -> VmResult<()> {
    let proto = interp.boolean_prototype();
    set_method(interp, proto, "toString", boolean_to_string)?;
    set_method(interp, proto, "valueOf", boolean_value_of)?;
    set_ctor(interp, "Boolean", boolean_ctor, proto)?;
    Ok(())
}

fn boolean_ctor(interp: &mut Interp) -> VmResult<Value> {
    let v = interp.arg(0);
    Ok(Value::Bool(interp.to_boolean_v(v)))
}

fn boolean_to_string(interp: &mut Interp) -> VmResult<Value> {
    let this = interp.this_val();
    let b = interp.to_boolean_v(this);
    Ok(interp.mk_string(if b { "true" } else { "false" }))
}

fn boolean_value_of(interp: &mut Interp) -> VmResult<Value> {
    let this = interp.this_val();
    Ok(Value::Bool(interp.to_boolean_v(this)))
}
