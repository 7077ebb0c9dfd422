//! The standard library: Object, Array, String, Number, Boolean, Math,
//! JSON, the error hierarchy, RegExp, console, and the global functions.
//!
//! Everything here registers through the public host surface of the
//! engine (`mk_cfunction`, `mk_cfunction_obj`, `def` with attribute
//! descriptors); nothing reaches into engine internals. Host embedders
//! extending the engine use exactly the same interface.

#![warn(clippy::all)]
#![deny(unsafe_code)]

mod array;
mod boolean;
mod console;
mod error;
mod global;
mod json;
mod math;
mod number;
mod object;
mod regexp;
mod string;

use core_types::AttrDesc;
use vm::{Interp, NativeFn, Value, VmResult};

/// Installs the whole catalog onto the engine's global object.
pub fn install(interp: &mut Interp) -> VmResult<()> {
    object::install(interp)?;
    array::install(interp)?;
    string::install(interp)?;
    number::install(interp)?;
    boolean::install(interp)?;
    math::install(interp)?;
    json::install(interp)?;
    error::install(interp)?;
    regexp::install(interp)?;
    console::install(interp)?;
    global::install(interp)?;
    Ok(())
}

/// Defines a non-enumerable method, the way every builtin hangs off its
/// prototype.
pub(crate) fn set_method(
    interp: &mut Interp,
    obj: Value,
    name: &str,
    f: NativeFn,
) -> VmResult<()> {
    let func = interp.mk_cfunction(f);
    interp.def(obj, name, func, AttrDesc::new().enumerable(false))?;
    Ok(())
}

/// Defines a non-enumerable data property.
pub(crate) fn set_member(
    interp: &mut Interp,
    obj: Value,
    name: &str,
    value: Value,
) -> VmResult<()> {
    interp.def(obj, name, value, AttrDesc::new().enumerable(false))?;
    Ok(())
}

/// Installs a constructor object on the global, wired to a prototype.
pub(crate) fn set_ctor(
    interp: &mut Interp,
    name: &str,
    f: NativeFn,
    proto: Value,
) -> VmResult<Value> {
    let ctor = interp.mk_cfunction_obj(f, proto)?;
    let global = interp.global();
    set_member(interp, global, name, ctor)?;
    Ok(ctor)
}
