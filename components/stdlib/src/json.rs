//! The JSON namespace object, backed by the engine's own strict parser
//! and dumper.

use crate::{set_member, set_method};
use vm::{ErrorKind, ExecError, Interp, Value, VmResult};

pub(crate) fn install(interp: &mut Interp) -> VmResult<()> {
    let json = interp.mk_object()?;
    let global = interp.global();
    set_member(interp, global, "JSON", json)?;
    set_method(interp, json, "parse", json_parse)?;
    set_method(interp, json, "stringify", json_stringify)?;
    Ok(())
}

fn json_parse(interp: &mut Interp) -> VmResult<Value> {
    let v = interp.arg(0);
    let text = interp.to_string_text(v)?;
    match interp.parse_json(&text) {
        Ok(v) => Ok(v),
        Err(ExecError::Syntax(e)) => Err(interp.throwf(ErrorKind::SyntaxError, &e.message)),
        Err(_) => Err(interp.rethrow()),
    }
}

fn json_stringify(interp: &mut Interp) -> VmResult<Value> {
    let v = interp.arg(0);
    if v.is_undefined() {
        return Ok(Value::Undefined);
    }
    let text = interp.to_json_or_debug(v, false)?;
    Ok(interp.mk_string(&text))
}
