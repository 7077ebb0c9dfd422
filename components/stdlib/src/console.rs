//! The console object: debug rendering of each argument to the standard
//! streams.

use crate::{set_member, set_method};
use vm::{Interp, Value, VmResult};

pub(crate) fn install(interp: &mut Interp) -> VmResult<()> {
    let console = interp.mk_object()?;
    let global = interp.global();
    set_member(interp, global, "console", console)?;
    set_method(interp, console, "log", console_log)?;
    set_method(interp, console, "error", console_error)?;
    Ok(())
}

fn render_args(interp: &mut Interp) -> VmResult<String> {
    let mut parts = Vec::new();
    for i in 0..interp.argc() {
        let v = interp.arg(i);
        if v.is_string() {
            // Bare strings print without quoting.
            parts.push(interp.to_string_text(v)?);
        } else {
            parts.push(interp.to_json_or_debug(v, true)?);
        }
    }
    Ok(parts.join(" "))
}

fn console_log(interp: &mut Interp) -> VmResult<Value> {
    let line = render_args(interp)?;
    println!("{}", line);
    Ok(Value::Undefined)
}

fn console_error(interp: &mut Interp) -> VmResult<Value> {
    let line = render_args(interp)?;
    eprintln!("{}", line);
    Ok(Value::Undefined)
}
