//! The RegExp constructor and prototype, over the engine's opaque
//! matcher.

use crate::{set_ctor, set_method};
use vm::{ErrorKind, Interp, Value, VmResult};

pub(crate) fn install(interp: &mut Interp) -> VmResult<()> {
    let proto = interp.regexp_prototype();
    set_method(interp, proto, "test", regexp_test)?;
    set_method(interp, proto, "exec", regexp_exec)?;
    set_method(interp, proto, "toString", regexp_to_string)?;
    set_ctor(interp, "RegExp", regexp_ctor, proto)?;
    Ok(())
}

fn regexp_ctor(interp: &mut Interp) -> VmResult<Value> {
    let source_v = interp.arg(0);
    if source_v.is_regexp() {
        return Ok(source_v);
    }
    let source = if source_v.is_undefined() {
        String::new()
    } else {
        interp.to_string_text(source_v)?
    };
    let flags_v = interp.arg(1);
    let flags = if flags_v.is_undefined() {
        String::new()
    } else {
        interp.to_string_text(flags_v)?
    };
    interp.mk_regexp(&source, &flags)
}

fn this_regexp(interp: &mut Interp) -> VmResult<Value> {
    let this = interp.this_val();
    if !this.is_regexp() {
        return Err(interp.throwf(ErrorKind::TypeError, "receiver is not a regexp"));
    }
    Ok(this)
}

fn regexp_test(interp: &mut Interp) -> VmResult<Value> {
    let this = this_regexp(interp)?;
    let subject_v = interp.arg(0);
    let subject = interp.to_string_text(subject_v)?;
    let prog = interp.regexp_program(this).expect("regexp value");
    let (_, _, global) = interp.regexp_parts(this).expect("regexp value");
    let start = if global {
        interp.regexp_last_index(this).min(subject.len())
    } else {
        0
    };
    match prog.find(&subject[start..]) {
        Some(m) => {
            if global {
                interp.set_regexp_last_index(this, start + m.end());
            }
            Ok(Value::Bool(true))
        }
        None => {
            if global {
                interp.set_regexp_last_index(this, 0);
            }
            Ok(Value::Bool(false))
        }
    }
}

/// `exec` returns an array of the match and its capture groups, with
/// `index` and `input` set on it, or `null` when nothing matches.
fn regexp_exec(interp: &mut Interp) -> VmResult<Value> {
    let this = this_regexp(interp)?;
    let subject_v = interp.arg(0);
    let subject = interp.to_string_text(subject_v)?;
    let prog = interp.regexp_program(this).expect("regexp value");
    let (_, _, global) = interp.regexp_parts(this).expect("regexp value");
    let start = if global {
        interp.regexp_last_index(this).min(subject.len())
    } else {
        0
    };

    let caps = match prog.captures(&subject[start..]) {
        Some(caps) => caps,
        None => {
            if global {
                interp.set_regexp_last_index(this, 0);
            }
            return Ok(Value::Null);
        }
    };
    let full = caps.get(0).expect("capture 0 always present");
    let match_index = start + full.start();
    if global {
        interp.set_regexp_last_index(this, start + full.end());
    }

    let groups: Vec<Option<String>> = (0..caps.len())
        .map(|i| caps.get(i).map(|m| m.as_str().to_string()))
        .collect();

    let out = interp.mk_array()?;
    let root = interp.own(out);
    for group in groups {
        let v = match group {
            Some(text) => interp.mk_string(&text),
            None => Value::Undefined,
        };
        let out_now = interp.rooted(root);
        interp.array_push(out_now, v)?;
    }
    let out_now = interp.rooted(root);
    let idx_v = interp.mk_number(match_index as f64);
    interp.set(out_now, "index", idx_v)?;
    let out_now = interp.rooted(root);
    let input_v = interp.mk_string(&subject);
    interp.set(out_now, "input", input_v)?;
    let out = interp.rooted(root);
    interp.disown(root);
    Ok(out)
}

fn regexp_to_string(interp: &mut Interp) -> VmResult<Value> {
    let this = this_regexp(interp)?;
    let (source, flags, _) = interp.regexp_parts(this).expect("regexp value");
    Ok(interp.mk_string(&format!("/{}/{}", source, flags)))
}
