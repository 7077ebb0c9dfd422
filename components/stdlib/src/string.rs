//! The String constructor and prototype.

use crate::{set_ctor, set_method};
use vm::{Interp, Value, VmResult};

pub(crate) fn install(interp: &mut Interp) -> VmResult<()> {
    let proto = interp.string_prototype();
    set_method(interp, proto, "toString", string_value_of)?;
    set_method(interp, proto, "valueOf", string_value_of)?;
    set_method(interp, proto, "charAt", string_char_at)?;
    set_method(interp, proto, "charCodeAt", string_char_code_at)?;
    set_method(interp, proto, "indexOf", string_index_of)?;
    set_method(interp, proto, "substring", string_substring)?;
    set_method(interp, proto, "slice", string_slice)?;
    set_method(interp, proto, "split", string_split)?;
    set_method(interp, proto, "toUpperCase", string_to_upper)?;
    set_method(interp, proto, "toLowerCase", string_to_lower)?;

    let ctor = set_ctor(interp, "String", string_ctor, proto)?;
    set_method(interp, ctor, "fromCharCode", string_from_char_code)?;
    Ok(())
}

/// The receiver as text. String prototype methods also work when the
/// receiver reached them through an explicit `call`.
fn this_text(interp: &mut Interp) -> VmResult<String> {
    let this = interp.this_val();
    interp.to_string_text(this)
}

fn string_ctor(interp: &mut Interp) -> VmResult<Value> {
    if interp.argc() == 0 {
        return Ok(interp.mk_string(""));
    }
    let v = interp.arg(0);
    let text = interp.to_string_text(v)?;
    Ok(interp.mk_string(&text))
}

fn string_value_of(interp: &mut Interp) -> VmResult<Value> {
    let text = this_text(interp)?;
    Ok(interp.mk_string(&text))
}

fn string_char_at(interp: &mut Interp) -> VmResult<Value> {
    let text = this_text(interp)?;
    let idx = interp.to_long(interp.arg(0), 0)?;
    if idx < 0 {
        return Ok(interp.mk_string(""));
    }
    match text.chars().nth(idx as usize) {
        Some(c) => {
            let mut buf = [0u8; 4];
            Ok(interp.mk_string(c.encode_utf8(&mut buf)))
        }
        None => Ok(interp.mk_string("")),
    }
}

fn string_char_code_at(interp: &mut Interp) -> VmResult<Value> {
    let text = this_text(interp)?;
    let idx = interp.to_long(interp.arg(0), 0)?;
    if idx < 0 {
        return Ok(Value::nan());
    }
    match text.chars().nth(idx as usize) {
        Some(c) => Ok(Value::Number(c as u32 as f64)),
        None => Ok(Value::nan()),
    }
}

fn string_from_char_code(interp: &mut Interp) -> VmResult<Value> {
    let mut out = String::new();
    for i in 0..interp.argc() {
        let code = interp.to_long(interp.arg(i), 0)?;
        out.push(char::from_u32(code as u32).unwrap_or('\u{fffd}'));
    }
    Ok(interp.mk_string(&out))
}

fn string_index_of(interp: &mut Interp) -> VmResult<Value> {
    let text = this_text(interp)?;
    let needle_v = interp.arg(0);
    let needle = interp.to_string_text(needle_v)?;
    match text.find(&needle) {
        Some(byte_pos) => {
            let char_pos = text[..byte_pos].chars().count();
            Ok(Value::Number(char_pos as f64))
        }
        None => Ok(Value::Number(-1.0)),
    }
}

fn char_range(text: &str, start: usize, end: usize) -> String {
    text.chars().skip(start).take(end.saturating_sub(start)).collect()
}

fn string_substring(interp: &mut Interp) -> VmResult<Value> {
    let text = this_text(interp)?;
    let len = text.chars().count();
    let a = interp.to_long(interp.arg(0), 0)?.clamp(0, len as i64) as usize;
    let b = interp.to_long(interp.arg(1), len as i64)?.clamp(0, len as i64) as usize;
    let (start, end) = if a <= b { (a, b) } else { (b, a) };
    let out = char_range(&text, start, end);
    Ok(interp.mk_string(&out))
}

fn string_slice(interp: &mut Interp) -> VmResult<Value> {
    let text = this_text(interp)?;
    let len = text.chars().count() as i64;
    let mut start = interp.to_long(interp.arg(0), 0)?;
    let mut end = interp.to_long(interp.arg(1), len)?;
    if start < 0 {
        start = (len + start).max(0);
    }
    if end < 0 {
        end = (len + end).max(0);
    }
    let out = char_range(&text, start as usize, (end.min(len)) as usize);
    Ok(interp.mk_string(&out))
}

fn string_split(interp: &mut Interp) -> VmResult<Value> {
    let text = this_text(interp)?;
    let sep_v = interp.arg(0);
    let out = interp.mk_array()?;
    let root = interp.own(out);

    let parts: Vec<String> = if sep_v.is_undefined() {
        vec![text.clone()]
    } else if sep_v.is_regexp() {
        let prog = interp.regexp_program(sep_v).expect("regexp value");
        prog.split(&text).map(str::to_string).collect()
    } else {
        let sep = interp.to_string_text(sep_v)?;
        if sep.is_empty() {
            text.chars().map(|c| c.to_string()).collect()
        } else {
            text.split(sep.as_str()).map(str::to_string).collect()
        }
    };
    for part in parts {
        let s = interp.mk_string(&part);
        let out_now = interp.rooted(root);
        interp.array_push(out_now, s)?;
    }
    let out = interp.rooted(root);
    interp.disown(root);
    Ok(out)
}

fn string_to_upper(interp: &mut Interp) -> VmResult<Value> {
    let text = this_text(interp)?.to_uppercase();
    Ok(interp.mk_string(&text))
}

fn string_to_lower(interp: &mut Interp) -> VmResult<Value> {
    let text = this_text(interp)?.to_lowercase();
    Ok(interp.mk_string(&text))
}
