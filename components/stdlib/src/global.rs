//! Global functions: isNaN, isFinite, parseInt, parseFloat.

use crate::set_method;
use vm::{Interp, Value, VmResult};

pub(crate) fn install(interp: &mut Interp) -> VmResult<()> {
    let global = interp.global();
    set_method(interp, global, "isNaN", global_is_nan)?;
    set_method(interp, global, "isFinite", global_is_finite)?;
    set_method(interp, global, "parseInt", global_parse_int)?;
    set_method(interp, global, "parseFloat", global_parse_float)?;
    Ok(())
}

fn global_is_nan(interp: &mut Interp) -> VmResult<Value> {
    let v = interp.arg(0);
    let n = interp.to_number_v(v)?;
    Ok(Value::Bool(n.is_nan()))
}

fn global_is_finite(interp: &mut Interp) -> VmResult<Value> {
    let v = interp.arg(0);
    let n = interp.to_number_v(v)?;
    Ok(Value::Bool(n.is_finite()))
}

fn global_parse_int(interp: &mut Interp) -> VmResult<Value> {
    let v = interp.arg(0);
    let text = interp.to_string_text(v)?;
    let mut radix = interp.to_long(interp.arg(1), 0)? as u32;

    let t = text.trim_start();
    let (negative, t) = match t.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, t.strip_prefix('+').unwrap_or(t)),
    };
    let t = if radix == 0 || radix == 16 {
        match t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
            Some(rest) => {
                radix = 16;
                rest
            }
            None => {
                if radix == 0 {
                    radix = 10;
                }
                t
            }
        }
    } else {
        t
    };
    if !(2..=36).contains(&radix) {
        return Ok(Value::nan());
    }

    let digits: String = t
        .chars()
        .take_while(|c| c.is_digit(radix))
        .collect();
    if digits.is_empty() {
        return Ok(Value::nan());
    }
    let mut n = 0f64;
    for c in digits.chars() {
        n = n * radix as f64 + c.to_digit(radix).unwrap_or(0) as f64;
    }
    Ok(Value::Number(if negative { -n } else { n }))
}

fn global_parse_float(interp: &mut Interp) -> VmResult<Value> {
    let v = interp.arg(0);
    let text = interp.to_string_text(v)?;
    let t = text.trim_start();

    // Longest prefix that still parses as a float.
    let mut end = 0;
    let bytes = t.as_bytes();
    let mut seen_dot = false;
    let mut seen_e = false;
    let mut i = 0;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }
    while i < bytes.len() {
        match bytes[i] {
            b'0'..=b'9' => {
                i += 1;
                end = i;
            }
            b'.' if !seen_dot && !seen_e => {
                seen_dot = true;
                i += 1;
            }
            b'e' | b'E' if !seen_e && end > 0 => {
                seen_e = true;
                i += 1;
                if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
                    i += 1;
                }
            }
            _ => break,
        }
    }
    if end == 0 {
        return Ok(Value::nan());
    }
    let n = t[..i.min(t.len())]
        .trim_end_matches(|c| !matches!(c, '0'..='9'))
        .parse::<f64>()
        .unwrap_or(f64::NAN);
    Ok(Value::Number(n))
}
