//! The Number constructor and prototype.

use crate::{set_ctor, set_member, set_method};
use vm::{Interp, Value, VmResult};

pub(crate) fn install(interp: &mut Interp) -> VmResult<()> {
    let proto = interp.number_prototype();
    set_method(interp, proto, "toString", number_to_string)?;
    set_method(interp, proto, "valueOf", number_value_of)?;
    set_method(interp, proto, "toFixed", number_to_fixed)?;

    let ctor = set_ctor(interp, "Number", number_ctor, proto)?;
    set_member(interp, ctor, "MAX_VALUE", Value::Number(f64::MAX))?;
    set_member(interp, ctor, "MIN_VALUE", Value::Number(f64::MIN_POSITIVE))?;
    set_member(interp, ctor, "NaN", Value::nan())?;
    Ok(())
}

fn number_ctor(interp: &mut Interp) -> VmResult<Value> {
    if interp.argc() == 0 {
        return Ok(Value::Number(0.0));
    }
    let v = interp.arg(0);
    let n = interp.to_number_v(v)?;
    Ok(Value::Number(n))
}

fn number_value_of(interp: &mut Interp) -> VmResult<Value> {
    let this = interp.this_val();
    let n = interp.to_number_v(this)?;
    Ok(Value::Number(n))
}

fn number_to_string(interp: &mut Interp) -> VmResult<Value> {
    let this = interp.this_val();
    let n = interp.to_number_v(this)?;
    let radix = interp.to_long(interp.arg(0), 10)?;
    let text = if radix == 10 || !n.is_finite() {
        let v = Value::Number(n);
        interp.to_string_text(v)?
    } else {
        format_radix(n, radix.clamp(2, 36) as u32)
    };
    Ok(interp.mk_string(&text))
}

fn number_to_fixed(interp: &mut Interp) -> VmResult<Value> {
    let this = interp.this_val();
    let n = interp.to_number_v(this)?;
    let digits = interp.to_long(interp.arg(0), 0)?.clamp(0, 20) as usize;
    Ok(interp.mk_string(&format!("{:.*}", digits, n)))
}

/// Integer rendering in an arbitrary radix; fractional parts are
/// truncated, matching the original's pragmatic behavior.
fn format_radix(n: f64, radix: u32) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    let negative = n < 0.0;
    let mut i = n.abs().trunc() as u64;
    let mut digits = Vec::new();
    loop {
        let d = (i % radix as u64) as u32;
        digits.push(std::char::from_digit(d, radix).unwrap_or('0'));
        i /= radix as u64;
        if i == 0 {
            break;
        }
    }
    if negative {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_radix() {
        assert_eq!(format_radix(255.0, 16), "ff");
        assert_eq!(format_radix(-8.0, 2), "-1000");
        assert_eq!(format_radix(0.0, 36), "0");
    }
}
