//! The Math namespace object.

use crate::{set_member, set_method};
use vm::{Interp, Value, VmResult};

pub(crate) fn install(interp: &mut Interp) -> VmResult<()> {
    let math = interp.mk_object()?;
    let global = interp.global();
    set_member(interp, global, "Math", math)?;
    set_member(interp, math, "E", Value::Number(std::f64::consts::E))?;
    set_member(interp, math, "PI", Value::Number(std::f64::consts::PI))?;
    set_method(interp, math, "abs", math_abs)?;
    set_method(interp, math, "ceil", math_ceil)?;
    set_method(interp, math, "floor", math_floor)?;
    set_method(interp, math, "round", math_round)?;
    set_method(interp, math, "sqrt", math_sqrt)?;
    set_method(interp, math, "pow", math_pow)?;
    set_method(interp, math, "min", math_min)?;
    set_method(interp, math, "max", math_max)?;
    set_method(interp, math, "random", math_random)?;
    Ok(())
}

fn arg_number(interp: &mut Interp, i: usize) -> VmResult<f64> {
    let v = interp.arg(i);
    interp.to_number_v(v)
}

fn math_abs(interp: &mut Interp) -> VmResult<Value> {
    Ok(Value::Number(arg_number(interp, 0)?.abs()))
}

fn math_ceil(interp: &mut Interp) -> VmResult<Value> {
    Ok(Value::Number(arg_number(interp, 0)?.ceil()))
}

fn math_floor(interp: &mut Interp) -> VmResult<Value> {
    Ok(Value::Number(arg_number(interp, 0)?.floor()))
}

fn math_round(interp: &mut Interp) -> VmResult<Value> {
    let n = arg_number(interp, 0)?;
    // Halfway cases round toward positive infinity.
    Ok(Value::Number((n + 0.5).floor()))
}

fn math_sqrt(interp: &mut Interp) -> VmResult<Value> {
    Ok(Value::Number(arg_number(interp, 0)?.sqrt()))
}

fn math_pow(interp: &mut Interp) -> VmResult<Value> {
    let base = arg_number(interp, 0)?;
    let exp = arg_number(interp, 1)?;
    Ok(Value::Number(base.powf(exp)))
}

fn math_min(interp: &mut Interp) -> VmResult<Value> {
    let mut best = f64::INFINITY;
    for i in 0..interp.argc() {
        let n = arg_number(interp, i)?;
        if n.is_nan() {
            return Ok(Value::nan());
        }
        best = best.min(n);
    }
    Ok(Value::Number(best))
}

fn math_max(interp: &mut Interp) -> VmResult<Value> {
    let mut best = f64::NEG_INFINITY;
    for i in 0..interp.argc() {
        let n = arg_number(interp, i)?;
        if n.is_nan() {
            return Ok(Value::nan());
        }
        best = best.max(n);
    }
    Ok(Value::Number(best))
}

fn math_random(_interp: &mut Interp) -> VmResult<Value> {
    Ok(Value::Number(rand::random::<f64>()))
}
