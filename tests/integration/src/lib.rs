//! Shared helpers for the end-to-end test suite.

use vm::{Interp, Value};

/// A full engine with the standard library installed.
pub fn engine() -> Interp {
    let mut interp = Interp::new();
    stdlib::install(&mut interp).expect("stdlib install");
    interp
}

/// Runs a script in a fresh engine, panicking with the thrown value's
/// rendering on failure.
pub fn eval(src: &str) -> (Interp, Value) {
    let mut interp = engine();
    match interp.exec(src) {
        Ok(v) => (interp, v),
        Err(e) => {
            let detail = interp
                .get_thrown_value()
                .and_then(|t| interp.to_json_or_debug(t, true).ok());
            panic!("exec failed: {:?} thrown={:?} for {:?}", e, detail, src);
        }
    }
}

pub fn eval_number(src: &str) -> f64 {
    let (_i, v) = eval(src);
    v.as_number()
        .unwrap_or_else(|| panic!("not a number: {:?}", v))
}

pub fn eval_string(src: &str) -> String {
    let (interp, v) = eval(src);
    interp
        .get_string(&v)
        .unwrap_or_else(|| panic!("not a string: {:?}", v))
        .to_string()
}

pub fn eval_bool(src: &str) -> bool {
    let (_i, v) = eval(src);
    v.as_bool()
        .unwrap_or_else(|| panic!("not a boolean: {:?}", v))
}
