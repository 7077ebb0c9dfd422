//! Coercions, equality, and the arithmetic helpers built on them.
//!
//! Every conversion that may call `valueOf`/`toString` is fallible, since
//! those run user code. `to_boolean_v` alone is total.

use crate::interp::{Interp, Throw, VmResult};
use core_types::{ErrorKind, Value};

/// Hint for `to_primitive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveHint {
    Number,
    String,
    Auto,
}

/// Formats a number the way script observes it.
pub(crate) fn fmt_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e21 {
        return format!("{:.0}", n);
    }
    let mut buf = ryu::Buffer::new();
    let text = buf.format(n);
    match text.find('e') {
        Some(idx) if !text[idx + 1..].starts_with('-') => {
            format!("{}e+{}", &text[..idx], &text[idx + 1..])
        }
        _ => text.to_string(),
    }
}

/// ES ToInt32.
pub(crate) fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

/// ES ToUint32.
pub(crate) fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() || n == 0.0 {
        return 0;
    }
    let m = n.trunc() % 4294967296.0;
    let m = if m < 0.0 { m + 4294967296.0 } else { m };
    m as u32
}

fn parse_number_text(text: &str) -> f64 {
    let t = text.trim();
    if t.is_empty() {
        return 0.0;
    }
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map_or(f64::NAN, |n| n as f64);
    }
    match t {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ => t.parse::<f64>().unwrap_or(f64::NAN),
    }
}

impl Interp {
    /// Whether the value participates in property storage as an object
    /// (generic objects, functions, and regexp instances).
    pub(crate) fn is_objectish(&self, v: Value) -> bool {
        v.is_object() || v.is_regexp()
    }

    /// ToPrimitive. Objects try `valueOf` then `toString` (reversed for
    /// the string hint); a `TypeError` is raised when both produce
    /// objects.
    pub fn to_primitive(&mut self, v: Value, hint: PrimitiveHint) -> VmResult<Value> {
        if !self.is_objectish(v) {
            return Ok(v);
        }
        let order: [&str; 2] = match hint {
            PrimitiveHint::String => ["toString", "valueOf"],
            _ => ["valueOf", "toString"],
        };
        for method_name in order {
            let name = self.mk_str_value(method_name);
            let method = self.get_v(v, name)?;
            if self.is_callable(method) {
                let result = self.apply_internal(method, v, &[])?;
                if !self.is_objectish(result) {
                    return Ok(result);
                }
            }
        }
        Err(self.throwf(ErrorKind::TypeError, "cannot convert object to primitive"))
    }

    /// ToNumber.
    pub fn to_number_v(&mut self, v: Value) -> VmResult<f64> {
        let prim = self.to_primitive(v, PrimitiveHint::Number)?;
        Ok(self.primitive_to_number(prim))
    }

    /// ToNumber on a pair of operands. The second operand is rooted while
    /// the first converts, since conversion may run user code and collect.
    pub(crate) fn to_number_pair(&mut self, a: Value, b: Value) -> VmResult<(f64, f64)> {
        self.tmp_roots.push(b);
        let x = self.to_number_v(a);
        let b = self.tmp_roots.pop().expect("tmp root imbalance");
        let x = x?;
        let y = self.to_number_v(b)?;
        Ok((x, y))
    }

    pub(crate) fn primitive_to_number(&self, v: Value) -> f64 {
        match v {
            Value::Number(n) => n,
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
            _ if v.is_string() => {
                let text = self.heap.str_text(&v).unwrap_or("").to_string();
                parse_number_text(&text)
            }
            Value::Foreign(_) | Value::CFunc(_) => f64::NAN,
            _ => f64::NAN,
        }
    }

    /// ToString, producing a string value.
    pub fn to_string_v(&mut self, v: Value) -> VmResult<Value> {
        if v.is_string() {
            return Ok(v);
        }
        let prim = self.to_primitive(v, PrimitiveHint::String)?;
        if prim.is_string() {
            return Ok(prim);
        }
        let text = self.primitive_to_text(prim);
        Ok(self.heap.mk_string(&text))
    }

    /// ToString, producing Rust text.
    pub fn to_string_text(&mut self, v: Value) -> VmResult<String> {
        let s = self.to_string_v(v)?;
        Ok(self.heap.str_text(&s).unwrap_or("").to_string())
    }

    pub(crate) fn primitive_to_text(&self, v: Value) -> String {
        match v {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => fmt_number(n),
            _ if v.is_string() => self.heap.str_text(&v).unwrap_or("").to_string(),
            Value::CFunc(_) => "function () { [native code] }".to_string(),
            Value::Foreign(_) => "[foreign]".to_string(),
            _ => "[object Object]".to_string(),
        }
    }

    /// ToBoolean; total.
    pub fn to_boolean_v(&self, v: Value) -> bool {
        match v {
            Value::Undefined | Value::Null | Value::Novalue => false,
            Value::Bool(b) => b,
            Value::Number(n) => !(n == 0.0 || n.is_nan()),
            _ if v.is_string() => !self.heap.str_bytes(&v).unwrap_or(&[]).is_empty(),
            _ => true,
        }
    }

    /// Truncating integer conversion; `undefined` yields the default.
    pub fn to_long(&mut self, v: Value, default: i64) -> VmResult<i64> {
        if v.is_undefined() {
            return Ok(default);
        }
        let n = self.to_number_v(v)?;
        if n.is_nan() {
            return Ok(0);
        }
        Ok(n.trunc() as i64)
    }

    /* Equality {{{ */

    /// Strict equality: tag class then payload, with strings compared by
    /// byte content across any storage kind.
    pub fn strict_equals(&self, a: Value, b: Value) -> bool {
        if let (Value::Number(x), Value::Number(y)) = (a, b) {
            return x == y;
        }
        if a.is_string() && b.is_string() {
            return self.heap.str_eq(&a, &b);
        }
        a.identical(&b)
    }

    /// Loose equality, the full historical algorithm.
    pub fn loose_equals(&mut self, a: Value, b: Value) -> VmResult<bool> {
        if a.is_number() && b.is_number() {
            return Ok(a.as_number() == b.as_number() && !a.as_number().unwrap().is_nan());
        }
        if a.is_string() && b.is_string() {
            return Ok(self.heap.str_eq(&a, &b));
        }
        if (a.is_null() && b.is_undefined()) || (a.is_undefined() && b.is_null()) {
            return Ok(true);
        }
        if a.is_null() && b.is_null() || a.is_undefined() && b.is_undefined() {
            return Ok(true);
        }
        if a.is_boolean() {
            let n = self.primitive_to_number(a);
            return self.loose_equals(Value::Number(n), b);
        }
        if b.is_boolean() {
            let n = self.primitive_to_number(b);
            return self.loose_equals(a, Value::Number(n));
        }
        if a.is_number() && b.is_string() {
            let n = self.primitive_to_number(b);
            return self.loose_equals(a, Value::Number(n));
        }
        if a.is_string() && b.is_number() {
            let n = self.primitive_to_number(a);
            return self.loose_equals(Value::Number(n), b);
        }
        if self.is_objectish(a) && !self.is_objectish(b) && !b.is_null() && !b.is_undefined() {
            self.tmp_roots.push(b);
            let prim = self.to_primitive(a, PrimitiveHint::Auto);
            let b = self.tmp_roots.pop().expect("tmp root imbalance");
            return self.loose_equals(prim?, b);
        }
        if self.is_objectish(b) && !self.is_objectish(a) && !a.is_null() && !a.is_undefined() {
            self.tmp_roots.push(a);
            let prim = self.to_primitive(b, PrimitiveHint::Auto);
            let a = self.tmp_roots.pop().expect("tmp root imbalance");
            return self.loose_equals(a, prim?);
        }
        Ok(a.identical(&b))
    }

    /* }}} */

    /* Relational and additive {{{ */

    /// `<` `<=` `>` `>=`; strings compare by content, everything else as
    /// numbers. NaN poisons every comparison to false.
    pub(crate) fn compare(&mut self, a: Value, b: Value) -> VmResult<Option<std::cmp::Ordering>> {
        self.tmp_roots.push(b);
        let pa = self.to_primitive(a, PrimitiveHint::Number);
        let b = self.tmp_roots.pop().expect("tmp root imbalance");
        let pa = pa?;
        self.tmp_roots.push(pa);
        let pb = self.to_primitive(b, PrimitiveHint::Number);
        let pa = self.tmp_roots.pop().expect("tmp root imbalance");
        let pb = pb?;
        if pa.is_string() && pb.is_string() {
            let x = self.heap.str_bytes(&pa).unwrap_or(&[]).to_vec();
            let y = self.heap.str_bytes(&pb).unwrap_or(&[]);
            return Ok(Some(x.as_slice().cmp(y)));
        }
        let x = self.primitive_to_number(pa);
        let y = self.primitive_to_number(pb);
        Ok(x.partial_cmp(&y))
    }

    /// The `+` operator: concatenation when either primitive is a string.
    pub(crate) fn add_values(&mut self, a: Value, b: Value) -> VmResult<Value> {
        self.tmp_roots.push(b);
        let pa = self.to_primitive(a, PrimitiveHint::Auto);
        let b = self.tmp_roots.pop().expect("tmp root imbalance");
        let pa = pa?;
        self.tmp_roots.push(pa);
        let pb = self.to_primitive(b, PrimitiveHint::Auto);
        let pa = self.tmp_roots.pop().expect("tmp root imbalance");
        let pb = pb?;
        if pa.is_string() || pb.is_string() {
            let mut text = if pa.is_string() {
                self.heap.str_text(&pa).unwrap_or("").to_string()
            } else {
                self.primitive_to_text(pa)
            };
            let rhs = if pb.is_string() {
                self.heap.str_text(&pb).unwrap_or("").to_string()
            } else {
                self.primitive_to_text(pb)
            };
            text.push_str(&rhs);
            return Ok(self.heap.mk_string(&text));
        }
        Ok(Value::Number(
            self.primitive_to_number(pa) + self.primitive_to_number(pb),
        ))
    }

    /* }}} */

    /// Makes a string value without allocating when the text is short or
    /// interned.
    pub(crate) fn mk_str_value(&mut self, text: &str) -> Value {
        self.heap.mk_string(text)
    }

    /// `typeof`.
    pub(crate) fn typeof_text(&self, v: Value) -> &'static str {
        match v {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            _ if v.is_string() => "string",
            Value::Function(_) | Value::CFunc(_) => "function",
            Value::Object(_) => {
                if self.callable_slot(v).is_some() {
                    "function"
                } else {
                    "object"
                }
            }
            _ => "object",
        }
    }

    /// Raises an engine invariant breach as a catchable `InternalError`.
    pub(crate) fn internal_error(&mut self, what: &str) -> Throw {
        self.throwf(ErrorKind::InternalError, what)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_number() {
        assert_eq!(fmt_number(0.0), "0");
        assert_eq!(fmt_number(-0.0), "0");
        assert_eq!(fmt_number(42.0), "42");
        assert_eq!(fmt_number(-7.0), "-7");
        assert_eq!(fmt_number(3.14), "3.14");
        assert_eq!(fmt_number(f64::NAN), "NaN");
        assert_eq!(fmt_number(f64::INFINITY), "Infinity");
        assert_eq!(fmt_number(1e21), "1e+21");
        assert_eq!(fmt_number(1e18), "1000000000000000000");
    }

    #[test]
    fn test_to_int32_wraps() {
        assert_eq!(to_int32(0.0), 0);
        assert_eq!(to_int32(-1.0), -1);
        assert_eq!(to_int32(4294967296.0), 0);
        assert_eq!(to_int32(4294967297.0), 1);
        assert_eq!(to_int32(2147483648.0), -2147483648);
        assert_eq!(to_int32(f64::NAN), 0);
        assert_eq!(to_uint32(-1.0), 4294967295);
    }

    #[test]
    fn test_parse_number_text() {
        assert_eq!(parse_number_text(""), 0.0);
        assert_eq!(parse_number_text("  12.5 "), 12.5);
        assert_eq!(parse_number_text("0xff"), 255.0);
        assert_eq!(parse_number_text("-Infinity"), f64::NEG_INFINITY);
        assert!(parse_number_text("12px").is_nan());
    }

    #[test]
    fn test_boolean_idempotent() {
        let mut interp = Interp::new();
        let s = interp.heap.mk_string("x");
        for v in [
            Value::Undefined,
            Value::Null,
            Value::Bool(false),
            Value::Number(0.0),
            Value::nan(),
            Value::Number(2.0),
            s,
        ] {
            let once = interp.to_boolean_v(v);
            let twice = interp.to_boolean_v(Value::Bool(once));
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_strict_equals_semantics() {
        let mut interp = Interp::new();
        let hi = interp.heap.mk_string("hi");
        let hi2 = interp.heap.mk_string("hi");
        let other = interp.heap.mk_string("a string long enough to be owned");
        assert!(interp.strict_equals(hi, hi2));
        assert!(!interp.strict_equals(hi, other));
        // NaN never equals itself; zero sign is ignored.
        assert!(!interp.strict_equals(Value::nan(), Value::nan()));
        assert!(interp.strict_equals(Value::Number(0.0), Value::Number(-0.0)));
        assert!(!interp.strict_equals(Value::Undefined, Value::Null));
    }

    #[test]
    fn test_number_string_roundtrip() {
        for n in [0.0, 1.5, -42.0, 1e9, 0.125, 123456.789] {
            let text = fmt_number(n);
            assert_eq!(parse_number_text(&text), n, "roundtrip of {}", n);
        }
    }
}
