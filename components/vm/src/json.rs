//! JSON output (shared with the debug dumper) and strict JSON input.

use crate::convert::fmt_number;
use crate::interp::{Interp, VmResult};
use core_types::{prop_attr, ErrorKind, Value};
use gc_heap::PropData;

impl Interp {
    /// Renders a value as JSON, or as the debug dialect when `is_debug`
    /// is set. Debug rendering shows functions and `undefined`; JSON mode
    /// omits them inside objects and nulls them inside arrays. Re-entered
    /// values (cycles) render as `null`.
    pub fn to_json_or_debug(&mut self, v: Value, is_debug: bool) -> VmResult<String> {
        let mut out = String::new();
        self.json_visited.clear();
        self.emit_json(v, is_debug, &mut out)?;
        Ok(out)
    }

    fn emit_json(&mut self, v: Value, is_debug: bool, out: &mut String) -> VmResult<()> {
        match v {
            Value::Undefined | Value::Novalue => out.push_str("undefined"),
            Value::Null => out.push_str("null"),
            Value::Bool(b) => out.push_str(if b { "true" } else { "false" }),
            Value::Number(n) => {
                if n.is_finite() {
                    out.push_str(&fmt_number(n));
                } else if is_debug {
                    out.push_str(&fmt_number(n));
                } else {
                    out.push_str("null");
                }
            }
            Value::StrShort { .. }
            | Value::Str5(_)
            | Value::StrOwned(_)
            | Value::StrForeign(_)
            | Value::StrDict(_) => {
                let text = self.heap.str_text(&v).unwrap_or("").to_string();
                quote_into(&text, out);
            }
            Value::Function(id) => {
                let name = self
                    .heap
                    .func(id)
                    .bcode
                    .func_name()
                    .unwrap_or("")
                    .to_string();
                out.push_str(&format!("function {}()", name));
            }
            Value::CFunc(_) => out.push_str("function () { [native code] }"),
            Value::Regexp(id) => {
                let re = self.heap.regexp(id);
                out.push_str(&format!("/{}/{}", re.source, re.flags));
            }
            Value::Foreign(p) => out.push_str(&format!("[foreign {:#x}]", p)),
            Value::Object(id) => {
                if self.json_visited.iter().any(|seen| seen.identical(&v)) {
                    out.push_str("null");
                    return Ok(());
                }
                self.json_visited.push(v);
                let result = if self.heap.is_dense_array(v) {
                    self.emit_array(id, is_debug, out)
                } else {
                    self.emit_object(v, is_debug, out)
                };
                self.json_visited.pop();
                result?;
            }
        }
        Ok(())
    }

    fn emit_array(
        &mut self,
        id: core_types::ObjId,
        is_debug: bool,
        out: &mut String,
    ) -> VmResult<()> {
        out.push('[');
        let len = self.heap.array_len(id);
        for i in 0..len {
            if i > 0 {
                out.push(',');
            }
            let elem = self.heap.array_get(id, i);
            if skip_in_json(&elem, is_debug) || elem.is_novalue() {
                // Holes and non-JSON values become null inside arrays.
                out.push_str(if is_debug && elem.is_undefined() {
                    "undefined"
                } else {
                    "null"
                });
            } else {
                self.emit_json(elem, is_debug, out)?;
            }
        }
        out.push(']');
        Ok(())
    }

    fn emit_object(&mut self, obj: Value, is_debug: bool, out: &mut String) -> VmResult<()> {
        out.push('{');
        let mut first = true;
        let mut cur = self.heap.prop_list(obj).and_then(|l| l.head);
        while let Some(prop_id) = cur {
            let prop = *self.heap.prop(prop_id);
            cur = prop.next;
            if prop.attrs & (prop_attr::NON_ENUMERABLE | prop_attr::HIDDEN) != 0 {
                continue;
            }
            let value = match prop.data {
                PropData::Value(v) => v,
                PropData::Accessor { .. } => self.property_value(obj, prop_id)?,
            };
            if !is_debug && skip_in_json(&value, is_debug) {
                continue;
            }
            if !first {
                out.push(',');
            }
            first = false;
            let key = self.heap.str_text(&prop.name).unwrap_or("").to_string();
            quote_into(&key, out);
            out.push(':');
            self.emit_json(value, is_debug, out)?;
        }
        out.push('}');
        Ok(())
    }

    /// Strict-JSON input. The result is built from engine values; object
    /// keys keep their source order.
    pub fn parse_json(&mut self, text: &str) -> Result<Value, crate::ExecError> {
        let parsed: serde_json::Value = serde_json::from_str(text).map_err(|e| {
            crate::ExecError::Syntax(core_types::JsError::new(
                ErrorKind::SyntaxError,
                format!("invalid JSON: {}", e),
            ))
        })?;
        self.json_value_to_engine(&parsed)
            .map_err(|_| crate::ExecError::Exception)
    }

    fn json_value_to_engine(&mut self, v: &serde_json::Value) -> VmResult<Value> {
        Ok(match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => self.heap.mk_string(s),
            serde_json::Value::Array(elems) => {
                let arr = Value::Object(self.alloc_array()?);
                self.tmp_roots.push(arr);
                for (i, elem) in elems.iter().enumerate() {
                    let elem_v = self.json_value_to_engine(elem)?;
                    let arr_now = *self.tmp_roots.last().expect("tmp root imbalance");
                    if let Value::Object(id) = arr_now {
                        self.heap.array_set(id, i, elem_v);
                    }
                }
                self.tmp_roots.pop().expect("tmp root imbalance")
            }
            serde_json::Value::Object(map) => {
                let obj = Value::Object(self.alloc_object(self.vals.object_prototype)?);
                self.tmp_roots.push(obj);
                for (key, value) in map {
                    let value_v = self.json_value_to_engine(value)?;
                    self.tmp_roots.push(value_v);
                    let key_v = self.heap.mk_string(key);
                    let value_v = self.tmp_roots.pop().expect("tmp root imbalance");
                    let obj_now = *self.tmp_roots.last().expect("tmp root imbalance");
                    self.set_v(obj_now, key_v, value_v)?;
                }
                self.tmp_roots.pop().expect("tmp root imbalance")
            }
        })
    }
}

fn skip_in_json(v: &Value, is_debug: bool) -> bool {
    if is_debug {
        return false;
    }
    matches!(v, Value::Undefined | Value::Function(_) | Value::CFunc(_) | Value::Foreign(_))
}

fn quote_into(text: &str, out: &mut String) {
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atoms() {
        let mut interp = Interp::new();
        assert_eq!(interp.to_json_or_debug(Value::Null, false).unwrap(), "null");
        assert_eq!(
            interp.to_json_or_debug(Value::Bool(true), false).unwrap(),
            "true"
        );
        assert_eq!(
            interp.to_json_or_debug(Value::Number(1.5), false).unwrap(),
            "1.5"
        );
        assert_eq!(
            interp.to_json_or_debug(Value::nan(), false).unwrap(),
            "null"
        );
        assert_eq!(
            interp.to_json_or_debug(Value::nan(), true).unwrap(),
            "NaN"
        );
        let s = interp.heap.mk_string("a\"b");
        assert_eq!(interp.to_json_or_debug(s, false).unwrap(), "\"a\\\"b\"");
    }

    #[test]
    fn test_object_and_array_rendering() {
        let mut interp = Interp::new();
        let obj = Value::Object(interp.alloc_object(interp.vals.object_prototype).unwrap());
        let k = interp.heap.mk_string("k");
        interp.set_v(obj, k, Value::Number(1.0)).unwrap();
        let arr = interp.alloc_array().unwrap();
        interp.heap.array_push(arr, Value::Number(2.0));
        interp.heap.array_push(arr, Value::Undefined);
        let a = interp.heap.mk_string("a");
        interp.set_v(obj, a, Value::Object(arr)).unwrap();
        assert_eq!(
            interp.to_json_or_debug(obj, false).unwrap(),
            "{\"k\":1,\"a\":[2,null]}"
        );
    }

    #[test]
    fn test_undefined_and_functions_omitted_in_json() {
        let mut interp = Interp::new();
        let obj = Value::Object(interp.alloc_object(interp.vals.object_prototype).unwrap());
        let k = interp.heap.mk_string("gone");
        interp.set_v(obj, k, Value::Undefined).unwrap();
        let k2 = interp.heap.mk_string("kept");
        interp.set_v(obj, k2, Value::Number(1.0)).unwrap();
        assert_eq!(
            interp.to_json_or_debug(obj, false).unwrap(),
            "{\"kept\":1}"
        );
        // Debug mode renders them.
        let text = interp.to_json_or_debug(obj, true).unwrap();
        assert!(text.contains("\"gone\":undefined"));
    }

    #[test]
    fn test_cycles_render_null() {
        let mut interp = Interp::new();
        let obj = Value::Object(interp.alloc_object(interp.vals.object_prototype).unwrap());
        let me = interp.heap.mk_string("me");
        interp.set_v(obj, me, obj).unwrap();
        assert_eq!(
            interp.to_json_or_debug(obj, false).unwrap(),
            "{\"me\":null}"
        );
    }

    #[test]
    fn test_parse_json_roundtrip() {
        let mut interp = Interp::new();
        let v = interp
            .parse_json("{\"a\":[1,2,{\"b\":null}],\"c\":\"text\"}")
            .unwrap();
        let back = interp.to_json_or_debug(v, false).unwrap();
        assert_eq!(back, "{\"a\":[1,2,{\"b\":null}],\"c\":\"text\"}");
    }

    #[test]
    fn test_parse_json_rejects_garbage() {
        let mut interp = Interp::new();
        assert!(matches!(
            interp.parse_json("{oops}"),
            Err(crate::ExecError::Syntax(_))
        ));
    }
}
