//! Tagged JavaScript value representation.
//!
//! A [`Value`] is a small `Copy` tagged union. Finite numbers carry their
//! payload directly; every other kind carries either inline bytes (short
//! strings) or a handle into one of the engine's heaps. The variants map
//! one-to-one onto a NaN-boxing tag layout, so exactly one kind predicate
//! holds for any value.

use std::fmt;

/// Maximum number of bytes a string may have and still be stored inline
/// in the value word.
pub const MAX_INLINE_STR: usize = 5;

/// Handle of a generic object in the object arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjId(pub u32);

/// Handle of a JavaScript function (closure) in the function arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncId(pub u32);

/// Handle of a property cell in the property arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropId(pub u32);

/// Handle of a registered native callable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CFuncId(pub u32);

/// Handle of a compiled regular expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegexpId(pub u32);

/// A JavaScript value.
///
/// The string kinds are deliberately split the way the tag set splits them:
/// strings of up to 4 bytes and of exactly 5 bytes live inline in the value,
/// owned strings are offsets into the engine's relocatable string buffer,
/// foreign strings index a table of caller-owned data, and dictionary
/// strings index an immutable table of common short strings. All of them
/// satisfy [`Value::is_string`] and compare equal by byte content regardless
/// of which kind carries the bytes (the engine implements that comparison,
/// since it needs heap access).
///
/// `Novalue` is the dense-array hole sentinel. It is never observable from
/// user code; reads of a hole yield `Undefined`.
#[derive(Debug, Clone, Copy)]
pub enum Value {
    /// JavaScript `undefined`.
    Undefined,
    /// JavaScript `null`.
    Null,
    /// JavaScript boolean.
    Bool(bool),
    /// IEEE 754 double, including the canonical NaN.
    Number(f64),
    /// Inline string of at most 4 bytes.
    StrShort {
        /// Number of meaningful bytes in `bytes`.
        len: u8,
        /// The string bytes; positions past `len` are zero.
        bytes: [u8; 4],
    },
    /// Inline string of exactly 5 bytes.
    Str5([u8; 5]),
    /// Owned string: byte offset of a length-prefixed run in the engine's
    /// string buffer. The offset is rewritten by the GC when it compacts.
    StrOwned(u32),
    /// Foreign string: index into the engine's table of caller-owned bytes.
    StrForeign(u32),
    /// Dictionary string: index into the precomputed interned table.
    StrDict(u16),
    /// Generic object.
    Object(ObjId),
    /// JavaScript function (closure).
    Function(FuncId),
    /// Native callable.
    CFunc(CFuncId),
    /// Regular expression.
    Regexp(RegexpId),
    /// Opaque host pointer. Carries no liveness information for the GC.
    Foreign(usize),
    /// Dense-array hole sentinel; never visible to user code.
    Novalue,
}

impl Value {
    /// Makes a number value.
    pub fn number(n: f64) -> Value {
        Value::Number(n)
    }

    /// Makes the canonical NaN value.
    pub fn nan() -> Value {
        Value::Number(f64::NAN)
    }

    /// Tries to store `bytes` inline; returns `None` if they don't fit.
    pub fn inline_str(bytes: &[u8]) -> Option<Value> {
        match bytes.len() {
            0..=4 => {
                let mut buf = [0u8; 4];
                buf[..bytes.len()].copy_from_slice(bytes);
                Some(Value::StrShort {
                    len: bytes.len() as u8,
                    bytes: buf,
                })
            }
            5 => {
                let mut buf = [0u8; 5];
                buf.copy_from_slice(bytes);
                Some(Value::Str5(buf))
            }
            _ => None,
        }
    }

    /// For inline strings, returns the stored bytes.
    pub fn inline_str_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::StrShort { len, bytes } => Some(&bytes[..*len as usize]),
            Value::Str5(bytes) => Some(&bytes[..]),
            _ => None,
        }
    }

    /// True for `undefined`.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// True for `null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for booleans.
    pub fn is_boolean(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    /// True for numbers, including NaN.
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    /// True for every string kind.
    pub fn is_string(&self) -> bool {
        matches!(
            self,
            Value::StrShort { .. }
                | Value::Str5(_)
                | Value::StrOwned(_)
                | Value::StrForeign(_)
                | Value::StrDict(_)
        )
    }

    /// True for objects and functions (functions are objects).
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Function(_))
    }

    /// True for generic (non-function) objects only.
    pub fn is_generic_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// True for JavaScript functions.
    pub fn is_function(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    /// True for bare native callables. Note that native constructors
    /// wrapped in objects satisfy the engine-level callability check
    /// instead, since that requires a property lookup.
    pub fn is_cfunction(&self) -> bool {
        matches!(self, Value::CFunc(_))
    }

    /// True for regular expressions.
    pub fn is_regexp(&self) -> bool {
        matches!(self, Value::Regexp(_))
    }

    /// True for opaque host pointers.
    pub fn is_foreign(&self) -> bool {
        matches!(self, Value::Foreign(_))
    }

    /// True for the dense-array hole sentinel.
    pub fn is_novalue(&self) -> bool {
        matches!(self, Value::Novalue)
    }

    /// Returns the number payload, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the boolean payload, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the object handle, if this is a generic object.
    pub fn as_object(&self) -> Option<ObjId> {
        match self {
            Value::Object(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns the function handle, if this is a function.
    pub fn as_function(&self) -> Option<FuncId> {
        match self {
            Value::Function(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns the host pointer payload, if this is a foreign value.
    pub fn as_foreign(&self) -> Option<usize> {
        match self {
            Value::Foreign(p) => Some(*p),
            _ => None,
        }
    }

    /// Whether two values are the same variant with bit-identical payload.
    ///
    /// This is *not* JavaScript strict equality: owned and inline strings
    /// holding the same bytes are `identical`-unequal. The engine's
    /// `strict_equals` layers content-aware string comparison on top.
    pub fn identical(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (Undefined, Undefined) | (Null, Null) | (Novalue, Novalue) => true,
            (Bool(a), Bool(b)) => a == b,
            (Number(a), Number(b)) => a.to_bits() == b.to_bits(),
            (StrShort { len: l1, bytes: b1 }, StrShort { len: l2, bytes: b2 }) => {
                l1 == l2 && b1 == b2
            }
            (Str5(a), Str5(b)) => a == b,
            (StrOwned(a), StrOwned(b)) => a == b,
            (StrForeign(a), StrForeign(b)) => a == b,
            (StrDict(a), StrDict(b)) => a == b,
            (Object(a), Object(b)) => a == b,
            (Function(a), Function(b)) => a == b,
            (CFunc(a), CFunc(b)) => a == b,
            (Regexp(a), Regexp(b)) => a == b,
            (Foreign(a), Foreign(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    /// Heap-free rendering, usable for diagnostics only. Heap-backed kinds
    /// render as their handle; the engine's `to_string` conversion produces
    /// the JavaScript-visible text.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::StrShort { .. } | Value::Str5(_) => {
                let bytes = self.inline_str_bytes().unwrap_or(&[]);
                write!(f, "\"{}\"", String::from_utf8_lossy(bytes))
            }
            Value::StrOwned(off) => write!(f, "<str@{}>", off),
            Value::StrForeign(idx) => write!(f, "<fstr#{}>", idx),
            Value::StrDict(idx) => write!(f, "<dstr#{}>", idx),
            Value::Object(id) => write!(f, "<object#{}>", id.0),
            Value::Function(id) => write!(f, "<function#{}>", id.0),
            Value::CFunc(id) => write!(f, "<cfunction#{}>", id.0),
            Value::Regexp(id) => write!(f, "<regexp#{}>", id.0),
            Value::Foreign(p) => write!(f, "<foreign:{:#x}>", p),
            Value::Novalue => write!(f, "<novalue>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exactly_one_kind_predicate() {
        let samples = [
            Value::Undefined,
            Value::Null,
            Value::Bool(true),
            Value::Number(3.14),
            Value::nan(),
            Value::inline_str(b"abc").unwrap(),
            Value::inline_str(b"hello").unwrap(),
            Value::StrOwned(16),
            Value::StrForeign(0),
            Value::StrDict(3),
            Value::Object(ObjId(1)),
            Value::Function(FuncId(1)),
            Value::CFunc(CFuncId(0)),
            Value::Regexp(RegexpId(0)),
            Value::Foreign(0xdead),
            Value::Novalue,
        ];
        for v in &samples {
            let hits = [
                v.is_undefined(),
                v.is_null(),
                v.is_boolean(),
                v.is_number(),
                v.is_string(),
                v.is_generic_object(),
                v.is_function(),
                v.is_cfunction(),
                v.is_regexp(),
                v.is_foreign(),
                v.is_novalue(),
            ]
            .iter()
            .filter(|&&b| b)
            .count();
            assert_eq!(hits, 1, "value {:?} matched {} predicates", v, hits);
        }
    }

    #[test]
    fn test_inline_str_limits() {
        assert!(matches!(
            Value::inline_str(b""),
            Some(Value::StrShort { len: 0, .. })
        ));
        assert!(matches!(
            Value::inline_str(b"abcd"),
            Some(Value::StrShort { len: 4, .. })
        ));
        assert!(matches!(Value::inline_str(b"abcde"), Some(Value::Str5(_))));
        assert!(Value::inline_str(b"abcdef").is_none());
    }

    #[test]
    fn test_inline_str_bytes_roundtrip() {
        let v = Value::inline_str(b"hi").unwrap();
        assert_eq!(v.inline_str_bytes(), Some(&b"hi"[..]));
        let v = Value::inline_str(b"fives").unwrap();
        assert_eq!(v.inline_str_bytes(), Some(&b"fives"[..]));
    }

    #[test]
    fn test_identical_is_bitwise() {
        assert!(Value::Number(0.0).identical(&Value::Number(0.0)));
        // Bitwise, so canonical NaN matches itself and -0.0 differs from 0.0.
        assert!(Value::nan().identical(&Value::nan()));
        assert!(!Value::Number(0.0).identical(&Value::Number(-0.0)));
        // Same text, different storage kind: not identical.
        assert!(!Value::inline_str(b"ab").unwrap().identical(&Value::StrOwned(0)));
    }

    #[test]
    fn test_object_includes_functions() {
        assert!(Value::Function(FuncId(0)).is_object());
        assert!(Value::Object(ObjId(0)).is_object());
        assert!(!Value::Function(FuncId(0)).is_generic_object());
    }
}
