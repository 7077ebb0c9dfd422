//! Engine-level error types.
//!
//! [`JsError`] describes failures the engine reports outside of running
//! script: syntax errors, internal invariant breaches, resource exhaustion.
//! Exceptions thrown by script are ordinary values and never take this
//! form; the host reads them with `get_thrown_value`.

use crate::SourcePosition;
use std::fmt;

/// The JavaScript error constructor a diagnostic corresponds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Plain `Error`.
    Error,
    /// Malformed source.
    SyntaxError,
    /// Operation applied to a value of the wrong kind.
    TypeError,
    /// Read of an undeclared identifier.
    ReferenceError,
    /// Numeric or length domain failure.
    RangeError,
    /// Error in eval handling.
    EvalError,
    /// Resource exhaustion or invariant breach inside the engine.
    InternalError,
    /// The host interrupt flag was observed.
    InterruptedError,
}

impl ErrorKind {
    /// The constructor name, as user code sees it.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::EvalError => "EvalError",
            ErrorKind::InternalError => "InternalError",
            ErrorKind::InterruptedError => "InterruptedError",
        }
    }
}

/// A diagnostic produced outside of script execution.
#[derive(Debug, Clone)]
pub struct JsError {
    /// Which error constructor the diagnostic corresponds to.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
    /// Where in the source the problem was detected, when known.
    pub source_position: Option<SourcePosition>,
}

impl JsError {
    /// Makes a diagnostic with no position.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> JsError {
        JsError {
            kind,
            message: message.into(),
            source_position: None,
        }
    }

    /// Makes a diagnostic pointing at a source line.
    pub fn at(kind: ErrorKind, message: impl Into<String>, pos: SourcePosition) -> JsError {
        JsError {
            kind,
            message: message.into(),
            source_position: Some(pos),
        }
    }
}

impl fmt::Display for JsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source_position {
            Some(pos) => write!(f, "{}: {} at line {}", self.kind.name(), self.message, pos.line),
            None => write!(f, "{}: {}", self.kind.name(), self.message),
        }
    }
}

impl std::error::Error for JsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(ErrorKind::TypeError.name(), "TypeError");
        assert_eq!(ErrorKind::InterruptedError.name(), "InterruptedError");
    }

    #[test]
    fn test_display_with_position() {
        let e = JsError::at(
            ErrorKind::SyntaxError,
            "unexpected token",
            SourcePosition { line: 3, column: 7 },
        );
        assert_eq!(e.to_string(), "SyntaxError: unexpected token at line 3");
    }
}
