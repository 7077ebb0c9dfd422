//! Core JavaScript value types shared by every engine component.
//!
//! This crate provides the foundational vocabulary for the Petrel engine:
//! the tagged value representation, object and property attribute bits,
//! structured property-attribute descriptors, error kinds, and source
//! location tracking.
//!
//! # Overview
//!
//! - [`Value`] - Tagged representation of JavaScript values
//! - [`AttrDesc`] - Structured property-attribute update descriptor
//! - [`JsError`] - Engine-level errors with source positions
//! - [`ErrorKind`] - JavaScript error constructors the engine knows about
//! - [`SourcePosition`] - Source code location
//!
//! # Examples
//!
//! ```
//! use core_types::Value;
//!
//! let num = Value::Number(42.0);
//! assert!(num.is_number());
//! assert_eq!(num.as_number(), Some(42.0));
//!
//! // Short strings are stored inline in the value itself.
//! let s = Value::inline_str(b"ok").unwrap();
//! assert!(s.is_string());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod attr;
mod error;
mod source;
mod value;

pub use attr::{
    obj_attr, prop_attr, AttrDesc, ObjAttrs, PropAttrs,
};
pub use error::{ErrorKind, JsError};
pub use source::SourcePosition;
pub use value::{CFuncId, FuncId, ObjId, PropId, RegexpId, Value, MAX_INLINE_STR};
