//! The Petrel virtual machine.
//!
//! [`Interp`] is one engine instance: it owns the heap, the value stack,
//! the call-frame stack, the global object and named prototypes, and runs
//! the fetch/decode/dispatch loop over compiled bcode. Everything the host
//! touches goes through the public surface on `Interp`: execution
//! (`exec`, `apply`, `parse_json`, `compile`), value construction and
//! inspection, the object and array surfaces, rooting, and exceptions.
//!
//! Error model: operations that can raise a JavaScript exception return
//! `Result<_, Throw>`. `Throw` is a marker; the thrown value itself lives
//! on the engine until a catch handler consumes it or the host reads it
//! with [`Interp::get_thrown_value`]. The host-boundary entry points
//! translate this into [`ExecError`] codes.

#![warn(clippy::all)]
#![deny(unsafe_code)]

mod convert;
mod dispatch;
mod frames;
mod host;
mod interp;
mod json;
mod object_ops;

pub use frames::{BcodeFrame, CatchFrame, CfuncFrame, Frame, TryTag};
pub use host::{ExecOpts, Root};
pub use interp::{ExecError, Interp, InterruptHandle, NativeFn, Options, Throw, VmResult};

pub use core_types::{AttrDesc, ErrorKind, JsError, Value};
