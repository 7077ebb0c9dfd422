//! Compiled bytecode for the Petrel engine.
//!
//! A [`Bcode`] is the compiled form of one script or function body: the
//! opcode byte stream, a literal pool, the embedded name table (function
//! name, formal parameters, hoisted locals), a strict-mode flag, and
//! line-number delta records for error reporting. Bcode records are shared
//! by reference counting: the engine, any call frame executing them, and
//! any function literal referencing them all hold an `Rc<Bcode>`.
//!
//! [`BcodeBuilder`] is the append-and-patch emitter the compiler drives;
//! [`disassemble`] renders a listing; [`serialize`]/[`deserialize`] are the
//! binary codec used by ahead-of-time compilation.

#![warn(clippy::all)]
#![deny(unsafe_code)]

mod bcode;
mod disasm;
mod op;
mod serialize;

pub use bcode::{read_lit_idx, read_off, Bcode, BcodeBuilder, LineRec, Lit, LitIdx, Patch};
pub use disasm::disassemble;
pub use op::Op;
pub use serialize::{deserialize, serialize};

/// Byte offset inside an opcode stream.
pub type BcodeOff = u32;
