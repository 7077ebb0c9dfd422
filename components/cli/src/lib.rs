//! Command-line front end for the Petrel engine.

#![warn(clippy::all)]
#![deny(unsafe_code)]

mod args;
mod error;
mod repl;
mod runtime;

pub use args::Cli;
pub use error::{CliError, CliResult};
pub use runtime::Runtime;
