//! Error types for the CLI.

use core_types::JsError;
use thiserror::Error;

/// CLI-level failures.
#[derive(Debug, Error)]
pub enum CliError {
    /// Compile-time failure in the script.
    #[error("syntax error: {0}")]
    Syntax(JsError),

    /// The script threw and nothing caught it.
    #[error("uncaught {0}")]
    Uncaught(String),

    /// File I/O failure.
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),

    /// Engine-internal failure.
    #[error("engine error: {0}")]
    Engine(String),

    /// REPL line-editing failure.
    #[error("repl error: {0}")]
    Repl(String),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
