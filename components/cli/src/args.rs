//! Command-line arguments.

use clap::Parser;

/// The petrel-js command line.
#[derive(Debug, Parser)]
#[command(name = "petrel-js", about = "Petrel embeddable JavaScript engine", version)]
pub struct Cli {
    /// Script file to execute.
    pub file: Option<String>,

    /// Evaluate inline code instead of a file.
    #[arg(short, long)]
    pub eval: Option<String>,

    /// Start an interactive session.
    #[arg(long)]
    pub repl: bool,

    /// Print the AST before execution.
    #[arg(long)]
    pub print_ast: bool,

    /// Print a bytecode listing before execution.
    #[arg(long)]
    pub print_bytecode: bool,

    /// Compile to a binary bcode image instead of executing.
    #[arg(long, value_name = "OUT")]
    pub compile: Option<String>,
}
