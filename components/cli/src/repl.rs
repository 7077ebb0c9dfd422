//! Interactive read-eval-print loop.

use crate::error::{CliError, CliResult};
use crate::runtime::Runtime;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

impl Runtime {
    /// Runs the interactive loop until EOF or interrupt.
    pub fn repl(&mut self) -> CliResult<()> {
        let mut editor =
            DefaultEditor::new().map_err(|e| CliError::Repl(e.to_string()))?;
        println!("petrel-js (type ctrl-d to exit)");
        loop {
            match editor.readline("> ") {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let _ = editor.add_history_entry(&line);
                    match self.execute_string(&line) {
                        Ok(v) => {
                            if !v.is_undefined() {
                                println!("{}", self.render(v));
                            }
                        }
                        Err(CliError::Syntax(e)) => eprintln!("{}", e),
                        Err(CliError::Uncaught(msg)) => eprintln!("Uncaught {}", msg),
                        Err(e) => eprintln!("{}", e),
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => return Err(CliError::Repl(e.to_string())),
            }
        }
        Ok(())
    }
}
