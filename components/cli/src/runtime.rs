//! Runtime orchestration: one engine with the standard library installed,
//! driving parse, compile, and execution for the CLI.

use crate::error::{CliError, CliResult};
use vm::{ExecError, Interp, Value};

/// An engine instance plus the CLI's execution options.
pub struct Runtime {
    interp: Interp,
    print_bytecode: bool,
    print_ast: bool,
}

impl Runtime {
    /// Creates a runtime with the full standard library installed.
    pub fn new() -> Runtime {
        let mut interp = Interp::new();
        stdlib::install(&mut interp).expect("standard library installation");
        Runtime {
            interp,
            print_bytecode: false,
            print_ast: false,
        }
    }

    /// Enables bytecode listings before execution.
    pub fn with_print_bytecode(mut self, enabled: bool) -> Runtime {
        self.print_bytecode = enabled;
        self
    }

    /// Enables AST dumps before execution.
    pub fn with_print_ast(mut self, enabled: bool) -> Runtime {
        self.print_ast = enabled;
        self
    }

    /// The underlying engine, for embedding-style use.
    pub fn interp_mut(&mut self) -> &mut Interp {
        &mut self.interp
    }

    /// Executes a script file.
    pub fn execute_file(&mut self, path: &str) -> CliResult<Value> {
        let source = std::fs::read_to_string(path)?;
        self.execute_string(&source)
    }

    /// Executes source text.
    pub fn execute_string(&mut self, source: &str) -> CliResult<Value> {
        if self.print_ast {
            let program = parser::Parser::new(source)
                .and_then(|mut p| p.parse_program())
                .map_err(CliError::Syntax)?;
            println!("{:#?}", program);
        }
        if self.print_bytecode {
            let bcode = parser::compile_source(source).map_err(CliError::Syntax)?;
            print!("{}", bytecode::disassemble(&bcode));
        }
        self.interp.exec(source).map_err(|e| self.translate(e))
    }

    /// Compiles a file to a binary bcode image.
    pub fn compile_file(&mut self, path: &str, out: &str) -> CliResult<()> {
        let source = std::fs::read_to_string(path)?;
        let mut image = Vec::new();
        self.interp
            .compile(&source, true, &mut image)
            .map_err(|e| self.translate(e))?;
        std::fs::write(out, image)?;
        Ok(())
    }

    /// Renders a result value the way the REPL and CLI print it.
    pub fn render(&mut self, v: Value) -> String {
        if v.is_string() {
            return self.interp.get_string(&v).unwrap_or("").to_string();
        }
        self.interp
            .to_json_or_debug(v, true)
            .unwrap_or_else(|_| "<unprintable>".to_string())
    }

    fn translate(&mut self, e: ExecError) -> CliError {
        match e {
            ExecError::Syntax(err) => CliError::Syntax(err),
            ExecError::Exception => {
                let detail = match self.interp.get_thrown_value() {
                    Some(thrown) => self
                        .interp
                        .to_json_or_debug(thrown, true)
                        .unwrap_or_else(|_| "<unprintable exception>".to_string()),
                    None => "exception".to_string(),
                };
                self.interp.clear_thrown_value();
                CliError::Uncaught(detail)
            }
            ExecError::AstTooLarge => CliError::Engine("program too large".to_string()),
            ExecError::Internal(msg) => CliError::Engine(msg),
        }
    }
}

impl Default for Runtime {
    fn default() -> Runtime {
        Runtime::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_string() {
        let mut rt = Runtime::new();
        let v = rt.execute_string("[1, 2, 3].map(function (x) { return x * x }).join(',')").unwrap();
        assert_eq!(rt.render(v), "1,4,9");
    }

    #[test]
    fn test_uncaught_exception_is_reported() {
        let mut rt = Runtime::new();
        match rt.execute_string("throw new TypeError('nope')") {
            Err(CliError::Uncaught(msg)) => assert!(msg.contains("nope")),
            other => panic!("expected uncaught error, got {:?}", other),
        }
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let mut rt = Runtime::new();
        assert!(matches!(
            rt.execute_string("function ("),
            Err(CliError::Syntax(_))
        ));
    }

    #[test]
    fn test_execute_file_and_compile_file() {
        use std::io::Write;
        let mut script = tempfile::NamedTempFile::new().unwrap();
        writeln!(script, "var x = 6; x * 7").unwrap();
        let path = script.path().to_str().unwrap().to_string();

        let mut rt = Runtime::new();
        let v = rt.execute_file(&path).unwrap();
        assert_eq!(rt.render(v), "42");

        let out = tempfile::NamedTempFile::new().unwrap();
        let out_path = out.path().to_str().unwrap().to_string();
        rt.compile_file(&path, &out_path).unwrap();
        let image = std::fs::read(&out_path).unwrap();
        assert_eq!(&image[..4], b"PTRL");
    }
}
