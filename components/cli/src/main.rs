//! petrel-js entry point: parse arguments, hand off to the runtime.

use clap::Parser;
use cli::{Cli, CliError, Runtime};

fn main() {
    let cli = Cli::parse();

    let mut runtime = Runtime::new()
        .with_print_bytecode(cli.print_bytecode)
        .with_print_ast(cli.print_ast);

    let outcome = if let (Some(out), Some(file)) = (&cli.compile, &cli.file) {
        runtime.compile_file(file, out).map(|()| None)
    } else if let Some(file) = &cli.file {
        runtime.execute_file(file).map(Some)
    } else if let Some(code) = &cli.eval {
        runtime.execute_string(code).map(Some)
    } else if cli.repl {
        runtime.repl().map(|()| None)
    } else {
        println!("petrel-js: an embeddable JavaScript engine");
        println!();
        println!("Usage:");
        println!("  petrel-js <FILE>               Execute a script file");
        println!("  petrel-js --eval <CODE>        Evaluate inline code");
        println!("  petrel-js --repl               Start an interactive session");
        println!("  petrel-js <FILE> --compile <OUT>   Write a binary bcode image");
        println!();
        println!("Run 'petrel-js --help' for all options.");
        return;
    };

    match outcome {
        Ok(Some(result)) => {
            if !result.is_undefined() {
                println!("{}", runtime.render(result));
            }
        }
        Ok(None) => {}
        Err(CliError::Syntax(e)) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
        Err(CliError::Uncaught(msg)) => {
            eprintln!("Uncaught {}", msg);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
