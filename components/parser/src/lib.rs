//! JavaScript front end: tokenizer, recursive-descent parser, and the
//! AST-to-bytecode compiler.
//!
//! The entry points are [`Parser::new`] + [`Parser::parse_program`] for
//! source → AST, and [`compile_program`] for AST → [`bytecode::Bcode`].
//! `compile_source` chains the two.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod ast;
mod compiler;
mod lexer;
#[allow(clippy::module_inception)]
mod parser;

pub use compiler::{compile_program, compile_source};
pub use lexer::{Keyword, Lexer, Punct, Token};
pub use parser::Parser;
