mod core;
pub mod ast;
pub mod analysis;
pub mod cmdline;
pub mod imports;
pub mod interpreter;
pub mod lexer;
pub mod packages;

pub use crate::core::errors::{self, ErrorSink, MinikError};
pub use crate::core::{Loc, CaptureOutput};
pub use crate::interpreter::Interpreter;

use crate::{ast::{Parser, Stmt}, imports::SourceLoader, lexer::{Scanner, Token}};

/// Scans and parses `source`, collecting every lexical and syntax error.
pub fn parse(source: &str) -> (Vec<Stmt>, Vec<MinikError>) {
    let mut errs = Vec::new();
    let tokens: Vec<Token> = Scanner::new(source)
        .filter_map(|token| token.map_err(|e| errs.push(e)).ok())
        .collect();

    let (stmts, mut parse_errs) = Parser::parse(&mut tokens.into_iter());
    errs.append(&mut parse_errs);
    (stmts, errs)
}

/// Parses `source`, expands its file imports through `loader` and runs it.
pub fn run(interpreter: &mut Interpreter, source: &str, loader: &mut dyn SourceLoader) -> Vec<MinikError> {
    let (mut stmts, mut errs) = parse(source);
    errs.append(&mut imports::expand(&mut stmts, loader));
    if !errs.is_empty() {
        return errs;
    }

    interpreter.interpret(&stmts)
}
