//! Kestrel: a small scripting language with an interactive debugger
//!
//! Kestrel programs are run by a tree-walking interpreter. Attaching a
//! [`debugger::Debugger`] lets a user pause the program at line or function
//! breakpoints, step through it, list source and evaluate expressions in the
//! paused scope.
//!
//! # Architecture
//!
//! ```text
//! Source → Lexer → Parser → AST → Interpreter ⇄ Debugger
//! ```
//!
//! # Example
//!
//! ```text
//! fn fib(n) {
//!     if n < 2 { return n }
//!     return fib(n - 1) + fib(n - 2)
//! }
//!
//! for i in 0..10 {
//!     println(i, fib(i))
//! }
//! ```

pub mod ast;
pub mod common;
pub mod debugger;
pub mod diagnostics;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod repl;

pub use diagnostics::SourceFile;

pub use ast::Program;
pub use debugger::{DebugConfig, Debugger};
pub use interp::{Completion, Interpreter, Value};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parse source code to AST
pub fn parse_source(source: &str) -> miette::Result<Program> {
    let tokens = lexer::lex(source)?;
    parser::parse(&tokens, source)
}

/// Interpret source code directly
pub fn interpret(source: &str) -> miette::Result<Value> {
    let program = parse_source(source)?;
    let mut interpreter = Interpreter::new();
    interpreter.interpret(&program)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn interpret_returns_last_expression() {
        let value = interpret("let a = 2\nlet b = 3\na * b\n").unwrap();
        assert_eq!(value, Value::Int(6));
    }
}
