//! Diagnostic reporting with source locations
//!
//! This module provides rich error messages with source locations using miette.

use crate::common::Span;
use miette::{Diagnostic, NamedSource, SourceSpan};
use std::sync::Arc;
use thiserror::Error;

/// Source file for error reporting
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub content: Arc<str>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: Arc::from(content.into()),
        }
    }

    pub fn to_named_source(&self) -> NamedSource<String> {
        NamedSource::new(self.name.clone(), self.content.to_string())
    }
}

/// Convert our Span to miette's SourceSpan
impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        SourceSpan::new(span.start.into(), span.len())
    }
}

/// Lexing and parsing errors
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum SyntaxError {
    #[error("Unrecognized input `{text}` on line {line}")]
    #[diagnostic(code(lex::invalid_token))]
    InvalidToken {
        text: String,
        line: usize,
        #[label("not a valid token")]
        span: SourceSpan,
    },

    #[error("Unexpected token on line {line}: expected {expected}, found {found}")]
    #[diagnostic(code(parse::unexpected_token))]
    UnexpectedToken {
        expected: String,
        found: String,
        line: usize,
        #[label("unexpected token here")]
        span: SourceSpan,
    },

    #[error("Unexpected end of input: expected {expected}")]
    #[diagnostic(code(parse::unexpected_eof))]
    UnexpectedEof {
        expected: String,
        #[label("expected more tokens")]
        span: SourceSpan,
    },

    #[error("Invalid assignment target on line {line}")]
    #[diagnostic(
        code(parse::invalid_assign_target),
        help("only variables and indexed elements can be assigned to")
    )]
    InvalidAssignTarget {
        line: usize,
        #[label("cannot assign to this")]
        span: SourceSpan,
    },

    #[error("Invalid number literal `{text}` on line {line}")]
    #[diagnostic(code(parse::invalid_number))]
    InvalidNumber {
        text: String,
        line: usize,
        #[label("out of range")]
        span: SourceSpan,
    },
}

/// Errors raised while evaluating a program
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("Undefined variable `{name}` on line {line}")]
    #[diagnostic(
        code(runtime::undefined_variable),
        help("did you mean to declare this variable with `let`?")
    )]
    UndefinedVariable {
        name: String,
        line: usize,
        #[label("not found in this scope")]
        span: SourceSpan,
    },

    #[error("Cannot assign to constant `{name}` on line {line}")]
    #[diagnostic(code(runtime::assign_to_constant))]
    AssignToConstant {
        name: String,
        line: usize,
        #[label("declared with `const`")]
        span: SourceSpan,
    },

    #[error("Type error on line {line}: {message}")]
    #[diagnostic(code(runtime::type_error))]
    TypeError {
        message: String,
        line: usize,
        #[label("{message}")]
        span: SourceSpan,
    },

    #[error("Division by zero on line {line}")]
    #[diagnostic(code(runtime::division_by_zero))]
    DivisionByZero {
        line: usize,
        #[label("divisor is zero")]
        span: SourceSpan,
    },

    #[error("Index {index} out of bounds for length {len} on line {line}")]
    #[diagnostic(code(runtime::index_out_of_bounds))]
    IndexOutOfBounds {
        index: i64,
        len: usize,
        line: usize,
        #[label("out of bounds")]
        span: SourceSpan,
    },

    #[error("Function `{name}` expects {expected} arguments, got {found} (line {line})")]
    #[diagnostic(code(runtime::arity_mismatch))]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
        line: usize,
        #[label("called here")]
        span: SourceSpan,
    },

    #[error("Unknown variant `{enum_name}::{variant}` on line {line}")]
    #[diagnostic(code(runtime::unknown_variant))]
    UnknownVariant {
        enum_name: String,
        variant: String,
        line: usize,
        #[label("no such variant")]
        span: SourceSpan,
    },

    #[error("`{keyword}` outside of {context}")]
    #[diagnostic(code(runtime::misplaced_control_flow))]
    MisplacedControlFlow {
        keyword: &'static str,
        context: &'static str,
    },

    #[error("Uncaught exception: {value}")]
    #[diagnostic(code(runtime::uncaught))]
    Uncaught { value: String },
}

impl RuntimeError {
    pub fn type_error(message: impl Into<String>, span: Span) -> Self {
        RuntimeError::TypeError {
            message: message.into(),
            line: span.line,
            span: span.into(),
        }
    }
}

/// Attach the program text to an error so miette can render a snippet
pub fn with_source(error: impl Diagnostic + Send + Sync + 'static, source: &SourceFile) -> miette::Report {
    miette::Report::new(error).with_source_code(source.to_named_source())
}
