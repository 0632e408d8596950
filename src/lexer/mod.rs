//! Lexer for the Kestrel language
//!
//! Token recognition is generated by `logos`; this module attaches spans
//! with 1-based line numbers, which the debugger relies on for breakpoints.

mod tokens;

pub use tokens::{Token, TokenKind};

use crate::common::Span;
use crate::diagnostics::SyntaxError;
use logos::Logos;
use miette::Result;

/// Maps byte offsets to 1-based line numbers
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    pub fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start <= offset)
    }

    pub fn line_count(&self) -> usize {
        self.starts.len()
    }
}

/// Tokenize `source`. The returned stream always ends with an `Eof` token.
pub fn lex(source: &str) -> Result<Vec<Token>> {
    tokenize(source).map_err(|e| miette::Report::new(e).with_source_code(source.to_string()))
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    let lines = LineIndex::new(source);
    let mut lexer = TokenKind::lexer(source);
    let mut tokens = Vec::new();

    while let Some(kind) = lexer.next() {
        let range = lexer.span();
        let span = Span::new(range.start, range.end, lines.line_of(range.start));
        match kind {
            Ok(kind) => tokens.push(Token {
                kind,
                span,
                text: lexer.slice().to_string(),
            }),
            Err(()) => {
                return Err(SyntaxError::InvalidToken {
                    text: lexer.slice().to_string(),
                    line: span.line,
                    span: span.into(),
                });
            }
        }
    }

    let end = source.len();
    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span::new(end, end, lines.line_of(end)),
        text: String::new(),
    });

    tracing::trace!("lexed {} tokens", tokens.len());
    Ok(tokens)
}
