//! Common types shared across the front-end, interpreter and debugger

use serde::{Deserialize, Serialize};

/// A region of source text.
///
/// `start` and `end` are byte offsets; `line` is the 1-based line on which
/// the region begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize) -> Self {
        Self { start, end, line }
    }

    /// Span covering both `self` and `other`; keeps the line of whichever starts first
    pub fn merge(self, other: Span) -> Span {
        let line = if other.start < self.start {
            other.line
        } else {
            self.line
        };
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line,
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
