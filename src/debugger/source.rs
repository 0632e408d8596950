//! Source text held for display

/// Lines of the program being debugged. Loaded once, never modified.
#[derive(Debug, Clone, Default)]
pub struct SourceBuffer {
    lines: Vec<String>,
}

impl SourceBuffer {
    pub fn new(source: &str) -> Self {
        Self {
            lines: source.lines().map(str::to_string).collect(),
        }
    }

    /// Text of a 1-based line
    pub fn line(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|idx| self.lines.get(idx))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_one_based() {
        let buffer = SourceBuffer::new("let a = 1\nlet b = 2\n");
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.line(1), Some("let a = 1"));
        assert_eq!(buffer.line(2), Some("let b = 2"));
        assert_eq!(buffer.line(0), None);
        assert_eq!(buffer.line(3), None);
    }
}
