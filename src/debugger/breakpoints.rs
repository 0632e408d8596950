//! Line breakpoints

use rustc_hash::FxHashSet;

/// Set of source lines execution should pause on.
///
/// Lines are 1-based; the command layer rejects non-positive numbers
/// before they reach the store.
#[derive(Debug, Clone, Default)]
pub struct BreakpointStore {
    lines: FxHashSet<usize>,
}

impl BreakpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_line(&mut self, line: usize) {
        debug_assert!(line > 0, "line breakpoints are 1-based");
        self.lines.insert(line);
    }

    /// Remove a breakpoint; absent lines are ignored
    pub fn remove_line(&mut self, line: usize) {
        self.lines.remove(&line);
    }

    pub fn has_line(&self, line: usize) -> bool {
        self.lines.contains(&line)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// All breakpoint lines in ascending order
    pub fn lines(&self) -> Vec<usize> {
        let mut lines: Vec<usize> = self.lines.iter().copied().collect();
        lines.sort_unstable();
        lines
    }
}
