//! Function breakpoints
//!
//! One descriptor per top-level function, built once when the session
//! starts. A descriptor's line range never changes; only its `enabled`
//! flag is toggled by `b <name>` / `d <name>`.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::FnDecl;

use super::command::CommandError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDescriptor {
    pub name: String,
    pub enabled: bool,
    /// Line of the declaration
    pub begin_line: usize,
    /// Line of the closing brace
    pub end_line: usize,
}

impl FunctionDescriptor {
    pub fn contains(&self, line: usize) -> bool {
        (self.begin_line..=self.end_line).contains(&line)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FunctionTable {
    descriptors: Vec<FunctionDescriptor>,
}

impl FunctionTable {
    /// Derive descriptors from the interpreter's function symbol table
    pub fn from_functions(functions: &IndexMap<String, Rc<FnDecl>>) -> Self {
        let descriptors = functions
            .iter()
            .map(|(name, decl)| {
                let begin_line = decl.begin_line();
                FunctionDescriptor {
                    name: name.clone(),
                    enabled: false,
                    begin_line,
                    end_line: decl.end_line.max(begin_line),
                }
            })
            .collect();
        Self { descriptors }
    }

    pub fn lookup(&self, name: &str) -> Option<&FunctionDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    pub fn enable(&mut self, name: &str) -> Result<&FunctionDescriptor, CommandError> {
        self.set_enabled(name, true)
    }

    pub fn disable(&mut self, name: &str) -> Result<&FunctionDescriptor, CommandError> {
        self.set_enabled(name, false)
    }

    fn set_enabled(
        &mut self,
        name: &str,
        enabled: bool,
    ) -> Result<&FunctionDescriptor, CommandError> {
        let descriptor = self
            .descriptors
            .iter_mut()
            .find(|d| d.name == name)
            .ok_or_else(|| CommandError::FunctionNotFound(name.to_string()))?;
        descriptor.enabled = enabled;
        Ok(descriptor)
    }

    /// True if some enabled function is declared on `line`
    pub fn entry_line_matches_enabled_function(&self, line: usize) -> bool {
        self.descriptors
            .iter()
            .any(|d| d.enabled && d.begin_line == line)
    }

    /// True if `line` falls inside a function that is not enabled
    pub fn within_disabled_function(&self, line: usize) -> bool {
        self.descriptors
            .iter()
            .any(|d| !d.enabled && d.contains(line))
    }

    pub fn enabled(&self) -> impl Iterator<Item = &FunctionDescriptor> {
        self.descriptors.iter().filter(|d| d.enabled)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunctionDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table() -> FunctionTable {
        let program = crate::parse_source(
            "fn foo() {\n  return 1\n}\n\nfn bar(x) {\n  let y = x\n  return y\n}\n",
        )
        .unwrap();
        FunctionTable::from_functions(&program.functions())
    }

    #[test]
    fn descriptors_span_declaration_to_closing_brace() {
        let table = table();
        assert_eq!(
            table.lookup("bar"),
            Some(&FunctionDescriptor {
                name: "bar".to_string(),
                enabled: false,
                begin_line: 5,
                end_line: 8,
            })
        );
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn unknown_function_changes_nothing() {
        let mut table = table();
        let err = table.enable("baz").unwrap_err();
        assert_eq!(err, CommandError::FunctionNotFound("baz".to_string()));
        assert!(table.iter().all(|d| !d.enabled));
    }

    #[test]
    fn entry_line_requires_enabled_function() {
        let mut table = table();
        assert!(!table.entry_line_matches_enabled_function(5));
        table.enable("bar").unwrap();
        assert!(table.entry_line_matches_enabled_function(5));
        assert!(!table.entry_line_matches_enabled_function(1));
        table.disable("bar").unwrap();
        assert!(!table.entry_line_matches_enabled_function(5));
    }

    #[test]
    fn disabled_ranges() {
        let mut table = table();
        assert!(table.within_disabled_function(2));
        assert!(table.within_disabled_function(8));
        assert!(!table.within_disabled_function(4));
        table.enable("foo").unwrap();
        assert!(!table.within_disabled_function(2));
    }
}
