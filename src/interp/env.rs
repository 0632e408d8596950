//! Lexical scopes
//!
//! Scopes form a parent-linked chain of reference-counted frames so that
//! closures, the interpreter and a paused debugger can all hold the same
//! scope without copying it.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignError {
    Undefined,
    Constant,
}

struct Binding {
    value: Value,
    mutable: bool,
}

#[derive(Default)]
struct Scope {
    vars: FxHashMap<String, Binding>,
    parent: Option<Environment>,
}

/// Handle to a scope; cloning shares the scope
#[derive(Clone, Default)]
pub struct Environment(Rc<RefCell<Scope>>);

impl Environment {
    /// Create an empty root scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scope nested inside this one
    pub fn child(&self) -> Environment {
        Environment(Rc::new(RefCell::new(Scope {
            vars: FxHashMap::default(),
            parent: Some(self.clone()),
        })))
    }

    /// Bind `name` in this scope, shadowing any outer binding
    pub fn define(&self, name: impl Into<String>, value: Value, mutable: bool) {
        self.0
            .borrow_mut()
            .vars
            .insert(name.into(), Binding { value, mutable });
    }

    /// Look `name` up through the scope chain
    pub fn get(&self, name: &str) -> Option<Value> {
        let scope = self.0.borrow();
        match scope.vars.get(name) {
            Some(binding) => Some(binding.value.clone()),
            None => scope.parent.as_ref()?.get(name),
        }
    }

    /// Update the nearest binding of `name`
    pub fn assign(&self, name: &str, value: Value) -> Result<(), AssignError> {
        let mut guard = self.0.borrow_mut();
        let scope = &mut *guard;
        match scope.vars.get_mut(name) {
            Some(binding) if !binding.mutable => Err(AssignError::Constant),
            Some(binding) => {
                binding.value = value;
                Ok(())
            }
            None => match &scope.parent {
                Some(parent) => parent.assign(name, value),
                None => Err(AssignError::Undefined),
            },
        }
    }

    /// Names visible from this scope, innermost first, without duplicates
    pub fn visible_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut current = Some(self.clone());
        while let Some(env) = current {
            let scope = env.0.borrow();
            let mut local: Vec<&String> = scope.vars.keys().collect();
            local.sort();
            for name in local {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
            current = scope.parent.clone();
        }
        names
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.visible_names()).finish()
    }
}
