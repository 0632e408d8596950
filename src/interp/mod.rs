//! Tree-walking interpreter
//!
//! Executes the AST directly. When a [`Debugger`](crate::debugger::Debugger)
//! is attached, it is consulted before every statement, expression and
//! function body.

pub mod env;
pub mod eval;
pub mod value;

pub use env::Environment;
pub use eval::{Completion, Interpreter};
pub use value::{ControlFlow, Value};
