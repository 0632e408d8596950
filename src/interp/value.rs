//! Runtime values for the interpreter

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::FnDecl;
use crate::diagnostics::RuntimeError;

use super::env::Environment;

/// Runtime value
#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    String(String),
    /// Array (mutable interior, shared between aliases)
    Array(Rc<RefCell<Vec<Value>>>),
    /// Map in insertion order
    Map(Rc<RefCell<IndexMap<MapKey, Value>>>),
    /// Half-open integer range `start..end`
    Range(i64, i64),
    /// Enum variant
    Variant {
        enum_name: String,
        variant: String,
    },
    /// User function closed over its defining scope
    Function(Rc<Closure>),
    Builtin(Builtin),
}

/// A function value together with the scope it was created in
pub struct Closure {
    pub decl: Rc<FnDecl>,
    pub env: Environment,
}

/// Keys a map can be indexed by
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Bool(bool),
    Int(i64),
    String(String),
}

impl MapKey {
    pub fn from_value(value: &Value) -> Option<MapKey> {
        match value {
            Value::Bool(b) => Some(MapKey::Bool(*b)),
            Value::Int(n) => Some(MapKey::Int(*n)),
            Value::String(s) => Some(MapKey::String(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            MapKey::Bool(b) => Value::Bool(*b),
            MapKey::Int(n) => Value::Int(*n),
            MapKey::String(s) => Value::String(s.clone()),
        }
    }
}

/// Functions provided by the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
    Println,
    Len,
    Type,
    Str,
    Push,
    Keys,
}

impl Builtin {
    pub fn lookup(name: &str) -> Option<Builtin> {
        let builtin = match name {
            "print" => Builtin::Print,
            "println" => Builtin::Println,
            "len" => Builtin::Len,
            "type" => Builtin::Type,
            "str" => Builtin::Str,
            "push" => Builtin::Push,
            "keys" => Builtin::Keys,
            _ => return None,
        };
        Some(builtin)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Println => "println",
            Builtin::Len => "len",
            Builtin::Type => "type",
            Builtin::Str => "str",
            Builtin::Push => "push",
            Builtin::Keys => "keys",
        }
    }
}

impl Value {
    pub fn array(values: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(values)))
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Range(..) => "range",
            Value::Variant { .. } => "enum",
            Value::Function(_) | Value::Builtin(_) => "function",
        }
    }

    /// `nil` and `false` are falsy, everything else is truthy
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Try to get as integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Try to get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Human-readable inspection string, as the debugger's `print` shows it.
    /// Unlike `Display`, strings are quoted.
    pub fn inspect(&self) -> String {
        format!("{:?}", self)
    }

    /// Values of a sequence, for iteration
    pub fn iter_values(&self) -> Result<Vec<Value>, String> {
        match self {
            Value::Array(arr) => Ok(arr.borrow().clone()),
            Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
            Value::Range(start, end) => Ok((*start..*end).map(Value::Int).collect()),
            Value::Map(map) => Ok(map.borrow().keys().map(MapKey::to_value).collect()),
            other => Err(format!("cannot iterate over {}", other.type_name())),
        }
    }

    /// Key/value pairs of a map, or index/element pairs of an array
    pub fn iter_pairs(&self) -> Result<Vec<(Value, Value)>, String> {
        match self {
            Value::Map(map) => Ok(map
                .borrow()
                .iter()
                .map(|(k, v)| (k.to_value(), v.clone()))
                .collect()),
            Value::Array(arr) => Ok(arr
                .borrow()
                .iter()
                .enumerate()
                .map(|(i, v)| (Value::Int(i as i64), v.clone()))
                .collect()),
            other => Err(format!("cannot iterate over pairs of {}", other.type_name())),
        }
    }

    /// Read `self[index]`
    pub fn index(&self, index: &Value, span: crate::common::Span) -> Result<Value, RuntimeError> {
        match (self, index) {
            (Value::Array(arr), Value::Int(i)) => {
                let arr = arr.borrow();
                usize::try_from(*i)
                    .ok()
                    .and_then(|idx| arr.get(idx).cloned())
                    .ok_or(RuntimeError::IndexOutOfBounds {
                        index: *i,
                        len: arr.len(),
                        line: span.line,
                        span: span.into(),
                    })
            }
            (Value::String(s), Value::Int(i)) => usize::try_from(*i)
                .ok()
                .and_then(|idx| s.chars().nth(idx))
                .map(|c| Value::String(c.to_string()))
                .ok_or(RuntimeError::IndexOutOfBounds {
                    index: *i,
                    len: s.chars().count(),
                    line: span.line,
                    span: span.into(),
                }),
            (Value::Map(map), key) => {
                let key = MapKey::from_value(key).ok_or_else(|| {
                    RuntimeError::type_error(
                        format!("{} cannot be used as a map key", key.type_name()),
                        span,
                    )
                })?;
                Ok(map.borrow().get(&key).cloned().unwrap_or(Value::Nil))
            }
            (base, index) => Err(RuntimeError::type_error(
                format!("cannot index {} with {}", base.type_name(), index.type_name()),
                span,
            )),
        }
    }
}

fn write_seq<'a>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = &'a Value>,
    debug: bool,
) -> fmt::Result {
    for (i, v) in items.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        if debug {
            write!(f, "{:?}", v)?;
        } else {
            write!(f, "{}", v)?;
        }
    }
    Ok(())
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            Value::Array(arr) => {
                write!(f, "[")?;
                write_seq(f, arr.borrow().iter(), true)?;
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {:?}", k.to_value(), v)?;
                }
                write!(f, "}}")
            }
            other => write!(f, "{}", other),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{:?}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(arr) => {
                write!(f, "[")?;
                write_seq(f, arr.borrow().iter(), false)?;
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k.to_value(), v)?;
                }
                write!(f, "}}")
            }
            Value::Range(start, end) => write!(f, "{}..{}", start, end),
            Value::Variant { enum_name, variant } => write!(f, "{}::{}", enum_name, variant),
            Value::Function(closure) => write!(f, "<fn {}>", closure.decl.name),
            Value::Builtin(builtin) => write!(f, "<builtin {}>", builtin.name()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => *a.borrow() == *b.borrow(),
            (Value::Map(a), Value::Map(b)) => *a.borrow() == *b.borrow(),
            (Value::Range(a1, a2), Value::Range(b1, b2)) => a1 == b1 && a2 == b2,
            (
                Value::Variant {
                    enum_name: e1,
                    variant: v1,
                },
                Value::Variant {
                    enum_name: e2,
                    variant: v2,
                },
            ) => e1 == e2 && v1 == v2,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            _ => false,
        }
    }
}

/// Control flow signal (not an error, just flow control)
#[derive(Debug, Clone)]
pub enum ControlFlow {
    /// Return from function with value
    Return(Value),
    /// Break from loop
    Break,
    /// Continue to next iteration
    Continue,
    /// User-level exception raised by `throw`
    Throw(Value),
    /// Runtime failure; catchable by `try`
    Error(RuntimeError),
    /// The debugger asked to stop the program; never caught
    Halt,
}

impl From<RuntimeError> for ControlFlow {
    fn from(error: RuntimeError) -> Self {
        ControlFlow::Error(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inspect_quotes_strings() {
        let v = Value::array(vec![Value::Int(1), Value::String("a".into())]);
        assert_eq!(v.inspect(), r#"[1, "a"]"#);
        assert_eq!(v.to_string(), "[1, a]");
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Int(0).is_truthy());
        assert!(Value::String(String::new()).is_truthy());
    }

    #[test]
    fn float_display_keeps_decimal_point() {
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
    }
}
