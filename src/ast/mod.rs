//! Abstract Syntax Tree for the Kestrel language
//!
//! This module defines the AST types produced by the parser, plus the
//! node-kind classification the debugger uses to decide where execution
//! may pause.

use crate::common::Span;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Top-level program: a sequence of statements
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}

impl Program {
    /// Top-level named functions in declaration order
    pub fn functions(&self) -> IndexMap<String, Rc<FnDecl>> {
        self.stmts
            .iter()
            .filter_map(|stmt| match &stmt.kind {
                StmtKind::Fn(decl) => Some((decl.name.clone(), Rc::clone(decl))),
                _ => None,
            })
            .collect()
    }
}

// ==================== DECLARATIONS ====================

/// Function declaration (named or anonymous)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FnDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Block,
    /// From the `fn` keyword to the closing brace
    pub span: Span,
    /// Line of the closing brace
    pub end_line: usize,
}

impl FnDecl {
    pub fn begin_line(&self) -> usize {
        self.span.line
    }
}

/// Enum declaration: `enum Color { Red, Green }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumDecl {
    pub name: String,
    pub variants: Vec<String>,
}

// ==================== STATEMENTS ====================

/// Statement with its source location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StmtKind {
    /// `let name = value`
    Let { name: String, value: Expr },
    /// `const NAME = value`
    Const { name: String, value: Expr },
    /// `fn name(params) { ... }`
    Fn(Rc<FnDecl>),
    /// `return [value]`
    Return(Option<Expr>),
    /// `defer expr`
    Defer(Expr),
    /// `enum Name { ... }`
    Enum(EnumDecl),
    Break,
    Continue,
    /// `throw value`
    Throw(Expr),
    /// `target op= value`
    Assign {
        target: Expr,
        op: AssignOp,
        value: Expr,
    },
    /// Expression statement
    Expr(Expr),
}

/// Assignment operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
}

impl AssignOp {
    /// The binary operator a compound assignment applies
    pub fn binary_op(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinaryOp::Add),
            AssignOp::SubAssign => Some(BinaryOp::Sub),
            AssignOp::MulAssign => Some(BinaryOp::Mul),
            AssignOp::DivAssign => Some(BinaryOp::Div),
            AssignOp::RemAssign => Some(BinaryOp::Rem),
        }
    }
}

/// Block of statements
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

// ==================== EXPRESSIONS ====================

/// Expression with its source location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprKind {
    Literal(Literal),
    Ident(String),
    /// `Enum::Variant`
    Path { enum_name: String, variant: String },
    Array(Vec<Expr>),
    Map(Vec<(Expr, Expr)>),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `start..end`, end exclusive
    Range {
        start: Box<Expr>,
        end: Box<Expr>,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// Anonymous function literal
    Function(Rc<FnDecl>),
    Block(Block),
    If {
        condition: Box<Expr>,
        then_branch: Block,
        /// Either another `If` or a `Block`
        else_branch: Option<Box<Expr>>,
    },
    Unless {
        condition: Box<Expr>,
        body: Block,
        else_branch: Option<Block>,
    },
    Case {
        subject: Box<Expr>,
        arms: Vec<CaseArm>,
        default: Option<Block>,
    },
    While {
        condition: Box<Expr>,
        body: Block,
    },
    /// `loop { ... }`
    Loop(Block),
    /// `for (init; condition; update) { ... }`
    For {
        init: Option<Box<Stmt>>,
        condition: Option<Box<Expr>>,
        update: Option<Box<Stmt>>,
        body: Block,
    },
    /// `for x in sequence { ... }`
    ForEach {
        var: String,
        iterable: Box<Expr>,
        body: Block,
    },
    /// `for i in start..end { ... }`
    ForRange {
        var: String,
        start: Box<Expr>,
        end: Box<Expr>,
        body: Block,
    },
    /// `for k, v in map { ... }`
    ForMap {
        key: String,
        value: String,
        map: Box<Expr>,
        body: Block,
    },
    /// `try { ... } catch e { ... } finally { ... }`
    Try {
        body: Block,
        catch: Option<CatchClause>,
        finally: Option<Block>,
    },
}

/// One arm of a `case` expression: `1, 2 => { ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseArm {
    pub patterns: Vec<Expr>,
    pub body: Block,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatchClause {
    pub binding: Option<String>,
    pub body: Block,
}

/// Literal values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Logical
    And,
    Or,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

// ==================== NODE CLASSIFICATION ====================

/// Every kind of node the interpreter visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    // Statements
    Let,
    Const,
    FnDecl,
    Return,
    Defer,
    Enum,
    Break,
    Continue,
    Throw,
    Assign,
    ExprStmt,
    /// Entry into a called function's body
    FnEntry,
    // Expressions
    Literal,
    Ident,
    Path,
    Array,
    Map,
    Unary,
    Binary,
    Range,
    Index,
    Call,
    Function,
    Block,
    If,
    Unless,
    Case,
    While,
    Loop,
    For,
    ForEach,
    ForRange,
    ForMap,
    Try,
}

impl NodeKind {
    /// Whether execution may pause before a node of this kind.
    ///
    /// Bindings, control flow, assignments and calls carry program state
    /// worth inspecting; pure sub-expressions never do.
    pub fn is_stoppable(self) -> bool {
        match self {
            NodeKind::Let
            | NodeKind::Const
            | NodeKind::Return
            | NodeKind::Defer
            | NodeKind::Enum
            | NodeKind::If
            | NodeKind::Unless
            | NodeKind::Case
            | NodeKind::While
            | NodeKind::Loop
            | NodeKind::For
            | NodeKind::ForEach
            | NodeKind::ForRange
            | NodeKind::ForMap
            | NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Assign
            | NodeKind::Call
            | NodeKind::Try
            | NodeKind::Throw
            | NodeKind::FnEntry => true,

            NodeKind::FnDecl
            | NodeKind::ExprStmt
            | NodeKind::Literal
            | NodeKind::Ident
            | NodeKind::Path
            | NodeKind::Array
            | NodeKind::Map
            | NodeKind::Unary
            | NodeKind::Binary
            | NodeKind::Range
            | NodeKind::Index
            | NodeKind::Function
            | NodeKind::Block => false,
        }
    }
}

impl Stmt {
    pub fn node_kind(&self) -> NodeKind {
        match &self.kind {
            StmtKind::Let { .. } => NodeKind::Let,
            StmtKind::Const { .. } => NodeKind::Const,
            StmtKind::Fn(_) => NodeKind::FnDecl,
            StmtKind::Return(_) => NodeKind::Return,
            StmtKind::Defer(_) => NodeKind::Defer,
            StmtKind::Enum(_) => NodeKind::Enum,
            StmtKind::Break => NodeKind::Break,
            StmtKind::Continue => NodeKind::Continue,
            StmtKind::Throw(_) => NodeKind::Throw,
            StmtKind::Assign { .. } => NodeKind::Assign,
            StmtKind::Expr(_) => NodeKind::ExprStmt,
        }
    }
}

impl Expr {
    pub fn node_kind(&self) -> NodeKind {
        match &self.kind {
            ExprKind::Literal(_) => NodeKind::Literal,
            ExprKind::Ident(_) => NodeKind::Ident,
            ExprKind::Path { .. } => NodeKind::Path,
            ExprKind::Array(_) => NodeKind::Array,
            ExprKind::Map(_) => NodeKind::Map,
            ExprKind::Unary { .. } => NodeKind::Unary,
            ExprKind::Binary { .. } => NodeKind::Binary,
            ExprKind::Range { .. } => NodeKind::Range,
            ExprKind::Index { .. } => NodeKind::Index,
            ExprKind::Call { .. } => NodeKind::Call,
            ExprKind::Function(_) => NodeKind::Function,
            ExprKind::Block(_) => NodeKind::Block,
            ExprKind::If { .. } => NodeKind::If,
            ExprKind::Unless { .. } => NodeKind::Unless,
            ExprKind::Case { .. } => NodeKind::Case,
            ExprKind::While { .. } => NodeKind::While,
            ExprKind::Loop(_) => NodeKind::Loop,
            ExprKind::For { .. } => NodeKind::For,
            ExprKind::ForEach { .. } => NodeKind::ForEach,
            ExprKind::ForRange { .. } => NodeKind::ForRange,
            ExprKind::ForMap { .. } => NodeKind::ForMap,
            ExprKind::Try { .. } => NodeKind::Try,
        }
    }
}

/// Borrowed view of the node the interpreter is about to evaluate
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Stmt(&'a Stmt),
    Expr(&'a Expr),
    /// A function about to run its body; located at its declaration
    FnEntry(&'a FnDecl),
}

impl Node<'_> {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Stmt(stmt) => stmt.node_kind(),
            Node::Expr(expr) => expr.node_kind(),
            Node::FnEntry(_) => NodeKind::FnEntry,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Node::Stmt(stmt) => stmt.span,
            Node::Expr(expr) => expr.span,
            Node::FnEntry(decl) => decl.span,
        }
    }

    pub fn line(&self) -> usize {
        self.span().line
    }
}
