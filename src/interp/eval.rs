//! Tree-walking interpreter

use std::rc::Rc;

use indexmap::IndexMap;
use miette::Result;
use rustc_hash::FxHashMap;

use crate::ast::*;
use crate::common::Span;
use crate::debugger::{Debugger, Evaluator, Resume};
use crate::diagnostics::RuntimeError;

use super::env::{AssignError, Environment};
use super::value::{Builtin, Closure, ControlFlow, MapKey, Value};

/// How a program run ended
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Ran to the end; value of the last expression statement
    Value(Value),
    /// Stopped from the debugger
    Quit,
}

/// Outcome of one loop iteration
enum Step {
    Next,
    Exit,
}

/// Tree-walking interpreter
pub struct Interpreter {
    /// Global scope
    globals: Environment,
    /// Scope in effect for the node being evaluated
    env: Environment,
    /// Top-level function definitions (by name)
    functions: IndexMap<String, Rc<FnDecl>>,
    /// Enum definitions (by name)
    enums: FxHashMap<String, Vec<String>>,
    /// Deferred expressions per active function frame
    defers: Vec<Vec<(Expr, Environment)>>,
    /// Output buffer for testing
    output: Vec<String>,
    debugger: Option<Box<Debugger>>,
}

impl Interpreter {
    /// Create a new interpreter
    pub fn new() -> Self {
        let globals = Environment::new();
        Interpreter {
            env: globals.clone(),
            globals,
            functions: IndexMap::new(),
            enums: FxHashMap::default(),
            defers: Vec::new(),
            output: Vec::new(),
            debugger: None,
        }
    }

    pub fn attach_debugger(&mut self, debugger: Debugger) {
        self.debugger = Some(Box::new(debugger));
    }

    pub fn detach_debugger(&mut self) -> Option<Debugger> {
        self.debugger.take().map(|debugger| *debugger)
    }

    pub fn debugger(&self) -> Option<&Debugger> {
        self.debugger.as_deref()
    }

    /// Get captured output (for testing)
    pub fn get_output(&self) -> &[String] {
        &self.output
    }

    /// Clear output buffer
    pub fn clear_output(&mut self) {
        self.output.clear();
    }

    /// Top-level functions of the last program run
    pub fn functions(&self) -> &IndexMap<String, Rc<FnDecl>> {
        &self.functions
    }

    pub fn globals(&self) -> &Environment {
        &self.globals
    }

    /// Run a program to completion
    pub fn run(&mut self, program: &Program) -> Result<Completion, RuntimeError> {
        // Hoist top-level functions so they can be called before their declaration
        self.functions = program.functions();
        for (name, decl) in &self.functions {
            let closure = Closure {
                decl: Rc::clone(decl),
                env: self.globals.clone(),
            };
            self.globals
                .define(name.clone(), Value::Function(Rc::new(closure)), false);
        }
        tracing::debug!(
            statements = program.stmts.len(),
            functions = self.functions.len(),
            "running program"
        );

        if let Some(debugger) = self.debugger.as_mut() {
            debugger.begin_session(&self.functions);
        }

        let globals = self.globals.clone();
        let result = self.in_scope(globals, |interp| interp.exec_frame(&program.stmts));
        match result {
            Ok(value) | Err(ControlFlow::Return(value)) => Ok(Completion::Value(value)),
            Err(ControlFlow::Halt) => Ok(Completion::Quit),
            Err(other) => Err(uncaught(other)),
        }
    }

    /// Run a program, treating a debugger quit as a `nil` result
    pub fn interpret(&mut self, program: &Program) -> Result<Value> {
        match self.run(program)? {
            Completion::Value(value) => Ok(value),
            Completion::Quit => Ok(Value::Nil),
        }
    }

    /// Give the debugger a chance to pause before `node`
    fn checkpoint(&mut self, node: Node<'_>) -> Result<(), ControlFlow> {
        // The debugger is taken out while it runs so that evaluating a
        // command cannot re-enter it.
        let Some(mut debugger) = self.debugger.take() else {
            return Ok(());
        };
        let scope = self.env.clone();
        let resume = debugger.visit(node, &scope, self);
        self.debugger = Some(debugger);
        match resume {
            Resume::Quit => Err(ControlFlow::Halt),
            Resume::Continue | Resume::Step => Ok(()),
        }
    }

    /// Evaluate `f` with `env` as the current scope
    fn in_scope<T>(&mut self, env: Environment, f: impl FnOnce(&mut Self) -> T) -> T {
        let previous = std::mem::replace(&mut self.env, env);
        let result = f(self);
        self.env = previous;
        result
    }

    /// Run statements in the current scope as a function body, running
    /// deferred expressions on the way out
    fn exec_frame(&mut self, stmts: &[Stmt]) -> Result<Value, ControlFlow> {
        self.defers.push(Vec::new());
        let result = self.exec_stmts(stmts);
        let deferred = self.defers.pop().unwrap_or_default();
        if matches!(result, Err(ControlFlow::Halt)) {
            return result;
        }

        let mut result = result;
        for (expr, env) in deferred.into_iter().rev() {
            let outcome = self.in_scope(env, |interp| interp.eval_expr(&expr));
            match outcome {
                Err(ControlFlow::Halt) => return Err(ControlFlow::Halt),
                Err(err) if result.is_ok() => result = Err(err),
                _ => {}
            }
        }
        result
    }

    fn exec_stmts(&mut self, stmts: &[Stmt]) -> Result<Value, ControlFlow> {
        let mut last = Value::Nil;
        for stmt in stmts {
            last = self.exec_stmt(stmt)?;
        }
        Ok(last)
    }

    /// Evaluate a block in a fresh child scope
    fn exec_block(&mut self, block: &Block) -> Result<Value, ControlFlow> {
        let scope = self.env.child();
        self.in_scope(scope, |interp| interp.exec_stmts(&block.stmts))
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Value, ControlFlow> {
        self.checkpoint(Node::Stmt(stmt))?;

        match &stmt.kind {
            StmtKind::Let { name, value } => {
                let val = self.eval_expr(value)?;
                self.env.define(name.clone(), val, true);
                Ok(Value::Nil)
            }
            StmtKind::Const { name, value } => {
                let val = self.eval_expr(value)?;
                self.env.define(name.clone(), val, false);
                Ok(Value::Nil)
            }
            StmtKind::Fn(decl) => {
                let closure = self.closure(decl);
                self.env.define(decl.name.clone(), closure, false);
                Ok(Value::Nil)
            }
            StmtKind::Return(value) => {
                let val = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Nil,
                };
                Err(ControlFlow::Return(val))
            }
            StmtKind::Defer(expr) => {
                let env = self.env.clone();
                match self.defers.last_mut() {
                    Some(frame) => frame.push((expr.clone(), env)),
                    None => {
                        self.eval_expr(expr)?;
                    }
                }
                Ok(Value::Nil)
            }
            StmtKind::Enum(decl) => {
                self.enums.insert(decl.name.clone(), decl.variants.clone());
                Ok(Value::Nil)
            }
            StmtKind::Break => Err(ControlFlow::Break),
            StmtKind::Continue => Err(ControlFlow::Continue),
            StmtKind::Throw(expr) => {
                let val = self.eval_expr(expr)?;
                Err(ControlFlow::Throw(val))
            }
            StmtKind::Assign { target, op, value } => {
                let val = self.eval_expr(value)?;
                self.assign_target(target, *op, val, stmt.span)?;
                Ok(Value::Nil)
            }
            StmtKind::Expr(expr) => self.eval_expr(expr),
        }
    }

    /// Evaluate an expression
    fn eval_expr(&mut self, expr: &Expr) -> Result<Value, ControlFlow> {
        self.checkpoint(Node::Expr(expr))?;

        match &expr.kind {
            ExprKind::Literal(lit) => Ok(eval_literal(lit)),

            ExprKind::Ident(name) => {
                if let Some(val) = self.env.get(name) {
                    return Ok(val);
                }
                if let Some(builtin) = Builtin::lookup(name) {
                    return Ok(Value::Builtin(builtin));
                }
                Err(RuntimeError::UndefinedVariable {
                    name: name.clone(),
                    line: expr.span.line,
                    span: expr.span.into(),
                }
                .into())
            }

            ExprKind::Path { enum_name, variant } => {
                let known = self
                    .enums
                    .get(enum_name)
                    .is_some_and(|variants| variants.contains(variant));
                if known {
                    Ok(Value::Variant {
                        enum_name: enum_name.clone(),
                        variant: variant.clone(),
                    })
                } else {
                    Err(RuntimeError::UnknownVariant {
                        enum_name: enum_name.clone(),
                        variant: variant.clone(),
                        line: expr.span.line,
                        span: expr.span.into(),
                    }
                    .into())
                }
            }

            ExprKind::Array(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for elem in elements {
                    values.push(self.eval_expr(elem)?);
                }
                Ok(Value::array(values))
            }

            ExprKind::Map(entries) => {
                let mut map = IndexMap::new();
                for (key_expr, value_expr) in entries {
                    let key = self.eval_expr(key_expr)?;
                    let key = MapKey::from_value(&key).ok_or_else(|| {
                        RuntimeError::type_error(
                            format!("{} cannot be used as a map key", key.type_name()),
                            key_expr.span,
                        )
                    })?;
                    let value = self.eval_expr(value_expr)?;
                    map.insert(key, value);
                }
                Ok(Value::Map(Rc::new(std::cell::RefCell::new(map))))
            }

            ExprKind::Unary { op, expr: inner } => {
                let val = self.eval_expr(inner)?;
                Ok(eval_unary(*op, val, expr.span)?)
            }

            ExprKind::Binary { op, left, right } => {
                let lhs = self.eval_expr(left)?;

                // Short-circuit for And/Or
                match op {
                    BinaryOp::And => {
                        if !lhs.is_truthy() {
                            return Ok(Value::Bool(false));
                        }
                        let rhs = self.eval_expr(right)?;
                        return Ok(Value::Bool(rhs.is_truthy()));
                    }
                    BinaryOp::Or => {
                        if lhs.is_truthy() {
                            return Ok(Value::Bool(true));
                        }
                        let rhs = self.eval_expr(right)?;
                        return Ok(Value::Bool(rhs.is_truthy()));
                    }
                    _ => {}
                }

                let rhs = self.eval_expr(right)?;
                Ok(eval_binary(*op, lhs, rhs, expr.span)?)
            }

            ExprKind::Range { start, end } => {
                let from = self.eval_int(start)?;
                let to = self.eval_int(end)?;
                Ok(Value::Range(from, to))
            }

            ExprKind::Index { base, index } => {
                let base_val = self.eval_expr(base)?;
                let idx_val = self.eval_expr(index)?;
                Ok(base_val.index(&idx_val, expr.span)?)
            }

            ExprKind::Call { callee, args } => {
                let callee_val = self.eval_expr(callee)?;
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.eval_expr(arg)?);
                }
                self.call_value(callee_val, arg_values, expr.span)
            }

            ExprKind::Function(decl) => Ok(self.closure(decl)),

            ExprKind::Block(block) => self.exec_block(block),

            ExprKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let cond = self.eval_expr(condition)?;
                if cond.is_truthy() {
                    self.exec_block(then_branch)
                } else if let Some(else_expr) = else_branch {
                    self.eval_expr(else_expr)
                } else {
                    Ok(Value::Nil)
                }
            }

            ExprKind::Unless {
                condition,
                body,
                else_branch,
            } => {
                let cond = self.eval_expr(condition)?;
                if !cond.is_truthy() {
                    self.exec_block(body)
                } else if let Some(else_block) = else_branch {
                    self.exec_block(else_block)
                } else {
                    Ok(Value::Nil)
                }
            }

            ExprKind::Case {
                subject,
                arms,
                default,
            } => {
                let val = self.eval_expr(subject)?;
                for arm in arms {
                    for pattern in &arm.patterns {
                        if self.eval_expr(pattern)? == val {
                            return self.exec_block(&arm.body);
                        }
                    }
                }
                match default {
                    Some(block) => self.exec_block(block),
                    None => Ok(Value::Nil),
                }
            }

            ExprKind::While { condition, body } => {
                while self.eval_expr(condition)?.is_truthy() {
                    if let Step::Exit = self.loop_body(body)? {
                        break;
                    }
                }
                Ok(Value::Nil)
            }

            ExprKind::Loop(body) => {
                while let Step::Next = self.loop_body(body)? {}
                Ok(Value::Nil)
            }

            ExprKind::For {
                init,
                condition,
                update,
                body,
            } => {
                let scope = self.env.child();
                self.in_scope(scope, |interp| {
                    if let Some(init) = init {
                        interp.exec_stmt(init)?;
                    }
                    loop {
                        if let Some(condition) = condition {
                            if !interp.eval_expr(condition)?.is_truthy() {
                                break;
                            }
                        }
                        if let Step::Exit = interp.loop_body(body)? {
                            break;
                        }
                        if let Some(update) = update {
                            interp.exec_stmt(update)?;
                        }
                    }
                    Ok(Value::Nil)
                })
            }

            ExprKind::ForEach {
                var,
                iterable,
                body,
            } => {
                let seq = self.eval_expr(iterable)?;
                let items = seq
                    .iter_values()
                    .map_err(|message| RuntimeError::type_error(message, iterable.span))?;
                for item in items {
                    let scope = self.env.child();
                    scope.define(var.clone(), item, true);
                    if let Step::Exit = self.in_scope(scope, |interp| interp.loop_body(body))? {
                        break;
                    }
                }
                Ok(Value::Nil)
            }

            ExprKind::ForRange {
                var,
                start,
                end,
                body,
            } => {
                let from = self.eval_int(start)?;
                let to = self.eval_int(end)?;
                for i in from..to {
                    let scope = self.env.child();
                    scope.define(var.clone(), Value::Int(i), true);
                    if let Step::Exit = self.in_scope(scope, |interp| interp.loop_body(body))? {
                        break;
                    }
                }
                Ok(Value::Nil)
            }

            ExprKind::ForMap {
                key,
                value,
                map,
                body,
            } => {
                let container = self.eval_expr(map)?;
                let pairs = container
                    .iter_pairs()
                    .map_err(|message| RuntimeError::type_error(message, map.span))?;
                for (k, v) in pairs {
                    let scope = self.env.child();
                    scope.define(key.clone(), k, true);
                    scope.define(value.clone(), v, true);
                    if let Step::Exit = self.in_scope(scope, |interp| interp.loop_body(body))? {
                        break;
                    }
                }
                Ok(Value::Nil)
            }

            ExprKind::Try {
                body,
                catch,
                finally,
            } => {
                let mut result = self.exec_block(body);
                if let Some(clause) = catch {
                    let caught = match &result {
                        Err(ControlFlow::Throw(val)) => Some(val.clone()),
                        Err(ControlFlow::Error(err)) => Some(Value::String(err.to_string())),
                        _ => None,
                    };
                    if let Some(val) = caught {
                        let scope = self.env.child();
                        if let Some(binding) = &clause.binding {
                            scope.define(binding.clone(), val, true);
                        }
                        result = self.in_scope(scope, |interp| interp.exec_stmts(&clause.body.stmts));
                    }
                }
                if matches!(result, Err(ControlFlow::Halt)) {
                    return result;
                }
                if let Some(block) = finally {
                    self.exec_block(block)?;
                }
                result
            }
        }
    }

    /// Run one iteration of a loop body
    fn loop_body(&mut self, body: &Block) -> Result<Step, ControlFlow> {
        match self.exec_block(body) {
            Ok(_) | Err(ControlFlow::Continue) => Ok(Step::Next),
            Err(ControlFlow::Break) => Ok(Step::Exit),
            Err(other) => Err(other),
        }
    }

    fn eval_int(&mut self, expr: &Expr) -> Result<i64, ControlFlow> {
        let val = self.eval_expr(expr)?;
        val.as_int().ok_or_else(|| {
            RuntimeError::type_error(
                format!("expected int, found {}", val.type_name()),
                expr.span,
            )
            .into()
        })
    }

    fn closure(&self, decl: &Rc<FnDecl>) -> Value {
        Value::Function(Rc::new(Closure {
            decl: Rc::clone(decl),
            env: self.env.clone(),
        }))
    }

    /// Evaluate a function call
    fn call_value(&mut self, callee: Value, args: Vec<Value>, span: Span) -> Result<Value, ControlFlow> {
        match callee {
            Value::Function(closure) => {
                let decl = Rc::clone(&closure.decl);
                if args.len() != decl.params.len() {
                    return Err(RuntimeError::ArityMismatch {
                        name: decl.name.clone(),
                        expected: decl.params.len(),
                        found: args.len(),
                        line: span.line,
                        span: span.into(),
                    }
                    .into());
                }

                let scope = closure.env.child();
                for (param, arg) in decl.params.iter().zip(args) {
                    scope.define(param.clone(), arg, true);
                }

                let result = self.in_scope(scope, |interp| {
                    interp.checkpoint(Node::FnEntry(&decl))?;
                    interp.exec_frame(&decl.body.stmts)
                });

                match result {
                    Ok(v) | Err(ControlFlow::Return(v)) => Ok(v),
                    Err(ControlFlow::Break) => Err(RuntimeError::MisplacedControlFlow {
                        keyword: "break",
                        context: "a loop",
                    }
                    .into()),
                    Err(ControlFlow::Continue) => Err(RuntimeError::MisplacedControlFlow {
                        keyword: "continue",
                        context: "a loop",
                    }
                    .into()),
                    Err(other) => Err(other),
                }
            }
            Value::Builtin(builtin) => self.call_builtin(builtin, args, span),
            other => Err(RuntimeError::type_error(
                format!("{} is not callable", other.type_name()),
                span,
            )
            .into()),
        }
    }

    /// Call a builtin function
    pub fn call_builtin(
        &mut self,
        builtin: Builtin,
        args: Vec<Value>,
        span: Span,
    ) -> Result<Value, ControlFlow> {
        let arity = match builtin {
            Builtin::Print | Builtin::Println => None,
            Builtin::Len | Builtin::Type | Builtin::Str | Builtin::Keys => Some(1),
            Builtin::Push => Some(2),
        };
        if let Some(expected) = arity {
            if args.len() != expected {
                return Err(RuntimeError::ArityMismatch {
                    name: builtin.name().to_string(),
                    expected,
                    found: args.len(),
                    line: span.line,
                    span: span.into(),
                }
                .into());
            }
        }

        match builtin {
            Builtin::Print => {
                let line = join_display(&args);
                print!("{}", line);
                self.output.push(line);
                Ok(Value::Nil)
            }
            Builtin::Println => {
                let line = join_display(&args);
                println!("{}", line);
                self.output.push(line);
                Ok(Value::Nil)
            }
            Builtin::Len => match &args[0] {
                Value::Array(arr) => Ok(Value::Int(arr.borrow().len() as i64)),
                Value::Map(map) => Ok(Value::Int(map.borrow().len() as i64)),
                Value::String(s) => Ok(Value::Int(s.chars().count() as i64)),
                Value::Range(from, to) => Ok(Value::Int(to.saturating_sub(*from).max(0))),
                other => Err(RuntimeError::type_error(
                    format!("len() of {}", other.type_name()),
                    span,
                )
                .into()),
            },
            Builtin::Type => Ok(Value::String(args[0].type_name().to_string())),
            Builtin::Str => Ok(Value::String(args[0].to_string())),
            Builtin::Push => match &args[0] {
                Value::Array(arr) => {
                    arr.borrow_mut().push(args[1].clone());
                    Ok(args[0].clone())
                }
                other => Err(RuntimeError::type_error(
                    format!("push() onto {}", other.type_name()),
                    span,
                )
                .into()),
            },
            Builtin::Keys => match &args[0] {
                Value::Map(map) => Ok(Value::array(
                    map.borrow().keys().map(MapKey::to_value).collect(),
                )),
                other => Err(RuntimeError::type_error(
                    format!("keys() of {}", other.type_name()),
                    span,
                )
                .into()),
            },
        }
    }

    /// Assign to a target expression
    fn assign_target(
        &mut self,
        target: &Expr,
        op: AssignOp,
        value: Value,
        span: Span,
    ) -> Result<(), ControlFlow> {
        match &target.kind {
            ExprKind::Ident(name) => {
                let value = match op.binary_op() {
                    Some(bin) => {
                        let current = self.env.get(name).ok_or_else(|| {
                            RuntimeError::UndefinedVariable {
                                name: name.clone(),
                                line: target.span.line,
                                span: target.span.into(),
                            }
                        })?;
                        eval_binary(bin, current, value, span)?
                    }
                    None => value,
                };
                self.env.assign(name, value).map_err(|err| {
                    let error = match err {
                        AssignError::Undefined => RuntimeError::UndefinedVariable {
                            name: name.clone(),
                            line: target.span.line,
                            span: target.span.into(),
                        },
                        AssignError::Constant => RuntimeError::AssignToConstant {
                            name: name.clone(),
                            line: target.span.line,
                            span: target.span.into(),
                        },
                    };
                    ControlFlow::Error(error)
                })
            }
            ExprKind::Index { base, index } => {
                let base_val = self.eval_expr(base)?;
                let idx_val = self.eval_expr(index)?;
                let value = match op.binary_op() {
                    Some(bin) => {
                        let current = base_val.index(&idx_val, target.span)?;
                        eval_binary(bin, current, value, span)?
                    }
                    None => value,
                };

                match (&base_val, &idx_val) {
                    (Value::Array(arr), Value::Int(i)) => {
                        let mut arr = arr.borrow_mut();
                        let len = arr.len();
                        let slot = usize::try_from(*i).ok().and_then(|idx| arr.get_mut(idx));
                        match slot {
                            Some(slot) => {
                                *slot = value;
                                Ok(())
                            }
                            None => Err(RuntimeError::IndexOutOfBounds {
                                index: *i,
                                len,
                                line: target.span.line,
                                span: target.span.into(),
                            }
                            .into()),
                        }
                    }
                    (Value::Map(map), key) => {
                        let key = MapKey::from_value(key).ok_or_else(|| {
                            RuntimeError::type_error(
                                format!("{} cannot be used as a map key", key.type_name()),
                                index.span,
                            )
                        })?;
                        map.borrow_mut().insert(key, value);
                        Ok(())
                    }
                    (base, idx) => Err(RuntimeError::type_error(
                        format!(
                            "cannot assign into {} with {}",
                            base.type_name(),
                            idx.type_name()
                        ),
                        target.span,
                    )
                    .into()),
                }
            }
            _ => Err(RuntimeError::type_error("invalid assignment target", target.span).into()),
        }
    }
}

impl Evaluator for Interpreter {
    fn eval_in_scope(&mut self, source: &str, scope: &Environment) -> Result<Value> {
        let program = crate::parse_source(source)?;
        let outcome = self.in_scope(scope.clone(), |interp| interp.exec_frame(&program.stmts));
        match outcome {
            Ok(value) | Err(ControlFlow::Return(value)) => Ok(value),
            Err(other) => Err(uncaught(other).into()),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn a signal that escaped every handler into an error
fn uncaught(flow: ControlFlow) -> RuntimeError {
    match flow {
        ControlFlow::Error(err) => err,
        ControlFlow::Throw(val) => RuntimeError::Uncaught {
            value: val.inspect(),
        },
        ControlFlow::Break => RuntimeError::MisplacedControlFlow {
            keyword: "break",
            context: "a loop",
        },
        ControlFlow::Continue => RuntimeError::MisplacedControlFlow {
            keyword: "continue",
            context: "a loop",
        },
        ControlFlow::Return(_) => RuntimeError::MisplacedControlFlow {
            keyword: "return",
            context: "a function",
        },
        ControlFlow::Halt => RuntimeError::MisplacedControlFlow {
            keyword: "quit",
            context: "a debugging session",
        },
    }
}

fn join_display(args: &[Value]) -> String {
    args.iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Evaluate a literal
fn eval_literal(lit: &Literal) -> Value {
    match lit {
        Literal::Nil => Value::Nil,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(f) => Value::Float(*f),
        Literal::String(s) => Value::String(s.clone()),
    }
}

/// Evaluate a unary operation
fn eval_unary(op: UnaryOp, val: Value, span: Span) -> Result<Value, RuntimeError> {
    match op {
        UnaryOp::Neg => match val {
            Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(RuntimeError::type_error(
                format!("cannot negate {}", other.type_name()),
                span,
            )),
        },
        UnaryOp::Not => Ok(Value::Bool(!val.is_truthy())),
    }
}

/// Evaluate a binary operation (`&&`/`||` are short-circuited by the caller)
fn eval_binary(op: BinaryOp, lhs: Value, rhs: Value, span: Span) -> Result<Value, RuntimeError> {
    let mismatch = |lhs: &Value, rhs: &Value| {
        RuntimeError::type_error(
            format!(
                "unsupported operands for `{}`: {} and {}",
                op.as_str(),
                lhs.type_name(),
                rhs.type_name()
            ),
            span,
        )
    };

    match op {
        BinaryOp::Add => match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(b))),
            (Value::String(a), b) => Ok(Value::String(format!("{a}{b}"))),
            (a, Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
            (Value::Array(a), Value::Array(b)) => {
                let mut items = a.borrow().clone();
                items.extend(b.borrow().iter().cloned());
                Ok(Value::array(items))
            }
            (a, b) => float_op(&a, &b, |x, y| x + y).ok_or_else(|| mismatch(&a, &b)),
        },
        BinaryOp::Sub => match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_sub(b))),
            (a, b) => float_op(&a, &b, |x, y| x - y).ok_or_else(|| mismatch(&a, &b)),
        },
        BinaryOp::Mul => match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_mul(b))),
            (a, b) => float_op(&a, &b, |x, y| x * y).ok_or_else(|| mismatch(&a, &b)),
        },
        BinaryOp::Div => match (lhs, rhs) {
            (Value::Int(_), Value::Int(0)) => Err(RuntimeError::DivisionByZero {
                line: span.line,
                span: span.into(),
            }),
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_div(b))),
            (a, b) => float_op(&a, &b, |x, y| x / y).ok_or_else(|| mismatch(&a, &b)),
        },
        BinaryOp::Rem => match (lhs, rhs) {
            (Value::Int(_), Value::Int(0)) => Err(RuntimeError::DivisionByZero {
                line: span.line,
                span: span.into(),
            }),
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_rem(b))),
            (a, b) => float_op(&a, &b, |x, y| x % y).ok_or_else(|| mismatch(&a, &b)),
        },
        BinaryOp::Eq => Ok(Value::Bool(lhs == rhs)),
        BinaryOp::Ne => Ok(Value::Bool(lhs != rhs)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (&lhs, &rhs) {
                (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                (a, b) => match (a.as_float(), b.as_float()) {
                    (Some(x), Some(y)) => x.partial_cmp(&y),
                    _ => return Err(mismatch(a, b)),
                },
            };
            let result = ordering.is_some_and(|ord| match op {
                BinaryOp::Lt => ord.is_lt(),
                BinaryOp::Le => ord.is_le(),
                BinaryOp::Gt => ord.is_gt(),
                _ => ord.is_ge(),
            });
            Ok(Value::Bool(result))
        }
        BinaryOp::And => Ok(Value::Bool(lhs.is_truthy() && rhs.is_truthy())),
        BinaryOp::Or => Ok(Value::Bool(lhs.is_truthy() || rhs.is_truthy())),
    }
}

/// Apply a float operation when both sides are numeric and at least one is a float
fn float_op(lhs: &Value, rhs: &Value, f: impl Fn(f64, f64) -> f64) -> Option<Value> {
    match (lhs, rhs) {
        (Value::Float(_), _) | (_, Value::Float(_)) => {
            Some(Value::Float(f(lhs.as_float()?, rhs.as_float()?)))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> Value {
        let program = crate::parse_source(source).unwrap();
        Interpreter::new().interpret(&program).unwrap()
    }

    #[test]
    fn integer_division_by_zero_is_an_error() {
        let err = eval_binary(BinaryOp::Div, Value::Int(1), Value::Int(0), Span::default())
            .unwrap_err();
        assert!(matches!(err, RuntimeError::DivisionByZero { .. }));
    }

    #[test]
    fn mixed_arithmetic_promotes_to_float() {
        let v = eval_binary(BinaryOp::Mul, Value::Int(2), Value::Float(1.5), Span::default());
        assert_eq!(v, Ok(Value::Float(3.0)));
    }

    #[test]
    fn string_concatenation_stringifies_the_other_side() {
        assert_eq!(run(r#""n=" + 3"#), Value::String("n=3".into()));
    }

    #[test]
    fn len_of_extreme_range_saturates() {
        let mut interp = Interpreter::new();
        let len = interp.call_builtin(
            Builtin::Len,
            vec![Value::Range(i64::MIN, i64::MAX)],
            Span::default(),
        );
        assert!(matches!(len, Ok(Value::Int(i64::MAX))));
        let empty = interp.call_builtin(Builtin::Len, vec![Value::Range(5, 2)], Span::default());
        assert!(matches!(empty, Ok(Value::Int(0))));
        assert_eq!(run("len(-9223372036854775807..9223372036854775807)"), Value::Int(i64::MAX));
    }

    #[test]
    fn defers_run_in_reverse_on_return() {
        let program = crate::parse_source(
            "fn f() {\n  defer println(\"first\")\n  defer println(\"second\")\n  return 1\n}\nf()\n",
        )
        .unwrap();
        let mut interp = Interpreter::new();
        assert_eq!(interp.interpret(&program).unwrap(), Value::Int(1));
        assert_eq!(interp.get_output(), &["second", "first"]);
    }

    #[test]
    fn eval_in_scope_sees_and_updates_locals() {
        let mut interp = Interpreter::new();
        let scope = Environment::new();
        scope.define("x", Value::Int(41), true);
        let v = interp.eval_in_scope("x + 1", &scope).unwrap();
        assert_eq!(v, Value::Int(42));
        interp.eval_in_scope("x = 7", &scope).unwrap();
        assert_eq!(scope.get("x"), Some(Value::Int(7)));
    }
}
