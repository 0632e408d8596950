//! Decides whether execution may pause at a node

use crate::ast::Node;

use super::functions::FunctionTable;

/// Whether the interpreter may hand control to the user before `node`.
///
/// Code inside a function whose breakpoint is not enabled is never
/// stoppable, which makes stepping fly over unmarked calls. Outside those
/// ranges, only control-flow-relevant node kinds are stoppable.
pub fn can_stop(node: &Node<'_>, functions: &FunctionTable) -> bool {
    if functions.within_disabled_function(node.line()) {
        return false;
    }
    node.kind().is_stoppable()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, ExprKind, Stmt, StmtKind};

    fn first_stmt(source: &str) -> Stmt {
        crate::parse_source(source).unwrap().stmts.remove(0)
    }

    #[test]
    fn top_level_if_is_stoppable_without_functions() {
        let stmt = first_stmt("if true { 1 }");
        let StmtKind::Expr(expr) = &stmt.kind else {
            panic!("expected expression statement");
        };
        assert!(can_stop(&Node::Expr(expr), &FunctionTable::default()));
    }

    #[test]
    fn arithmetic_is_never_stoppable() {
        let stmt = first_stmt("1 + 2");
        let StmtKind::Expr(expr) = &stmt.kind else {
            panic!("expected expression statement");
        };
        assert!(matches!(expr.kind, ExprKind::Binary { .. }));
        assert!(!can_stop(&Node::Expr(expr), &FunctionTable::default()));
    }

    #[test]
    fn disabled_function_body_is_never_stoppable() {
        let program = crate::parse_source("fn f() {\n  let a = 1\n}\nlet b = 2\n").unwrap();
        let mut table = FunctionTable::from_functions(&program.functions());
        let StmtKind::Fn(decl) = &program.stmts[0].kind else {
            panic!("expected function");
        };
        let inner = &decl.body.stmts[0];
        let outer = &program.stmts[1];

        assert!(!can_stop(&Node::Stmt(inner), &table));
        assert!(can_stop(&Node::Stmt(outer), &table));

        table.enable("f").unwrap();
        assert!(can_stop(&Node::Stmt(inner), &table));
    }

    #[test]
    fn literal_outside_functions_is_not_stoppable() {
        let expr = Expr {
            kind: ExprKind::Literal(crate::ast::Literal::Int(1)),
            span: crate::common::Span::new(0, 1, 1),
        };
        assert!(!can_stop(&Node::Expr(&expr), &FunctionTable::default()));
    }
}
