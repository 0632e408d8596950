//! Parser tests

use kestrel::ast::*;
use kestrel::parse_source;

fn parse(source: &str) -> Program {
    parse_source(source).unwrap()
}

fn expr_of(stmt: &Stmt) -> &Expr {
    match &stmt.kind {
        StmtKind::Expr(expr) => expr,
        other => panic!("Expected expression statement, got {:?}", other),
    }
}

#[test]
fn test_parse_empty_program() {
    assert!(parse("").stmts.is_empty());
}

#[test]
fn test_parse_let_and_const() {
    let program = parse("let x = 1\nconst LIMIT = 10;");
    assert_eq!(program.stmts.len(), 2);
    assert!(matches!(&program.stmts[0].kind, StmtKind::Let { name, .. } if name == "x"));
    assert!(matches!(&program.stmts[1].kind, StmtKind::Const { name, .. } if name == "LIMIT"));
    assert_eq!(program.stmts[1].span.line, 2);
}

#[test]
fn test_parse_function_lines() {
    let program = parse("let a = 1\n\nfn foo(x, y) {\n  let z = x + y\n\n  return z\n}\n");
    let functions = program.functions();
    let foo = &functions["foo"];
    assert_eq!(foo.params, vec!["x", "y"]);
    assert_eq!(foo.begin_line(), 3);
    assert_eq!(foo.end_line, 7);
    assert_eq!(foo.body.stmts.len(), 2);
}

#[test]
fn test_parse_anonymous_function_is_not_registered() {
    let program = parse("let f = fn(a) { return a }\nfn g() { }\n");
    let functions = program.functions();
    let names: Vec<&str> = functions.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["g"]);
}

#[test]
fn test_parse_precedence() {
    let program = parse("1 + 2 * 3 == 7 && true");
    let expr = expr_of(&program.stmts[0]);
    let ExprKind::Binary { op, left, .. } = &expr.kind else {
        panic!("Expected binary expression");
    };
    assert_eq!(*op, BinaryOp::And);
    let ExprKind::Binary { op, left, .. } = &left.kind else {
        panic!("Expected comparison");
    };
    assert_eq!(*op, BinaryOp::Eq);
    let ExprKind::Binary { op, right, .. } = &left.kind else {
        panic!("Expected addition");
    };
    assert_eq!(*op, BinaryOp::Add);
    assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
}

#[test]
fn test_parse_compound_assignment_to_index() {
    let program = parse("xs[0] += 2");
    let StmtKind::Assign { target, op, .. } = &program.stmts[0].kind else {
        panic!("Expected assignment");
    };
    assert_eq!(*op, AssignOp::AddAssign);
    assert_eq!(target.node_kind(), NodeKind::Index);
}

#[test]
fn test_parse_else_if_chain() {
    let program = parse("if a { 1 } else if b { 2 } else { 3 }");
    let ExprKind::If { else_branch, .. } = &expr_of(&program.stmts[0]).kind else {
        panic!("Expected if");
    };
    let nested = else_branch.as_ref().unwrap();
    assert_eq!(nested.node_kind(), NodeKind::If);
}

#[test]
fn test_parse_case_arms() {
    let program = parse("case x {\n  1, 2 => { \"low\" }\n  3 => { \"three\" }\n  else => { \"other\" }\n}");
    let ExprKind::Case { arms, default, .. } = &expr_of(&program.stmts[0]).kind else {
        panic!("Expected case");
    };
    assert_eq!(arms.len(), 2);
    assert_eq!(arms[0].patterns.len(), 2);
    assert!(default.is_some());
}

#[test]
fn test_parse_loop_forms() {
    let program = parse(
        "while x < 3 { x += 1 }\nloop { break }\nfor (let i = 0; i < 3; i += 1) { }\nfor v in xs { }\nfor i in 0..3 { }\nfor k, v in m { }\n",
    );
    let kinds: Vec<NodeKind> = program.stmts.iter().map(|s| expr_of(s).node_kind()).collect();
    assert_eq!(
        kinds,
        vec![
            NodeKind::While,
            NodeKind::Loop,
            NodeKind::For,
            NodeKind::ForEach,
            NodeKind::ForRange,
            NodeKind::ForMap,
        ]
    );
}

#[test]
fn test_parse_try_catch_finally() {
    let program = parse("try { throw 1 } catch e { e } finally { 2 }");
    let ExprKind::Try { catch, finally, .. } = &expr_of(&program.stmts[0]).kind else {
        panic!("Expected try");
    };
    assert_eq!(catch.as_ref().unwrap().binding.as_deref(), Some("e"));
    assert!(finally.is_some());
}

#[test]
fn test_parse_try_requires_handler() {
    assert!(parse_source("try { 1 }").is_err());
}

#[test]
fn test_parse_enum_and_path() {
    let program = parse("enum Color { Red, Green, Blue }\nlet c = Color::Green");
    let StmtKind::Enum(decl) = &program.stmts[0].kind else {
        panic!("Expected enum");
    };
    assert_eq!(decl.variants, vec!["Red", "Green", "Blue"]);
    let StmtKind::Let { value, .. } = &program.stmts[1].kind else {
        panic!("Expected let");
    };
    assert_eq!(value.node_kind(), NodeKind::Path);
}

#[test]
fn test_parse_defer_and_return() {
    let program = parse("fn f() {\n  defer println(\"bye\")\n  return\n}");
    let functions = program.functions();
    let body = &functions["f"].body.stmts;
    assert_eq!(body[0].node_kind(), NodeKind::Defer);
    assert!(matches!(body[1].kind, StmtKind::Return(None)));
}

#[test]
fn test_parse_map_literal() {
    let program = parse(r#"let m = { "a": 1, "b": 2 }"#);
    let StmtKind::Let { value, .. } = &program.stmts[0].kind else {
        panic!("Expected let");
    };
    let ExprKind::Map(entries) = &value.kind else {
        panic!("Expected map");
    };
    assert_eq!(entries.len(), 2);
}

#[test]
fn test_parse_error_reports_line() {
    let err = parse_source("let a = 1\nlet = 2").unwrap_err();
    assert!(err.to_string().contains("line 2"), "{}", err);
}

#[test]
fn test_ast_serializes_to_json() {
    let program = parse("let a = [1, 2]");
    let json = serde_json::to_string(&program).unwrap();
    assert!(json.contains("\"Let\""));
}
