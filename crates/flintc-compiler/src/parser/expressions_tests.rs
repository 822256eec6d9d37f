//! Expression parsing tests.

use flintc_core::TokenKind;
use indoc::indoc;

use crate::ParseSession;
use crate::ast::{ExpressionNode, LiteralValue, StatementNode};
use crate::diagnostics::ParseErrorKind;

fn parse(source: &str) -> ParseSession {
    let mut session = ParseSession::new();
    session.parse_file("test.ft", source).expect("parses");
    session.resolve_call_types();
    session
}

fn parse_err(source: &str) -> ParseErrorKind {
    let mut session = ParseSession::new();
    session
        .parse_file("test.ft", source)
        .expect_err("must fail")
        .kind
}

/// Initializer expression of the first declaration in `f`.
fn first_initializer(session: &ParseSession) -> &ExpressionNode {
    let func = session.files[0].functions().next().unwrap();
    for statement in &session.scopes.get(func.scope).body {
        if let StatementNode::Declaration(decl) = statement {
            return &decl.initializer;
        }
    }
    panic!("no declaration found");
}

#[test]
fn literal_types() {
    let session = parse(indoc! {"
        def f() -> int:
            x := 41;
            y := 2.5;
            z := true;
            return x;
    "});
    let func = session.files[0].functions().next().unwrap();
    let body = &session.scopes.get(func.scope).body;
    let types: Vec<String> = body
        .iter()
        .filter_map(|s| match s {
            StatementNode::Declaration(d) => Some(d.type_str.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(types, vec!["int", "flint", "bool"]);
}

#[test]
fn binary_op_structure_and_type() {
    let session = parse(indoc! {"
        def f() -> int:
            x := 41 + 1;
            return x;
    "});
    let ExpressionNode::Binary(binop) = first_initializer(&session) else {
        panic!("expected a binary op");
    };
    assert_eq!(binop.operator, TokenKind::Plus);
    assert_eq!(binop.type_str, "int");
    assert_eq!(
        *binop.lhs,
        ExpressionNode::Literal {
            value: LiteralValue::Int(41),
            type_str: "int".to_string()
        }
    );
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let session = parse(indoc! {"
        def f() -> int:
            x := 1 + 2 * 3;
            return x;
    "});
    let ExpressionNode::Binary(top) = first_initializer(&session) else {
        panic!("expected a binary op");
    };
    assert_eq!(top.operator, TokenKind::Plus);
    let ExpressionNode::Binary(rhs) = top.rhs.as_ref() else {
        panic!("expected the product on the right");
    };
    assert_eq!(rhs.operator, TokenKind::Mult);
}

#[test]
fn parenthesized_groups_are_transparent() {
    let session = parse(indoc! {"
        def f() -> int:
            x := (41 + 1);
            return x;
    "});
    assert!(matches!(
        first_initializer(&session),
        ExpressionNode::Binary(_)
    ));
}

#[test]
fn operand_type_mismatch_is_fatal() {
    let kind = parse_err(indoc! {"
        def f() -> int:
            x := 1 + 2.5;
            return x;
    "});
    assert!(matches!(kind, ParseErrorKind::ExprBinopTypeMismatch { .. }));
}

#[test]
fn undeclared_variable_is_fatal() {
    let kind = parse_err(indoc! {"
        def f() -> int:
            return y;
    "});
    assert!(matches!(kind, ParseErrorKind::VarNotDeclared { .. }));
}

#[test]
fn variable_reports_position() {
    let mut session = ParseSession::new();
    let err = session
        .parse_file("test.ft", "def f() -> int:\n    return nope;\n")
        .unwrap_err();
    assert_eq!(err.file, "test.ft");
    assert_eq!(err.line, 2);
    assert!(err.column > 1);
}

#[test]
fn call_arguments_split_on_top_level_commas() {
    let session = parse(indoc! {"
        def add(int a, int b) -> int:
            return a + b;
        def f() -> int:
            x := add(add(1, 2), 3);
            return x;
    "});
    let funcs: Vec<_> = session.files[0].functions().collect();
    let body = &session.scopes.get(funcs[1].scope).body;
    let StatementNode::Declaration(decl) = &body[0] else {
        panic!("expected a declaration");
    };
    let outer = decl.initializer.as_call().unwrap();
    let outer_call = session.calls.get(outer);
    assert_eq!(outer_call.arguments.len(), 2);
    // First argument is itself a call with two arguments.
    let inner = outer_call.arguments[0].as_call().unwrap();
    assert_eq!(session.calls.get(inner).arguments.len(), 2);
}

#[test]
fn unclosed_paren_is_fatal() {
    let kind = parse_err(indoc! {"
        def f() -> int:
            x := (1 + 2;
            return x;
    "});
    assert!(matches!(
        kind,
        ParseErrorKind::UnclosedParen | ParseErrorKind::UndefinedExpression
    ));
}

#[test]
fn unary_minus_is_not_implemented_yet() {
    let kind = parse_err(indoc! {"
        def f() -> int:
            x := -5;
            return x;
    "});
    assert!(matches!(kind, ParseErrorKind::NotImplementedYet { .. }));
}
