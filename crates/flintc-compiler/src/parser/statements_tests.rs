//! Statement parsing tests.

use indoc::indoc;

use crate::ParseSession;
use crate::ast::{ElseBranch, StatementNode};
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

fn body_of_first_function(session: &ParseSession) -> &[StatementNode] {
    let func = session.files[0].functions().next().unwrap();
    &session.scopes.get(func.scope).body
}

#[test]
fn declaration_and_return() {
    let session = parse(indoc! {"
        def f() -> int:
            int x = 5;
            return x;
    "});
    let body = body_of_first_function(&session);
    assert_eq!(body.len(), 2);
    let StatementNode::Declaration(decl) = &body[0] else {
        panic!("expected a declaration");
    };
    assert_eq!(decl.type_str, "int");
    assert_eq!(decl.name, "x");
    assert!(matches!(body[1], StatementNode::Return(_)));
}

#[test]
fn inferred_declaration_takes_initializer_type() {
    let session = parse(indoc! {"
        def f() -> int:
            x := 41 + 1;
            return x;
    "});
    let body = body_of_first_function(&session);
    let StatementNode::Declaration(decl) = &body[0] else {
        panic!("expected a declaration");
    };
    assert_eq!(decl.type_str, "int");
}

#[test]
fn inferred_declaration_from_known_call() {
    let session = parse(indoc! {"
        def f() -> int:
            return 42;
        def h() -> int:
            x := f();
            return x;
    "});
    let funcs: Vec<_> = session.files[0].functions().collect();
    let body = &session.scopes.get(funcs[1].scope).body;
    let StatementNode::Declaration(decl) = &body[0] else {
        panic!("expected a declaration");
    };
    assert_eq!(decl.type_str, "int");
    assert!(decl.initializer.as_call().is_some());
}

#[test]
fn shadowing_is_fatal() {
    let kind = parse_err(indoc! {"
        def f() -> int:
            int x = 1;
            int x = 2;
            return x;
    "});
    assert!(matches!(kind, ParseErrorKind::VariableShadowed { .. }));
}

#[test]
fn assignment_requires_declaration() {
    let kind = parse_err(indoc! {"
        def f() -> int:
            x = 1;
            return x;
    "});
    assert!(matches!(kind, ParseErrorKind::VarNotDeclared { .. }));
}

#[test]
fn if_chain_nests_under_one_statement() {
    let session = parse(indoc! {"
        def f(int a) -> int:
            int x = 0;
            if a > 1:
                x = 1;
            else if a > 0:
                x = 2;
            else:
                x = 3;
            return x;
    "});
    let body = body_of_first_function(&session);
    assert_eq!(body.len(), 3);
    let StatementNode::If(if_node) = &body[1] else {
        panic!("expected an if chain");
    };
    let Some(ElseBranch::If(elif)) = &if_node.else_branch else {
        panic!("expected an else-if link");
    };
    assert!(matches!(elif.else_branch, Some(ElseBranch::Scope(_))));
}

#[test]
fn branch_scopes_see_outer_variables() {
    let session = parse(indoc! {"
        def f(int a) -> int:
            int x = 0;
            if a > 0:
                x = 1;
            return x;
    "});
    let body = body_of_first_function(&session);
    let StatementNode::If(if_node) = &body[1] else {
        panic!("expected an if");
    };
    let scope = session.scopes.get(if_node.then_scope);
    assert!(scope.variable_types.contains_key("x"));
    assert!(scope.variable_types.contains_key("a"));
    // Declaring scope sticks to the function scope, not the branch.
    let func = session.files[0].functions().next().unwrap();
    assert_eq!(scope.variable_types["x"].1, func.scope);
}

#[test]
fn dangling_else_is_fatal() {
    let kind = parse_err(indoc! {"
        def f() -> int:
            else:
                return 1;
    "});
    assert_eq!(kind, ParseErrorKind::DanglingElse);
}

#[test]
fn while_loop_parses_condition_and_scope() {
    let session = parse(indoc! {"
        def f() -> int:
            int i = 0;
            while i < 10:
                i = i + 1;
            return i;
    "});
    let body = body_of_first_function(&session);
    let StatementNode::While(node) = &body[1] else {
        panic!("expected a while loop");
    };
    assert_eq!(session.scopes.get(node.scope).body.len(), 1);
}

#[test]
fn for_loops_are_not_implemented_yet() {
    let kind = parse_err(indoc! {"
        def f() -> int:
            for i in 10:
                return 1;
    "});
    assert!(matches!(kind, ParseErrorKind::NotImplementedYet { .. }));
}

#[test]
fn catch_binds_the_most_recent_call() {
    let session = parse(indoc! {"
        def may_fail() -> int:
            throw 7;
        def f() -> int:
            int x = may_fail() catch err:
                return err;
            return x;
    "});
    let funcs: Vec<_> = session.files[0].functions().collect();
    let body = &session.scopes.get(funcs[1].scope).body;
    // The left side of the catch lands first, then the catch itself.
    assert_eq!(body.len(), 3);
    assert!(matches!(body[0], StatementNode::Declaration(_)));
    let StatementNode::Catch(catch) = &body[1] else {
        panic!("expected a catch");
    };
    assert_eq!(catch.var_name.as_deref(), Some("err"));
    let call = session.calls.get(catch.call_id);
    assert!(call.has_catch);
    assert_eq!(call.function_name, "may_fail");
    // The error binding is an int inside the catch scope.
    let scope = session.scopes.get(catch.scope);
    assert_eq!(scope.variable_types["err"].0, "int");
}

#[test]
fn throw_requires_an_int() {
    let kind = parse_err(indoc! {"
        def f() -> int:
            throw 1.5;
    "});
    assert!(matches!(kind, ParseErrorKind::ThrowTypeNotInt { .. }));
}

#[test]
fn call_statement_registers_a_call() {
    let session = parse(indoc! {"
        def ping() -> int:
            return 1;
        def f() -> int:
            ping();
            return 0;
    "});
    let funcs: Vec<_> = session.files[0].functions().collect();
    let body = &session.scopes.get(funcs[1].scope).body;
    let StatementNode::Call(id) = &body[0] else {
        panic!("expected a call statement");
    };
    let call = session.calls.get(*id);
    assert_eq!(call.function_name, "ping");
    assert!(!call.has_catch);
}

#[test]
fn call_ids_are_unique_and_dense() {
    let session = parse(indoc! {"
        def a() -> int:
            return 1;
        def f() -> int:
            x := a();
            y := a();
            return x + y;
    "});
    let ids: Vec<u32> = session.calls.iter().map(|c| c.call_id.0).collect();
    assert_eq!(ids, vec![0, 1]);
}

#[test]
fn undefined_statements_are_fatal() {
    let kind = parse_err(indoc! {"
        def f() -> int:
            1 2 3;
    "});
    assert_eq!(kind, ParseErrorKind::UndefinedStatement);
}
