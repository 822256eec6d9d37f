//! Definition parsing tests.

use indoc::indoc;

use crate::ParseSession;
use crate::ast::{Definition, ImportPath};
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

#[test]
fn function_definition_with_params_and_return() {
    let session = parse(indoc! {"
        def add(int a, int b) -> int:
            return a + b;
    "});
    let file = &session.files[0];
    let func = file.functions().next().unwrap();
    assert_eq!(func.name, "add");
    assert_eq!(
        func.parameters,
        vec![
            ("int".to_string(), "a".to_string()),
            ("int".to_string(), "b".to_string())
        ]
    );
    assert_eq!(func.return_types, vec!["int".to_string()]);
    assert!(!func.is_const);
    assert!(!func.is_aligned);
}

#[test]
fn function_modifiers() {
    let session = parse(indoc! {"
        const aligned def pure() -> int:
            return 1;
    "});
    let func = session.files[0].functions().next().unwrap();
    assert!(func.is_const);
    assert!(func.is_aligned);
}

#[test]
fn function_parameters_enter_the_scope() {
    let session = parse(indoc! {"
        def add(int a, int b) -> int:
            return a + b;
    "});
    let func = session.files[0].functions().next().unwrap();
    let scope = session.scopes.get(func.scope);
    assert_eq!(scope.variable_types.len(), 2);
    assert_eq!(scope.variable_types["a"].0, "int");
}

#[test]
fn duplicate_parameter_is_fatal() {
    let kind = parse_err(indoc! {"
        def f(int a, int a) -> int:
            return a;
    "});
    assert!(matches!(kind, ParseErrorKind::VarFromRequiresList { .. }));
}

#[test]
fn missing_body_is_fatal() {
    let kind = parse_err("def f() -> int:\n");
    assert_eq!(kind, ParseErrorKind::MissingBody);
}

#[test]
fn data_definition_with_defaults_and_constructor() {
    let session = parse(indoc! {"
        data Vec2:
            int x = 0;
            int y = 0;
            Vec2(x, y);
    "});
    let data = session.files[0].data().next().unwrap();
    assert_eq!(data.name, "Vec2");
    assert_eq!(data.fields.len(), 2);
    assert_eq!(data.fields[0], ("int".to_string(), "x".to_string()));
    assert_eq!(data.default_values.len(), 2);
    assert_eq!(
        data.constructor_order,
        vec!["x".to_string(), "y".to_string()]
    );
}

#[test]
fn data_modifiers_imply_shared() {
    let session = parse(indoc! {"
        shared data A:
            int x;
        immutable data B:
            int y;
    "});
    let mut data = session.files[0].data();
    let a = data.next().unwrap();
    assert!(a.is_shared && !a.is_immutable);
    let b = data.next().unwrap();
    assert!(b.is_shared && b.is_immutable);
}

#[test]
fn constructor_name_mismatch_is_fatal() {
    let kind = parse_err(indoc! {"
        data Vec2:
            int x;
            Vec3(x);
    "});
    assert!(matches!(kind, ParseErrorKind::ConstructorNameMismatch { .. }));
}

#[test]
fn enum_definition_collects_values() {
    let session = parse(indoc! {"
        enum Color:
            Red, Green, Blue;
    "});
    let Definition::Enum(node) = &session.files[0].definitions[0] else {
        panic!("expected an enum");
    };
    assert_eq!(node.name, "Color");
    assert_eq!(node.values, vec!["Red", "Green", "Blue"]);
}

#[test]
fn error_set_with_parent() {
    let session = parse(indoc! {"
        error IoErr:
            NotFound, Denied;
        error NetErr(IoErr):
            Timeout;
    "});
    let errors: Vec<_> = session.files[0].errors().collect();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].parent, None);
    assert_eq!(errors[1].parent.as_deref(), Some("IoErr"));
    assert_ne!(errors[0].error_id, errors[1].error_id);
    assert_ne!(errors[0].error_id, 0);
}

#[test]
fn variant_definition_collects_cases() {
    let session = parse(indoc! {"
        variant Shape:
            Circle, Square;
    "});
    let Definition::Variant(node) = &session.files[0].definitions[0] else {
        panic!("expected a variant");
    };
    assert_eq!(node.possible_types, vec!["Circle", "Square"]);
}

#[test]
fn func_module_with_requires_list() {
    let session = parse(indoc! {"
        func Mover requires (Vec2 v):
            def move(int dx) -> int:
                return dx;
    "});
    let Definition::FuncModule(node) = &session.files[0].definitions[0] else {
        panic!("expected a func module");
    };
    assert_eq!(node.name, "Mover");
    assert_eq!(
        node.required_data,
        vec![("Vec2".to_string(), "v".to_string())]
    );
    assert_eq!(node.functions.len(), 1);
    assert_eq!(node.functions[0].name, "move");
}

#[test]
fn modular_entity_references_existing_modules() {
    let session = parse(indoc! {"
        entity Player:
            data: PlayerData;
            func: PlayerLogic;
            Player(x, y);
    "});
    let Definition::Entity(node) = &session.files[0].definitions[0] else {
        panic!("expected an entity");
    };
    assert_eq!(node.name, "Player");
    assert_eq!(node.data_modules, vec!["PlayerData"]);
    assert_eq!(node.func_modules, vec!["PlayerLogic"]);
    assert_eq!(node.constructor_order, vec!["x", "y"]);
}

#[test]
fn monolithic_entity_synthesizes_modules() {
    let session = parse(indoc! {"
        entity Counter:
            data:
                int count;
            func:
                def bump() -> int:
                    return 1;
            Counter(count);
    "});
    let file = &session.files[0];
    let Definition::Entity(entity) = &file.definitions[0] else {
        panic!("expected an entity");
    };
    assert_eq!(entity.data_modules, vec!["Counter__D"]);
    assert_eq!(entity.func_modules, vec!["Counter__F"]);
    let data = file.data().next().unwrap();
    assert_eq!(data.name, "Counter__D");
    assert_eq!(data.fields, vec![("int".to_string(), "count".to_string())]);
}

#[test]
fn imports_parse_both_forms() {
    let session = parse(indoc! {r#"
        use "vendor/util.ft"
        use flint.io
        def f() -> int:
            return 1;
    "#});
    let imports = &session.files[0].imports;
    assert_eq!(imports.len(), 2);
    assert_eq!(
        imports[0].path,
        ImportPath::File("vendor/util.ft".to_string())
    );
    assert_eq!(
        imports[1].path,
        ImportPath::Modules(vec!["flint".to_string(), "io".to_string()])
    );
}

#[test]
fn indented_use_is_fatal() {
    let kind = parse_err("    use flint.io\n");
    assert_eq!(kind, ParseErrorKind::UseStatementNotAtTopLevel);
}

#[test]
fn unknown_definitions_are_fatal() {
    let kind = parse_err("widget W:\n    int x;\n");
    assert_eq!(kind, ParseErrorKind::UnexpectedDefinition);
}

#[test]
fn unique_scope_ids_across_the_unit() {
    let session = parse(indoc! {"
        def f() -> int:
            if 1 == 1:
                return 1;
            return 2;
        def g() -> int:
            return 3;
    "});
    // Every scope id indexes a distinct arena slot by construction; two
    // functions plus one branch scope.
    assert_eq!(session.scopes.len(), 3);
}
