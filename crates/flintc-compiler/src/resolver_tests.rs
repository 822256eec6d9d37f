//! Resolver query tests.

use flintc_core::Type;
use indoc::indoc;

use crate::resolver::Resolver;
use crate::ParseSession;

fn resolver_for(source: &str) -> Resolver {
    let mut session = ParseSession::new();
    session.parse_file("test.ft", source).expect("parses");
    session.resolve_call_types();
    Resolver::build(&session)
}

const TYPES: &str = indoc! {"
    data Vec2:
        int x;
        int y;
    data Named:
        str label;
    error IoErr:
        NotFound, Denied;
    error NetErr(IoErr):
        Timeout;
    enum Color:
        Red, Green;
    variant Holder:
        int, str;
"};

#[test]
fn parse_type_resolves_names_and_composites() {
    let resolver = resolver_for(TYPES);
    assert_eq!(resolver.parse_type("int"), Some(Type::int()));
    assert_eq!(
        resolver.parse_type("Vec2"),
        Some(Type::Data("Vec2".to_string()))
    );
    assert_eq!(
        resolver.parse_type("Vec2[]"),
        Some(Type::Array {
            elem: Box::new(Type::Data("Vec2".to_string())),
            dimensionality: 1
        })
    );
    assert_eq!(
        resolver.parse_type("int[,]"),
        Some(Type::Array {
            elem: Box::new(Type::int()),
            dimensionality: 2
        })
    );
    assert_eq!(
        resolver.parse_type("str?"),
        Some(Type::Optional(Box::new(Type::str_())))
    );
    assert_eq!(
        resolver.parse_type("(int, str)"),
        Some(Type::Tuple(vec![Type::int(), Type::str_()]))
    );
    assert_eq!(resolver.parse_type("Nonesuch"), None);
}

#[test]
fn value_count_includes_parents() {
    let resolver = resolver_for(TYPES);
    assert_eq!(resolver.value_count("IoErr"), 2);
    assert_eq!(resolver.value_count("NetErr"), 3);
}

#[test]
fn data_types_in_definition_order() {
    let resolver = resolver_for(TYPES);
    let names: Vec<String> = resolver
        .get_all_data_types()
        .into_iter()
        .map(|(_, d)| d.name.clone())
        .collect();
    assert_eq!(names, vec!["Vec2", "Named"]);
}

#[test]
fn freeable_types_cover_the_heap_owners() {
    let resolver = resolver_for(TYPES);
    let freeable = resolver.get_all_freeable_types();
    assert!(freeable.contains(&Type::str_()));
    assert!(freeable.contains(&Type::Data("Vec2".to_string())));
    assert!(freeable.contains(&Type::Data("Named".to_string())));
    assert!(freeable.contains(&Type::ErrorSet("IoErr".to_string())));
    // Holder has a str case, so it needs a dispatch case too.
    assert!(freeable.contains(&Type::Variant("Holder".to_string())));
    // Enums are plain scalars.
    assert!(!freeable.contains(&Type::Enum("Color".to_string())));
}

#[test]
fn freeable_types_are_deterministic() {
    let a = resolver_for(TYPES).get_all_freeable_types();
    let b = resolver_for(TYPES).get_all_freeable_types();
    assert_eq!(a, b);
}

#[test]
fn namespace_lookup_is_scoped_to_the_file_hash() {
    let resolver = resolver_for(TYPES);
    let hash = flintc_core::type_id("test.ft");
    let namespace = resolver.get_namespace_from_hash(hash);
    assert_eq!(
        namespace.get_type_from_str("Vec2"),
        Some(Type::Data("Vec2".to_string()))
    );
    assert_eq!(namespace.get_type_from_str("Nonesuch"), None);

    let other = resolver.get_namespace_from_hash(hash ^ 1);
    assert_eq!(other.get_type_from_str("Vec2"), None);
}

#[test]
fn universe_reflects_field_types() {
    let resolver = resolver_for(TYPES);
    let fields = &resolver.universe.data_fields["Named"];
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].0, Type::str_());
    assert!(resolver.universe.is_freeable(&Type::Data("Named".to_string())));
}
