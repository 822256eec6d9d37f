//! Tests for the type algebra and freeability rules.

use super::{Primitive, Type, TypeUniverse};

fn universe_with_variant(name: &str, cases: Vec<Type>) -> TypeUniverse {
    let mut universe = TypeUniverse::default();
    universe.variant_cases.insert(name.to_string(), cases);
    universe
}

#[test]
fn display_round_trips_primitives() {
    assert_eq!(Type::int().to_string(), "int");
    assert_eq!(Type::Primitive(Primitive::Flint).to_string(), "flint");
    assert_eq!(Type::str_().to_string(), "str");
}

#[test]
fn display_arrays_and_optionals() {
    let arr = Type::Array {
        elem: Box::new(Type::int()),
        dimensionality: 1,
    };
    assert_eq!(arr.to_string(), "int[]");

    let arr2 = Type::Array {
        elem: Box::new(Type::str_()),
        dimensionality: 2,
    };
    assert_eq!(arr2.to_string(), "str[,]");

    let opt = Type::Optional(Box::new(Type::Data("Vec2".into())));
    assert_eq!(opt.to_string(), "Vec2?");
}

#[test]
fn display_tuples() {
    let tup = Type::Tuple(vec![Type::int(), Type::str_()]);
    assert_eq!(tup.to_string(), "(int, str)");
}

#[test]
fn scalars_are_not_freeable() {
    let universe = TypeUniverse::default();
    assert!(!universe.is_freeable(&Type::int()));
    assert!(!universe.is_freeable(&Type::Primitive(Primitive::Bool)));
    assert!(!universe.is_freeable(&Type::Enum("Color".into())));
}

#[test]
fn heap_owners_are_freeable() {
    let universe = TypeUniverse::default();
    assert!(universe.is_freeable(&Type::str_()));
    assert!(universe.is_freeable(&Type::Data("Vec2".into())));
    assert!(universe.is_freeable(&Type::Entity("Player".into())));
    assert!(universe.is_freeable(&Type::ErrorSet("IoErr".into())));
    assert!(universe.is_freeable(&Type::Array {
        elem: Box::new(Type::int()),
        dimensionality: 1,
    }));
}

#[test]
fn composites_inherit_freeability() {
    let universe = TypeUniverse::default();
    assert!(universe.is_freeable(&Type::Optional(Box::new(Type::str_()))));
    assert!(!universe.is_freeable(&Type::Optional(Box::new(Type::int()))));

    assert!(universe.is_freeable(&Type::Tuple(vec![Type::int(), Type::str_()])));
    assert!(!universe.is_freeable(&Type::Tuple(vec![Type::int(), Type::int()])));
}

#[test]
fn variant_freeability_follows_cases() {
    let hot = universe_with_variant("V", vec![Type::int(), Type::str_()]);
    assert!(hot.is_freeable(&Type::Variant("V".into())));

    let cold = universe_with_variant("V", vec![Type::int(), Type::Primitive(Primitive::Bool)]);
    assert!(!cold.is_freeable(&Type::Variant("V".into())));
}

#[test]
fn type_ids_are_distinct_and_stable() {
    let a = Type::Data("Vec2".into());
    let b = Type::Data("Vec3".into());
    assert_ne!(a.id(), b.id());
    assert_eq!(a.id(), Type::Data("Vec2".into()).id());
}
