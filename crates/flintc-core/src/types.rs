//! The surface type algebra.
//!
//! Types reach the parser as plain strings ("int", "str[]", "Vec2"); the
//! resolver turns them into `Type` values once the definitions of a
//! translation unit are known. Freeability - whether a value transitively
//! owns heap storage - drives the per-type free/clone synthesis.

use indexmap::IndexMap;
use serde::Serialize;

use crate::ids::type_id;

/// Built-in scalar and string types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Primitive {
    Int,
    /// The floating point type of the language.
    Flint,
    Bool,
    Char,
    Str,
    Void,
}

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Flint => "flint",
            Self::Bool => "bool",
            Self::Char => "char",
            Self::Str => "str",
            Self::Void => "void",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "int" => Some(Self::Int),
            "flint" => Some(Self::Flint),
            "bool" => Some(Self::Bool),
            "char" => Some(Self::Char),
            "str" => Some(Self::Str),
            "void" => Some(Self::Void),
            _ => None,
        }
    }
}

/// A resolved type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Type {
    Primitive(Primitive),
    /// `T[]`, `T[,]`, ... - dimensionality is the number of axes.
    Array {
        elem: Box<Type>,
        dimensionality: usize,
    },
    Data(String),
    Entity(String),
    Enum(String),
    ErrorSet(String),
    Variant(String),
    Optional(Box<Type>),
    Tuple(Vec<Type>),
    Func(String),
}

impl Type {
    pub fn int() -> Self {
        Self::Primitive(Primitive::Int)
    }

    pub fn str_() -> Self {
        Self::Primitive(Primitive::Str)
    }

    /// Stable dispatch id used by the `flint.free` / `flint.clone` switches.
    /// Hashes the source-syntax rendering, so it must stay stable.
    pub fn id(&self) -> u32 {
        type_id(&self.to_string())
    }
}

impl std::fmt::Display for Type {
    /// Source-syntax rendering; also the input of [`Type::id`].
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primitive(p) => f.write_str(p.name()),
            Self::Array {
                elem,
                dimensionality,
            } => write!(f, "{}[{}]", elem, ",".repeat(dimensionality - 1)),
            Self::Data(name)
            | Self::Entity(name)
            | Self::Enum(name)
            | Self::ErrorSet(name)
            | Self::Variant(name)
            | Self::Func(name) => f.write_str(name),
            Self::Optional(elem) => write!(f, "{elem}?"),
            Self::Tuple(elems) => {
                let inner: Vec<String> = elems.iter().map(Type::to_string).collect();
                write!(f, "({})", inner.join(", "))
            }
        }
    }
}

/// The named types of a translation unit, as the resolver collected them.
///
/// Holds just enough structure to answer freeability: data fields and
/// variant cases. Insertion order is definition order, which keeps every
/// switch the generator emits deterministic.
#[derive(Debug, Default)]
pub struct TypeUniverse {
    pub data_fields: IndexMap<String, Vec<(Type, String)>>,
    pub variant_cases: IndexMap<String, Vec<Type>>,
}

impl TypeUniverse {
    /// A type is freeable iff it transitively contains heap-allocated data.
    pub fn is_freeable(&self, ty: &Type) -> bool {
        match ty {
            Type::Primitive(p) => *p == Primitive::Str,
            Type::Array { .. } => true,
            Type::Data(_) => true,
            Type::Entity(_) => true,
            Type::ErrorSet(_) => true,
            Type::Enum(_) => false,
            Type::Variant(name) => self
                .variant_cases
                .get(name)
                .is_some_and(|cases| cases.iter().any(|c| self.is_freeable(c))),
            Type::Optional(elem) => self.is_freeable(elem),
            Type::Tuple(elems) => elems.iter().any(|e| self.is_freeable(e)),
            Type::Func(_) => false,
        }
    }
}
