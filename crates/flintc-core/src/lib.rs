//! Core data structures shared across the Flint compiler pipeline.
//!
//! - `token` - token kinds and the lexer's output unit
//! - `types` - the surface type algebra and freeability rules
//! - `ids` - stable 32-bit ids for types and error sets

pub mod ids;
pub mod token;
pub mod types;

pub use ids::type_id;
pub use token::{Token, TokenKind};
pub use types::{Primitive, Type, TypeUniverse};

#[cfg(test)]
mod token_tests;
#[cfg(test)]
mod types_tests;
