//! Typed low-level IR for the Flint compiler.
//!
//! The IR is the final artifact of the front/middle-end: a module of
//! functions over basic blocks, plus named struct types, global constants,
//! and declarations of the C runtime symbols the emitted code calls into.
//!
//! - `types` - value types, named struct types, and byte layout
//! - `module` - the module container (structs, globals, functions)
//! - `function` - functions, basic blocks, instructions
//! - `builder` - append-style instruction builder with explicit insertion points
//! - `dump` - deterministic textual printer
//! - `verify` - structural well-formedness checks

pub mod builder;
pub mod dump;
pub mod function;
pub mod module;
pub mod types;
pub mod verify;

pub use builder::Builder;
pub use function::{
    BinOp, BlockData, BlockId, CFunc, Callee, CastKind, Function, Inst, InstData, InstId, Linkage,
    Pred, Value,
};
pub use module::{FuncId, GlobalDef, GlobalId, GlobalInit, Module};
pub use types::{IrType, Layout, StructDef, StructId};
pub use verify::{VerifyError, verify_module};

#[cfg(test)]
mod builder_tests;
#[cfg(test)]
mod types_tests;
#[cfg(test)]
mod verify_tests;
