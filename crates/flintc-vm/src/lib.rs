//! Reference interpreter for emitted IR modules.
//!
//! Executes a module directly so behavior is observable without a native
//! backend: flat byte-addressed memory with C allocation shims, a frame per
//! call, and fuel limits against runaway loops. Used by the compiler's
//! end-to-end tests and by `flintc` for quick experiments.

mod error;
mod interp;
mod memory;

#[cfg(test)]
mod interp_tests;

pub use error::Trap;
pub use interp::{Vm, VmValue};
pub use memory::Memory;
