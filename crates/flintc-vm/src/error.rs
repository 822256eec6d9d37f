//! Runtime traps.

use thiserror::Error;

/// Ways execution can stop abnormally. `Abort` is the IR's own terminal
/// error path for invariant violations; the rest indicate a malformed
/// module or an interpreter limit.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Trap {
    #[error("program aborted: {output}")]
    Abort { output: String },

    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("call to function '{name}' which has no body")]
    MissingBody { name: String },

    #[error("memory access out of bounds at address {address:#x}")]
    OutOfBounds { address: u64 },

    #[error("use of undefined value")]
    UndefinedValue,

    #[error("execution fuel exhausted")]
    OutOfFuel,

    #[error("reached an unreachable instruction")]
    Unreachable,

    #[error("block ended without a terminator")]
    FellOffBlock,
}
