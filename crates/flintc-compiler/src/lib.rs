//! Flint compiler front/middle-end.
//!
//! The pipeline is leaf-first: tokens from the lexer feed the parser, which
//! builds a typed AST with scoped symbol tables; IR generation lowers the
//! AST into basic-block IR and synthesizes the runtime support functions
//! (allocator, free/clone, error stringification) into the same module.
//!
//! ```
//! use flintc_compiler::compile;
//!
//! let module = compile("answer.ft", "def f() -> int:\n\treturn 41 + 1;\n")
//!     .expect("valid program");
//! assert!(module.function_by_name("f").is_some());
//! ```

pub mod ast;
pub mod diagnostics;
pub mod irgen;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod signature;

#[cfg(test)]
mod lexer_tests;
#[cfg(test)]
mod resolver_tests;
#[cfg(test)]
mod signature_tests;

use indexmap::IndexMap;
use thiserror::Error;

use ast::{CallRegistry, FileNode, ScopeArena};
pub use diagnostics::{ParseError, ParseErrorKind};
pub use irgen::{GenError, Generator, GeneratorConfig};
pub use resolver::Resolver;

/// Shared state of one translation unit: parsed files, the scope arena, and
/// the call registry. All formerly process-wide tables live here.
#[derive(Debug, Default)]
pub struct ParseSession {
    pub files: Vec<FileNode>,
    pub scopes: ScopeArena,
    pub calls: CallRegistry,
    /// Known function return types, filled as definitions parse so calls to
    /// already-seen functions resolve immediately.
    pub function_types: IndexMap<String, String>,
}

impl ParseSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one source file into the session. Fatal on the first error.
    pub fn parse_file(&mut self, file_name: &str, source: &str) -> Result<(), ParseError> {
        parser::parse_file(self, file_name, source)
    }

    /// Assign return types to calls whose callee is now known. Calls that
    /// never resolve stay untyped (late-bound across imports).
    pub fn resolve_call_types(&mut self) {
        let mut function_types = IndexMap::new();
        for file in &self.files {
            for func in file.functions() {
                function_types.insert(func.name.clone(), func.return_types.concat());
            }
        }
        for call in self.calls.iter_mut() {
            if call.return_type.is_none()
                && let Some(ty) = function_types.get(&call.function_name)
            {
                call.return_type = Some(ty.clone());
            }
        }
        self.function_types = function_types;
    }
}

/// Any way a compile can fail.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Gen(#[from] GenError),

    #[error(transparent)]
    Verify(#[from] flintc_ir::VerifyError),
}

/// Compile a single source file to a verified IR module.
pub fn compile(file_name: &str, source: &str) -> Result<flintc_ir::Module, CompileError> {
    compile_with_config(file_name, source, GeneratorConfig::default())
}

pub fn compile_with_config(
    file_name: &str,
    source: &str,
    config: GeneratorConfig,
) -> Result<flintc_ir::Module, CompileError> {
    let mut session = ParseSession::new();
    session.parse_file(file_name, source)?;
    session.resolve_call_types();
    let module = Generator::generate(&session, config)?;
    flintc_ir::verify_module(&module)?;
    Ok(module)
}
