//! Compile-time diagnostics.
//!
//! Errors are fatal: the first one terminates the translation unit and no
//! partial AST or IR escapes. `render` produces the single human-readable
//! report the CLI prints before exiting non-zero.

use annotate_snippets::{AnnotationKind, Group, Level, Renderer, Snippet};
use serde::Serialize;
use thiserror::Error;

/// The rule a failed parse violated.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ParseErrorKind {
    #[error("unexpected top-level definition")]
    UnexpectedDefinition,

    #[error("definition is missing its body")]
    MissingBody,

    #[error("use statements are only allowed at the top level")]
    UseStatementNotAtTopLevel,

    #[error("unclosed parenthesis")]
    UnclosedParen,

    #[error("statement could not be classified")]
    UndefinedStatement,

    #[error("expression could not be classified")]
    UndefinedExpression,

    #[error("unexpected token '{lexeme}'")]
    UnexpectedToken { lexeme: String },

    #[error("unknown literal '{lexeme}'")]
    UnknownLiteral { lexeme: String },

    #[error("variable '{name}' has not been declared")]
    VarNotDeclared { name: String },

    #[error("variable '{name}' shadows an existing declaration")]
    VariableShadowed { name: String },

    #[error("parameter '{name}' is already bound by the requires list")]
    VarFromRequiresList { name: String },

    #[error("binary operator operand types differ: '{lhs}' vs '{rhs}'")]
    ExprBinopTypeMismatch { lhs: String, rhs: String },

    #[error("throw value must be of type 'int', got '{found}'")]
    ThrowTypeNotInt { found: String },

    #[error("constructor '{found}' does not match the data name '{expected}'")]
    ConstructorNameMismatch { expected: String, found: String },

    #[error("constructor '{found}' does not match the entity name '{expected}'")]
    EntityConstructorNameMismatch { expected: String, found: String },

    #[error("error sets can only extend a single parent error set")]
    CanOnlyExtendFromSingleErrorSet,

    #[error("'else' without a preceding 'if'")]
    DanglingElse,

    #[error("scoped statement has no body")]
    ScopedStatementMissingBody,

    #[error("cannot infer the type of '{name}': callee '{callee}' is not resolved yet")]
    UnresolvedCallType { name: String, callee: String },

    #[error("not implemented yet: {what}")]
    NotImplementedYet { what: String },
}

/// A fatal parse error: rule plus source position.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{file}:{line}:{column}: {kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            kind,
            file: file.into(),
            line,
            column,
        }
    }

    /// Render the diagnostic against its source text.
    pub fn render(&self, source: &str) -> String {
        let message = self.kind.to_string();
        let offset = byte_offset(source, self.line, self.column);
        let snippet = Snippet::source(source).line_start(1).path(&self.file).annotation(
            AnnotationKind::Primary
                .span(offset..annotation_end(source, offset))
                .label(&message),
        );
        let report: Vec<Group> = vec![Level::ERROR.primary_title(&message).element(snippet)];
        Renderer::plain().render(&report).to_string()
    }
}

fn byte_offset(source: &str, line: u32, column: u32) -> usize {
    let mut offset = 0usize;
    for (idx, text) in source.lines().enumerate() {
        if idx as u32 + 1 == line {
            let col = (column as usize).saturating_sub(1).min(text.len());
            return offset + col;
        }
        offset += text.len() + 1;
    }
    source.len()
}

fn annotation_end(source: &str, offset: usize) -> usize {
    source[offset..]
        .find(|c: char| c.is_whitespace())
        .map(|i| offset + i.max(1))
        .unwrap_or(source.len())
        .min(source.len())
}
