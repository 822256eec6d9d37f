//! The typed AST.
//!
//! `FileNode` owns its definitions; function bodies live in the scope arena
//! (`ScopeArena`) and call sites in the call registry (`CallRegistry`), both
//! owned by the surrounding [`crate::ParseSession`]. Statements and
//! expressions reference scopes and calls by id only, which keeps the tree
//! free of back-pointers.

pub mod calls;
pub mod definitions;
pub mod expressions;
pub mod printer;
pub mod scope;
pub mod statements;

#[cfg(test)]
mod printer_tests;

pub use calls::{CallId, CallNode, CallRegistry};
pub use definitions::{
    DataNode, Definition, EntityNode, EnumNode, ErrorNode, FileNode, FuncNode, FunctionNode,
    ImportNode, ImportPath, LinkNode, VariantNode,
};
pub use expressions::{BinaryOpNode, ExpressionNode, LiteralValue, UnaryOpNode, VariableNode};
pub use scope::{ScopeArena, ScopeData, ScopeId};
pub use statements::{
    AssignmentNode, CatchNode, DeclarationNode, ElseBranch, ForLoopNode, IfNode, ReturnNode,
    StatementNode, ThrowNode, WhileNode,
};
