//! Statement nodes.

use serde::Serialize;

use super::calls::CallId;
use super::expressions::ExpressionNode;
use super::scope::ScopeId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnNode {
    pub value: Option<ExpressionNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThrowNode {
    /// The error code expression; always of type `int`.
    pub value: ExpressionNode,
}

/// One link of an if-chain. `else if` nests as `ElseBranch::If`, a final
/// `else` as `ElseBranch::Scope`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IfNode {
    pub condition: ExpressionNode,
    pub then_scope: ScopeId,
    pub else_branch: Option<ElseBranch>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ElseBranch {
    If(Box<IfNode>),
    Scope(ScopeId),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhileNode {
    pub condition: ExpressionNode,
    pub scope: ScopeId,
}

/// Recognized by the parser, rejected by generation until loop lowering
/// for iterators lands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForLoopNode {
    pub scope: ScopeId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentNode {
    pub type_str: String,
    pub name: String,
    pub expression: ExpressionNode,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeclarationNode {
    pub type_str: String,
    pub name: String,
    pub initializer: ExpressionNode,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatchNode {
    /// Optional binding for the error code, typed `int` inside the scope.
    pub var_name: Option<String>,
    pub scope: ScopeId,
    /// The guarded call; its node has `has_catch == true`.
    pub call_id: CallId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StatementNode {
    Return(ReturnNode),
    Throw(ThrowNode),
    If(IfNode),
    While(WhileNode),
    For(ForLoopNode),
    Assignment(AssignmentNode),
    Declaration(DeclarationNode),
    Catch(CatchNode),
    Call(CallId),
}
