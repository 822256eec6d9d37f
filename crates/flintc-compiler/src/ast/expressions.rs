//! Expression nodes.

use flintc_core::TokenKind;
use serde::Serialize;

use super::calls::{CallId, CallRegistry};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LiteralValue {
    Int(i64),
    Flint(f64),
    Str(String),
    Bool(bool),
    Char(char),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableNode {
    pub name: String,
    pub type_str: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnaryOpNode {
    pub operator: TokenKind,
    pub operand: Box<ExpressionNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinaryOpNode {
    pub operator: TokenKind,
    pub lhs: Box<ExpressionNode>,
    pub rhs: Box<ExpressionNode>,
    /// Result type; equals both operand types.
    pub type_str: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExpressionNode {
    Variable(VariableNode),
    Literal {
        value: LiteralValue,
        type_str: String,
    },
    Unary(UnaryOpNode),
    Binary(BinaryOpNode),
    /// Call expression; the call's arguments and resolved type live in the
    /// registry.
    Call(CallId),
}

impl ExpressionNode {
    /// The expression's type as a source type string. Unresolved calls
    /// yield an empty string until `resolve_call_types` runs.
    pub fn type_str(&self, calls: &CallRegistry) -> String {
        match self {
            Self::Variable(v) => v.type_str.clone(),
            Self::Literal { type_str, .. } => type_str.clone(),
            Self::Unary(u) => u.operand.type_str(calls),
            Self::Binary(b) => b.type_str.clone(),
            Self::Call(id) => calls.get(*id).return_type.clone().unwrap_or_default(),
        }
    }

    pub fn as_call(&self) -> Option<CallId> {
        match self {
            Self::Call(id) => Some(*id),
            _ => None,
        }
    }
}
