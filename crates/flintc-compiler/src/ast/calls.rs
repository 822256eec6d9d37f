//! Call registry.
//!
//! Every call site gets a monotonically assigned `CallId` at parse time.
//! The registry owns the call nodes (name, arguments, resolved return type);
//! statements and expressions hold only the id. Catch statements reference
//! the call they guard through the same id.

use serde::Serialize;

use super::expressions::ExpressionNode;
use super::scope::ScopeId;

/// Monotonic call site id, unique within a translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CallId(pub u32);

#[derive(Debug, Clone, Serialize)]
pub struct CallNode {
    pub call_id: CallId,
    /// Scope the call appears in.
    pub scope_id: ScopeId,
    pub function_name: String,
    pub arguments: Vec<ExpressionNode>,
    /// Return type string once resolved; `None` for late-bound calls.
    pub return_type: Option<String>,
    pub has_catch: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct CallRegistry {
    calls: Vec<CallNode>,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        scope_id: ScopeId,
        function_name: String,
        arguments: Vec<ExpressionNode>,
        return_type: Option<String>,
    ) -> CallId {
        let id = CallId(self.calls.len() as u32);
        self.calls.push(CallNode {
            call_id: id,
            scope_id,
            function_name,
            arguments,
            return_type,
            has_catch: false,
        });
        id
    }

    pub fn get(&self, id: CallId) -> &CallNode {
        &self.calls[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: CallId) -> &mut CallNode {
        &mut self.calls[id.0 as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &CallNode> {
        self.calls.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CallNode> {
        self.calls.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}
