//! Scoped symbol tables.
//!
//! Scopes form a tree indexed by `ScopeId` inside an arena owned by the
//! parse session. A child scope starts with a copy of its parent's visible
//! variables, so resolution is a single map lookup and the declaring scope
//! recorded on a name never changes once inserted.

use indexmap::IndexMap;
use serde::Serialize;

use super::statements::StatementNode;

/// Arena index of a scope; unique within a translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ScopeId(pub u32);

#[derive(Debug, Clone, Serialize)]
pub struct ScopeData {
    pub id: ScopeId,
    pub parent: Option<ScopeId>,
    /// Visible variables: name -> (type string, declaring scope).
    pub variable_types: IndexMap<String, (String, ScopeId)>,
    pub body: Vec<StatementNode>,
}

#[derive(Debug, Default, Serialize)]
pub struct ScopeArena {
    scopes: Vec<ScopeData>,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a root scope (a function body).
    pub fn root(&mut self) -> ScopeId {
        self.push(None, IndexMap::new())
    }

    /// Create a child scope, inheriting the parent's visible variables.
    pub fn child_of(&mut self, parent: ScopeId) -> ScopeId {
        let inherited = self.scopes[parent.0 as usize].variable_types.clone();
        self.push(Some(parent), inherited)
    }

    fn push(
        &mut self,
        parent: Option<ScopeId>,
        variable_types: IndexMap<String, (String, ScopeId)>,
    ) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(ScopeData {
            id,
            parent,
            variable_types,
            body: Vec::new(),
        });
        id
    }

    pub fn get(&self, id: ScopeId) -> &ScopeData {
        &self.scopes[id.0 as usize]
    }

    pub fn set_body(&mut self, id: ScopeId, body: Vec<StatementNode>) {
        self.scopes[id.0 as usize].body = body;
    }

    /// Bind a variable in `scope`, declared by `declaring`. Returns `false`
    /// when the name is already visible (shadowing is rejected).
    pub fn add_variable(
        &mut self,
        scope: ScopeId,
        name: &str,
        type_str: &str,
        declaring: ScopeId,
    ) -> bool {
        let data = &mut self.scopes[scope.0 as usize];
        if data.variable_types.contains_key(name) {
            return false;
        }
        data.variable_types
            .insert(name.to_string(), (type_str.to_string(), declaring));
        true
    }

    /// Look up a visible variable: `(type string, declaring scope)`.
    pub fn variable(&self, scope: ScopeId, name: &str) -> Option<&(String, ScopeId)> {
        self.scopes[scope.0 as usize].variable_types.get(name)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}
