//! Entry-block stack allocation.
//!
//! Every user variable gets one alloca per `(scope, name)` at function
//! entry; every call site additionally gets a slot for its full return
//! struct and one for the extracted error code. No stack reuse.

use std::collections::HashSet;

use flintc_ir::{Builder, IrType};

use crate::ast::{CallId, ElseBranch, ExpressionNode, FunctionNode, ScopeId, StatementNode};

use super::{Allocations, GenError, Generator};

impl Generator<'_> {
    pub(crate) fn generate_allocations(
        &mut self,
        b: &mut Builder,
        function: &FunctionNode,
        allocations: &mut Allocations,
    ) -> Result<(), GenError> {
        let mut scopes = Vec::new();
        let mut calls = Vec::new();
        let mut catch_vars = HashSet::new();
        self.collect_scope(function.scope, &mut scopes, &mut calls, &mut catch_vars);

        for scope_id in scopes {
            let scope = self.session.scopes.get(scope_id);
            for (name, (type_str, declaring)) in &scope.variable_types {
                if *declaring != scope_id {
                    continue;
                }
                // Catch error bindings alias the call's err slot instead.
                if catch_vars.contains(&(scope_id, name.clone())) {
                    continue;
                }
                let ty = self.parse_type(type_str)?;
                let ir_ty = self.value_ir_type(b.module(), &ty);
                let key = format!("s{}::{}", scope_id.0, name);
                let slot = b.alloca(ir_ty, key.clone());
                allocations.insert(key, slot);
            }
        }

        for call_id in calls {
            let call = self.session.calls.get(call_id);
            let callee = call.function_name.clone();
            let return_type = call.return_type.clone().ok_or_else(|| {
                GenError::new(format!("call to unresolved function '{callee}'"))
            })?;
            let ret_struct =
                self.return_struct(b.module(), &callee, &[return_type])?;
            let scope = call.scope_id.0;
            let ret_key = format!("s{}::c{}::ret", scope, call_id.0);
            let slot = b.alloca(IrType::Struct(ret_struct), ret_key.clone());
            allocations.insert(ret_key, slot);
            let err_key = format!("s{}::c{}::err", scope, call_id.0);
            let err_slot = b.alloca(IrType::I32, err_key.clone());
            allocations.insert(err_key, err_slot);
        }
        Ok(())
    }

    fn collect_scope(
        &self,
        scope_id: ScopeId,
        scopes: &mut Vec<ScopeId>,
        calls: &mut Vec<CallId>,
        catch_vars: &mut HashSet<(ScopeId, String)>,
    ) {
        scopes.push(scope_id);
        for statement in &self.session.scopes.get(scope_id).body {
            self.collect_statement(statement, scopes, calls, catch_vars);
        }
    }

    fn collect_statement(
        &self,
        statement: &StatementNode,
        scopes: &mut Vec<ScopeId>,
        calls: &mut Vec<CallId>,
        catch_vars: &mut HashSet<(ScopeId, String)>,
    ) {
        match statement {
            StatementNode::Return(node) => {
                if let Some(value) = &node.value {
                    self.collect_expression(value, calls);
                }
            }
            StatementNode::Throw(node) => self.collect_expression(&node.value, calls),
            StatementNode::If(node) => self.collect_if(node, scopes, calls, catch_vars),
            StatementNode::While(node) => {
                self.collect_expression(&node.condition, calls);
                self.collect_scope(node.scope, scopes, calls, catch_vars);
            }
            StatementNode::For(node) => {
                self.collect_scope(node.scope, scopes, calls, catch_vars);
            }
            StatementNode::Assignment(node) => self.collect_expression(&node.expression, calls),
            StatementNode::Declaration(node) => self.collect_expression(&node.initializer, calls),
            StatementNode::Catch(node) => {
                if let Some(name) = &node.var_name {
                    catch_vars.insert((node.scope, name.clone()));
                }
                self.collect_scope(node.scope, scopes, calls, catch_vars);
            }
            StatementNode::Call(id) => self.collect_call(*id, calls),
        }
    }

    fn collect_if(
        &self,
        node: &crate::ast::IfNode,
        scopes: &mut Vec<ScopeId>,
        calls: &mut Vec<CallId>,
        catch_vars: &mut HashSet<(ScopeId, String)>,
    ) {
        self.collect_expression(&node.condition, calls);
        self.collect_scope(node.then_scope, scopes, calls, catch_vars);
        match &node.else_branch {
            Some(ElseBranch::If(next)) => self.collect_if(next.as_ref(), scopes, calls, catch_vars),
            Some(ElseBranch::Scope(scope)) => {
                self.collect_scope(*scope, scopes, calls, catch_vars)
            }
            None => {}
        }
    }

    fn collect_expression(&self, expression: &ExpressionNode, calls: &mut Vec<CallId>) {
        match expression {
            ExpressionNode::Call(id) => self.collect_call(*id, calls),
            ExpressionNode::Binary(node) => {
                self.collect_expression(&node.lhs, calls);
                self.collect_expression(&node.rhs, calls);
            }
            ExpressionNode::Unary(node) => self.collect_expression(&node.operand, calls),
            ExpressionNode::Variable(_) | ExpressionNode::Literal { .. } => {}
        }
    }

    fn collect_call(&self, id: CallId, calls: &mut Vec<CallId>) {
        calls.push(id);
        for argument in &self.session.calls.get(id).arguments {
            self.collect_expression(argument, calls);
        }
    }
}
