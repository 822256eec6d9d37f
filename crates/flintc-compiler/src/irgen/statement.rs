//! Statement lowering.
//!
//! Control flow lowers to explicit blocks with explicit insertion points.
//! Conditional mutation is reconciled with merge phis: before a branchy
//! statement emits its bodies, a lookup seeded from the enclosing scope's
//! visible names records every store a branch performs, and the merge block
//! gets one phi per mutated name.

use flintc_ir::{BlockId, Builder, IrType, Pred, StructId, Value};

use crate::ast::{
    AssignmentNode, CatchNode, DeclarationNode, ElseBranch, IfNode, ReturnNode, ScopeId,
    StatementNode, ThrowNode, WhileNode,
};

use super::{Allocations, GenError, Generator, PhiLookup, zero_value};

impl Generator<'_> {
    pub(crate) fn generate_body(
        &mut self,
        b: &mut Builder,
        scope: ScopeId,
        phi_lookup: &mut PhiLookup,
        allocations: &Allocations,
    ) -> Result<(), GenError> {
        let body = self.session.scopes.get(scope).body.clone();
        let last = body.len().saturating_sub(1);
        for (i, statement) in body.iter().enumerate() {
            self.generate_statement(b, scope, statement, phi_lookup, allocations)?;
            // A body-final if leaves an untouched merge block behind when
            // every branch terminated; drop it.
            if matches!(statement, StatementNode::If(_))
                && i == last
                && let Some(block) = b.try_insert_block()
                && b.block_is_empty(block)
            {
                b.erase_block_if_empty_tail(block);
            }
        }
        Ok(())
    }

    pub(crate) fn generate_statement(
        &mut self,
        b: &mut Builder,
        scope: ScopeId,
        statement: &StatementNode,
        phi_lookup: &mut PhiLookup,
        allocations: &Allocations,
    ) -> Result<(), GenError> {
        match statement {
            StatementNode::Return(node) => self.generate_return(b, scope, node, allocations),
            StatementNode::Throw(node) => self.generate_throw(b, scope, node, allocations),
            StatementNode::If(node) => {
                let mut phi_lookup = PhiLookup::new();
                self.generate_if(b, node, 0, Vec::new(), &mut phi_lookup, allocations)
            }
            StatementNode::While(node) => self.generate_while(b, node, allocations),
            StatementNode::For(_) => Err(GenError::NotImplementedYet {
                what: "for loop lowering".to_string(),
            }),
            StatementNode::Assignment(node) => {
                self.generate_assignment(b, scope, node, phi_lookup, allocations)
            }
            StatementNode::Declaration(node) => {
                self.generate_declaration(b, scope, node, allocations)
            }
            StatementNode::Catch(node) => self.generate_catch(b, scope, node, allocations),
            StatementNode::Call(id) => {
                self.generate_call(b, *id, allocations)?;
                Ok(())
            }
        }
    }

    fn current_return_struct(&self, b: &mut Builder) -> StructId {
        let func_id = b.func_id();
        match b.module().function(func_id).ret {
            IrType::Struct(id) => id,
            _ => unreachable!("user functions always return a struct"),
        }
    }

    fn generate_return(
        &mut self,
        b: &mut Builder,
        scope: ScopeId,
        node: &ReturnNode,
        allocations: &Allocations,
    ) -> Result<(), GenError> {
        let ret_struct = self.current_return_struct(b);
        let slot = b.alloca(IrType::Struct(ret_struct), "ret_struct");

        // Error code first; 0 means no error.
        let err_ptr = b.struct_gep(ret_struct, slot, 0, "err_ptr");
        b.store(b.i32(0), err_ptr);

        if let Some(value) = &node.value {
            let result = self.generate_expression(b, scope, value, allocations)?;
            let val_ptr = b.struct_gep(ret_struct, slot, 1, "val_ptr");
            b.store(result, val_ptr);
        }

        let loaded = b.load(IrType::Struct(ret_struct), slot, "ret_val");
        b.ret(loaded);
        Ok(())
    }

    fn generate_throw(
        &mut self,
        b: &mut Builder,
        scope: ScopeId,
        node: &ThrowNode,
        allocations: &Allocations,
    ) -> Result<(), GenError> {
        let ret_struct = self.current_return_struct(b);
        let slot = b.alloca(IrType::Struct(ret_struct), "throw_ret");

        // Default-fill everything but the error code.
        let field_count = b.module().struct_def(ret_struct).fields.len();
        for i in 1..field_count {
            let field_ty = b.module().layout().field_type(ret_struct, i as u32);
            if matches!(field_ty, IrType::Struct(_)) {
                continue;
            }
            let ptr = b.struct_gep(ret_struct, slot, i as u32, "default_ptr");
            b.store(zero_value(field_ty), ptr);
        }

        let err_ptr = b.struct_gep(ret_struct, slot, 0, "err_ptr");
        let err_value = self.generate_expression(b, scope, &node.value, allocations)?;
        b.store(err_value, err_ptr);

        let loaded = b.load(IrType::Struct(ret_struct), slot, "throw_val");
        b.ret(loaded);
        Ok(())
    }

    fn generate_if(
        &mut self,
        b: &mut Builder,
        if_node: &IfNode,
        nesting_level: usize,
        blocks: Vec<BlockId>,
        phi_lookup: &mut PhiLookup,
        allocations: &Allocations,
    ) -> Result<(), GenError> {
        let mut current_blocks = blocks;

        // Outermost call: pre-allocate all blocks for the full chain plus
        // one shared merge block.
        if nesting_level == 0 {
            let mut current = Some(if_node);
            let mut branch_count = 0usize;
            while let Some(node) = current {
                if branch_count != 0 {
                    current_blocks.push(b.create_block(format!("then_cond{branch_count}")));
                }
                current_blocks.push(b.create_block(format!("then{branch_count}")));
                match &node.else_branch {
                    None => break,
                    Some(ElseBranch::If(next)) => {
                        current = Some(next.as_ref());
                        branch_count += 1;
                    }
                    Some(ElseBranch::Scope(scope)) => {
                        if self.session.scopes.get(*scope).body.is_empty() {
                            return Err(GenError::new("empty else body"));
                        }
                        current_blocks.push(b.create_block(format!("else{branch_count}")));
                        current = None;
                    }
                }
            }
            current_blocks.push(b.create_block("merge"));
        }

        let merge_block = *current_blocks.last().expect("block list is never empty");

        // Interleaved layout: [then0, cond1, then1, cond2, then2, ..,
        // else?, merge]. Branch n's body sits at 2n; whatever follows it
        // (the next condition, the else, or merge) is the false target.
        let then_idx = 2 * nesting_level;
        let next_idx = then_idx + 1;

        let parent_scope = self
            .session
            .scopes
            .get(if_node.then_scope)
            .parent
            .expect("branch scopes always have a parent");
        let condition =
            self.generate_expression(b, parent_scope, &if_node.condition, allocations)?;
        b.cond_br(condition, current_blocks[then_idx], current_blocks[next_idx]);

        // Seed the mutation lookup from every visible name once, on the
        // outermost emission.
        if phi_lookup.is_empty() {
            for name in self
                .session
                .scopes
                .get(parent_scope)
                .variable_types
                .keys()
            {
                phi_lookup.insert(name.clone(), Vec::new());
            }
        }

        b.set_insert_point(current_blocks[then_idx]);
        self.generate_body(b, if_node.then_scope, phi_lookup, allocations)?;
        if let Some(block) = b.try_insert_block()
            && !b.block_terminated(block)
        {
            b.br(merge_block);
        }

        match &if_node.else_branch {
            Some(ElseBranch::If(next)) => {
                b.set_insert_point(current_blocks[next_idx]);
                self.generate_if(
                    b,
                    next.as_ref(),
                    nesting_level + 1,
                    current_blocks.clone(),
                    phi_lookup,
                    allocations,
                )?;
            }
            Some(ElseBranch::Scope(else_scope)) => {
                if !self.session.scopes.get(*else_scope).body.is_empty() {
                    b.set_insert_point(current_blocks[next_idx]);
                    self.generate_body(b, *else_scope, phi_lookup, allocations)?;
                    if let Some(block) = b.try_insert_block()
                        && !b.block_terminated(block)
                    {
                        b.br(merge_block);
                    }
                }
            }
            None => {}
        }

        if nesting_level == 0 {
            b.set_insert_point(merge_block);
            self.generate_phi_calls(b, phi_lookup);
        }
        Ok(())
    }

    fn generate_while(
        &mut self,
        b: &mut Builder,
        node: &WhileNode,
        allocations: &Allocations,
    ) -> Result<(), GenError> {
        let cond_block = b.create_block("while_cond");
        let body_block = b.create_block("while_body");
        let merge_block = b.create_block("merge");

        b.br(cond_block);

        let parent_scope = self
            .session
            .scopes
            .get(node.scope)
            .parent
            .expect("loop scopes always have a parent");
        b.set_insert_point(cond_block);
        let condition = self.generate_expression(b, parent_scope, &node.condition, allocations)?;
        b.cond_br(condition, body_block, merge_block);

        let mut phi_lookup = PhiLookup::new();
        for name in self
            .session
            .scopes
            .get(parent_scope)
            .variable_types
            .keys()
        {
            phi_lookup.insert(name.clone(), Vec::new());
        }

        b.set_insert_point(body_block);
        self.generate_body(b, node.scope, &mut phi_lookup, allocations)?;
        if let Some(block) = b.try_insert_block()
            && !b.block_terminated(block)
        {
            b.br(cond_block);
        }

        b.set_insert_point(merge_block);
        self.generate_phi_calls(b, &phi_lookup);
        Ok(())
    }

    /// The catch statement is an error check on the guarded call: branch to
    /// the catch body when the stored err code is non-zero.
    fn generate_catch(
        &mut self,
        b: &mut Builder,
        _scope: ScopeId,
        node: &CatchNode,
        allocations: &Allocations,
    ) -> Result<(), GenError> {
        let call = self.session.calls.get(node.call_id).clone();
        let err_ret_name = format!("s{}::c{}::err", call.scope_id.0, node.call_id.0);
        let err_slot = allocations
            .get(&err_ret_name)
            .copied()
            .ok_or_else(|| GenError::new(format!("missing err slot '{err_ret_name}'")))?;

        let err_val = b.load(
            IrType::I32,
            err_slot,
            format!("{}_{}_val", call.function_name, node.call_id.0),
        );

        let catch_block =
            b.create_block(format!("{}_{}_catch", call.function_name, node.call_id.0));
        let merge_block =
            b.create_block(format!("{}_{}_merge", call.function_name, node.call_id.0));

        let err_condition = b.icmp(Pred::Ne, err_val, b.i32(0), "errcmp");
        b.cond_br(err_condition, catch_block, merge_block);

        // Alias the error binding onto the call's err slot for the body.
        let mut allocations = allocations.clone();
        if let Some(var_name) = &node.var_name {
            let alias = format!("s{}::{}", node.scope.0, var_name);
            allocations.insert(alias, err_slot);
        }

        b.set_insert_point(catch_block);
        let mut phi_lookup = PhiLookup::new();
        self.generate_body(b, node.scope, &mut phi_lookup, &allocations)?;
        if let Some(block) = b.try_insert_block()
            && !b.block_terminated(block)
        {
            b.br(merge_block);
        }

        b.set_insert_point(merge_block);
        self.generate_phi_calls(b, &phi_lookup);
        Ok(())
    }

    fn generate_declaration(
        &mut self,
        b: &mut Builder,
        scope: ScopeId,
        node: &DeclarationNode,
        allocations: &Allocations,
    ) -> Result<(), GenError> {
        let expression =
            self.generate_expression(b, scope, &node.initializer, allocations)?;

        // A call initializer binds field 1 of the stored return struct, not
        // the raw call result.
        if let Some(call_id) = node.initializer.as_call() {
            let call = self.session.calls.get(call_id);
            let ret_name = format!("s{}::c{}::ret", call.scope_id.0, call_id.0);
            let callee = call.function_name.clone();
            let ret_slot = allocations
                .get(&ret_name)
                .copied()
                .ok_or_else(|| GenError::new(format!("missing call slot '{ret_name}'")))?;
            let ret_struct = b
                .module()
                .struct_by_name(&format!("ret.{callee}"))
                .ok_or_else(|| GenError::new(format!("missing return struct for '{callee}'")))?;
            let val_ptr =
                b.struct_gep(ret_struct, ret_slot, 1, format!("{}__VAL_PTR", node.name));
            let decl_ty = self.parse_type(&node.type_str)?;
            let ir_ty = self.value_ir_type(b.module(), &decl_ty);
            let value = b.load(ir_ty, val_ptr, format!("{}__VAL", node.name));
            let slot = self.variable_slot(scope, &node.name, allocations)?;
            b.store(value, slot);
            return Ok(());
        }

        let slot = self.variable_slot(scope, &node.name, allocations)?;
        b.store(expression, slot);
        Ok(())
    }

    fn generate_assignment(
        &mut self,
        b: &mut Builder,
        scope: ScopeId,
        node: &AssignmentNode,
        phi_lookup: &mut PhiLookup,
        allocations: &Allocations,
    ) -> Result<(), GenError> {
        let expression =
            self.generate_expression(b, scope, &node.expression, allocations)?;
        let slot = self.variable_slot(scope, &node.name, allocations)?;
        b.store(expression, slot);

        phi_lookup
            .entry(node.name.clone())
            .or_default()
            .push((b.insert_block(), expression));
        Ok(())
    }

    pub(crate) fn generate_phi_calls(&mut self, b: &mut Builder, phi_lookup: &PhiLookup) {
        for (name, mutations) in phi_lookup {
            if mutations.is_empty() {
                continue;
            }
            let ty = b.value_type(mutations[0].1);
            b.phi(ty, mutations.clone(), format!("{name}_phi"));
        }
    }

    /// Stack slot of a visible variable, via its declaring scope.
    pub(crate) fn variable_slot(
        &self,
        scope: ScopeId,
        name: &str,
        allocations: &Allocations,
    ) -> Result<Value, GenError> {
        let (_, declaring) = self
            .session
            .scopes
            .variable(scope, name)
            .ok_or_else(|| GenError::new(format!("undeclared variable '{name}'")))?;
        let key = format!("s{}::{}", declaring.0, name);
        allocations
            .get(&key)
            .copied()
            .ok_or_else(|| GenError::new(format!("missing stack slot '{key}'")))
    }
}
