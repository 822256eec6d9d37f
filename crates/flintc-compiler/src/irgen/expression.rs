//! Expression lowering.

use flintc_core::{TokenKind, Type};
use flintc_ir::{BinOp, Builder, CFunc, IrType, Pred, Value};

use crate::ast::{BinaryOpNode, CallId, ExpressionNode, LiteralValue, ScopeId};

use super::{Allocations, GenError, Generator};

impl Generator<'_> {
    pub(crate) fn generate_expression(
        &mut self,
        b: &mut Builder,
        scope: ScopeId,
        expression: &ExpressionNode,
        allocations: &Allocations,
    ) -> Result<Value, GenError> {
        match expression {
            ExpressionNode::Variable(node) => {
                let (type_str, _) = self
                    .session
                    .scopes
                    .variable(scope, &node.name)
                    .ok_or_else(|| {
                        GenError::new(format!("undeclared variable '{}'", node.name))
                    })?
                    .clone();
                let ty = self.parse_type(&type_str)?;
                let ir_ty = self.value_ir_type(b.module(), &ty);
                let slot = self.variable_slot(scope, &node.name, allocations)?;
                Ok(b.load(ir_ty, slot, node.name.clone()))
            }
            ExpressionNode::Literal { value, .. } => self.generate_literal(b, value),
            ExpressionNode::Unary(_) => Err(GenError::NotImplementedYet {
                what: "unary operator lowering".to_string(),
            }),
            ExpressionNode::Binary(node) => {
                self.generate_binary_op(b, scope, node, allocations)
            }
            ExpressionNode::Call(id) => self.generate_call(b, *id, allocations),
        }
    }

    fn generate_literal(
        &mut self,
        b: &mut Builder,
        value: &LiteralValue,
    ) -> Result<Value, GenError> {
        Ok(match value {
            LiteralValue::Int(v) => b.i32(*v as u32),
            LiteralValue::Flint(v) => b.f64(*v),
            LiteralValue::Bool(v) => b.i1(*v),
            LiteralValue::Char(c) => b.i8(*c as u8),
            LiteralValue::Str(s) => {
                // String literals materialize as heap strings so ownership
                // is uniform with computed strings.
                let create_str = self
                    .create_str_fn
                    .expect("create_str is synthesized before user code");
                let content = b.const_string(s);
                let len = b.i64(s.len() as u64);
                let str_ptr = b.call(create_str, vec![len], "str_lit");
                let bytes_ptr = b.struct_gep(self.str_struct, str_ptr, 1, "str_lit_bytes");
                b.call_c(CFunc::Memcpy, vec![bytes_ptr, content, len], "");
                str_ptr
            }
        })
    }

    fn generate_binary_op(
        &mut self,
        b: &mut Builder,
        scope: ScopeId,
        node: &BinaryOpNode,
        allocations: &Allocations,
    ) -> Result<Value, GenError> {
        let lhs = self.generate_expression(b, scope, &node.lhs, allocations)?;
        let rhs = self.generate_expression(b, scope, &node.rhs, allocations)?;
        let operand_type = self.parse_type(&node.type_str)?;
        let is_float = operand_type == Type::Primitive(flintc_core::Primitive::Flint);

        let result = match node.operator {
            TokenKind::Plus if is_float => b.bin(BinOp::FAdd, lhs, rhs, "fadd"),
            TokenKind::Minus if is_float => b.bin(BinOp::FSub, lhs, rhs, "fsub"),
            TokenKind::Mult if is_float => b.bin(BinOp::FMul, lhs, rhs, "fmul"),
            TokenKind::Div if is_float => b.bin(BinOp::FDiv, lhs, rhs, "fdiv"),
            TokenKind::Plus => b.bin(BinOp::Add, lhs, rhs, "add"),
            TokenKind::Minus => b.bin(BinOp::Sub, lhs, rhs, "sub"),
            TokenKind::Mult => b.bin(BinOp::Mul, lhs, rhs, "mul"),
            TokenKind::Div => b.bin(BinOp::SDiv, lhs, rhs, "div"),
            TokenKind::Mod => b.bin(BinOp::URem, lhs, rhs, "rem"),
            TokenKind::Less => self.compare(b, is_float, Pred::Slt, lhs, rhs, "lt"),
            TokenKind::Greater => self.compare(b, is_float, Pred::Sgt, lhs, rhs, "gt"),
            TokenKind::LessEqual => self.compare(b, is_float, Pred::Sle, lhs, rhs, "le"),
            TokenKind::GreaterEqual => self.compare(b, is_float, Pred::Sge, lhs, rhs, "ge"),
            TokenKind::EqualEqual => self.compare(b, is_float, Pred::Eq, lhs, rhs, "eq"),
            TokenKind::NotEqual => self.compare(b, is_float, Pred::Ne, lhs, rhs, "ne"),
            other => {
                return Err(GenError::new(format!(
                    "unsupported binary operator {other:?}"
                )));
            }
        };
        Ok(result)
    }

    fn compare(
        &mut self,
        b: &mut Builder,
        is_float: bool,
        pred: Pred,
        lhs: Value,
        rhs: Value,
        name: &str,
    ) -> Value {
        if is_float {
            b.fcmp(pred, lhs, rhs, name)
        } else {
            b.icmp(pred, lhs, rhs, name)
        }
    }

    /// Calls produce the callee's `{ err, value }` struct; it is stored
    /// whole into the call's `::ret` slot and its error code into `::err`.
    pub(crate) fn generate_call(
        &mut self,
        b: &mut Builder,
        id: CallId,
        allocations: &Allocations,
    ) -> Result<Value, GenError> {
        let call = self.session.calls.get(id).clone();
        let callee = b
            .module()
            .function_by_name(&call.function_name)
            .ok_or_else(|| {
                GenError::new(format!("call to unknown function '{}'", call.function_name))
            })?;

        let mut args = Vec::new();
        for argument in &call.arguments {
            args.push(self.generate_expression(b, call.scope_id, argument, allocations)?);
        }

        let result = b.call(
            callee,
            args,
            format!("{}_{}_ret", call.function_name, id.0),
        );

        let ret_key = format!("s{}::c{}::ret", call.scope_id.0, id.0);
        let ret_slot = allocations
            .get(&ret_key)
            .copied()
            .ok_or_else(|| GenError::new(format!("missing call slot '{ret_key}'")))?;
        b.store(result, ret_slot);

        let ret_struct = b
            .module()
            .struct_by_name(&format!("ret.{}", call.function_name))
            .ok_or_else(|| {
                GenError::new(format!("missing return struct for '{}'", call.function_name))
            })?;
        let err = b.extract_value(
            result,
            ret_struct,
            0,
            format!("{}_{}_err", call.function_name, id.0),
        );
        let err_key = format!("s{}::c{}::err", call.scope_id.0, id.0);
        let err_slot = allocations
            .get(&err_key)
            .copied()
            .ok_or_else(|| GenError::new(format!("missing err slot '{err_key}'")))?;
        b.store(err, err_slot);

        Ok(result)
    }
}
