//! Append-style instruction builder.
//!
//! The builder targets one function at a time and keeps an explicit insertion
//! point; every block transition in the generator is an explicit
//! `set_insert_point`, there is no implicit continuation.

use crate::function::{
    BinOp, BlockData, BlockId, CFunc, Callee, CastKind, Inst, InstData, InstId, Pred, Value,
};
use crate::module::{FuncId, GlobalInit, Module};
use crate::types::{IrType, StructId};

pub struct Builder<'m> {
    module: &'m mut Module,
    func: FuncId,
    insert_block: Option<BlockId>,
}

impl<'m> Builder<'m> {
    /// Start building the body of a previously declared function.
    pub fn new(module: &'m mut Module, func: FuncId) -> Self {
        Self {
            module,
            func,
            insert_block: None,
        }
    }

    pub fn module(&mut self) -> &mut Module {
        self.module
    }

    pub fn func_id(&self) -> FuncId {
        self.func
    }

    pub fn create_block(&mut self, name: impl Into<String>) -> BlockId {
        let f = self.module.function_mut(self.func);
        let id = BlockId(f.blocks.len() as u32);
        f.blocks.push(BlockData {
            name: name.into(),
            insts: Vec::new(),
        });
        id
    }

    pub fn set_insert_point(&mut self, block: BlockId) {
        self.insert_block = Some(block);
    }

    pub fn insert_block(&self) -> BlockId {
        self.insert_block.expect("no insertion point set")
    }

    /// Current insertion point, if one is set.
    pub fn try_insert_block(&self) -> Option<BlockId> {
        self.insert_block
    }

    /// Result type of a value in the function under construction.
    pub fn value_type(&self, value: Value) -> IrType {
        self.module
            .function(self.func)
            .value_type(self.module, value)
    }

    /// Whether the current block already ends with a terminator.
    pub fn block_terminated(&self, block: BlockId) -> bool {
        let f = self.module.function(self.func);
        f.block(block)
            .insts
            .last()
            .is_some_and(|&id| f.inst(id).is_terminator())
    }

    /// Whether the current block has no instructions yet.
    pub fn block_is_empty(&self, block: BlockId) -> bool {
        self.module.function(self.func).block(block).insts.is_empty()
    }

    /// Drop a trailing empty block, but only when nothing branches to it (a
    /// merge block whose every predecessor terminated elsewhere).
    pub fn erase_block_if_empty_tail(&mut self, block: BlockId) {
        let f = self.module.function(self.func);
        if block.0 as usize != f.blocks.len() - 1 || !f.blocks[block.0 as usize].insts.is_empty() {
            return;
        }
        let referenced = f.insts.iter().any(|data| {
            data.inst.successors().contains(&block)
                || matches!(&data.inst, Inst::Phi { incomings, .. }
                    if incomings.iter().any(|(from, _)| *from == block))
        });
        if referenced {
            return;
        }
        let f = self.module.function_mut(self.func);
        f.blocks.pop();
        if self.insert_block == Some(block) {
            self.insert_block = None;
        }
    }

    fn push(&mut self, inst: Inst, name: impl Into<String>) -> Value {
        let block = self.insert_block();
        let f = self.module.function_mut(self.func);
        let id = InstId(f.insts.len() as u32);
        f.insts.push(InstData {
            inst,
            name: name.into(),
        });
        f.blocks[block.0 as usize].insts.push(id);
        Value::Inst(id)
    }

    // Constants

    pub fn i1(&self, v: bool) -> Value {
        Value::ConstInt(IrType::I1, v as u64)
    }

    pub fn i8(&self, v: u8) -> Value {
        Value::ConstInt(IrType::I8, v as u64)
    }

    pub fn i24(&self, v: u32) -> Value {
        Value::ConstInt(IrType::I24, v as u64)
    }

    pub fn i32(&self, v: u32) -> Value {
        Value::ConstInt(IrType::I32, v as u64)
    }

    pub fn i64(&self, v: u64) -> Value {
        Value::ConstInt(IrType::I64, v)
    }

    pub fn f64(&self, v: f64) -> Value {
        Value::ConstFloat(v)
    }

    pub fn null_ptr(&self) -> Value {
        Value::NullPtr
    }

    /// Intern a C string constant and return its address.
    pub fn const_string(&mut self, s: &str) -> Value {
        let mut bytes = s.as_bytes().to_vec();
        bytes.push(0);
        for (i, g) in self.module.globals.iter().enumerate() {
            if let GlobalInit::Bytes(existing) = &g.init
                && *existing == bytes
            {
                return Value::Global(crate::module::GlobalId(i as u32));
            }
        }
        let name = format!("str.{}", self.module.globals.len());
        let id = self.module.add_global(name, GlobalInit::Bytes(bytes));
        Value::Global(id)
    }

    // Memory

    pub fn alloca(&mut self, ty: IrType, name: impl Into<String>) -> Value {
        self.push(Inst::Alloca { ty }, name)
    }

    pub fn load(&mut self, ty: IrType, ptr: Value, name: impl Into<String>) -> Value {
        let align = self.module.layout().align_of(ty);
        self.push(Inst::Load { ty, ptr, align }, name)
    }

    pub fn store(&mut self, value: Value, ptr: Value) {
        let ty = self
            .module
            .function(self.func)
            .value_type(self.module, value);
        let align = self.module.layout().align_of(ty);
        self.push(Inst::Store { value, ptr, align }, "");
    }

    pub fn struct_gep(
        &mut self,
        struct_id: StructId,
        ptr: Value,
        field: u32,
        name: impl Into<String>,
    ) -> Value {
        self.push(
            Inst::StructGep {
                struct_id,
                ptr,
                field,
            },
            name,
        )
    }

    pub fn gep(&mut self, elem: IrType, ptr: Value, index: Value, name: impl Into<String>) -> Value {
        self.push(Inst::Gep { elem, ptr, index }, name)
    }

    // Arithmetic and comparison

    pub fn bin(&mut self, op: BinOp, lhs: Value, rhs: Value, name: impl Into<String>) -> Value {
        self.push(Inst::Bin { op, lhs, rhs }, name)
    }

    pub fn add(&mut self, lhs: Value, rhs: Value, name: impl Into<String>) -> Value {
        self.bin(BinOp::Add, lhs, rhs, name)
    }

    pub fn sub(&mut self, lhs: Value, rhs: Value, name: impl Into<String>) -> Value {
        self.bin(BinOp::Sub, lhs, rhs, name)
    }

    pub fn mul(&mut self, lhs: Value, rhs: Value, name: impl Into<String>) -> Value {
        self.bin(BinOp::Mul, lhs, rhs, name)
    }

    pub fn udiv(&mut self, lhs: Value, rhs: Value, name: impl Into<String>) -> Value {
        self.bin(BinOp::UDiv, lhs, rhs, name)
    }

    pub fn icmp(&mut self, pred: Pred, lhs: Value, rhs: Value, name: impl Into<String>) -> Value {
        self.push(Inst::Icmp { pred, lhs, rhs }, name)
    }

    pub fn fcmp(&mut self, pred: Pred, lhs: Value, rhs: Value, name: impl Into<String>) -> Value {
        self.push(Inst::Fcmp { pred, lhs, rhs }, name)
    }

    pub fn cast(
        &mut self,
        kind: CastKind,
        value: Value,
        to: IrType,
        name: impl Into<String>,
    ) -> Value {
        self.push(Inst::Cast { kind, value, to }, name)
    }

    pub fn select(
        &mut self,
        cond: Value,
        then_value: Value,
        else_value: Value,
        name: impl Into<String>,
    ) -> Value {
        self.push(
            Inst::Select {
                cond,
                then_value,
                else_value,
            },
            name,
        )
    }

    pub fn phi(
        &mut self,
        ty: IrType,
        incomings: Vec<(BlockId, Value)>,
        name: impl Into<String>,
    ) -> Value {
        self.push(Inst::Phi { ty, incomings }, name)
    }

    pub fn extract_value(
        &mut self,
        agg: Value,
        agg_ty: StructId,
        index: u32,
        name: impl Into<String>,
    ) -> Value {
        self.push(
            Inst::ExtractValue {
                agg,
                agg_ty,
                index,
            },
            name,
        )
    }

    // Calls

    pub fn call(&mut self, callee: FuncId, args: Vec<Value>, name: impl Into<String>) -> Value {
        self.push(
            Inst::Call {
                callee: Callee::Function(callee),
                args,
            },
            name,
        )
    }

    pub fn call_c(&mut self, callee: CFunc, args: Vec<Value>, name: impl Into<String>) -> Value {
        self.push(
            Inst::Call {
                callee: Callee::External(callee),
                args,
            },
            name,
        )
    }

    // Terminators

    pub fn br(&mut self, target: BlockId) {
        self.push(Inst::Br { target }, "");
    }

    pub fn cond_br(&mut self, cond: Value, then_block: BlockId, else_block: BlockId) {
        self.push(
            Inst::CondBr {
                cond,
                then_block,
                else_block,
                weights: None,
            },
            "",
        );
    }

    /// Conditional branch with `(then, else)` weight hints.
    pub fn cond_br_weighted(
        &mut self,
        cond: Value,
        then_block: BlockId,
        else_block: BlockId,
        weights: (u32, u32),
    ) {
        self.push(
            Inst::CondBr {
                cond,
                then_block,
                else_block,
                weights: Some(weights),
            },
            "",
        );
    }

    pub fn switch(&mut self, value: Value, default: BlockId, cases: Vec<(u64, BlockId)>) {
        self.push(
            Inst::Switch {
                value,
                default,
                cases,
            },
            "",
        );
    }

    pub fn ret(&mut self, value: Value) {
        self.push(Inst::Ret { value: Some(value) }, "");
    }

    pub fn ret_void(&mut self) {
        self.push(Inst::Ret { value: None }, "");
    }

    pub fn unreachable(&mut self) {
        self.push(Inst::Unreachable, "");
    }
}
