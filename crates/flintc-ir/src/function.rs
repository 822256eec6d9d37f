//! Functions, basic blocks, and instructions.
//!
//! Instructions live in a per-function arena; blocks hold ordered lists of
//! instruction ids. Values are either instruction results, arguments, or
//! inline constants.

use crate::module::{FuncId, GlobalId, Module};
use crate::types::{IrType, StructId};

/// Index of an instruction within its function's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstId(pub u32);

/// Index of a basic block within its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub u32);

/// An IR value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// Result of an instruction.
    Inst(InstId),
    /// Function argument by index.
    Arg(u32),
    ConstInt(IrType, u64),
    ConstFloat(f64),
    NullPtr,
    /// Address of a module global.
    Global(GlobalId),
}

/// External C runtime symbols the emitted IR may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CFunc {
    Malloc,
    Realloc,
    Free,
    Memcpy,
    Memmove,
    Strlen,
    Printf,
    Abort,
}

impl CFunc {
    pub fn name(self) -> &'static str {
        match self {
            Self::Malloc => "malloc",
            Self::Realloc => "realloc",
            Self::Free => "free",
            Self::Memcpy => "memcpy",
            Self::Memmove => "memmove",
            Self::Strlen => "strlen",
            Self::Printf => "printf",
            Self::Abort => "abort",
        }
    }

    pub fn return_type(self) -> IrType {
        match self {
            Self::Malloc | Self::Realloc | Self::Memcpy | Self::Memmove => IrType::Ptr,
            Self::Strlen => IrType::I64,
            Self::Printf => IrType::I32,
            Self::Free | Self::Abort => IrType::Void,
        }
    }
}

/// Call target: an internal function or a C runtime symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callee {
    Function(FuncId),
    External(CFunc),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastKind {
    Trunc,
    ZExt,
    SExt,
    PtrToInt,
    IntToPtr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    URem,
    FAdd,
    FSub,
    FMul,
    FDiv,
}

/// Integer comparison predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pred {
    Eq,
    Ne,
    Ult,
    Ule,
    Ugt,
    Uge,
    Slt,
    Sle,
    Sgt,
    Sge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inst {
    Alloca {
        ty: IrType,
    },
    Load {
        ty: IrType,
        ptr: Value,
        align: u64,
    },
    Store {
        value: Value,
        ptr: Value,
        align: u64,
    },
    /// Pointer to field `field` of a struct at `ptr`.
    StructGep {
        struct_id: StructId,
        ptr: Value,
        field: u32,
    },
    /// `ptr + index * sizeof(elem)`.
    Gep {
        elem: IrType,
        ptr: Value,
        index: Value,
    },
    Bin {
        op: BinOp,
        lhs: Value,
        rhs: Value,
    },
    Icmp {
        pred: Pred,
        lhs: Value,
        rhs: Value,
    },
    Fcmp {
        pred: Pred,
        lhs: Value,
        rhs: Value,
    },
    Cast {
        kind: CastKind,
        value: Value,
        to: IrType,
    },
    Select {
        cond: Value,
        then_value: Value,
        else_value: Value,
    },
    Phi {
        ty: IrType,
        incomings: Vec<(BlockId, Value)>,
    },
    Call {
        callee: Callee,
        args: Vec<Value>,
    },
    /// Field extraction from a struct value (not a pointer).
    ExtractValue {
        agg: Value,
        agg_ty: StructId,
        index: u32,
    },
    // Terminators
    Br {
        target: BlockId,
    },
    CondBr {
        cond: Value,
        then_block: BlockId,
        else_block: BlockId,
        /// Branch weight hint `(then, else)`; the backend may lay the lighter
        /// side out cold.
        weights: Option<(u32, u32)>,
    },
    Switch {
        value: Value,
        default: BlockId,
        cases: Vec<(u64, BlockId)>,
    },
    Ret {
        value: Option<Value>,
    },
    Unreachable,
}

impl Inst {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Self::Br { .. }
                | Self::CondBr { .. }
                | Self::Switch { .. }
                | Self::Ret { .. }
                | Self::Unreachable
        )
    }

    /// Successor blocks, for verification and interpretation.
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Self::Br { target } => vec![*target],
            Self::CondBr {
                then_block,
                else_block,
                ..
            } => vec![*then_block, *else_block],
            Self::Switch { default, cases, .. } => {
                let mut out = vec![*default];
                out.extend(cases.iter().map(|(_, b)| *b));
                out
            }
            _ => Vec::new(),
        }
    }
}

/// An instruction plus the name the generator gave its result.
#[derive(Debug, Clone)]
pub struct InstData {
    pub inst: Inst,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct BlockData {
    pub name: String,
    pub insts: Vec<InstId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    External,
    Internal,
}

/// A function: declaration-only until a body is attached.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub linkage: Linkage,
    pub params: Vec<(IrType, String)>,
    pub ret: IrType,
    pub insts: Vec<InstData>,
    pub blocks: Vec<BlockData>,
}

impl Function {
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn inst(&self, id: InstId) -> &Inst {
        &self.insts[id.0 as usize].inst
    }

    pub fn block(&self, id: BlockId) -> &BlockData {
        &self.blocks[id.0 as usize]
    }

    /// Result type of a value in the context of this function.
    pub fn value_type(&self, module: &Module, value: Value) -> IrType {
        match value {
            Value::Inst(id) => self.inst_type(module, id),
            Value::Arg(i) => self.params[i as usize].0,
            Value::ConstInt(ty, _) => ty,
            Value::ConstFloat(_) => IrType::F64,
            Value::NullPtr | Value::Global(_) => IrType::Ptr,
        }
    }

    /// Result type of an instruction.
    pub fn inst_type(&self, module: &Module, id: InstId) -> IrType {
        match self.inst(id) {
            Inst::Alloca { .. } | Inst::StructGep { .. } | Inst::Gep { .. } => IrType::Ptr,
            Inst::Load { ty, .. } => *ty,
            Inst::Bin { lhs, .. } => self.value_type(module, *lhs),
            Inst::Icmp { .. } | Inst::Fcmp { .. } => IrType::I1,
            Inst::Cast { to, .. } => *to,
            Inst::Select { then_value, .. } => self.value_type(module, *then_value),
            Inst::Phi { ty, .. } => *ty,
            Inst::Call { callee, .. } => match callee {
                Callee::Function(id) => module.function(*id).ret,
                Callee::External(c) => c.return_type(),
            },
            Inst::ExtractValue { agg_ty, index, .. } => {
                module.layout().field_type(*agg_ty, *index)
            }
            Inst::Store { .. }
            | Inst::Br { .. }
            | Inst::CondBr { .. }
            | Inst::Switch { .. }
            | Inst::Ret { .. }
            | Inst::Unreachable => IrType::Void,
        }
    }
}
