//! Structural well-formedness checks over a built module.
//!
//! Runs after generation: every defined function must consist of blocks that
//! end in exactly one terminator, reference only existing blocks, and use
//! only defined values.

use thiserror::Error;

use crate::function::{Function, Inst, Value};
use crate::module::Module;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("function '{func}', block '{block}' is empty")]
    EmptyBlock { func: String, block: String },

    #[error("function '{func}', block '{block}' does not end with a terminator")]
    MissingTerminator { func: String, block: String },

    #[error("function '{func}', block '{block}' has a terminator before its end")]
    EarlyTerminator { func: String, block: String },

    #[error("function '{func}' references block index {index} out of range")]
    BadBlockRef { func: String, index: u32 },

    #[error("function '{func}' references instruction index {index} out of range")]
    BadInstRef { func: String, index: u32 },

    #[error("function '{func}' references argument index {index} out of range")]
    BadArgRef { func: String, index: u32 },

    #[error("function '{func}', phi '{name}' has no incoming edges")]
    EmptyPhi { func: String, name: String },
}

/// Verify every defined function of the module. Declarations are skipped.
pub fn verify_module(module: &Module) -> Result<(), VerifyError> {
    for func in &module.functions {
        if func.is_declaration() {
            continue;
        }
        verify_function(func)?;
    }
    Ok(())
}

fn verify_function(func: &Function) -> Result<(), VerifyError> {
    let name = func.name.clone();
    for block in &func.blocks {
        if block.insts.is_empty() {
            return Err(VerifyError::EmptyBlock {
                func: name.clone(),
                block: block.name.clone(),
            });
        }
        for (i, &inst_id) in block.insts.iter().enumerate() {
            if inst_id.0 as usize >= func.insts.len() {
                return Err(VerifyError::BadInstRef {
                    func: name.clone(),
                    index: inst_id.0,
                });
            }
            let inst = func.inst(inst_id);
            let is_last = i == block.insts.len() - 1;
            if inst.is_terminator() && !is_last {
                return Err(VerifyError::EarlyTerminator {
                    func: name.clone(),
                    block: block.name.clone(),
                });
            }
            if is_last && !inst.is_terminator() {
                return Err(VerifyError::MissingTerminator {
                    func: name.clone(),
                    block: block.name.clone(),
                });
            }
            verify_operands(func, inst)?;
            for succ in inst.successors() {
                if succ.0 as usize >= func.blocks.len() {
                    return Err(VerifyError::BadBlockRef {
                        func: name.clone(),
                        index: succ.0,
                    });
                }
            }
            if let Inst::Phi { incomings, .. } = inst {
                if incomings.is_empty() {
                    return Err(VerifyError::EmptyPhi {
                        func: name.clone(),
                        name: func.insts[inst_id.0 as usize].name.clone(),
                    });
                }
                for (block, _) in incomings {
                    if block.0 as usize >= func.blocks.len() {
                        return Err(VerifyError::BadBlockRef {
                            func: name.clone(),
                            index: block.0,
                        });
                    }
                }
            }
        }
    }
    Ok(())
}

fn verify_operands(func: &Function, inst: &Inst) -> Result<(), VerifyError> {
    let check = |value: &Value| -> Result<(), VerifyError> {
        match value {
            Value::Inst(id) if id.0 as usize >= func.insts.len() => Err(VerifyError::BadInstRef {
                func: func.name.clone(),
                index: id.0,
            }),
            Value::Arg(i) if *i as usize >= func.params.len() => Err(VerifyError::BadArgRef {
                func: func.name.clone(),
                index: *i,
            }),
            _ => Ok(()),
        }
    };
    match inst {
        Inst::Load { ptr, .. } => check(ptr),
        Inst::Store { value, ptr, .. } => check(value).and_then(|_| check(ptr)),
        Inst::StructGep { ptr, .. } => check(ptr),
        Inst::Gep { ptr, index, .. } => check(ptr).and_then(|_| check(index)),
        Inst::Bin { lhs, rhs, .. } | Inst::Icmp { lhs, rhs, .. } | Inst::Fcmp { lhs, rhs, .. } => {
            check(lhs).and_then(|_| check(rhs))
        }
        Inst::Select {
            cond,
            then_value,
            else_value,
        } => check(cond)
            .and_then(|_| check(then_value))
            .and_then(|_| check(else_value)),
        Inst::Phi { incomings, .. } => incomings.iter().try_for_each(|(_, v)| check(v)),
        Inst::Call { args, .. } => args.iter().try_for_each(check),
        Inst::ExtractValue { agg, .. } => check(agg),
        Inst::Cast { value, .. } => check(value),
        Inst::CondBr { cond, .. } => check(cond),
        Inst::Switch { value, .. } => check(value),
        Inst::Ret { value } => value.as_ref().map_or(Ok(()), check),
        Inst::Alloca { .. } | Inst::Br { .. } | Inst::Unreachable => Ok(()),
    }
}
