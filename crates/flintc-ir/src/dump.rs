//! Deterministic textual printer for IR modules.
//!
//! The output is for humans, snapshots, and the CLI; it is not a parseable
//! interchange format.

use std::fmt::Write;

use crate::function::{BinOp, Callee, Function, Inst, InstId, Pred, Value};
use crate::module::Module;
use crate::types::IrType;

pub fn dump_module(module: &Module) -> String {
    let mut out = String::new();
    for def in &module.structs {
        let mut fields: Vec<String> = def.fields.iter().map(|&f| type_str(module, f)).collect();
        if let Some(tail) = def.flexible_tail {
            fields.push(format!("[{}]", type_str(module, tail)));
        }
        let _ = writeln!(out, "struct %{} = {{ {} }}", def.name, fields.join(", "));
    }
    if !module.structs.is_empty() {
        out.push('\n');
    }
    for def in &module.globals {
        match &def.init {
            crate::module::GlobalInit::Bytes(bytes) => {
                let _ = writeln!(out, "@{} = constant c\"{}\"", def.name, escape(bytes));
            }
            crate::module::GlobalInit::NullPtr => {
                let _ = writeln!(out, "@{} = global ptr null", def.name);
            }
        }
    }
    if !module.globals.is_empty() {
        out.push('\n');
    }
    for func in &module.functions {
        out.push_str(&dump_function(module, func));
        out.push('\n');
    }
    out
}

pub fn dump_function(module: &Module, func: &Function) -> String {
    let mut out = String::new();
    let params: Vec<String> = func
        .params
        .iter()
        .map(|(ty, name)| format!("{} %{}", type_str(module, *ty), name))
        .collect();
    let head = format!(
        "{} @{}({})",
        type_str(module, func.ret),
        func.name,
        params.join(", ")
    );
    if func.is_declaration() {
        let _ = writeln!(out, "declare {head}");
        return out;
    }
    let _ = writeln!(out, "define {head} {{");
    for (bi, block) in func.blocks.iter().enumerate() {
        let _ = writeln!(out, "{}.{}:", block.name, bi);
        for &inst in &block.insts {
            let _ = writeln!(out, "  {}", inst_str(module, func, inst));
        }
    }
    out.push_str("}\n");
    out
}

fn escape(bytes: &[u8]) -> String {
    let mut out = String::new();
    for &b in bytes {
        match b {
            b'"' | b'\\' => {
                let _ = write!(out, "\\{:02X}", b);
            }
            0x20..=0x7e => out.push(b as char),
            _ => {
                let _ = write!(out, "\\{:02X}", b);
            }
        }
    }
    out
}

fn type_str(module: &Module, ty: IrType) -> String {
    match ty {
        IrType::Void => "void".into(),
        IrType::I1 => "i1".into(),
        IrType::I8 => "i8".into(),
        IrType::I24 => "i24".into(),
        IrType::I32 => "i32".into(),
        IrType::I64 => "i64".into(),
        IrType::F64 => "f64".into(),
        IrType::Ptr => "ptr".into(),
        IrType::Struct(id) => format!("%{}", module.struct_def(id).name),
    }
}

fn result_name(func: &Function, id: InstId) -> String {
    let name = &func.insts[id.0 as usize].name;
    if name.is_empty() {
        format!("%v{}", id.0)
    } else {
        format!("%{}.{}", name, id.0)
    }
}

fn value_str(module: &Module, func: &Function, value: Value) -> String {
    match value {
        Value::Inst(id) => result_name(func, id),
        Value::Arg(i) => format!("%{}", func.params[i as usize].1),
        Value::ConstInt(ty, v) => format!("{} {}", type_str(module, ty), v),
        Value::ConstFloat(v) => format!("f64 {v}"),
        Value::NullPtr => "ptr null".into(),
        Value::Global(id) => format!("@{}", module.globals[id.0 as usize].name),
    }
}

fn typed(module: &Module, func: &Function, value: Value) -> String {
    match value {
        Value::Inst(id) => format!(
            "{} {}",
            type_str(module, func.inst_type(module, id)),
            result_name(func, id)
        ),
        Value::Arg(i) => format!(
            "{} %{}",
            type_str(module, func.params[i as usize].0),
            func.params[i as usize].1
        ),
        other => value_str(module, func, other),
    }
}

fn block_label(func: &Function, block: crate::function::BlockId) -> String {
    format!("%{}.{}", func.blocks[block.0 as usize].name, block.0)
}

fn bin_op_str(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "add",
        BinOp::Sub => "sub",
        BinOp::Mul => "mul",
        BinOp::UDiv => "udiv",
        BinOp::SDiv => "sdiv",
        BinOp::URem => "urem",
        BinOp::FAdd => "fadd",
        BinOp::FSub => "fsub",
        BinOp::FMul => "fmul",
        BinOp::FDiv => "fdiv",
    }
}

fn pred_str(pred: Pred) -> &'static str {
    match pred {
        Pred::Eq => "eq",
        Pred::Ne => "ne",
        Pred::Ult => "ult",
        Pred::Ule => "ule",
        Pred::Ugt => "ugt",
        Pred::Uge => "uge",
        Pred::Slt => "slt",
        Pred::Sle => "sle",
        Pred::Sgt => "sgt",
        Pred::Sge => "sge",
    }
}

fn inst_str(module: &Module, func: &Function, id: InstId) -> String {
    let data = &func.insts[id.0 as usize];
    let res = result_name(func, id);
    match &data.inst {
        Inst::Alloca { ty } => format!("{res} = alloca {}", type_str(module, *ty)),
        Inst::Load { ty, ptr, align } => format!(
            "{res} = load {}, {}, align {align}",
            type_str(module, *ty),
            typed(module, func, *ptr)
        ),
        Inst::Store { value, ptr, align } => format!(
            "store {}, {}, align {align}",
            typed(module, func, *value),
            typed(module, func, *ptr)
        ),
        Inst::StructGep {
            struct_id,
            ptr,
            field,
        } => format!(
            "{res} = getelementptr %{}, {}, field {field}",
            module.struct_def(*struct_id).name,
            typed(module, func, *ptr)
        ),
        Inst::Gep { elem, ptr, index } => format!(
            "{res} = getelementptr {}, {}, {}",
            type_str(module, *elem),
            typed(module, func, *ptr),
            typed(module, func, *index)
        ),
        Inst::Bin { op, lhs, rhs } => format!(
            "{res} = {} {}, {}",
            bin_op_str(*op),
            typed(module, func, *lhs),
            value_str(module, func, *rhs)
        ),
        Inst::Icmp { pred, lhs, rhs } => format!(
            "{res} = icmp {} {}, {}",
            pred_str(*pred),
            typed(module, func, *lhs),
            value_str(module, func, *rhs)
        ),
        Inst::Fcmp { pred, lhs, rhs } => format!(
            "{res} = fcmp {} {}, {}",
            pred_str(*pred),
            typed(module, func, *lhs),
            value_str(module, func, *rhs)
        ),
        Inst::Cast { kind, value, to } => {
            let op = match kind {
                crate::function::CastKind::Trunc => "trunc",
                crate::function::CastKind::ZExt => "zext",
                crate::function::CastKind::SExt => "sext",
                crate::function::CastKind::PtrToInt => "ptrtoint",
                crate::function::CastKind::IntToPtr => "inttoptr",
            };
            format!(
                "{res} = {op} {} to {}",
                typed(module, func, *value),
                type_str(module, *to)
            )
        }
        Inst::Select {
            cond,
            then_value,
            else_value,
        } => format!(
            "{res} = select {}, {}, {}",
            typed(module, func, *cond),
            typed(module, func, *then_value),
            typed(module, func, *else_value)
        ),
        Inst::Phi { ty, incomings } => {
            let arms: Vec<String> = incomings
                .iter()
                .map(|(block, value)| {
                    format!(
                        "[ {}, {} ]",
                        value_str(module, func, *value),
                        block_label(func, *block)
                    )
                })
                .collect();
            format!("{res} = phi {} {}", type_str(module, *ty), arms.join(", "))
        }
        Inst::Call { callee, args } => {
            let (name, ret) = match callee {
                Callee::Function(fid) => {
                    let f = module.function(*fid);
                    (f.name.clone(), f.ret)
                }
                Callee::External(c) => (c.name().to_string(), c.return_type()),
            };
            let args: Vec<String> = args.iter().map(|&a| typed(module, func, a)).collect();
            let call = format!("call {} @{}({})", type_str(module, ret), name, args.join(", "));
            if ret == IrType::Void {
                call
            } else {
                format!("{res} = {call}")
            }
        }
        Inst::ExtractValue { agg, index, .. } => format!(
            "{res} = extractvalue {}, {index}",
            typed(module, func, *agg)
        ),
        Inst::Br { target } => format!("br label {}", block_label(func, *target)),
        Inst::CondBr {
            cond,
            then_block,
            else_block,
            weights,
        } => {
            let mut s = format!(
                "br {}, label {}, label {}",
                typed(module, func, *cond),
                block_label(func, *then_block),
                block_label(func, *else_block)
            );
            if let Some((t, e)) = weights {
                let _ = write!(s, " !weights({t}, {e})");
            }
            s
        }
        Inst::Switch {
            value,
            default,
            cases,
        } => {
            let arms: Vec<String> = cases
                .iter()
                .map(|(v, block)| format!("{v}: {}", block_label(func, *block)))
                .collect();
            format!(
                "switch {}, default {} [{}]",
                typed(module, func, *value),
                block_label(func, *default),
                arms.join(", ")
            )
        }
        Inst::Ret { value } => match value {
            Some(v) => format!("ret {}", typed(module, func, *v)),
            None => "ret void".into(),
        },
        Inst::Unreachable => "unreachable".into(),
    }
}
