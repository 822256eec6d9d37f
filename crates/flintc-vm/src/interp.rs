//! The interpreter proper.

use std::collections::HashMap;

use flintc_ir::{
    BinOp, BlockId, CFunc, Callee, CastKind, FuncId, Function, GlobalInit, Inst, InstId, IrType,
    Module, Pred, StructId, Value,
};

use crate::error::Trap;
use crate::memory::Memory;

/// A runtime value: integers and pointers share one 64-bit cell, struct
/// values are raw bytes in the module's layout.
#[derive(Debug, Clone, PartialEq)]
pub enum VmValue {
    Int(u64),
    Float(f64),
    Struct(Vec<u8>),
}

impl VmValue {
    pub fn as_int(&self) -> Result<u64, Trap> {
        match self {
            Self::Int(v) => Ok(*v),
            Self::Float(_) | Self::Struct(_) => Err(Trap::UndefinedValue),
        }
    }

    pub fn as_float(&self) -> Result<f64, Trap> {
        match self {
            Self::Float(v) => Ok(*v),
            _ => Err(Trap::UndefinedValue),
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8], Trap> {
        match self {
            Self::Struct(bytes) => Ok(bytes),
            _ => Err(Trap::UndefinedValue),
        }
    }
}

const DEFAULT_FUEL: u64 = 50_000_000;

pub struct Vm<'m> {
    module: &'m Module,
    pub memory: Memory,
    globals: Vec<u64>,
    output: String,
    fuel: u64,
}

impl<'m> Vm<'m> {
    /// Load a module: globals get addresses, constants get their bytes.
    pub fn new(module: &'m Module) -> Self {
        let mut memory = Memory::new();
        let mut globals = Vec::with_capacity(module.globals.len());
        for global in &module.globals {
            match &global.init {
                GlobalInit::Bytes(bytes) => {
                    let address = memory.malloc(bytes.len() as u64);
                    memory
                        .write(address, bytes)
                        .expect("fresh allocation is writable");
                    globals.push(address);
                }
                GlobalInit::NullPtr => {
                    let address = memory.malloc(8);
                    globals.push(address);
                }
            }
        }
        Self {
            module,
            memory,
            globals,
            output: String::new(),
            fuel: DEFAULT_FUEL,
        }
    }

    pub fn with_fuel(mut self, fuel: u64) -> Self {
        self.fuel = fuel;
        self
    }

    /// Everything `printf` produced so far.
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn call(&mut self, name: &str, args: &[VmValue]) -> Result<VmValue, Trap> {
        let func_id = self
            .module
            .function_by_name(name)
            .ok_or_else(|| Trap::UnknownFunction {
                name: name.to_string(),
            })?;
        self.call_id(func_id, args.to_vec())
    }

    /// Read one field out of a struct return value.
    pub fn struct_field(&self, bytes: &[u8], struct_id: StructId, field: u32) -> u64 {
        let layout = self.module.layout();
        let offset = layout.field_offset(struct_id, field) as usize;
        let size = layout.size_of(layout.field_type(struct_id, field)) as usize;
        let mut value = 0u64;
        for i in 0..size {
            value |= (bytes[offset + i] as u64) << (8 * i);
        }
        value
    }

    fn call_id(&mut self, func_id: FuncId, args: Vec<VmValue>) -> Result<VmValue, Trap> {
        let module: &'m Module = self.module;
        let func = module.function(func_id);
        if func.is_declaration() {
            return Err(Trap::MissingBody {
                name: func.name.clone(),
            });
        }
        self.exec_function(func, args)
    }

    fn exec_function(&mut self, func: &'m Function, args: Vec<VmValue>) -> Result<VmValue, Trap> {
        let mut regs: HashMap<u32, VmValue> = HashMap::new();
        let mut block = BlockId(0);
        let mut prev_block: Option<BlockId> = None;

        'blocks: loop {
            let block_data = func.block(block);
            for &inst_id in &block_data.insts {
                if self.fuel == 0 {
                    return Err(Trap::OutOfFuel);
                }
                self.fuel -= 1;

                match func.inst(inst_id) {
                    Inst::Alloca { ty } => {
                        let size = self.module.layout().size_of(*ty).max(8);
                        let address = self.memory.malloc(size);
                        regs.insert(inst_id.0, VmValue::Int(address));
                    }
                    Inst::Load { ty, ptr, .. } => {
                        let address = self.eval(func, &regs, &args, *ptr)?.as_int()?;
                        let value = self.load_typed(address, *ty)?;
                        regs.insert(inst_id.0, value);
                    }
                    Inst::Store { value, ptr, .. } => {
                        let ty = func.value_type(self.module, *value);
                        let address = self.eval(func, &regs, &args, *ptr)?.as_int()?;
                        let value = self.eval(func, &regs, &args, *value)?;
                        self.store_typed(address, ty, &value)?;
                    }
                    Inst::StructGep {
                        struct_id,
                        ptr,
                        field,
                    } => {
                        let base = self.eval(func, &regs, &args, *ptr)?.as_int()?;
                        let offset = self.module.layout().field_offset(*struct_id, *field);
                        regs.insert(inst_id.0, VmValue::Int(base.wrapping_add(offset)));
                    }
                    Inst::Gep { elem, ptr, index } => {
                        let base = self.eval(func, &regs, &args, *ptr)?.as_int()?;
                        let index_ty = func.value_type(self.module, *index);
                        let raw = self.eval(func, &regs, &args, *index)?.as_int()?;
                        let signed = sign_extend(raw, index_ty.bits());
                        let size = self.module.layout().size_of(*elem) as i64;
                        let address = (base as i64).wrapping_add(signed.wrapping_mul(size));
                        regs.insert(inst_id.0, VmValue::Int(address as u64));
                    }
                    Inst::Bin { op, lhs, rhs } => {
                        let ty = func.value_type(self.module, *lhs);
                        let l = self.eval(func, &regs, &args, *lhs)?;
                        let r = self.eval(func, &regs, &args, *rhs)?;
                        regs.insert(inst_id.0, exec_bin(*op, ty, &l, &r)?);
                    }
                    Inst::Icmp { pred, lhs, rhs } => {
                        let ty = func.value_type(self.module, *lhs);
                        let l = self.eval(func, &regs, &args, *lhs)?.as_int()?;
                        let r = self.eval(func, &regs, &args, *rhs)?.as_int()?;
                        let result = exec_icmp(*pred, ty.bits(), l, r);
                        regs.insert(inst_id.0, VmValue::Int(result as u64));
                    }
                    Inst::Fcmp { pred, lhs, rhs } => {
                        let l = self.eval(func, &regs, &args, *lhs)?.as_float()?;
                        let r = self.eval(func, &regs, &args, *rhs)?.as_float()?;
                        let result = exec_fcmp(*pred, l, r);
                        regs.insert(inst_id.0, VmValue::Int(result as u64));
                    }
                    Inst::Select {
                        cond,
                        then_value,
                        else_value,
                    } => {
                        let c = self.eval(func, &regs, &args, *cond)?.as_int()?;
                        let picked = if c != 0 { *then_value } else { *else_value };
                        let value = self.eval(func, &regs, &args, picked)?;
                        regs.insert(inst_id.0, value);
                    }
                    Inst::Phi { incomings, .. } => {
                        // Merge phis cover only the mutating predecessors;
                        // arriving from any other edge leaves the register
                        // undefined, which only matters if it is then read.
                        let pred = prev_block.ok_or(Trap::UndefinedValue)?;
                        if let Some((_, incoming)) =
                            incomings.iter().find(|(from, _)| *from == pred)
                        {
                            let value = self.eval(func, &regs, &args, *incoming)?;
                            regs.insert(inst_id.0, value);
                        }
                    }
                    Inst::Call { callee, args: call_args } => {
                        let mut values = Vec::with_capacity(call_args.len());
                        for arg in call_args {
                            values.push(self.eval(func, &regs, &args, *arg)?);
                        }
                        let result = match callee {
                            Callee::Function(id) => self.call_id(*id, values)?,
                            Callee::External(c) => self.call_c(*c, &values)?,
                        };
                        regs.insert(inst_id.0, result);
                    }
                    Inst::ExtractValue {
                        agg,
                        agg_ty,
                        index,
                    } => {
                        let value = self.eval(func, &regs, &args, *agg)?;
                        let bytes = value.as_bytes()?;
                        let layout = self.module.layout();
                        let offset = layout.field_offset(*agg_ty, *index) as usize;
                        let field_ty = layout.field_type(*agg_ty, *index);
                        let size = layout.size_of(field_ty) as usize;
                        let field = bytes_to_value(&bytes[offset..offset + size], field_ty);
                        regs.insert(inst_id.0, field);
                    }
                    Inst::Cast { kind, value, to } => {
                        let from_ty = func.value_type(self.module, *value);
                        let raw = self.eval(func, &regs, &args, *value)?.as_int()?;
                        let result = match kind {
                            CastKind::Trunc => mask(raw, to.bits()),
                            CastKind::ZExt | CastKind::PtrToInt | CastKind::IntToPtr => raw,
                            CastKind::SExt => {
                                mask(sign_extend(raw, from_ty.bits()) as u64, to.bits())
                            }
                        };
                        regs.insert(inst_id.0, VmValue::Int(result));
                    }
                    Inst::Br { target } => {
                        prev_block = Some(block);
                        block = *target;
                        continue 'blocks;
                    }
                    Inst::CondBr {
                        cond,
                        then_block,
                        else_block,
                        ..
                    } => {
                        let c = self.eval(func, &regs, &args, *cond)?.as_int()?;
                        prev_block = Some(block);
                        block = if c != 0 { *then_block } else { *else_block };
                        continue 'blocks;
                    }
                    Inst::Switch {
                        value,
                        default,
                        cases,
                    } => {
                        let v = self.eval(func, &regs, &args, *value)?.as_int()?;
                        prev_block = Some(block);
                        block = cases
                            .iter()
                            .find(|(case, _)| *case == v)
                            .map(|(_, target)| *target)
                            .unwrap_or(*default);
                        continue 'blocks;
                    }
                    Inst::Ret { value } => {
                        return match value {
                            Some(v) => self.eval(func, &regs, &args, *v),
                            None => Ok(VmValue::Int(0)),
                        };
                    }
                    Inst::Unreachable => return Err(Trap::Unreachable),
                }
            }
            return Err(Trap::FellOffBlock);
        }
    }

    fn eval(
        &self,
        func: &Function,
        regs: &HashMap<u32, VmValue>,
        args: &[VmValue],
        value: Value,
    ) -> Result<VmValue, Trap> {
        match value {
            Value::Inst(InstId(id)) => regs.get(&id).cloned().ok_or(Trap::UndefinedValue),
            Value::Arg(i) => args.get(i as usize).cloned().ok_or(Trap::UndefinedValue),
            Value::ConstInt(ty, v) => Ok(VmValue::Int(mask(v, ty.bits()))),
            Value::ConstFloat(v) => Ok(VmValue::Float(v)),
            Value::NullPtr => Ok(VmValue::Int(0)),
            Value::Global(id) => {
                let _ = func;
                Ok(VmValue::Int(self.globals[id.0 as usize]))
            }
        }
    }

    fn load_typed(&self, address: u64, ty: IrType) -> Result<VmValue, Trap> {
        match ty {
            IrType::F64 => {
                let bits = self.memory.read_uint(address, 8)?;
                Ok(VmValue::Float(f64::from_bits(bits)))
            }
            IrType::Struct(id) => {
                let size = self.module.layout().struct_size(id);
                Ok(VmValue::Struct(self.memory.read(address, size)?.to_vec()))
            }
            other => {
                let size = self.module.layout().size_of(other).max(1);
                Ok(VmValue::Int(self.memory.read_uint(address, size)?))
            }
        }
    }

    fn store_typed(&mut self, address: u64, ty: IrType, value: &VmValue) -> Result<(), Trap> {
        match (ty, value) {
            (IrType::F64, VmValue::Float(v)) => {
                self.memory.write_uint(address, v.to_bits(), 8)
            }
            (IrType::Struct(_), VmValue::Struct(bytes)) => self.memory.write(address, bytes),
            (other, VmValue::Int(v)) => {
                let size = self.module.layout().size_of(other).max(1);
                self.memory.write_uint(address, *v, size)
            }
            _ => Err(Trap::UndefinedValue),
        }
    }

    fn call_c(&mut self, c: CFunc, args: &[VmValue]) -> Result<VmValue, Trap> {
        match c {
            CFunc::Malloc => {
                let size = args[0].as_int()?;
                Ok(VmValue::Int(self.memory.malloc(size)))
            }
            CFunc::Realloc => {
                let old = args[0].as_int()?;
                let size = args[1].as_int()?;
                Ok(VmValue::Int(self.memory.realloc(old, size)))
            }
            CFunc::Free => {
                self.memory.free(args[0].as_int()?);
                Ok(VmValue::Int(0))
            }
            CFunc::Memcpy | CFunc::Memmove => {
                let dest = args[0].as_int()?;
                let src = args[1].as_int()?;
                let len = args[2].as_int()?;
                if len > 0 {
                    self.memory.copy(dest, src, len)?;
                }
                Ok(VmValue::Int(dest))
            }
            CFunc::Strlen => Ok(VmValue::Int(self.memory.strlen(args[0].as_int()?)?)),
            CFunc::Printf => {
                let formatted = self.format_printf(args)?;
                self.output.push_str(&formatted);
                Ok(VmValue::Int(formatted.len() as u64))
            }
            CFunc::Abort => Err(Trap::Abort {
                output: self.output.clone(),
            }),
        }
    }

    /// Just enough of printf for the runtime's diagnostics: %u, %d, %s, %f.
    fn format_printf(&self, args: &[VmValue]) -> Result<String, Trap> {
        let format = self.memory.read_c_string(args[0].as_int()?)?;
        let mut out = String::new();
        let mut arg_index = 1usize;
        let mut chars = format.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('u') => {
                    out.push_str(&args[arg_index].as_int()?.to_string());
                    arg_index += 1;
                }
                Some('d') => {
                    let v = args[arg_index].as_int()? as i64;
                    out.push_str(&v.to_string());
                    arg_index += 1;
                }
                Some('s') => {
                    let s = self.memory.read_c_string(args[arg_index].as_int()?)?;
                    out.push_str(&s);
                    arg_index += 1;
                }
                Some('f') => {
                    out.push_str(&args[arg_index].as_float()?.to_string());
                    arg_index += 1;
                }
                Some('%') => out.push('%'),
                Some(other) => {
                    out.push('%');
                    out.push(other);
                }
                None => break,
            }
        }
        Ok(out)
    }
}

fn mask(value: u64, bits: u32) -> u64 {
    if bits >= 64 {
        value
    } else {
        value & ((1u64 << bits) - 1)
    }
}

fn sign_extend(value: u64, bits: u32) -> i64 {
    if bits >= 64 {
        return value as i64;
    }
    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}

fn bytes_to_value(bytes: &[u8], ty: IrType) -> VmValue {
    let mut raw = 0u64;
    for (i, &byte) in bytes.iter().enumerate().take(8) {
        raw |= (byte as u64) << (8 * i);
    }
    match ty {
        IrType::F64 => VmValue::Float(f64::from_bits(raw)),
        _ => VmValue::Int(raw),
    }
}

fn exec_bin(op: BinOp, ty: IrType, lhs: &VmValue, rhs: &VmValue) -> Result<VmValue, Trap> {
    match op {
        BinOp::FAdd => Ok(VmValue::Float(lhs.as_float()? + rhs.as_float()?)),
        BinOp::FSub => Ok(VmValue::Float(lhs.as_float()? - rhs.as_float()?)),
        BinOp::FMul => Ok(VmValue::Float(lhs.as_float()? * rhs.as_float()?)),
        BinOp::FDiv => Ok(VmValue::Float(lhs.as_float()? / rhs.as_float()?)),
        _ => {
            let bits = ty.bits();
            let l = lhs.as_int()?;
            let r = rhs.as_int()?;
            let result = match op {
                BinOp::Add => l.wrapping_add(r),
                BinOp::Sub => l.wrapping_sub(r),
                BinOp::Mul => l.wrapping_mul(r),
                BinOp::UDiv => {
                    if r == 0 {
                        return Err(Trap::UndefinedValue);
                    }
                    l / r
                }
                BinOp::SDiv => {
                    let rs = sign_extend(r, bits);
                    if rs == 0 {
                        return Err(Trap::UndefinedValue);
                    }
                    sign_extend(l, bits).wrapping_div(rs) as u64
                }
                BinOp::URem => {
                    if r == 0 {
                        return Err(Trap::UndefinedValue);
                    }
                    l % r
                }
                _ => unreachable!("float ops handled above"),
            };
            Ok(VmValue::Int(mask(result, bits)))
        }
    }
}

fn exec_icmp(pred: Pred, bits: u32, lhs: u64, rhs: u64) -> bool {
    let (sl, sr) = (sign_extend(lhs, bits), sign_extend(rhs, bits));
    match pred {
        Pred::Eq => lhs == rhs,
        Pred::Ne => lhs != rhs,
        Pred::Ult => lhs < rhs,
        Pred::Ule => lhs <= rhs,
        Pred::Ugt => lhs > rhs,
        Pred::Uge => lhs >= rhs,
        Pred::Slt => sl < sr,
        Pred::Sle => sl <= sr,
        Pred::Sgt => sl > sr,
        Pred::Sge => sl >= sr,
    }
}

fn exec_fcmp(pred: Pred, lhs: f64, rhs: f64) -> bool {
    match pred {
        Pred::Eq => lhs == rhs,
        Pred::Ne => lhs != rhs,
        Pred::Ult | Pred::Slt => lhs < rhs,
        Pred::Ule | Pred::Sle => lhs <= rhs,
        Pred::Ugt | Pred::Sgt => lhs > rhs,
        Pred::Uge | Pred::Sge => lhs >= rhs,
    }
}
