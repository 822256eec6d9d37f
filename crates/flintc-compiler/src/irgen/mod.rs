//! IR generation.
//!
//! Lowers the AST into basic-block IR and synthesizes the runtime support
//! the emitted code depends on, all into one module:
//!
//! - `dima` - the slab allocator (`__flint_dima_*`)
//! - `error` - error stringification (`__flint_get_err_*`)
//! - `memory` - per-type free/clone dispatch (`flint.free` / `flint.clone`)
//! - `statement` / `expression` - user function bodies
//! - `allocation` - entry-block stack slots

mod allocation;
mod dima;
mod error;
mod expression;
mod memory;
mod statement;

#[cfg(test)]
mod dima_tests;
#[cfg(test)]
mod error_tests;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

use flintc_core::{Primitive, Type};
use flintc_ir::{
    Builder, FuncId, GlobalId, IrType, Linkage, Module, StructId, Value,
};

use crate::ParseSession;
use crate::ast::FunctionNode;
use crate::resolver::Resolver;

/// Compile-time allocator configuration. The growth factor is an integer
/// over ten: capacities follow `cap(i+1) = (cap(i) * growth_factor + 9) / 10`.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorConfig {
    pub base_capacity: u64,
    pub growth_factor: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_capacity: 8,
            growth_factor: 15,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenError {
    #[error("IR generation failed: {what}")]
    Generating { what: String },

    #[error("not implemented yet: {what}")]
    NotImplementedYet { what: String },
}

impl GenError {
    pub(crate) fn new(what: impl Into<String>) -> Self {
        Self::Generating { what: what.into() }
    }
}

/// Stack slots of the function under generation, keyed `s{scope}::{name}`
/// for variables and `s{scope}::c{id}::ret` / `::err` for call results.
pub(crate) type Allocations = IndexMap<String, Value>;

/// Mutated-variable records for merge phis: name -> [(block, stored value)].
pub(crate) type PhiLookup = IndexMap<String, Vec<(flintc_ir::BlockId, Value)>>;

pub struct Generator<'s> {
    pub(crate) session: &'s ParseSession,
    pub(crate) resolver: Resolver,
    pub(crate) config: GeneratorConfig,

    pub(crate) str_struct: StructId,
    pub(crate) arr_struct: StructId,
    pub(crate) err_struct: StructId,
    pub(crate) slot_struct: StructId,
    pub(crate) block_struct: StructId,
    pub(crate) head_struct: StructId,

    pub(crate) dima_fns: IndexMap<&'static str, FuncId>,
    pub(crate) memory_fns: IndexMap<&'static str, FuncId>,
    pub(crate) error_fns: IndexMap<&'static str, FuncId>,
    pub(crate) create_str_fn: Option<FuncId>,
    /// One head slot global per data type, keyed by data name.
    pub(crate) dima_heads: IndexMap<String, GlobalId>,
}

impl<'s> Generator<'s> {
    /// Generate the full IR module for a parsed session.
    pub fn generate(session: &'s ParseSession, config: GeneratorConfig) -> Result<Module, GenError> {
        let resolver = Resolver::build(session);
        let mut module = Module::new();

        let str_struct = module.add_struct("type.flint.str", vec![IrType::I64], Some(IrType::I8));
        let arr_struct = module.add_struct("type.flint.arr", vec![IrType::I64], Some(IrType::I64));
        let err_struct = module.add_struct(
            "type.flint.err",
            vec![IrType::I32, IrType::I32, IrType::Ptr],
            None,
        );
        let slot_struct = module.add_struct(
            "dima.type.slot",
            vec![IrType::Ptr, IrType::I32, IrType::I24, IrType::I8],
            Some(IrType::I8),
        );
        let block_struct = module.add_struct(
            "dima.type.block",
            vec![
                IrType::I64,
                IrType::I64,
                IrType::I64,
                IrType::I64,
                IrType::I64,
            ],
            Some(IrType::Struct(slot_struct)),
        );
        let head_struct = module.add_struct(
            "dima.type.head",
            vec![IrType::Ptr, IrType::I64, IrType::I64],
            Some(IrType::Ptr),
        );

        let mut generator = Generator {
            session,
            resolver,
            config,
            str_struct,
            arr_struct,
            err_struct,
            slot_struct,
            block_struct,
            head_struct,
            dima_fns: IndexMap::new(),
            memory_fns: IndexMap::new(),
            error_fns: IndexMap::new(),
            create_str_fn: None,
            dima_heads: IndexMap::new(),
        };

        // Declarations first: DIMA's release dispatches into `flint.free`.
        generator.declare_memory_functions(&mut module);
        generator.generate_dima_functions(&mut module)?;
        generator.generate_create_str_function(&mut module);
        generator.generate_error_functions(&mut module)?;
        generator.generate_memory_functions(&mut module)?;

        for file in &session.files {
            for function in file.functions() {
                debug!(function = %function.name, "generating function");
                generator.generate_function(&mut module, function)?;
            }
        }

        Ok(module)
    }

    /// Value representation of a surface type: heap owners are pointers,
    /// small composites are struct values.
    pub(crate) fn value_ir_type(&self, module: &mut Module, ty: &Type) -> IrType {
        match ty {
            Type::Primitive(Primitive::Int) => IrType::I32,
            Type::Primitive(Primitive::Flint) => IrType::F64,
            Type::Primitive(Primitive::Bool) => IrType::I1,
            Type::Primitive(Primitive::Char) => IrType::I8,
            Type::Primitive(Primitive::Str) => IrType::Ptr,
            Type::Primitive(Primitive::Void) => IrType::Void,
            Type::Array { .. } | Type::Data(_) | Type::Entity(_) => IrType::Ptr,
            Type::Enum(_) => IrType::I32,
            Type::ErrorSet(_) => IrType::Struct(self.err_struct),
            Type::Optional(_) | Type::Tuple(_) | Type::Variant(_) => {
                IrType::Struct(self.aggregate_struct(module, ty))
            }
            Type::Func(_) => IrType::Ptr,
        }
    }

    /// Whether a field/slot of this type holds a pointer that must be loaded
    /// before the pointee can be traversed.
    pub(crate) fn needs_load(&self, ty: &Type) -> bool {
        matches!(
            ty,
            Type::Primitive(Primitive::Str) | Type::Array { .. } | Type::Data(_) | Type::Entity(_)
        )
    }

    /// The struct type used to address into a composite value.
    pub(crate) fn aggregate_struct(&self, module: &mut Module, ty: &Type) -> StructId {
        match ty {
            Type::Primitive(Primitive::Str) => self.str_struct,
            Type::Array { .. } => self.arr_struct,
            Type::ErrorSet(_) => self.err_struct,
            Type::Data(name) => {
                let fields: Vec<IrType> = self
                    .resolver
                    .universe
                    .data_fields
                    .get(name)
                    .map(|fields| {
                        fields
                            .iter()
                            .map(|(t, _)| self.value_ir_type(module, t))
                            .collect()
                    })
                    .unwrap_or_default();
                module.add_struct(format!("data.{name}"), fields, None)
            }
            Type::Entity(name) => {
                let count = self
                    .resolver
                    .entities
                    .get(name)
                    .map(|e| e.data_modules.len())
                    .unwrap_or(0);
                module.add_struct(format!("entity.{name}"), vec![IrType::Ptr; count], None)
            }
            Type::Optional(inner) => {
                let value = self.value_ir_type(module, inner);
                module.add_struct(
                    format!("opt.{}", struct_name_of(inner)),
                    vec![IrType::I1, value],
                    None,
                )
            }
            Type::Tuple(elems) => {
                let fields: Vec<IrType> =
                    elems.iter().map(|t| self.value_ir_type(module, t)).collect();
                let name = elems
                    .iter()
                    .map(struct_name_of)
                    .collect::<Vec<_>>()
                    .join(".");
                module.add_struct(format!("tuple.{name}"), fields, None)
            }
            Type::Variant(name) => {
                module.add_struct(format!("variant.{name}"), vec![IrType::I8], Some(IrType::I8))
            }
            _ => panic!("type '{ty}' has no aggregate struct"),
        }
    }

    /// `{ i32 err_code, T value... }` for a function's declared return types.
    pub(crate) fn return_struct(
        &self,
        module: &mut Module,
        name: &str,
        return_types: &[String],
    ) -> Result<StructId, GenError> {
        let mut fields = vec![IrType::I32];
        for type_str in return_types {
            // Void functions still return the error code alone.
            if type_str.is_empty() || type_str == "void" {
                continue;
            }
            let ty = self
                .resolver
                .parse_type(type_str)
                .ok_or_else(|| GenError::new(format!("unknown return type '{type_str}'")))?;
            fields.push(self.value_ir_type(module, &ty));
        }
        Ok(module.add_struct(format!("ret.{name}"), fields, None))
    }

    pub(crate) fn parse_type(&self, type_str: &str) -> Result<Type, GenError> {
        self.resolver
            .parse_type(type_str)
            .ok_or_else(|| GenError::new(format!("unknown type '{type_str}'")))
    }

    fn generate_function(
        &mut self,
        module: &mut Module,
        function: &FunctionNode,
    ) -> Result<(), GenError> {
        let ret_struct = self.return_struct(module, &function.name, &function.return_types)?;
        let mut params = Vec::new();
        for (type_str, name) in &function.parameters {
            let ty = self.parse_type(type_str)?;
            params.push((self.value_ir_type(module, &ty), name.clone()));
        }
        let func_id = module.declare_function(
            function.name.clone(),
            params,
            IrType::Struct(ret_struct),
            Linkage::External,
        );

        let mut b = Builder::new(module, func_id);
        let entry = b.create_block("entry");
        b.set_insert_point(entry);

        let mut allocations = Allocations::new();
        self.generate_allocations(&mut b, function, &mut allocations)?;

        // Spill parameters into their stack slots.
        for (i, (_, param_name)) in function.parameters.iter().enumerate() {
            let key = format!("s{}::{}", function.scope.0, param_name);
            let slot = allocations
                .get(&key)
                .copied()
                .ok_or_else(|| GenError::new(format!("missing parameter slot '{key}'")))?;
            b.store(Value::Arg(i as u32), slot);
        }

        let mut phi_lookup = PhiLookup::new();
        self.generate_body(&mut b, function.scope, &mut phi_lookup, &allocations)?;

        // A body that falls off the end still has to produce the return
        // struct; default it to err 0 and zeroed values.
        if let Some(block) = b.try_insert_block()
            && !b.block_terminated(block)
        {
            self.generate_default_return(&mut b, ret_struct);
        }
        Ok(())
    }

    fn generate_default_return(&mut self, b: &mut Builder, ret_struct: StructId) {
        let slot = b.alloca(IrType::Struct(ret_struct), "ret_struct");
        let field_count = b.module().struct_def(ret_struct).fields.len();
        for i in 0..field_count {
            let field_ty = b.module().layout().field_type(ret_struct, i as u32);
            if matches!(field_ty, IrType::Struct(_)) {
                continue;
            }
            let zero = zero_value(field_ty);
            let ptr = b.struct_gep(ret_struct, slot, i as u32, "field_ptr");
            b.store(zero, ptr);
        }
        let loaded = b.load(IrType::Struct(ret_struct), slot, "ret_val");
        b.ret(loaded);
    }
}

/// Zero constant of a scalar field type.
pub(crate) fn zero_value(ty: IrType) -> Value {
    match ty {
        IrType::F64 => Value::ConstFloat(0.0),
        IrType::Ptr => Value::NullPtr,
        other => Value::ConstInt(other, 0),
    }
}

fn struct_name_of(ty: &Type) -> String {
    ty.to_string()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '.' })
        .collect::<String>()
        .trim_matches('.')
        .to_string()
}
