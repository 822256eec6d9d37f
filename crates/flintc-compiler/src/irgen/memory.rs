//! Per-type free/clone synthesis.
//!
//! Both entry points dispatch over a switch of all freeable type ids; each
//! case emits the traversal for one type. Data values live in DIMA slots,
//! so freeing a data field is a `release` (the per-field free runs when the
//! reference count hits zero), while plain heap values go back through
//! `flint.free` recursively.

use flintc_core::{Primitive, Type};
use flintc_ir::{Builder, CFunc, IrType, Linkage, Module, Pred, Value};

use super::{GenError, Generator};

impl Generator<'_> {
    /// Declarations only; DIMA's `release` needs `flint.free` resolvable
    /// before the bodies exist.
    pub(crate) fn declare_memory_functions(&mut self, module: &mut Module) {
        let free = module.declare_function(
            "flint.free",
            vec![(IrType::Ptr, "value_ptr".into()), (IrType::I32, "type_id".into())],
            IrType::Void,
            Linkage::External,
        );
        self.memory_fns.insert("free", free);
        let clone = module.declare_function(
            "flint.clone",
            vec![
                (IrType::Ptr, "src".into()),
                (IrType::Ptr, "dest".into()),
                (IrType::I32, "type_id".into()),
            ],
            IrType::Void,
            Linkage::External,
        );
        self.memory_fns.insert("clone", clone);
    }

    pub(crate) fn generate_memory_functions(&mut self, module: &mut Module) -> Result<(), GenError> {
        self.generate_free_function(module)?;
        self.generate_clone_function(module)?;
        Ok(())
    }

    fn release_value(&mut self, b: &mut Builder, data_name: &str, value: Value, ty: &Type) {
        let release = self.dima_fn("release");
        let head = self.head_of(data_name);
        let type_id = b.i32(ty.id());
        b.call(release, vec![head, value, type_id], "");
    }

    fn free_value_call(&mut self, b: &mut Builder, value: Value, ty: &Type) {
        match ty {
            Type::Data(name) => self.release_value(b, &name.clone(), value, ty),
            _ => {
                let free = self.memory_fns["free"];
                let type_id = b.i32(ty.id());
                b.call(free, vec![value, type_id], "");
            }
        }
    }

    fn generate_free_function(&mut self, module: &mut Module) -> Result<(), GenError> {
        let func = self.memory_fns["free"];
        let freeable_types = self.resolver.get_all_freeable_types();

        let mut b = Builder::new(module, func);
        let entry = b.create_block("entry");
        let default_block = b.create_block("default");

        let mut cases = Vec::new();
        let mut case_blocks = Vec::new();
        for ty in &freeable_types {
            let block = b.create_block(format!("case_{ty}"));
            cases.push((ty.id() as u64, block));
            case_blocks.push((block, ty.clone()));
        }

        let value_ptr = Value::Arg(0);
        let type_id = Value::Arg(1);

        b.set_insert_point(entry);
        b.switch(type_id, default_block, cases);

        b.set_insert_point(default_block);
        let message = b.const_string("Unknown type id for 'flint.free': %u\n");
        b.call_c(CFunc::Printf, vec![message, type_id], "");
        b.call_c(CFunc::Abort, vec![], "");
        b.unreachable();

        for (block, ty) in case_blocks {
            b.set_insert_point(block);
            self.generate_free_value(&mut b, value_ptr, &ty)?;
            b.ret_void();
        }
        Ok(())
    }

    fn generate_free_value(
        &mut self,
        b: &mut Builder,
        value: Value,
        ty: &Type,
    ) -> Result<(), GenError> {
        match ty {
            Type::Array { elem, dimensionality } => {
                if !self.resolver.universe.is_freeable(elem) {
                    b.call_c(CFunc::Free, vec![value], "");
                    return Ok(());
                }
                let (value_ptr, length, _) = self.array_header(b, value, *dimensionality);
                self.array_element_loop(b, ty, value_ptr, length, |r#gen, b, elem_value| {
                    r#gen.free_value_call(b, elem_value, elem);
                    Ok(())
                })?;
            }
            Type::Data(name) => {
                // Fields first; the data value itself is released by DIMA
                // when its reference count reaches zero.
                let data_struct = self.aggregate_struct(b.module(), ty);
                let fields = self
                    .resolver
                    .universe
                    .data_fields
                    .get(name)
                    .cloned()
                    .unwrap_or_default();
                for (i, (field_type, field_name)) in fields.iter().enumerate() {
                    if !self.resolver.universe.is_freeable(field_type) {
                        continue;
                    }
                    let field_ptr = b.struct_gep(
                        data_struct,
                        value,
                        i as u32,
                        format!("data_field_ptr_{field_name}"),
                    );
                    let field_value = if self.needs_load(field_type) {
                        b.load(IrType::Ptr, field_ptr, format!("data_field_{field_name}"))
                    } else {
                        field_ptr
                    };
                    self.free_value_call(b, field_value, field_type);
                }
            }
            Type::Entity(name) => {
                let entity_struct = self.aggregate_struct(b.module(), ty);
                let modules = self
                    .resolver
                    .entities
                    .get(name)
                    .map(|e| e.data_modules.clone())
                    .unwrap_or_default();
                for (i, data_name) in modules.iter().enumerate() {
                    if !self.dima_heads.contains_key(data_name) {
                        return Err(GenError::new(format!(
                            "entity '{name}' references unknown data module '{data_name}'"
                        )));
                    }
                    let data_type = Type::Data(data_name.clone());
                    let field_ptr = b.struct_gep(
                        entity_struct,
                        value,
                        i as u32,
                        format!("field_{data_name}_ptr"),
                    );
                    let data_value = b.load(IrType::Ptr, field_ptr, "data_value");
                    self.release_value(b, data_name, data_value, &data_type);
                }
            }
            Type::ErrorSet(_) => {
                let message_ptr = b.struct_gep(self.err_struct, value, 2, "err_message_ptr");
                let message = b.load(IrType::Ptr, message_ptr, "err_message");
                b.call_c(CFunc::Free, vec![message], "");
            }
            Type::Primitive(Primitive::Str) => {
                b.call_c(CFunc::Free, vec![value], "");
            }
            Type::Optional(inner) => {
                let opt_struct = self.aggregate_struct(b.module(), ty);
                let has_value_block = b.create_block(format!("{ty}_has_value"));
                let merge_block = b.create_block(format!("{ty}_merge"));

                let has_value_ptr = b.struct_gep(opt_struct, value, 0, "has_value_ptr");
                let has_value = b.load(IrType::I1, has_value_ptr, "has_value");
                b.cond_br(has_value, has_value_block, merge_block);

                b.set_insert_point(has_value_block);
                let opt_value_ptr = b.struct_gep(opt_struct, value, 1, "opt_value_ptr");
                let opt_value = if self.needs_load(inner) {
                    b.load(IrType::Ptr, opt_value_ptr, "opt_value")
                } else {
                    opt_value_ptr
                };
                self.free_value_call(b, opt_value, inner);
                b.br(merge_block);

                b.set_insert_point(merge_block);
            }
            Type::Tuple(elems) => {
                let tuple_struct = self.aggregate_struct(b.module(), ty);
                for (i, elem_type) in elems.iter().enumerate() {
                    if !self.resolver.universe.is_freeable(elem_type) {
                        continue;
                    }
                    let elem_ptr = b.struct_gep(tuple_struct, value, i as u32, "elem_ptr");
                    let elem_value = if self.needs_load(elem_type) {
                        b.load(IrType::Ptr, elem_ptr, "elem")
                    } else {
                        elem_ptr
                    };
                    self.free_value_call(b, elem_value, elem_type);
                }
            }
            Type::Variant(name) => {
                self.variant_switch(b, name, ty, value, |r#gen, b, case_value, case_type| {
                    r#gen.free_value_call(b, case_value, case_type);
                })?;
            }
            Type::Func(_) => {
                return Err(GenError::NotImplementedYet {
                    what: "freeing func modules".to_string(),
                });
            }
            _ => {}
        }
        Ok(())
    }

    fn generate_clone_function(&mut self, module: &mut Module) -> Result<(), GenError> {
        let func = self.memory_fns["clone"];
        // Only freeable types need deep copies; everything else is cloned by
        // plain value copy at the call site.
        let freeable_types = self.resolver.get_all_freeable_types();

        let mut b = Builder::new(module, func);
        let entry = b.create_block("entry");
        let default_block = b.create_block("default");

        let mut cases = Vec::new();
        let mut case_blocks = Vec::new();
        for ty in &freeable_types {
            let block = b.create_block(format!("case_{ty}"));
            cases.push((ty.id() as u64, block));
            case_blocks.push((block, ty.clone()));
        }

        let src = Value::Arg(0);
        let dest = Value::Arg(1);
        let type_id = Value::Arg(2);

        b.set_insert_point(entry);
        b.switch(type_id, default_block, cases);

        b.set_insert_point(default_block);
        let message = b.const_string("Unknown type id for 'flint.clone': %u\n");
        b.call_c(CFunc::Printf, vec![message, type_id], "");
        b.call_c(CFunc::Abort, vec![], "");
        b.unreachable();

        for (block, ty) in case_blocks {
            b.set_insert_point(block);
            self.generate_clone_value(&mut b, src, dest, &ty)?;
            b.ret_void();
        }
        Ok(())
    }

    fn generate_clone_value(
        &mut self,
        b: &mut Builder,
        src: Value,
        dest: Value,
        ty: &Type,
    ) -> Result<(), GenError> {
        match ty {
            Type::Array { elem, dimensionality } => {
                let elem_ir = if self.needs_load(elem) {
                    IrType::Ptr
                } else {
                    self.value_ir_type(b.module(), elem)
                };
                let sizeof_elem = b.module().layout().size_of(elem_ir);
                let sizeof_header = b.module().layout().struct_size(self.arr_struct);

                let (value_ptr, length, dimensionality_val) =
                    self.array_header(b, src, *dimensionality);
                let len_ptr = b.struct_gep(self.arr_struct, src, 1, "len_ptr");

                let content_size = b.mul(b.i64(sizeof_elem), length, "content_size");
                let lengths_size = b.mul(b.i64(8), dimensionality_val, "lengths_size");
                let value_size = b.add(lengths_size, content_size, "value_size");
                let array_size = b.add(b.i64(sizeof_header), value_size, "array_size");
                let new_arr = b.call_c(CFunc::Malloc, vec![array_size], "new_arr");

                if !self.resolver.universe.is_freeable(elem) {
                    // Plain content: one bulk copy of the whole structure.
                    b.call_c(CFunc::Memcpy, vec![new_arr, src, array_size], "");
                    b.store(new_arr, dest);
                    return Ok(());
                }

                let new_dim_ptr = b.struct_gep(self.arr_struct, new_arr, 0, "new_dim_ptr");
                b.store(dimensionality_val, new_dim_ptr);
                let new_len_ptr = b.struct_gep(self.arr_struct, new_arr, 1, "new_len_ptr");
                b.call_c(CFunc::Memcpy, vec![new_len_ptr, len_ptr, lengths_size], "");
                let new_value_ptr =
                    b.gep(IrType::I64, new_len_ptr, dimensionality_val, "new_value_ptr");

                let clone_fn = self.memory_fns["clone"];
                let elem_id = elem.id();
                let needs_load = self.needs_load(elem);
                self.array_element_loop_indexed(
                    b,
                    ty,
                    value_ptr,
                    length,
                    elem_ir,
                    move |_, b, elem_ptr, idx| {
                        let elem_value = if needs_load {
                            b.load(IrType::Ptr, elem_ptr, "arr_value")
                        } else {
                            elem_ptr
                        };
                        let new_elem_ptr =
                            b.gep(elem_ir, new_value_ptr, idx, "new_arr_value_ptr");
                        let id = b.i32(elem_id);
                        b.call(clone_fn, vec![elem_value, new_elem_ptr, id], "");
                        Ok(())
                    },
                )?;
                b.store(new_arr, dest);
            }
            Type::Data(name) => {
                // Fresh slot from DIMA, then per field either a byte copy or
                // a recursive clone; the new pointer lands in `dest`.
                let data_struct = self.aggregate_struct(b.module(), ty);
                let allocate_fn = self.dima_fn("allocate");
                let head = self.head_of(name);
                let new_data = b.call(allocate_fn, vec![head], "new_data_value");
                let fields = self
                    .resolver
                    .universe
                    .data_fields
                    .get(name)
                    .cloned()
                    .unwrap_or_default();
                let clone_fn = self.memory_fns["clone"];
                for (i, (field_type, field_name)) in fields.iter().enumerate() {
                    let src_ptr = b.struct_gep(
                        data_struct,
                        src,
                        i as u32,
                        format!("src_data_field_ptr_{field_name}"),
                    );
                    let dest_ptr = b.struct_gep(
                        data_struct,
                        new_data,
                        i as u32,
                        format!("dest_data_field_ptr_{field_name}"),
                    );
                    if self.resolver.universe.is_freeable(field_type) {
                        let field_src = if self.needs_load(field_type) {
                            b.load(IrType::Ptr, src_ptr, format!("src_data_field_{field_name}"))
                        } else {
                            src_ptr
                        };
                        let id = b.i32(field_type.id());
                        b.call(clone_fn, vec![field_src, dest_ptr, id], "");
                    } else {
                        let field_ir = self.value_ir_type(b.module(), field_type);
                        let size = b.module().layout().size_of(field_ir);
                        let size_val = b.i64(size);
                        b.call_c(CFunc::Memcpy, vec![dest_ptr, src_ptr, size_val], "");
                    }
                }
                b.store(new_data, dest);
            }
            Type::Entity(name) => {
                // Mirrors the free path: composed data modules are released,
                // not deep-copied, until the clone contract for entities is
                // settled.
                let entity_struct = self.aggregate_struct(b.module(), ty);
                let modules = self
                    .resolver
                    .entities
                    .get(name)
                    .map(|e| e.data_modules.clone())
                    .unwrap_or_default();
                for (i, data_name) in modules.iter().enumerate() {
                    if !self.dima_heads.contains_key(data_name) {
                        return Err(GenError::new(format!(
                            "entity '{name}' references unknown data module '{data_name}'"
                        )));
                    }
                    let data_type = Type::Data(data_name.clone());
                    let field_ptr = b.struct_gep(
                        entity_struct,
                        src,
                        i as u32,
                        format!("field_{data_name}_ptr"),
                    );
                    let data_value = b.load(IrType::Ptr, field_ptr, "data_value");
                    self.release_value(b, data_name, data_value, &data_type);
                }
            }
            Type::ErrorSet(_) => {
                // Same as the free path; see the entity note above.
                let message_ptr = b.struct_gep(self.err_struct, src, 2, "err_message_ptr");
                let message = b.load(IrType::Ptr, message_ptr, "err_message");
                b.call_c(CFunc::Free, vec![message], "");
            }
            Type::Primitive(Primitive::Str) => {
                let len_ptr = b.struct_gep(self.str_struct, src, 0, "str_len_ptr");
                let len = b.load(IrType::I64, len_ptr, "str_len");
                let sizeof_str = b.module().layout().struct_size(self.str_struct);
                // +1 for the null terminator every string carries.
                let value_size = b.add(len, b.i64(1), "str_value_size");
                let str_size = b.add(b.i64(sizeof_str), value_size, "str_size");
                let new_str = b.call_c(CFunc::Malloc, vec![str_size], "new_str");
                b.call_c(CFunc::Memcpy, vec![new_str, src, str_size], "");
                b.store(new_str, dest);
            }
            Type::Optional(inner) => {
                let opt_struct = self.aggregate_struct(b.module(), ty);
                let has_value_block = b.create_block(format!("{ty}_has_value"));
                let no_value_block = b.create_block(format!("{ty}_has_no_value"));
                let merge_block = b.create_block(format!("{ty}_merge"));

                let has_value_ptr = b.struct_gep(opt_struct, src, 0, "has_value_ptr");
                let has_value = b.load(IrType::I1, has_value_ptr, "has_value");
                b.cond_br(has_value, has_value_block, no_value_block);

                b.set_insert_point(has_value_block);
                let opt_value_ptr = b.struct_gep(opt_struct, src, 1, "opt_value_ptr");
                let opt_value = if self.needs_load(inner) {
                    b.load(IrType::Ptr, opt_value_ptr, "opt_value")
                } else {
                    opt_value_ptr
                };
                let dest_value_ptr = b.struct_gep(opt_struct, dest, 1, "dest_value_ptr");
                let clone_fn = self.memory_fns["clone"];
                let id = b.i32(inner.id());
                b.call(clone_fn, vec![opt_value, dest_value_ptr, id], "");
                let dest_has_value_ptr = b.struct_gep(opt_struct, dest, 0, "dest_has_value_ptr");
                b.store(b.i1(true), dest_has_value_ptr);
                b.br(merge_block);

                b.set_insert_point(no_value_block);
                let dest_has_value_ptr = b.struct_gep(opt_struct, dest, 0, "dest_has_value_ptr");
                b.store(b.i1(false), dest_has_value_ptr);
                b.br(merge_block);

                b.set_insert_point(merge_block);
            }
            Type::Tuple(elems) => {
                let tuple_struct = self.aggregate_struct(b.module(), ty);
                let clone_fn = self.memory_fns["clone"];
                for (i, elem_type) in elems.iter().enumerate() {
                    let src_ptr = b.struct_gep(tuple_struct, src, i as u32, "src_elem_ptr");
                    let dest_ptr = b.struct_gep(tuple_struct, dest, i as u32, "dest_elem_ptr");
                    if !self.resolver.universe.is_freeable(elem_type) {
                        let elem_ir = self.value_ir_type(b.module(), elem_type);
                        let size = b.module().layout().size_of(elem_ir);
                        let size_val = b.i64(size);
                        b.call_c(CFunc::Memcpy, vec![dest_ptr, src_ptr, size_val], "");
                        continue;
                    }
                    let src_value = if self.needs_load(elem_type) {
                        b.load(IrType::Ptr, src_ptr, "src_elem")
                    } else {
                        src_ptr
                    };
                    let id = b.i32(elem_type.id());
                    b.call(clone_fn, vec![src_value, dest_ptr, id], "");
                }
            }
            Type::Variant(name) => {
                let variant_struct = self.aggregate_struct(b.module(), ty);
                let tag_ptr = b.struct_gep(variant_struct, src, 0, "variant_tag_ptr");
                let tag = b.load(IrType::I8, tag_ptr, "variant_tag");
                let dest_tag_ptr = b.struct_gep(variant_struct, dest, 0, "dest_variant_tag_ptr");
                b.store(tag, dest_tag_ptr);
                let clone_fn = self.memory_fns["clone"];
                self.variant_switch(b, name, ty, src, move |_, b, case_value, case_type| {
                    let dest_value_ptr = b.struct_gep(variant_struct, dest, 1, "dest_value_ptr");
                    let id = b.i32(case_type.id());
                    b.call(clone_fn, vec![case_value, dest_value_ptr, id], "");
                })?;
            }
            Type::Func(_) => {
                return Err(GenError::NotImplementedYet {
                    what: "cloning func modules".to_string(),
                });
            }
            _ => {}
        }
        Ok(())
    }

    /// Load the array header: pointer to the first element, total element
    /// count (product of the per-axis lengths), and the dimensionality.
    fn array_header(
        &mut self,
        b: &mut Builder,
        value: Value,
        dimensionality: usize,
    ) -> (Value, Value, Value) {
        let dim_ptr = b.struct_gep(self.arr_struct, value, 0, "dim_ptr");
        let dims = b.load(IrType::I64, dim_ptr, "dimensionality");
        let len_ptr = b.struct_gep(self.arr_struct, value, 1, "len_ptr");
        let mut length = b.i64(1);
        for i in 0..dimensionality {
            let single_len_ptr = b.gep(IrType::I64, len_ptr, b.i64(i as u64), "single_len_ptr");
            let single_len = b.load(IrType::I64, single_len_ptr, format!("len_{i}"));
            length = b.mul(length, single_len, "length");
        }
        // Elements start right after the lengths.
        let value_ptr = b.gep(IrType::I64, len_ptr, dims, "value_ptr");
        (value_ptr, length, dims)
    }

    fn array_element_loop(
        &mut self,
        b: &mut Builder,
        ty: &Type,
        value_ptr: Value,
        length: Value,
        mut body: impl FnMut(&mut Self, &mut Builder, Value) -> Result<(), GenError>,
    ) -> Result<(), GenError> {
        let Type::Array { elem, .. } = ty else {
            unreachable!("array loop on non-array type")
        };
        let elem = (**elem).clone();
        let elem_ir = if self.needs_load(&elem) {
            IrType::Ptr
        } else {
            self.value_ir_type(b.module(), &elem)
        };
        let needs_load = self.needs_load(&elem);
        self.array_element_loop_indexed(b, ty, value_ptr, length, elem_ir, |r#gen, b, ptr, _| {
            let elem_value = if needs_load {
                b.load(IrType::Ptr, ptr, "arr_value")
            } else {
                ptr
            };
            body(r#gen, b, elem_value)
        })
    }

    fn array_element_loop_indexed(
        &mut self,
        b: &mut Builder,
        ty: &Type,
        value_ptr: Value,
        length: Value,
        elem_ir: IrType,
        mut body: impl FnMut(&mut Self, &mut Builder, Value, Value) -> Result<(), GenError>,
    ) -> Result<(), GenError> {
        let idx = b.alloca(IrType::I64, "idx");
        b.store(b.i64(0), idx);
        let loop_cond = b.create_block(format!("{ty}_loop_cond"));
        let loop_body = b.create_block(format!("{ty}_loop_body"));
        let loop_merge = b.create_block(format!("{ty}_loop_merge"));
        b.br(loop_cond);

        b.set_insert_point(loop_cond);
        let idx_value = b.load(IrType::I64, idx, "idx_value");
        let in_range = b.icmp(Pred::Ult, idx_value, length, "idx_lt_length");
        b.cond_br(in_range, loop_body, loop_merge);

        b.set_insert_point(loop_body);
        let elem_ptr = b.gep(elem_ir, value_ptr, idx_value, "arr_value_ptr");
        body(self, b, elem_ptr, idx_value)?;
        let idx_p1 = b.add(idx_value, b.i64(1), "idx_value_p1");
        b.store(idx_p1, idx);
        b.br(loop_cond);

        b.set_insert_point(loop_merge);
        Ok(())
    }

    /// Switch on the active tag (a `u8` at field 0) and run `case_body` for
    /// each freeable case only.
    fn variant_switch(
        &mut self,
        b: &mut Builder,
        name: &str,
        ty: &Type,
        value: Value,
        mut case_body: impl FnMut(&mut Self, &mut Builder, Value, &Type),
    ) -> Result<(), GenError> {
        let variant_struct = self.aggregate_struct(b.module(), ty);
        let cases = self
            .resolver
            .universe
            .variant_cases
            .get(name)
            .cloned()
            .unwrap_or_default();
        let freeable: Vec<(usize, Type)> = cases
            .into_iter()
            .enumerate()
            .filter(|(_, c)| self.resolver.universe.is_freeable(c))
            .collect();
        if freeable.is_empty() {
            return Ok(());
        }

        let tag_ptr = b.struct_gep(variant_struct, value, 0, "variant_active_value_ptr");
        let tag = b.load(IrType::I8, tag_ptr, "variant_active_value");

        let merge_block = b.create_block(format!("{ty}_switch_merge"));
        let mut switch_cases = Vec::new();
        let mut case_blocks = Vec::new();
        for (tag_value, case_type) in &freeable {
            let block = b.create_block(format!("{ty}_case_{case_type}"));
            switch_cases.push((*tag_value as u64, block));
            case_blocks.push((block, case_type.clone()));
        }
        b.switch(tag, merge_block, switch_cases);

        for (block, case_type) in case_blocks {
            b.set_insert_point(block);
            let value_ptr = b.struct_gep(variant_struct, value, 1, "variant_value_ptr");
            let case_value = if self.needs_load(&case_type) {
                b.load(IrType::Ptr, value_ptr, "variant_value")
            } else {
                value_ptr
            };
            case_body(self, b, case_value, &case_type);
            b.br(merge_block);
        }

        b.set_insert_point(merge_block);
        Ok(())
    }
}
