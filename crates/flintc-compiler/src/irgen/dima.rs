//! DIMA synthesis: the typed, reference-counted slab allocator.
//!
//! One head per data type, blocks of geometrically growing capacity, slots
//! with a 16-byte header in front of the inline value. Because `realloc`
//! can move a head, the only stable handle is the head-slot double pointer
//! held in a global per data type; every function takes `head**`.

use flintc_core::Type;
use flintc_ir::{
    Builder, CFunc, CastKind, FuncId, GlobalInit, IrType, Linkage, Module, Pred, Value,
};

use crate::ast::DataNode;

use super::{GenError, Generator};

/// Slot flag bits:
/// `isOccupied | isOwned | isArrStart | isArrMember | isAsync | isOwnedByEntity | reserved x2`.
/// `isAsync` is reserved for a future async mode and never set today.
pub(crate) mod flags {
    pub const UNUSED: u8 = 0;
    pub const OCCUPIED: u8 = 1 << 0;
}

impl Generator<'_> {
    pub(crate) fn generate_dima_functions(&mut self, module: &mut Module) -> Result<(), GenError> {
        self.generate_init_heads(module)?;
        self.generate_get_head(module);
        self.generate_get_block_capacity(module);
        self.generate_create_block(module);
        self.generate_allocate_in_block(module);
        self.generate_allocate(module);
        self.generate_allocate_slot(module);
        self.generate_release(module);
        Ok(())
    }

    pub(crate) fn dima_fn(&self, name: &str) -> FuncId {
        self.dima_fns[name]
    }

    /// Head-slot global of a data type.
    pub(crate) fn head_of(&self, data_name: &str) -> Value {
        Value::Global(self.dima_heads[data_name])
    }

    /// Byte image of a data type's default value: declared field defaults,
    /// everything else zero.
    fn default_image(&self, module: &mut Module, data: &DataNode) -> Vec<u8> {
        let struct_id = self.aggregate_struct(module, &Type::Data(data.name.clone()));
        let layout = module.layout();
        let mut image = vec![0u8; layout.struct_size(struct_id) as usize];
        let fields = match self.resolver.universe.data_fields.get(&data.name) {
            Some(fields) => fields,
            None => return image,
        };
        for (i, (field_type, field_name)) in fields.iter().enumerate() {
            let Some((_, literal)) = data
                .default_values
                .iter()
                .find(|(name, _)| name == field_name)
            else {
                continue;
            };
            let offset = layout.field_offset(struct_id, i as u32) as usize;
            match field_type {
                Type::Primitive(flintc_core::Primitive::Int) => {
                    let v = literal.parse::<i32>().unwrap_or(0);
                    image[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
                }
                Type::Primitive(flintc_core::Primitive::Flint) => {
                    let v = literal.parse::<f64>().unwrap_or(0.0);
                    image[offset..offset + 8].copy_from_slice(&v.to_le_bytes());
                }
                Type::Primitive(flintc_core::Primitive::Bool) => {
                    image[offset] = (literal == "true") as u8;
                }
                Type::Primitive(flintc_core::Primitive::Char) => {
                    image[offset] = literal.bytes().next().unwrap_or(0);
                }
                _ => {}
            }
        }
        image
    }

    fn generate_init_heads(&mut self, module: &mut Module) -> Result<(), GenError> {
        let func = module.declare_function(
            "__flint_dima_init_heads",
            vec![],
            IrType::Void,
            Linkage::External,
        );
        self.dima_fns.insert("init_heads", func);

        let head_size = module.layout().struct_size(self.head_struct);
        let data_types: Vec<(Type, DataNode)> = self
            .resolver
            .get_all_data_types()
            .into_iter()
            .map(|(t, d)| (t, d.clone()))
            .collect();

        let mut b = Builder::new(module, func);
        let entry = b.create_block("entry");
        let mut last_block = entry;
        for (_, data_node) in &data_types {
            let data_block = b.create_block(format!("init_data_{}", data_node.name));
            b.set_insert_point(last_block);
            b.br(data_block);

            b.set_insert_point(data_block);
            let head_global = b.module().add_global(
                format!("dima.head.{:08x}.{}", data_node.file_hash, data_node.name),
                GlobalInit::NullPtr,
            );
            self.dima_heads.insert(data_node.name.clone(), head_global);

            let image = self.default_image(b.module(), data_node);
            let type_size = image.len() as u64;
            let default_global = b.module().add_global(
                format!("dima.default.{}", data_node.name),
                GlobalInit::Bytes(image),
            );

            let allocated_head = b.call_c(
                CFunc::Malloc,
                vec![b.i64(head_size)],
                format!("allocated_head_{}", data_node.name),
            );
            b.store(allocated_head, Value::Global(head_global));

            let default_ptr = b.struct_gep(self.head_struct, allocated_head, 0, "default_ptr");
            b.store(Value::Global(default_global), default_ptr);
            let type_size_ptr = b.struct_gep(self.head_struct, allocated_head, 1, "type_size_ptr");
            b.store(b.i64(type_size), type_size_ptr);
            let block_count_ptr =
                b.struct_gep(self.head_struct, allocated_head, 2, "block_count_ptr");
            b.store(b.i64(0), block_count_ptr);

            last_block = data_block;
        }
        let merge = b.create_block("merge");
        b.set_insert_point(last_block);
        b.br(merge);
        b.set_insert_point(merge);
        b.ret_void();
        Ok(())
    }

    fn generate_get_head(&mut self, module: &mut Module) {
        let func = module.declare_function(
            "__flint_dima_get_head",
            vec![(IrType::I32, "type_id".into())],
            IrType::Ptr,
            Linkage::External,
        );
        self.dima_fns.insert("get_head", func);

        let data_types: Vec<(u32, String)> = self
            .resolver
            .get_all_data_types()
            .into_iter()
            .map(|(t, d)| (t.id(), d.name.clone()))
            .collect();

        let mut b = Builder::new(module, func);
        let entry = b.create_block("entry");
        let incorrect_id = b.create_block("incorrect_id");

        let mut cases = Vec::new();
        let mut case_blocks = Vec::new();
        for (type_id, name) in &data_types {
            let block = b.create_block(format!("case_{name}"));
            cases.push((*type_id as u64, block));
            case_blocks.push((block, name.clone()));
        }

        b.set_insert_point(entry);
        b.switch(Value::Arg(0), incorrect_id, cases);

        b.set_insert_point(incorrect_id);
        let message = b.const_string("__flint_dima_get_head: Unknown type ID: %u\n");
        b.call_c(CFunc::Printf, vec![message, Value::Arg(0)], "");
        b.call_c(CFunc::Abort, vec![], "");
        b.unreachable();

        for (block, name) in case_blocks {
            b.set_insert_point(block);
            let head = self.head_of(&name);
            b.ret(head);
        }
    }

    fn generate_get_block_capacity(&mut self, module: &mut Module) {
        let func = module.declare_function(
            "__flint_get_block_capacity",
            vec![(IrType::I64, "index".into())],
            IrType::I64,
            Linkage::External,
        );
        self.dima_fns.insert("get_block_capacity", func);

        let mut b = Builder::new(module, func);
        let entry = b.create_block("entry");
        let loop_cond = b.create_block("loop_cond");
        let loop_body = b.create_block("loop_body");
        let merge = b.create_block("merge");

        b.set_insert_point(entry);
        let capacity = b.alloca(IrType::I64, "capacity");
        b.store(b.i64(self.config.base_capacity), capacity);
        let i = b.alloca(IrType::I64, "i");
        b.store(b.i64(0), i);
        b.br(loop_cond);

        b.set_insert_point(loop_cond);
        let i_value = b.load(IrType::I64, i, "i_value");
        let i_lt_index = b.icmp(Pred::Ult, i_value, Value::Arg(0), "i_lt_index");
        b.cond_br(i_lt_index, loop_body, merge);

        // cap = ceil(cap * growth_factor / 10), in integer math.
        b.set_insert_point(loop_body);
        let current = b.load(IrType::I64, capacity, "current_capacity");
        let cap_times_gf = b.mul(current, b.i64(self.config.growth_factor), "cap_times_gf");
        let ctg_plus_9 = b.add(cap_times_gf, b.i64(9), "ctg_plus_9");
        let new_capacity = b.udiv(ctg_plus_9, b.i64(10), "new_capacity");
        b.store(new_capacity, capacity);
        let i_p1 = b.add(i_value, b.i64(1), "i_p1");
        b.store(i_p1, i);
        b.br(loop_cond);

        b.set_insert_point(merge);
        let loaded = b.load(IrType::I64, capacity, "loaded_capacity");
        b.ret(loaded);
    }

    fn generate_create_block(&mut self, module: &mut Module) {
        let func = module.declare_function(
            "__flint_dima_create_block",
            vec![(IrType::I64, "type_size".into()), (IrType::I64, "slot_count".into())],
            IrType::Ptr,
            Linkage::External,
        );
        self.dima_fns.insert("create_block", func);

        let slot_header = module.layout().struct_size(self.slot_struct);
        let block_header = module.layout().struct_size(self.block_struct);

        let mut b = Builder::new(module, func);
        let entry = b.create_block("entry");
        let clear_cond = b.create_block("clear_cond");
        let clear_body = b.create_block("clear_body");
        let merge = b.create_block("merge");

        let type_size = Value::Arg(0);
        let slot_count = Value::Arg(1);

        b.set_insert_point(entry);
        let slot_size = b.add(b.i64(slot_header), type_size, "slot_size");
        let slot_allocation_size = b.mul(slot_size, slot_count, "slot_allocation_size");
        let allocation_size = b.add(b.i64(block_header), slot_allocation_size, "allocation_size");
        let block = b.call_c(CFunc::Malloc, vec![allocation_size], "allocated_block");

        let type_size_ptr = b.struct_gep(self.block_struct, block, 0, "type_size_ptr");
        b.store(type_size, type_size_ptr);
        let capacity_ptr = b.struct_gep(self.block_struct, block, 1, "capacity_ptr");
        b.store(slot_count, capacity_ptr);
        let used_ptr = b.struct_gep(self.block_struct, block, 2, "used_ptr");
        b.store(b.i64(0), used_ptr);
        let pinned_ptr = b.struct_gep(self.block_struct, block, 3, "pinned_ptr");
        b.store(b.i64(0), pinned_ptr);
        let first_free_ptr = b.struct_gep(self.block_struct, block, 4, "first_free_ptr");
        b.store(b.i64(0), first_free_ptr);

        // New slots must read as UNUSED regardless of what malloc returned.
        let slots_ptr = b.struct_gep(self.block_struct, block, 5, "slots_ptr");
        let i = b.alloca(IrType::I64, "i");
        b.store(b.i64(0), i);
        b.br(clear_cond);

        b.set_insert_point(clear_cond);
        let i_value = b.load(IrType::I64, i, "i_value");
        let in_range = b.icmp(Pred::Ult, i_value, slot_count, "in_range");
        b.cond_br(in_range, clear_body, merge);

        b.set_insert_point(clear_body);
        let offset = b.mul(slot_size, i_value, "slot_offset");
        let slot_ptr = b.gep(IrType::I8, slots_ptr, offset, "slot_ptr");
        let flags_ptr = b.struct_gep(self.slot_struct, slot_ptr, 3, "flags_ptr");
        b.store(b.i8(flags::UNUSED), flags_ptr);
        let i_p1 = b.add(i_value, b.i64(1), "i_p1");
        b.store(i_p1, i);
        b.br(clear_cond);

        b.set_insert_point(merge);
        b.ret(block);
    }

    fn generate_allocate_in_block(&mut self, module: &mut Module) {
        let func = module.declare_function(
            "__flint_dima_allocate_in_block",
            vec![(IrType::Ptr, "block".into())],
            IrType::Ptr,
            Linkage::External,
        );
        self.dima_fns.insert("allocate_in_block", func);

        let slot_header = module.layout().struct_size(self.slot_struct);

        let mut b = Builder::new(module, func);
        let entry = b.create_block("entry");
        let loop_cond = b.create_block("loop_cond");
        let loop_body = b.create_block("loop_body");
        let next_slot = b.create_block("next_slot");
        let slot_unused = b.create_block("slot_unused");
        let loop_merge = b.create_block("loop_merge");

        let block = Value::Arg(0);

        b.set_insert_point(entry);
        let i = b.alloca(IrType::I64, "i");
        let type_size_ptr = b.struct_gep(self.block_struct, block, 0, "type_size_ptr");
        let type_size = b.load(IrType::I64, type_size_ptr, "type_size");
        let slot_size = b.add(b.i64(slot_header), type_size, "slot_size");
        let capacity_ptr = b.struct_gep(self.block_struct, block, 1, "capacity_ptr");
        let capacity = b.load(IrType::I64, capacity_ptr, "capacity");
        let first_free_ptr = b.struct_gep(self.block_struct, block, 4, "first_free_slot_ptr");
        let first_free = b.load(IrType::I64, first_free_ptr, "first_free_slot");
        b.store(first_free, i);
        let slots_ptr = b.struct_gep(self.block_struct, block, 5, "block_slots_ptr");
        b.br(loop_cond);

        b.set_insert_point(loop_cond);
        let i_value = b.load(IrType::I64, i, "i_value");
        let i_lt_capacity = b.icmp(Pred::Ult, i_value, capacity, "i_lt_capacity");
        b.cond_br(i_lt_capacity, loop_body, loop_merge);

        b.set_insert_point(loop_body);
        let offset = b.mul(slot_size, i_value, "slot_offset_in_bytes");
        let slot_ptr = b.gep(IrType::I8, slots_ptr, offset, "slot_ptr");
        let flags_ptr = b.struct_gep(self.slot_struct, slot_ptr, 3, "slot_flags_ptr");
        let slot_flags = b.load(IrType::I8, flags_ptr, "slot_flags");
        let is_empty = b.icmp(Pred::Eq, slot_flags, b.i8(flags::UNUSED), "is_empty");
        b.cond_br(is_empty, slot_unused, next_slot);

        b.set_insert_point(next_slot);
        let i_p1 = b.add(i_value, b.i64(1), "i_p1");
        b.store(i_p1, i);
        b.br(loop_cond);

        b.set_insert_point(slot_unused);
        b.store(b.i8(flags::OCCUPIED), flags_ptr);
        let arc_ptr = b.struct_gep(self.slot_struct, slot_ptr, 2, "slot_arc_ptr");
        b.store(b.i24(1), arc_ptr);
        let used_ptr = b.struct_gep(self.block_struct, block, 2, "block_used_ptr");
        let used = b.load(IrType::I64, used_ptr, "block_used");
        let used_p1 = b.add(used, b.i64(1), "block_used_p1");
        b.store(used_p1, used_ptr);
        let next_i = b.add(i_value, b.i64(1), "i_p1");
        let wraps = b.icmp(Pred::Uge, next_i, capacity, "i_p1_ge_cap");
        let new_first_free = b.select(wraps, b.i64(0), next_i, "new_first_free_slot");
        b.store(new_first_free, first_free_ptr);
        b.ret(slot_ptr);

        b.set_insert_point(loop_merge);
        b.ret(b.null_ptr());
    }

    fn generate_allocate(&mut self, module: &mut Module) {
        let func = module.declare_function(
            "__flint_dima_allocate",
            vec![(IrType::Ptr, "head_ref".into())],
            IrType::Ptr,
            Linkage::External,
        );
        self.dima_fns.insert("allocate", func);

        let create_block_fn = self.dima_fn("create_block");
        let allocate_in_block_fn = self.dima_fn("allocate_in_block");
        let get_block_capacity_fn = self.dima_fn("get_block_capacity");

        let head_size = module.layout().struct_size(self.head_struct);
        let block_ptr_size = module.layout().size_of(IrType::Ptr);

        let mut b = Builder::new(module, func);
        let entry = b.create_block("entry");
        let no_heads = b.create_block("no_heads");
        let heads_present = b.create_block("heads_present");
        let loop_condition = b.create_block("loop_condition");
        let loop_body = b.create_block("loop_body");
        let loop_body_not_null = b.create_block("loop_body_block_not_null");
        let loop_body_not_full = b.create_block("loop_body_block_not_full");
        let loop_merge = b.create_block("loop_merge");
        let create_block_inline = b.create_block("create_block_inline");
        let search_free_cond = b.create_block("search_free_loop_condition");
        let search_free_body = b.create_block("search_free_loop_body");
        let search_free_found = b.create_block("search_free_loop_empty_found");
        let create_block_inline_merge = b.create_block("create_block_inline_merge");
        let create_new_block = b.create_block("create_new_block");
        let copy = b.create_block("copy");

        let head_ref = Value::Arg(0);

        b.set_insert_point(entry);
        let slot_alloca = b.alloca(IrType::Ptr, "slot");
        b.store(b.null_ptr(), slot_alloca);
        let i = b.alloca(IrType::I64, "i");
        b.store(b.i64(0), i);
        let head_value = b.load(IrType::Ptr, head_ref, "head_value");
        let type_size_ptr = b.struct_gep(self.head_struct, head_value, 1, "type_size_ptr");
        let type_size = b.load(IrType::I64, type_size_ptr, "type_size");
        let head_block_count_ptr =
            b.struct_gep(self.head_struct, head_value, 2, "head_block_count_ptr");
        let head_block_count = b.load(IrType::I64, head_block_count_ptr, "head_block_count");
        let is_head_empty = b.icmp(Pred::Eq, head_block_count, b.i64(0), "is_head_empty");
        b.cond_br_weighted(is_head_empty, no_heads, heads_present, (1, 100));

        // First allocation ever: grow the head to hold one block pointer.
        {
            b.set_insert_point(no_heads);
            let new_size = b.i64(head_size + block_ptr_size);
            let new_head = b.call_c(CFunc::Realloc, vec![head_value, new_size], "new_head_value");
            b.store(new_head, head_ref);
            let new_count_ptr = b.struct_gep(self.head_struct, new_head, 2, "new_block_count_ptr");
            b.store(b.i64(1), new_count_ptr);
            let base = b.i64(self.config.base_capacity);
            let new_block = b.call(create_block_fn, vec![type_size, base], "new_block");
            let blocks_ptr = b.struct_gep(self.head_struct, new_head, 3, "blocks_ptr");
            b.store(new_block, blocks_ptr);
            let slot_value = b.call(allocate_in_block_fn, vec![new_block], "slot_value");
            b.store(slot_value, slot_alloca);
            let block_id_ptr = b.struct_gep(self.slot_struct, slot_value, 1, "slot_block_id_ptr");
            b.store(b.i32(0), block_id_ptr);
            b.br(copy);
        }

        // Scan existing blocks in reverse; first non-full block wins.
        {
            b.set_insert_point(heads_present);
            let head_value = b.load(IrType::Ptr, head_ref, "head_value");
            let block_count_ptr = b.struct_gep(self.head_struct, head_value, 2, "block_count_ptr");
            let block_count = b.load(IrType::I64, block_count_ptr, "block_count");
            b.store(block_count, i);
            b.br(loop_condition);

            b.set_insert_point(loop_condition);
            let i_value = b.load(IrType::I64, i, "i_value");
            let i_gt_0 = b.icmp(Pred::Ugt, i_value, b.i64(0), "i_gt_0");
            b.cond_br(i_gt_0, loop_body, loop_merge);

            b.set_insert_point(loop_body);
            let block_idx = b.sub(i_value, b.i64(1), "block_idx");
            b.store(block_idx, i);
            let blocks_ptr = b.struct_gep(self.head_struct, head_value, 3, "blocks_ptr");
            let block_ptr = b.gep(IrType::Ptr, blocks_ptr, block_idx, "block_ptr");
            let block = b.load(IrType::Ptr, block_ptr, "block");
            let block_null = b.icmp(Pred::Eq, block, b.null_ptr(), "block_null");
            b.cond_br_weighted(block_null, loop_condition, loop_body_not_null, (1, 100));

            b.set_insert_point(loop_body_not_null);
            let used_ptr = b.struct_gep(self.block_struct, block, 2, "block_used_ptr");
            let used = b.load(IrType::I64, used_ptr, "block_used");
            let capacity_ptr = b.struct_gep(self.block_struct, block, 1, "block_capacity_ptr");
            let capacity = b.load(IrType::I64, capacity_ptr, "block_capacity");
            let is_full = b.icmp(Pred::Eq, used, capacity, "is_block_full");
            b.cond_br_weighted(is_full, loop_condition, loop_body_not_full, (1, 100));

            b.set_insert_point(loop_body_not_full);
            let slot_value = b.call(allocate_in_block_fn, vec![block], "slot_ptr_value");
            b.store(slot_value, slot_alloca);
            let block_id = b.cast(CastKind::Trunc, block_idx, IrType::I32, "block_id");
            let block_id_ptr = b.struct_gep(self.slot_struct, slot_value, 1, "slot_block_id_ptr");
            b.store(block_id, block_id_ptr);
            b.br(loop_merge);
        }

        b.set_insert_point(loop_merge);
        let slot_value = b.load(IrType::Ptr, slot_alloca, "slot_value");
        let is_slot_null = b.icmp(Pred::Eq, slot_value, b.null_ptr(), "is_slot_null");
        b.cond_br_weighted(is_slot_null, create_block_inline, create_block_inline_merge, (1, 100));

        // All blocks full: fill a null slot of the blocks array, if any.
        {
            b.set_insert_point(create_block_inline);
            b.store(head_block_count, i);
            let blocks = b.struct_gep(self.head_struct, head_value, 3, "blocks");
            b.br(search_free_cond);

            b.set_insert_point(search_free_cond);
            let i_value = b.load(IrType::I64, i, "i_value");
            let i_gt_0 = b.icmp(Pred::Ugt, i_value, b.i64(0), "i_gt_0");
            b.cond_br(i_gt_0, search_free_body, create_block_inline_merge);

            b.set_insert_point(search_free_body);
            let block_idx = b.sub(i_value, b.i64(1), "block_idx");
            b.store(block_idx, i);
            let block_ptr = b.gep(IrType::Ptr, blocks, block_idx, "block_ptr");
            let block = b.load(IrType::Ptr, block_ptr, "block");
            let block_is_null = b.icmp(Pred::Eq, block, b.null_ptr(), "block_is_null");
            b.cond_br_weighted(block_is_null, search_free_found, search_free_cond, (1, 100));

            b.set_insert_point(search_free_found);
            let block_capacity = b.call(get_block_capacity_fn, vec![block_idx], "block_capacity");
            let created = b.call(create_block_fn, vec![type_size, block_capacity], "created_block");
            b.store(created, block_ptr);
            let slot_ptr = b.call(allocate_in_block_fn, vec![created], "slot_ptr");
            b.store(slot_ptr, slot_alloca);
            let block_id = b.cast(CastKind::Trunc, block_idx, IrType::I32, "block_id");
            let block_id_ptr = b.struct_gep(self.slot_struct, slot_ptr, 1, "slot_block_id_ptr");
            b.store(block_id, block_id_ptr);
            b.br(create_block_inline_merge);
        }

        b.set_insert_point(create_block_inline_merge);
        let slot_value = b.load(IrType::Ptr, slot_alloca, "slot_value");
        let is_slot_null = b.icmp(Pred::Eq, slot_value, b.null_ptr(), "is_slot_null");
        b.cond_br_weighted(is_slot_null, create_new_block, copy, (1, 100));

        // Still nothing: realloc the head with room for one more block.
        {
            b.set_insert_point(create_new_block);
            let block_count_p1 = b.add(head_block_count, b.i64(1), "block_count_p1");
            let blocks_size = b.mul(b.i64(block_ptr_size), block_count_p1, "blocks_size");
            let new_head_size = b.add(b.i64(head_size), blocks_size, "new_head_size");
            let new_head = b.call_c(CFunc::Realloc, vec![head_value, new_head_size], "new_head");
            b.store(new_head, head_ref);
            let block_capacity =
                b.call(get_block_capacity_fn, vec![head_block_count], "block_capacity");
            let new_block = b.call(create_block_fn, vec![type_size, block_capacity], "new_block");
            let blocks_ptr = b.struct_gep(self.head_struct, new_head, 3, "blocks_ptr");
            let block_slot = b.gep(IrType::Ptr, blocks_ptr, head_block_count, "block_slot");
            b.store(new_block, block_slot);
            let new_count_ptr =
                b.struct_gep(self.head_struct, new_head, 2, "new_head_block_count_ptr");
            b.store(block_count_p1, new_count_ptr);
            let slot_ptr = b.call(allocate_in_block_fn, vec![new_block], "slot_ptr");
            b.store(slot_ptr, slot_alloca);
            let block_id = b.cast(CastKind::Trunc, head_block_count, IrType::I32, "block_id");
            let block_id_ptr = b.struct_gep(self.slot_struct, slot_ptr, 1, "slot_block_id_ptr");
            b.store(block_id, block_id_ptr);
            b.br(copy);
        }

        // Seed the slot with the type's default value; callers get a pointer
        // to the value area, never to the slot header.
        b.set_insert_point(copy);
        let slot_value = b.load(IrType::Ptr, slot_alloca, "slot_value");
        let slot_value_ptr = b.struct_gep(self.slot_struct, slot_value, 4, "slot_value_ptr");
        let head_value = b.load(IrType::Ptr, head_ref, "head_value");
        let default_value_ptr =
            b.struct_gep(self.head_struct, head_value, 0, "head_default_value_ptr");
        let default_value = b.load(IrType::Ptr, default_value_ptr, "head_default_value");
        b.call_c(
            CFunc::Memcpy,
            vec![slot_value_ptr, default_value, type_size],
            "",
        );
        b.ret(slot_value_ptr);
    }

    fn generate_allocate_slot(&mut self, module: &mut Module) {
        let func = module.declare_function(
            "__flint_dima_allocate_slot",
            vec![(IrType::I32, "type_id".into())],
            IrType::Ptr,
            Linkage::External,
        );
        self.dima_fns.insert("allocate_slot", func);

        let get_head_fn = self.dima_fn("get_head");
        let allocate_fn = self.dima_fn("allocate");

        let mut b = Builder::new(module, func);
        let entry = b.create_block("entry");
        b.set_insert_point(entry);
        let head = b.call(get_head_fn, vec![Value::Arg(0)], "head");
        let allocated_slot = b.call(allocate_fn, vec![head], "allocated_slot");
        b.ret(allocated_slot);
    }

    /// Drop one reference; on zero, run the per-type free over the value,
    /// return the slot to the block, and lower `first_free_slot_id` when the
    /// freed index is smaller.
    fn generate_release(&mut self, module: &mut Module) {
        let func = module.declare_function(
            "__flint_dima_release",
            vec![
                (IrType::Ptr, "head_ref".into()),
                (IrType::Ptr, "value_ptr".into()),
                (IrType::I32, "type_id".into()),
            ],
            IrType::Void,
            Linkage::External,
        );
        self.dima_fns.insert("release", func);

        let free_fn = self.memory_fns["free"];
        let slot_header = module.layout().struct_size(self.slot_struct);

        let mut b = Builder::new(module, func);
        let entry = b.create_block("entry");
        let free_slot = b.create_block("free_slot");
        let lower_first_free = b.create_block("lower_first_free");
        let merge = b.create_block("merge");

        let head_ref = Value::Arg(0);
        let value_ptr = Value::Arg(1);
        let type_id = Value::Arg(2);

        b.set_insert_point(entry);
        let back = b.i64((slot_header as i64).wrapping_neg() as u64);
        let slot_ptr = b.gep(IrType::I8, value_ptr, back, "slot_ptr");
        let arc_ptr = b.struct_gep(self.slot_struct, slot_ptr, 2, "arc_ptr");
        let arc = b.load(IrType::I24, arc_ptr, "arc");
        let arc_m1 = b.sub(arc, b.i24(1), "arc_m1");
        b.store(arc_m1, arc_ptr);
        let is_zero = b.icmp(Pred::Eq, arc_m1, b.i24(0), "arc_is_zero");
        b.cond_br_weighted(is_zero, free_slot, merge, (1, 100));

        b.set_insert_point(free_slot);
        b.call(free_fn, vec![value_ptr, type_id], "");
        let flags_ptr = b.struct_gep(self.slot_struct, slot_ptr, 3, "flags_ptr");
        b.store(b.i8(flags::UNUSED), flags_ptr);

        let head = b.load(IrType::Ptr, head_ref, "head");
        let block_id_ptr = b.struct_gep(self.slot_struct, slot_ptr, 1, "block_id_ptr");
        let block_id = b.load(IrType::I32, block_id_ptr, "block_id");
        let block_idx = b.cast(CastKind::ZExt, block_id, IrType::I64, "block_idx");
        let blocks_ptr = b.struct_gep(self.head_struct, head, 3, "blocks_ptr");
        let block_pos = b.gep(IrType::Ptr, blocks_ptr, block_idx, "block_pos");
        let block = b.load(IrType::Ptr, block_pos, "block");

        let used_ptr = b.struct_gep(self.block_struct, block, 2, "used_ptr");
        let used = b.load(IrType::I64, used_ptr, "used");
        let used_m1 = b.sub(used, b.i64(1), "used_m1");
        b.store(used_m1, used_ptr);

        let type_size_ptr = b.struct_gep(self.block_struct, block, 0, "type_size_ptr");
        let type_size = b.load(IrType::I64, type_size_ptr, "type_size");
        let slot_size = b.add(b.i64(slot_header), type_size, "slot_size");
        let slots_base = b.struct_gep(self.block_struct, block, 5, "slots_base");
        let slot_addr = b.cast(CastKind::PtrToInt, slot_ptr, IrType::I64, "slot_addr");
        let base_addr = b.cast(CastKind::PtrToInt, slots_base, IrType::I64, "base_addr");
        let byte_offset = b.sub(slot_addr, base_addr, "byte_offset");
        let slot_index = b.udiv(byte_offset, slot_size, "slot_index");

        let first_free_ptr = b.struct_gep(self.block_struct, block, 4, "first_free_ptr");
        let first_free = b.load(IrType::I64, first_free_ptr, "first_free");
        let is_lower = b.icmp(Pred::Ult, slot_index, first_free, "is_lower");
        b.cond_br(is_lower, lower_first_free, merge);

        b.set_insert_point(lower_first_free);
        b.store(slot_index, first_free_ptr);
        b.br(merge);

        b.set_insert_point(merge);
        b.ret_void();
    }
}
