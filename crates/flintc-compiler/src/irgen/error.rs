//! Error stringification synthesis.
//!
//! Three functions with stable names: type-id to set name, (type, value) to
//! value name (recursing through inherited sets), and the combined
//! `<type>.<value>` heap string.

use flintc_ir::{Builder, CFunc, FuncId, IrType, Linkage, Module, Pred, Value};

use crate::ast::ErrorNode;

use super::{GenError, Generator};

impl Generator<'_> {
    /// `__flint_create_str(len) -> str*`: heap string with its length set
    /// and the terminator byte in place; content is the caller's job.
    pub(crate) fn generate_create_str_function(&mut self, module: &mut Module) {
        let func = module.declare_function(
            "__flint_create_str",
            vec![(IrType::I64, "len".into())],
            IrType::Ptr,
            Linkage::External,
        );
        self.create_str_fn = Some(func);

        let header_size = module.layout().struct_size(self.str_struct);

        let mut b = Builder::new(module, func);
        let entry = b.create_block("entry");
        b.set_insert_point(entry);
        let len = Value::Arg(0);
        let with_header = b.add(b.i64(header_size), len, "with_header");
        let total = b.add(with_header, b.i64(1), "total_size");
        let str_ptr = b.call_c(CFunc::Malloc, vec![total], "str_ptr");
        let len_ptr = b.struct_gep(self.str_struct, str_ptr, 0, "len_ptr");
        b.store(len, len_ptr);
        let bytes_ptr = b.struct_gep(self.str_struct, str_ptr, 1, "bytes_ptr");
        let term_ptr = b.gep(IrType::I8, bytes_ptr, len, "term_ptr");
        b.store(b.i8(0), term_ptr);
        b.ret(str_ptr);
    }

    pub(crate) fn generate_error_functions(&mut self, module: &mut Module) -> Result<(), GenError> {
        self.generate_get_err_type_str(module);
        self.generate_get_err_val_str(module);
        self.generate_get_err_str(module);
        Ok(())
    }

    fn generate_get_err_type_str(&mut self, module: &mut Module) {
        let func = module.declare_function(
            "__flint_get_err_type_str",
            vec![(IrType::I32, "err_type".into())],
            IrType::Ptr,
            Linkage::External,
        );
        self.error_fns.insert("get_err_type_str", func);

        let errors: Vec<ErrorNode> = self
            .resolver
            .get_all_errors()
            .into_iter()
            .cloned()
            .collect();

        let mut b = Builder::new(module, func);
        let entry = b.create_block("entry");
        let default_block = b.create_block("default");
        let zero_block = b.create_block("zero_case");

        let mut cases = vec![(0u64, zero_block)];
        let mut case_blocks = Vec::new();
        for error in &errors {
            let block = b.create_block(format!("case_{}", error.name));
            cases.push((error.error_id as u64, block));
            case_blocks.push((block, error.name.clone()));
        }

        b.set_insert_point(entry);
        b.switch(Value::Arg(0), default_block, cases);

        // Id 0 is the anonymous `error` type.
        b.set_insert_point(zero_block);
        let anon = b.const_string("error");
        b.ret(anon);

        for (block, name) in case_blocks {
            b.set_insert_point(block);
            let type_str = b.const_string(&name);
            b.ret(type_str);
        }

        b.set_insert_point(default_block);
        let message = b.const_string("Unknown error type hash: %u\n");
        b.call_c(CFunc::Printf, vec![message, Value::Arg(0)], "");
        b.call_c(CFunc::Abort, vec![], "");
        b.unreachable();
    }

    fn generate_get_err_val_str(&mut self, module: &mut Module) {
        let func = module.declare_function(
            "__flint_get_err_val_str",
            vec![(IrType::I32, "err_type".into()), (IrType::I32, "err_val".into())],
            IrType::Ptr,
            Linkage::External,
        );
        self.error_fns.insert("get_err_val_str", func);

        let errors: Vec<ErrorNode> = self
            .resolver
            .get_all_errors()
            .into_iter()
            .cloned()
            .collect();
        let parent_counts: Vec<Option<(u32, u32)>> = errors
            .iter()
            .map(|e| {
                e.parent
                    .as_deref()
                    .map(|p| (self.resolver.errors[p].error_id, self.resolver.value_count(p)))
            })
            .collect();

        let arg_err_type = Value::Arg(0);
        let arg_err_val = Value::Arg(1);

        let mut b = Builder::new(module, func);
        let entry = b.create_block("entry");
        let default_block = b.create_block("default");
        let zero_block = b.create_block("zero_case");

        let mut cases = vec![(0u64, zero_block)];
        let mut case_blocks = Vec::new();
        for error in &errors {
            let block = b.create_block(format!("case_{}", error.name));
            cases.push((error.error_id as u64, block));
            case_blocks.push(block);
        }

        b.set_insert_point(entry);
        b.switch(arg_err_type, default_block, cases);

        b.set_insert_point(zero_block);
        let anon = b.const_string("anyerror");
        b.ret(anon);

        for ((block, error), parent) in case_blocks.iter().zip(&errors).zip(&parent_counts) {
            b.set_insert_point(*block);

            // Inherited sets: a value id below the parent's count belongs to
            // the parent; otherwise normalize into this set's own values.
            let normalized_err_val = if let Some((parent_id, parent_count)) = parent {
                let parent_count_val = b.i32(*parent_count);
                let is_parent_err =
                    b.icmp(Pred::Ult, arg_err_val, parent_count_val, "is_parent_err");
                let is_parent_block =
                    b.create_block(format!("case_{}_is_parent_error", error.name));
                let is_this_block = b.create_block(format!("case_{}_is_this_error", error.name));
                b.cond_br(is_parent_err, is_parent_block, is_this_block);

                b.set_insert_point(is_parent_block);
                let parent_id_val = b.i32(*parent_id);
                let value_from_parent = b.call(
                    func,
                    vec![parent_id_val, arg_err_val],
                    "value_from_parent",
                );
                b.ret(value_from_parent);

                b.set_insert_point(is_this_block);
                b.sub(arg_err_val, parent_count_val, "normalized_err_val")
            } else {
                arg_err_val
            };

            let default_value_block = b.create_block(format!("case_{}_default", error.name));
            let mut value_cases = Vec::new();
            let mut value_blocks = Vec::new();
            for (i, value) in error.values.iter().enumerate() {
                let value_block = b.create_block(format!("case_{}_case_{}", error.name, i));
                value_cases.push((i as u64, value_block));
                value_blocks.push((value_block, value.clone()));
            }
            b.switch(normalized_err_val, default_value_block, value_cases);

            for (value_block, value) in value_blocks {
                b.set_insert_point(value_block);
                let value_str = b.const_string(&value);
                b.ret(value_str);
            }

            b.set_insert_point(default_value_block);
            let message = b.const_string("Unknown error value '%u' on error id '%u'\n");
            b.call_c(CFunc::Printf, vec![message, arg_err_val, arg_err_type], "");
            b.call_c(CFunc::Abort, vec![], "");
            b.unreachable();
        }

        b.set_insert_point(default_block);
        let message = b.const_string("Unknown error type hash: %u\n");
        b.call_c(CFunc::Printf, vec![message, arg_err_type], "");
        b.call_c(CFunc::Abort, vec![], "");
        b.unreachable();
    }

    /// `__flint_get_err_str(err) -> str*`: `<type>.<value>` concatenated
    /// into a fresh heap string.
    fn generate_get_err_str(&mut self, module: &mut Module) {
        let func = module.declare_function(
            "__flint_get_err_str",
            vec![(IrType::Struct(self.err_struct), "err".into())],
            IrType::Ptr,
            Linkage::External,
        );
        self.error_fns.insert("get_err_str", func);

        let get_err_type_str: FuncId = self.error_fns["get_err_type_str"];
        let get_err_val_str: FuncId = self.error_fns["get_err_val_str"];
        let create_str = self.create_str_fn.expect("create_str generated first");

        let mut b = Builder::new(module, func);
        let entry = b.create_block("entry");
        b.set_insert_point(entry);

        let err = Value::Arg(0);
        let err_type_id = b.extract_value(err, self.err_struct, 0, "err_type_id");
        let err_value_id = b.extract_value(err, self.err_struct, 1, "err_value_id");
        let err_type_str = b.call(get_err_type_str, vec![err_type_id], "err_type_str");
        let err_val_str = b.call(
            get_err_val_str,
            vec![err_type_id, err_value_id],
            "err_val_str",
        );
        let type_len = b.call_c(CFunc::Strlen, vec![err_type_str], "err_type_str_len");
        let val_len = b.call_c(CFunc::Strlen, vec![err_val_str], "err_val_str_len");
        // `<type>.<value>`: one extra byte for the separating dot.
        let both = b.add(type_len, val_len, "both_len");
        let total = b.add(both, b.i64(1), "err_str_len");
        let err_str = b.call(create_str, vec![total], "err_str");
        let bytes_ptr = b.struct_gep(self.str_struct, err_str, 1, "err_str_type_ptr");
        b.call_c(CFunc::Memcpy, vec![bytes_ptr, err_type_str, type_len], "");
        let dot_ptr = b.gep(IrType::I8, bytes_ptr, type_len, "dot_ptr");
        b.store(b.i8(b'.'), dot_ptr);
        let val_ptr = b.gep(IrType::I8, dot_ptr, b.i64(1), "err_str_val_ptr");
        b.call_c(CFunc::Memcpy, vec![val_ptr, err_val_str, val_len], "");
        b.ret(err_str);
    }
}
