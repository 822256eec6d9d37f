//! Layout tests against the documented runtime structure sizes.

use super::module::Module;
use super::types::IrType;

fn runtime_structs() -> Module {
    let mut module = Module::new();
    let slot = module.add_struct(
        "dima.type.slot",
        vec![IrType::Ptr, IrType::I32, IrType::I24, IrType::I8],
        Some(IrType::I8),
    );
    module.add_struct(
        "dima.type.block",
        vec![
            IrType::I64,
            IrType::I64,
            IrType::I64,
            IrType::I64,
            IrType::I64,
        ],
        Some(IrType::Struct(slot)),
    );
    module.add_struct(
        "dima.type.head",
        vec![IrType::Ptr, IrType::I64, IrType::I64],
        Some(IrType::Ptr),
    );
    module
}

#[test]
fn scalar_sizes() {
    let module = Module::new();
    let layout = module.layout();
    assert_eq!(layout.size_of(IrType::I1), 1);
    assert_eq!(layout.size_of(IrType::I8), 1);
    assert_eq!(layout.size_of(IrType::I24), 3);
    assert_eq!(layout.size_of(IrType::I32), 4);
    assert_eq!(layout.size_of(IrType::I64), 8);
    assert_eq!(layout.size_of(IrType::Ptr), 8);
}

#[test]
fn slot_header_is_sixteen_bytes() {
    let module = runtime_structs();
    let slot = module.struct_by_name("dima.type.slot").unwrap();
    let layout = module.layout();
    assert_eq!(layout.struct_size(slot), 16);
    assert_eq!(layout.field_offset(slot, 0), 0); // owner
    assert_eq!(layout.field_offset(slot, 1), 8); // block_id
    assert_eq!(layout.field_offset(slot, 2), 12); // arc
    assert_eq!(layout.field_offset(slot, 3), 15); // flags
    // The inline value starts right after the header.
    assert_eq!(layout.field_offset(slot, 4), 16);
}

#[test]
fn block_header_is_forty_bytes() {
    let module = runtime_structs();
    let block = module.struct_by_name("dima.type.block").unwrap();
    let layout = module.layout();
    assert_eq!(layout.struct_size(block), 40);
    assert_eq!(layout.field_offset(block, 4), 32); // first_free_slot_id
    assert_eq!(layout.field_offset(block, 5), 40); // slots[]
}

#[test]
fn head_header_is_twenty_four_bytes() {
    let module = runtime_structs();
    let head = module.struct_by_name("dima.type.head").unwrap();
    let layout = module.layout();
    assert_eq!(layout.struct_size(head), 24);
    assert_eq!(layout.field_offset(head, 3), 24); // blocks[]
}

#[test]
fn flexible_tail_type_is_addressable() {
    let module = runtime_structs();
    let head = module.struct_by_name("dima.type.head").unwrap();
    assert_eq!(module.layout().field_type(head, 3), IrType::Ptr);
}

#[test]
fn struct_size_rounds_to_alignment() {
    let mut module = Module::new();
    let id = module.add_struct("pair", vec![IrType::I64, IrType::I8], None);
    assert_eq!(module.layout().struct_size(id), 16);
}

#[test]
fn registering_same_struct_twice_returns_same_id() {
    let mut module = Module::new();
    let a = module.add_struct("s", vec![IrType::I32], None);
    let b = module.add_struct("s", vec![IrType::I32], None);
    assert_eq!(a, b);
    assert_eq!(module.structs.len(), 1);
}
