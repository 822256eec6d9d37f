//! Allocator behavior tests, executed on the reference interpreter.

use flintc_core::type_id;
use flintc_ir::Module;
use flintc_vm::{Trap, Vm, VmValue};
use indoc::indoc;

fn compile(source: &str) -> Module {
    crate::compile("test.ft", source).expect("compiles")
}

const SLOT_HEADER: u64 = 16;
const ARC_OFFSET: u64 = 12;
const FLAGS_OFFSET: u64 = 15;
const OCCUPIED: u64 = 1;

fn vm_with_heads(module: &Module) -> Vm<'_> {
    let mut vm = Vm::new(module);
    vm.call("__flint_dima_init_heads", &[]).expect("heads init");
    vm
}

fn allocate(vm: &mut Vm<'_>, id: u32) -> u64 {
    vm.call("__flint_dima_allocate_slot", &[VmValue::Int(id as u64)])
        .expect("allocates")
        .as_int()
        .unwrap()
}

fn release(vm: &mut Vm<'_>, head_ref: u64, ptr: u64, id: u32) {
    vm.call(
        "__flint_dima_release",
        &[
            VmValue::Int(head_ref),
            VmValue::Int(ptr),
            VmValue::Int(id as u64),
        ],
    )
    .expect("releases");
}

fn head_ref(vm: &mut Vm<'_>, id: u32) -> u64 {
    vm.call("__flint_dima_get_head", &[VmValue::Int(id as u64)])
        .expect("head exists")
        .as_int()
        .unwrap()
}

#[test]
fn allocation_marks_the_slot_occupied_with_arc_one() {
    let module = compile(indoc! {"
        data D:
            int a;
    "});
    let mut vm = vm_with_heads(&module);
    let ptr = allocate(&mut vm, type_id("D"));

    assert!(vm.memory.is_live(ptr));
    let slot = ptr - SLOT_HEADER;
    assert_eq!(vm.memory.read_uint(slot + ARC_OFFSET, 3).unwrap(), 1);
    assert_eq!(
        vm.memory.read_uint(slot + FLAGS_OFFSET, 1).unwrap(),
        OCCUPIED
    );
}

#[test]
fn allocations_use_distinct_slots_and_count_used() {
    let module = compile(indoc! {"
        data D:
            int a;
    "});
    let mut vm = vm_with_heads(&module);
    let id = type_id("D");
    let first = allocate(&mut vm, id);
    let second = allocate(&mut vm, id);
    assert_ne!(first, second);

    // head slot -> head -> blocks[0] -> used
    let head_slot = head_ref(&mut vm, id);
    let head = vm.memory.read_uint(head_slot, 8).unwrap();
    let block = vm.memory.read_uint(head + 24, 8).unwrap();
    assert_eq!(vm.memory.read_uint(block + 16, 8).unwrap(), 2);
}

#[test]
fn allocation_seeds_the_default_value() {
    let module = compile(indoc! {"
        data D:
            int a = 5;
            int b;
    "});
    let mut vm = vm_with_heads(&module);
    let ptr = allocate(&mut vm, type_id("D"));
    assert_eq!(vm.memory.read_uint(ptr, 4).unwrap(), 5);
    assert_eq!(vm.memory.read_uint(ptr + 4, 4).unwrap(), 0);
}

#[test]
fn release_to_zero_clears_the_slot() {
    let module = compile(indoc! {"
        data D:
            int a;
    "});
    let mut vm = vm_with_heads(&module);
    let id = type_id("D");
    let ptr = allocate(&mut vm, id);
    let href = head_ref(&mut vm, id);

    let head = vm.memory.read_uint(href, 8).unwrap();
    let block = vm.memory.read_uint(head + 24, 8).unwrap();
    assert_eq!(vm.memory.read_uint(block + 16, 8).unwrap(), 1);

    release(&mut vm, href, ptr, id);
    let slot = ptr - SLOT_HEADER;
    assert_eq!(vm.memory.read_uint(slot + FLAGS_OFFSET, 1).unwrap(), 0);
    assert_eq!(vm.memory.read_uint(block + 16, 8).unwrap(), 0);
}

#[test]
fn freed_slots_are_reused_lowest_first() {
    let module = compile(indoc! {"
        data D:
            int a;
    "});
    let mut vm = vm_with_heads(&module);
    let id = type_id("D");
    let first = allocate(&mut vm, id);
    let second = allocate(&mut vm, id);
    let href = head_ref(&mut vm, id);

    release(&mut vm, href, first, id);
    release(&mut vm, href, second, id);

    let third = allocate(&mut vm, id);
    assert_eq!(third, first);
}

#[test]
fn capacity_schedule_follows_the_integer_recurrence() {
    let module = compile(indoc! {"
        data D:
            int a;
    "});
    let mut vm = Vm::new(&module);
    let cap = |vm: &mut Vm<'_>, i: u64| {
        vm.call("__flint_get_block_capacity", &[VmValue::Int(i)])
            .unwrap()
            .as_int()
            .unwrap()
    };
    let base = cap(&mut vm, 0);
    assert_eq!(base, crate::GeneratorConfig::default().base_capacity);
    let gf = crate::GeneratorConfig::default().growth_factor;
    let mut expected = base;
    for i in 1..6 {
        expected = (expected * gf + 9) / 10;
        assert_eq!(cap(&mut vm, i), expected, "capacity({i})");
    }
}

#[test]
fn allocation_grows_past_the_first_block() {
    let module = compile(indoc! {"
        data D:
            int a;
    "});
    let mut vm = vm_with_heads(&module);
    let id = type_id("D");
    let base = crate::GeneratorConfig::default().base_capacity;

    let mut pointers = Vec::new();
    for _ in 0..(base + 3) {
        pointers.push(allocate(&mut vm, id));
    }
    pointers.sort_unstable();
    pointers.dedup();
    assert_eq!(pointers.len(), (base + 3) as usize);

    let head_slot = head_ref(&mut vm, id);
    let head = vm.memory.read_uint(head_slot, 8).unwrap();
    let block_count = vm.memory.read_uint(head + 16, 8).unwrap();
    assert_eq!(block_count, 2);
}

#[test]
fn unknown_type_id_aborts() {
    let module = compile(indoc! {"
        data D:
            int a;
    "});
    let mut vm = vm_with_heads(&module);
    match vm.call("__flint_dima_allocate_slot", &[VmValue::Int(0xBAD)]) {
        Err(Trap::Abort { output }) => assert!(output.contains("Unknown type ID")),
        other => panic!("expected abort, got {other:?}"),
    }
}

#[test]
fn allocation_is_deterministic() {
    let source = indoc! {"
        data D:
            int a;
    "};
    let module = compile(source);
    let id = type_id("D");
    let mut first_run = Vec::new();
    let mut second_run = Vec::new();
    for run in [&mut first_run, &mut second_run] {
        let mut vm = vm_with_heads(&module);
        for _ in 0..5 {
            run.push(allocate(&mut vm, id));
        }
    }
    assert_eq!(first_run, second_run);
}
