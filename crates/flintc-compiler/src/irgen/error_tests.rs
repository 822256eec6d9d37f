//! Error stringification tests, executed on the reference interpreter.

use flintc_core::type_id;
use flintc_ir::Module;
use flintc_vm::{Trap, Vm, VmValue};
use indoc::indoc;

const SETS: &str = indoc! {"
    error E:
        Foo, Bar;
    error F(E):
        Baz;
"};

fn compile(source: &str) -> Module {
    crate::compile("test.ft", source).expect("compiles")
}

fn c_string(vm: &Vm<'_>, address: u64) -> String {
    vm.memory.read_c_string(address).expect("valid string")
}

fn err_type_str(vm: &mut Vm<'_>, id: u32) -> String {
    let address = vm
        .call("__flint_get_err_type_str", &[VmValue::Int(id as u64)])
        .expect("returns a string")
        .as_int()
        .unwrap();
    c_string(vm, address)
}

fn err_val_str(vm: &mut Vm<'_>, id: u32, value: u32) -> String {
    let address = vm
        .call(
            "__flint_get_err_val_str",
            &[VmValue::Int(id as u64), VmValue::Int(value as u64)],
        )
        .expect("returns a string")
        .as_int()
        .unwrap();
    c_string(vm, address)
}

#[test]
fn type_names_round_trip() {
    let module = compile(SETS);
    let mut vm = Vm::new(&module);
    assert_eq!(err_type_str(&mut vm, type_id("E")), "E");
    assert_eq!(err_type_str(&mut vm, type_id("F")), "F");
    // Id 0 is the anonymous error type.
    assert_eq!(err_type_str(&mut vm, 0), "error");
}

#[test]
fn own_values_resolve_directly() {
    let module = compile(SETS);
    let mut vm = Vm::new(&module);
    assert_eq!(err_val_str(&mut vm, type_id("E"), 0), "Foo");
    assert_eq!(err_val_str(&mut vm, type_id("E"), 1), "Bar");
}

#[test]
fn inherited_values_recurse_into_the_parent() {
    let module = compile(SETS);
    let mut vm = Vm::new(&module);
    // F inherits E's two values as a prefix.
    assert_eq!(err_val_str(&mut vm, type_id("F"), 0), "Foo");
    assert_eq!(err_val_str(&mut vm, type_id("F"), 1), "Bar");
    // Own values continue at the normalized index.
    assert_eq!(err_val_str(&mut vm, type_id("F"), 2), "Baz");
}

#[test]
fn every_declared_value_stringifies() {
    let module = compile(SETS);
    let mut vm = Vm::new(&module);
    let declared = ["Foo", "Bar", "Baz"];
    for v in 0..3u32 {
        let s = err_val_str(&mut vm, type_id("F"), v);
        assert!(declared.contains(&s.as_str()), "unexpected value '{s}'");
    }
}

#[test]
fn out_of_range_value_aborts() {
    let module = compile(SETS);
    let mut vm = Vm::new(&module);
    match vm.call(
        "__flint_get_err_val_str",
        &[VmValue::Int(type_id("E") as u64), VmValue::Int(9)],
    ) {
        Err(Trap::Abort { output }) => {
            assert!(output.contains("Unknown error value"));
        }
        other => panic!("expected abort, got {other:?}"),
    }
}

#[test]
fn unknown_type_id_aborts() {
    let module = compile(SETS);
    let mut vm = Vm::new(&module);
    match vm.call("__flint_get_err_type_str", &[VmValue::Int(12345)]) {
        Err(Trap::Abort { output }) => {
            assert!(output.contains("Unknown error type hash"));
        }
        other => panic!("expected abort, got {other:?}"),
    }
}

#[test]
fn err_str_concatenates_type_dot_value() {
    let module = compile(SETS);
    let mut vm = Vm::new(&module);

    // err struct: { i32 type_id, i32 value_id, ptr message }
    let mut bytes = vec![0u8; 16];
    bytes[0..4].copy_from_slice(&type_id("F").to_le_bytes());
    bytes[4..8].copy_from_slice(&2u32.to_le_bytes());
    let address = vm
        .call("__flint_get_err_str", &[VmValue::Struct(bytes)])
        .expect("returns a str")
        .as_int()
        .unwrap();

    let len = vm.memory.read_uint(address, 8).unwrap();
    assert_eq!(len, 5);
    let content = vm.memory.read(address + 8, len).unwrap().to_vec();
    assert_eq!(content, b"F.Baz");
    // Null-terminated like every runtime string.
    assert_eq!(vm.memory.read(address + 8 + len, 1).unwrap()[0], 0);
}
