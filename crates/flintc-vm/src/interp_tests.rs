//! Interpreter tests over hand-built modules.

use flintc_ir::{Builder, CFunc, IrType, Linkage, Module, Pred, Value};

use super::interp::{Vm, VmValue};
use super::error::Trap;

fn run(module: &Module, name: &str, args: &[VmValue]) -> Result<VmValue, Trap> {
    Vm::new(module).call(name, args)
}

#[test]
fn arithmetic_and_return() {
    let mut module = Module::new();
    let id = module.declare_function("f", vec![], IrType::I32, Linkage::External);
    let mut b = Builder::new(&mut module, id);
    let entry = b.create_block("entry");
    b.set_insert_point(entry);
    let sum = b.add(b.i32(41), b.i32(1), "sum");
    b.ret(sum);

    assert_eq!(run(&module, "f", &[]).unwrap(), VmValue::Int(42));
}

#[test]
fn load_store_roundtrip() {
    let mut module = Module::new();
    let id = module.declare_function("f", vec![], IrType::I64, Linkage::External);
    let mut b = Builder::new(&mut module, id);
    let entry = b.create_block("entry");
    b.set_insert_point(entry);
    let slot = b.alloca(IrType::I64, "slot");
    b.store(b.i64(0xABCD), slot);
    let v = b.load(IrType::I64, slot, "v");
    b.ret(v);

    assert_eq!(run(&module, "f", &[]).unwrap(), VmValue::Int(0xABCD));
}

#[test]
fn conditional_branch_and_phi() {
    // Returns 1 when the argument is negative, else 2, via a merge phi.
    let mut module = Module::new();
    let id = module.declare_function(
        "sign",
        vec![(IrType::I32, "x".into())],
        IrType::I32,
        Linkage::External,
    );
    let mut b = Builder::new(&mut module, id);
    let entry = b.create_block("entry");
    let negative = b.create_block("negative");
    let other = b.create_block("other");
    let merge = b.create_block("merge");
    b.set_insert_point(entry);
    let is_neg = b.icmp(Pred::Slt, Value::Arg(0), b.i32(0), "is_neg");
    b.cond_br(is_neg, negative, other);
    b.set_insert_point(negative);
    b.br(merge);
    b.set_insert_point(other);
    b.br(merge);
    b.set_insert_point(merge);
    let phi = b.phi(
        IrType::I32,
        vec![(negative, b.i32(1)), (other, b.i32(2))],
        "result",
    );
    b.ret(phi);

    let neg = run(&module, "sign", &[VmValue::Int(0xFFFF_FFFF)]).unwrap();
    assert_eq!(neg, VmValue::Int(1));
    let pos = run(&module, "sign", &[VmValue::Int(5)]).unwrap();
    assert_eq!(pos, VmValue::Int(2));
}

#[test]
fn struct_store_load_and_extract() {
    let mut module = Module::new();
    let pair = module.add_struct("pair", vec![IrType::I32, IrType::I32], None);
    let id = module.declare_function("f", vec![], IrType::I32, Linkage::External);
    let mut b = Builder::new(&mut module, id);
    let entry = b.create_block("entry");
    b.set_insert_point(entry);
    let slot = b.alloca(IrType::Struct(pair), "slot");
    let first = b.struct_gep(pair, slot, 0, "first");
    b.store(b.i32(7), first);
    let second = b.struct_gep(pair, slot, 1, "second");
    b.store(b.i32(35), second);
    let whole = b.load(IrType::Struct(pair), slot, "whole");
    let a = b.extract_value(whole, pair, 0, "a");
    let c = b.extract_value(whole, pair, 1, "c");
    let sum = b.add(a, c, "sum");
    b.ret(sum);

    assert_eq!(run(&module, "f", &[]).unwrap(), VmValue::Int(42));
}

#[test]
fn internal_calls_pass_values() {
    let mut module = Module::new();
    let callee = module.declare_function(
        "double",
        vec![(IrType::I64, "x".into())],
        IrType::I64,
        Linkage::Internal,
    );
    let mut b = Builder::new(&mut module, callee);
    let entry = b.create_block("entry");
    b.set_insert_point(entry);
    let doubled = b.mul(Value::Arg(0), b.i64(2), "doubled");
    b.ret(doubled);

    let caller = module.declare_function("f", vec![], IrType::I64, Linkage::External);
    let mut b = Builder::new(&mut module, caller);
    let entry = b.create_block("entry");
    b.set_insert_point(entry);
    let result = b.call(callee, vec![b.i64(21)], "result");
    b.ret(result);

    assert_eq!(run(&module, "f", &[]).unwrap(), VmValue::Int(42));
}

#[test]
fn printf_and_abort_trap() {
    let mut module = Module::new();
    let id = module.declare_function("f", vec![], IrType::Void, Linkage::External);
    let mut b = Builder::new(&mut module, id);
    let entry = b.create_block("entry");
    b.set_insert_point(entry);
    let message = b.const_string("bad id: %u\n");
    b.call_c(CFunc::Printf, vec![message, b.i32(7)], "");
    b.call_c(CFunc::Abort, vec![], "");
    b.unreachable();

    match run(&module, "f", &[]) {
        Err(Trap::Abort { output }) => assert_eq!(output, "bad id: 7\n"),
        other => panic!("expected abort, got {other:?}"),
    }
}

#[test]
fn loops_consume_fuel_but_terminate() {
    // Sum 0..10 with a while-style loop.
    let mut module = Module::new();
    let id = module.declare_function("f", vec![], IrType::I64, Linkage::External);
    let mut b = Builder::new(&mut module, id);
    let entry = b.create_block("entry");
    let cond = b.create_block("cond");
    let body = b.create_block("body");
    let merge = b.create_block("merge");
    b.set_insert_point(entry);
    let i = b.alloca(IrType::I64, "i");
    b.store(b.i64(0), i);
    let acc = b.alloca(IrType::I64, "acc");
    b.store(b.i64(0), acc);
    b.br(cond);
    b.set_insert_point(cond);
    let iv = b.load(IrType::I64, i, "iv");
    let in_range = b.icmp(Pred::Ult, iv, b.i64(10), "in_range");
    b.cond_br(in_range, body, merge);
    b.set_insert_point(body);
    let a = b.load(IrType::I64, acc, "a");
    let a2 = b.add(a, iv, "a2");
    b.store(a2, acc);
    let i2 = b.add(iv, b.i64(1), "i2");
    b.store(i2, i);
    b.br(cond);
    b.set_insert_point(merge);
    let result = b.load(IrType::I64, acc, "result");
    b.ret(result);

    assert_eq!(run(&module, "f", &[]).unwrap(), VmValue::Int(45));
}

#[test]
fn out_of_fuel_traps() {
    let mut module = Module::new();
    let id = module.declare_function("spin", vec![], IrType::Void, Linkage::External);
    let mut b = Builder::new(&mut module, id);
    let entry = b.create_block("entry");
    let spin = b.create_block("spin");
    b.set_insert_point(entry);
    b.br(spin);
    b.set_insert_point(spin);
    b.br(spin);

    let mut vm = Vm::new(&module).with_fuel(1_000);
    assert_eq!(vm.call("spin", &[]), Err(Trap::OutOfFuel));
}

#[test]
fn gep_walks_element_arrays() {
    let mut module = Module::new();
    let id = module.declare_function("f", vec![], IrType::I64, Linkage::External);
    let mut b = Builder::new(&mut module, id);
    let entry = b.create_block("entry");
    b.set_insert_point(entry);
    let base = b.call_c(CFunc::Malloc, vec![b.i64(64)], "base");
    let third = b.gep(IrType::I64, base, b.i64(3), "third");
    b.store(b.i64(99), third);
    let reread = b.gep(IrType::I64, base, b.i64(3), "reread");
    let v = b.load(IrType::I64, reread, "v");
    b.ret(v);

    assert_eq!(run(&module, "f", &[]).unwrap(), VmValue::Int(99));
}
