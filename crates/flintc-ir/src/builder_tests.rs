//! Builder behavior tests.

use super::builder::Builder;
use super::function::{Inst, Linkage, Pred, Value};
use super::module::Module;
use super::types::IrType;

#[test]
fn builds_a_two_block_function() {
    let mut module = Module::new();
    let id = module.declare_function("f", vec![], IrType::I32, Linkage::External);

    let mut b = Builder::new(&mut module, id);
    let entry = b.create_block("entry");
    let exit = b.create_block("exit");
    b.set_insert_point(entry);
    let x = b.alloca(IrType::I32, "x");
    b.store(b.i32(7), x);
    b.br(exit);
    b.set_insert_point(exit);
    let v = b.load(IrType::I32, x, "v");
    b.ret(v);

    let f = module.function(id);
    assert_eq!(f.blocks.len(), 2);
    assert_eq!(f.blocks[0].insts.len(), 3);
    assert_eq!(f.blocks[1].insts.len(), 2);
    assert!(f.inst(*f.blocks[0].insts.last().unwrap()).is_terminator());
}

#[test]
fn block_terminated_tracks_terminators() {
    let mut module = Module::new();
    let id = module.declare_function("f", vec![], IrType::Void, Linkage::Internal);
    let mut b = Builder::new(&mut module, id);
    let entry = b.create_block("entry");
    b.set_insert_point(entry);
    assert!(!b.block_terminated(entry));
    b.ret_void();
    assert!(b.block_terminated(entry));
}

#[test]
fn load_and_store_record_alignment() {
    let mut module = Module::new();
    let id = module.declare_function("f", vec![], IrType::Void, Linkage::Internal);
    let mut b = Builder::new(&mut module, id);
    let entry = b.create_block("entry");
    b.set_insert_point(entry);
    let p = b.alloca(IrType::I64, "p");
    let v = b.load(IrType::I64, p, "v");
    b.store(v, p);
    b.ret_void();

    let f = module.function(id);
    match f.inst(super::function::InstId(1)) {
        Inst::Load { align, .. } => assert_eq!(*align, 8),
        other => panic!("expected load, got {other:?}"),
    }
    match f.inst(super::function::InstId(2)) {
        Inst::Store { align, .. } => assert_eq!(*align, 8),
        other => panic!("expected store, got {other:?}"),
    }
}

#[test]
fn const_strings_are_interned() {
    let mut module = Module::new();
    let id = module.declare_function("f", vec![], IrType::Void, Linkage::Internal);
    let mut b = Builder::new(&mut module, id);
    let entry = b.create_block("entry");
    b.set_insert_point(entry);
    let a = b.const_string("error");
    let c = b.const_string("error");
    let d = b.const_string("other");
    b.ret_void();

    assert_eq!(a, c);
    assert_ne!(a, d);
    assert_eq!(module.globals.len(), 2);
}

#[test]
fn weighted_branch_carries_weights() {
    let mut module = Module::new();
    let id = module.declare_function("f", vec![], IrType::Void, Linkage::Internal);
    let mut b = Builder::new(&mut module, id);
    let entry = b.create_block("entry");
    let cold = b.create_block("cold");
    let hot = b.create_block("hot");
    b.set_insert_point(entry);
    let cond = b.icmp(Pred::Eq, b.i64(0), b.i64(1), "cond");
    b.cond_br_weighted(cond, cold, hot, (1, 100));
    b.set_insert_point(cold);
    b.ret_void();
    b.set_insert_point(hot);
    b.ret_void();

    let f = module.function(id);
    let term = f.inst(*f.blocks[0].insts.last().unwrap());
    match term {
        Inst::CondBr { weights, .. } => assert_eq!(*weights, Some((1, 100))),
        other => panic!("expected cond br, got {other:?}"),
    }
}

#[test]
fn value_types_resolve_through_instructions() {
    let mut module = Module::new();
    let id = module.declare_function(
        "f",
        vec![(IrType::I32, "x".into())],
        IrType::I32,
        Linkage::External,
    );
    let mut b = Builder::new(&mut module, id);
    let entry = b.create_block("entry");
    b.set_insert_point(entry);
    let sum = b.add(Value::Arg(0), b.i32(1), "sum");
    b.ret(sum);

    let f = module.function(id);
    assert_eq!(f.value_type(&module, sum), IrType::I32);
    assert_eq!(f.value_type(&module, Value::Arg(0)), IrType::I32);
    assert_eq!(f.value_type(&module, Value::NullPtr), IrType::Ptr);
}
