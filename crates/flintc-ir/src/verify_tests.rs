//! Verifier tests.

use super::builder::Builder;
use super::function::{BlockData, Inst, InstData, InstId, Linkage};
use super::module::Module;
use super::types::IrType;
use super::verify::{VerifyError, verify_module};

#[test]
fn well_formed_module_passes() {
    let mut module = Module::new();
    let id = module.declare_function("f", vec![], IrType::I32, Linkage::External);
    let mut b = Builder::new(&mut module, id);
    let entry = b.create_block("entry");
    b.set_insert_point(entry);
    b.ret(b.i32(0));
    assert_eq!(verify_module(&module), Ok(()));
}

#[test]
fn declarations_are_skipped() {
    let mut module = Module::new();
    module.declare_function("malloc_like", vec![], IrType::Ptr, Linkage::External);
    assert_eq!(verify_module(&module), Ok(()));
}

#[test]
fn missing_terminator_is_reported() {
    let mut module = Module::new();
    let id = module.declare_function("f", vec![], IrType::Void, Linkage::Internal);
    let f = module.function_mut(id);
    f.insts.push(InstData {
        inst: Inst::Alloca { ty: IrType::I32 },
        name: "x".into(),
    });
    f.blocks.push(BlockData {
        name: "entry".into(),
        insts: vec![InstId(0)],
    });
    assert!(matches!(
        verify_module(&module),
        Err(VerifyError::MissingTerminator { .. })
    ));
}

#[test]
fn early_terminator_is_reported() {
    let mut module = Module::new();
    let id = module.declare_function("f", vec![], IrType::Void, Linkage::Internal);
    let f = module.function_mut(id);
    f.insts.push(InstData {
        inst: Inst::Ret { value: None },
        name: String::new(),
    });
    f.insts.push(InstData {
        inst: Inst::Ret { value: None },
        name: String::new(),
    });
    f.blocks.push(BlockData {
        name: "entry".into(),
        insts: vec![InstId(0), InstId(1)],
    });
    assert!(matches!(
        verify_module(&module),
        Err(VerifyError::EarlyTerminator { .. })
    ));
}

#[test]
fn branch_to_missing_block_is_reported() {
    let mut module = Module::new();
    let id = module.declare_function("f", vec![], IrType::Void, Linkage::Internal);
    let f = module.function_mut(id);
    f.insts.push(InstData {
        inst: Inst::Br {
            target: super::function::BlockId(7),
        },
        name: String::new(),
    });
    f.blocks.push(BlockData {
        name: "entry".into(),
        insts: vec![InstId(0)],
    });
    assert!(matches!(
        verify_module(&module),
        Err(VerifyError::BadBlockRef { index: 7, .. })
    ));
}

#[test]
fn empty_block_is_reported() {
    let mut module = Module::new();
    let id = module.declare_function("f", vec![], IrType::Void, Linkage::Internal);
    module.function_mut(id).blocks.push(BlockData {
        name: "entry".into(),
        insts: vec![],
    });
    assert!(matches!(
        verify_module(&module),
        Err(VerifyError::EmptyBlock { .. })
    ));
}
