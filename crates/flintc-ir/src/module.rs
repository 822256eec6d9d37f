//! The IR module: struct types, globals, and functions.

use indexmap::IndexMap;

use crate::function::{Function, Linkage};
use crate::types::{IrType, Layout, StructDef, StructId};

/// Index of a function within a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncId(pub u32);

/// Index of a global within a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub enum GlobalInit {
    /// Constant bytes (C string constants, null terminator included).
    Bytes(Vec<u8>),
    /// A mutable pointer slot initialized to null (the DIMA head slots).
    NullPtr,
}

#[derive(Debug, Clone)]
pub struct GlobalDef {
    pub name: String,
    pub init: GlobalInit,
}

/// A whole translation unit's worth of IR.
#[derive(Debug, Default)]
pub struct Module {
    pub structs: Vec<StructDef>,
    struct_lookup: IndexMap<String, StructId>,
    pub globals: Vec<GlobalDef>,
    pub functions: Vec<Function>,
    func_lookup: IndexMap<String, FuncId>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layout(&self) -> Layout<'_> {
        Layout::new(&self.structs)
    }

    /// Register a named struct type. Registering the same name twice returns
    /// the existing id without redefining it.
    pub fn add_struct(
        &mut self,
        name: impl Into<String>,
        fields: Vec<IrType>,
        flexible_tail: Option<IrType>,
    ) -> StructId {
        let name = name.into();
        if let Some(&id) = self.struct_lookup.get(&name) {
            return id;
        }
        let id = StructId(self.structs.len() as u32);
        self.structs.push(StructDef {
            name: name.clone(),
            fields,
            flexible_tail,
        });
        self.struct_lookup.insert(name, id);
        id
    }

    pub fn struct_by_name(&self, name: &str) -> Option<StructId> {
        self.struct_lookup.get(name).copied()
    }

    pub fn struct_def(&self, id: StructId) -> &StructDef {
        &self.structs[id.0 as usize]
    }

    pub fn add_global(&mut self, name: impl Into<String>, init: GlobalInit) -> GlobalId {
        let id = GlobalId(self.globals.len() as u32);
        self.globals.push(GlobalDef {
            name: name.into(),
            init,
        });
        id
    }

    /// Declare a function (no body yet). Bodies are attached through
    /// [`crate::Builder`]. Declaring an existing name returns its id.
    pub fn declare_function(
        &mut self,
        name: impl Into<String>,
        params: Vec<(IrType, String)>,
        ret: IrType,
        linkage: Linkage,
    ) -> FuncId {
        let name = name.into();
        if let Some(&id) = self.func_lookup.get(&name) {
            return id;
        }
        let id = FuncId(self.functions.len() as u32);
        self.functions.push(Function {
            name: name.clone(),
            linkage,
            params,
            ret,
            insts: Vec::new(),
            blocks: Vec::new(),
        });
        self.func_lookup.insert(name, id);
        id
    }

    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id.0 as usize]
    }

    pub fn function_mut(&mut self, id: FuncId) -> &mut Function {
        &mut self.functions[id.0 as usize]
    }

    pub fn function_by_name(&self, name: &str) -> Option<FuncId> {
        self.func_lookup.get(name).copied()
    }
}
