//! Top-level definition nodes.

use serde::Serialize;

use flintc_core::type_id;

use super::scope::ScopeId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ImportPath {
    /// `use "path/to/file.ft"`
    File(String),
    /// `use flint.io` / `use my.module`
    Modules(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportNode {
    pub path: ImportPath,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionNode {
    pub is_aligned: bool,
    pub is_const: bool,
    pub name: String,
    /// `(type, name)` pairs in declaration order.
    pub parameters: Vec<(String, String)>,
    pub return_types: Vec<String>,
    pub scope: ScopeId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataNode {
    pub is_shared: bool,
    pub is_immutable: bool,
    pub is_aligned: bool,
    pub name: String,
    /// `(type, name)` pairs in declaration order.
    pub fields: Vec<(String, String)>,
    /// `(field name, literal lexeme)` pairs.
    pub default_values: Vec<(String, String)>,
    /// Positional constructor order fixed by `Name(field, ...)`.
    pub constructor_order: Vec<String>,
    /// Hash of the defining file, namespacing the DIMA head.
    pub file_hash: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuncNode {
    pub name: String,
    /// `(data type, binding name)` pairs from the requires list.
    pub required_data: Vec<(String, String)>,
    pub functions: Vec<FunctionNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkNode {
    pub from: Vec<String>,
    pub to: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityNode {
    pub name: String,
    pub data_modules: Vec<String>,
    pub func_modules: Vec<String>,
    pub links: Vec<LinkNode>,
    pub parent_entities: Vec<(String, String)>,
    pub constructor_order: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumNode {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantNode {
    pub name: String,
    pub possible_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorNode {
    pub name: String,
    /// Single parent error set, inherited as a value prefix.
    pub parent: Option<String>,
    pub values: Vec<String>,
    /// Stable id; hash of the set name.
    pub error_id: u32,
}

impl ErrorNode {
    pub fn new(name: String, parent: Option<String>, values: Vec<String>) -> Self {
        let error_id = type_id(&name);
        Self {
            name,
            parent,
            values,
            error_id,
        }
    }

    /// Own values only; inherited values are counted by the resolver, which
    /// can see the parent chain.
    pub fn own_value_count(&self) -> u32 {
        self.values.len() as u32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Definition {
    Function(FunctionNode),
    Data(DataNode),
    FuncModule(FuncNode),
    Entity(EntityNode),
    Enum(EnumNode),
    Variant(VariantNode),
    ErrorSet(ErrorNode),
}

/// A parsed source file: imports plus ordered definitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileNode {
    pub name: String,
    pub imports: Vec<ImportNode>,
    pub definitions: Vec<Definition>,
}

impl FileNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            imports: Vec::new(),
            definitions: Vec::new(),
        }
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionNode> {
        self.definitions.iter().filter_map(|d| match d {
            Definition::Function(f) => Some(f),
            _ => None,
        })
    }

    pub fn data(&self) -> impl Iterator<Item = &DataNode> {
        self.definitions.iter().filter_map(|d| match d {
            Definition::Data(d) => Some(d),
            _ => None,
        })
    }

    pub fn errors(&self) -> impl Iterator<Item = &ErrorNode> {
        self.definitions.iter().filter_map(|d| match d {
            Definition::ErrorSet(e) => Some(e),
            _ => None,
        })
    }
}
