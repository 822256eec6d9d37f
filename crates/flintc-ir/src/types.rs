//! IR value types and byte layout.
//!
//! Struct types are registered by name in the module; a struct may carry a
//! flexible trailing array (count 0) which contributes nothing to its size,
//! mirroring the C "variable member" pattern the runtime structures use.

/// Index of a named struct type within its module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StructId(pub u32);

/// Type of an IR value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IrType {
    Void,
    I1,
    I8,
    /// 24-bit integer, used for the slot reference count.
    I24,
    I32,
    I64,
    F64,
    /// Opaque pointer.
    Ptr,
    Struct(StructId),
}

impl IrType {
    pub fn is_integer(self) -> bool {
        matches!(self, Self::I1 | Self::I8 | Self::I24 | Self::I32 | Self::I64)
    }

    /// Number of value bits for integer types.
    pub fn bits(self) -> u32 {
        match self {
            Self::I1 => 1,
            Self::I8 => 8,
            Self::I24 => 24,
            Self::I32 => 32,
            Self::I64 | Self::Ptr => 64,
            Self::F64 => 64,
            Self::Void | Self::Struct(_) => 0,
        }
    }
}

/// A named struct type.
#[derive(Debug, Clone)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<IrType>,
    /// Element type of a flexible trailing array, if any. Indexable through
    /// the field index `fields.len()`, but occupies no bytes of the struct
    /// size itself.
    pub flexible_tail: Option<IrType>,
}

/// Byte layout oracle over a module's struct table.
///
/// Natural alignment, fields packed in declaration order with padding, struct
/// size rounded up to the struct's alignment.
#[derive(Clone, Copy)]
pub struct Layout<'m> {
    structs: &'m [StructDef],
}

impl<'m> Layout<'m> {
    pub fn new(structs: &'m [StructDef]) -> Self {
        Self { structs }
    }

    pub fn size_of(&self, ty: IrType) -> u64 {
        match ty {
            IrType::Void => 0,
            IrType::I1 | IrType::I8 => 1,
            IrType::I24 => 3,
            IrType::I32 => 4,
            IrType::I64 | IrType::F64 | IrType::Ptr => 8,
            IrType::Struct(id) => self.struct_size(id),
        }
    }

    pub fn align_of(&self, ty: IrType) -> u64 {
        match ty {
            IrType::Void => 1,
            IrType::I1 | IrType::I8 | IrType::I24 => 1,
            IrType::I32 => 4,
            IrType::I64 | IrType::F64 | IrType::Ptr => 8,
            IrType::Struct(id) => self
                .structs[id.0 as usize]
                .fields
                .iter()
                .map(|&f| self.align_of(f))
                .max()
                .unwrap_or(1),
        }
    }

    /// Byte offset of field `index` within the struct. The flexible tail is
    /// addressable as field `fields.len()` and starts at the struct size.
    pub fn field_offset(&self, id: StructId, index: u32) -> u64 {
        let def = &self.structs[id.0 as usize];
        if index as usize == def.fields.len() {
            debug_assert!(def.flexible_tail.is_some());
            return self.struct_size(id);
        }
        let mut offset = 0u64;
        for (i, &field) in def.fields.iter().enumerate() {
            offset = align_up(offset, self.align_of(field));
            if i == index as usize {
                return offset;
            }
            offset += self.size_of(field);
        }
        panic!("field index {index} out of range for struct '{}'", def.name);
    }

    /// Type of field `index`, the flexible tail included.
    pub fn field_type(&self, id: StructId, index: u32) -> IrType {
        let def = &self.structs[id.0 as usize];
        if index as usize == def.fields.len() {
            return def.flexible_tail.expect("struct has no flexible tail");
        }
        def.fields[index as usize]
    }

    pub fn struct_size(&self, id: StructId) -> u64 {
        let def = &self.structs[id.0 as usize];
        let mut offset = 0u64;
        for &field in &def.fields {
            offset = align_up(offset, self.align_of(field));
            offset += self.size_of(field);
        }
        align_up(offset, self.align_of(IrType::Struct(id)))
    }
}

fn align_up(offset: u64, align: u64) -> u64 {
    offset.div_ceil(align) * align
}
