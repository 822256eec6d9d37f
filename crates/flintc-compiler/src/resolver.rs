//! Name resolution queries over a parsed session.
//!
//! Collects the named types of the translation unit and answers the
//! questions IR generation asks: which error sets exist (and how many
//! values they carry, parents included), which types are data types, and
//! which types need synthesized free/clone traversals.

use indexmap::IndexMap;

use flintc_core::{Primitive, Type, TypeUniverse};

use crate::ParseSession;
use crate::ast::{DataNode, EntityNode, EnumNode, ErrorNode, VariantNode};

#[derive(Debug, Default)]
pub struct Resolver {
    pub universe: TypeUniverse,
    pub data_nodes: IndexMap<String, DataNode>,
    pub entities: IndexMap<String, EntityNode>,
    pub errors: IndexMap<String, ErrorNode>,
    pub variants: IndexMap<String, VariantNode>,
    pub enums: IndexMap<String, EnumNode>,
}

impl Resolver {
    pub fn build(session: &ParseSession) -> Self {
        let mut resolver = Self::default();
        for file in &session.files {
            for definition in &file.definitions {
                match definition {
                    crate::ast::Definition::Data(d) => {
                        resolver.data_nodes.insert(d.name.clone(), d.clone());
                    }
                    crate::ast::Definition::Entity(e) => {
                        resolver.entities.insert(e.name.clone(), e.clone());
                    }
                    crate::ast::Definition::ErrorSet(e) => {
                        resolver.errors.insert(e.name.clone(), e.clone());
                    }
                    crate::ast::Definition::Variant(v) => {
                        resolver.variants.insert(v.name.clone(), v.clone());
                    }
                    crate::ast::Definition::Enum(e) => {
                        resolver.enums.insert(e.name.clone(), e.clone());
                    }
                    _ => {}
                }
            }
        }

        // Second pass: the universe needs resolved field/case types.
        let data_fields: Vec<(String, Vec<(Type, String)>)> = resolver
            .data_nodes
            .values()
            .map(|data| {
                let fields = data
                    .fields
                    .iter()
                    .filter_map(|(ty, name)| {
                        resolver.parse_type_with_maps(ty).map(|t| (t, name.clone()))
                    })
                    .collect();
                (data.name.clone(), fields)
            })
            .collect();
        let variant_cases: Vec<(String, Vec<Type>)> = resolver
            .variants
            .values()
            .map(|variant| {
                let cases = variant
                    .possible_types
                    .iter()
                    .filter_map(|ty| resolver.parse_type_with_maps(ty))
                    .collect();
                (variant.name.clone(), cases)
            })
            .collect();
        resolver.universe.data_fields.extend(data_fields);
        resolver.universe.variant_cases.extend(variant_cases);
        resolver
    }

    /// Parse a source type string into the algebra, resolving named types
    /// against the collected definitions.
    pub fn parse_type(&self, s: &str) -> Option<Type> {
        self.parse_type_with_maps(s.trim())
    }

    fn parse_type_with_maps(&self, s: &str) -> Option<Type> {
        let s = s.trim();
        if let Some(inner) = s.strip_suffix('?') {
            return Some(Type::Optional(Box::new(self.parse_type_with_maps(inner)?)));
        }
        if let Some(open) = s.rfind('[')
            && s.ends_with(']')
        {
            let elem = self.parse_type_with_maps(&s[..open])?;
            let dimensionality = s[open + 1..s.len() - 1].matches(',').count() + 1;
            return Some(Type::Array {
                elem: Box::new(elem),
                dimensionality,
            });
        }
        if s.starts_with('(') && s.ends_with(')') {
            let inner = &s[1..s.len() - 1];
            let elems: Option<Vec<Type>> = split_tuple(inner)
                .into_iter()
                .map(|part| self.parse_type_with_maps(part))
                .collect();
            return Some(Type::Tuple(elems?));
        }
        if let Some(p) = Primitive::from_name(s) {
            return Some(Type::Primitive(p));
        }
        if self.data_nodes.contains_key(s) {
            return Some(Type::Data(s.to_string()));
        }
        if self.entities.contains_key(s) {
            return Some(Type::Entity(s.to_string()));
        }
        if self.errors.contains_key(s) {
            return Some(Type::ErrorSet(s.to_string()));
        }
        if self.variants.contains_key(s) {
            return Some(Type::Variant(s.to_string()));
        }
        if self.enums.contains_key(s) {
            return Some(Type::Enum(s.to_string()));
        }
        None
    }

    pub fn get_all_errors(&self) -> Vec<&ErrorNode> {
        self.errors.values().collect()
    }

    /// View over the types a single file (identified by its hash) defines.
    pub fn get_namespace_from_hash(&self, file_hash: u32) -> Namespace<'_> {
        Namespace {
            resolver: self,
            file_hash,
        }
    }

    /// Own values plus the parent chain's, transitively.
    pub fn value_count(&self, error_name: &str) -> u32 {
        let Some(node) = self.errors.get(error_name) else {
            return 0;
        };
        let inherited = node
            .parent
            .as_deref()
            .map(|p| self.value_count(p))
            .unwrap_or(0);
        inherited + node.own_value_count()
    }

    pub fn get_all_data_types(&self) -> Vec<(Type, &DataNode)> {
        self.data_nodes
            .values()
            .map(|d| (Type::Data(d.name.clone()), d))
            .collect()
    }

    /// Every type requiring a synthesized free/clone case: the named heap
    /// owners plus the freeable composites reachable from their fields and
    /// cases. Deterministic (definition order, then discovery order).
    pub fn get_all_freeable_types(&self) -> Vec<Type> {
        let mut out: Vec<Type> = Vec::new();
        let mut push = |ty: Type, out: &mut Vec<Type>| {
            if !out.contains(&ty) {
                out.push(ty);
            }
        };

        push(Type::str_(), &mut out);
        for data in self.data_nodes.values() {
            push(Type::Data(data.name.clone()), &mut out);
        }
        for entity in self.entities.values() {
            push(Type::Entity(entity.name.clone()), &mut out);
        }
        for error in self.errors.values() {
            push(Type::ErrorSet(error.name.clone()), &mut out);
        }
        for variant in self.variants.values() {
            let ty = Type::Variant(variant.name.clone());
            if self.universe.is_freeable(&ty) {
                push(ty, &mut out);
            }
        }

        // Freeable composites nested in data fields and variant cases need
        // their own dispatch cases too.
        let mut queue: Vec<Type> = Vec::new();
        for fields in self.universe.data_fields.values() {
            queue.extend(fields.iter().map(|(t, _)| t.clone()));
        }
        for cases in self.universe.variant_cases.values() {
            queue.extend(cases.iter().cloned());
        }
        while let Some(ty) = queue.pop() {
            if !self.universe.is_freeable(&ty) || out.contains(&ty) {
                continue;
            }
            match &ty {
                Type::Array { elem, .. } => queue.push((**elem).clone()),
                Type::Optional(elem) => queue.push((**elem).clone()),
                Type::Tuple(elems) => queue.extend(elems.iter().cloned()),
                _ => {}
            }
            push(ty, &mut out);
        }

        out
    }
}

/// Per-file type namespace, keyed by the defining file's hash.
pub struct Namespace<'r> {
    resolver: &'r Resolver,
    file_hash: u32,
}

impl Namespace<'_> {
    pub fn get_type_from_str(&self, name: &str) -> Option<Type> {
        let data = self.resolver.data_nodes.get(name)?;
        if data.file_hash != self.file_hash {
            return None;
        }
        Some(Type::Data(name.to_string()))
    }
}

fn split_tuple(inner: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in inner.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(inner[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(inner[start..].trim());
    parts
}
