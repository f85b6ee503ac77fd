//! Bean-style property enumeration
//!
//! Properties are derived from public, non-static methods along the
//! inheritance chain: `getX()` (non-void) or `isX()` (boolean) reads,
//! `setX(T)` (void) writes. A write whose parameter type differs from the
//! read type is not paired with it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::types::{Member, MethodDef, PrimitiveKind, TypeDescriptor, ValueType};

/// A readable and/or writable property
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    name: String,
    value_type: ValueType,
    read: Option<Arc<MethodDef>>,
    write: Option<Arc<MethodDef>>,
}

impl PropertyDescriptor {
    /// Property name (`x` for `getX`)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Property type
    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    /// Read method
    pub fn read_method(&self) -> Option<&Arc<MethodDef>> {
        self.read.as_ref()
    }

    /// Write method
    pub fn write_method(&self) -> Option<&Arc<MethodDef>> {
        self.write.as_ref()
    }
}

/// Which properties to report, by type
#[derive(Debug, Clone, Default)]
pub struct PropertyFilter {
    /// Types accepted explicitly
    pub only_value_types: Vec<ValueType>,
    /// Accept every primitive type
    pub include_primitives: bool,
    /// Accept every enumeration type
    pub include_enums: bool,
    /// Accept every collection type
    pub include_collections: bool,
    accept_all: bool,
}

impl PropertyFilter {
    /// Accept every property
    pub fn all() -> Self {
        Self {
            accept_all: true,
            ..Self::default()
        }
    }

    /// Accept only explicitly listed types
    pub fn only(types: Vec<ValueType>) -> Self {
        Self {
            only_value_types: types,
            ..Self::default()
        }
    }

    /// Accept base value types and primitives, plus enums and collections on request
    pub fn base_value_types(include_enums: bool, include_collections: bool) -> Self {
        Self {
            only_value_types: base_value_types(),
            include_primitives: true,
            include_enums,
            include_collections,
            accept_all: false,
        }
    }

    /// Whether a property of type `ty` passes
    pub fn matches(&self, ty: &ValueType) -> bool {
        self.accept_all
            || self.only_value_types.contains(ty)
            || (self.include_primitives && ty.is_primitive())
            || (self.include_enums && ty.is_enum())
            || (self.include_collections && ty.is_collection())
    }
}

/// Scalar types treated as plain values: strings, byte arrays and every primitive
pub fn base_value_types() -> Vec<ValueType> {
    let mut types = vec![ValueType::Str, ValueType::Bytes];
    types.extend(
        [
            PrimitiveKind::Bool,
            PrimitiveKind::Char,
            PrimitiveKind::Byte,
            PrimitiveKind::Short,
            PrimitiveKind::Int,
            PrimitiveKind::Long,
            PrimitiveKind::Float,
            PrimitiveKind::Double,
        ]
        .into_iter()
        .map(ValueType::Primitive),
    );
    types
}

/// Property name for an accessor suffix: `Name` -> `name`, `URL` -> `URL`
pub fn decapitalize(suffix: &str) -> String {
    let mut chars = suffix.chars();
    match (chars.next(), chars.next()) {
        (Some(first), Some(second)) if first.is_uppercase() && second.is_uppercase() => {
            suffix.to_string()
        }
        (Some(first), _) => first.to_lowercase().chain(suffix.chars().skip(1)).collect(),
        (None, _) => String::new(),
    }
}

fn read_property(method: &MethodDef) -> Option<String> {
    if !method.params().is_empty() {
        return None;
    }
    let name = method.name();
    if let Some(suffix) = name.strip_prefix("get").filter(|s| !s.is_empty()) {
        return (!method.returns().is_void()).then(|| decapitalize(suffix));
    }
    name.strip_prefix("is")
        .filter(|s| !s.is_empty() && *method.returns() == ValueType::BOOL)
        .map(decapitalize)
}

fn write_property(method: &MethodDef) -> Option<String> {
    if method.params().len() != 1 || !method.returns().is_void() {
        return None;
    }
    method
        .name()
        .strip_prefix("set")
        .filter(|s| !s.is_empty())
        .map(decapitalize)
}

#[derive(Default)]
struct Candidates {
    read: Option<Arc<MethodDef>>,
    writes: Vec<Arc<MethodDef>>,
}

/// Property descriptors of `ty`, sorted by name
pub fn introspect(ty: &TypeDescriptor) -> Vec<PropertyDescriptor> {
    let mut chain: Vec<&TypeDescriptor> = ty.ancestry().collect();
    chain.reverse();

    let mut candidates: BTreeMap<String, Candidates> = BTreeMap::new();
    for current in chain {
        let visible = current
            .methods()
            .iter()
            .filter(|m| m.modifiers().is_public && !m.is_static());
        for method in visible {
            if let Some(property) = read_property(method) {
                candidates.entry(property).or_default().read = Some(Arc::clone(method));
            } else if let Some(property) = write_property(method) {
                let writes = &mut candidates.entry(property).or_default().writes;
                match writes.iter_mut().find(|w| w.params() == method.params()) {
                    // Subclass declaration overrides
                    Some(existing) => *existing = Arc::clone(method),
                    None => writes.push(Arc::clone(method)),
                }
            }
        }
    }

    candidates
        .into_iter()
        .filter_map(|(name, found)| {
            let value_type = match (&found.read, found.writes.first()) {
                (Some(read), _) => read.returns().clone(),
                (None, Some(write)) => write.params()[0].clone(),
                (None, None) => return None,
            };
            let write = found
                .writes
                .iter()
                .find(|w| w.params()[0] == value_type)
                .cloned();
            Some(PropertyDescriptor {
                name,
                value_type,
                read: found.read,
                write,
            })
        })
        .collect()
}

/// Names of readable property methods whose type passes `filter`
pub fn getters(ty: &TypeDescriptor, filter: &PropertyFilter) -> BTreeSet<String> {
    introspect(ty)
        .into_iter()
        .filter(|p| filter.matches(&p.value_type))
        .filter_map(|p| p.read.map(|m| m.name().to_string()))
        .collect()
}

/// Names of writable property methods whose type passes `filter`
pub fn setters(ty: &TypeDescriptor, filter: &PropertyFilter) -> BTreeSet<String> {
    introspect(ty)
        .into_iter()
        .filter(|p| filter.matches(&p.value_type))
        .filter_map(|p| p.write.map(|m| m.name().to_string()))
        .collect()
}

/// Read methods of every property, sorted by property name
pub fn getter_methods(ty: &TypeDescriptor) -> Vec<Arc<MethodDef>> {
    introspect(ty).into_iter().filter_map(|p| p.read).collect()
}

/// Write methods of every property, sorted by property name
pub fn setter_methods(ty: &TypeDescriptor) -> Vec<Arc<MethodDef>> {
    introspect(ty).into_iter().filter_map(|p| p.write).collect()
}
