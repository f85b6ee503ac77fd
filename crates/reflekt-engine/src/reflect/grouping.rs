//! Property grouping between two types
//!
//! Pairs the readable properties of a source type with the matching
//! properties of a target type, caches the pairing in the grouping table,
//! and builds property copy and property diff on top of it.

use std::sync::Arc;

use super::access::AccessGuard;
use super::bean::introspect;
use super::cache::CacheService;
use crate::error::AccessResult;
use crate::types::{MethodDef, Object, TypeDescriptor, TypeToken, Value, ValueType};

/// What a grouping pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupingKind {
    /// Source read method with target write method
    Copy,
    /// Source read method with target read method
    Compare,
}

/// Identity of a cached grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupingKey {
    /// Source type token
    pub source: TypeToken,
    /// Target type token
    pub target: TypeToken,
    /// Pairing kind
    pub kind: GroupingKind,
}

/// A property present on both sides of a grouping
#[derive(Debug, Clone)]
pub struct PropertyPair {
    /// Property name
    pub name: String,
    /// Property type on the source side
    pub value_type: ValueType,
    /// Read method on the source type
    pub source: Arc<MethodDef>,
    /// Write (copy) or read (compare) method on the target type
    pub target: Arc<MethodDef>,
}

/// Copies and compares properties between objects, caching the pairings
pub struct PropertyMapper {
    cache: Arc<CacheService>,
}

impl PropertyMapper {
    /// Mapper backed by `cache`
    pub fn new(cache: Arc<CacheService>) -> Self {
        Self { cache }
    }

    /// Readable properties of `source` with an assignable writable
    /// counterpart on `target`, sorted by name
    pub fn matching_properties(&self, source: &TypeDescriptor, target: &TypeDescriptor) -> Arc<Vec<PropertyPair>> {
        self.grouping(source, target, GroupingKind::Copy)
    }

    /// Readable properties present on both types with the same type
    pub fn comparable_properties(&self, left: &TypeDescriptor, right: &TypeDescriptor) -> Arc<Vec<PropertyPair>> {
        self.grouping(left, right, GroupingKind::Compare)
    }

    fn grouping(&self, source: &TypeDescriptor, target: &TypeDescriptor, kind: GroupingKind) -> Arc<Vec<PropertyPair>> {
        let key = GroupingKey {
            source: source.token(),
            target: target.token(),
            kind,
        };
        if let Some(pairs) = self.cache.grouping(&key) {
            return pairs;
        }

        let targets = introspect(target);
        let pairs = introspect(source)
            .into_iter()
            .filter_map(|property| {
                let read = property.read_method()?;
                let counterpart = targets.iter().find(|t| t.name() == property.name())?;
                let method = match kind {
                    GroupingKind::Copy => counterpart
                        .write_method()
                        .filter(|_| counterpart.value_type().is_assignable_from(property.value_type()))?,
                    GroupingKind::Compare => counterpart
                        .read_method()
                        .filter(|_| counterpart.value_type() == property.value_type())?,
                };
                Some(PropertyPair {
                    name: property.name().to_string(),
                    value_type: property.value_type().clone(),
                    source: Arc::clone(read),
                    target: Arc::clone(method),
                })
            })
            .collect();

        self.cache.put_grouping(key, pairs)
    }

    /// Copy every matching property from `source` to `target`; returns the
    /// number of properties copied
    pub fn copy_properties(&self, source: &Object, target: &Object) -> AccessResult<usize> {
        let pairs = self.matching_properties(source.descriptor(), target.descriptor());
        for pair in pairs.iter() {
            let value = invoke_guarded(&pair.source, source, &[])?;
            invoke_guarded(&pair.target, target, &[value])?;
        }
        Ok(pairs.len())
    }

    /// Names of comparable properties whose values differ between the two objects
    pub fn differing_properties(&self, left: &Object, right: &Object) -> AccessResult<Vec<String>> {
        let pairs = self.comparable_properties(left.descriptor(), right.descriptor());
        let mut differing = Vec::new();
        for pair in pairs.iter() {
            let a = invoke_guarded(&pair.source, left, &[])?;
            let b = invoke_guarded(&pair.target, right, &[])?;
            if a != b {
                differing.push(pair.name.clone());
            }
        }
        Ok(differing)
    }
}

fn invoke_guarded(method: &MethodDef, target: &Object, args: &[Value]) -> AccessResult<Value> {
    let _guard = AccessGuard::acquire(method);
    method.invoke(target, args)
}
