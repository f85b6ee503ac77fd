//! Type registry
//!
//! Plays the part of a class loader: holds type definitions by
//! fully-qualified name and loads them into descriptors on demand,
//! resolving the ancestor chain first.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;

use super::definition::TypeDefinition;
use super::descriptor::TypeDescriptor;
use crate::error::LoadError;

/// Deepest ancestor chain the registry will follow before reporting a cycle
const MAX_CHAIN_DEPTH: usize = 256;

/// Loads type descriptors by fully-qualified name
pub trait TypeLoader: Send + Sync {
    /// Load (or return the already-loaded) descriptor for `name`
    fn load(&self, name: &str) -> Result<Arc<TypeDescriptor>, LoadError>;

    /// Location the type was loaded from, if known
    fn code_source(&self, name: &str) -> Option<PathBuf> {
        self.load(name)
            .ok()
            .and_then(|ty| ty.origin().map(|path| path.to_path_buf()))
    }
}

/// Registry of type definitions and loaded descriptors
pub struct TypeRegistry {
    /// Definitions by name
    definitions: DashMap<String, TypeDefinition>,
    /// Loaded descriptors by name
    loaded: DashMap<String, Arc<TypeDescriptor>>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            definitions: DashMap::new(),
            loaded: DashMap::new(),
        }
    }

    /// Add or replace a definition
    ///
    /// Replacing a definition unloads the previous descriptor; the next load
    /// builds a new one with a new token.
    pub fn define(&self, definition: TypeDefinition) {
        let name = definition.name().to_string();
        self.loaded.remove(&name);
        self.definitions.insert(name, definition);
    }

    /// Register an already-built descriptor
    pub fn register(&self, descriptor: Arc<TypeDescriptor>) {
        self.loaded.insert(descriptor.name().to_string(), descriptor);
    }

    /// Loaded descriptor, without triggering a load
    pub fn get(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.loaded.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Whether a definition or a descriptor exists for `name`
    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name) || self.loaded.contains_key(name)
    }

    /// Number of known definitions
    pub fn definition_count(&self) -> usize {
        self.definitions.len()
    }

    /// Names of all definitions, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.definitions.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    fn load_at_depth(&self, name: &str, depth: usize) -> Result<Arc<TypeDescriptor>, LoadError> {
        if let Some(ty) = self.get(name) {
            return Ok(ty);
        }
        if depth > MAX_CHAIN_DEPTH {
            return Err(LoadError::Circular(name.to_string()));
        }

        // Clone out of the map so no shard lock is held across the recursion
        let definition = self
            .definitions
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LoadError::NotFound(name.to_string()))?;

        let parent = match definition.parent_name() {
            Some(parent_name) => match self.load_at_depth(parent_name, depth + 1) {
                Ok(parent) => Some(parent),
                Err(LoadError::Circular(_)) => return Err(LoadError::Circular(name.to_string())),
                Err(_) => {
                    return Err(LoadError::Linkage {
                        name: name.to_string(),
                        missing: parent_name.to_string(),
                    })
                }
            },
            None => None,
        };

        let built = definition.build(parent)?;
        let entry = self.loaded.entry(name.to_string()).or_insert(built);
        Ok(Arc::clone(entry.value()))
    }
}

impl TypeLoader for TypeRegistry {
    fn load(&self, name: &str) -> Result<Arc<TypeDescriptor>, LoadError> {
        self.load_at_depth(name, 0)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldDecl, ValueType};

    #[test]
    fn test_load_resolves_parent() {
        let registry = TypeRegistry::new();
        registry.define(TypeDefinition::class("a.Derived").extends("a.Base"));
        registry.define(TypeDefinition::class("a.Base").field(FieldDecl::new("id", ValueType::INT)));

        let derived = registry.load("a.Derived").unwrap();
        assert_eq!(derived.parent().unwrap().name(), "a.Base");
        assert!(registry.get("a.Base").is_some());
    }

    #[test]
    fn test_load_is_idempotent() {
        let registry = TypeRegistry::new();
        registry.define(TypeDefinition::class("a.Thing"));
        let first = registry.load("a.Thing").unwrap();
        let second = registry.load("a.Thing").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_load_missing() {
        let registry = TypeRegistry::new();
        assert_eq!(
            registry.load("a.Nope").unwrap_err(),
            LoadError::NotFound("a.Nope".into())
        );
    }

    #[test]
    fn test_load_linkage_failure() {
        let registry = TypeRegistry::new();
        registry.define(TypeDefinition::class("a.Orphan").extends("a.Gone"));
        assert_eq!(
            registry.load("a.Orphan").unwrap_err(),
            LoadError::Linkage {
                name: "a.Orphan".into(),
                missing: "a.Gone".into()
            }
        );
    }

    #[test]
    fn test_load_circular() {
        let registry = TypeRegistry::new();
        registry.define(TypeDefinition::class("a.A").extends("a.B"));
        registry.define(TypeDefinition::class("a.B").extends("a.A"));
        assert_eq!(registry.load("a.A").unwrap_err(), LoadError::Circular("a.A".into()));
    }

    #[test]
    fn test_redefine_unloads() {
        let registry = TypeRegistry::new();
        registry.define(TypeDefinition::class("a.Thing"));
        let first = registry.load("a.Thing").unwrap();
        registry.define(TypeDefinition::class("a.Thing"));
        let second = registry.load("a.Thing").unwrap();
        assert_ne!(first.token(), second.token());
    }

    #[test]
    fn test_code_source() {
        let registry = TypeRegistry::new();
        registry.define(TypeDefinition::class("a.Packed").origin("/opt/app/app.jar"));
        registry.define(TypeDefinition::class("a.Loose"));
        assert_eq!(
            registry.code_source("a.Packed"),
            Some(PathBuf::from("/opt/app/app.jar"))
        );
        assert_eq!(registry.code_source("a.Loose"), None);
        assert_eq!(registry.names(), vec!["a.Loose".to_string(), "a.Packed".to_string()]);
    }
}
