//! Reflekt Engine
//!
//! A reflective object-access layer over a runtime type model:
//! - **Types**: values, type descriptors, objects, and the type registry that
//!   loads descriptors by fully-qualified name (`types` module)
//! - **Reflect**: cached member resolution, get/set by name with accessor-method
//!   fallback, bean-style property enumeration, constant extraction (`reflect` module)
//! - **Scan**: namespace discovery over class-path directories and packaged
//!   archives (`scan` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use reflekt_engine::{ReflectContext, ReflektConfig, Object, Value};
//! use reflekt_engine::types::{FieldDecl, TypeDefinition, ValueType};
//!
//! let ctx = ReflectContext::new(ReflektConfig::default());
//! ctx.registry().define(
//!     TypeDefinition::class("geo.Point").field(FieldDecl::new("x", ValueType::INT).private()),
//! );
//!
//! let point = Object::new(&ctx.registry().load("geo.Point")?);
//! ctx.resolver().set_value(&point, "x", Value::Int(5))?;
//! assert_eq!(ctx.resolver().get_value("x", &point)?, Value::Int(5));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// ============================================================================
// Core Modules
// ============================================================================

/// Configuration loaded from `reflekt.toml`
pub mod config;

/// Error types shared by the type model and the access layer
pub mod error;

/// Reflection: caches, resolution, enumeration
pub mod reflect;

/// Namespace scanning over directories and archives
pub mod scan;

/// Runtime type model: values, descriptors, objects, registry
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::{ConfigError, ReflektConfig};
pub use error::{AccessError, AccessResult, LoadError};
pub use reflect::{
    AccessResolver, CacheService, MemberAccessor, MemberHandle, PropertyFilter, PropertyMapper,
    WriteOutcome,
};
pub use scan::{NamespaceScanner, ScanError, ScanResult};
pub use types::{Object, ObjectRef, TypeDescriptor, TypeLoader, TypeRegistry, Value, ValueType};

use std::sync::Arc;

/// Wires a registry, a cache service, a resolver, a property mapper and a
/// scanner from one configuration.
///
/// The eviction ticker is not started until [`ReflectContext::start`] is called.
pub struct ReflectContext {
    config: ReflektConfig,
    registry: Arc<TypeRegistry>,
    cache: Arc<CacheService>,
    resolver: AccessResolver,
    mapper: PropertyMapper,
    scanner: NamespaceScanner,
}

impl ReflectContext {
    /// Build a context around a fresh registry
    pub fn new(config: ReflektConfig) -> Self {
        Self::with_registry(config, Arc::new(TypeRegistry::new()))
    }

    /// Build a context around an existing registry
    pub fn with_registry(config: ReflektConfig, registry: Arc<TypeRegistry>) -> Self {
        let cache = Arc::new(CacheService::with_interval(config.eviction_interval()));
        let resolver = AccessResolver::new(Arc::clone(&cache))
            .with_retry_limit(config.access.setter_retry_limit);
        let mapper = PropertyMapper::new(Arc::clone(&cache));
        let loader: Arc<dyn TypeLoader> = registry.clone();
        let scanner = NamespaceScanner::new(loader, config.scan_options());

        Self {
            config,
            registry,
            cache,
            resolver,
            mapper,
            scanner,
        }
    }

    /// Start the cache eviction ticker
    pub fn start(&self) -> std::io::Result<()> {
        self.cache.init()
    }

    /// Stop the cache eviction ticker
    pub fn shutdown(&self) {
        self.cache.shutdown();
    }

    /// Effective configuration
    pub fn config(&self) -> &ReflektConfig {
        &self.config
    }

    /// Type registry (the loader)
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Shared cache service
    pub fn cache(&self) -> &Arc<CacheService> {
        &self.cache
    }

    /// Member access resolver
    pub fn resolver(&self) -> &AccessResolver {
        &self.resolver
    }

    /// Property copy/compare utilities
    pub fn mapper(&self) -> &PropertyMapper {
        &self.mapper
    }

    /// Namespace scanner
    pub fn scanner(&self) -> &NamespaceScanner {
        &self.scanner
    }
}
