//! Access resolution
//!
//! Reads and writes named members through an ordered list of strategies.
//! The default order is direct member access first, then the conventional
//! accessor method (`getX`/`isX` for reads, `setX(T)` for writes). Each
//! resolution is cached under a key derived only from the type, the member
//! name and the parameter type, so racing threads converge on equal handles.

use std::sync::Arc;

use tracing::debug;

use super::access::{AccessGuard, MemberHandle};
use super::cache::{CacheKey, CacheService};
use super::directory;
use crate::error::{AccessError, AccessResult};
use crate::types::{FieldDef, Member, Object, TypeDescriptor, Value, ValueType};

/// Default number of mutator attempts before falling back to direct access
pub const DEFAULT_SETTER_RETRY_LIMIT: usize = 5;

/// Upper-case the first character of `name`
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ============================================================================
// Strategies
// ============================================================================

/// One way of resolving a named member
pub trait AccessStrategy: Send + Sync {
    /// Short name for logging
    fn name(&self) -> &'static str;

    /// Resolve a read handle
    fn resolve_read(&self, ty: &TypeDescriptor, member: &str) -> Option<MemberHandle>;

    /// Key a write for `value` would be cached under; `None` if this
    /// strategy cannot handle the write at all
    fn mutation_key(&self, ty: &TypeDescriptor, member: &str, value: &Value) -> Option<CacheKey>;

    /// Resolve a write handle for a key produced by [`mutation_key`](Self::mutation_key)
    fn resolve_write(&self, ty: &TypeDescriptor, key: &CacheKey) -> Option<MemberHandle>;
}

/// Direct field access through the type directory
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectMember;

impl AccessStrategy for DirectMember {
    fn name(&self) -> &'static str {
        "member"
    }

    fn resolve_read(&self, ty: &TypeDescriptor, member: &str) -> Option<MemberHandle> {
        directory::find_member(member, ty).map(MemberHandle::field)
    }

    fn mutation_key(&self, ty: &TypeDescriptor, member: &str, _value: &Value) -> Option<CacheKey> {
        Some(CacheKey::member(ty, member))
    }

    fn resolve_write(&self, ty: &TypeDescriptor, key: &CacheKey) -> Option<MemberHandle> {
        directory::find_member(key.name(), ty).map(MemberHandle::field)
    }
}

/// Conventional accessor methods: `getX()`, `isX()` and `setX(T)`
#[derive(Debug, Default, Clone, Copy)]
pub struct AccessorMethod;

impl AccessorMethod {
    /// Parameter type a mutator for `member` must accept
    ///
    /// The value's runtime type, or the getter's return type when the value
    /// is `Null`.
    pub fn mutator_param(&self, ty: &TypeDescriptor, member: &str, value: &Value) -> Option<ValueType> {
        match value.value_type() {
            Some(actual) => Some(actual),
            None => self
                .resolve_read(ty, member)
                .map(|getter| getter.value_type().clone()),
        }
    }
}

impl AccessStrategy for AccessorMethod {
    fn name(&self) -> &'static str {
        "accessor"
    }

    fn resolve_read(&self, ty: &TypeDescriptor, member: &str) -> Option<MemberHandle> {
        let suffix = capitalize(member);
        directory::find_method(ty, &format!("get{}", suffix), &[])
            .filter(|m| !m.returns().is_void())
            .or_else(|| {
                directory::find_method(ty, &format!("is{}", suffix), &[])
                    .filter(|m| *m.returns() == ValueType::BOOL)
            })
            .map(MemberHandle::method)
    }

    fn mutation_key(&self, ty: &TypeDescriptor, member: &str, value: &Value) -> Option<CacheKey> {
        let param = self.mutator_param(ty, member, value)?;
        Some(CacheKey::mutator(ty, member, param))
    }

    fn resolve_write(&self, ty: &TypeDescriptor, key: &CacheKey) -> Option<MemberHandle> {
        let param = key.param()?;
        let setter = format!("set{}", capitalize(key.name()));
        directory::find_method_accepting(ty, &setter, param).map(MemberHandle::method)
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Read/write a named member on an object
pub trait MemberAccessor {
    /// Read `name` from `target`
    fn get_value(&self, name: &str, target: &Object) -> AccessResult<Value>;

    /// Write `value` to `name` on `target`
    fn set_value(&self, target: &Object, name: &str, value: Value) -> AccessResult<()>;
}

/// Which path a retried write ended up taking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePath {
    /// Mutator method
    Setter,
    /// Direct field access
    Field,
}

/// Result of [`AccessResolver::set_value_with_retry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Path that performed the write
    pub path: WritePath,
    /// Mutator attempts made
    pub attempts: usize,
}

/// Cache-backed member resolver
pub struct AccessResolver {
    cache: Arc<CacheService>,
    strategies: Vec<Box<dyn AccessStrategy>>,
    retry_limit: usize,
}

impl AccessResolver {
    /// Resolver with the default strategies: direct member, then accessor method
    pub fn new(cache: Arc<CacheService>) -> Self {
        Self::with_strategies(cache, vec![Box::new(DirectMember), Box::new(AccessorMethod)])
    }

    /// Resolver with a custom strategy order
    pub fn with_strategies(cache: Arc<CacheService>, strategies: Vec<Box<dyn AccessStrategy>>) -> Self {
        Self {
            cache,
            strategies,
            retry_limit: DEFAULT_SETTER_RETRY_LIMIT,
        }
    }

    /// Set the mutator attempt bound for [`set_value_with_retry`](Self::set_value_with_retry)
    pub fn with_retry_limit(mut self, limit: usize) -> Self {
        self.retry_limit = limit.max(1);
        self
    }

    /// Mutator attempt bound
    pub fn retry_limit(&self) -> usize {
        self.retry_limit
    }

    /// Shared cache
    pub fn cache(&self) -> &Arc<CacheService> {
        &self.cache
    }

    // ------------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------------

    /// Resolve (or fetch from cache) the read handle for `name`
    pub fn resolve_read(&self, ty: &TypeDescriptor, name: &str) -> Option<Arc<MemberHandle>> {
        let key = CacheKey::member(ty, name);
        if let Some(handle) = self.cache.retrieval(&key) {
            return Some(handle);
        }

        let (strategy, handle) = self
            .strategies
            .iter()
            .find_map(|s| s.resolve_read(ty, name).map(|h| (s.name(), h)))?;
        debug!(owner = ty.name(), member = name, strategy, "resolved read");
        Some(self.cache.put_retrieval(key, handle))
    }

    /// Resolve (or fetch from cache) the write handle for `name` and `value`
    pub fn resolve_write(&self, ty: &TypeDescriptor, name: &str, value: &Value) -> Option<Arc<MemberHandle>> {
        self.strategies
            .iter()
            .find_map(|strategy| self.resolve_write_with(strategy.as_ref(), ty, name, value))
    }

    fn resolve_write_with(
        &self,
        strategy: &dyn AccessStrategy,
        ty: &TypeDescriptor,
        name: &str,
        value: &Value,
    ) -> Option<Arc<MemberHandle>> {
        let key = strategy.mutation_key(ty, name, value)?;
        if let Some(handle) = self.cache.mutation(&key) {
            return Some(handle);
        }
        let handle = strategy.resolve_write(ty, &key)?;
        debug!(owner = ty.name(), member = name, strategy = strategy.name(), "resolved write");
        Some(self.cache.put_mutation(key, handle))
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Read `name` from `target`: direct member first, then accessor method
    pub fn get_value(&self, name: &str, target: &Object) -> AccessResult<Value> {
        let ty = target.descriptor();
        let handle = self
            .resolve_read(ty, name)
            .ok_or_else(|| AccessError::not_found(ty.name(), name))?;
        handle.read(target)
    }

    /// Like [`get_value`](Self::get_value) but every failure becomes `None`
    pub fn get_value_quiet(&self, name: &str, target: &Object) -> Option<Value> {
        self.get_value(name, target).ok()
    }

    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    /// Write `value` to `name`: direct member first, then mutator method
    pub fn set_value(&self, target: &Object, name: &str, value: Value) -> AccessResult<()> {
        let ty = target.descriptor();
        let handle = self
            .resolve_write(ty, name, &value)
            .ok_or_else(|| AccessError::not_found(ty.name(), name))?;
        handle.write(target, value)
    }

    /// Like [`set_value`](Self::set_value); reports success as a flag
    pub fn set_value_quiet(&self, target: &Object, name: &str, value: Value) -> bool {
        self.set_value(target, name, value).is_ok()
    }

    /// Write `Null` to `name`
    pub fn set_to_null(&self, target: &Object, name: &str) -> AccessResult<()> {
        self.set_value(target, name, Value::Null)
    }

    /// Write through the mutator method only
    pub fn set_value_via_setter(&self, target: &Object, name: &str, value: Value) -> AccessResult<()> {
        let ty = target.descriptor();
        let handle = self
            .resolve_write_with(&AccessorMethod, ty, name, &value)
            .ok_or_else(|| AccessError::not_found(ty.name(), format!("set{}", capitalize(name))))?;
        handle.write(target, value)
    }

    /// Write `field` on `target` directly under a scoped access guard
    ///
    /// Fails with `WrongReceiver` if `target` does not inherit the field's owner.
    pub fn set_field_direct(&self, target: &Object, field: &FieldDef, value: Value) -> AccessResult<()> {
        if !field.is_static() && !target.descriptor().is_a(field.owner()) {
            return Err(AccessError::WrongReceiver {
                owner: field.owner().to_string(),
                receiver: target.type_name().to_string(),
            });
        }
        let _guard = AccessGuard::acquire(field);
        field.set(target, value)
    }

    /// Write through the mutator, retrying on "mutator not found" up to the
    /// retry limit, then fall back to direct field access
    ///
    /// Other failures (invocation, type mismatch) are returned immediately.
    pub fn set_value_with_retry(&self, target: &Object, name: &str, value: Value) -> AccessResult<WriteOutcome> {
        let mut attempts = 0;
        while attempts < self.retry_limit {
            attempts += 1;
            match self.set_value_via_setter(target, name, value.clone()) {
                Ok(()) => {
                    return Ok(WriteOutcome {
                        path: WritePath::Setter,
                        attempts,
                    })
                }
                Err(err) if err.is_not_found() => {
                    debug!(owner = target.type_name(), member = name, attempts, "mutator not found");
                }
                Err(err) => return Err(err),
            }
        }

        let ty = target.descriptor();
        let handle = self
            .resolve_write_with(&DirectMember, ty, name, &value)
            .ok_or_else(|| AccessError::not_found(ty.name(), name))?;
        handle.write(target, value)?;
        Ok(WriteOutcome {
            path: WritePath::Field,
            attempts,
        })
    }

    // ------------------------------------------------------------------------
    // Method calls
    // ------------------------------------------------------------------------

    /// Call `name` with `args` under a scoped access guard; not cached
    pub fn call_method(&self, target: &Object, name: &str, args: &[Value]) -> AccessResult<Value> {
        let ty = target.descriptor();
        let method = directory::find_method_for_args(ty, name, args)
            .ok_or_else(|| AccessError::not_found(ty.name(), name))?;
        let _guard = AccessGuard::acquire(method.as_ref());
        method.invoke(target, args)
    }

    /// Call `name` with at most one argument through the call cache
    ///
    /// No access relaxation: inaccessible methods fail with `IllegalAccess`.
    /// A `Null` argument is treated as no argument.
    pub fn call_method_quick(&self, target: &Object, name: &str, arg: Option<Value>) -> AccessResult<Value> {
        let ty = target.descriptor();
        let arg = arg.filter(|value| !value.is_null());
        let param = arg.as_ref().and_then(Value::value_type);
        let key = CacheKey::call(ty, name, param.clone());

        let handle = match self.cache.retrieval(&key) {
            Some(handle) => handle,
            None => {
                let method = match &param {
                    Some(param) => directory::find_method_accepting(ty, name, param),
                    None => directory::find_method(ty, name, &[]),
                }
                .ok_or_else(|| AccessError::not_found(ty.name(), name))?;
                self.cache.put_retrieval(key, MemberHandle::method(method))
            }
        };

        match arg {
            Some(arg) => handle.invoke(target, std::slice::from_ref(&arg)),
            None => handle.invoke(target, &[]),
        }
    }

    /// Like [`call_method_quick`](Self::call_method_quick) but every failure
    /// becomes `None`
    pub fn call_method_quiet(&self, target: &Object, name: &str, arg: Option<Value>) -> Option<Value> {
        self.call_method_quick(target, name, arg).ok()
    }

    // ------------------------------------------------------------------------
    // Whole-object helpers
    // ------------------------------------------------------------------------

    /// Whether the runtime type of `target` declares `name` itself
    pub fn field_exists(&self, target: &Object, name: &str) -> bool {
        directory::declares_field(target.descriptor(), name)
    }

    /// Values of the declared instance fields of `target`'s type, in
    /// declaration order
    pub fn object_field_values(&self, target: &Object) -> AccessResult<Vec<Value>> {
        target
            .descriptor()
            .fields()
            .iter()
            .filter(|field| !field.is_static())
            .map(|field| {
                let _guard = AccessGuard::acquire(field.as_ref());
                field.get(target)
            })
            .collect()
    }

    /// Reset every declared non-constant field of `target`'s type to its zero value
    pub fn clean_object(&self, target: &Object) -> AccessResult<()> {
        for field in target.descriptor().fields().iter().filter(|f| !f.is_constant()) {
            self.set_field_direct(target, field, field.value_type().default_value())?;
        }
        Ok(())
    }
}

impl MemberAccessor for AccessResolver {
    fn get_value(&self, name: &str, target: &Object) -> AccessResult<Value> {
        AccessResolver::get_value(self, name, target)
    }

    fn set_value(&self, target: &Object, name: &str, value: Value) -> AccessResult<()> {
        AccessResolver::set_value(self, target, name, value)
    }
}
