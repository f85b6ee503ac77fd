//! Scoped access relaxation and member handles

use std::sync::Arc;

use crate::error::AccessResult;
use crate::types::{AccessControl, FieldDef, Member, MethodDef, Object, Value, ValueType};

// ============================================================================
// Access guard
// ============================================================================

/// Grants access to a member for the guard's lifetime
///
/// Every guard on a non-public member without a persistent override holds
/// its own grant, so concurrent guards never release each other's access.
/// The grant is released when the guard drops, on every exit path.
pub struct AccessGuard<'a> {
    access: &'a AccessControl,
    relaxed: bool,
}

impl<'a> AccessGuard<'a> {
    /// Relax access to `member` if needed
    pub fn acquire<M: Member + ?Sized>(member: &'a M) -> Self {
        let relaxed = !member.modifiers().is_public && !member.access().is_overridden();
        if relaxed {
            member.access().relax();
        }
        Self {
            access: member.access(),
            relaxed,
        }
    }

    /// Whether this guard holds a grant
    pub fn relaxed(&self) -> bool {
        self.relaxed
    }
}

impl Drop for AccessGuard<'_> {
    fn drop(&mut self) {
        if self.relaxed {
            self.access.restore();
        }
    }
}

// ============================================================================
// Member handles
// ============================================================================

/// Resolved unit a handle points at
#[derive(Debug, Clone)]
pub enum HandleTarget {
    /// Direct field access
    Field(Arc<FieldDef>),
    /// Accessor or mutator method
    Method(Arc<MethodDef>),
}

/// A resolved, reusable reference to a field or accessor method
///
/// Immutable once created. `requires_relaxation` derives from the declared
/// modifiers, never from the current accessibility state.
#[derive(Debug)]
pub struct MemberHandle {
    target: HandleTarget,
    value_type: ValueType,
    requires_relaxation: bool,
}

impl MemberHandle {
    /// Handle for a field
    pub fn field(field: Arc<FieldDef>) -> Self {
        Self {
            value_type: field.value_type().clone(),
            requires_relaxation: !field.modifiers().is_public,
            target: HandleTarget::Field(field),
        }
    }

    /// Handle for a method; the value type is the single parameter type for
    /// mutators and the return type otherwise
    pub fn method(method: Arc<MethodDef>) -> Self {
        let value_type = match method.params() {
            [param] => param.clone(),
            _ => method.returns().clone(),
        };
        Self {
            value_type,
            requires_relaxation: !method.modifiers().is_public,
            target: HandleTarget::Method(method),
        }
    }

    /// Resolved target
    pub fn target(&self) -> &HandleTarget {
        &self.target
    }

    /// Declaring type
    pub fn owner(&self) -> &str {
        match &self.target {
            HandleTarget::Field(field) => field.owner(),
            HandleTarget::Method(method) => method.owner(),
        }
    }

    /// Field or method name
    pub fn name(&self) -> &str {
        match &self.target {
            HandleTarget::Field(field) => field.name(),
            HandleTarget::Method(method) => method.name(),
        }
    }

    /// Declared value type
    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    /// Whether use requires relaxing access control
    pub fn requires_relaxation(&self) -> bool {
        self.requires_relaxation
    }

    /// Whether this is a direct field handle
    pub fn is_field(&self) -> bool {
        matches!(self.target, HandleTarget::Field(_))
    }

    /// Read through the handle under a scoped access guard
    pub fn read(&self, target: &Object) -> AccessResult<Value> {
        match &self.target {
            HandleTarget::Field(field) => {
                let _guard = AccessGuard::acquire(field.as_ref());
                field.get(target)
            }
            HandleTarget::Method(method) => {
                let _guard = AccessGuard::acquire(method.as_ref());
                method.invoke(target, &[])
            }
        }
    }

    /// Write through the handle under a scoped access guard
    pub fn write(&self, target: &Object, value: Value) -> AccessResult<()> {
        match &self.target {
            HandleTarget::Field(field) => {
                let _guard = AccessGuard::acquire(field.as_ref());
                field.set(target, value)
            }
            HandleTarget::Method(method) => {
                let _guard = AccessGuard::acquire(method.as_ref());
                method.invoke(target, &[value]).map(|_| ())
            }
        }
    }

    /// Invoke a method handle without relaxing access
    ///
    /// Field handles read when `args` is empty and write its single element
    /// otherwise, also without relaxation.
    pub fn invoke(&self, target: &Object, args: &[Value]) -> AccessResult<Value> {
        match &self.target {
            HandleTarget::Method(method) => method.invoke(target, args),
            HandleTarget::Field(field) => match args {
                [] => field.get(target),
                [value, ..] => field.set(target, value.clone()).map(|_| Value::Null),
            },
        }
    }
}

impl PartialEq for MemberHandle {
    fn eq(&self, other: &Self) -> bool {
        let same_target = match (&self.target, &other.target) {
            (HandleTarget::Field(a), HandleTarget::Field(b)) => Arc::ptr_eq(a, b),
            (HandleTarget::Method(a), HandleTarget::Method(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        same_target
            && self.value_type == other.value_type
            && self.requires_relaxation == other.requires_relaxation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AccessError;
    use crate::types::{FieldDecl, MethodDecl, TypeDefinition};

    fn secret_type() -> Arc<crate::types::TypeDescriptor> {
        TypeDefinition::class("vault.Secret")
            .field(FieldDecl::new("code", ValueType::INT).private())
            .method(MethodDecl::getter("peek", ValueType::INT, "code").private())
            .build(None)
            .unwrap()
    }

    #[test]
    fn test_guard_relaxes_and_restores() {
        let ty = secret_type();
        let field = ty.declared_field("code").unwrap();
        assert!(!field.is_accessible());
        {
            let guard = AccessGuard::acquire(field.as_ref());
            assert!(guard.relaxed());
            assert!(field.is_accessible());
        }
        assert!(!field.is_accessible());
    }

    #[test]
    fn test_guard_skips_accessible_members() {
        let ty = secret_type();
        let field = ty.declared_field("code").unwrap();
        field.access().set_overridden(true);
        let guard = AccessGuard::acquire(field.as_ref());
        assert!(!guard.relaxed());
        drop(guard);
        assert!(field.is_accessible());
        assert_eq!(field.access().relaxed_count(), 0);
    }

    #[test]
    fn test_overlapping_guards() {
        let ty = secret_type();
        let field = ty.declared_field("code").unwrap();
        let outer = AccessGuard::acquire(field.as_ref());
        let inner = AccessGuard::acquire(field.as_ref());
        assert!(outer.relaxed());
        assert!(inner.relaxed());
        assert_eq!(field.access().relaxed_count(), 2);
        drop(outer);
        assert!(field.is_accessible());
        drop(inner);
        assert!(!field.is_accessible());
        assert_eq!(field.access().relaxed_count(), 0);
    }

    #[test]
    fn test_guards_across_threads() {
        let ty = secret_type();
        let field = Arc::clone(ty.declared_field("code").unwrap());
        let object = Object::new(&ty);

        let workers: Vec<_> = (0..8)
            .map(|i| {
                let field = Arc::clone(&field);
                let object = Arc::clone(&object);
                std::thread::spawn(move || {
                    for n in 0..5_000 {
                        let _guard = AccessGuard::acquire(field.as_ref());
                        field.set(&object, Value::Int(i * n)).unwrap();
                        field.get(&object).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(field.access().relaxed_count(), 0);
        assert!(!field.is_accessible());
    }

    #[test]
    fn test_handle_read_write_restore_access() {
        let ty = secret_type();
        let object = Object::new(&ty);
        let handle = MemberHandle::field(Arc::clone(ty.declared_field("code").unwrap()));
        assert!(handle.requires_relaxation());

        handle.write(&object, Value::Int(42)).unwrap();
        assert_eq!(handle.read(&object).unwrap(), Value::Int(42));
        assert!(!ty.declared_field("code").unwrap().is_accessible());

        let err = handle.write(&object, Value::from("x")).unwrap_err();
        assert!(matches!(err, AccessError::TypeMismatch { .. }));
        assert!(!ty.declared_field("code").unwrap().is_accessible());
    }

    #[test]
    fn test_handle_invoke_does_not_relax() {
        let ty = secret_type();
        let object = Object::new(&ty);
        let handle = MemberHandle::method(Arc::clone(&ty.methods()[0]));
        assert_eq!(handle.value_type(), &ValueType::INT);
        assert!(matches!(
            handle.invoke(&object, &[]),
            Err(AccessError::IllegalAccess { .. })
        ));
        assert_eq!(handle.read(&object).unwrap(), Value::Int(0));
    }

    #[test]
    fn test_handle_equality() {
        let ty = secret_type();
        let field = Arc::clone(ty.declared_field("code").unwrap());
        assert_eq!(MemberHandle::field(Arc::clone(&field)), MemberHandle::field(field));
        assert_ne!(
            MemberHandle::field(Arc::clone(ty.declared_field("code").unwrap())),
            MemberHandle::method(Arc::clone(&ty.methods()[0]))
        );
    }
}
