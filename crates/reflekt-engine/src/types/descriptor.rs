//! Runtime type descriptors
//!
//! A [`TypeDescriptor`] is the loaded form of a type: its name, its parent,
//! its declared fields and methods. Descriptors are immutable once built and
//! shared as `Arc<TypeDescriptor>`. The only mutable state on a member is its
//! [`AccessControl`], which tracks accessibility overrides.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::object::Object;
use super::value::{Value, ValueType};
use crate::error::{AccessError, AccessResult};

// ============================================================================
// Identity
// ============================================================================

/// Unique identity of a loaded type
///
/// Two descriptors built from the same definition (for example after a
/// registry reload) carry different tokens.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeToken(u64);

static NEXT_TYPE_TOKEN: AtomicU64 = AtomicU64::new(1);

impl TypeToken {
    /// Generate a new unique token
    pub fn new() -> Self {
        TypeToken(NEXT_TYPE_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    /// Numeric value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Default for TypeToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TypeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

// ============================================================================
// Modifiers and access control
// ============================================================================

/// Member modifiers
///
/// No visibility flag set means package-private.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Public visibility
    pub is_public: bool,
    /// Private visibility
    pub is_private: bool,
    /// Protected visibility
    pub is_protected: bool,
    /// Static member
    pub is_static: bool,
    /// Final member
    pub is_final: bool,
}

impl Modifiers {
    /// Public, non-static, non-final
    pub const fn public() -> Self {
        Modifiers {
            is_public: true,
            is_private: false,
            is_protected: false,
            is_static: false,
            is_final: false,
        }
    }

    /// Private, non-static, non-final
    pub const fn private() -> Self {
        Modifiers {
            is_public: false,
            is_private: true,
            is_protected: false,
            is_static: false,
            is_final: false,
        }
    }

    /// Static and final
    pub fn is_constant(&self) -> bool {
        self.is_static && self.is_final
    }

    /// Visibility keyword, empty for package-private
    pub fn visibility(&self) -> &'static str {
        if self.is_public {
            "public"
        } else if self.is_protected {
            "protected"
        } else if self.is_private {
            "private"
        } else {
            ""
        }
    }
}

/// Accessibility state of a single member
///
/// `overridden` is a persistent grant. `relaxed` counts scoped grants held
/// by live access guards, so overlapping guards never revoke each other.
#[derive(Debug, Default)]
pub struct AccessControl {
    overridden: AtomicBool,
    relaxed: AtomicUsize,
}

impl AccessControl {
    /// Whether access is currently granted beyond the declared visibility
    pub fn is_granted(&self) -> bool {
        self.is_overridden() || self.relaxed_count() > 0
    }

    /// Whether a persistent grant is set
    pub fn is_overridden(&self) -> bool {
        self.overridden.load(Ordering::Acquire)
    }

    /// Set or clear the persistent grant
    pub fn set_overridden(&self, granted: bool) {
        self.overridden.store(granted, Ordering::Release);
    }

    /// Number of scoped grants currently held
    pub fn relaxed_count(&self) -> usize {
        self.relaxed.load(Ordering::Acquire)
    }

    pub(crate) fn relax(&self) {
        self.relaxed.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn restore(&self) {
        self.relaxed.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Common view over fields and methods
pub trait Member {
    /// Name of the declaring type
    fn owner(&self) -> &str;

    /// Member name
    fn name(&self) -> &str;

    /// Declared modifiers
    fn modifiers(&self) -> Modifiers;

    /// Accessibility state
    fn access(&self) -> &AccessControl;

    /// Whether the member can be used without relaxation right now
    fn is_accessible(&self) -> bool {
        self.modifiers().is_public || self.access().is_granted()
    }

    /// Error returned when the member is used while inaccessible
    fn illegal_access(&self) -> AccessError {
        AccessError::IllegalAccess {
            owner: self.owner().to_string(),
            member: self.name().to_string(),
        }
    }
}

// ============================================================================
// Fields
// ============================================================================

#[derive(Debug)]
pub(crate) enum FieldStorage {
    Instance(usize),
    Static(RwLock<Value>),
}

/// A declared field
#[derive(Debug)]
pub struct FieldDef {
    pub(crate) owner: Arc<str>,
    pub(crate) name: String,
    pub(crate) value_type: ValueType,
    pub(crate) modifiers: Modifiers,
    pub(crate) tags: Vec<String>,
    pub(crate) initial: Value,
    pub(crate) storage: FieldStorage,
    pub(crate) access: AccessControl,
}

impl FieldDef {
    /// Declared type
    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    /// Tags (annotation names) attached to the field
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Whether the field carries `tag`
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Whether the field is static
    pub fn is_static(&self) -> bool {
        self.modifiers.is_static
    }

    /// Whether the field is static and final
    pub fn is_constant(&self) -> bool {
        self.modifiers.is_constant()
    }

    /// Instance slot index; `None` for static fields
    pub fn slot(&self) -> Option<usize> {
        match self.storage {
            FieldStorage::Instance(slot) => Some(slot),
            FieldStorage::Static(_) => None,
        }
    }

    /// Value a new instance (or the static cell) starts with
    pub fn initial_value(&self) -> &Value {
        &self.initial
    }

    /// Read the field on `target`, failing if it is not accessible
    pub fn get(&self, target: &Object) -> AccessResult<Value> {
        if !self.is_accessible() {
            return Err(self.illegal_access());
        }
        self.load(target)
    }

    /// Read a static field, failing if it is not accessible
    pub fn get_static(&self) -> AccessResult<Value> {
        if !self.is_accessible() {
            return Err(self.illegal_access());
        }
        match &self.storage {
            FieldStorage::Static(cell) => Ok(cell.read().clone()),
            FieldStorage::Instance(_) => Err(AccessError::WrongReceiver {
                owner: self.owner.to_string(),
                receiver: "static context".to_string(),
            }),
        }
    }

    /// Write the field on `target`, failing if it is not accessible,
    /// is a constant, or the value does not fit the declared type
    pub fn set(&self, target: &Object, value: Value) -> AccessResult<()> {
        if !self.is_accessible() || self.is_constant() {
            return Err(self.illegal_access());
        }
        let coerced = self
            .value_type
            .coerce(&value)
            .ok_or_else(|| AccessError::TypeMismatch {
                owner: self.owner.to_string(),
                member: self.name.clone(),
                expected: self.value_type.clone(),
                found: value.describe(),
            })?;
        self.store(target, coerced)
    }

    pub(crate) fn load(&self, target: &Object) -> AccessResult<Value> {
        match &self.storage {
            FieldStorage::Static(cell) => Ok(cell.read().clone()),
            FieldStorage::Instance(slot) => {
                self.check_receiver(target)?;
                Ok(target.slot(*slot))
            }
        }
    }

    pub(crate) fn store(&self, target: &Object, value: Value) -> AccessResult<()> {
        match &self.storage {
            FieldStorage::Static(cell) => {
                *cell.write() = value;
                Ok(())
            }
            FieldStorage::Instance(slot) => {
                self.check_receiver(target)?;
                target.set_slot(*slot, value);
                Ok(())
            }
        }
    }

    fn check_receiver(&self, target: &Object) -> AccessResult<()> {
        if target.descriptor().is_a(&self.owner) {
            Ok(())
        } else {
            Err(AccessError::WrongReceiver {
                owner: self.owner.to_string(),
                receiver: target.type_name().to_string(),
            })
        }
    }
}

impl Member for FieldDef {
    fn owner(&self) -> &str {
        &self.owner
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    fn access(&self) -> &AccessControl {
        &self.access
    }
}

// ============================================================================
// Methods
// ============================================================================

/// Native method body: receives the receiver and the coerced arguments
pub type MethodBody = Arc<dyn Fn(&Object, &[Value]) -> Result<Value, String> + Send + Sync>;

/// A declared method
pub struct MethodDef {
    pub(crate) owner: Arc<str>,
    pub(crate) name: String,
    pub(crate) params: Vec<ValueType>,
    pub(crate) returns: ValueType,
    pub(crate) modifiers: Modifiers,
    pub(crate) access: AccessControl,
    pub(crate) body: MethodBody,
}

impl MethodDef {
    /// Parameter types
    pub fn params(&self) -> &[ValueType] {
        &self.params
    }

    /// Return type
    pub fn returns(&self) -> &ValueType {
        &self.returns
    }

    /// Whether the method is static
    pub fn is_static(&self) -> bool {
        self.modifiers.is_static
    }

    /// `name(param, ...)`
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
        format!("{}({})", self.name, params.join(", "))
    }

    /// Invoke on `target`, failing if the method is not accessible
    pub fn invoke(&self, target: &Object, args: &[Value]) -> AccessResult<Value> {
        if !self.is_accessible() {
            return Err(self.illegal_access());
        }
        self.call(target, args)
    }

    pub(crate) fn call(&self, target: &Object, args: &[Value]) -> AccessResult<Value> {
        if args.len() != self.params.len() {
            return Err(self.invocation_error(format!(
                "expected {} argument(s), got {}",
                self.params.len(),
                args.len()
            )));
        }

        let coerced = self
            .params
            .iter()
            .zip(args)
            .map(|(ty, arg)| {
                ty.coerce(arg).ok_or_else(|| AccessError::TypeMismatch {
                    owner: self.owner.to_string(),
                    member: self.name.clone(),
                    expected: ty.clone(),
                    found: arg.describe(),
                })
            })
            .collect::<AccessResult<Vec<_>>>()?;

        if !self.is_static() && !target.descriptor().is_a(&self.owner) {
            return Err(AccessError::WrongReceiver {
                owner: self.owner.to_string(),
                receiver: target.type_name().to_string(),
            });
        }

        (self.body)(target, &coerced).map_err(|message| self.invocation_error(message))
    }

    fn invocation_error(&self, message: String) -> AccessError {
        AccessError::Invocation {
            owner: self.owner.to_string(),
            method: self.name.clone(),
            message,
        }
    }
}

impl Member for MethodDef {
    fn owner(&self) -> &str {
        &self.owner
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    fn access(&self) -> &AccessControl {
        &self.access
    }
}

impl fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDef")
            .field("owner", &self.owner)
            .field("signature", &self.signature())
            .field("returns", &self.returns)
            .field("modifiers", &self.modifiers)
            .finish()
    }
}

// ============================================================================
// Types
// ============================================================================

/// Kind of type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// Ordinary class
    Class,
    /// Enumeration with its constants in declaration order
    Enum(Vec<String>),
}

/// A loaded type
#[derive(Debug)]
pub struct TypeDescriptor {
    pub(crate) token: TypeToken,
    pub(crate) name: Arc<str>,
    pub(crate) kind: TypeKind,
    pub(crate) parent: Option<Arc<TypeDescriptor>>,
    pub(crate) fields: Vec<Arc<FieldDef>>,
    pub(crate) methods: Vec<Arc<MethodDef>>,
    pub(crate) instance_slots: usize,
    pub(crate) origin: Option<PathBuf>,
}

impl TypeDescriptor {
    /// Unique identity
    pub fn token(&self) -> TypeToken {
        self.token
    }

    /// Fully-qualified name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without the namespace
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Namespace (empty for the root namespace)
    pub fn namespace(&self) -> &str {
        self.name.rsplit_once('.').map(|(ns, _)| ns).unwrap_or("")
    }

    /// Kind
    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// Direct ancestor
    pub fn parent(&self) -> Option<&Arc<TypeDescriptor>> {
        self.parent.as_ref()
    }

    /// Fields declared on this type, in declaration order
    pub fn fields(&self) -> &[Arc<FieldDef>] {
        &self.fields
    }

    /// Methods declared on this type, in declaration order
    pub fn methods(&self) -> &[Arc<MethodDef>] {
        &self.methods
    }

    /// Field declared on this type (ancestors not consulted)
    pub fn declared_field(&self, name: &str) -> Option<&Arc<FieldDef>> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Methods declared on this type with the given name
    pub fn declared_methods<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Arc<MethodDef>> + 'a {
        self.methods.iter().filter(move |m| m.name == name)
    }

    /// This type followed by each ancestor
    pub fn ancestry(&self) -> impl Iterator<Item = &TypeDescriptor> {
        std::iter::successors(Some(self), |ty| ty.parent.as_deref())
    }

    /// Whether this type is `name` or inherits from it
    pub fn is_a(&self, name: &str) -> bool {
        self.ancestry().any(|ty| &*ty.name == name)
    }

    /// Total instance slots, ancestors included
    pub fn instance_slot_count(&self) -> usize {
        self.instance_slots
    }

    /// Archive or directory the type was loaded from
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
