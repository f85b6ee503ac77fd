//! Type definitions
//!
//! Builders for the unloaded form of a type. A [`TypeDefinition`] names its
//! parent by string; the registry resolves that name when it loads the
//! definition into a [`TypeDescriptor`].

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use super::descriptor::{
    AccessControl, FieldDef, FieldStorage, MethodBody, MethodDef, Modifiers, TypeDescriptor,
    TypeKind, TypeToken,
};
use super::object::Object;
use super::value::{Value, ValueType};
use crate::error::LoadError;

/// Definition for a field
#[derive(Debug, Clone)]
pub struct FieldDecl {
    /// Field name
    pub name: String,
    /// Declared type
    pub value_type: ValueType,
    /// Modifiers
    pub modifiers: Modifiers,
    /// Tags (annotation names)
    pub tags: Vec<String>,
    /// Initial value; the type's zero value when absent
    pub initial_value: Option<Value>,
}

impl FieldDecl {
    /// Package-private instance field
    pub fn new(name: &str, value_type: ValueType) -> Self {
        Self {
            name: name.to_string(),
            value_type,
            modifiers: Modifiers::default(),
            tags: Vec::new(),
            initial_value: None,
        }
    }

    /// Public static final field holding `value`
    pub fn constant(name: &str, value_type: ValueType, value: Value) -> Self {
        Self::new(name, value_type)
            .public()
            .as_static()
            .as_final()
            .initial_value(value)
    }

    /// Mark as public
    pub fn public(mut self) -> Self {
        self.modifiers.is_public = true;
        self
    }

    /// Mark as private
    pub fn private(mut self) -> Self {
        self.modifiers.is_private = true;
        self
    }

    /// Mark as protected
    pub fn protected(mut self) -> Self {
        self.modifiers.is_protected = true;
        self
    }

    /// Mark as static
    pub fn as_static(mut self) -> Self {
        self.modifiers.is_static = true;
        self
    }

    /// Mark as final
    pub fn as_final(mut self) -> Self {
        self.modifiers.is_final = true;
        self
    }

    /// Set the initial value
    pub fn initial_value(mut self, value: Value) -> Self {
        self.initial_value = Some(value);
        self
    }

    /// Attach a tag
    pub fn tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }
}

/// Definition for a method
#[derive(Clone)]
pub struct MethodDecl {
    /// Method name
    pub name: String,
    /// Parameter types
    pub params: Vec<ValueType>,
    /// Return type
    pub returns: ValueType,
    /// Modifiers
    pub modifiers: Modifiers,
    body: MethodBody,
}

impl MethodDecl {
    /// Package-private instance method with a native body
    pub fn new<F>(name: &str, params: Vec<ValueType>, returns: ValueType, body: F) -> Self
    where
        F: Fn(&Object, &[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            params,
            returns,
            modifiers: Modifiers::default(),
            body: Arc::new(body),
        }
    }

    /// Public zero-argument method returning the value of `field`
    pub fn getter(name: &str, returns: ValueType, field: &str) -> Self {
        let field = field.to_string();
        Self::new(name, Vec::new(), returns, move |this, _| {
            this.read(&field)
                .ok_or_else(|| format!("no field '{}' on {}", field, this.type_name()))
        })
        .public()
    }

    /// Public one-argument void method storing its argument in `field`
    pub fn setter(name: &str, param: ValueType, field: &str) -> Self {
        let field = field.to_string();
        Self::new(name, vec![param], ValueType::Void, move |this, args| {
            let value = args.first().cloned().unwrap_or(Value::Null);
            if this.write(&field, value) {
                Ok(Value::Null)
            } else {
                Err(format!("no field '{}' on {}", field, this.type_name()))
            }
        })
        .public()
    }

    /// Mark as public
    pub fn public(mut self) -> Self {
        self.modifiers.is_public = true;
        self
    }

    /// Mark as private
    pub fn private(mut self) -> Self {
        self.modifiers.is_private = true;
        self
    }

    /// Mark as static
    pub fn as_static(mut self) -> Self {
        self.modifiers.is_static = true;
        self
    }
}

impl std::fmt::Debug for MethodDecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodDecl")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("returns", &self.returns)
            .field("modifiers", &self.modifiers)
            .finish()
    }
}

/// Unloaded type: name, parent name, members
#[derive(Debug, Clone)]
pub struct TypeDefinition {
    name: String,
    kind: TypeKind,
    parent: Option<String>,
    fields: Vec<FieldDecl>,
    methods: Vec<MethodDecl>,
    origin: Option<PathBuf>,
}

impl TypeDefinition {
    /// Class with no members
    pub fn class(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: TypeKind::Class,
            parent: None,
            fields: Vec::new(),
            methods: Vec::new(),
            origin: None,
        }
    }

    /// Enumeration; each variant becomes a public constant of the enum type
    pub fn enumeration(name: &str, variants: &[&str]) -> Self {
        let mut def = Self::class(name);
        def.kind = TypeKind::Enum(variants.iter().map(|v| v.to_string()).collect());
        for variant in variants {
            def.fields.push(FieldDecl::constant(
                variant,
                ValueType::enumeration(name),
                Value::enum_variant(name, variant),
            ));
        }
        def
    }

    /// Set the parent type by name
    pub fn extends(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    /// Add a field
    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a method
    pub fn method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }

    /// Record where the type was loaded from
    pub fn origin(mut self, origin: impl Into<PathBuf>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Fully-qualified name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent name
    pub fn parent_name(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Build a descriptor on top of the already-loaded parent
    pub(crate) fn build(
        &self,
        parent: Option<Arc<TypeDescriptor>>,
    ) -> Result<Arc<TypeDescriptor>, LoadError> {
        if let Some(expected) = &self.parent {
            if parent.as_ref().map(|p| p.name()) != Some(expected.as_str()) {
                return Err(LoadError::Linkage {
                    name: self.name.clone(),
                    missing: expected.clone(),
                });
            }
        }

        let owner: Arc<str> = Arc::from(self.name.as_str());
        let mut next_slot = parent.as_ref().map_or(0, |p| p.instance_slot_count());

        let fields = self
            .fields
            .iter()
            .map(|decl| {
                let initial = decl
                    .initial_value
                    .clone()
                    .unwrap_or_else(|| decl.value_type.default_value());
                let storage = if decl.modifiers.is_static {
                    FieldStorage::Static(RwLock::new(initial.clone()))
                } else {
                    next_slot += 1;
                    FieldStorage::Instance(next_slot - 1)
                };
                Arc::new(FieldDef {
                    owner: Arc::clone(&owner),
                    name: decl.name.clone(),
                    value_type: decl.value_type.clone(),
                    modifiers: decl.modifiers,
                    tags: decl.tags.clone(),
                    initial,
                    storage,
                    access: AccessControl::default(),
                })
            })
            .collect();

        let methods = self
            .methods
            .iter()
            .map(|decl| {
                Arc::new(MethodDef {
                    owner: Arc::clone(&owner),
                    name: decl.name.clone(),
                    params: decl.params.clone(),
                    returns: decl.returns.clone(),
                    modifiers: decl.modifiers,
                    access: AccessControl::default(),
                    body: Arc::clone(&decl.body),
                })
            })
            .collect();

        Ok(Arc::new(TypeDescriptor {
            token: TypeToken::new(),
            name: owner,
            kind: self.kind.clone(),
            parent,
            fields,
            methods,
            instance_slots: next_slot,
            origin: self.origin.clone(),
        }))
    }
}
