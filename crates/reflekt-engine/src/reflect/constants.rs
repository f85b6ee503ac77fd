//! Constant extraction and declared-field listing

use std::sync::Arc;

use super::access::AccessGuard;
use super::bean::base_value_types;
use crate::error::AccessResult;
use crate::types::{FieldDef, TypeDescriptor, Value, ValueType};

/// Namespace prefixes of platform library types
pub const DEFAULT_SYSTEM_NAMESPACES: &[&str] = &[
    "java.",
    "javax.",
    "javafx.",
    "com.sun.",
    "com.oracle.",
    "org.apache.",
    "jdk.",
    "org.w3c.",
    "org.xml.",
    "org.ietf.",
];

/// Whether `field` is static and final
pub fn is_constant(field: &FieldDef) -> bool {
    field.is_constant()
}

/// Values of the constants declared on `ty`, in declaration order
///
/// Each value is read under a scoped access guard, so private constants are
/// included.
pub fn list_constants(ty: &TypeDescriptor) -> AccessResult<Vec<Value>> {
    ty.fields()
        .iter()
        .filter(|field| is_constant(field))
        .map(|field| {
            let _guard = AccessGuard::acquire(field.as_ref());
            field.get_static()
        })
        .collect()
}

/// Filter for [`declared_fields`]
#[derive(Debug, Clone)]
pub struct FieldFilter {
    /// Drop fields whose type is a user-defined class
    pub exclude_custom_types: bool,
    /// Keep collection-typed fields
    pub include_collections: bool,
    /// Drop fields carrying any of these tags
    pub bypass_tags: Vec<String>,
    /// Prefixes that mark a type as a platform library type
    pub system_namespaces: Vec<String>,
}

impl Default for FieldFilter {
    fn default() -> Self {
        Self {
            exclude_custom_types: false,
            include_collections: true,
            bypass_tags: Vec::new(),
            system_namespaces: DEFAULT_SYSTEM_NAMESPACES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FieldFilter {
    /// Whether `ty` belongs to the platform library
    ///
    /// Strings, byte arrays, lists and `Any` are library types; primitives
    /// are not; named types are by namespace prefix.
    pub fn is_system_type(&self, ty: &ValueType) -> bool {
        match ty {
            ValueType::Primitive(_) => false,
            ValueType::Class(name) | ValueType::Enum(name) => self
                .system_namespaces
                .iter()
                .any(|prefix| name.starts_with(prefix.as_str())),
            ValueType::Str | ValueType::Bytes | ValueType::List(_) | ValueType::Any | ValueType::Void => {
                true
            }
        }
    }

    /// Whether `field` passes
    pub fn matches(&self, field: &FieldDef) -> bool {
        let ty = field.value_type();
        let kept_by_type = (!self.exclude_custom_types && !self.is_system_type(ty))
            || base_value_types().contains(ty)
            || ty.is_primitive()
            || ty.is_enum()
            || (self.include_collections && ty.is_collection());
        kept_by_type && !self.bypass_tags.iter().any(|tag| field.has_tag(tag))
    }
}

/// Fields declared on `ty` itself that pass `filter`, in declaration order
pub fn declared_fields(ty: &TypeDescriptor, filter: &FieldFilter) -> Vec<Arc<FieldDef>> {
    ty.fields()
        .iter()
        .filter(|field| filter.matches(field))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldDecl, Member, TypeDefinition};

    fn settings_type() -> Arc<TypeDescriptor> {
        TypeDefinition::class("app.Settings")
            .field(FieldDecl::constant("VERSION", ValueType::INT, Value::Int(3)))
            .field(FieldDecl::new("counter", ValueType::INT).as_static())
            .field(
                FieldDecl::new("SECRET", ValueType::Str)
                    .private()
                    .as_static()
                    .as_final()
                    .initial_value(Value::from("hunter2")),
            )
            .field(FieldDecl::new("name", ValueType::Str).private())
            .field(FieldDecl::new("parent", ValueType::class("app.Settings")).private())
            .field(FieldDecl::new("lock", ValueType::class("java.util.concurrent.Lock")))
            .field(FieldDecl::new("aliases", ValueType::list(ValueType::Str)))
            .field(FieldDecl::new("cache", ValueType::Any).tag("Transient"))
            .field(FieldDecl::new("mode", ValueType::enumeration("app.Mode")).tag("Transient"))
            .build(None)
            .unwrap()
    }

    fn names(fields: &[Arc<FieldDef>]) -> Vec<&str> {
        fields.iter().map(|f| f.name()).collect()
    }

    #[test]
    fn test_list_constants_in_order() {
        let ty = settings_type();
        assert_eq!(
            list_constants(&ty).unwrap(),
            vec![Value::Int(3), Value::from("hunter2")]
        );
        assert!(!ty.declared_field("SECRET").unwrap().is_accessible());
    }

    #[test]
    fn test_list_constants_empty() {
        let ty = TypeDefinition::class("app.Empty").build(None).unwrap();
        assert!(list_constants(&ty).unwrap().is_empty());
    }

    #[test]
    fn test_declared_fields_default_filter() {
        let ty = settings_type();
        let fields = declared_fields(&ty, &FieldFilter::default());
        assert_eq!(
            names(&fields),
            vec!["VERSION", "counter", "SECRET", "name", "parent", "aliases", "mode"]
        );
    }

    #[test]
    fn test_declared_fields_excluding_custom_types() {
        let ty = settings_type();
        let filter = FieldFilter {
            exclude_custom_types: true,
            include_collections: false,
            bypass_tags: vec!["Transient".to_string()],
            ..FieldFilter::default()
        };
        assert_eq!(
            names(&declared_fields(&ty, &filter)),
            vec!["VERSION", "counter", "SECRET", "name"]
        );
    }

    #[test]
    fn test_system_types() {
        let filter = FieldFilter::default();
        assert!(filter.is_system_type(&ValueType::class("java.util.Map")));
        assert!(filter.is_system_type(&ValueType::Str));
        assert!(!filter.is_system_type(&ValueType::INT));
        assert!(!filter.is_system_type(&ValueType::class("app.Settings")));
    }
}
