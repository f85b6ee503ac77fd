//! Object instances

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::descriptor::{FieldStorage, TypeDescriptor};
use super::value::Value;

/// Shared reference to an object
pub type ObjectRef = Arc<Object>;

/// An instance of a loaded type
///
/// Holds one slot per instance field of the whole ancestor chain, ancestors
/// first. Static fields live on their [`FieldDef`](super::FieldDef).
pub struct Object {
    descriptor: Arc<TypeDescriptor>,
    slots: RwLock<Vec<Value>>,
}

impl Object {
    /// Allocate an instance with every field at its initial value
    pub fn new(descriptor: &Arc<TypeDescriptor>) -> ObjectRef {
        let mut chain: Vec<&TypeDescriptor> = descriptor.ancestry().collect();
        chain.reverse();

        let mut slots = Vec::with_capacity(descriptor.instance_slot_count());
        for ty in chain {
            for field in ty.fields().iter().filter(|f| !f.is_static()) {
                slots.push(field.initial_value().clone());
            }
        }

        Arc::new(Object {
            descriptor: Arc::clone(descriptor),
            slots: RwLock::new(slots),
        })
    }

    /// Runtime type
    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    /// Fully-qualified name of the runtime type
    pub fn type_name(&self) -> &str {
        self.descriptor.name()
    }

    /// Read a field by name, bypassing access control
    ///
    /// Intended for native method bodies. Looks the field up along the
    /// ancestor chain; `None` if no such field exists.
    pub fn read(&self, field: &str) -> Option<Value> {
        let def = self
            .descriptor
            .ancestry()
            .find_map(|ty| ty.declared_field(field))?;
        Some(match &def.storage {
            FieldStorage::Instance(slot) => self.slot(*slot),
            FieldStorage::Static(cell) => cell.read().clone(),
        })
    }

    /// Write a field by name, bypassing access control and type checks
    ///
    /// Returns `false` if no such field exists.
    pub fn write(&self, field: &str, value: Value) -> bool {
        let Some(def) = self
            .descriptor
            .ancestry()
            .find_map(|ty| ty.declared_field(field))
        else {
            return false;
        };
        match &def.storage {
            FieldStorage::Instance(slot) => self.set_slot(*slot, value),
            FieldStorage::Static(cell) => *cell.write() = value,
        }
        true
    }

    pub(crate) fn slot(&self, index: usize) -> Value {
        self.slots.read().get(index).cloned().unwrap_or(Value::Null)
    }

    pub(crate) fn set_slot(&self, index: usize, value: Value) {
        if let Some(slot) = self.slots.write().get_mut(index) {
            *slot = value;
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("type", &self.descriptor.name())
            .field("token", &self.descriptor.token())
            .field("slots", &self.slots.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldDecl, TypeDefinition, ValueType};

    fn point_type() -> Arc<TypeDescriptor> {
        TypeDefinition::class("geo.Point")
            .field(FieldDecl::new("x", ValueType::INT).private())
            .field(FieldDecl::new("y", ValueType::INT).private().initial_value(Value::Int(4)))
            .field(FieldDecl::constant("ORIGIN", ValueType::Str, Value::from("0,0")))
            .build(None)
            .unwrap()
    }

    #[test]
    fn test_new_object_initial_values() {
        let point = Object::new(&point_type());
        assert_eq!(point.read("x"), Some(Value::Int(0)));
        assert_eq!(point.read("y"), Some(Value::Int(4)));
        assert_eq!(point.read("ORIGIN"), Some(Value::from("0,0")));
        assert_eq!(point.read("z"), None);
    }

    #[test]
    fn test_raw_write() {
        let point = Object::new(&point_type());
        assert!(point.write("x", Value::Int(9)));
        assert!(!point.write("z", Value::Int(9)));
        assert_eq!(point.read("x"), Some(Value::Int(9)));
    }

    #[test]
    fn test_inherited_slots() {
        let base = point_type();
        let derived = TypeDefinition::class("geo.Point3")
            .extends("geo.Point")
            .field(FieldDecl::new("z", ValueType::INT).initial_value(Value::Int(7)))
            .build(Some(base))
            .unwrap();

        let p = Object::new(&derived);
        assert_eq!(p.read("y"), Some(Value::Int(4)));
        assert_eq!(p.read("z"), Some(Value::Int(7)));
        assert_eq!(p.type_name(), "geo.Point3");
    }
}
