//! Runtime type model
//!
//! Values, declared types, type definitions and descriptors, objects, and
//! the registry that loads descriptors by name.

mod definition;
mod descriptor;
mod object;
mod registry;
mod value;

pub use definition::{FieldDecl, MethodDecl, TypeDefinition};
pub use descriptor::{
    AccessControl, FieldDef, Member, MethodBody, MethodDef, Modifiers, TypeDescriptor, TypeKind,
    TypeToken,
};
pub use object::{Object, ObjectRef};
pub use registry::{TypeLoader, TypeRegistry};
pub use value::{PrimitiveKind, Value, ValueType};
