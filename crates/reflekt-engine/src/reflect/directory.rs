//! Member lookup along the inheritance chain

use std::sync::Arc;

use crate::types::{FieldDef, MethodDef, TypeDescriptor, Value, ValueType};

/// Find a field by name on `ty` or the nearest ancestor declaring it
pub fn find_member(name: &str, ty: &TypeDescriptor) -> Option<Arc<FieldDef>> {
    ty.ancestry()
        .find_map(|current| current.declared_field(name))
        .cloned()
}

/// Find a method with exactly the given parameter types
///
/// Subclass declarations shadow ancestors; within one type the first
/// declaration wins.
pub fn find_method(ty: &TypeDescriptor, name: &str, params: &[ValueType]) -> Option<Arc<MethodDef>> {
    ty.ancestry()
        .flat_map(|current| current.declared_methods(name))
        .find(|method| method.params() == params)
        .cloned()
}

/// Find a one-parameter method whose parameter accepts values of type `arg`
pub fn find_method_accepting(
    ty: &TypeDescriptor,
    name: &str,
    arg: &ValueType,
) -> Option<Arc<MethodDef>> {
    ty.ancestry()
        .flat_map(|current| current.declared_methods(name))
        .find(|method| matches!(method.params(), [param] if param.is_assignable_from(arg)))
        .cloned()
}

/// Find a method that can be called with `args`
///
/// `Null` arguments match any non-primitive parameter.
pub fn find_method_for_args(ty: &TypeDescriptor, name: &str, args: &[Value]) -> Option<Arc<MethodDef>> {
    ty.ancestry()
        .flat_map(|current| current.declared_methods(name))
        .find(|method| {
            method.params().len() == args.len()
                && method.params().iter().zip(args).all(|(param, arg)| match arg.value_type() {
                    Some(actual) => param.is_assignable_from(&actual),
                    None => !param.is_primitive(),
                })
        })
        .cloned()
}

/// Whether `ty` itself declares a field called `name`
pub fn declares_field(ty: &TypeDescriptor, name: &str) -> bool {
    ty.declared_field(name).is_some()
}

/// `ty` followed by each ancestor
pub fn hierarchy(ty: &Arc<TypeDescriptor>) -> Vec<Arc<TypeDescriptor>> {
    let mut chain = Vec::new();
    let mut current = Some(Arc::clone(ty));

    while let Some(descriptor) = current {
        current = descriptor.parent().cloned();
        chain.push(descriptor);
    }

    chain
}
