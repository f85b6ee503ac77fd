//! Dynamic values and declared value types
//!
//! `Value` is what flows through reads, writes and method calls. `ValueType`
//! is what fields, parameters and return types declare. Assignment goes
//! through [`ValueType::coerce`], which applies primitive widening
//! (byte -> short -> int -> long -> float -> double, char -> int) and lets
//! `Null` through for every non-primitive type.

use std::fmt;
use std::sync::Arc;

use super::object::ObjectRef;

// ============================================================================
// Primitive kinds
// ============================================================================

/// Primitive value kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// Boolean
    Bool,
    /// UTF-32 character
    Char,
    /// 8-bit signed integer
    Byte,
    /// 16-bit signed integer
    Short,
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
}

impl PrimitiveKind {
    /// Source-level name
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "boolean",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }

    /// Whether this kind holds a number
    pub fn is_numeric(self) -> bool {
        !matches!(self, PrimitiveKind::Bool | PrimitiveKind::Char)
    }

    fn numeric_rank(self) -> Option<u8> {
        match self {
            PrimitiveKind::Byte => Some(0),
            PrimitiveKind::Short => Some(1),
            PrimitiveKind::Int => Some(2),
            PrimitiveKind::Long => Some(3),
            PrimitiveKind::Float => Some(4),
            PrimitiveKind::Double => Some(5),
            PrimitiveKind::Bool | PrimitiveKind::Char => None,
        }
    }

    /// Whether a value of this kind can be assigned to `target` without loss
    pub fn widens_to(self, target: PrimitiveKind) -> bool {
        if self == target {
            return true;
        }
        if self == PrimitiveKind::Char {
            return target.numeric_rank().is_some_and(|rank| rank >= 2);
        }
        match (self.numeric_rank(), target.numeric_rank()) {
            (Some(from), Some(to)) => from < to,
            _ => false,
        }
    }

    /// Zero value of this kind
    pub fn default_value(self) -> Value {
        match self {
            PrimitiveKind::Bool => Value::Bool(false),
            PrimitiveKind::Char => Value::Char('\0'),
            PrimitiveKind::Byte => Value::Byte(0),
            PrimitiveKind::Short => Value::Short(0),
            PrimitiveKind::Int => Value::Int(0),
            PrimitiveKind::Long => Value::Long(0),
            PrimitiveKind::Float => Value::Float(0.0),
            PrimitiveKind::Double => Value::Double(0.0),
        }
    }
}

// ============================================================================
// Declared types
// ============================================================================

/// Declared type of a field, parameter or return value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// No value (method returns only)
    Void,
    /// Primitive kind
    Primitive(PrimitiveKind),
    /// String
    Str,
    /// Byte array
    Bytes,
    /// Enumeration type, by fully-qualified name
    Enum(Arc<str>),
    /// Homogeneous list
    List(Box<ValueType>),
    /// Class type, by fully-qualified name
    Class(Arc<str>),
    /// Any non-void value
    Any,
}

impl ValueType {
    /// `boolean`
    pub const BOOL: ValueType = ValueType::Primitive(PrimitiveKind::Bool);
    /// `char`
    pub const CHAR: ValueType = ValueType::Primitive(PrimitiveKind::Char);
    /// `byte`
    pub const BYTE: ValueType = ValueType::Primitive(PrimitiveKind::Byte);
    /// `short`
    pub const SHORT: ValueType = ValueType::Primitive(PrimitiveKind::Short);
    /// `int`
    pub const INT: ValueType = ValueType::Primitive(PrimitiveKind::Int);
    /// `long`
    pub const LONG: ValueType = ValueType::Primitive(PrimitiveKind::Long);
    /// `float`
    pub const FLOAT: ValueType = ValueType::Primitive(PrimitiveKind::Float);
    /// `double`
    pub const DOUBLE: ValueType = ValueType::Primitive(PrimitiveKind::Double);

    /// Class type by name
    pub fn class(name: &str) -> Self {
        ValueType::Class(Arc::from(name))
    }

    /// Enumeration type by name
    pub fn enumeration(name: &str) -> Self {
        ValueType::Enum(Arc::from(name))
    }

    /// List of `element`
    pub fn list(element: ValueType) -> Self {
        ValueType::List(Box::new(element))
    }

    /// Primitive kind, if this is a primitive type
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self {
            ValueType::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Whether this is a primitive type
    pub fn is_primitive(&self) -> bool {
        matches!(self, ValueType::Primitive(_))
    }

    /// Whether this is an enumeration type
    pub fn is_enum(&self) -> bool {
        matches!(self, ValueType::Enum(_))
    }

    /// Whether this is a collection type
    pub fn is_collection(&self) -> bool {
        matches!(self, ValueType::List(_))
    }

    /// Whether this is `Void`
    pub fn is_void(&self) -> bool {
        matches!(self, ValueType::Void)
    }

    /// Name of the declared class or enum, if any
    pub fn type_name(&self) -> Option<&str> {
        match self {
            ValueType::Class(name) | ValueType::Enum(name) => Some(name),
            _ => None,
        }
    }

    /// Zero value used when a member of this type is reset
    pub fn default_value(&self) -> Value {
        match self {
            ValueType::Primitive(kind) => kind.default_value(),
            _ => Value::Null,
        }
    }

    /// Type-level assignability: can a value whose runtime type is `source`
    /// be assigned to a slot of this type
    pub fn is_assignable_from(&self, source: &ValueType) -> bool {
        match (self, source) {
            (ValueType::Void, _) | (_, ValueType::Void) => false,
            (ValueType::Any, _) => true,
            (ValueType::Primitive(to), ValueType::Primitive(from)) => from.widens_to(*to),
            (ValueType::List(to), ValueType::List(from)) => {
                **from == ValueType::Any || to.is_assignable_from(from)
            }
            (to, from) => to == from,
        }
    }

    /// Convert `value` for storage in a slot of this type
    ///
    /// Returns `None` when the value is not assignable.
    pub fn coerce(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (ValueType::Void, _) => None,
            (ValueType::Any, value) => Some(value.clone()),
            (ValueType::Primitive(kind), value) => value.widen(*kind),
            (_, Value::Null) => Some(Value::Null),
            (ValueType::Str, Value::Str(_)) | (ValueType::Bytes, Value::Bytes(_)) => {
                Some(value.clone())
            }
            (ValueType::Enum(name), Value::Enum { type_name, .. }) if name == type_name => {
                Some(value.clone())
            }
            (ValueType::List(element), Value::List(items)) => items
                .iter()
                .map(|item| element.coerce(item))
                .collect::<Option<Vec<_>>>()
                .map(Value::List),
            (ValueType::Class(name), Value::Object(object)) if object.descriptor().is_a(name) => {
                Some(value.clone())
            }
            _ => None,
        }
    }

    /// Whether `value` can be assigned to a slot of this type
    pub fn accepts(&self, value: &Value) -> bool {
        self.coerce(value).is_some()
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Void => write!(f, "void"),
            ValueType::Primitive(kind) => write!(f, "{}", kind.name()),
            ValueType::Str => write!(f, "String"),
            ValueType::Bytes => write!(f, "byte[]"),
            ValueType::Enum(name) | ValueType::Class(name) => write!(f, "{}", name),
            ValueType::List(element) => write!(f, "List<{}>", element),
            ValueType::Any => write!(f, "Object"),
        }
    }
}

// ============================================================================
// Values
// ============================================================================

/// A dynamically typed value
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent value
    Null,
    /// Boolean
    Bool(bool),
    /// Character
    Char(char),
    /// 8-bit integer
    Byte(i8),
    /// 16-bit integer
    Short(i16),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// String
    Str(String),
    /// Byte array
    Bytes(Vec<u8>),
    /// Enumeration constant
    Enum {
        /// Enumeration type name
        type_name: Arc<str>,
        /// Constant name
        variant: String,
    },
    /// List of values
    List(Vec<Value>),
    /// Reference to an object (compared by identity)
    Object(ObjectRef),
}

impl Value {
    /// Enumeration constant
    pub fn enum_variant(type_name: &str, variant: &str) -> Self {
        Value::Enum {
            type_name: Arc::from(type_name),
            variant: variant.to_string(),
        }
    }

    /// Whether this is `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Runtime primitive kind, if this is a primitive value
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        Some(match self {
            Value::Bool(_) => PrimitiveKind::Bool,
            Value::Char(_) => PrimitiveKind::Char,
            Value::Byte(_) => PrimitiveKind::Byte,
            Value::Short(_) => PrimitiveKind::Short,
            Value::Int(_) => PrimitiveKind::Int,
            Value::Long(_) => PrimitiveKind::Long,
            Value::Float(_) => PrimitiveKind::Float,
            Value::Double(_) => PrimitiveKind::Double,
            _ => return None,
        })
    }

    /// Runtime type of this value; `None` for `Null`
    ///
    /// Lists report `List<Object>`: element types are only checked on
    /// assignment.
    pub fn value_type(&self) -> Option<ValueType> {
        if let Some(kind) = self.primitive_kind() {
            return Some(ValueType::Primitive(kind));
        }
        match self {
            Value::Null => None,
            Value::Str(_) => Some(ValueType::Str),
            Value::Bytes(_) => Some(ValueType::Bytes),
            Value::Enum { type_name, .. } => Some(ValueType::Enum(Arc::clone(type_name))),
            Value::List(_) => Some(ValueType::list(ValueType::Any)),
            Value::Object(object) => Some(ValueType::Class(Arc::from(object.type_name()))),
            _ => None,
        }
    }

    /// Short description used in error messages
    pub fn describe(&self) -> String {
        match self.value_type() {
            Some(ty) => ty.to_string(),
            None => "null".to_string(),
        }
    }

    /// Boolean payload
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integral payload (chars as code points)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Char(c) => Some(*c as i64),
            Value::Byte(n) => Some(*n as i64),
            Value::Short(n) => Some(*n as i64),
            Value::Int(n) => Some(*n as i64),
            Value::Long(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric payload
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n as f64),
            Value::Double(n) => Some(*n),
            other => other.as_i64().map(|n| n as f64),
        }
    }

    /// String payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Object payload
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Widen a primitive value to `target`
    fn widen(&self, target: PrimitiveKind) -> Option<Value> {
        let source = self.primitive_kind()?;
        if !source.widens_to(target) {
            return None;
        }
        if source == target {
            return Some(self.clone());
        }
        Some(match target {
            PrimitiveKind::Short => Value::Short(self.as_i64()? as i16),
            PrimitiveKind::Int => Value::Int(self.as_i64()? as i32),
            PrimitiveKind::Long => Value::Long(self.as_i64()?),
            PrimitiveKind::Float => Value::Float(self.as_f64()? as f32),
            PrimitiveKind::Double => Value::Double(self.as_f64()?),
            PrimitiveKind::Bool | PrimitiveKind::Char | PrimitiveKind::Byte => return None,
        })
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (
                Value::Enum {
                    type_name: ta,
                    variant: va,
                },
                Value::Enum {
                    type_name: tb,
                    variant: vb,
                },
            ) => ta == tb && va == vb,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Char(c) => write!(f, "{}", c),
            Value::Byte(n) => write!(f, "{}", n),
            Value::Short(n) => write!(f, "{}", n),
            Value::Int(n) => write!(f, "{}", n),
            Value::Long(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Double(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
            Value::Enum { variant, .. } => write!(f, "{}", variant),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Object(object) => write!(f, "{}@{}", object.type_name(), object.descriptor().token()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Long(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Double(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<ObjectRef> for Value {
    fn from(object: ObjectRef) -> Self {
        Value::Object(object)
    }
}
