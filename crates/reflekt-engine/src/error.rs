//! Error types for type loading and member access

use thiserror::Error;

use crate::types::ValueType;

/// Errors raised while reading, writing or invoking a member
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AccessError {
    /// Neither a member nor an accessor method with that name exists on the type
    #[error("No member '{member}' on {owner}")]
    MemberNotFound {
        /// Type the lookup started from
        owner: String,
        /// Requested member name
        member: String,
    },

    /// A method body returned an error
    #[error("Invocation of {owner}.{method} failed: {message}")]
    Invocation {
        /// Declaring type
        owner: String,
        /// Method name
        method: String,
        /// Message produced by the body
        message: String,
    },

    /// The member is not accessible and was used without relaxation,
    /// or it is a constant and cannot be written
    #[error("Member {owner}.{member} is not accessible")]
    IllegalAccess {
        /// Declaring type
        owner: String,
        /// Member name
        member: String,
    },

    /// Value cannot be assigned to the declared type
    #[error("Cannot assign {found} to {owner}.{member} of type {expected}")]
    TypeMismatch {
        /// Declaring type
        owner: String,
        /// Member name
        member: String,
        /// Declared type
        expected: ValueType,
        /// Description of the offending value
        found: String,
    },

    /// Instance member used on an object that does not inherit its owner
    #[error("{receiver} does not inherit {owner}")]
    WrongReceiver {
        /// Declaring type
        owner: String,
        /// Type of the object that was passed
        receiver: String,
    },
}

impl AccessError {
    /// Build a `MemberNotFound` error
    pub fn not_found(owner: impl Into<String>, member: impl Into<String>) -> Self {
        AccessError::MemberNotFound {
            owner: owner.into(),
            member: member.into(),
        }
    }

    /// Whether this is a `MemberNotFound` error
    pub fn is_not_found(&self) -> bool {
        matches!(self, AccessError::MemberNotFound { .. })
    }
}

/// Result type for member access
pub type AccessResult<T> = Result<T, AccessError>;

/// Errors raised by a [`TypeLoader`](crate::types::TypeLoader)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// No definition with that name
    #[error("Type not found: {0}")]
    NotFound(String),

    /// An ancestor could not be loaded
    #[error("Failed to link {name}: ancestor {missing} could not be loaded")]
    Linkage {
        /// Type being loaded
        name: String,
        /// Ancestor that failed
        missing: String,
    },

    /// The ancestor chain loops back on itself
    #[error("Circular inheritance while loading {0}")]
    Circular(String),
}

impl LoadError {
    /// Name of the type the error is about
    pub fn type_name(&self) -> &str {
        match self {
            LoadError::NotFound(name) | LoadError::Circular(name) => name,
            LoadError::Linkage { name, .. } => name,
        }
    }
}
