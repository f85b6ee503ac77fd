//! Reflection over the runtime type model
//!
//! - `directory`: member lookup along the inheritance chain
//! - `access`: scoped access guards and member handles
//! - `cache`: accessor cache tables and the eviction ticker
//! - `resolver`: get/set by name with accessor-method fallback
//! - `bean`: property descriptors, getter/setter listing
//! - `constants`: constant values and filtered declared fields
//! - `grouping`: property matching, copy and diff between types

pub mod access;
pub mod bean;
pub mod cache;
pub mod constants;
pub mod directory;
pub mod grouping;
pub mod resolver;

pub use access::{AccessGuard, HandleTarget, MemberHandle};
pub use bean::{PropertyDescriptor, PropertyFilter};
pub use cache::{CacheKey, CacheService, CacheStats, KeyKind, DEFAULT_EVICTION_INTERVAL};
pub use constants::FieldFilter;
pub use grouping::{PropertyMapper, PropertyPair};
pub use resolver::{
    AccessResolver, AccessStrategy, AccessorMethod, DirectMember, MemberAccessor, WriteOutcome,
    WritePath, DEFAULT_SETTER_RETRY_LIMIT,
};
