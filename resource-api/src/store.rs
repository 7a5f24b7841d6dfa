//! Persistence collaborator
//!
//! The core never talks to a database directly. Everything it needs from
//! persistence goes through [`Store`]: fetch one object by a [`Lookup`], or
//! fetch a collection. What the store does internally is opaque.

use std::fmt;

use async_trait::async_trait;

use crate::resource::{Lookup, ResourceRef};

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Category of store failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    /// Backend unreachable or exhausted
    Unavailable,
    /// Backend took too long
    Timeout,
    /// Stored data could not be decoded
    Corrupt,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "unavailable"),
            Self::Timeout => write!(f, "timeout"),
            Self::Corrupt => write!(f, "corrupt"),
        }
    }
}

/// A failed store operation
///
/// "Nothing matched" is never an error: stores return `None` or an empty list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    /// The category of error
    pub kind: StoreErrorKind,
    /// Resource type being fetched
    pub resource_type: String,
    /// Backend message
    pub message: String,
}

impl StoreError {
    /// Create a new store error
    pub fn new(
        kind: StoreErrorKind,
        resource_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            resource_type: resource_type.into(),
            message: message.into(),
        }
    }

    /// Backend unreachable
    pub fn unavailable(resource_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Unavailable, resource_type, message)
    }

    /// Check if this error is retriable
    pub fn is_retriable(&self) -> bool {
        matches!(self.kind, StoreErrorKind::Unavailable | StoreErrorKind::Timeout)
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Store {} error fetching {}: {}",
            self.kind, self.resource_type, self.message
        )
    }
}

impl std::error::Error for StoreError {}

/// Object lookups against the persistence layer
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetch at most one object
    async fn fetch(&self, resource_type: &str, lookup: &Lookup) -> StoreResult<Option<ResourceRef>>;

    /// Fetch every object matching the lookup, in storage order
    async fn fetch_all(&self, resource_type: &str, lookup: &Lookup)
        -> StoreResult<Vec<ResourceRef>>;
}
