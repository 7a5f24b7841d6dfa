//! Domain objects as seen by the rendering core
//!
//! A domain object exposes its fields by name through [`Resource::field`].
//! Associations are returned as [`Link`]s rather than embedded objects; the
//! renderer resolves them through the per-request query resolver. This keeps
//! cyclic domain graphs (a repository pointing at its last build, which points
//! back at the repository) free of reference cycles.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::access::AccessScope;

/// Shared handle to a domain object
pub type ResourceRef = Arc<dyn Resource>;

/// How to locate objects of one resource type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Lookup {
    /// Primary key
    Id(u64),
    /// Natural key (`owner/name` for repositories, login for users)
    Slug(String),
    /// Named child of a repository, e.g. a branch
    Named {
        /// Repository id
        parent: u64,
        /// Child name
        name: String,
    },
    /// Everything owned by a login
    Owner(String),
    /// Everything a user is a member of
    Member(u64),
    /// No restriction
    All,
}

/// Reference from one object to another
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    /// Target resource type
    pub resource_type: &'static str,
    /// How to find the target
    pub lookup: Lookup,
}

impl Link {
    /// Link by primary key
    pub fn id(resource_type: &'static str, id: u64) -> Self {
        Self {
            resource_type,
            lookup: Lookup::Id(id),
        }
    }

    /// Link to a named child of a repository
    pub fn named(resource_type: &'static str, parent: u64, name: impl Into<String>) -> Self {
        Self {
            resource_type,
            lookup: Lookup::Named {
                parent,
                name: name.into(),
            },
        }
    }
}

/// Value of one field of a domain object
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Plain JSON value
    Scalar(Value),
    /// To-one association
    One(Option<Link>),
    /// To-many association
    Many(Vec<Link>),
}

impl FieldValue {
    /// Wrap anything JSON-convertible
    pub fn scalar(value: impl Into<Value>) -> Self {
        Self::Scalar(value.into())
    }

    /// Optional to-one association by id
    pub fn link(resource_type: &'static str, id: Option<u64>) -> Self {
        Self::One(id.map(|id| Link::id(resource_type, id)))
    }

    /// To-many association by ids
    pub fn links(resource_type: &'static str, ids: &[u64]) -> Self {
        Self::Many(ids.iter().map(|id| Link::id(resource_type, *id)).collect())
    }

    /// Scalar timestamp, `null` when unset
    pub fn timestamp(at: Option<DateTime<Utc>>) -> Self {
        Self::Scalar(at.map_or(Value::Null, |at| {
            Value::String(at.to_rfc3339_opts(SecondsFormat::Secs, true))
        }))
    }

    /// The scalar payload, if this is not an association
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(value) => Some(value),
            _ => None,
        }
    }
}

/// A domain object that can be resolved, gated and rendered
pub trait Resource: Send + Sync + fmt::Debug {
    /// Resource type tag, e.g. `"repository"`
    fn resource_type(&self) -> &'static str;

    /// Primary key
    fn id(&self) -> u64;

    /// Natural key used by [`Lookup::Slug`] and [`Lookup::Named`]
    fn slug(&self) -> Option<String> {
        None
    }

    /// Canonical path below the API version, e.g. `repo/1/branch/master`
    fn href_path(&self) -> String {
        format!("{}/{}", self.resource_type(), self.id())
    }

    /// Field by name; `None` for fields this object does not have
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// Facts the access gate needs to decide visibility
    fn access_scope(&self) -> AccessScope {
        AccessScope::public()
    }
}

/// Identity of an object within one render path
pub(crate) fn identity(object: &dyn Resource) -> (&'static str, u64) {
    (object.resource_type(), object.id())
}
