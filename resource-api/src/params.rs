//! Request parameters and per-service parameter scopes
//!
//! Inbound parameters arrive as a flat, query-string shaped mapping. Before a
//! service sees them they are cut down to the keys its [`ParamScope`] accepts;
//! anything else is dropped without an error.
//!
//! # Example
//!
//! ```rust
//! use resource_api::params::{ParamScope, Params};
//!
//! let scope = ParamScope::new("repository").field("private").paginated();
//!
//! let params = Params::new()
//!     .with("repository.private", "false")
//!     .with("limit", "5")
//!     .with("admin", "true");
//!
//! let filtered = scope.filter(&params);
//! assert!(filtered.contains("repository.private"));
//! assert!(filtered.contains("limit"));
//! assert!(!filtered.contains("admin"));
//! ```

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Keys every service accepts
pub const DEFAULT_PARAMS: [&str; 2] = ["include", "@type"];

/// Keys added by pagination
pub const PAGINATION_PARAMS: [&str; 2] = ["limit", "offset"];

/// A single parameter value; repeated keys collect into `Many`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// `key=value`
    One(String),
    /// `key=a&key=b`
    Many(Vec<String>),
}

impl ParamValue {
    /// First value
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::One(value) => Some(value),
            Self::Many(values) => values.first().map(String::as_str),
        }
    }

    /// All values in arrival order
    #[must_use]
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::One(value) => vec![value.as_str()],
            Self::Many(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::One(value)
    }
}

/// Flat key/value parameter mapping, ordered by key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    /// Create an empty mapping
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, replacing an existing value
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert, replacing an existing value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Insert, turning a repeated key into [`ParamValue::Many`]
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        match self.0.entry(key.into()) {
            Entry::Vacant(entry) => {
                entry.insert(ParamValue::One(value));
            }
            Entry::Occupied(mut entry) => {
                let current = entry.get_mut();
                match current {
                    ParamValue::One(first) => {
                        let first = std::mem::take(first);
                        *current = ParamValue::Many(vec![first, value]);
                    }
                    ParamValue::Many(values) => values.push(value),
                }
            }
        }
    }

    /// Remove a key, returning its value
    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.0.remove(key)
    }

    /// Value for a key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    /// First value for a key
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ParamValue::first)
    }

    /// Whether a key is present
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Iterate in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Number of keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no keys
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge `other` over `self`; keys in `other` win
    #[must_use]
    pub fn merged(mut self, other: &Params) -> Self {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
        self
    }

    /// Did the request say anything about `prefix`?
    ///
    /// True when `@type` names the prefix or any key is qualified with it.
    #[must_use]
    pub fn mentions(&self, prefix: &str) -> bool {
        if self.get_str("@type") == Some(prefix) {
            return true;
        }
        let qualified = format!("{}.", prefix);
        self.0.keys().any(|key| key.starts_with(&qualified))
    }

    /// Encode as a query string, keys sorted, repeated keys expanded
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.0 {
            for item in value.values() {
                serializer.append_pair(key, item);
            }
        }
        serializer.finish()
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (key, value) in iter {
            params.append(key, value);
        }
        params
    }
}

/// The whitelist of parameter keys one service accepts
///
/// Declaring a field registers both the plain key and the key qualified with
/// the result type (`private` and `repository.private`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamScope {
    result_type: &'static str,
    keys: BTreeSet<String>,
}

impl ParamScope {
    /// Scope accepting only the default keys
    #[must_use]
    pub fn new(result_type: &'static str) -> Self {
        Self {
            result_type,
            keys: DEFAULT_PARAMS.iter().map(|key| (*key).to_string()).collect(),
        }
    }

    /// Accept a plain key
    #[must_use]
    pub fn param(mut self, key: &str) -> Self {
        self.keys.insert(key.to_string());
        self
    }

    /// Accept a field of the result type, plain and qualified
    #[must_use]
    pub fn field(self, name: &str) -> Self {
        let prefix = self.result_type;
        self.prefixed(prefix, name)
    }

    /// Accept a field qualified with another prefix
    #[must_use]
    pub fn prefixed(mut self, prefix: &str, name: &str) -> Self {
        self.keys.insert(name.to_string());
        self.keys.insert(format!("{}.{}", prefix, name));
        self
    }

    /// Accept `limit` and `offset`
    #[must_use]
    pub fn paginated(mut self) -> Self {
        self.keys
            .extend(PAGINATION_PARAMS.iter().map(|key| (*key).to_string()));
        self
    }

    /// Result type the scope was declared for
    #[must_use]
    pub fn result_type(&self) -> &'static str {
        self.result_type
    }

    /// Whether a key is accepted
    #[must_use]
    pub fn accepts(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Accepted keys in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Keep only accepted keys; never fails
    #[must_use]
    pub fn filter(&self, params: &Params) -> Params {
        Params(
            params
                .0
                .iter()
                .filter(|(key, _)| self.accepts(key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        )
    }
}
