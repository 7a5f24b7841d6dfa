//! Query resolver
//!
//! A [`Query`] turns a [`Lookup`] into zero-or-one or zero-or-many domain
//! objects for one resource type. Queries are built from a per-type
//! [`QueryFactory`] and live for one request; the request context keeps at
//! most one instance per resource type.
//!
//! "Nothing matched" is an empty result, never an error. Deciding between
//! not-found and forbidden is left to the caller.

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApiResult;
use crate::params::{Params, PAGINATION_PARAMS};
use crate::resource::{Lookup, ResourceRef};
use crate::store::Store;

/// Everything a query strategy is constructed from
#[derive(Clone)]
pub struct QueryInit {
    /// Resource type the query resolves
    pub resource_type: &'static str,
    /// Result type of the running service
    pub result_type: &'static str,
    /// The request's filtered parameters
    pub params: Params,
    /// Persistence collaborator
    pub store: Arc<dyn Store>,
}

/// Builds the query strategy for one resource type
pub type QueryFactory = fn(QueryInit) -> Arc<dyn Query>;

/// Lookup strategy for one resource type within one request
#[async_trait]
pub trait Query: Send + Sync {
    /// Resource type this query resolves
    fn resource_type(&self) -> &'static str;

    /// At most one object
    async fn find(&self, lookup: &Lookup) -> ApiResult<Option<ResourceRef>>;

    /// Every matching object, filtered and sorted by the request parameters
    async fn find_all(&self, lookup: &Lookup) -> ApiResult<Vec<ResourceRef>>;
}

/// Sort key parsed from `sort_by`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Field to compare
    pub field: String,
    /// Reverse order
    pub descending: bool,
}

impl SortKey {
    /// Parse a comma-separated `sort_by` value: `name`, `name:desc`
    #[must_use]
    pub fn parse_list(raw: &str) -> Vec<SortKey> {
        raw.split(',')
            .filter(|part| !part.is_empty())
            .map(|part| match part.split_once(':') {
                Some((field, direction)) => SortKey {
                    field: field.to_string(),
                    descending: direction.eq_ignore_ascii_case("desc"),
                },
                None => SortKey {
                    field: part.to_string(),
                    descending: false,
                },
            })
            .collect()
    }
}

/// Default strategy: lookups go straight to the store, collections are
/// narrowed by `<type>.<field>` equality filters and ordered by `sort_by`
pub struct StoreQuery {
    resource_type: &'static str,
    filters: Vec<(String, String)>,
    sort: Vec<SortKey>,
    store: Arc<dyn Store>,
}

impl StoreQuery {
    /// Create a query from its init values
    #[must_use]
    pub fn new(init: QueryInit) -> Self {
        let QueryInit {
            resource_type,
            result_type,
            params,
            store,
        } = init;

        let mut filters = Vec::new();
        if params.mentions(resource_type) {
            let prefix = format!("{}.", resource_type);
            for (key, value) in params.iter() {
                let Some(field) = key.strip_prefix(&prefix) else {
                    continue;
                };
                if PAGINATION_PARAMS.contains(&field) {
                    continue;
                }
                if let Some(value) = value.first() {
                    filters.push((field.to_string(), value.to_string()));
                }
            }
        }

        let sort = if resource_type == result_type {
            params
                .get_str("sort_by")
                .map(SortKey::parse_list)
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        Self {
            resource_type,
            filters,
            sort,
            store,
        }
    }

    /// [`QueryFactory`] for registries
    pub fn factory(init: QueryInit) -> Arc<dyn Query> {
        Arc::new(Self::new(init))
    }

    /// Active equality filters, field name and raw value
    #[must_use]
    pub fn filters(&self) -> &[(String, String)] {
        &self.filters
    }

    fn matches(&self, object: &ResourceRef) -> bool {
        self.filters.iter().all(|(field, expected)| {
            object
                .field(field)
                .and_then(|value| value.as_scalar().cloned())
                .is_some_and(|actual| scalar_matches(&actual, expected))
        })
    }

    fn compare(&self, a: &ResourceRef, b: &ResourceRef) -> Ordering {
        for key in &self.sort {
            let left = sort_value(a, &key.field);
            let right = sort_value(b, &key.field);
            let ordering = compare_values(&left, &right);
            let ordering = if key.descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

#[async_trait]
impl Query for StoreQuery {
    fn resource_type(&self) -> &'static str {
        self.resource_type
    }

    async fn find(&self, lookup: &Lookup) -> ApiResult<Option<ResourceRef>> {
        tracing::debug!(resource_type = self.resource_type, ?lookup, "find");
        Ok(self.store.fetch(self.resource_type, lookup).await?)
    }

    async fn find_all(&self, lookup: &Lookup) -> ApiResult<Vec<ResourceRef>> {
        let mut objects = self.store.fetch_all(self.resource_type, lookup).await?;
        if !self.filters.is_empty() {
            objects.retain(|object| self.matches(object));
        }
        if !self.sort.is_empty() {
            objects.sort_by(|a, b| self.compare(a, b));
        }
        tracing::debug!(
            resource_type = self.resource_type,
            ?lookup,
            count = objects.len(),
            "find_all"
        );
        Ok(objects)
    }
}

/// Compare a stored scalar against a raw parameter value
///
/// Booleans accept `true`/`false`, numbers compare numerically, everything
/// else compares as text.
fn scalar_matches(actual: &Value, expected: &str) -> bool {
    match actual {
        Value::Bool(flag) => match expected {
            "true" => *flag,
            "false" => !*flag,
            _ => false,
        },
        Value::Number(number) => expected
            .parse::<f64>()
            .ok()
            .zip(number.as_f64())
            .is_some_and(|(expected, actual)| expected == actual),
        Value::String(text) => text == expected,
        Value::Null => expected.is_empty() || expected == "null",
        _ => false,
    }
}

fn sort_value(object: &ResourceRef, field: &str) -> Value {
    object
        .field(field)
        .and_then(|value| value.as_scalar().cloned())
        .unwrap_or(Value::Null)
}

/// Total order over scalars; nulls sort last
fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (a, b) => a.to_string().cmp(&b.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn init(params: Params) -> QueryInit {
        QueryInit {
            resource_type: "repository",
            result_type: "repository",
            params,
            store: Arc::new(testing::fixture_store()),
        }
    }

    fn ids(objects: &[ResourceRef]) -> Vec<u64> {
        objects.iter().map(|object| object.id()).collect()
    }

    #[test]
    fn test_sort_key_parsing() {
        assert_eq!(
            SortKey::parse_list("name:desc,id"),
            vec![
                SortKey {
                    field: "name".into(),
                    descending: true
                },
                SortKey {
                    field: "id".into(),
                    descending: false
                },
            ]
        );
        assert!(SortKey::parse_list("").is_empty());
    }

    #[test]
    fn test_scalar_matches() {
        assert!(scalar_matches(&Value::Bool(false), "false"));
        assert!(!scalar_matches(&Value::Bool(false), "true"));
        assert!(!scalar_matches(&Value::Bool(true), "yes"));
        assert!(scalar_matches(&serde_json::json!(3), "3"));
        assert!(scalar_matches(&serde_json::json!("ruby"), "ruby"));
        assert!(scalar_matches(&Value::Null, ""));
    }

    #[test]
    fn test_compare_values_nulls_last() {
        assert_eq!(
            compare_values(&Value::Null, &serde_json::json!(1)),
            Ordering::Greater
        );
        assert_eq!(
            compare_values(&serde_json::json!("a"), &serde_json::json!("b")),
            Ordering::Less
        );
    }

    #[test]
    fn test_filters_require_type_prefix() {
        let query = StoreQuery::new(init(Params::new().with("private", "false")));
        assert!(query.filters().is_empty());

        let query = StoreQuery::new(init(
            Params::new()
                .with("repository.private", "false")
                .with("limit", "2"),
        ));
        assert_eq!(
            query.filters(),
            &[("private".to_string(), "false".to_string())]
        );
    }

    #[tokio::test]
    async fn test_find_by_id_and_slug() {
        let query = StoreQuery::new(init(Params::new()));
        let repo = query.find(&Lookup::Id(1)).await.unwrap().unwrap();
        assert_eq!(repo.id(), 1);
        let repo = query
            .find(&Lookup::Slug("svenfuchs/minimal".into()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(repo.id(), 1);
        assert!(query.find(&Lookup::Id(999)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_all_with_filter() {
        let query = StoreQuery::new(init(Params::new().with("repository.private", "true")));
        let repos = query
            .find_all(&Lookup::Owner("svenfuchs".into()))
            .await
            .unwrap();
        assert_eq!(ids(&repos), vec![2]);
    }

    #[tokio::test]
    async fn test_find_all_sorted_desc() {
        let query = StoreQuery::new(init(Params::new().with("sort_by", "id:desc")));
        let repos = query
            .find_all(&Lookup::Owner("svenfuchs".into()))
            .await
            .unwrap();
        assert_eq!(ids(&repos), vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_sort_ignored_for_nested_types() {
        let query = StoreQuery::new(QueryInit {
            resource_type: "build",
            ..init(Params::new().with("sort_by", "id:desc"))
        });
        let builds = query.find_all(&Lookup::All).await.unwrap();
        assert_eq!(ids(&builds), vec![10, 11]);
    }
}
