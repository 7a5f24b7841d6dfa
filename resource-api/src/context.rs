//! Per-request state
//!
//! A [`Context`] is created for every dispatched request and dropped with it.
//! It carries the caller's access gate, the filtered parameters, the parsed
//! include directive and the query memo. Nothing in it is shared between
//! requests.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use http::StatusCode;
use serde_json::{Map, Value};

use crate::access::AccessControl;
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::include::IncludeSet;
use crate::params::Params;
use crate::query::{Query, QueryInit};
use crate::registry::Registry;
use crate::resource::{Lookup, ResourceRef};
use crate::service::Outcome;
use crate::store::Store;

/// Execution context for one request
pub struct Context {
    access: Arc<dyn AccessControl>,
    registry: Arc<Registry>,
    store: Arc<dyn Store>,
    settings: ApiConfig,
    result_type: &'static str,
    params: Params,
    query_params: Params,
    includes: IncludeSet,
    path: String,
    queries: DashMap<&'static str, Arc<dyn Query>>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("result_type", &self.result_type)
            .field("path", &self.path)
            .field("params", &self.params)
            .field("includes", &self.includes)
            .field("cached_queries", &self.queries.len())
            .finish_non_exhaustive()
    }
}

/// Everything needed to open a [`Context`]
pub struct ContextParts {
    /// Access gate for the caller
    pub access: Arc<dyn AccessControl>,
    /// Resource declarations
    pub registry: Arc<Registry>,
    /// Persistence collaborator
    pub store: Arc<dyn Store>,
    /// API settings
    pub settings: ApiConfig,
    /// Result type of the running service
    pub result_type: &'static str,
    /// Filtered parameters, route captures included
    pub params: Params,
    /// Filtered parameters taken from the query string only
    pub query_params: Params,
    /// Request path below the API version
    pub path: String,
}

impl Context {
    /// Open a context, validating the include directive
    pub fn open(parts: ContextParts) -> ApiResult<Self> {
        let includes = IncludeSet::parse(&parts.params, &parts.registry)?;
        Ok(Self {
            access: parts.access,
            registry: parts.registry,
            store: parts.store,
            settings: parts.settings,
            result_type: parts.result_type,
            params: parts.params,
            query_params: parts.query_params,
            includes,
            path: parts.path,
            queries: DashMap::new(),
        })
    }

    /// Access gate of the caller
    pub fn access(&self) -> &dyn AccessControl {
        self.access.as_ref()
    }

    /// Resource declarations
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// API settings
    pub fn settings(&self) -> &ApiConfig {
        &self.settings
    }

    /// Result type of the running service
    pub fn result_type(&self) -> &'static str {
        self.result_type
    }

    /// Filtered parameters
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Filtered query-string parameters, used for collection links
    pub fn query_params(&self) -> &Params {
        &self.query_params
    }

    /// Parsed include directive
    pub fn includes(&self) -> &IncludeSet {
        &self.includes
    }

    /// Request path below the API version
    pub fn path(&self) -> &str {
        &self.path
    }

    /// First value of a filtered parameter
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get_str(key)
    }

    /// Did the request address `prefix` explicitly?
    ///
    /// True when `@type` names it or any parameter is qualified with it.
    pub fn params_for(&self, prefix: &str) -> bool {
        self.params.mentions(prefix)
    }

    /// Query for a resource type, created on first use and reused afterwards
    pub fn query(&self, resource_type: &str) -> ApiResult<Arc<dyn Query>> {
        if let Some(query) = self.queries.get(resource_type) {
            return Ok(Arc::clone(query.value()));
        }

        let declaration = self
            .registry
            .get(resource_type)
            .ok_or_else(ApiError::not_implemented)?;
        let factory = self
            .registry
            .query_factory(resource_type)
            .ok_or_else(ApiError::not_implemented)?;

        let query = self
            .queries
            .entry(declaration.name)
            .or_insert_with(|| {
                tracing::debug!(resource_type = declaration.name, "query created");
                factory(QueryInit {
                    resource_type: declaration.name,
                    result_type: self.result_type,
                    params: self.params.clone(),
                    store: Arc::clone(&self.store),
                })
            })
            .value()
            .clone();
        Ok(query)
    }

    /// Fetch one object the caller may see
    ///
    /// Absence and invisibility both fail with not-found; only the internal
    /// cause differs.
    pub async fn find(&self, resource_type: &str, lookup: &Lookup) -> ApiResult<ResourceRef> {
        let query = self.query(resource_type)?;
        let Some(object) = query.find(lookup).await? else {
            return Err(ApiError::entity_missing(resource_type));
        };
        if !self.access.visible(object.as_ref()) {
            tracing::debug!(resource_type, ?lookup, "object hidden from caller");
            return Err(ApiError::not_found(resource_type));
        }
        Ok(object)
    }

    /// Fetch a collection, unfiltered by visibility
    ///
    /// The dispatcher applies the gate before pagination.
    pub async fn find_all(&self, resource_type: &str, lookup: &Lookup) -> ApiResult<Vec<ResourceRef>> {
        self.query(resource_type)?.find_all(lookup).await
    }

    /// Fail unless the caller is logged in
    pub fn require_login(&self) -> ApiResult<()> {
        if self.access.logged_in() {
            Ok(())
        } else {
            Err(ApiError::login_required())
        }
    }

    /// Id of the logged-in user
    pub fn current_user_id(&self) -> ApiResult<u64> {
        self.require_login()?;
        self.access.user_id().ok_or_else(ApiError::login_required)
    }

    /// Deferred-operation result with status 202
    pub fn accepted(&self, resource_type: &'static str, payload: Map<String, Value>) -> Outcome {
        Outcome::Accepted {
            resource_type,
            payload,
            status: StatusCode::ACCEPTED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{Anonymous, UserAccess};
    use crate::error::{ApiErrorKind, NotFoundCause};
    use crate::resources;
    use crate::testing;

    fn context(access: Arc<dyn AccessControl>, params: Params) -> ApiResult<Context> {
        Context::open(ContextParts {
            access,
            registry: Arc::new(resources::registry().unwrap()),
            store: Arc::new(testing::fixture_store()),
            settings: ApiConfig::default(),
            result_type: "repository",
            query_params: params.clone(),
            params,
            path: "repo/1".to_string(),
        })
    }

    #[test]
    fn test_query_is_memoized_per_type() {
        let ctx = context(Arc::new(Anonymous::new()), Params::new()).unwrap();
        let first = ctx.query("build").unwrap();
        let second = ctx.query("build").unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let other = ctx.query("repository").unwrap();
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(other.resource_type(), "repository");
    }

    #[test]
    fn test_query_for_unknown_type() {
        let ctx = context(Arc::new(Anonymous::new()), Params::new()).unwrap();
        let err = ctx.query("widget").err().unwrap();
        assert_eq!(err.kind, ApiErrorKind::NotImplemented);
    }

    #[test]
    fn test_contexts_do_not_share_queries() {
        let a = context(Arc::new(Anonymous::new()), Params::new()).unwrap();
        let b = context(Arc::new(Anonymous::new()), Params::new()).unwrap();
        assert!(!Arc::ptr_eq(
            &a.query("build").unwrap(),
            &b.query("build").unwrap()
        ));
    }

    #[test]
    fn test_open_rejects_bad_include() {
        let err = context(
            Arc::new(Anonymous::new()),
            Params::new().with("include", "repository"),
        )
        .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::WrongParams);
    }

    #[tokio::test]
    async fn test_find_masks_private_objects() {
        let ctx = context(Arc::new(Anonymous::new()), Params::new()).unwrap();

        let hidden = ctx.find("repository", &Lookup::Id(2)).await.unwrap_err();
        let missing = ctx.find("repository", &Lookup::Id(999)).await.unwrap_err();

        assert_eq!(
            hidden.kind,
            ApiErrorKind::NotFound(NotFoundCause::AccessDenied)
        );
        assert!(missing.is_entity_missing());
        assert_eq!(hidden.to_document(), missing.to_document());
    }

    #[tokio::test]
    async fn test_find_visible_with_pull_access() {
        let ctx = context(Arc::new(UserAccess::new(1).with_pull(2)), Params::new()).unwrap();
        let repo = ctx.find("repository", &Lookup::Id(2)).await.unwrap();
        assert_eq!(repo.id(), 2);
    }

    #[test]
    fn test_login_helpers() {
        let anonymous = context(Arc::new(Anonymous::new()), Params::new()).unwrap();
        assert_eq!(
            anonymous.require_login().unwrap_err().kind,
            ApiErrorKind::LoginRequired
        );
        assert!(anonymous.current_user_id().is_err());

        let user = context(Arc::new(UserAccess::new(1)), Params::new()).unwrap();
        assert_eq!(user.current_user_id().unwrap(), 1);
    }

    #[test]
    fn test_params_for() {
        let ctx = context(
            Arc::new(Anonymous::new()),
            Params::new().with("repository.private", "false"),
        )
        .unwrap();
        assert!(ctx.params_for("repository"));
        assert!(!ctx.params_for("build"));
        assert_eq!(ctx.param("repository.private"), Some("false"));
    }

    #[test]
    fn test_accepted_outcome() {
        let ctx = context(Arc::new(UserAccess::new(1)), Params::new()).unwrap();
        match ctx.accepted("request", Map::new()) {
            Outcome::Accepted {
                resource_type,
                status,
                ..
            } => {
                assert_eq!(resource_type, "request");
                assert_eq!(status, StatusCode::ACCEPTED);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
