//! Services and request dispatch
//!
//! A [`Service`] is one operation on one result type (`repository.find`,
//! `owner.repositories`). The [`Dispatcher`] drives a request through the
//! fixed pipeline: parameter filtering, include validation, the service's
//! `run`, collection gating and pagination, rendering. Any failure aborts the
//! request and becomes an error document; no partial document is returned.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use resource_api::prelude::*;
//!
//! let dispatcher = resource_api::services::dispatcher(store, &Config::default())?;
//! let response = dispatcher
//!     .call(Request::new("repository", "find").path("repo/1").param("repository.id", "1"),
//!           Arc::new(Anonymous::new()))
//!     .await;
//! assert_eq!(response.status, StatusCode::OK);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde_json::{Map, Value};
use tracing::Instrument;

use crate::access::{AccessControl, Anonymous};
use crate::config::ApiConfig;
use crate::context::{Context, ContextParts};
use crate::error::{ApiError, ApiResult, Error, Result};
use crate::pagination::Paginator;
use crate::params::{ParamScope, Params};
use crate::registry::Registry;
use crate::render::Renderer;
use crate::resource::ResourceRef;
use crate::store::Store;

/// What a service produced
#[derive(Debug, Clone)]
pub enum Outcome {
    /// A single object, rendered at standard level
    Object(ResourceRef),
    /// A collection of the service's result type, gated (and paginated) by the dispatcher
    Collection(Vec<ResourceRef>),
    /// A deferred operation was accepted
    Accepted {
        /// Resource type the operation concerns
        resource_type: &'static str,
        /// Extra fields of the pending document
        payload: Map<String, Value>,
        /// Response status, 202 unless the service says otherwise
        status: StatusCode,
    },
}

/// One operation on one result type
#[async_trait]
pub trait Service: Send + Sync {
    /// Resource type of the result
    fn result_type(&self) -> &'static str;

    /// Operation name, e.g. `find`
    fn action(&self) -> &'static str;

    /// Accepted parameter keys
    fn scope(&self) -> ParamScope {
        ParamScope::new(self.result_type())
    }

    /// Page size policy; `None` returns collections whole
    fn paginator(&self, _settings: &ApiConfig) -> Option<Paginator> {
        None
    }

    /// Produce the result; `Ok(None)` means not found
    async fn run(&self, _ctx: &Context) -> ApiResult<Option<Outcome>> {
        Err(ApiError::not_implemented())
    }
}

/// An inbound request, already routed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    /// Result type of the addressed service
    pub resource_type: String,
    /// Operation name
    pub action: String,
    /// Path below the API version, used for collection links
    pub path: String,
    /// Query-string parameters
    pub params: Params,
    /// Route captures; win over query-string parameters of the same name
    pub path_params: Params,
}

impl Request {
    /// Request for `<resource_type>.<action>`
    pub fn new(resource_type: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            action: action.into(),
            ..Self::default()
        }
    }

    /// Set the path below the API version
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Add a query-string parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.append(key, value);
        self
    }

    /// Replace the query-string parameters
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Add a route capture
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(key.into(), value.into());
        self
    }
}

/// A successful response
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    /// Response status
    pub status: StatusCode,
    /// Response document
    pub body: Value,
}

impl Rendered {
    /// 200 with a document
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    /// Error document with the error's status
    #[must_use]
    pub fn error(error: &ApiError) -> Self {
        error.log();
        Self {
            status: error.kind.status_code(),
            body: serde_json::to_value(error.to_document()).unwrap_or(Value::Null),
        }
    }
}

impl IntoResponse for Rendered {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Routes requests to services and renders their outcomes
pub struct Dispatcher {
    registry: Arc<Registry>,
    services: HashMap<String, Arc<dyn Service>>,
    store: Arc<dyn Store>,
    settings: ApiConfig,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut services: Vec<_> = self.services.keys().collect();
        services.sort();
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("services", &services)
            .field("settings", &self.settings)
            .finish()
    }
}

impl Dispatcher {
    /// Start building a dispatcher
    pub fn builder(registry: Registry, store: Arc<dyn Store>) -> DispatcherBuilder {
        DispatcherBuilder {
            registry,
            store,
            settings: ApiConfig::default(),
            services: Vec::new(),
        }
    }

    /// API settings
    pub fn settings(&self) -> &ApiConfig {
        &self.settings
    }

    /// Resource declarations
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Serve a request, turning failures into error documents
    pub async fn call(&self, request: Request, access: Arc<dyn AccessControl>) -> Rendered {
        match self.dispatch(request, access).await {
            Ok(rendered) => rendered,
            Err(error) => Rendered::error(&error),
        }
    }

    /// Serve a request
    pub async fn dispatch(
        &self,
        request: Request,
        access: Arc<dyn AccessControl>,
    ) -> ApiResult<Rendered> {
        let service = self
            .services
            .get(&service_key(&request.resource_type, &request.action))
            .cloned()
            .ok_or_else(|| {
                tracing::debug!(
                    resource_type = %request.resource_type,
                    action = %request.action,
                    "no service for request"
                );
                ApiError::not_implemented()
            })?;

        let span = tracing::info_span!(
            "dispatch",
            result_type = service.result_type(),
            action = service.action()
        );
        self.serve(service, request, access).instrument(span).await
    }

    async fn serve(
        &self,
        service: Arc<dyn Service>,
        request: Request,
        access: Arc<dyn AccessControl>,
    ) -> ApiResult<Rendered> {
        let access = if self.settings.private_api && !access.authenticated() {
            tracing::debug!("private api, anonymous caller sees nothing");
            Arc::new(Anonymous::private_api()) as Arc<dyn AccessControl>
        } else {
            access
        };

        let scope = service.scope();
        let query_params = scope.filter(&request.params);
        let params = scope.filter(&request.params.clone().merged(&request.path_params));

        let ctx = Context::open(ContextParts {
            access,
            registry: Arc::clone(&self.registry),
            store: Arc::clone(&self.store),
            settings: self.settings.clone(),
            result_type: service.result_type(),
            params,
            query_params,
            path: request.path,
        })?;

        let outcome = service
            .run(&ctx)
            .await?
            .ok_or_else(|| ApiError::not_found(service.result_type()))?;

        let renderer = Renderer::new(&ctx);
        match outcome {
            Outcome::Object(object) => {
                if !ctx.access().visible(object.as_ref()) {
                    return Err(ApiError::not_found(object.resource_type()));
                }
                Ok(Rendered::ok(renderer.object(object).await?))
            }
            Outcome::Collection(items) => {
                let body = match service.paginator(&self.settings) {
                    Some(paginator) => {
                        let page = paginator.paginate(items, ctx.params(), ctx.access());
                        renderer.page(page).await?
                    }
                    None => {
                        let visible = items
                            .into_iter()
                            .filter(|item| ctx.access().visible(item.as_ref()))
                            .collect();
                        renderer.collection(visible).await?
                    }
                };
                Ok(Rendered::ok(body))
            }
            Outcome::Accepted {
                resource_type,
                payload,
                status,
            } => Ok(Rendered {
                status,
                body: Renderer::accepted(resource_type, payload),
            }),
        }
    }
}

fn service_key(result_type: &str, action: &str) -> String {
    format!("{}.{}", result_type, action)
}

/// Collects services for a [`Dispatcher`]
pub struct DispatcherBuilder {
    registry: Registry,
    store: Arc<dyn Store>,
    settings: ApiConfig,
    services: Vec<Arc<dyn Service>>,
}

impl DispatcherBuilder {
    /// Use these API settings
    #[must_use]
    pub fn settings(mut self, settings: ApiConfig) -> Self {
        self.settings = settings;
        self
    }

    /// Register a service
    #[must_use]
    pub fn service(mut self, service: impl Service + 'static) -> Self {
        self.services.push(Arc::new(service));
        self
    }

    /// Check every service against the registry and freeze
    pub fn build(self) -> Result<Dispatcher> {
        let mut services = HashMap::new();
        for service in self.services {
            let key = service_key(service.result_type(), service.action());
            if self.registry.get(service.result_type()).is_none() {
                return Err(Error::Declaration(format!(
                    "service {} has an undeclared result type",
                    key
                )));
            }
            if let Some(previous) = services.insert(key.clone(), service) {
                return Err(Error::Declaration(format!(
                    "service {} registered twice ({})",
                    key,
                    previous.action()
                )));
            }
        }
        tracing::debug!(services = services.len(), "dispatcher built");
        Ok(Dispatcher {
            registry: Arc::new(self.registry),
            services,
            store: self.store,
            settings: self.settings,
        })
    }
}
