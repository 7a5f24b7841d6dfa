//! # resource-api
//!
//! Request core of a versioned, hypermedia-style JSON API over a graph of
//! CI resources (repositories, builds, jobs, branches, commits, users).
//!
//! ## Features
//!
//! - **Dispatch**: one [`Service`](service::Service) per result type and action, driven
//!   through a fixed pipeline by the [`Dispatcher`](service::Dispatcher)
//! - **Representations**: `standard` and `minimal` documents with `@type`, `@href`
//!   and `@representation` on every object, expanded on request through `include`
//! - **Access masking**: objects the caller may not see are indistinguishable from
//!   objects that do not exist
//! - **Pagination**: `limit`/`offset` with `@pagination` links on collections
//! - **Configuration**: figment layering of files and `RESOURCE_API_` environment variables
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use resource_api::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let store = Arc::new(resource_api::testing::fixture_store());
//!     let dispatcher = resource_api::services::dispatcher(store, &config)?;
//!
//!     let rendered = dispatcher
//!         .call(
//!             Request::new("repository", "find")
//!                 .path("repo/1")
//!                 .query("include", "repository.last_build")
//!                 .param("repository.id", "1"),
//!             Arc::new(Anonymous::new()),
//!         )
//!         .await;
//!     println!("{} {}", rendered.status, rendered.body);
//!     Ok(())
//! }
//! ```

pub mod access;
pub mod config;
pub mod context;
pub mod error;
pub mod include;
pub mod observability;
pub mod pagination;
pub mod params;
pub mod query;
pub mod registry;
pub mod render;
pub mod resource;
pub mod resources;
pub mod service;
pub mod services;
pub mod store;

/// Fixture graph for tests and demos
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::access::{AccessControl, AccessScope, Anonymous, ApplicationAccess, UserAccess};
    pub use crate::config::{ApiConfig, Config};
    pub use crate::context::Context;
    pub use crate::error::{ApiError, ApiErrorKind, ApiResult, Error, Result};
    pub use crate::observability::init_tracing;
    pub use crate::pagination::Paginator;
    pub use crate::params::{ParamScope, Params};
    pub use crate::registry::{Registry, Representation, ResourceType};
    pub use crate::resource::{FieldValue, Link, Lookup, Resource, ResourceRef};
    pub use crate::resources::MemoryStore;
    pub use crate::service::{Dispatcher, Outcome, Rendered, Request, Service};
    pub use crate::store::Store;

    pub use async_trait::async_trait;
    pub use http::StatusCode;
}
