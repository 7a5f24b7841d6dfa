//! Built-in services
//!
//! | route | result type | action |
//! |---|---|---|
//! | `GET /repo/{repository.id}` | `repository` | `find` |
//! | `GET /build/{build.id}` | `build` | `find` |
//! | `GET /job/{job.id}` | `job` | `find` |
//! | `GET /repo/{repository.id}/branch/{branch.name}` | `branch` | `find` |
//! | `GET /user/{user.id}` | `user` | `find` |
//! | `GET /user` | `user` | `current` |
//! | `GET /owner/{owner.login}/repos` | `repository` | `for_owner` |
//! | `GET /repos` | `repository` | `for_current_user` |
//!
//! Routing belongs to the transport, which fills a
//! [`Request`](crate::service::Request) with the action and route captures.

mod find;
mod repositories;
mod user;

use std::sync::Arc;

pub use find::{Find, FindBranch};
pub use repositories::{ForCurrentUser, ForOwner};
pub use user::CurrentUser;

use crate::config::Config;
use crate::error::Result;
use crate::resources;
use crate::service::Dispatcher;
use crate::store::Store;

/// Dispatcher for the built-in resource types and services
pub fn dispatcher(store: Arc<dyn Store>, config: &Config) -> Result<Dispatcher> {
    Dispatcher::builder(resources::registry()?, store)
        .settings(config.api.clone())
        .service(Find::new("repository").or_slug("slug"))
        .service(Find::new("build"))
        .service(Find::new("job"))
        .service(Find::new("user").or_slug("login"))
        .service(FindBranch)
        .service(CurrentUser)
        .service(ForOwner)
        .service(ForCurrentUser)
        .build()
}
