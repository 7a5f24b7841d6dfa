//! Built-in resource types
//!
//! Declarations for the CI domain served by the API: repositories, builds,
//! jobs, branches, commits and users. Field order here is the output order.

mod memory;
mod models;

pub use memory::MemoryStore;
pub use models::{Branch, Build, Commit, Job, Ownership, Repository, User};

use crate::error::Result;
use crate::query::StoreQuery;
use crate::registry::{Association, Registry, ResourceType};

/// `repository`
pub const REPOSITORY: ResourceType = ResourceType {
    name: "repository",
    plural: "repositories",
    fields: &[
        "id",
        "name",
        "slug",
        "description",
        "github_language",
        "active",
        "private",
        "owner",
        "last_build",
        "default_branch",
    ],
    minimal: &["id", "name", "slug"],
    associations: &[
        Association::new("owner", "user"),
        Association::new("last_build", "build"),
        Association::new("default_branch", "branch"),
    ],
    permissions: &["read", "enable", "disable", "create_request"],
};

/// `build`
pub const BUILD: ResourceType = ResourceType {
    name: "build",
    plural: "builds",
    fields: &[
        "id",
        "number",
        "state",
        "duration",
        "event_type",
        "previous_state",
        "started_at",
        "finished_at",
        "repository",
        "branch",
        "commit",
        "jobs",
    ],
    minimal: &["id"],
    associations: &[
        Association::new("repository", "repository"),
        Association::new("branch", "branch"),
        Association::new("commit", "commit"),
        Association::new("jobs", "job"),
    ],
    permissions: &[],
};

/// `job`
pub const JOB: ResourceType = ResourceType {
    name: "job",
    plural: "jobs",
    fields: &[
        "id",
        "number",
        "state",
        "started_at",
        "finished_at",
        "build",
        "queue",
        "repository",
        "commit",
        "owner",
    ],
    minimal: &["id"],
    associations: &[
        Association::new("build", "build"),
        Association::new("repository", "repository"),
        Association::new("commit", "commit"),
        Association::new("owner", "user"),
    ],
    permissions: &[],
};

/// `branch`
pub const BRANCH: ResourceType = ResourceType {
    name: "branch",
    plural: "branches",
    fields: &[
        "name",
        "repository",
        "default_branch",
        "exists_on_github",
        "last_build",
    ],
    minimal: &["name"],
    associations: &[
        Association::new("repository", "repository"),
        Association::capped("last_build", "build", 2),
    ],
    permissions: &[],
};

/// `user`
pub const USER: ResourceType = ResourceType {
    name: "user",
    plural: "users",
    fields: &["id", "login", "name", "github_id", "is_syncing", "synced_at"],
    minimal: &["id", "login"],
    associations: &[],
    permissions: &[],
};

/// `commit`
pub const COMMIT: ResourceType = ResourceType {
    name: "commit",
    plural: "commits",
    fields: &["id", "sha", "ref", "message", "compare_url", "committed_at"],
    minimal: &["id", "sha"],
    associations: &[],
    permissions: &[],
};

/// Every built-in type, resolved through the store
pub fn registry() -> Result<Registry> {
    [REPOSITORY, BUILD, JOB, BRANCH, USER, COMMIT]
        .into_iter()
        .fold(Registry::builder(), |builder, declaration| {
            builder.resource(declaration, StoreQuery::factory)
        })
        .build()
}
