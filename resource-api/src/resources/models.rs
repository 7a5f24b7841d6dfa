use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::AccessScope;
use crate::resource::{FieldValue, Link, Resource};

/// Repository an object belongs to, as far as visibility is concerned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    /// Repository id
    pub repository_id: u64,
    /// Login of the repository owner
    pub owner: String,
    /// Whether the repository is private
    pub private: bool,
}

impl Ownership {
    /// Ownership of objects inside a repository
    pub fn of(repository: &Repository) -> Self {
        Self {
            repository_id: repository.id,
            owner: repository.owner_login.clone(),
            private: repository.private,
        }
    }

    fn scope(&self) -> AccessScope {
        AccessScope::repository(self.repository_id, self.owner.clone(), self.private)
    }
}

/// A GitHub user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User id
    pub id: u64,
    /// GitHub login
    pub login: String,
    /// Display name
    pub name: Option<String>,
    /// Id on GitHub
    pub github_id: Option<u64>,
    /// Whether a GitHub sync is running
    #[serde(default)]
    pub is_syncing: bool,
    /// End of the last GitHub sync
    pub synced_at: Option<DateTime<Utc>>,
}

impl Resource for User {
    fn resource_type(&self) -> &'static str {
        "user"
    }

    fn id(&self) -> u64 {
        self.id
    }

    fn slug(&self) -> Option<String> {
        Some(self.login.clone())
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        let value = match name {
            "id" => FieldValue::scalar(self.id),
            "login" => FieldValue::scalar(self.login.as_str()),
            "name" => FieldValue::scalar(self.name.clone()),
            "github_id" => FieldValue::scalar(self.github_id),
            "is_syncing" => FieldValue::scalar(self.is_syncing),
            "synced_at" => FieldValue::timestamp(self.synced_at),
            _ => return None,
        };
        Some(value)
    }
}

/// A repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Repository id
    pub id: u64,
    /// Name below the owner
    pub name: String,
    /// Id of the owning user
    pub owner_id: u64,
    /// Login of the owning user
    pub owner_login: String,
    /// Description from GitHub
    pub description: Option<String>,
    /// Main language reported by GitHub
    pub github_language: Option<String>,
    /// Whether builds are enabled
    #[serde(default)]
    pub active: bool,
    /// Private repositories need a pull grant
    #[serde(default)]
    pub private: bool,
    /// Most recent build
    pub last_build_id: Option<u64>,
    /// Name of the default branch
    pub default_branch: String,
}

impl Repository {
    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner_login, self.name)
    }
}

impl Resource for Repository {
    fn resource_type(&self) -> &'static str {
        "repository"
    }

    fn id(&self) -> u64 {
        self.id
    }

    fn slug(&self) -> Option<String> {
        Some(self.full_name())
    }

    fn href_path(&self) -> String {
        format!("repo/{}", self.id)
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        let value = match name {
            "id" => FieldValue::scalar(self.id),
            "name" => FieldValue::scalar(self.name.as_str()),
            "slug" => FieldValue::scalar(self.full_name()),
            "description" => FieldValue::scalar(self.description.clone()),
            "github_language" => FieldValue::scalar(self.github_language.clone()),
            "active" => FieldValue::scalar(self.active),
            "private" => FieldValue::scalar(self.private),
            "owner" => FieldValue::link("user", Some(self.owner_id)),
            "last_build" => FieldValue::link("build", self.last_build_id),
            "default_branch" => FieldValue::One(Some(Link::named(
                "branch",
                self.id,
                self.default_branch.as_str(),
            ))),
            _ => return None,
        };
        Some(value)
    }

    fn access_scope(&self) -> AccessScope {
        AccessScope::repository(self.id, self.owner_login.clone(), self.private)
    }
}

/// A build: one run of the configured matrix for a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    /// Build id
    pub id: u64,
    /// Build number within the repository
    pub number: String,
    /// Current state (`created`, `started`, `passed`, ...)
    pub state: String,
    /// Wall time in seconds
    pub duration: Option<u64>,
    /// What triggered the build (`push`, `pull_request`, `api`)
    pub event_type: String,
    /// State of the previous build on the branch
    pub previous_state: Option<String>,
    /// When the first job started
    pub started_at: Option<DateTime<Utc>>,
    /// When the last job finished
    pub finished_at: Option<DateTime<Utc>>,
    /// Name of the built branch
    pub branch: String,
    /// Built commit
    pub commit_id: Option<u64>,
    /// Jobs of the build matrix, in order
    #[serde(default)]
    pub job_ids: Vec<u64>,
    /// Visibility of the enclosing repository
    pub ownership: Ownership,
}

impl Resource for Build {
    fn resource_type(&self) -> &'static str {
        "build"
    }

    fn id(&self) -> u64 {
        self.id
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        let value = match name {
            "id" => FieldValue::scalar(self.id),
            "number" => FieldValue::scalar(self.number.as_str()),
            "state" => FieldValue::scalar(self.state.as_str()),
            "duration" => FieldValue::scalar(self.duration),
            "event_type" => FieldValue::scalar(self.event_type.as_str()),
            "previous_state" => FieldValue::scalar(self.previous_state.clone()),
            "started_at" => FieldValue::timestamp(self.started_at),
            "finished_at" => FieldValue::timestamp(self.finished_at),
            "repository" => FieldValue::link("repository", Some(self.ownership.repository_id)),
            "branch" => FieldValue::One(Some(Link::named(
                "branch",
                self.ownership.repository_id,
                self.branch.as_str(),
            ))),
            "commit" => FieldValue::link("commit", self.commit_id),
            "jobs" => FieldValue::links("job", &self.job_ids),
            _ => return None,
        };
        Some(value)
    }

    fn access_scope(&self) -> AccessScope {
        self.ownership.scope()
    }
}

/// A job: one entry of a build matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Job id
    pub id: u64,
    /// `<build>.<index>`
    pub number: String,
    /// Current state
    pub state: String,
    /// When a worker picked the job up
    pub started_at: Option<DateTime<Utc>>,
    /// When the job finished
    pub finished_at: Option<DateTime<Utc>>,
    /// Build the job belongs to
    pub build_id: u64,
    /// Worker queue
    pub queue: String,
    /// Commit the job runs
    pub commit_id: Option<u64>,
    /// Id of the repository owner
    pub owner_id: u64,
    /// Visibility of the enclosing repository
    pub ownership: Ownership,
}

impl Resource for Job {
    fn resource_type(&self) -> &'static str {
        "job"
    }

    fn id(&self) -> u64 {
        self.id
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        let value = match name {
            "id" => FieldValue::scalar(self.id),
            "number" => FieldValue::scalar(self.number.as_str()),
            "state" => FieldValue::scalar(self.state.as_str()),
            "started_at" => FieldValue::timestamp(self.started_at),
            "finished_at" => FieldValue::timestamp(self.finished_at),
            "build" => FieldValue::link("build", Some(self.build_id)),
            "queue" => FieldValue::scalar(self.queue.as_str()),
            "repository" => FieldValue::link("repository", Some(self.ownership.repository_id)),
            "commit" => FieldValue::link("commit", self.commit_id),
            "owner" => FieldValue::link("user", Some(self.owner_id)),
            _ => return None,
        };
        Some(value)
    }

    fn access_scope(&self) -> AccessScope {
        self.ownership.scope()
    }
}

/// A branch; addressed by repository and name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Branch id
    pub id: u64,
    /// Git branch name
    pub name: String,
    /// Whether this is the repository default
    #[serde(default)]
    pub default_branch: bool,
    /// False once the branch is deleted upstream
    #[serde(default = "exists")]
    pub exists_on_github: bool,
    /// Most recent build on the branch
    pub last_build_id: Option<u64>,
    /// Visibility of the enclosing repository
    pub ownership: Ownership,
}

fn exists() -> bool {
    true
}

impl Resource for Branch {
    fn resource_type(&self) -> &'static str {
        "branch"
    }

    fn id(&self) -> u64 {
        self.id
    }

    fn slug(&self) -> Option<String> {
        Some(self.name.clone())
    }

    fn href_path(&self) -> String {
        format!("repo/{}/branch/{}", self.ownership.repository_id, self.name)
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        let value = match name {
            "name" => FieldValue::scalar(self.name.as_str()),
            "repository" => FieldValue::link("repository", Some(self.ownership.repository_id)),
            "default_branch" => FieldValue::scalar(self.default_branch),
            "exists_on_github" => FieldValue::scalar(self.exists_on_github),
            "last_build" => FieldValue::link("build", self.last_build_id),
            _ => return None,
        };
        Some(value)
    }

    fn access_scope(&self) -> AccessScope {
        self.ownership.scope()
    }
}

/// A commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Commit id
    pub id: u64,
    /// Full commit sha
    pub sha: String,
    /// Git ref the commit was pushed to
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    /// Commit message
    pub message: String,
    /// GitHub compare view
    pub compare_url: Option<String>,
    /// Commit timestamp
    pub committed_at: Option<DateTime<Utc>>,
    /// Visibility of the enclosing repository
    pub ownership: Ownership,
}

impl Resource for Commit {
    fn resource_type(&self) -> &'static str {
        "commit"
    }

    fn id(&self) -> u64 {
        self.id
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        let value = match name {
            "id" => FieldValue::scalar(self.id),
            "sha" => FieldValue::scalar(self.sha.as_str()),
            "ref" => FieldValue::scalar(self.git_ref.clone()),
            "message" => FieldValue::scalar(self.message.as_str()),
            "compare_url" => FieldValue::scalar(self.compare_url.clone()),
            "committed_at" => FieldValue::timestamp(self.committed_at),
            _ => return None,
        };
        Some(value)
    }

    fn access_scope(&self) -> AccessScope {
        self.ownership.scope()
    }
}
