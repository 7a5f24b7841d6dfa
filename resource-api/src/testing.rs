//! Fixture data for tests and demos
//!
//! | object | notes |
//! |---|---|
//! | user 1 `svenfuchs`, user 2 `other` | |
//! | repository 1 `svenfuchs/minimal` | public, active, last build 10, default branch `master` |
//! | repository 2 `svenfuchs/private-repo` | private, default branch `main` |
//! | repository 3 `svenfuchs/archived` | public, inactive |
//! | repository 4 `other/shared` | public, owned by user 2 |
//! | build 10 (#2, passed), build 11 (#3, configured) | repository 1 |
//! | jobs 20, 21 (build 10), jobs 22, 23 (build 11) | |
//! | branch 30 `master` (repository 1), branch 31 `main` (repository 2) | |
//! | commits 100, 101 | repository 1 |
//!
//! User 1 is a member of repositories 1 to 3, user 2 of repository 4.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use crate::resource::ResourceRef;
use crate::resources::{Branch, Build, Commit, Job, MemoryStore, Ownership, Repository, User};

fn at(hour: u32, minute: u32) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(2010, 11, 12, hour, minute, 0).single()
}

fn user(id: u64, login: &str, name: &str) -> User {
    User {
        id,
        login: login.to_string(),
        name: Some(name.to_string()),
        github_id: Some(1000 + id),
        is_syncing: false,
        synced_at: at(10, 0),
    }
}

/// `svenfuchs/minimal`
pub fn minimal_repository() -> Repository {
    Repository {
        id: 1,
        name: "minimal".to_string(),
        owner_id: 1,
        owner_login: "svenfuchs".to_string(),
        description: Some("minimal test repository".to_string()),
        github_language: None,
        active: true,
        private: false,
        last_build_id: Some(10),
        default_branch: "master".to_string(),
    }
}

/// Every fixture repository, ordered by id
pub fn repositories() -> Vec<Repository> {
    vec![
        minimal_repository(),
        Repository {
            id: 2,
            name: "private-repo".to_string(),
            description: None,
            private: true,
            last_build_id: None,
            default_branch: "main".to_string(),
            ..minimal_repository()
        },
        Repository {
            id: 3,
            name: "archived".to_string(),
            description: None,
            active: false,
            last_build_id: None,
            ..minimal_repository()
        },
        Repository {
            id: 4,
            name: "shared".to_string(),
            owner_id: 2,
            owner_login: "other".to_string(),
            description: None,
            last_build_id: None,
            ..minimal_repository()
        },
    ]
}

/// Fixture repositories as resource handles
pub fn fixture_repositories() -> Vec<ResourceRef> {
    repositories()
        .into_iter()
        .map(|repo| Arc::new(repo) as ResourceRef)
        .collect()
}

fn build(id: u64, number: &str, state: &str, job_ids: Vec<u64>, commit_id: u64) -> Build {
    let finished = state == "passed";
    Build {
        id,
        number: number.to_string(),
        state: state.to_string(),
        duration: finished.then_some(300),
        event_type: "push".to_string(),
        previous_state: Some("passed".to_string()),
        started_at: if finished { at(12, 0) } else { None },
        finished_at: if finished { at(12, 5) } else { None },
        branch: "master".to_string(),
        commit_id: Some(commit_id),
        job_ids,
        ownership: Ownership::of(&minimal_repository()),
    }
}

fn job(id: u64, number: &str, build_id: u64, state: &str) -> Job {
    Job {
        id,
        number: number.to_string(),
        state: state.to_string(),
        started_at: None,
        finished_at: None,
        build_id,
        queue: "builds.linux".to_string(),
        commit_id: Some(if build_id == 10 { 100 } else { 101 }),
        owner_id: 1,
        ownership: Ownership::of(&minimal_repository()),
    }
}

fn commit(id: u64, sha: &str, message: &str) -> Commit {
    Commit {
        id,
        sha: sha.to_string(),
        git_ref: Some("refs/heads/master".to_string()),
        message: message.to_string(),
        compare_url: Some(format!(
            "https://github.com/svenfuchs/minimal/compare/{}",
            sha.chars().take(7).collect::<String>()
        )),
        committed_at: at(11, 0),
        ownership: Ownership::of(&minimal_repository()),
    }
}

/// Store populated with the fixture graph
pub fn fixture_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    let repos = repositories();

    store
        .insert(user(1, "svenfuchs", "Sven Fuchs"))
        .insert(user(2, "other", "Other User"));
    for repo in &repos {
        store.insert(repo.clone());
    }

    store
        .insert(build(10, "2", "passed", vec![20, 21], 100))
        .insert(build(11, "3", "configured", vec![22, 23], 101))
        .insert(job(20, "2.1", 10, "passed"))
        .insert(job(21, "2.2", 10, "passed"))
        .insert(job(22, "3.1", 11, "configured"))
        .insert(job(23, "3.2", 11, "configured"))
        .insert(commit(100, "add057e66c3e1d59ef1f", "unignore Gemfile.lock"))
        .insert(commit(101, "0c3f7a2b45e1d59ef1f0", "add README"));

    store
        .insert(Branch {
            id: 30,
            name: "master".to_string(),
            default_branch: true,
            exists_on_github: true,
            last_build_id: Some(11),
            ownership: Ownership::of(&repos[0]),
        })
        .insert(Branch {
            id: 31,
            name: "main".to_string(),
            default_branch: true,
            exists_on_github: true,
            last_build_id: None,
            ownership: Ownership::of(&repos[1]),
        });

    store
        .add_membership(1, 1)
        .add_membership(1, 2)
        .add_membership(1, 3)
        .add_membership(2, 4);
    store
}
