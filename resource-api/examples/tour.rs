//! Tour of the fixture API
//!
//! Dispatches a handful of requests against the fixture graph and prints the
//! documents: a plain lookup, an include expansion, a masked private
//! repository, a rejected include and a paginated listing.
//!
//! Run with: cargo run --example tour
//!
//! Set `RESOURCE_API_API__DEFAULT_LIMIT=1` to see more pages.

use std::sync::Arc;

use resource_api::prelude::*;

fn find_repository(id: &str) -> Request {
    Request::new("repository", "find")
        .path(format!("repo/{}", id))
        .param("repository.id", id)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_tracing(&config)?;

    let store = Arc::new(resource_api::testing::fixture_store());
    let dispatcher = resource_api::services::dispatcher(store, &config)?;

    let anonymous: Arc<dyn AccessControl> = Arc::new(Anonymous::new());
    let owner: Arc<dyn AccessControl> = Arc::new(UserAccess::new(1).with_pull(2));

    let requests = [
        ("public repository", find_repository("1"), &anonymous),
        (
            "included last build",
            find_repository("1").query("include", "repository.last_build,build.jobs"),
            &anonymous,
        ),
        ("private repository, anonymous", find_repository("2"), &anonymous),
        ("private repository, owner", find_repository("2"), &owner),
        (
            "bad include",
            find_repository("1").query("include", "repository.last_build.jobs"),
            &anonymous,
        ),
        (
            "owner listing",
            Request::new("repository", "for_owner")
                .path("owner/svenfuchs/repos")
                .param("owner.login", "svenfuchs"),
            &anonymous,
        ),
    ];

    for (title, request, access) in requests {
        let rendered = dispatcher.call(request, Arc::clone(access)).await;
        let body = serde_json::to_string_pretty(&rendered.body)
            .map_err(|err| Error::Internal(err.to_string()))?;
        println!("# {} ({})\n{}\n", title, rendered.status, body);
    }

    Ok(())
}
