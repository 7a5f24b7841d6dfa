//! Repository listings
//!
//! Both listings accept `repository.private`, `repository.active` and
//! `sort_by`, and are paginated with the configured limits.

use async_trait::async_trait;

use crate::config::ApiConfig;
use crate::context::Context;
use crate::error::{ApiError, ApiResult};
use crate::pagination::Paginator;
use crate::params::ParamScope;
use crate::resource::Lookup;
use crate::service::{Outcome, Service};

fn listing_scope() -> ParamScope {
    ParamScope::new("repository")
        .field("private")
        .field("active")
        .param("sort_by")
        .paginated()
}

/// `owner.repositories`: repositories of one owner, by login
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForOwner;

#[async_trait]
impl Service for ForOwner {
    fn result_type(&self) -> &'static str {
        "repository"
    }

    fn action(&self) -> &'static str {
        "for_owner"
    }

    fn scope(&self) -> ParamScope {
        listing_scope().prefixed("owner", "login")
    }

    fn paginator(&self, settings: &ApiConfig) -> Option<Paginator> {
        Some(Paginator::from_config(settings))
    }

    async fn run(&self, ctx: &Context) -> ApiResult<Option<Outcome>> {
        let login = ctx
            .param("owner.login")
            .or_else(|| ctx.param("login"))
            .ok_or_else(|| ApiError::wrong_params("missing owner.login"))?;

        let owner = match ctx.find("user", &Lookup::Slug(login.to_string())).await {
            Ok(owner) => owner,
            Err(err) if err.is_not_found() => return Err(ApiError::entity_missing("owner")),
            Err(err) => return Err(err),
        };
        let login = owner.slug().unwrap_or_else(|| login.to_string());

        let repositories = ctx.find_all("repository", &Lookup::Owner(login)).await?;
        Ok(Some(Outcome::Collection(repositories)))
    }
}

/// `repositories.for_current_user`: repositories the logged-in user is a member of
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForCurrentUser;

#[async_trait]
impl Service for ForCurrentUser {
    fn result_type(&self) -> &'static str {
        "repository"
    }

    fn action(&self) -> &'static str {
        "for_current_user"
    }

    fn scope(&self) -> ParamScope {
        listing_scope()
    }

    fn paginator(&self, settings: &ApiConfig) -> Option<Paginator> {
        Some(Paginator::from_config(settings))
    }

    async fn run(&self, ctx: &Context) -> ApiResult<Option<Outcome>> {
        let user_id = ctx.current_user_id()?;
        let repositories = ctx
            .find_all("repository", &Lookup::Member(user_id))
            .await?;
        Ok(Some(Outcome::Collection(repositories)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_scope() {
        let scope = ForOwner.scope();
        for key in [
            "repository.private",
            "repository.active",
            "sort_by",
            "limit",
            "offset",
            "owner.login",
            "include",
        ] {
            assert!(scope.accepts(key), "{key} should be accepted");
        }
        assert!(!scope.accepts("repository.name"));
        assert!(!ForCurrentUser.scope().accepts("owner.login"));
    }

    #[test]
    fn test_listings_are_paginated() {
        let settings = ApiConfig::default();
        let paginator = ForCurrentUser.paginator(&settings).unwrap();
        assert_eq!(paginator.default_limit(), 25);
        assert_eq!(paginator.max_limit(), 100);
    }
}
