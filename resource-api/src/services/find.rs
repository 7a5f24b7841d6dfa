//! Single-object lookups
//!
//! `repository.find`, `build.find`, `job.find` and `user.find` share one
//! implementation: the object is addressed by `<type>.id` or, where the type
//! has one, by a slug-like field. Branches are addressed by repository and
//! name instead.

use async_trait::async_trait;

use crate::context::Context;
use crate::error::{ApiError, ApiResult};
use crate::params::ParamScope;
use crate::resource::Lookup;
use crate::service::{Outcome, Service};

/// Look up one object by id, or by a slug field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Find {
    result_type: &'static str,
    slug_field: Option<&'static str>,
}

impl Find {
    /// Find by `<type>.id`
    #[must_use]
    pub const fn new(result_type: &'static str) -> Self {
        Self {
            result_type,
            slug_field: None,
        }
    }

    /// Also accept `<type>.<field>` as a slug lookup
    #[must_use]
    pub const fn or_slug(mut self, field: &'static str) -> Self {
        self.slug_field = Some(field);
        self
    }

    fn lookup(&self, ctx: &Context) -> ApiResult<Lookup> {
        if let Some(raw) = qualified_param(ctx, self.result_type, "id") {
            return parse_id(self.result_type, raw).map(Lookup::Id);
        }
        if let Some(field) = self.slug_field {
            if let Some(slug) = qualified_param(ctx, self.result_type, field) {
                return Ok(Lookup::Slug(slug.to_string()));
            }
        }
        Err(ApiError::wrong_params(format!(
            "missing {}.id",
            self.result_type
        )))
    }
}

#[async_trait]
impl Service for Find {
    fn result_type(&self) -> &'static str {
        self.result_type
    }

    fn action(&self) -> &'static str {
        "find"
    }

    fn scope(&self) -> ParamScope {
        let scope = ParamScope::new(self.result_type).field("id");
        match self.slug_field {
            Some(field) => scope.field(field),
            None => scope,
        }
    }

    async fn run(&self, ctx: &Context) -> ApiResult<Option<Outcome>> {
        let lookup = self.lookup(ctx)?;
        let object = ctx.find(self.result_type, &lookup).await?;
        Ok(Some(Outcome::Object(object)))
    }
}

/// `branch.find`: a branch by repository id and name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindBranch;

#[async_trait]
impl Service for FindBranch {
    fn result_type(&self) -> &'static str {
        "branch"
    }

    fn action(&self) -> &'static str {
        "find"
    }

    fn scope(&self) -> ParamScope {
        ParamScope::new("branch")
            .field("name")
            .prefixed("repository", "id")
    }

    async fn run(&self, ctx: &Context) -> ApiResult<Option<Outcome>> {
        let parent = ctx
            .param("repository.id")
            .ok_or_else(|| ApiError::wrong_params("missing repository.id"))?;
        let parent = parse_id("repository", parent)?;
        let name = qualified_param(ctx, "branch", "name")
            .ok_or_else(|| ApiError::wrong_params("missing branch.name"))?;

        // the branch hides behind its repository
        ctx.find("repository", &Lookup::Id(parent)).await?;
        let branch = ctx
            .find(
                "branch",
                &Lookup::Named {
                    parent,
                    name: name.to_string(),
                },
            )
            .await?;
        Ok(Some(Outcome::Object(branch)))
    }
}

/// `<type>.<field>`, falling back to the plain key
fn qualified_param<'a>(ctx: &'a Context, resource_type: &str, field: &str) -> Option<&'a str> {
    ctx.param(&format!("{}.{}", resource_type, field))
        .or_else(|| ctx.param(field))
}

/// Ids that do not parse cannot exist
fn parse_id(resource_type: &str, raw: &str) -> ApiResult<u64> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::entity_missing(resource_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Params;

    #[test]
    fn test_scope_keys() {
        let scope = Find::new("repository").or_slug("slug").scope();
        assert!(scope.accepts("repository.id"));
        assert!(scope.accepts("repository.slug"));
        assert!(scope.accepts("id"));
        assert!(!scope.accepts("limit"));

        let scope = Find::new("build").scope();
        assert!(scope.accepts("build.id"));
        assert!(!scope.accepts("build.slug"));
    }

    #[test]
    fn test_branch_scope_accepts_repository_id() {
        let scope = FindBranch.scope();
        let filtered = scope.filter(
            &Params::new()
                .with("repository.id", "1")
                .with("branch.name", "master")
                .with("sort_by", "name"),
        );
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_unparsable_id_is_missing() {
        let err = parse_id("build", "ten").unwrap_err();
        assert!(err.is_entity_missing());
        assert_eq!(parse_id("build", " 10 ").unwrap(), 10);
    }
}
