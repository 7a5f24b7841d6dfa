//! Representation engine
//!
//! Turns domain objects into ordered JSON documents. Every document starts
//! with `@type`, `@href` and `@representation`, followed by `@permissions`
//! for types that declare capabilities, then the fields of the active level
//! in declared order.
//!
//! Associations are resolved through the request's memoized queries and
//! rendered at minimal level unless the include directive names them. A
//! nested object collapses to a bare `{"@href": ...}` stub when the caller
//! may not see it, when it is already on the current render path (a cycle
//! such as build, job, build), or when the association's depth cap is reached.

use futures::future::{BoxFuture, FutureExt};
use serde_json::{Map, Value};

use crate::context::Context;
use crate::error::{ApiError, ApiResult};
use crate::pagination::{Page, Pagination};
use crate::registry::{Representation, ResourceType};
use crate::resource::{identity, FieldValue, Link, ResourceRef};

/// Objects currently being rendered, outermost first
type RenderPath = Vec<(&'static str, u64)>;

/// Renders objects for one request
#[derive(Debug, Clone, Copy)]
pub struct Renderer<'a> {
    ctx: &'a Context,
}

impl<'a> Renderer<'a> {
    /// Renderer bound to a request context
    #[must_use]
    pub fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Top-level object at standard level
    pub async fn object(&self, object: ResourceRef) -> ApiResult<Value> {
        self.render(object, Representation::Standard, RenderPath::new())
            .await
    }

    /// Object at an explicit level, outside any render path
    pub async fn object_at(&self, object: ResourceRef, level: Representation) -> ApiResult<Value> {
        self.render(object, level, RenderPath::new()).await
    }

    /// Unpaginated collection of the request's result type
    pub async fn collection(&self, items: Vec<ResourceRef>) -> ApiResult<Value> {
        self.collection_document(items, None).await
    }

    /// One page of the request's result type
    pub async fn page(&self, page: Page) -> ApiResult<Value> {
        let href = self.collection_href();
        let path = self.ctx.settings().href(self.ctx.path());
        let pagination = Pagination {
            meta: page.meta,
            links: page.meta.links(&path, self.ctx.query_params()),
        };
        let pagination = serde_json::to_value(pagination)
            .map_err(|err| ApiError::internal(format!("pagination: {}", err)))?;
        tracing::debug!(href = %href, count = page.meta.count, "rendering page");
        self.collection_document(page.items, Some(pagination)).await
    }

    /// Document for an accepted deferred operation
    #[must_use]
    pub fn accepted(resource_type: &str, payload: Map<String, Value>) -> Value {
        let mut doc = Map::new();
        doc.insert("@type".into(), Value::from("pending"));
        doc.insert("resource_type".into(), Value::from(resource_type));
        for (key, value) in payload {
            doc.entry(key).or_insert(value);
        }
        Value::Object(doc)
    }

    async fn collection_document(
        &self,
        items: Vec<ResourceRef>,
        pagination: Option<Value>,
    ) -> ApiResult<Value> {
        let declaration = self.declaration(self.ctx.result_type())?;

        let mut rendered = Vec::with_capacity(items.len());
        for item in items {
            rendered.push(
                self.render(item, Representation::Standard, RenderPath::new())
                    .await?,
            );
        }

        let mut doc = Map::new();
        doc.insert("@type".into(), Value::from(declaration.plural));
        doc.insert("@href".into(), Value::from(self.collection_href()));
        doc.insert(
            "@representation".into(),
            Value::from(Representation::Standard.as_str()),
        );
        if let Some(pagination) = pagination {
            doc.insert("@pagination".into(), pagination);
        }
        doc.insert(declaration.plural.into(), Value::Array(rendered));
        Ok(Value::Object(doc))
    }

    /// Collection path with the filtered query string
    fn collection_href(&self) -> String {
        let path = self.ctx.settings().href(self.ctx.path());
        let query = self.ctx.query_params();
        if query.is_empty() {
            path
        } else {
            format!("{}?{}", path, query.to_query_string())
        }
    }

    fn declaration(&self, resource_type: &str) -> ApiResult<&'a ResourceType> {
        self.ctx.registry().get(resource_type).ok_or_else(|| {
            ApiError::internal(format!("no declaration for resource type {}", resource_type))
        })
    }

    fn href(&self, object: &ResourceRef) -> String {
        self.ctx.settings().href(&object.href_path())
    }

    fn stub(&self, object: &ResourceRef) -> Value {
        let mut doc = Map::new();
        doc.insert("@href".into(), Value::from(self.href(object)));
        Value::Object(doc)
    }

    fn render(
        &self,
        object: ResourceRef,
        level: Representation,
        mut path: RenderPath,
    ) -> BoxFuture<'a, ApiResult<Value>> {
        let this = *self;
        async move {
            let declaration = this.declaration(object.resource_type())?;

            let mut doc = Map::new();
            doc.insert("@type".into(), Value::from(declaration.name));
            doc.insert("@href".into(), Value::from(this.href(&object)));
            doc.insert("@representation".into(), Value::from(level.as_str()));

            if level == Representation::Standard && !declaration.permissions.is_empty() {
                let access = this.ctx.access();
                let permissions: Map<String, Value> = declaration
                    .permissions
                    .iter()
                    .map(|action| {
                        (
                            (*action).to_string(),
                            Value::Bool(access.permits(object.as_ref(), action)),
                        )
                    })
                    .collect();
                doc.insert("@permissions".into(), Value::Object(permissions));
            }

            path.push(identity(object.as_ref()));
            for field in declaration.fields_for(level, this.ctx.includes()) {
                let value = match object.field(field) {
                    None | Some(FieldValue::One(None)) => Value::Null,
                    Some(FieldValue::Scalar(value)) => value,
                    Some(FieldValue::One(Some(link))) => {
                        this.render_link(declaration, field, &link, &path).await?
                    }
                    Some(FieldValue::Many(links)) => {
                        let mut items = Vec::with_capacity(links.len());
                        for link in &links {
                            let item = this.render_link(declaration, field, link, &path).await?;
                            if !item.is_null() {
                                items.push(item);
                            }
                        }
                        Value::Array(items)
                    }
                };
                doc.insert(field.to_string(), value);
            }

            Ok(Value::Object(doc))
        }
        .boxed()
    }

    /// Resolve and render one association target
    async fn render_link(
        &self,
        parent: &ResourceType,
        field: &str,
        link: &Link,
        path: &RenderPath,
    ) -> ApiResult<Value> {
        let query = self.ctx.query(link.resource_type)?;
        let Some(target) = query.find(&link.lookup).await? else {
            return Ok(Value::Null);
        };

        if !self.ctx.access().visible(target.as_ref()) {
            tracing::debug!(
                resource_type = target.resource_type(),
                id = target.id(),
                "nested object hidden from caller"
            );
            return Ok(self.stub(&target));
        }
        if path.contains(&identity(target.as_ref())) {
            return Ok(self.stub(&target));
        }
        let max_depth = parent
            .association(field)
            .and_then(|association| association.max_depth)
            .unwrap_or(self.ctx.settings().max_depth);
        if path.len() >= max_depth {
            return Ok(self.stub(&target));
        }

        let level = if self.ctx.includes().contains(parent.name, field) {
            Representation::Standard
        } else {
            Representation::Minimal
        };
        self.render(target, level, path.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{AccessControl, Anonymous, UserAccess};
    use crate::config::ApiConfig;
    use crate::context::ContextParts;
    use crate::params::Params;
    use crate::resource::Lookup;
    use crate::resources;
    use crate::testing;
    use serde_json::json;
    use std::sync::Arc;

    fn context(access: Arc<dyn AccessControl>, params: Params, settings: ApiConfig) -> Context {
        Context::open(ContextParts {
            access,
            registry: Arc::new(resources::registry().unwrap()),
            store: Arc::new(testing::fixture_store()),
            settings,
            result_type: "repository",
            query_params: params.clone(),
            params,
            path: "repo/1".to_string(),
        })
        .unwrap()
    }

    async fn render(ctx: &Context, resource_type: &str, id: u64) -> Value {
        let object = ctx
            .query(resource_type)
            .unwrap()
            .find(&Lookup::Id(id))
            .await
            .unwrap()
            .unwrap();
        Renderer::new(ctx).object(object).await.unwrap()
    }

    fn keys(value: &Value) -> Vec<&str> {
        value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect()
    }

    #[tokio::test]
    async fn test_field_order_and_meta_keys() {
        let ctx = context(Arc::new(Anonymous::new()), Params::new(), ApiConfig::default());
        let doc = render(&ctx, "repository", 1).await;
        assert_eq!(
            keys(&doc),
            vec![
                "@type",
                "@href",
                "@representation",
                "@permissions",
                "id",
                "name",
                "slug",
                "description",
                "github_language",
                "active",
                "private",
                "owner",
                "last_build",
                "default_branch"
            ]
        );
        assert_eq!(doc["@href"], "/v3/repo/1");
        assert_eq!(
            doc["@permissions"],
            json!({"read": true, "enable": false, "disable": false, "create_request": false})
        );
    }

    #[tokio::test]
    async fn test_nested_association_is_minimal() {
        let ctx = context(Arc::new(Anonymous::new()), Params::new(), ApiConfig::default());
        let doc = render(&ctx, "repository", 1).await;
        assert_eq!(
            doc["last_build"],
            json!({
                "@type": "build",
                "@href": "/v3/build/10",
                "@representation": "minimal",
                "id": 10
            })
        );
        assert_eq!(
            doc["owner"],
            json!({
                "@type": "user",
                "@href": "/v3/user/1",
                "@representation": "minimal",
                "id": 1,
                "login": "svenfuchs"
            })
        );
    }

    #[tokio::test]
    async fn test_minimal_is_subset_of_standard() {
        let ctx = context(Arc::new(Anonymous::new()), Params::new(), ApiConfig::default());
        for (resource_type, id) in [("repository", 1), ("build", 10), ("job", 20), ("user", 1)] {
            let object = ctx
                .query(resource_type)
                .unwrap()
                .find(&Lookup::Id(id))
                .await
                .unwrap()
                .unwrap();
            let renderer = Renderer::new(&ctx);
            let minimal = renderer
                .object_at(object.clone(), Representation::Minimal)
                .await
                .unwrap();
            let standard = renderer.object(object).await.unwrap();
            let declaration = ctx.registry().get(resource_type).unwrap();
            for key in keys(&minimal) {
                assert!(standard.get(key).is_some(), "{resource_type}.{key}");
            }
            for key in keys(&minimal).into_iter().filter(|key| !key.starts_with('@')) {
                assert!(declaration.minimal.contains(&key), "{resource_type}.{key}");
            }
        }
    }

    #[tokio::test]
    async fn test_included_association_expands_and_cycle_collapses() {
        let ctx = context(
            Arc::new(Anonymous::new()),
            Params::new().with("include", "repository.last_build"),
            ApiConfig::default(),
        );
        let doc = render(&ctx, "repository", 1).await;
        let build = &doc["last_build"];
        assert_eq!(build["@representation"], "standard");
        assert_eq!(build["state"], "passed");
        assert_eq!(build["repository"], json!({"@href": "/v3/repo/1"}));
        assert_eq!(build["jobs"].as_array().unwrap().len(), 2);
        assert_eq!(build["jobs"][0]["@representation"], "minimal");
    }

    #[tokio::test]
    async fn test_back_reference_in_job_build() {
        let ctx = context(
            Arc::new(Anonymous::new()),
            Params::new().with("include", "job.build,build.jobs"),
            ApiConfig::default(),
        );
        let doc = render(&ctx, "job", 20).await;
        let jobs = doc["build"]["jobs"].as_array().unwrap();
        assert_eq!(jobs[0], json!({"@href": "/v3/job/20"}));
        assert_eq!(jobs[1]["@type"], "job");
        assert_eq!(jobs[1]["id"], 21);
        assert_eq!(jobs[1]["build"], json!({"@href": "/v3/build/10"}));
    }

    #[tokio::test]
    async fn test_invisible_nested_object_is_stub_even_when_included() {
        let ctx = context(
            Arc::new(Anonymous::new()),
            Params::new().with("include", "branch.repository"),
            ApiConfig::default(),
        );
        let branch = ctx
            .query("branch")
            .unwrap()
            .find(&Lookup::Named {
                parent: 2,
                name: "main".into(),
            })
            .await
            .unwrap()
            .unwrap();
        let doc = Renderer::new(&ctx).object(branch).await.unwrap();
        assert_eq!(doc["repository"], json!({"@href": "/v3/repo/2"}));
    }

    #[tokio::test]
    async fn test_depth_cap() {
        let settings = ApiConfig {
            max_depth: 1,
            ..ApiConfig::default()
        };
        let ctx = context(
            Arc::new(Anonymous::new()),
            Params::new().with("include", "repository.last_build"),
            settings,
        );
        let doc = render(&ctx, "repository", 1).await;
        assert_eq!(doc["last_build"], json!({"@href": "/v3/build/10"}));
    }

    #[tokio::test]
    async fn test_included_field_added_at_minimal_level() {
        let ctx = context(
            Arc::new(Anonymous::new()),
            Params::new().with("include", "build.state"),
            ApiConfig::default(),
        );
        let doc = render(&ctx, "repository", 1).await;
        assert_eq!(
            doc["last_build"],
            json!({
                "@type": "build",
                "@href": "/v3/build/10",
                "@representation": "minimal",
                "id": 10,
                "state": "passed"
            })
        );
    }

    #[tokio::test]
    async fn test_rendering_is_repeatable_within_request() {
        let ctx = context(
            Arc::new(UserAccess::new(1).with_pull(2)),
            Params::new(),
            ApiConfig::default(),
        );
        let first = render(&ctx, "repository", 1).await;
        let second = render(&ctx, "repository", 1).await;
        assert_eq!(first, second);
    }

    #[test]
    fn test_accepted_document() {
        let mut payload = Map::new();
        payload.insert("request_id".into(), json!(7));
        payload.insert("@type".into(), json!("ignored"));
        assert_eq!(
            Renderer::accepted("request", payload),
            json!({"@type": "pending", "resource_type": "request", "request_id": 7})
        );
    }
}
