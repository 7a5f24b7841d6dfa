//! Offset pagination for collection results
//!
//! The access gate runs before slicing, so a page never contains an object
//! the caller cannot see and every count describes the visible set.
//!
//! # Example
//!
//! ```rust
//! use resource_api::pagination::PageMeta;
//!
//! let meta = PageMeta::new(10, 0, 25);
//! assert!(meta.is_first);
//! assert!(!meta.is_last);
//! assert_eq!(meta.next_offset(), Some(10));
//! assert_eq!(meta.last_offset(), 20);
//! ```

use serde::{Deserialize, Serialize};

use crate::access::AccessControl;
use crate::config::ApiConfig;
use crate::params::Params;
use crate::resource::ResourceRef;

/// Resolved `limit` and `offset`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Items per page, at least 1
    pub limit: usize,
    /// Items skipped
    pub offset: usize,
}

/// Page size policy for one service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    default_limit: usize,
    max_limit: usize,
}

impl Paginator {
    /// Create a paginator; both limits are at least 1
    #[must_use]
    pub fn new(default_limit: usize, max_limit: usize) -> Self {
        let max_limit = max_limit.max(1);
        Self {
            default_limit: default_limit.clamp(1, max_limit),
            max_limit,
        }
    }

    /// Paginator using the configured limits
    #[must_use]
    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(config.default_limit, config.max_limit)
    }

    /// Override the default page size, keeping the maximum
    #[must_use]
    pub fn with_default_limit(self, default_limit: usize) -> Self {
        Self::new(default_limit, self.max_limit)
    }

    /// Page size used when `limit` is missing or unusable
    #[must_use]
    pub fn default_limit(&self) -> usize {
        self.default_limit
    }

    /// Largest page size
    #[must_use]
    pub fn max_limit(&self) -> usize {
        self.max_limit
    }

    /// Read `limit` and `offset`
    ///
    /// A missing, non-numeric or zero `limit` falls back to the default and is
    /// capped at the maximum. A missing, non-numeric or negative `offset` is 0.
    #[must_use]
    pub fn resolve(&self, params: &Params) -> PageRequest {
        let limit = params
            .get_str("limit")
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|limit| *limit > 0)
            .unwrap_or(self.default_limit)
            .min(self.max_limit);

        let offset = params
            .get_str("offset")
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .unwrap_or(0);

        PageRequest { limit, offset }
    }

    /// Drop invisible items, then cut out the requested page
    pub fn paginate(
        &self,
        items: Vec<ResourceRef>,
        params: &Params,
        access: &dyn AccessControl,
    ) -> Page {
        let request = self.resolve(params);
        let visible: Vec<ResourceRef> = items
            .into_iter()
            .filter(|item| access.visible(item.as_ref()))
            .collect();

        let meta = PageMeta::new(request.limit, request.offset, visible.len());
        let items = visible
            .into_iter()
            .skip(request.offset)
            .take(request.limit)
            .collect();

        Page { items, meta }
    }
}

/// One page of visible items
#[derive(Debug, Clone)]
pub struct Page {
    /// Items on this page, in collection order
    pub items: Vec<ResourceRef>,
    /// Position of the page within the visible collection
    pub meta: PageMeta,
}

/// Page position, following the shape of a paginated collection's metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    /// Items per page
    pub limit: usize,
    /// Items skipped
    pub offset: usize,
    /// Visible items across all pages
    pub count: usize,
    /// No page before this one
    pub is_first: bool,
    /// No page after this one
    pub is_last: bool,
}

impl PageMeta {
    /// Create page metadata
    ///
    /// Computes `is_first` and `is_last`.
    #[must_use]
    pub fn new(limit: usize, offset: usize, count: usize) -> Self {
        let limit = limit.max(1);
        Self {
            limit,
            offset,
            count,
            is_first: offset == 0,
            is_last: offset.saturating_add(limit) >= count,
        }
    }

    /// Number of items on this page
    #[must_use]
    pub fn page_len(&self) -> usize {
        self.limit.min(self.count.saturating_sub(self.offset))
    }

    /// Offset of the next page
    #[must_use]
    pub fn next_offset(&self) -> Option<usize> {
        (!self.is_last).then(|| self.offset + self.limit)
    }

    /// Offset of the previous page
    #[must_use]
    pub fn prev_offset(&self) -> Option<usize> {
        (!self.is_first).then(|| self.offset.saturating_sub(self.limit))
    }

    /// Offset of the last page
    #[must_use]
    pub fn last_offset(&self) -> usize {
        match self.count {
            0 => 0,
            count => (count - 1) / self.limit * self.limit,
        }
    }

    /// Navigation links for a collection at `path` with the given query
    ///
    /// `path` is the full collection path (`/v3/repos`). Links keep every
    /// query parameter and replace `limit`/`offset`; an offset of 0 is left
    /// out so the first page has a single canonical link.
    #[must_use]
    pub fn links(&self, path: &str, query: &Params) -> PageLinks {
        let link = |offset: usize| PageLink::new(path, query, self.limit, offset);
        PageLinks {
            next: self.next_offset().map(link),
            prev: self.prev_offset().map(link),
            first: link(0),
            last: link(self.last_offset()),
        }
    }
}

/// Link to one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLink {
    /// Path and query of the page
    #[serde(rename = "@href")]
    pub href: String,
    /// Offset of the page
    pub offset: usize,
    /// Items per page
    pub limit: usize,
}

impl PageLink {
    fn new(path: &str, query: &Params, limit: usize, offset: usize) -> Self {
        let mut query = query.clone().with("limit", limit.to_string());
        if offset > 0 {
            query.insert("offset", offset.to_string());
        } else {
            query.remove("offset");
        }
        Self {
            href: format!("{}?{}", path, query.to_query_string()),
            offset,
            limit,
        }
    }
}

/// The navigation part of `@pagination`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLinks {
    /// Following page, if any
    pub next: Option<PageLink>,
    /// Preceding page, if any
    pub prev: Option<PageLink>,
    /// First page
    pub first: PageLink,
    /// Last page
    pub last: PageLink,
}

/// The full `@pagination` value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Position
    #[serde(flatten)]
    pub meta: PageMeta,
    /// Navigation
    #[serde(flatten)]
    pub links: PageLinks,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{Anonymous, UserAccess};
    use crate::testing;
    use serde_json::json;

    fn paginator() -> Paginator {
        Paginator::new(25, 100)
    }

    #[test]
    fn test_resolve_defaults() {
        let request = paginator().resolve(&Params::new());
        assert_eq!(request, PageRequest { limit: 25, offset: 0 });
    }

    #[test]
    fn test_resolve_garbage_falls_back() {
        let params = Params::new().with("limit", "lots").with("offset", "-3");
        assert_eq!(
            paginator().resolve(&params),
            PageRequest { limit: 25, offset: 0 }
        );
        let params = Params::new().with("limit", "0");
        assert_eq!(paginator().resolve(&params).limit, 25);
    }

    #[test]
    fn test_resolve_clamps_limit() {
        let params = Params::new().with("limit", "500").with("offset", "7");
        assert_eq!(
            paginator().resolve(&params),
            PageRequest {
                limit: 100,
                offset: 7
            }
        );
    }

    #[test]
    fn test_default_limit_never_exceeds_max() {
        let paginator = Paginator::new(50, 10);
        assert_eq!(paginator.default_limit(), 10);
        assert_eq!(paginator.with_default_limit(3).default_limit(), 3);
    }

    #[test]
    fn test_page_meta_flags() {
        let meta = PageMeta::new(1, 0, 2);
        assert!(meta.is_first);
        assert!(!meta.is_last);
        assert_eq!(meta.next_offset(), Some(1));
        assert_eq!(meta.prev_offset(), None);
        assert_eq!(meta.last_offset(), 1);

        let meta = PageMeta::new(1, 1, 2);
        assert!(!meta.is_first);
        assert!(meta.is_last);
        assert_eq!(meta.prev_offset(), Some(0));
    }

    #[test]
    fn test_empty_collection() {
        let meta = PageMeta::new(25, 0, 0);
        assert!(meta.is_first);
        assert!(meta.is_last);
        assert_eq!(meta.page_len(), 0);
        assert_eq!(meta.last_offset(), 0);
    }

    #[test]
    fn test_page_len_formula() {
        for count in 0..6 {
            for offset in 0..8 {
                for limit in 1..4 {
                    let meta = PageMeta::new(limit, offset, count);
                    let expected = limit.min(count.saturating_sub(offset));
                    assert_eq!(meta.page_len(), expected);
                }
            }
        }
    }

    #[test]
    fn test_links() {
        let query = Params::new().with("repository.private", "false");
        let links = PageMeta::new(1, 0, 2).links("/v3/repos", &query);
        assert_eq!(
            serde_json::to_value(&links).unwrap(),
            json!({
                "next": {"@href": "/v3/repos?limit=1&offset=1&repository.private=false", "offset": 1, "limit": 1},
                "prev": null,
                "first": {"@href": "/v3/repos?limit=1&repository.private=false", "offset": 0, "limit": 1},
                "last": {"@href": "/v3/repos?limit=1&offset=1&repository.private=false", "offset": 1, "limit": 1}
            })
        );
    }

    #[test]
    fn test_first_link_drops_offset() {
        let query = Params::new().with("offset", "2").with("limit", "2");
        let links = PageMeta::new(2, 2, 3).links("/v3/repos", &query);
        assert_eq!(links.first.href, "/v3/repos?limit=2");
        assert_eq!(links.prev.unwrap().href, "/v3/repos?limit=2");
        assert!(links.next.is_none());
    }

    #[test]
    fn test_pagination_serializes_flat() {
        let meta = PageMeta::new(2, 0, 1);
        let pagination = Pagination {
            meta,
            links: meta.links("/v3/repos", &Params::new()),
        };
        let value = serde_json::to_value(&pagination).unwrap();
        assert_eq!(value["count"], 1);
        assert_eq!(value["is_last"], true);
        assert_eq!(value["first"]["@href"], "/v3/repos?limit=2");
    }

    #[test]
    fn test_paginate_hides_invisible_items() {
        let items = testing::fixture_repositories();
        let all = items.len();

        let page = paginator().paginate(items.clone(), &Params::new(), &Anonymous::new());
        assert!(page.items.iter().all(|item| item.access_scope().is_public()));
        assert!(page.meta.count < all);
        assert_eq!(page.items.len(), page.meta.count);

        let page = paginator().paginate(
            items,
            &Params::new().with("limit", "1").with("offset", "1"),
            &UserAccess::new(1).with_pull(2),
        );
        assert_eq!(page.meta.count, all);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id(), 2);
    }
}
