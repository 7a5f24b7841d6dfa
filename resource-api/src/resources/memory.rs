//! In-process store
//!
//! Keeps every object in memory, keyed by resource type and id. Used by the
//! test suite and for local demos; lookups scan, which is fine at that size.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;

use crate::resource::{Lookup, Resource, ResourceRef};
use crate::store::{Store, StoreError, StoreResult};

/// [`Store`] backed by in-memory maps
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    objects: HashMap<&'static str, BTreeMap<u64, ResourceRef>>,
    memberships: HashMap<u64, BTreeSet<u64>>,
    unavailable: HashSet<String>,
}

impl MemoryStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an object
    pub fn insert(&mut self, object: impl Resource + 'static) -> &mut Self {
        let object: ResourceRef = Arc::new(object);
        self.objects
            .entry(object.resource_type())
            .or_default()
            .insert(object.id(), object);
        self
    }

    /// Record that a user is a member of a repository
    pub fn add_membership(&mut self, user_id: u64, repository_id: u64) -> &mut Self {
        self.memberships
            .entry(user_id)
            .or_default()
            .insert(repository_id);
        self
    }

    /// Make every fetch of a resource type fail, for exercising error paths
    pub fn set_unavailable(&mut self, resource_type: impl Into<String>) -> &mut Self {
        self.unavailable.insert(resource_type.into());
        self
    }

    /// Number of objects of a type
    #[must_use]
    pub fn count(&self, resource_type: &str) -> usize {
        self.objects.get(resource_type).map_or(0, BTreeMap::len)
    }

    fn check(&self, resource_type: &str) -> StoreResult<()> {
        if self.unavailable.contains(resource_type) {
            return Err(StoreError::unavailable(resource_type, "store marked unavailable"));
        }
        Ok(())
    }

    fn scan<'a>(
        &'a self,
        resource_type: &str,
        lookup: &'a Lookup,
    ) -> impl Iterator<Item = &'a ResourceRef> + 'a {
        self.objects
            .get(resource_type)
            .into_iter()
            .flat_map(BTreeMap::values)
            .filter(move |object| self.matches(object.as_ref(), lookup))
    }

    fn matches(&self, object: &dyn Resource, lookup: &Lookup) -> bool {
        match lookup {
            Lookup::Id(id) => object.id() == *id,
            Lookup::Slug(slug) => object.slug().as_deref() == Some(slug.as_str()),
            Lookup::Named { parent, name } => {
                object.access_scope().repository_id == Some(*parent)
                    && object.slug().as_deref() == Some(name.as_str())
            }
            Lookup::Owner(login) => {
                object.access_scope().owner.as_deref() == Some(login.as_str())
            }
            Lookup::Member(user_id) => {
                let repositories = self.memberships.get(user_id);
                object
                    .access_scope()
                    .repository_id
                    .is_some_and(|id| repositories.is_some_and(|repos| repos.contains(&id)))
            }
            Lookup::All => true,
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn fetch(&self, resource_type: &str, lookup: &Lookup) -> StoreResult<Option<ResourceRef>> {
        self.check(resource_type)?;
        if let Lookup::Id(id) = lookup {
            return Ok(self
                .objects
                .get(resource_type)
                .and_then(|objects| objects.get(id))
                .cloned());
        }
        Ok(self.scan(resource_type, lookup).next().cloned())
    }

    async fn fetch_all(
        &self,
        resource_type: &str,
        lookup: &Lookup,
    ) -> StoreResult<Vec<ResourceRef>> {
        self.check(resource_type)?;
        Ok(self.scan(resource_type, lookup).cloned().collect())
    }
}
