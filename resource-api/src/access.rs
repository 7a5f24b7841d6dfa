//! Access gate
//!
//! Authentication happens elsewhere. By the time a request reaches the
//! dispatcher, the caller has been reduced to an [`AccessControl`] value that
//! answers three questions: may the subject see this object, is the subject
//! logged in, and does it have full access. The core asks at exactly two points:
//! after a single-object fetch, and before expanding a nested association.
//!
//! Three gates ship with the crate: [`Anonymous`], [`UserAccess`] and
//! [`ApplicationAccess`].

use std::collections::HashSet;

use crate::resource::Resource;

/// Facts about an object that gates base their decisions on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessScope {
    /// Private objects need an explicit grant
    pub private: bool,
    /// Login of the owning user or organization
    pub owner: Option<String>,
    /// Repository the object belongs to
    pub repository_id: Option<u64>,
}

impl AccessScope {
    /// Scope of a public object without owner
    #[must_use]
    pub fn public() -> Self {
        Self::default()
    }

    /// Scope of an object inside a repository
    pub fn repository(id: u64, owner: impl Into<String>, private: bool) -> Self {
        Self {
            private,
            owner: Some(owner.into()),
            repository_id: Some(id),
        }
    }

    /// Whether anyone may see the object
    #[must_use]
    pub fn is_public(&self) -> bool {
        !self.private
    }
}

/// Visibility decisions for the current subject
pub trait AccessControl: Send + Sync {
    /// May the subject see this object?
    fn visible(&self, object: &dyn Resource) -> bool;

    /// Is the subject a logged-in user?
    fn logged_in(&self) -> bool;

    /// Did the subject present any credentials, as a user or an application?
    fn authenticated(&self) -> bool {
        self.logged_in()
    }

    /// Does the subject bypass visibility rules?
    fn full_access(&self) -> bool {
        false
    }

    /// Id of the authenticated user, if any
    fn user_id(&self) -> Option<u64> {
        None
    }

    /// Does a cross-organization grant cover this object?
    fn in_scope(&self, _object: &dyn Resource) -> bool {
        true
    }

    /// Named capability on an object, rendered under `@permissions`
    ///
    /// `read` follows visibility. Anything else needs full access within scope.
    fn permits(&self, object: &dyn Resource, action: &str) -> bool {
        match action {
            "read" => self.visible(object),
            _ => self.full_access() && self.in_scope(object) && self.visible(object),
        }
    }
}

/// Unauthenticated caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Anonymous {
    /// When set, anonymous callers see nothing
    pub private_api: bool,
}

impl Anonymous {
    /// Gate for a public API
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gate for a private API
    #[must_use]
    pub fn private_api() -> Self {
        Self { private_api: true }
    }
}

impl AccessControl for Anonymous {
    fn visible(&self, object: &dyn Resource) -> bool {
        !self.private_api && object.access_scope().is_public()
    }

    fn logged_in(&self) -> bool {
        false
    }
}

/// Authenticated user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccess {
    /// Id of the user
    pub user_id: u64,
    /// Repositories the user may pull from
    pub pull: HashSet<u64>,
}

impl UserAccess {
    /// User without repository grants
    #[must_use]
    pub fn new(user_id: u64) -> Self {
        Self {
            user_id,
            pull: HashSet::new(),
        }
    }

    /// Grant pull access to a repository
    #[must_use]
    pub fn with_pull(mut self, repository_id: u64) -> Self {
        self.pull.insert(repository_id);
        self
    }
}

impl AccessControl for UserAccess {
    fn visible(&self, object: &dyn Resource) -> bool {
        let scope = object.access_scope();
        scope.is_public()
            || scope
                .repository_id
                .is_some_and(|id| self.pull.contains(&id))
    }

    fn logged_in(&self) -> bool {
        true
    }

    fn user_id(&self) -> Option<u64> {
        Some(self.user_id)
    }
}

/// Internal application authenticated by signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationAccess {
    /// Application name
    pub name: String,
    /// Whether the application bypasses visibility rules
    pub full_access: bool,
    /// Owner login the grant is restricted to
    pub scope: Option<String>,
}

impl ApplicationAccess {
    /// Application without full access
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            full_access: false,
            scope: None,
        }
    }

    /// Grant full access
    #[must_use]
    pub fn with_full_access(mut self) -> Self {
        self.full_access = true;
        self
    }

    /// Restrict the grant to one owner
    #[must_use]
    pub fn scoped_to(mut self, owner: impl Into<String>) -> Self {
        self.scope = Some(owner.into());
        self
    }
}

impl AccessControl for ApplicationAccess {
    fn visible(&self, object: &dyn Resource) -> bool {
        object.access_scope().is_public() || (self.full_access && self.in_scope(object))
    }

    fn logged_in(&self) -> bool {
        false
    }

    fn authenticated(&self) -> bool {
        true
    }

    fn full_access(&self) -> bool {
        self.full_access
    }

    fn in_scope(&self, object: &dyn Resource) -> bool {
        match &self.scope {
            None => true,
            Some(owner) => object.access_scope().owner.as_deref() == Some(owner.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::FieldValue;

    #[derive(Debug)]
    struct Repo {
        id: u64,
        private: bool,
    }

    impl Resource for Repo {
        fn resource_type(&self) -> &'static str {
            "repository"
        }

        fn id(&self) -> u64 {
            self.id
        }

        fn field(&self, _name: &str) -> Option<FieldValue> {
            None
        }

        fn access_scope(&self) -> AccessScope {
            AccessScope::repository(self.id, "svenfuchs", self.private)
        }
    }

    const PUBLIC: Repo = Repo {
        id: 1,
        private: false,
    };
    const PRIVATE: Repo = Repo {
        id: 2,
        private: true,
    };

    #[test]
    fn test_anonymous() {
        let gate = Anonymous::new();
        assert!(gate.visible(&PUBLIC));
        assert!(!gate.visible(&PRIVATE));
        assert!(!gate.logged_in());
        assert!(gate.permits(&PUBLIC, "read"));
        assert!(!gate.permits(&PUBLIC, "enable"));
    }

    #[test]
    fn test_anonymous_private_api_sees_nothing() {
        let gate = Anonymous::private_api();
        assert!(!gate.visible(&PUBLIC));
        assert!(!gate.permits(&PUBLIC, "read"));
        assert!(!gate.authenticated());
    }

    #[test]
    fn test_user_with_pull_access() {
        let gate = UserAccess::new(1).with_pull(2);
        assert!(gate.visible(&PRIVATE));
        assert!(gate.logged_in());
        assert_eq!(gate.user_id(), Some(1));
        assert!(gate.permits(&PRIVATE, "read"));
        assert!(!gate.permits(&PRIVATE, "create_request"));
    }

    #[test]
    fn test_user_without_pull_access() {
        let gate = UserAccess::new(2);
        assert!(gate.visible(&PUBLIC));
        assert!(!gate.visible(&PRIVATE));
    }

    #[test]
    fn test_application_full_access() {
        let gate = ApplicationAccess::new("travis-example").with_full_access();
        assert!(gate.visible(&PRIVATE));
        assert!(gate.permits(&PRIVATE, "enable"));
        assert!(gate.permits(&PRIVATE, "create_request"));
        assert!(gate.authenticated());
        assert!(!gate.logged_in());
    }

    #[test]
    fn test_application_scoped_to_other_owner() {
        let gate = ApplicationAccess::new("travis-example")
            .with_full_access()
            .scoped_to("travis-pro");
        assert!(!gate.visible(&PRIVATE));
        assert!(gate.visible(&PUBLIC));
        assert!(!gate.permits(&PUBLIC, "enable"));
    }

    #[test]
    fn test_application_scoped_to_owner() {
        let gate = ApplicationAccess::new("travis-example")
            .with_full_access()
            .scoped_to("svenfuchs");
        assert!(gate.visible(&PRIVATE));
        assert!(gate.permits(&PRIVATE, "disable"));
    }
}
