//! `include` directive parsing
//!
//! The directive is validated once per request. Each token must be exactly
//! `<type>.<field>`, and the field must be declared on that type. The parsed
//! set is then consulted by the renderer at every depth without re-reading
//! the raw parameter.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::error::{ApiError, ApiResult};
use crate::params::Params;
use crate::registry::Registry;

/// Exactly one `<type>.<field>` token
static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<type>\w+)\.(?P<field>\w+)$").expect("include token regex is valid")
});

/// Parsed `include` directive: a set of `(type, field)` pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeSet {
    entries: BTreeSet<(String, String)>,
}

impl IncludeSet {
    /// Parse and validate the `include` parameter
    ///
    /// Tokens are checked in order; the first bad one decides the error.
    /// An absent or empty parameter yields an empty set.
    pub fn parse(params: &Params, registry: &Registry) -> ApiResult<Self> {
        let Some(value) = params.get("include") else {
            return Ok(Self::default());
        };

        let mut entries = BTreeSet::new();
        for raw in value.values() {
            if raw.is_empty() {
                continue;
            }
            for token in raw.split(',') {
                let Some(captures) = TOKEN.captures(token) else {
                    tracing::warn!(token, "rejected include token");
                    return Err(ApiError::illegal_include_format());
                };
                let resource_type = &captures["type"];
                let field = &captures["field"];

                let declared = registry
                    .get(resource_type)
                    .is_some_and(|declaration| declaration.has_field(field));
                if !declared {
                    tracing::warn!(token, "include names an undeclared field");
                    return Err(ApiError::unknown_include_field(token));
                }
                entries.insert((resource_type.to_string(), field.to_string()));
            }
        }
        Ok(Self { entries })
    }

    /// Build a set directly, skipping validation
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            entries: pairs
                .into_iter()
                .map(|(resource_type, field)| (resource_type.to_string(), field.to_string()))
                .collect(),
        }
    }

    /// Does the directive name `<resource_type>.<field>`?
    #[must_use]
    pub fn contains(&self, resource_type: &str, field: &str) -> bool {
        self.entries
            .iter()
            .any(|(t, f)| t == resource_type && f == field)
    }

    /// Does the directive name any field of `resource_type`?
    #[must_use]
    pub fn mentions(&self, resource_type: &str) -> bool {
        self.entries.iter().any(|(t, _)| t == resource_type)
    }

    /// Number of distinct tokens
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was requested
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiErrorKind;
    use crate::resources;

    fn parse(include: &str) -> ApiResult<IncludeSet> {
        let registry = resources::registry().unwrap();
        IncludeSet::parse(&Params::new().with("include", include), &registry)
    }

    #[test]
    fn test_absent_and_empty() {
        let registry = resources::registry().unwrap();
        assert!(IncludeSet::parse(&Params::new(), &registry)
            .unwrap()
            .is_empty());
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn test_valid_tokens() {
        let includes = parse("repository.owner,repository.last_build").unwrap();
        assert_eq!(includes.len(), 2);
        assert!(includes.contains("repository", "owner"));
        assert!(includes.contains("repository", "last_build"));
        assert!(!includes.contains("build", "repository"));
        assert!(includes.mentions("repository"));
        assert!(!includes.mentions("build"));
    }

    #[test]
    fn test_three_segments_is_illegal() {
        let err = parse("repository.last_build.branch").unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::WrongParams);
        assert_eq!(err.message, "illegal format for include parameter");
    }

    #[test]
    fn test_other_illegal_shapes() {
        for include in ["repository", "repository.", ".owner", "repository.owner,", "a-b.c"] {
            let err = parse(include).unwrap_err();
            assert_eq!(err.message, "illegal format for include parameter", "{include}");
        }
    }

    #[test]
    fn test_unknown_field() {
        let err = parse("repository.owner,repository.last_build_number").unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::WrongParams);
        assert_eq!(
            err.message,
            "no field \"repository.last_build_number\" to include"
        );
    }

    #[test]
    fn test_unknown_type() {
        let err = parse("widget.color").unwrap_err();
        assert_eq!(err.message, "no field \"widget.color\" to include");
    }

    #[test]
    fn test_first_bad_token_wins() {
        let err = parse("repository.nope,repository.a.b").unwrap_err();
        assert_eq!(err.message, "no field \"repository.nope\" to include");
    }

    #[test]
    fn test_repeated_include_keys() {
        let registry = resources::registry().unwrap();
        let params: Params = vec![("include", "repository.owner"), ("include", "build.jobs")]
            .into_iter()
            .collect();
        let includes = IncludeSet::parse(&params, &registry).unwrap();
        assert!(includes.contains("repository", "owner"));
        assert!(includes.contains("build", "jobs"));
    }
}
