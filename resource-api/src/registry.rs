//! Resource type declarations
//!
//! Every resource type is declared once, at start-up: its field order, the
//! subset rendered at minimal level, its associations and its permission
//! names. A [`Registry`] collects the declarations together with the query
//! strategy for each type and is never mutated afterwards.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::include::IncludeSet;
use crate::query::QueryFactory;

/// How much of a resource is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Representation {
    /// Identifying fields only
    Minimal,
    /// The full declared field set
    #[default]
    Standard,
}

impl Representation {
    /// Value of the `@representation` key
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Standard => "standard",
        }
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field that references another resource type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Association {
    /// Field name on the owning type
    pub name: &'static str,
    /// Resource type of the referenced object(s)
    pub target: &'static str,
    /// How deep below the top-level object this association may still expand;
    /// `None` uses the configured default
    pub max_depth: Option<usize>,
}

impl Association {
    /// Association with the default depth cap
    #[must_use]
    pub const fn new(name: &'static str, target: &'static str) -> Self {
        Self {
            name,
            target,
            max_depth: None,
        }
    }

    /// Association with its own depth cap
    #[must_use]
    pub const fn capped(name: &'static str, target: &'static str, max_depth: usize) -> Self {
        Self {
            name,
            target,
            max_depth: Some(max_depth),
        }
    }
}

/// Static declaration of one resource type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceType {
    /// Type tag, e.g. `"repository"`
    pub name: &'static str,
    /// Collection tag, e.g. `"repositories"`
    pub plural: &'static str,
    /// Standard field set in output order
    pub fields: &'static [&'static str],
    /// Minimal field set; must be a subset of `fields`
    pub minimal: &'static [&'static str],
    /// Fields that reference other resources
    pub associations: &'static [Association],
    /// Capabilities rendered under `@permissions`; empty means no `@permissions`
    pub permissions: &'static [&'static str],
}

impl ResourceType {
    /// Whether `field` is declared at any level
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains(&field)
    }

    /// Association metadata for a field
    #[must_use]
    pub fn association(&self, field: &str) -> Option<&Association> {
        self.associations.iter().find(|assoc| assoc.name == field)
    }

    /// Fields to emit, in declared order
    ///
    /// Minimal level emits the minimal set plus any field the include
    /// directive names for this type.
    #[must_use]
    pub fn fields_for(&self, level: Representation, includes: &IncludeSet) -> Vec<&'static str> {
        match level {
            Representation::Standard => self.fields.to_vec(),
            Representation::Minimal => self
                .fields
                .iter()
                .copied()
                .filter(|field| self.minimal.contains(field) || includes.contains(self.name, field))
                .collect(),
        }
    }

    fn validate(&self, known: &HashMap<&'static str, ResourceType>) -> Result<()> {
        if let Some(field) = self.minimal.iter().find(|field| !self.has_field(field)) {
            return Err(Error::Declaration(format!(
                "{}: minimal field {} is not a standard field",
                self.name, field
            )));
        }
        for assoc in self.associations {
            if !self.has_field(assoc.name) {
                return Err(Error::Declaration(format!(
                    "{}: association {} is not a declared field",
                    self.name, assoc.name
                )));
            }
            if !known.contains_key(assoc.target) {
                return Err(Error::Declaration(format!(
                    "{}.{}: unknown target type {}",
                    self.name, assoc.name, assoc.target
                )));
            }
        }
        Ok(())
    }
}

/// Immutable lookup table from type tag to declaration and query strategy
pub struct Registry {
    types: HashMap<&'static str, ResourceType>,
    queries: HashMap<&'static str, QueryFactory>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.types.keys().collect();
        names.sort();
        f.debug_struct("Registry").field("types", &names).finish()
    }
}

impl Registry {
    /// Start a new declaration set
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Declaration for a type tag
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ResourceType> {
        self.types.get(name)
    }

    /// Query strategy for a type tag
    #[must_use]
    pub fn query_factory(&self, name: &str) -> Option<QueryFactory> {
        self.queries.get(name).copied()
    }

    /// Declared type tags, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.types.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

/// Collects declarations; checked once by [`RegistryBuilder::build`]
#[derive(Default)]
pub struct RegistryBuilder {
    types: HashMap<&'static str, ResourceType>,
    queries: HashMap<&'static str, QueryFactory>,
}

impl RegistryBuilder {
    /// Declare a resource type and its query strategy
    #[must_use]
    pub fn resource(mut self, declaration: ResourceType, query: QueryFactory) -> Self {
        self.queries.insert(declaration.name, query);
        self.types.insert(declaration.name, declaration);
        self
    }

    /// Validate and freeze
    pub fn build(self) -> Result<Registry> {
        for declaration in self.types.values() {
            declaration.validate(&self.types)?;
        }
        tracing::debug!(types = self.types.len(), "resource registry built");
        Ok(Registry {
            types: self.types,
            queries: self.queries,
        })
    }
}
