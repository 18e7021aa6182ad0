//! Builder configuration.
//!
//! There are no global defaults: everything a builder needs beyond its
//! executor handle travels in an explicit [`BuilderConfig`] supplied at
//! construction.

use crate::dialect::Dialect;

/// A well-known relation supplied by an external model layer: an implicit
/// table name plus the primary-key column `first()`/`last()` default to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelDescriptor {
    pub table: String,
    pub primary_key: String,
}

impl ModelDescriptor {
    pub fn new(table: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: primary_key.into(),
        }
    }
}

/// Explicit per-builder configuration: dialect, default primary-key column,
/// and an optional model descriptor.
#[derive(Clone, Debug)]
pub struct BuilderConfig {
    pub dialect: Dialect,
    /// Primary-key column used by `first()`/`last()` when no model
    /// descriptor is bound.
    pub primary_key: String,
    /// When set, compilation without an explicit table falls back to this
    /// model's table — the one context-dependent default in the builder.
    pub model: Option<ModelDescriptor>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            primary_key: "id".to_string(),
            model: None,
        }
    }
}

impl BuilderConfig {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    pub fn with_model(mut self, model: ModelDescriptor) -> Self {
        self.model = Some(model);
        self
    }

    /// The primary-key column in effect (model descriptor wins).
    pub(crate) fn primary_key(&self) -> &str {
        self.model
            .as_ref()
            .map(|m| m.primary_key.as_str())
            .unwrap_or(&self.primary_key)
    }

    /// The implicit table, if a model descriptor supplies one.
    pub(crate) fn implicit_table(&self) -> Option<&str> {
        self.model.as_ref().map(|m| m.table.as_str())
    }
}
