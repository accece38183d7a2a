//! Join configuration.
//!
//! [`JoinConfig`] is plain data: it derives serde so callers can keep it in a
//! YAML or JSON file, and every field has a documented default.
//!
//! # Example YAML
//!
//! ```yaml
//! default_strategy: fail
//! path_strategy: accept-left
//! schema_strategy: rename-right
//! rename_template: "{Name}_{Source}"
//! namespace_prefix:
//!   orders: Ord
//! equivalence_mode: deep
//! operation_context: true
//! primary_operation_policy: most-specific
//! collision_report: true
//! semantic_deduplication: true
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::parsed::source_name;

/// Default rename template.
pub const DEFAULT_RENAME_TEMPLATE: &str = "{Name}_{Source}";

/// Entity category a collision happens in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionCategory {
    /// Path items and webhooks.
    Path,
    /// Entries of the schema container.
    Schema,
    /// Every other reusable component (parameters, responses, ...).
    Component,
}

impl fmt::Display for CollisionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path => write!(f, "path"),
            Self::Schema => write!(f, "schema"),
            Self::Component => write!(f, "component"),
        }
    }
}

/// How a collision between the accumulated and incoming documents is
/// resolved.
///
/// # Examples
///
/// ```
/// use apijoin_core::*;
///
/// let config = JoinConfig::default()
///     .with_default_strategy(CollisionStrategy::AcceptLeft)
///     .with_strategy(CollisionCategory::Schema, CollisionStrategy::RenameRight);
///
/// assert_eq!(config.strategy_for(CollisionCategory::Path), CollisionStrategy::AcceptLeft);
/// assert_eq!(config.strategy_for(CollisionCategory::Schema), CollisionStrategy::RenameRight);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionStrategy {
    /// Abort the join (the default).
    #[default]
    Fail,
    /// Keep the accumulated definition.
    AcceptLeft,
    /// Keep the incoming definition.
    AcceptRight,
    /// Abort on path collisions; keep the accumulated definition otherwise.
    FailOnPaths,
    /// Rename the accumulated definition.
    RenameLeft,
    /// Rename the incoming definition.
    RenameRight,
    /// Merge when structurally equivalent, abort otherwise.
    DeduplicateEquivalent,
}

impl CollisionStrategy {
    /// Kebab-case name, as used in configuration files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fail => "fail",
            Self::AcceptLeft => "accept-left",
            Self::AcceptRight => "accept-right",
            Self::FailOnPaths => "fail-on-paths",
            Self::RenameLeft => "rename-left",
            Self::RenameRight => "rename-right",
            Self::DeduplicateEquivalent => "deduplicate-equivalent",
        }
    }
}

impl fmt::Display for CollisionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Depth of structural schema comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EquivalenceMode {
    /// Never equivalent.
    None,
    /// Directly declared fields only.
    Shallow,
    /// Full recursive comparison through resolved references.
    #[default]
    Deep,
}

impl fmt::Display for EquivalenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Shallow => write!(f, "shallow"),
            Self::Deep => write!(f, "deep"),
        }
    }
}

/// Policy for picking the operation that supplies rename context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrimaryOperationPolicy {
    /// Earliest operation in document traversal order.
    #[default]
    FirstEncountered,
    /// Prefer operations with an id, then with tags, then bare ones.
    MostSpecific,
    /// Lexicographically smallest `path + method`.
    Alphabetical,
}

/// Configuration for [`Joiner`](crate::Joiner).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
    /// Strategy for categories without their own override.
    pub default_strategy: CollisionStrategy,
    /// Override for path and webhook collisions.
    pub path_strategy: Option<CollisionStrategy>,
    /// Override for schema collisions.
    pub schema_strategy: Option<CollisionStrategy>,
    /// Override for other component collisions.
    pub component_strategy: Option<CollisionStrategy>,
    /// Template producing new schema names for rename strategies.
    pub rename_template: String,
    /// Source identifier (or its short name) to schema-name prefix.
    pub namespace_prefix: BTreeMap<String, String>,
    /// Prefix every schema of a prefixed source, not just colliding ones.
    pub always_apply_prefix: bool,
    /// Comparison depth for `deduplicate-equivalent`.
    pub equivalence_mode: EquivalenceMode,
    /// Trace operation lineage to enrich rename context.
    pub operation_context: bool,
    /// Also trace the accumulated side (gives `rename-left` context).
    pub trace_both_sides: bool,
    /// Policy for picking the primary operation.
    pub primary_operation_policy: PrimaryOperationPolicy,
    /// Build a detailed [`CollisionReport`](crate::CollisionReport).
    pub collision_report: bool,
    /// Consolidate structurally identical schemas after merging.
    pub semantic_deduplication: bool,
    /// Merge servers, security requirements and tags.
    pub merge_arrays: bool,
    /// Drop tags whose name was already seen.
    pub deduplicate_tags: bool,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            default_strategy: CollisionStrategy::Fail,
            path_strategy: None,
            schema_strategy: None,
            component_strategy: None,
            rename_template: DEFAULT_RENAME_TEMPLATE.to_string(),
            namespace_prefix: BTreeMap::new(),
            always_apply_prefix: false,
            equivalence_mode: EquivalenceMode::Deep,
            operation_context: false,
            trace_both_sides: false,
            primary_operation_policy: PrimaryOperationPolicy::FirstEncountered,
            collision_report: false,
            semantic_deduplication: false,
            merge_arrays: true,
            deduplicate_tags: true,
        }
    }
}

impl JoinConfig {
    /// Resolves the effective strategy for a category.
    pub fn strategy_for(&self, category: CollisionCategory) -> CollisionStrategy {
        let specific = match category {
            CollisionCategory::Path => self.path_strategy,
            CollisionCategory::Schema => self.schema_strategy,
            CollisionCategory::Component => self.component_strategy,
        };
        specific.unwrap_or(self.default_strategy)
    }

    /// Sets the global default strategy.
    pub fn with_default_strategy(mut self, strategy: CollisionStrategy) -> Self {
        self.default_strategy = strategy;
        self
    }

    /// Overrides the strategy for one category.
    pub fn with_strategy(mut self, category: CollisionCategory, strategy: CollisionStrategy) -> Self {
        let slot = match category {
            CollisionCategory::Path => &mut self.path_strategy,
            CollisionCategory::Schema => &mut self.schema_strategy,
            CollisionCategory::Component => &mut self.component_strategy,
        };
        *slot = Some(strategy);
        self
    }

    /// Sets the rename template.
    pub fn with_rename_template(mut self, template: &str) -> Self {
        self.rename_template = template.to_string();
        self
    }

    /// Registers a schema-name prefix for a source.
    pub fn with_namespace_prefix(mut self, source: &str, prefix: &str) -> Self {
        self.namespace_prefix
            .insert(source.to_string(), prefix.to_string());
        self
    }

    /// Enables operation-context tracing with a primary-operation policy.
    pub fn with_operation_context(mut self, policy: PrimaryOperationPolicy) -> Self {
        self.operation_context = true;
        self.primary_operation_policy = policy;
        self
    }

    /// Looks up the prefix for a source identifier, trying the identifier
    /// itself before its short name.
    pub fn prefix_for(&self, source: &str) -> Option<&str> {
        self.namespace_prefix
            .get(source)
            .or_else(|| self.namespace_prefix.get(&source_name(source)))
            .map(String::as_str)
    }

    /// Checks settings that do not depend on the documents.
    pub(crate) fn validate(&self) -> Result<(), String> {
        if let Some((source, _)) = self
            .namespace_prefix
            .iter()
            .find(|(_, prefix)| prefix.trim().is_empty())
        {
            return Err(format!("namespace prefix for '{source}' is empty"));
        }
        if self.trace_both_sides && !self.operation_context {
            return Err("trace_both_sides requires operation_context".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_strategy_is_fail() {
        let config = JoinConfig::default();
        for category in [
            CollisionCategory::Path,
            CollisionCategory::Schema,
            CollisionCategory::Component,
        ] {
            assert_eq!(config.strategy_for(category), CollisionStrategy::Fail);
        }
    }

    #[test]
    fn test_category_override_wins_over_default() {
        let config = JoinConfig::default()
            .with_default_strategy(CollisionStrategy::AcceptRight)
            .with_strategy(CollisionCategory::Component, CollisionStrategy::AcceptLeft);
        assert_eq!(
            config.strategy_for(CollisionCategory::Component),
            CollisionStrategy::AcceptLeft
        );
        assert_eq!(
            config.strategy_for(CollisionCategory::Path),
            CollisionStrategy::AcceptRight
        );
    }

    #[test]
    fn test_prefix_lookup_falls_back_to_short_name() {
        let config = JoinConfig::default().with_namespace_prefix("orders", "Ord");
        assert_eq!(config.prefix_for("specs/orders.yaml"), Some("Ord"));
        assert_eq!(config.prefix_for("orders"), Some("Ord"));
        assert_eq!(config.prefix_for("users.yaml"), None);
    }

    #[test]
    fn test_deserialize_partial_config_uses_defaults() {
        let json = r#"{"schema_strategy":"rename-right","equivalence_mode":"shallow"}"#;
        let config: JoinConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.schema_strategy, Some(CollisionStrategy::RenameRight));
        assert_eq!(config.equivalence_mode, EquivalenceMode::Shallow);
        assert_eq!(config.rename_template, DEFAULT_RENAME_TEMPLATE);
        assert!(config.merge_arrays);
    }

    #[test]
    fn test_validate_rejects_blank_prefix() {
        let config = JoinConfig::default().with_namespace_prefix("orders", " ");
        assert!(config.validate().is_err());
    }
}
