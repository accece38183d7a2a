//! Collision decisions and the records they leave behind.
//!
//! A collision is one name defined with different content by the accumulated
//! document (left) and the incoming document (right). [`action`] maps a
//! category and strategy to what the join does about it; the join records
//! every resolved collision as a [`CollisionRecord`] plus one warning.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{CollisionCategory, CollisionStrategy};
use crate::source_map::SourceLocation;

/// How a collision was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    KeptLeft,
    KeptRight,
    RenamedLeft,
    RenamedRight,
    /// Both definitions were equivalent and merged into the left one.
    Deduplicated,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeptLeft => write!(f, "kept-left"),
            Self::KeptRight => write!(f, "kept-right"),
            Self::RenamedLeft => write!(f, "renamed-left"),
            Self::RenamedRight => write!(f, "renamed-right"),
            Self::Deduplicated => write!(f, "deduplicated"),
        }
    }
}

/// One resolved collision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionRecord {
    pub category: CollisionCategory,
    /// Path, webhook, schema or component name.
    pub name: String,
    pub left_source: String,
    pub right_source: String,
    pub strategy: CollisionStrategy,
    pub resolution: Resolution,
    /// Name given to the losing definition by a rename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_location: Option<SourceLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_location: Option<SourceLocation>,
}

/// Every collision of a join, in the order they were resolved.
///
/// # Examples
///
/// ```
/// use apijoin_core::*;
///
/// let left = ParsedDocument::new("users.yaml", Document::openapi("3.0.3")
///     .with_schema("User", Schema::typed("object")));
/// let right = ParsedDocument::new("orders.yaml", Document::openapi("3.0.3")
///     .with_schema("User", Schema::typed("string")));
///
/// let mut config = JoinConfig::default()
///     .with_strategy(CollisionCategory::Schema, CollisionStrategy::RenameRight);
/// config.collision_report = true;
///
/// let result = join(vec![left, right], config).unwrap();
/// let report = result.collision_report.unwrap();
/// assert_eq!(report.len(), 1);
/// assert_eq!(report.records[0].new_name.as_deref(), Some("User_orders"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionReport {
    pub records: Vec<CollisionRecord>,
}

impl CollisionReport {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records of one category.
    pub fn by_category(
        &self,
        category: CollisionCategory,
    ) -> impl Iterator<Item = &CollisionRecord> {
        self.records
            .iter()
            .filter(move |record| record.category == category)
    }
}

/// What the join does about one collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    Fail,
    /// `degraded` is set when a rename strategy fell back to keeping a side.
    KeepLeft { degraded: bool },
    KeepRight { degraded: bool },
    RenameLeft,
    RenameRight,
    /// Merge when equivalent, fail otherwise.
    CompareEquivalent,
}

/// Maps a strategy to an action for `category`.
///
/// Renames only apply to schemas; for other categories `rename-right` keeps
/// the left definition and `rename-left` the right one.
pub(crate) fn action(category: CollisionCategory, strategy: CollisionStrategy) -> Action {
    use CollisionStrategy as S;

    match (strategy, category) {
        (S::Fail, _) | (S::FailOnPaths, CollisionCategory::Path) => Action::Fail,
        (S::FailOnPaths, _) | (S::AcceptLeft, _) => Action::KeepLeft { degraded: false },
        (S::AcceptRight, _) => Action::KeepRight { degraded: false },
        (S::RenameLeft, CollisionCategory::Schema) => Action::RenameLeft,
        (S::RenameRight, CollisionCategory::Schema) => Action::RenameRight,
        (S::RenameLeft, _) => Action::KeepRight { degraded: true },
        (S::RenameRight, _) => Action::KeepLeft { degraded: true },
        (S::DeduplicateEquivalent, _) => Action::CompareEquivalent,
    }
}

/// Appends `_2`, `_3`, ... to `base` until `taken` rejects it. An empty base
/// is replaced by `fallback` first.
pub(crate) fn unique_name(base: &str, fallback: &str, taken: impl Fn(&str) -> bool) -> String {
    let base = if base.is_empty() { fallback } else { base };
    if !taken(base) {
        return base.to_string();
    }
    (2usize..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| !taken(candidate.as_str()))
        .unwrap_or_else(|| base.to_string())
}

/// Warnings and collision records accumulated over a join.
#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    pub warnings: Vec<String>,
    pub records: Vec<CollisionRecord>,
    pub collision_count: usize,
}

impl Diagnostics {
    /// Adds a warning that is not tied to a collision.
    pub fn warn(&mut self, message: String) {
        warn!("{message}");
        self.warnings.push(message);
    }

    /// Counts a resolved collision and adds its warning.
    pub fn collision(&mut self, record: CollisionRecord, left: &str, right: &str, degraded: bool) {
        let mut message = format!(
            "{} collision on '{}' between {left} and {right} (strategy {}): ",
            record.category, record.name, record.strategy
        );
        if degraded {
            message.push_str(&format!("cannot rename a {}; ", record.category));
        }
        match (record.resolution, record.new_name.as_deref()) {
            (Resolution::RenamedLeft, Some(new)) => {
                message.push_str(&format!("renamed the left definition to '{new}'"));
            }
            (Resolution::RenamedRight, Some(new)) => {
                message.push_str(&format!("renamed the right definition to '{new}'"));
            }
            (Resolution::KeptRight, _) => message.push_str("kept the right definition"),
            (Resolution::Deduplicated, _) => {
                message.push_str("definitions are equivalent, kept the left one");
            }
            _ => message.push_str("kept the left definition"),
        }

        self.collision_count += 1;
        self.records.push(record);
        self.warn(message);
    }
}
