//! Line/column lookup for diagnostics.
//!
//! A [`SourceMap`] is produced by whatever parsed the raw text; the join
//! engine only reads it to render `source:line:column` in warnings and
//! errors instead of a structural path.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A 1-based position in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Positions keyed by structural path (`paths./users`,
/// `components.schemas.User`, `definitions.User`).
///
/// # Examples
///
/// ```
/// use apijoin_core::SourceMap;
///
/// let mut map = SourceMap::new();
/// map.insert("components.schemas.User", 42, 5);
///
/// assert_eq!(map.describe("users.yaml", "components.schemas.User"), "users.yaml:42:5");
/// assert_eq!(
///     map.describe("users.yaml", "components.schemas.Order"),
///     "users.yaml (components.schemas.Order)"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceMap {
    entries: HashMap<String, SourceLocation>,
}

impl SourceMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the position of a structural path.
    pub fn insert(&mut self, path: impl Into<String>, line: usize, column: usize) {
        self.entries
            .insert(path.into(), SourceLocation { line, column });
    }

    /// Looks up the position of a structural path.
    pub fn get(&self, path: &str) -> Option<SourceLocation> {
        self.entries.get(path).copied()
    }

    /// Number of recorded positions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no position is recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders `source:line:column` when the path is known, otherwise
    /// `source (path)`.
    pub fn describe(&self, source: &str, path: &str) -> String {
        describe_location(source, Some(self), path)
    }
}

/// Renders a location for diagnostics, with or without a source map.
pub(crate) fn describe_location(source: &str, map: Option<&SourceMap>, path: &str) -> String {
    match map.and_then(|map| map.get(path)) {
        Some(location) => format!("{source}:{location}"),
        None => format!("{source} ({path})"),
    }
}
