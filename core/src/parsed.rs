use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Document, SourceMap, SpecFamily};

/// Textual format a document was read from (and should be written back as).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    #[default]
    Json,
    Yaml,
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
        }
    }
}

/// An already-parsed document together with where it came from.
///
/// This is both the input unit of a join and, via
/// [`JoinResult::into_parsed`](crate::JoinResult::into_parsed), its output,
/// so a join result can feed straight into another join.
///
/// # Examples
///
/// ```
/// use apijoin_core::*;
///
/// let parsed = ParsedDocument::new("specs/orders.yaml", Document::openapi("3.0.3"))
///     .with_format(DocumentFormat::Yaml);
///
/// assert_eq!(parsed.version, "3.0.3");
/// assert_eq!(parsed.source_name(), "orders");
/// assert_eq!(parsed.family(), Some(SpecFamily::Namespaced));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    /// Source identifier, typically a file path.
    pub source: String,
    /// Textual format of the source.
    pub format: DocumentFormat,
    /// Version string of the document (`"2.0"`, `"3.1.0"`, ...).
    pub version: String,
    /// The document itself.
    pub document: Document,
    /// Optional positions used to enrich diagnostics.
    pub source_map: Option<SourceMap>,
}

impl ParsedDocument {
    /// Wraps a document; the version is read from the document.
    pub fn new(source: impl Into<String>, document: Document) -> Self {
        Self {
            source: source.into(),
            format: DocumentFormat::default(),
            version: document.version().to_string(),
            document,
            source_map: None,
        }
    }

    /// Sets the textual format.
    pub fn with_format(mut self, format: DocumentFormat) -> Self {
        self.format = format;
        self
    }

    /// Attaches a source map.
    pub fn with_source_map(mut self, source_map: SourceMap) -> Self {
        self.source_map = Some(source_map);
        self
    }

    /// Schema-container family of the wrapped document.
    pub fn family(&self) -> Option<SpecFamily> {
        self.document.family()
    }

    /// Short source name used in rename templates (`{Source}`).
    pub fn source_name(&self) -> String {
        source_name(&self.source)
    }
}

/// Derives a short name from a source identifier: the file stem of a path
/// (`specs/orders.yaml` → `orders`), or the identifier itself.
pub fn source_name(source: &str) -> String {
    Path::new(source)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or(source)
        .to_string()
}
