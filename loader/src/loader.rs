//! Reading documents from disk and writing joined results back.
//!
//! # Loading patterns
//!
//! ```no_run
//! use apijoin_core::JoinConfig;
//! use apijoin_loader::{DocumentSet, load_document, write_result};
//!
//! // A single file; the format comes from the extension or the content.
//! let users = load_document("specs/users.yaml").unwrap();
//! println!("{} is {} ({})", users.parsed.source, users.parsed.version, users.digest);
//!
//! // Several files, joined in the order they were added.
//! let set = DocumentSet::builder()
//!     .add("specs/users.yaml")
//!     .add("specs/orders.yaml")
//!     .build()
//!     .unwrap();
//! let result = set.join(JoinConfig::default()).unwrap();
//! let digest = write_result(&result, "joined.yaml", None).unwrap();
//! println!("wrote {digest}");
//! ```

use std::path::{Path, PathBuf};

use apijoin_core::{Document, DocumentFormat, JoinConfig, JoinResult, ParsedDocument};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::config::JoinJob;
use crate::error::{LoaderError, Result};
use crate::manifest::JoinManifest;
use crate::positions;

/// A document read from disk.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// The document, with a source map of its text.
    pub parsed: ParsedDocument,
    /// File it was read from.
    pub path: PathBuf,
    /// SHA-256 hex digest of the file contents.
    pub digest: String,
}

/// Reads and parses one document.
///
/// # Errors
///
/// Returns [`LoaderError::IoError`] if the file cannot be read,
/// [`LoaderError::InvalidUtf8`] if it is not UTF-8 text,
/// [`LoaderError::JsonError`] or [`LoaderError::YamlError`] if it does not
/// parse, or [`LoaderError::UnsupportedDocument`] if it declares neither
/// `swagger: 2.x` nor `openapi: 3.x`.
pub fn load_document(path: impl AsRef<Path>) -> Result<LoadedDocument> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let digest = digest(&bytes);
    let text = String::from_utf8(bytes).map_err(|source| LoaderError::InvalidUtf8 {
        path: path.to_path_buf(),
        source,
    })?;
    let format = detect_format(path, &text);
    let parsed = parse_document(&path.display().to_string(), &text, format)?;
    info!(
        path = %path.display(),
        format = %format,
        version = %parsed.version,
        "Loaded document"
    );
    Ok(LoadedDocument {
        parsed,
        path: path.to_path_buf(),
        digest,
    })
}

/// Parses document text that has already been read.
pub fn parse_document(source: &str, text: &str, format: DocumentFormat) -> Result<ParsedDocument> {
    let document: Document = match format {
        DocumentFormat::Json => serde_json::from_str(text)?,
        DocumentFormat::Yaml => serde_yaml::from_str(text)?,
    };
    let unsupported = |reason: &str| LoaderError::UnsupportedDocument {
        path: PathBuf::from(source),
        reason: reason.to_string(),
    };
    match (&document.swagger, &document.openapi) {
        (Some(_), Some(_)) => return Err(unsupported("declares both 'swagger' and 'openapi'")),
        (None, None) => return Err(unsupported("missing 'swagger' or 'openapi' version")),
        _ => {}
    }
    if document.family().is_none() {
        return Err(unsupported(&format!("unsupported version '{}'", document.version())));
    }

    Ok(ParsedDocument::new(source, document)
        .with_format(format)
        .with_source_map(positions::scan(text)))
}

/// Picks the format from the file extension, falling back to the content:
/// text starting with `{` is JSON, anything else YAML.
pub fn detect_format(path: &Path, text: &str) -> DocumentFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => DocumentFormat::Json,
        Some("yaml" | "yml") => DocumentFormat::Yaml,
        _ if text.trim_start().starts_with('{') => DocumentFormat::Json,
        _ => DocumentFormat::Yaml,
    }
}

/// Computes the SHA-256 hex digest of `bytes`.
pub fn digest(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Serializes a document in the given format.
pub fn render(document: &Document, format: DocumentFormat) -> Result<String> {
    Ok(match format {
        DocumentFormat::Json => {
            let mut text = serde_json::to_string_pretty(document)?;
            text.push('\n');
            text
        }
        DocumentFormat::Yaml => serde_yaml::to_string(document)?,
    })
}

/// Writes the merged document of `result` to `path`.
///
/// The format is `format` when given, else the one implied by the extension,
/// else the format of the first input. Returns the SHA-256 digest of the
/// written bytes.
pub fn write_result(
    result: &JoinResult,
    path: impl AsRef<Path>,
    format: Option<DocumentFormat>,
) -> Result<String> {
    let path = path.as_ref();
    let format = format.unwrap_or_else(|| match path.extension().and_then(|e| e.to_str()) {
        Some("json") => DocumentFormat::Json,
        Some("yaml" | "yml") => DocumentFormat::Yaml,
        _ => result.format,
    });
    let text = render(&result.document, format)?;
    std::fs::write(path, text.as_bytes())?;
    let digest = digest(text.as_bytes());
    info!(path = %path.display(), format = %format, digest = %digest, "Wrote joined document");
    Ok(digest)
}

/// Ordered documents to be joined.
///
/// # Examples
///
/// ```no_run
/// use apijoin_loader::DocumentSet;
///
/// let set = DocumentSet::from_dir("specs/").unwrap();
/// for document in set.iter() {
///     println!("{} {}", document.path.display(), document.digest);
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct DocumentSet {
    documents: Vec<LoadedDocument>,
}

impl DocumentSet {
    /// Returns a new [`DocumentSetBuilder`].
    pub fn builder() -> DocumentSetBuilder {
        DocumentSetBuilder::new()
    }

    /// Loads every `*.json`, `*.yaml` and `*.yml` file of a directory, in
    /// file-name order.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::NoDocuments`] if the directory has none, or the
    /// first load error.
    pub fn from_dir(path: impl AsRef<Path>) -> Result<Self> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(path.as_ref())? {
            let file_path = entry?.path();
            if matches!(
                file_path.extension().and_then(|e| e.to_str()),
                Some("json" | "yaml" | "yml")
            ) {
                files.push(file_path);
            }
        }
        files.sort();
        DocumentSetBuilder { paths: files }.build()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoadedDocument> {
        self.documents.iter()
    }

    /// `(source, digest)` of every document, in order.
    pub fn digests(&self) -> Vec<(String, String)> {
        self.documents
            .iter()
            .map(|doc| (doc.parsed.source.clone(), doc.digest.clone()))
            .collect()
    }

    /// Joins the documents in order.
    pub fn join(self, config: JoinConfig) -> Result<JoinResult> {
        debug!(documents = self.documents.len(), "Joining document set");
        let parsed = self.documents.into_iter().map(|doc| doc.parsed).collect();
        Ok(apijoin_core::join(parsed, config)?)
    }
}

/// Builder for a [`DocumentSet`].
///
/// Every added file must load; the first failure is returned.
#[derive(Debug, Clone, Default)]
pub struct DocumentSetBuilder {
    paths: Vec<PathBuf>,
}

impl DocumentSetBuilder {
    /// Creates a builder with no files.
    pub fn new() -> Self {
        Self { paths: Vec::new() }
    }

    /// Adds one file.
    pub fn add(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.push(path.into());
        self
    }

    /// Adds several files.
    pub fn add_all<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.paths.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Loads every file in order.
    pub fn build(self) -> Result<DocumentSet> {
        if self.paths.is_empty() {
            return Err(LoaderError::NoDocuments);
        }
        let documents = self
            .paths
            .iter()
            .map(load_document)
            .collect::<Result<Vec<_>>>()?;
        Ok(DocumentSet { documents })
    }
}

/// Result of [`run_job`].
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub result: JoinResult,
    pub manifest: JoinManifest,
}

/// Loads the inputs of `job`, joins them, writes the output and returns the
/// result together with a manifest of the run.
///
/// # Errors
///
/// Returns [`LoaderError::NoDocuments`] for a job without inputs, any load
/// error, or [`LoaderError::JoinError`] if the join fails. Nothing is
/// written when the join fails.
pub fn run_job(job: &JoinJob) -> Result<JoinOutcome> {
    let set = DocumentSet::builder().add_all(job.input_paths()).build()?;
    let mut manifest = JoinManifest::new(&set, &job.config)?;
    let result = set.join(job.config.clone())?;

    let output = job.output_path();
    let digest = write_result(&result, &output, job.format)?;
    manifest.record_output(&result, output, digest);
    info!(
        inputs = manifest.inputs.len(),
        collisions = result.collision_count,
        "Join job complete"
    );
    Ok(JoinOutcome { result, manifest })
}
