//! Join job configuration.
//!
//! A job names the inputs, the output file and the [`JoinConfig`] to use. It
//! is kept as YAML next to the documents it joins; relative paths resolve
//! against the job file's directory.
//!
//! # Example YAML
//!
//! ```yaml
//! inputs:
//!   - users.yaml
//!   - orders.yaml
//! output: joined.yaml
//! format: yaml
//! config:
//!   schema_strategy: rename-right
//!   rename_template: "{PrimaryResource | pascalCase}{Name}"
//!   operation_context: true
//!   namespace_prefix:
//!     orders: Ord
//!   collision_report: true
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use apijoin_core::{DocumentFormat, JoinConfig};
use serde::{Deserialize, Serialize};

use crate::error::{LoaderError, Result};

/// One join run: which files, where the result goes, and how to merge.
///
/// # Examples
///
/// ```
/// use apijoin_core::CollisionStrategy;
/// use apijoin_loader::JoinJob;
///
/// let yaml = "inputs: [a.yaml, b.yaml]\noutput: out.json\nconfig:\n  default_strategy: accept-left\n";
/// let job: JoinJob = serde_yaml::from_str(yaml).unwrap();
/// assert_eq!(job.inputs.len(), 2);
/// assert_eq!(job.config.default_strategy, CollisionStrategy::AcceptLeft);
/// assert!(job.config.merge_arrays);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinJob {
    /// Documents to join, in order.
    pub inputs: Vec<PathBuf>,
    /// Where the joined document is written.
    pub output: PathBuf,
    /// Output format; defaults to the output extension, then the first input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<DocumentFormat>,
    #[serde(default)]
    pub config: JoinConfig,
    /// Directory relative paths resolve against.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl JoinJob {
    /// Creates a job with the default configuration.
    pub fn new(inputs: Vec<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            inputs,
            output: output.into(),
            format: None,
            config: JoinConfig::default(),
            base_dir: None,
        }
    }

    /// Loads a job from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](LoaderError::IoError) if the file cannot be read,
    /// or [`YamlError`](LoaderError::YamlError) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let mut job: Self = serde_yaml::from_reader(BufReader::new(file))?;
        job.base_dir = path.parent().map(Path::to_path_buf);
        Ok(job)
    }

    /// Saves the job as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_yaml::to_writer(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Resolves `path` against [`base_dir`](Self::base_dir).
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Input paths, resolved.
    pub fn input_paths(&self) -> Vec<PathBuf> {
        self.inputs.iter().map(|path| self.resolve(path)).collect()
    }

    /// Output path, resolved.
    pub fn output_path(&self) -> PathBuf {
        self.resolve(&self.output)
    }
}

/// Loads a standalone [`JoinConfig`]: JSON for `*.json`, YAML otherwise.
pub fn load_config(path: impl AsRef<Path>) -> Result<JoinConfig> {
    let path = path.as_ref();
    let reader = BufReader::new(std::fs::File::open(path)?);
    let config = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_reader(reader)?,
        _ => serde_yaml::from_reader(reader)?,
    };
    Ok(config)
}

/// Saves a [`JoinConfig`] in the format implied by the extension.
pub fn save_config(config: &JoinConfig, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let writer = BufWriter::new(std::fs::File::create(path)?);
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::to_writer_pretty(writer, config).map_err(LoaderError::from),
        _ => serde_yaml::to_writer(writer, config).map_err(LoaderError::from),
    }
}
