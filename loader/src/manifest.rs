//! Manifests recording what a join consumed and produced.
//!
//! A manifest holds the SHA-256 digest of every input, of the configuration
//! and of the written output. Comparing two manifests tells whether a join
//! has to run again: it does when the configuration changed, when an input
//! was added or removed, or when an input's content changed.
//!
//! # Examples
//!
//! ```no_run
//! use apijoin_loader::{JoinJob, JoinManifest, run_job};
//!
//! let job = JoinJob::load("join.yaml").unwrap();
//! let previous = JoinManifest::load("join.manifest.json").ok();
//! let outcome = run_job(&job).unwrap();
//! if let Some(previous) = previous {
//!     println!("changed inputs: {:?}", previous.diff(&outcome.manifest));
//! }
//! outcome.manifest.save("join.manifest.json").unwrap();
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use apijoin_core::{JoinConfig, JoinResult, JoinStatistics};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::loader::{DocumentSet, digest};

/// Manifest format version.
pub const MANIFEST_VERSION: &str = "1.0";

/// One input of a join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRecord {
    /// Source identifier (the path the document was loaded from).
    pub source: String,
    /// Document version string.
    pub version: String,
    /// SHA-256 hex digest of the file contents.
    pub digest: String,
}

/// The written result of a join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub path: PathBuf,
    /// SHA-256 hex digest of the written bytes.
    pub digest: String,
}

/// Inputs, configuration and output of one join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinManifest {
    /// Manifest format version.
    pub version: String,
    /// SHA-256 hex digest of the configuration serialized as JSON.
    pub config_digest: String,
    pub inputs: Vec<InputRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputRecord>,
    #[serde(default)]
    pub collision_count: usize,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub statistics: JoinStatistics,
}

impl JoinManifest {
    /// Records the inputs of `set` and the digest of `config`.
    pub fn new(set: &DocumentSet, config: &JoinConfig) -> Result<Self> {
        let inputs = set
            .iter()
            .map(|document| InputRecord {
                source: document.parsed.source.clone(),
                version: document.parsed.version.clone(),
                digest: document.digest.clone(),
            })
            .collect();
        Ok(Self {
            version: MANIFEST_VERSION.to_string(),
            config_digest: digest(&serde_json::to_vec(config)?),
            inputs,
            output: None,
            collision_count: 0,
            warnings: Vec::new(),
            statistics: JoinStatistics::default(),
        })
    }

    /// Records the outcome of the join and where it was written.
    pub fn record_output(&mut self, result: &JoinResult, path: impl Into<PathBuf>, digest: String) {
        self.output = Some(OutputRecord {
            path: path.into(),
            digest,
        });
        self.collision_count = result.collision_count;
        self.warnings = result.warnings.clone();
        self.statistics = result.statistics;
    }

    /// Loads a manifest from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let manifest = serde_json::from_reader(BufReader::new(file))?;
        Ok(manifest)
    }

    /// Saves the manifest as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Computes the SHA-256 hex digest of a file.
    pub fn calculate_checksum(path: impl AsRef<Path>) -> Result<String> {
        Ok(digest(&std::fs::read(path)?))
    }

    /// Returns `true` when the recorded output still has its recorded digest.
    pub fn output_is_intact(&self) -> Result<bool> {
        match &self.output {
            Some(output) if output.path.exists() => {
                Ok(Self::calculate_checksum(&output.path)? == output.digest)
            }
            _ => Ok(false),
        }
    }

    /// Sources that differ between `self` and `other`.
    ///
    /// A changed configuration reports every source of both manifests.
    pub fn diff(&self, other: &JoinManifest) -> Vec<String> {
        let find = |manifest: &JoinManifest, source: &str| {
            manifest
                .inputs
                .iter()
                .find(|input| input.source == source)
                .map(|input| input.digest.clone())
        };

        let config_changed = self.config_digest != other.config_digest;
        let mut changed: Vec<String> = Vec::new();
        for input in &self.inputs {
            if config_changed || find(other, &input.source).as_deref() != Some(input.digest.as_str()) {
                changed.push(input.source.clone());
            }
        }
        for input in &other.inputs {
            if find(self, &input.source).is_none() {
                changed.push(input.source.clone());
            }
        }
        changed
    }
}
