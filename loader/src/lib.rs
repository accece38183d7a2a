//! File-level I/O around [`apijoin_core`].
//!
//! This crate reads Swagger 2.0 and OpenAPI 3.x documents from JSON or YAML
//! files, joins them, and writes the result back:
//!
//! - [`load_document`] parses one file, detects its format, records a
//!   SHA-256 digest and a line-based source map for diagnostics.
//! - [`DocumentSet`] holds an ordered group of loaded documents.
//! - [`JoinJob`] is a YAML job description (inputs, output, [`JoinConfig`]).
//! - [`run_job`] runs a job end to end and returns a [`JoinManifest`].
//!
//! # Quick start
//!
//! ```no_run
//! use apijoin_loader::{JoinJob, run_job};
//!
//! let job = JoinJob::load("join.yaml").unwrap();
//! let outcome = run_job(&job).unwrap();
//! for warning in &outcome.result.warnings {
//!     eprintln!("warning: {warning}");
//! }
//! ```
//!
//! [`JoinConfig`]: apijoin_core::JoinConfig

mod config;
mod error;
mod loader;
mod manifest;
mod positions;

pub use config::{JoinJob, load_config, save_config};
pub use error::{LoaderError, Result};
pub use loader::{
    DocumentSet, DocumentSetBuilder, JoinOutcome, LoadedDocument, detect_format, digest,
    load_document, parse_document, render, run_job, write_result,
};
pub use manifest::{InputRecord, JoinManifest, MANIFEST_VERSION, OutputRecord};
pub use positions::scan as scan_source_map;
