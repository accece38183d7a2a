//! Error types for join operations.
//!
//! Every variant is fatal: a join that returns an error produces no merged
//! document. Non-fatal conditions are reported as warnings on the
//! [`JoinResult`](crate::JoinResult) instead.

use std::fmt;

use thiserror::Error;

use crate::config::{CollisionCategory, CollisionStrategy, EquivalenceMode};

/// Stage at which a caller-supplied hook ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    /// Applied to each input before merging.
    PreMerge,
    /// Applied to the merged document.
    PostMerge,
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreMerge => write!(f, "pre-merge"),
            Self::PostMerge => write!(f, "post-merge"),
        }
    }
}

/// Errors raised while compiling a rename template.
///
/// Each variant carries the offending template text. Rendering a compiled
/// template cannot fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// The template text is malformed.
    #[error("syntax error in template \"{template}\" at offset {offset}: {message}")]
    Syntax {
        template: String,
        offset: usize,
        message: String,
    },
    /// A call names a function outside the built-in registry.
    #[error("unknown function '{name}' in template \"{template}\"")]
    UnknownFunction { template: String, name: String },
    /// A placeholder names a field the rename context does not have.
    #[error("unknown field '{name}' in template \"{template}\"")]
    UnknownField { template: String, name: String },
    /// A function was called with the wrong number of arguments.
    #[error("function '{name}' expects {expected} argument(s) but got {got} in template \"{template}\"")]
    Arity {
        template: String,
        name: String,
        expected: String,
        got: usize,
    },
}

/// Fatal join errors.
#[derive(Debug, Error)]
pub enum JoinError {
    /// Fewer than two documents were supplied.
    #[error("at least two documents are required to join, got {0}")]
    NotEnoughDocuments(usize),

    /// A document has no usable version marker.
    #[error("unsupported document {document}: {reason}")]
    UnsupportedDocument { document: String, reason: String },

    /// Documents come from different schema-container families.
    #[error(
        "version mismatch: {left} is {left_version} but {right} is {right_version}; \
         documents of different families cannot be joined"
    )]
    VersionMismatch {
        left: String,
        left_version: String,
        right: String,
        right_version: String,
    },

    /// A collision under a fail-type strategy.
    #[error("{category} collision on '{name}' between {left} and {right} (strategy: {strategy})")]
    Collision {
        category: CollisionCategory,
        name: String,
        left: String,
        right: String,
        strategy: CollisionStrategy,
    },

    /// A deduplicate-equivalent collision whose definitions differ.
    #[error(
        "{category} '{name}' differs between {left} and {right} \
         ({mode} comparison under deduplicate-equivalent)"
    )]
    NotEquivalent {
        category: CollisionCategory,
        name: String,
        left: String,
        right: String,
        mode: EquivalenceMode,
    },

    /// The rename template failed to compile.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// A caller-supplied hook failed.
    #[error("{stage} hook failed for {document}: {message}")]
    Hook {
        stage: HookStage,
        document: String,
        message: String,
    },

    /// The configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience alias for results with [`JoinError`].
pub type Result<T> = std::result::Result<T, JoinError>;
