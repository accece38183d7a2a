//! Collision-aware joining of Swagger 2.0 and OpenAPI 3.x documents.
//!
//! The crate merges several API description documents of the same family into
//! one, keeping every `$ref` valid along the way:
//!
//! - [`Document`] models both families; [`SpecFamily`] tells them apart and
//!   knows where each keeps its schemas.
//! - [`Comparator`] decides structural equivalence of two schemas at a
//!   configurable [`EquivalenceMode`].
//! - [`ReferenceGraph`] indexes operation-to-schema and schema-to-schema
//!   references and computes the [`Lineage`] of a schema: every operation
//!   that reaches it, directly or transitively.
//! - [`select_primary`] picks the operation that names a schema.
//! - [`RenameTemplate`] compiles the rename template language and renders it
//!   against a [`RenameContext`].
//! - [`RenameMap`] and [`rewrite_document`] retarget references after renames.
//! - [`deduplicate`] folds structurally identical schemas into one.
//! - [`Joiner`] orchestrates all of the above according to a [`JoinConfig`].
//!
//! # Example
//!
//! ```
//! use apijoin_core::*;
//!
//! let user = |kind: &str| Schema::typed("object").with_property("id", Schema::typed(kind));
//! let users = Document::openapi("3.0.3")
//!     .with_path("/users", PathItem::default().with_operation(
//!         Method::Get,
//!         Operation::default().with_response("200", Response::json(
//!             "ok", Schema::reference("#/components/schemas/User"))),
//!     ))
//!     .with_schema("User", user("string"));
//! let orders = Document::openapi("3.0.3")
//!     .with_path("/orders", PathItem::default().with_operation(
//!         Method::Get,
//!         Operation::default().with_response("200", Response::json(
//!             "ok", Schema::reference("#/components/schemas/User"))),
//!     ))
//!     .with_schema("User", user("integer"));
//!
//! let config = JoinConfig::default()
//!     .with_strategy(CollisionCategory::Schema, CollisionStrategy::RenameRight);
//! let result = join(
//!     vec![
//!         ParsedDocument::new("users.yaml", users),
//!         ParsedDocument::new("orders.yaml", orders),
//!     ],
//!     config,
//! )
//! .unwrap();
//!
//! let schemas = &result.document.components.schemas;
//! assert!(schemas.contains_key("User") && schemas.contains_key("User_orders"));
//! assert_eq!(result.collision_count, 1);
//!
//! let response = &result.document.paths["/orders"].get.as_ref().unwrap().responses["200"];
//! assert_eq!(
//!     response.content["application/json"].schema.as_ref().unwrap().reference.as_deref(),
//!     Some("#/components/schemas/User_orders"),
//! );
//! ```

mod collision;
mod config;
mod dedup;
mod equivalence;
mod error;
mod graph;
mod join;
mod parsed;
mod rewrite;
mod schema;
mod select;
mod source_map;
mod template;
mod types;

pub use collision::{CollisionRecord, CollisionReport, Resolution};
pub use config::{
    CollisionCategory, CollisionStrategy, DEFAULT_RENAME_TEMPLATE, EquivalenceMode, JoinConfig,
    PrimaryOperationPolicy,
};
pub use dedup::{Consolidation, deduplicate};
pub use equivalence::{Comparator, SchemaResolver};
pub use error::{HookStage, JoinError, Result, TemplateError};
pub use graph::{Lineage, LineageOperation, OperationRef, ReferenceGraph, UsageType};
pub use join::{DocumentHook, HookError, JoinResult, JoinStatistics, Joiner, join};
pub use parsed::{DocumentFormat, ParsedDocument, source_name};
pub use rewrite::{RenameMap, RewriteStats, Rewriter, rename_container_entry, rewrite_document};
pub use schema::{
    AdditionalProperties, Discriminator, Items, Map, Schema, SchemaType, escape_pointer_segment,
    pointer_target, unescape_pointer_segment,
};
pub use select::select_primary;
pub use source_map::{SourceLocation, SourceMap};
pub use template::{RenameContext, RenameTemplate};
pub use types::*;
