//! Primary operation selection.

use crate::config::PrimaryOperationPolicy;
use crate::graph::{Lineage, LineageOperation};

/// Picks the operation that supplies rename context for a schema.
///
/// Returns `None` for an empty lineage. The choice is deterministic: every
/// policy falls back to traversal order to break ties.
///
/// # Examples
///
/// ```
/// use apijoin_core::*;
///
/// let doc = Document::openapi("3.0.3")
///     .with_path("/a", PathItem::default().with_operation(
///         Method::Get,
///         Operation::default().with_response("200", Response::json(
///             "ok", Schema::reference("#/components/schemas/Item"))),
///     ))
///     .with_path("/b", PathItem::default().with_operation(
///         Method::Get,
///         Operation::default()
///             .with_operation_id("listItems")
///             .with_response("200", Response::json(
///                 "ok", Schema::reference("#/components/schemas/Item"))),
///     ))
///     .with_schema("Item", Schema::typed("object"));
///
/// let mut graph = ReferenceGraph::build(&doc, SpecFamily::Namespaced);
/// let lineage = graph.lineage("Item");
///
/// let first = select_primary(lineage, PrimaryOperationPolicy::FirstEncountered).unwrap();
/// assert_eq!(first.operation.path, "/a");
///
/// let specific = select_primary(lineage, PrimaryOperationPolicy::MostSpecific).unwrap();
/// assert_eq!(specific.operation.operation_id.as_deref(), Some("listItems"));
/// ```
pub fn select_primary(
    lineage: &Lineage,
    policy: PrimaryOperationPolicy,
) -> Option<&LineageOperation> {
    let operations = lineage.operations.iter();
    match policy {
        PrimaryOperationPolicy::FirstEncountered => {
            operations.min_by_key(|entry| entry.operation.order)
        }
        PrimaryOperationPolicy::MostSpecific => {
            operations.min_by_key(|entry| (specificity(entry), entry.operation.order))
        }
        PrimaryOperationPolicy::Alphabetical => operations.min_by_key(|entry| {
            (
                format!("{}{}", entry.operation.path, entry.operation.method.as_str()),
                entry.operation.order,
            )
        }),
    }
}

/// Lower is more specific: an operation id beats tags, tags beat nothing.
fn specificity(entry: &LineageOperation) -> u8 {
    if entry.operation.operation_id.is_some() {
        0
    } else if !entry.operation.tags.is_empty() {
        1
    } else {
        2
    }
}
