//! Semantic deduplication of the merged schema container.

use tracing::debug;

use crate::config::EquivalenceMode;
use crate::equivalence::Comparator;
use crate::rewrite::{RenameMap, rewrite_document};
use crate::schema::Schema;
use crate::types::{Document, SpecFamily};

/// One equivalence class folded into its canonical schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consolidation {
    /// Alphabetically earliest name of the class; the survivor.
    pub canonical: String,
    /// Removed names, alphabetically.
    pub duplicates: Vec<String>,
}

/// Folds deep-equivalent schemas of `document` into one canonical entry
/// each, rewriting every reference to a removed name.
///
/// Empty schemas and schemas with a top-level `$ref` never take part, so a
/// survivor can never end up pointing at an entry that was folded into it.
///
/// # Examples
///
/// ```
/// use apijoin_core::*;
///
/// let address = Schema::typed("object")
///     .with_property("street", Schema::typed("string"));
/// let mut doc = Document::openapi("3.0.3")
///     .with_schema("ShippingAddress", address.clone())
///     .with_schema("Address", address.clone())
///     .with_schema("Order", Schema::typed("object")
///         .with_property("shipTo", Schema::reference("#/components/schemas/ShippingAddress")));
///
/// let folded = deduplicate(&mut doc, SpecFamily::Namespaced);
/// assert_eq!(folded.len(), 1);
/// assert_eq!(folded[0].canonical, "Address");
/// assert!(!doc.components.schemas.contains_key("ShippingAddress"));
/// assert_eq!(
///     doc.components.schemas["Order"].properties["shipTo"].reference.as_deref(),
///     Some("#/components/schemas/Address"),
/// );
/// ```
pub fn deduplicate(document: &mut Document, family: SpecFamily) -> Vec<Consolidation> {
    let consolidations = equivalence_classes(document, family);
    if consolidations.is_empty() {
        return consolidations;
    }

    let mut renames = RenameMap::new(family);
    let container = document.schemas_mut(family);
    for consolidation in &consolidations {
        for duplicate in &consolidation.duplicates {
            container.shift_remove(duplicate);
            renames.insert(duplicate, &consolidation.canonical);
        }
    }
    let stats = rewrite_document(document, &renames);
    debug!(
        classes = consolidations.len(),
        removed = renames.len(),
        references_rewritten = stats.references_rewritten,
        "Consolidated equivalent schemas"
    );
    consolidations
}

fn equivalence_classes(document: &Document, family: SpecFamily) -> Vec<Consolidation> {
    let container = document.schemas(family);
    let comparator = Comparator::within(EquivalenceMode::Deep, container, family);

    let mut candidates: Vec<(&String, &Schema)> = container
        .iter()
        .filter(|(_, schema)| !schema.is_empty() && schema.reference.is_none())
        .collect();
    candidates.sort_by(|a, b| a.0.cmp(b.0));

    let mut classes: Vec<Vec<(&String, &Schema)>> = Vec::new();
    for (name, schema) in candidates {
        match classes
            .iter_mut()
            .find(|class| comparator.equivalent(class[0].1, schema))
        {
            Some(class) => class.push((name, schema)),
            None => classes.push(vec![(name, schema)]),
        }
    }

    classes
        .into_iter()
        .filter(|class| class.len() > 1)
        .map(|class| Consolidation {
            canonical: class[0].0.clone(),
            duplicates: class[1..].iter().map(|(name, _)| (*name).clone()).collect(),
        })
        .collect()
}
