//! Reference rewriting.
//!
//! [`Rewriter`] retargets local schema pointers according to a
//! [`RenameMap`]. It walks every place a schema can appear: the schema
//! containers, reusable components, path items, operations, callbacks and
//! webhooks. Renaming the container key itself is a separate step, see
//! [`rename_container_entry`].

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::schema::{Map, Schema, escape_pointer_segment, unescape_pointer_segment};
use crate::types::{
    Callback, Document, Header, MediaType, Operation, Parameter, PathItem, RequestBody, Response,
    SpecFamily,
};

/// Old schema name to new schema name, for one family's pointer prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameMap {
    prefix: &'static str,
    names: BTreeMap<String, String>,
}

impl RenameMap {
    /// Creates an empty map for `family`'s schema pointers.
    pub fn new(family: SpecFamily) -> Self {
        Self {
            prefix: family.schema_ref_prefix(),
            names: BTreeMap::new(),
        }
    }

    /// Adds `old` → `new`, builder style.
    pub fn with(mut self, old: &str, new: &str) -> Self {
        self.insert(old, new);
        self
    }

    /// Adds `old` → `new`.
    pub fn insert(&mut self, old: &str, new: &str) {
        self.names.insert(old.to_string(), new.to_string());
    }

    /// New name for `old`, if it is renamed.
    pub fn get(&self, old: &str) -> Option<&str> {
        self.names.get(old).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Iterates over `(old, new)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names
            .iter()
            .map(|(old, new)| (old.as_str(), new.as_str()))
    }

    /// Rewritten pointer, or `None` when `pointer` targets no renamed entry.
    ///
    /// Handles both whole-entry pointers and pointers into a sub-schema
    /// (`#/definitions/User/properties/id`).
    pub fn rewrite_pointer(&self, pointer: &str) -> Option<String> {
        let rest = pointer.strip_prefix(self.prefix)?;
        let (segment, tail) = match rest.find('/') {
            Some(split) => rest.split_at(split),
            None => (rest, ""),
        };
        let new = self.get(&unescape_pointer_segment(segment))?;
        Some(format!("{}{}{}", self.prefix, escape_pointer_segment(new), tail))
    }

    /// Rewritten discriminator mapping value, in the form it was written in.
    fn rewrite_mapping_value(&self, value: &str) -> Option<String> {
        if value.starts_with('#') {
            self.rewrite_pointer(value)
        } else if !value.contains('/') {
            self.get(value).map(str::to_string)
        } else {
            None
        }
    }
}

/// Counters reported by a rewrite pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    /// Schema nodes visited.
    pub nodes_visited: usize,
    /// Pointers and mapping values changed.
    pub references_rewritten: usize,
}

/// One rewrite pass.
///
/// Each schema node is visited at most once; nodes are identified by address.
#[derive(Debug)]
pub struct Rewriter<'m> {
    map: &'m RenameMap,
    visited: HashSet<usize>,
    stats: RewriteStats,
}

impl<'m> Rewriter<'m> {
    pub fn new(map: &'m RenameMap) -> Self {
        Self {
            map,
            visited: HashSet::new(),
            stats: RewriteStats::default(),
        }
    }

    /// Counters so far.
    pub fn stats(&self) -> RewriteStats {
        self.stats
    }

    /// Rewrites a schema tree.
    pub fn rewrite_schema(&mut self, schema: &mut Schema) {
        let id = std::ptr::from_mut(&mut *schema) as usize;
        if !self.visited.insert(id) {
            return;
        }
        self.stats.nodes_visited += 1;

        if let Some(pointer) = &mut schema.reference {
            if let Some(rewritten) = self.map.rewrite_pointer(pointer) {
                *pointer = rewritten;
                self.stats.references_rewritten += 1;
            }
        }
        if let Some(discriminator) = &mut schema.discriminator {
            for value in discriminator.mapping.values_mut() {
                if let Some(rewritten) = self.map.rewrite_mapping_value(value) {
                    *value = rewritten;
                    self.stats.references_rewritten += 1;
                }
            }
        }

        for child in schema.children_mut() {
            self.rewrite_schema(child);
        }
    }

    /// Rewrites every schema location of `document`.
    pub fn rewrite_document(&mut self, document: &mut Document) {
        for schema in document.definitions.values_mut() {
            self.rewrite_schema(schema);
        }
        for parameter in document.parameters.values_mut() {
            self.rewrite_parameter(parameter);
        }
        for response in document.responses.values_mut() {
            self.rewrite_response(response);
        }

        let components = &mut document.components;
        for schema in components.schemas.values_mut() {
            self.rewrite_schema(schema);
        }
        for parameter in components.parameters.values_mut() {
            self.rewrite_parameter(parameter);
        }
        for response in components.responses.values_mut() {
            self.rewrite_response(response);
        }
        for body in components.request_bodies.values_mut() {
            self.rewrite_request_body(body);
        }
        for header in components.headers.values_mut() {
            self.rewrite_header(header);
        }
        for callback in components.callbacks.values_mut() {
            self.rewrite_callback(callback);
        }
        for item in components.path_items.values_mut() {
            self.rewrite_path_item(item);
        }

        for item in document.paths.values_mut() {
            self.rewrite_path_item(item);
        }
        for item in document.webhooks.values_mut() {
            self.rewrite_path_item(item);
        }
    }

    fn rewrite_path_item(&mut self, item: &mut PathItem) {
        for parameter in &mut item.parameters {
            self.rewrite_parameter(parameter);
        }
        for operation in item.operations_mut() {
            self.rewrite_operation(operation);
        }
    }

    fn rewrite_operation(&mut self, operation: &mut Operation) {
        for parameter in &mut operation.parameters {
            self.rewrite_parameter(parameter);
        }
        if let Some(body) = &mut operation.request_body {
            self.rewrite_request_body(body);
        }
        for response in operation.responses.values_mut() {
            self.rewrite_response(response);
        }
        for callback in operation.callbacks.values_mut() {
            self.rewrite_callback(callback);
        }
    }

    fn rewrite_callback(&mut self, callback: &mut Callback) {
        for item in callback.values_mut() {
            self.rewrite_path_item(item);
        }
    }

    fn rewrite_parameter(&mut self, parameter: &mut Parameter) {
        if let Some(schema) = &mut parameter.schema {
            self.rewrite_schema(schema);
        }
        self.rewrite_content(&mut parameter.content);
    }

    fn rewrite_request_body(&mut self, body: &mut RequestBody) {
        self.rewrite_content(&mut body.content);
    }

    fn rewrite_response(&mut self, response: &mut Response) {
        if let Some(schema) = &mut response.schema {
            self.rewrite_schema(schema);
        }
        self.rewrite_content(&mut response.content);
        for header in response.headers.values_mut() {
            self.rewrite_header(header);
        }
    }

    fn rewrite_header(&mut self, header: &mut Header) {
        if let Some(schema) = &mut header.schema {
            self.rewrite_schema(schema);
        }
    }

    fn rewrite_content(&mut self, content: &mut Map<MediaType>) {
        for media_type in content.values_mut() {
            if let Some(schema) = &mut media_type.schema {
                self.rewrite_schema(schema);
            }
        }
    }
}

/// Rewrites every schema pointer in `document` according to `map`.
///
/// # Examples
///
/// ```
/// use apijoin_core::*;
///
/// let mut doc = Document::openapi("3.0.3")
///     .with_schema("Order", Schema::typed("object")
///         .with_property("buyer", Schema::reference("#/components/schemas/User")))
///     .with_schema("User", Schema::typed("object"));
///
/// let map = RenameMap::new(SpecFamily::Namespaced).with("User", "User_orders");
/// let stats = rewrite_document(&mut doc, &map);
///
/// assert_eq!(stats.references_rewritten, 1);
/// assert_eq!(
///     doc.components.schemas["Order"].properties["buyer"].reference.as_deref(),
///     Some("#/components/schemas/User_orders"),
/// );
/// ```
pub fn rewrite_document(document: &mut Document, map: &RenameMap) -> RewriteStats {
    if map.is_empty() {
        return RewriteStats::default();
    }
    let mut rewriter = Rewriter::new(map);
    rewriter.rewrite_document(document);
    let stats = rewriter.stats();
    debug!(
        renames = map.len(),
        nodes_visited = stats.nodes_visited,
        references_rewritten = stats.references_rewritten,
        "Rewrote schema references"
    );
    stats
}

/// Moves container entry `old` to key `new`, keeping its position.
///
/// Returns `false` when `old` is absent or `new` is already taken.
pub fn rename_container_entry(container: &mut Map<Schema>, old: &str, new: &str) -> bool {
    if old == new || container.contains_key(new) {
        return false;
    }
    let Some(index) = container.get_index_of(old) else {
        return false;
    };
    let Some((_, schema)) = container.shift_remove_index(index) else {
        return false;
    };
    container.shift_insert(index, new.to_string(), schema);
    true
}
