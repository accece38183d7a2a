//! Schema node model shared by both document families.
//!
//! A [`Schema`] is an owned tree. Links between named schemas only exist
//! through `$ref` pointers, which is how recursive (cyclic) schema graphs are
//! expressed. Traversals that follow pointers therefore carry an explicit
//! visited set keyed by node identity.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Insertion-ordered string map used throughout the document model.
pub type Map<V> = IndexMap<String, V>;

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}

/// A `type` keyword: a single type name or (OpenAPI 3.1) a list of names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Multiple(Vec<String>),
}

impl SchemaType {
    /// Returns the type names as a sorted, de-duplicated list.
    ///
    /// `"string"` and `["string"]` normalize to the same value.
    pub fn normalized(&self) -> Vec<&str> {
        let mut names: Vec<&str> = match self {
            Self::Single(name) => vec![name.as_str()],
            Self::Multiple(names) => names.iter().map(String::as_str).collect(),
        };
        names.sort_unstable();
        names.dedup();
        names
    }
}

/// The `items` keyword: one child schema, or a positional tuple of children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Items {
    Tuple(Vec<Schema>),
    Single(Box<Schema>),
}

/// The `additionalProperties` keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<Schema>),
}

/// Polymorphism hint for composed schemas.
///
/// Mapping values are either full pointers (`#/components/schemas/Cat`) or
/// bare schema names (`Cat`); each entry may use either form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discriminator {
    pub property_name: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub mapping: Map<String>,
}

/// A JSON Schema node as used by Swagger 2.0 and OpenAPI 3.x.
///
/// # Examples
///
/// ```
/// use apijoin_core::Schema;
///
/// let user = Schema::typed("object")
///     .with_property("id", Schema::typed("string"))
///     .with_property("manager", Schema::reference("#/components/schemas/User"))
///     .with_required("id");
///
/// assert!(!user.is_empty());
/// assert_eq!(user.children().len(), 2);
/// assert!(Schema::default().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    // Descriptive metadata; never part of structural comparisons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<Value>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub deprecated: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub read_only: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub write_only: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique_items: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_properties: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,
    #[serde(rename = "const", default, skip_serializing_if = "Option::is_none")]
    pub const_value: Option<Value>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: Map<Schema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Items>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<Schema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<Schema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<Schema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<Schema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Discriminator>,

    /// Vendor extensions and keywords this model does not name.
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

impl Schema {
    /// Creates a pointer-only schema (`{"$ref": pointer}`).
    pub fn reference(pointer: impl Into<String>) -> Self {
        Self {
            reference: Some(pointer.into()),
            ..Default::default()
        }
    }

    /// Creates a schema declaring a single `type`.
    pub fn typed(schema_type: &str) -> Self {
        Self {
            schema_type: Some(SchemaType::Single(schema_type.to_string())),
            ..Default::default()
        }
    }

    /// Adds a named property.
    pub fn with_property(mut self, name: &str, schema: Schema) -> Self {
        self.properties.insert(name.to_string(), schema);
        self
    }

    /// Marks a property as required.
    pub fn with_required(mut self, name: &str) -> Self {
        self.required.push(name.to_string());
        self
    }

    /// Sets a single `items` child.
    pub fn with_items(mut self, items: Schema) -> Self {
        self.items = Some(Items::Single(Box::new(items)));
        self
    }

    /// Sets the format keyword.
    pub fn with_format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Returns `true` when the schema declares no structural content.
    ///
    /// Title, description, examples, the deprecated flag and extensions do not
    /// count; neither does `additionalProperties: <bool>` on its own. A pointer
    /// is structural content.
    pub fn is_empty(&self) -> bool {
        self.reference.is_none() && !self.has_structure()
    }

    /// Returns `true` for a `$ref` with nothing beside it that changes its
    /// meaning: no structural keyword, default, access flag or discriminator.
    pub fn is_pure_reference(&self) -> bool {
        self.reference.is_some()
            && !self.has_structure()
            && self.default.is_none()
            && !self.read_only
            && !self.write_only
            && self.discriminator.is_none()
    }

    fn has_structure(&self) -> bool {
        !(self.schema_type.is_none()
            && self.format.is_none()
            && self.properties.is_empty()
            && self.items.is_none()
            && !matches!(
                self.additional_properties,
                Some(AdditionalProperties::Schema(_))
            )
            && !self.has_validation()
            && self.all_of.is_empty()
            && self.any_of.is_empty()
            && self.one_of.is_empty()
            && self.not.is_none())
    }

    fn has_validation(&self) -> bool {
        self.multiple_of.is_some()
            || self.maximum.is_some()
            || self.exclusive_maximum.is_some()
            || self.minimum.is_some()
            || self.exclusive_minimum.is_some()
            || self.max_length.is_some()
            || self.min_length.is_some()
            || self.pattern.is_some()
            || self.max_items.is_some()
            || self.min_items.is_some()
            || self.unique_items
            || self.max_properties.is_some()
            || self.min_properties.is_some()
            || !self.required.is_empty()
            || !self.enum_values.is_empty()
            || self.const_value.is_some()
            || self.nullable
    }

    /// Returns the direct child schemas in a fixed order: properties, items,
    /// additional properties, `allOf`, `anyOf`, `oneOf`, `not`.
    pub fn children(&self) -> Vec<&Schema> {
        let mut children: Vec<&Schema> = self.properties.values().collect();
        match &self.items {
            Some(Items::Single(item)) => children.push(item),
            Some(Items::Tuple(items)) => children.extend(items.iter()),
            None => {}
        }
        if let Some(AdditionalProperties::Schema(extra)) = &self.additional_properties {
            children.push(extra);
        }
        children.extend(self.all_of.iter());
        children.extend(self.any_of.iter());
        children.extend(self.one_of.iter());
        if let Some(not) = &self.not {
            children.push(not);
        }
        children
    }

    /// Mutable counterpart of [`children`](Self::children), same order.
    pub fn children_mut(&mut self) -> Vec<&mut Schema> {
        let mut children: Vec<&mut Schema> = self.properties.values_mut().collect();
        match &mut self.items {
            Some(Items::Single(item)) => children.push(item),
            Some(Items::Tuple(items)) => children.extend(items.iter_mut()),
            None => {}
        }
        if let Some(AdditionalProperties::Schema(extra)) = &mut self.additional_properties {
            children.push(extra);
        }
        children.extend(self.all_of.iter_mut());
        children.extend(self.any_of.iter_mut());
        children.extend(self.one_of.iter_mut());
        if let Some(not) = &mut self.not {
            children.push(not);
        }
        children
    }
}

/// Escapes a schema name for use inside a JSON pointer (RFC 6901).
pub fn escape_pointer_segment(name: &str) -> String {
    name.replace('~', "~0").replace('/', "~1")
}

/// Reverses [`escape_pointer_segment`].
pub fn unescape_pointer_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Extracts the container entry name a local pointer targets.
///
/// Pointers into a sub-schema (`#/definitions/User/properties/id`) resolve
/// to the entry they start in. Returns `None` for pointers with a different
/// prefix, including external references.
pub fn pointer_target(pointer: &str, prefix: &str) -> Option<String> {
    let rest = pointer.strip_prefix(prefix)?;
    let segment = rest.split('/').next().unwrap_or(rest);
    if segment.is_empty() {
        return None;
    }
    Some(unescape_pointer_segment(segment))
}

/// Collects every container name referenced anywhere inside `schema`,
/// including discriminator mapping targets. Pointers are not followed.
pub(crate) fn collect_references(schema: &Schema, prefix: &str, into: &mut Vec<String>) {
    let mut stack = vec![schema];
    while let Some(node) = stack.pop() {
        if let Some(target) = node.reference.as_deref().and_then(|r| pointer_target(r, prefix)) {
            into.push(target);
        }
        if let Some(discriminator) = &node.discriminator {
            for value in discriminator.mapping.values() {
                let target = if value.starts_with('#') {
                    pointer_target(value, prefix)
                } else if !value.contains('/') {
                    Some(value.clone())
                } else {
                    None
                };
                into.extend(target);
            }
        }
        // Reverse so the explicit stack pops children in declaration order.
        stack.extend(node.children().into_iter().rev());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_only_schema_is_empty() {
        let schema = Schema::default().with_description("anything goes");
        assert!(schema.is_empty());
    }

    #[test]
    fn test_reference_schema_is_not_empty() {
        assert!(!Schema::reference("#/definitions/User").is_empty());
    }

    #[test]
    fn test_validation_keyword_makes_schema_non_empty() {
        let schema = Schema {
            min_length: Some(3),
            ..Default::default()
        };
        assert!(!schema.is_empty());
    }

    #[test]
    fn test_pure_reference_has_no_meaningful_siblings() {
        let plain = Schema::reference("#/definitions/User").with_description("the user");
        assert!(plain.is_pure_reference());

        let mut nullable = Schema::reference("#/definitions/User");
        nullable.nullable = true;
        assert!(!nullable.is_pure_reference());

        let mut read_only = Schema::reference("#/definitions/User");
        read_only.read_only = true;
        assert!(!read_only.is_pure_reference());

        assert!(!Schema::typed("string").is_pure_reference());
    }

    #[test]
    fn test_pointer_target_handles_escapes_and_subpaths() {
        let prefix = "#/components/schemas/";
        assert_eq!(
            pointer_target("#/components/schemas/a~1b", prefix).as_deref(),
            Some("a/b")
        );
        assert_eq!(
            pointer_target("#/components/schemas/User/properties/id", prefix).as_deref(),
            Some("User")
        );
        assert_eq!(pointer_target("other.yaml#/User", prefix), None);
    }

    #[test]
    fn test_collect_references_walks_nested_children_and_mapping() {
        let prefix = "#/definitions/";
        let mut discriminator = Discriminator {
            property_name: "kind".to_string(),
            ..Default::default()
        };
        discriminator
            .mapping
            .insert("cat".to_string(), "#/definitions/Cat".to_string());
        discriminator
            .mapping
            .insert("dog".to_string(), "Dog".to_string());

        let mut schema = Schema::typed("object")
            .with_property("owner", Schema::reference("#/definitions/Owner"))
            .with_property(
                "tags",
                Schema::typed("array").with_items(Schema::reference("#/definitions/Tag")),
            );
        schema.discriminator = Some(discriminator);

        let mut refs = Vec::new();
        collect_references(&schema, prefix, &mut refs);
        refs.sort();
        assert_eq!(refs, vec!["Cat", "Dog", "Owner", "Tag"]);
    }

    #[test]
    fn test_deserialize_items_forms() {
        let single: Schema =
            serde_json::from_str(r#"{"type":"array","items":{"type":"string"}}"#).unwrap();
        assert!(matches!(single.items, Some(Items::Single(_))));

        let tuple: Schema =
            serde_json::from_str(r#"{"type":"array","items":[{"type":"string"},{"type":"integer"}]}"#)
                .unwrap();
        assert!(matches!(tuple.items, Some(Items::Tuple(ref items)) if items.len() == 2));
    }
}
