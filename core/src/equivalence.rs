//! Structural schema comparison.
//!
//! [`Comparator`] decides whether two schemas describe the same shape under
//! an [`EquivalenceMode`]. Both sides resolve local pointers against their
//! own schema container, so schemas from two different documents can be
//! compared by structure rather than by pointer text.
//!
//! Only a pure `$ref` (see [`Schema::is_pure_reference`]) is replaced by its
//! target. A `$ref` with siblings such as `nullable` or `maxLength` stays in
//! place: its target and its siblings are both compared.
//!
//! Empty schemas (see [`Schema::is_empty`]) are never equivalent to
//! anything, including other empty schemas.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::ptr;

use crate::config::EquivalenceMode;
use crate::schema::{
    AdditionalProperties, Items, Map, Schema, escape_pointer_segment, pointer_target,
};
use crate::types::SpecFamily;

/// Resolves local schema pointers against one schema container.
#[derive(Debug, Clone, Copy)]
pub struct SchemaResolver<'a> {
    container: &'a Map<Schema>,
    prefix: &'static str,
}

impl<'a> SchemaResolver<'a> {
    /// Creates a resolver for `container` using the family's pointer prefix.
    pub fn new(container: &'a Map<Schema>, family: SpecFamily) -> Self {
        Self {
            container,
            prefix: family.schema_ref_prefix(),
        }
    }

    /// Follows a chain of pure whole-entry pointers to the first schema that
    /// is not one.
    ///
    /// Stops at a `$ref` with structural siblings, external pointers,
    /// pointers into sub-schemas, missing entries and alias cycles, returning
    /// the last schema reached.
    pub fn resolve(&self, schema: &'a Schema) -> &'a Schema {
        let mut current = schema;
        let mut seen: HashSet<usize> = HashSet::new();
        while current.is_pure_reference() {
            let Some(target) = current.reference.as_deref().and_then(|p| self.target(p)) else {
                break;
            };
            if !seen.insert(node_id(target)) {
                break;
            }
            current = target;
        }
        current
    }

    /// The container entry a whole-entry local pointer names.
    fn target(&self, pointer: &str) -> Option<&'a Schema> {
        let name = pointer_target(pointer, self.prefix)?;
        if pointer.len() != self.prefix.len() + escape_pointer_segment(&name).len() {
            return None;
        }
        self.container.get(&name)
    }

    fn mapping_target(&self, value: &str) -> String {
        if value.starts_with('#') {
            pointer_target(value, self.prefix).unwrap_or_else(|| value.to_string())
        } else {
            value.to_string()
        }
    }
}

fn node_id(schema: &Schema) -> usize {
    ptr::from_ref(schema) as usize
}

/// Top-level shape of a schema as seen by a shallow comparison.
#[derive(Debug, PartialEq)]
struct TopType<'a> {
    types: Option<Vec<&'a str>>,
    reference: Option<Target<'a>>,
}

/// What a `$ref` left in place after resolution points at.
#[derive(Debug, PartialEq)]
enum Target<'a> {
    Types(Option<Vec<&'a str>>),
    Unresolved(&'a str),
}

/// Compares schemas under an [`EquivalenceMode`].
///
/// # Examples
///
/// ```
/// use apijoin_core::*;
///
/// let doc = Document::openapi("3.0.3")
///     .with_schema("Address", Schema::typed("object")
///         .with_property("street", Schema::typed("string")))
///     .with_schema("Location", Schema::typed("object")
///         .with_property("street", Schema::typed("string").with_description("line 1")));
///
/// let schemas = doc.schemas(SpecFamily::Namespaced);
/// let comparator = Comparator::within(EquivalenceMode::Deep, schemas, SpecFamily::Namespaced);
/// assert!(comparator.equivalent(&schemas["Address"], &schemas["Location"]));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Comparator<'a> {
    mode: EquivalenceMode,
    left: SchemaResolver<'a>,
    right: SchemaResolver<'a>,
}

impl<'a> Comparator<'a> {
    /// Compares left-side schemas resolved against `left` with right-side
    /// schemas resolved against `right`.
    pub fn new(mode: EquivalenceMode, left: SchemaResolver<'a>, right: SchemaResolver<'a>) -> Self {
        Self { mode, left, right }
    }

    /// Compares schemas that both live in (or point into) `container`.
    pub fn within(mode: EquivalenceMode, container: &'a Map<Schema>, family: SpecFamily) -> Self {
        let resolver = SchemaResolver::new(container, family);
        Self::new(mode, resolver, resolver)
    }

    /// Returns `true` when the two schemas are equivalent under the mode.
    pub fn equivalent(&self, left: &'a Schema, right: &'a Schema) -> bool {
        if left.is_empty() || right.is_empty() {
            return false;
        }
        let left = self.left.resolve(left);
        let right = self.right.resolve(right);
        if left.is_empty() || right.is_empty() {
            return false;
        }
        match self.mode {
            EquivalenceMode::None => false,
            EquivalenceMode::Shallow => self.shallow_eq(left, right),
            EquivalenceMode::Deep => self.deep_eq(left, right, &mut HashSet::new()),
        }
    }

    fn shallow_eq(&self, left: &'a Schema, right: &'a Schema) -> bool {
        if top_type(&self.left, left).reference != top_type(&self.right, right).reference {
            return false;
        }
        if type_names(left) != type_names(right)
            || left.format != right.format
            || required_set(left) != required_set(right)
            || left.enum_values != right.enum_values
            || left.all_of.len() != right.all_of.len()
            || left.any_of.len() != right.any_of.len()
            || left.one_of.len() != right.one_of.len()
            || left.not.is_some() != right.not.is_some()
            || left.properties.len() != right.properties.len()
        {
            return false;
        }

        let properties_match = left.properties.iter().all(|(name, lp)| {
            right
                .properties
                .get(name)
                .is_some_and(|rp| top_type(&self.left, lp) == top_type(&self.right, rp))
        });
        if !properties_match {
            return false;
        }

        match (&left.items, &right.items) {
            (None, None) => true,
            (Some(Items::Single(l)), Some(Items::Single(r))) => {
                top_type(&self.left, l) == top_type(&self.right, r)
            }
            (Some(Items::Tuple(l)), Some(Items::Tuple(r))) => {
                l.len() == r.len()
                    && l
                        .iter()
                        .zip(r)
                        .all(|(l, r)| top_type(&self.left, l) == top_type(&self.right, r))
            }
            _ => false,
        }
    }

    fn deep_eq(
        &self,
        left: &'a Schema,
        right: &'a Schema,
        in_progress: &mut HashSet<(usize, usize)>,
    ) -> bool {
        let left = self.left.resolve(left);
        let right = self.right.resolve(right);

        // A pair already under comparison is assumed equal; recursive
        // schemas are equal when every finite unfolding is.
        let key = (node_id(left), node_id(right));
        if !in_progress.insert(key) {
            return true;
        }
        let equal = self.references_eq(left, right, in_progress)
            && self.scalars_eq(left, right)
            && self.children_eq(left, right, in_progress);
        in_progress.remove(&key);
        equal
    }

    /// A `$ref` kept after resolution has siblings beside it: both sides
    /// need one, and their targets must match as well as the siblings.
    fn references_eq(
        &self,
        left: &'a Schema,
        right: &'a Schema,
        in_progress: &mut HashSet<(usize, usize)>,
    ) -> bool {
        match (left.reference.as_deref(), right.reference.as_deref()) {
            (None, None) => true,
            (Some(l), Some(r)) => match (self.left.target(l), self.right.target(r)) {
                (Some(lt), Some(rt)) => self.deep_eq(lt, rt, in_progress),
                (None, None) => l == r,
                _ => false,
            },
            _ => false,
        }
    }

    fn scalars_eq(&self, left: &Schema, right: &Schema) -> bool {
        type_names(left) == type_names(right)
            && left.format == right.format
            && left.default == right.default
            && left.nullable == right.nullable
            && left.read_only == right.read_only
            && left.write_only == right.write_only
            && left.multiple_of == right.multiple_of
            && left.maximum == right.maximum
            && left.exclusive_maximum == right.exclusive_maximum
            && left.minimum == right.minimum
            && left.exclusive_minimum == right.exclusive_minimum
            && left.max_length == right.max_length
            && left.min_length == right.min_length
            && left.pattern == right.pattern
            && left.max_items == right.max_items
            && left.min_items == right.min_items
            && left.unique_items == right.unique_items
            && left.max_properties == right.max_properties
            && left.min_properties == right.min_properties
            && required_set(left) == required_set(right)
            && left.enum_values == right.enum_values
            && left.const_value == right.const_value
            && self.discriminators_eq(left, right)
    }

    fn discriminators_eq(&self, left: &Schema, right: &Schema) -> bool {
        match (&left.discriminator, &right.discriminator) {
            (None, None) => true,
            (Some(l), Some(r)) => {
                let targets = |resolver: &SchemaResolver<'a>, mapping: &Map<String>| {
                    mapping
                        .iter()
                        .map(|(key, value)| (key.clone(), resolver.mapping_target(value)))
                        .collect::<BTreeMap<_, _>>()
                };
                l.property_name == r.property_name
                    && targets(&self.left, &l.mapping) == targets(&self.right, &r.mapping)
            }
            _ => false,
        }
    }

    fn children_eq(
        &self,
        left: &'a Schema,
        right: &'a Schema,
        in_progress: &mut HashSet<(usize, usize)>,
    ) -> bool {
        if left.properties.len() != right.properties.len() {
            return false;
        }
        for (name, lp) in &left.properties {
            match right.properties.get(name) {
                Some(rp) if self.deep_eq(lp, rp, in_progress) => {}
                _ => return false,
            }
        }

        let items_equal = match (&left.items, &right.items) {
            (None, None) => true,
            (Some(Items::Single(l)), Some(Items::Single(r))) => self.deep_eq(l, r, in_progress),
            (Some(Items::Tuple(l)), Some(Items::Tuple(r))) => {
                self.lists_eq(l, r, in_progress)
            }
            _ => false,
        };
        if !items_equal {
            return false;
        }

        let additional_equal = match (&left.additional_properties, &right.additional_properties) {
            (None, None) => true,
            (Some(AdditionalProperties::Allowed(l)), Some(AdditionalProperties::Allowed(r))) => {
                l == r
            }
            (Some(AdditionalProperties::Schema(l)), Some(AdditionalProperties::Schema(r))) => {
                self.deep_eq(l, r, in_progress)
            }
            _ => false,
        };
        if !additional_equal {
            return false;
        }

        let not_equal = match (&left.not, &right.not) {
            (None, None) => true,
            (Some(l), Some(r)) => self.deep_eq(l, r, in_progress),
            _ => false,
        };

        not_equal
            && self.lists_eq(&left.all_of, &right.all_of, in_progress)
            && self.lists_eq(&left.any_of, &right.any_of, in_progress)
            && self.lists_eq(&left.one_of, &right.one_of, in_progress)
    }

    fn lists_eq(
        &self,
        left: &'a [Schema],
        right: &'a [Schema],
        in_progress: &mut HashSet<(usize, usize)>,
    ) -> bool {
        left.len() == right.len()
            && left
                .iter()
                .zip(right)
                .all(|(l, r)| self.deep_eq(l, r, in_progress))
    }
}

fn type_names(schema: &Schema) -> Option<Vec<&str>> {
    schema.schema_type.as_ref().map(|t| t.normalized())
}

fn required_set(schema: &Schema) -> BTreeSet<&str> {
    schema.required.iter().map(String::as_str).collect()
}

fn top_type<'a>(resolver: &SchemaResolver<'a>, schema: &'a Schema) -> TopType<'a> {
    let resolved = resolver.resolve(schema);
    let reference = resolved.reference.as_deref().map(|pointer| {
        match resolver.target(pointer) {
            Some(target) => Target::Types(type_names(resolver.resolve(target))),
            None => Target::Unresolved(pointer),
        }
    });
    TopType {
        types: type_names(resolved),
        reference,
    }
}
