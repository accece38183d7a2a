//! Field values a rename template is evaluated against.

use crate::config::PrimaryOperationPolicy;
use crate::graph::Lineage;
use crate::select::select_primary;

use super::functions::{Value, path_resource};
use super::parse::Field;

/// Values a rename template can read.
///
/// Every field is always present. Operation and aggregate fields stay empty
/// (or zero) until [`with_lineage`](Self::with_lineage) finds operations.
///
/// # Examples
///
/// ```
/// use apijoin_core::RenameContext;
///
/// let context = RenameContext::new("User", "orders", 1);
/// assert_eq!(context.name, "User");
/// assert!(!context.has_operation_context());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameContext {
    pub name: String,
    pub source: String,
    /// Position of the source document in the join input.
    pub index: usize,

    pub path: String,
    /// Uppercase HTTP method.
    pub method: String,
    pub operation_id: String,
    pub tags: Vec<String>,
    pub usage_type: String,
    pub status_code: String,
    pub param_name: String,
    pub media_type: String,
    pub primary_resource: String,

    pub all_paths: Vec<String>,
    pub all_methods: Vec<String>,
    pub all_operation_ids: Vec<String>,
    pub all_tags: Vec<String>,
    pub ref_count: usize,
    pub is_shared: bool,
}

impl RenameContext {
    /// Creates a context with only the core identity fields set.
    pub fn new(name: &str, source: &str, index: usize) -> Self {
        Self {
            name: name.to_string(),
            source: source.to_string(),
            index,
            ..Default::default()
        }
    }

    /// Fills operation fields from the primary operation of `lineage` and
    /// aggregate fields from all of it. An empty lineage leaves the context
    /// unchanged.
    pub fn with_lineage(mut self, lineage: &Lineage, policy: PrimaryOperationPolicy) -> Self {
        let Some(primary) = select_primary(lineage, policy) else {
            return self;
        };

        let operation = &primary.operation;
        self.path = operation.path.clone();
        self.method = operation.method.as_str().to_uppercase();
        self.operation_id = operation.operation_id.clone().unwrap_or_default();
        self.tags = operation.tags.clone();
        self.usage_type = primary.usage.to_string();
        self.status_code = primary.status_code.clone().unwrap_or_default();
        self.param_name = primary.param_name.clone().unwrap_or_default();
        self.media_type = primary.media_type.clone().unwrap_or_default();
        self.primary_resource = path_resource(&operation.path);

        for entry in &lineage.operations {
            let operation = &entry.operation;
            push_unique(&mut self.all_paths, &operation.path);
            push_unique(&mut self.all_methods, &operation.method.as_str().to_uppercase());
            if let Some(id) = &operation.operation_id {
                push_unique(&mut self.all_operation_ids, id);
            }
            for tag in &operation.tags {
                push_unique(&mut self.all_tags, tag);
            }
        }
        self.ref_count = lineage.len();
        self.is_shared = lineage.len() > 1;
        self
    }

    /// Returns `true` once a primary operation has been applied.
    pub fn has_operation_context(&self) -> bool {
        self.ref_count > 0
    }

    pub(crate) fn field(&self, field: Field) -> Value {
        match field {
            Field::Name => Value::Str(self.name.clone()),
            Field::Source => Value::Str(self.source.clone()),
            Field::Index => Value::Int(i64::try_from(self.index).unwrap_or(i64::MAX)),
            Field::Path => Value::Str(self.path.clone()),
            Field::Method => Value::Str(self.method.clone()),
            Field::OperationId => Value::Str(self.operation_id.clone()),
            Field::Tags => Value::List(self.tags.clone()),
            Field::UsageType => Value::Str(self.usage_type.clone()),
            Field::StatusCode => Value::Str(self.status_code.clone()),
            Field::ParamName => Value::Str(self.param_name.clone()),
            Field::MediaType => Value::Str(self.media_type.clone()),
            Field::PrimaryResource => Value::Str(self.primary_resource.clone()),
            Field::AllPaths => Value::List(self.all_paths.clone()),
            Field::AllMethods => Value::List(self.all_methods.clone()),
            Field::AllOperationIds => Value::List(self.all_operation_ids.clone()),
            Field::AllTags => Value::List(self.all_tags.clone()),
            Field::RefCount => Value::Int(i64::try_from(self.ref_count).unwrap_or(i64::MAX)),
            Field::IsShared => Value::Bool(self.is_shared),
        }
    }
}

fn push_unique(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|existing| existing == value) {
        values.push(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{LineageOperation, OperationRef, UsageType};
    use crate::types::Method;

    fn op(path: &str, method: Method, id: Option<&str>, tags: &[&str], order: usize) -> LineageOperation {
        LineageOperation {
            operation: OperationRef {
                path: path.to_string(),
                method,
                operation_id: id.map(str::to_string),
                tags: tags.iter().map(|tag| tag.to_string()).collect(),
                order,
            },
            usage: UsageType::Response,
            status_code: Some("200".to_string()),
            param_name: None,
            media_type: Some("application/json".to_string()),
        }
    }

    fn lineage() -> Lineage {
        Lineage {
            operations: vec![
                op("/users/{id}", Method::Get, Some("getUser"), &["users"], 0),
                op("/users/{id}", Method::Put, None, &["users", "admin"], 1),
                op("/teams", Method::Get, Some("listTeams"), &[], 2),
            ],
        }
    }

    #[test]
    fn test_lineage_fills_operation_and_aggregate_fields() {
        let context = RenameContext::new("User", "users", 0)
            .with_lineage(&lineage(), PrimaryOperationPolicy::FirstEncountered);

        assert!(context.has_operation_context());
        assert_eq!(context.path, "/users/{id}");
        assert_eq!(context.method, "GET");
        assert_eq!(context.operation_id, "getUser");
        assert_eq!(context.usage_type, "response");
        assert_eq!(context.status_code, "200");
        assert_eq!(context.media_type, "application/json");
        assert_eq!(context.primary_resource, "users");
        assert_eq!(context.all_paths, vec!["/users/{id}", "/teams"]);
        assert_eq!(context.all_methods, vec!["GET", "PUT"]);
        assert_eq!(context.all_operation_ids, vec!["getUser", "listTeams"]);
        assert_eq!(context.all_tags, vec!["users", "admin"]);
        assert_eq!(context.ref_count, 3);
        assert!(context.is_shared);
    }

    #[test]
    fn test_empty_lineage_keeps_core_fields_only() {
        let context = RenameContext::new("User", "users", 2)
            .with_lineage(&Lineage::default(), PrimaryOperationPolicy::MostSpecific);
        assert_eq!(context, RenameContext::new("User", "users", 2));
        assert_eq!(context.field(Field::Path), Value::Str(String::new()));
        assert_eq!(context.field(Field::Tags), Value::List(Vec::new()));
        assert_eq!(context.field(Field::Index), Value::Int(2));
    }
}
