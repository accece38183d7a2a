//! Reference lineage graph for one document.
//!
//! [`ReferenceGraph::build`] records two kinds of edges:
//!
//! - operation → schema, tagged with how the operation uses the schema
//!   ([`UsageType`]) and where (status code, parameter name, media type);
//! - schema → schema, through any pointer-bearing field of a container entry.
//!
//! The lineage of a schema is every operation reachable by walking those
//! edges backwards. It is computed on demand and cached per schema, since a
//! join asks for the same schema's lineage repeatedly.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

use tracing::debug;

use crate::schema::{Map, Schema, collect_references, pointer_target};
use crate::types::{
    Callback, Document, Header, MediaType, Method, Operation, Parameter, PathItem, RequestBody,
    Response, SpecFamily,
};

/// How an operation uses a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsageType {
    Request,
    Response,
    Parameter,
    Header,
    Callback,
}

impl fmt::Display for UsageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => write!(f, "request"),
            Self::Response => write!(f, "response"),
            Self::Parameter => write!(f, "parameter"),
            Self::Header => write!(f, "header"),
            Self::Callback => write!(f, "callback"),
        }
    }
}

/// Identity of an operation discovered during traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRef {
    /// Path, `webhook:<name>`, or `<parent>-><callback>:<expression>`.
    pub path: String,
    pub method: Method,
    pub operation_id: Option<String>,
    pub tags: Vec<String>,
    /// Position in document traversal order.
    pub order: usize,
}

/// One operation of a lineage, with the usage that linked it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineageOperation {
    pub operation: OperationRef,
    pub usage: UsageType,
    pub status_code: Option<String>,
    pub param_name: Option<String>,
    pub media_type: Option<String>,
}

/// Operations that transitively reference a schema, in traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lineage {
    pub operations: Vec<LineageOperation>,
}

impl Lineage {
    /// Returns `true` when no operation references the schema.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Number of operations in the lineage.
    pub fn len(&self) -> usize {
        self.operations.len()
    }
}

#[derive(Debug, Clone)]
struct DirectUse {
    operation: usize,
    usage: UsageType,
    status_code: Option<String>,
    param_name: Option<String>,
    media_type: Option<String>,
}

/// Where in an operation a schema was found.
#[derive(Debug, Clone, Default)]
struct UseSite {
    status_code: Option<String>,
    param_name: Option<String>,
    media_type: Option<String>,
}

/// Operation → schema and schema → schema edges of one document.
///
/// Schema nodes are container entries, identified by their key in the
/// document's schema container.
///
/// # Examples
///
/// ```
/// use apijoin_core::*;
///
/// let doc = Document::openapi("3.0.3")
///     .with_path("/users", PathItem::default().with_operation(
///         Method::Get,
///         Operation::default().with_response("200", Response::json(
///             "ok",
///             Schema::reference("#/components/schemas/UserList"),
///         )),
///     ))
///     .with_schema("UserList", Schema::typed("array")
///         .with_items(Schema::reference("#/components/schemas/User")))
///     .with_schema("User", Schema::typed("object"));
///
/// let mut graph = ReferenceGraph::build(&doc, SpecFamily::Namespaced);
/// let lineage = graph.lineage("User");
/// assert_eq!(lineage.len(), 1);
/// assert_eq!(lineage.operations[0].operation.path, "/users");
/// assert_eq!(lineage.operations[0].usage, UsageType::Response);
/// ```
#[derive(Debug)]
pub struct ReferenceGraph {
    operations: Vec<OperationRef>,
    direct: HashMap<String, Vec<DirectUse>>,
    references: HashMap<String, BTreeSet<String>>,
    referenced_by: HashMap<String, BTreeSet<String>>,
    cache: HashMap<String, Lineage>,
}

impl ReferenceGraph {
    /// Traverses paths, webhooks and callbacks of `document`, then every
    /// schema container entry.
    pub fn build(document: &Document, family: SpecFamily) -> Self {
        let mut builder = GraphBuilder {
            document,
            family,
            prefix: family.schema_ref_prefix(),
            operations: Vec::new(),
            direct: HashMap::new(),
        };

        for (path, item) in &document.paths {
            builder.visit_path_item(path, item, None);
        }
        for (name, item) in &document.webhooks {
            builder.visit_path_item(&format!("webhook:{name}"), item, None);
        }

        let GraphBuilder {
            operations, direct, ..
        } = builder;

        let mut references: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut referenced_by: HashMap<String, BTreeSet<String>> = HashMap::new();
        for (name, schema) in document.schemas(family) {
            let mut targets = Vec::new();
            collect_references(schema, family.schema_ref_prefix(), &mut targets);
            for target in targets {
                referenced_by
                    .entry(target.clone())
                    .or_default()
                    .insert(name.clone());
                references.entry(name.clone()).or_default().insert(target);
            }
        }

        debug!(
            operations = operations.len(),
            schemas_used_by_operations = direct.len(),
            schema_edges = references.values().map(BTreeSet::len).sum::<usize>(),
            "Built reference graph"
        );

        Self {
            operations,
            direct,
            references,
            referenced_by,
            cache: HashMap::new(),
        }
    }

    /// Operations in traversal order.
    pub fn operations(&self) -> &[OperationRef] {
        &self.operations
    }

    /// Container entries `schema` points to directly.
    pub fn references_of(&self, schema: &str) -> impl Iterator<Item = &str> {
        self.references
            .get(schema)
            .into_iter()
            .flat_map(|targets| targets.iter().map(String::as_str))
    }

    /// Container entries that point directly to `schema`.
    pub fn referenced_by(&self, schema: &str) -> impl Iterator<Item = &str> {
        self.referenced_by
            .get(schema)
            .into_iter()
            .flat_map(|parents| parents.iter().map(String::as_str))
    }

    /// Returns `true` when the lineage of `schema` is already cached.
    pub fn is_cached(&self, schema: &str) -> bool {
        self.cache.contains_key(schema)
    }

    /// Operations that transitively reference `schema`.
    ///
    /// Walks schema → schema edges backwards from `schema` with a visited
    /// set, collecting every operation with a direct edge to a visited
    /// schema. Each operation appears once, carrying the usage found closest
    /// to `schema`. The result is ordered by traversal order and cached.
    pub fn lineage(&mut self, schema: &str) -> &Lineage {
        if !self.cache.contains_key(schema) {
            let lineage = self.compute_lineage(schema);
            debug!(schema = %schema, operations = lineage.len(), "Computed schema lineage");
            self.cache.insert(schema.to_string(), lineage);
        }
        &self.cache[schema]
    }

    fn compute_lineage(&self, schema: &str) -> Lineage {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        let mut found: HashMap<usize, &DirectUse> = HashMap::new();

        visited.insert(schema);
        queue.push_back(schema);
        while let Some(current) = queue.pop_front() {
            for direct in self.direct.get(current).into_iter().flatten() {
                found.entry(direct.operation).or_insert(direct);
            }
            for parent in self.referenced_by(current) {
                if visited.insert(parent) {
                    queue.push_back(parent);
                }
            }
        }

        let mut operations: Vec<LineageOperation> = found
            .into_values()
            .map(|direct| LineageOperation {
                operation: self.operations[direct.operation].clone(),
                usage: direct.usage,
                status_code: direct.status_code.clone(),
                param_name: direct.param_name.clone(),
                media_type: direct.media_type.clone(),
            })
            .collect();
        operations.sort_by_key(|entry| entry.operation.order);
        Lineage { operations }
    }
}

struct GraphBuilder<'d> {
    document: &'d Document,
    family: SpecFamily,
    prefix: &'static str,
    operations: Vec<OperationRef>,
    direct: HashMap<String, Vec<DirectUse>>,
}

impl<'d> GraphBuilder<'d> {
    /// `forced` overrides the usage of every edge found, which is how
    /// operations nested in callbacks are tagged.
    fn visit_path_item(&mut self, path: &str, item: &'d PathItem, forced: Option<UsageType>) {
        for (method, operation) in item.operations() {
            let index = self.operations.len();
            self.operations.push(OperationRef {
                path: path.to_string(),
                method,
                operation_id: operation.operation_id.clone().filter(|id| !id.is_empty()),
                tags: operation.tags.clone(),
                order: index,
            });
            for parameter in &item.parameters {
                self.visit_parameter(index, parameter, forced);
            }
            self.visit_operation(index, operation, forced);

            for (callback_name, callback) in &operation.callbacks {
                self.visit_callback(path, callback_name, callback);
            }
        }
    }

    fn visit_callback(&mut self, parent: &str, name: &str, callback: &'d Callback) {
        for (expression, item) in callback {
            let path = format!("{parent}->{name}:{expression}");
            self.visit_path_item(&path, item, Some(UsageType::Callback));
        }
    }

    fn visit_operation(&mut self, index: usize, operation: &'d Operation, forced: Option<UsageType>) {
        for parameter in &operation.parameters {
            self.visit_parameter(index, parameter, forced);
        }

        if let Some(body) = &operation.request_body {
            let body = self.resolve_request_body(body);
            self.visit_content(
                index,
                forced.unwrap_or(UsageType::Request),
                &body.content,
                UseSite::default(),
            );
        }

        for (status, response) in &operation.responses {
            let response = self.resolve_response(response);
            let site = UseSite {
                status_code: Some(status.clone()),
                ..Default::default()
            };
            let usage = forced.unwrap_or(UsageType::Response);
            if let Some(schema) = &response.schema {
                self.record(index, usage, schema, site.clone());
            }
            self.visit_content(index, usage, &response.content, site.clone());
            for (header_name, header) in &response.headers {
                let header = self.resolve_header(header);
                if let Some(schema) = &header.schema {
                    let site = UseSite {
                        param_name: Some(header_name.clone()),
                        ..site.clone()
                    };
                    self.record(index, forced.unwrap_or(UsageType::Header), schema, site);
                }
            }
        }
    }

    fn visit_parameter(&mut self, index: usize, parameter: &'d Parameter, forced: Option<UsageType>) {
        let parameter = self.resolve_parameter(parameter);
        let usage = if parameter.is_body() {
            UsageType::Request
        } else {
            UsageType::Parameter
        };
        let usage = forced.unwrap_or(usage);
        let site = UseSite {
            param_name: Some(parameter.name.clone()).filter(|name| !name.is_empty()),
            ..Default::default()
        };
        if let Some(schema) = &parameter.schema {
            self.record(index, usage, schema, site.clone());
        }
        self.visit_content(index, usage, &parameter.content, site);
    }

    fn visit_content(
        &mut self,
        index: usize,
        usage: UsageType,
        content: &'d Map<MediaType>,
        site: UseSite,
    ) {
        for (media_type, entry) in content {
            if let Some(schema) = &entry.schema {
                let site = UseSite {
                    media_type: Some(media_type.clone()),
                    ..site.clone()
                };
                self.record(index, usage, schema, site);
            }
        }
    }

    fn record(&mut self, index: usize, usage: UsageType, schema: &Schema, site: UseSite) {
        let mut targets = Vec::new();
        collect_references(schema, self.prefix, &mut targets);
        for target in targets {
            let uses = self.direct.entry(target).or_default();
            if uses.iter().any(|existing| existing.operation == index) {
                continue;
            }
            uses.push(DirectUse {
                operation: index,
                usage,
                status_code: site.status_code.clone(),
                param_name: site.param_name.clone(),
                media_type: site.media_type.clone(),
            });
        }
    }

    fn resolve_parameter(&self, parameter: &'d Parameter) -> &'d Parameter {
        let table = match self.family {
            SpecFamily::Flat => &self.document.parameters,
            SpecFamily::Namespaced => &self.document.components.parameters,
        };
        follow(parameter, table, self.family.parameter_ref_prefix(), |p| {
            p.reference.as_deref()
        })
    }

    fn resolve_response(&self, response: &'d Response) -> &'d Response {
        let table = match self.family {
            SpecFamily::Flat => &self.document.responses,
            SpecFamily::Namespaced => &self.document.components.responses,
        };
        follow(response, table, self.family.response_ref_prefix(), |r| {
            r.reference.as_deref()
        })
    }

    fn resolve_request_body(&self, body: &'d RequestBody) -> &'d RequestBody {
        follow(
            body,
            &self.document.components.request_bodies,
            "#/components/requestBodies/",
            |b| b.reference.as_deref(),
        )
    }

    fn resolve_header(&self, header: &'d Header) -> &'d Header {
        follow(
            header,
            &self.document.components.headers,
            "#/components/headers/",
            |h| h.reference.as_deref(),
        )
    }
}

/// Follows `$ref` chains between reusable components of one table.
fn follow<'d, T>(
    start: &'d T,
    table: &'d Map<T>,
    prefix: &str,
    reference: impl Fn(&T) -> Option<&str>,
) -> &'d T {
    let mut current = start;
    let mut seen: HashSet<String> = HashSet::new();
    while let Some(pointer) = reference(current) {
        let Some(name) = pointer_target(pointer, prefix) else {
            break;
        };
        if !seen.insert(name.clone()) {
            break;
        }
        match table.get(&name) {
            Some(next) => current = next,
            None => break,
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema_ref(name: &str) -> Schema {
        Schema::reference(format!("#/components/schemas/{name}"))
    }

    fn sample() -> Document {
        Document::openapi("3.0.3")
            .with_path(
                "/orders",
                PathItem::default()
                    .with_operation(
                        Method::Post,
                        Operation::default()
                            .with_operation_id("createOrder")
                            .with_json_body(schema_ref("Order")),
                    )
                    .with_operation(
                        Method::Get,
                        Operation::default()
                            .with_tag("orders")
                            .with_response("200", Response::json("ok", Schema::typed("array").with_items(schema_ref("Order")))),
                    ),
            )
            .with_path(
                "/shipping",
                PathItem::default().with_operation(
                    Method::Get,
                    Operation::default().with_parameter(Parameter::new(
                        "address",
                        "query",
                        schema_ref("Address"),
                    )),
                ),
            )
            .with_schema(
                "Order",
                Schema::typed("object").with_property("shipTo", schema_ref("Address")),
            )
            .with_schema("Address", Schema::typed("object"))
            .with_schema("Orphan", Schema::typed("string"))
    }

    #[test]
    fn test_operations_are_numbered_in_traversal_order() {
        let graph = ReferenceGraph::build(&sample(), SpecFamily::Namespaced);
        let order: Vec<(String, Method)> = graph
            .operations()
            .iter()
            .map(|op| (op.path.clone(), op.method))
            .collect();
        assert_eq!(
            order,
            vec![
                ("/orders".to_string(), Method::Get),
                ("/orders".to_string(), Method::Post),
                ("/shipping".to_string(), Method::Get),
            ]
        );
    }

    #[test]
    fn test_lineage_walks_through_intermediate_schemas() {
        let mut graph = ReferenceGraph::build(&sample(), SpecFamily::Namespaced);
        let lineage = graph.lineage("Address").clone();
        let ops: Vec<(&str, Method, UsageType)> = lineage
            .operations
            .iter()
            .map(|entry| (entry.operation.path.as_str(), entry.operation.method, entry.usage))
            .collect();
        assert_eq!(
            ops,
            vec![
                ("/orders", Method::Get, UsageType::Response),
                ("/orders", Method::Post, UsageType::Request),
                ("/shipping", Method::Get, UsageType::Parameter),
            ]
        );
        assert_eq!(lineage.operations[2].param_name.as_deref(), Some("address"));
        assert_eq!(lineage.operations[0].status_code.as_deref(), Some("200"));
        assert_eq!(
            lineage.operations[1].media_type.as_deref(),
            Some("application/json")
        );
    }

    #[test]
    fn test_lineage_is_cached() {
        let mut graph = ReferenceGraph::build(&sample(), SpecFamily::Namespaced);
        assert!(!graph.is_cached("Order"));
        let first = graph.lineage("Order").clone();
        assert!(graph.is_cached("Order"));
        assert_eq!(graph.lineage("Order"), &first);
    }

    #[test]
    fn test_unreferenced_schema_has_empty_lineage() {
        let mut graph = ReferenceGraph::build(&sample(), SpecFamily::Namespaced);
        assert!(graph.lineage("Orphan").is_empty());
        assert!(graph.lineage("Missing").is_empty());
    }

    #[test]
    fn test_cyclic_schemas_terminate() {
        let doc = Document::openapi("3.0.3")
            .with_path(
                "/tree",
                PathItem::default().with_operation(
                    Method::Get,
                    Operation::default().with_response("200", Response::json("ok", schema_ref("Node"))),
                ),
            )
            .with_schema(
                "Node",
                Schema::typed("object")
                    .with_property("children", Schema::typed("array").with_items(schema_ref("Node")))
                    .with_property("meta", schema_ref("Meta")),
            )
            .with_schema(
                "Meta",
                Schema::typed("object").with_property("owner", schema_ref("Node")),
            );
        let mut graph = ReferenceGraph::build(&doc, SpecFamily::Namespaced);
        assert_eq!(graph.lineage("Meta").len(), 1);
        assert_eq!(graph.references_of("Node").collect::<Vec<_>>(), vec!["Meta", "Node"]);
    }

    #[test]
    fn test_swagger_body_parameter_is_request_usage() {
        let doc = Document::swagger()
            .with_path(
                "/pets",
                PathItem::default().with_operation(
                    Method::Post,
                    Operation::default()
                        .with_parameter(Parameter::new("pet", "body", Schema::reference("#/definitions/Pet")))
                        .with_response("200", Response::with_schema("ok", Schema::reference("#/definitions/Receipt"))),
                ),
            )
            .with_schema("Pet", Schema::typed("object"))
            .with_schema("Receipt", Schema::typed("object"));
        let mut graph = ReferenceGraph::build(&doc, SpecFamily::Flat);
        assert_eq!(graph.lineage("Pet").operations[0].usage, UsageType::Request);
        assert_eq!(graph.lineage("Receipt").operations[0].usage, UsageType::Response);
    }

    #[test]
    fn test_webhooks_and_callbacks_use_synthetic_paths() {
        let event = Operation::default().with_json_body(schema_ref("Event"));
        let mut callback = Callback::new();
        callback.insert(
            "{$request.body#/url}".to_string(),
            PathItem::default().with_operation(Method::Post, event.clone()),
        );
        let mut subscribe = Operation::default().with_operation_id("subscribe");
        subscribe.callbacks.insert("onEvent".to_string(), callback);

        let mut doc = Document::openapi("3.1.0")
            .with_path("/subscriptions", PathItem::default().with_operation(Method::Post, subscribe))
            .with_schema("Event", Schema::typed("object"));
        doc.webhooks.insert(
            "newEvent".to_string(),
            PathItem::default().with_operation(Method::Post, event),
        );

        let mut graph = ReferenceGraph::build(&doc, SpecFamily::Namespaced);
        let lineage = graph.lineage("Event").clone();
        let paths: Vec<(&str, UsageType)> = lineage
            .operations
            .iter()
            .map(|entry| (entry.operation.path.as_str(), entry.usage))
            .collect();
        assert_eq!(
            paths,
            vec![
                ("/subscriptions->onEvent:{$request.body#/url}", UsageType::Callback),
                ("webhook:newEvent", UsageType::Request),
            ]
        );
    }

    #[test]
    fn test_component_parameter_refs_are_followed() {
        let mut doc = Document::openapi("3.0.3")
            .with_path(
                "/search",
                PathItem::default().with_operation(
                    Method::Get,
                    Operation::default().with_parameter(Parameter {
                        reference: Some("#/components/parameters/Filter".to_string()),
                        ..Default::default()
                    }),
                ),
            )
            .with_schema("Filter", Schema::typed("object"));
        doc.components.parameters.insert(
            "Filter".to_string(),
            Parameter::new("filter", "query", schema_ref("Filter")),
        );

        let mut graph = ReferenceGraph::build(&doc, SpecFamily::Namespaced);
        let lineage = graph.lineage("Filter");
        assert_eq!(lineage.len(), 1);
        assert_eq!(lineage.operations[0].param_name.as_deref(), Some("filter"));
    }
}
