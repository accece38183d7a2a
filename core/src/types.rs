//! Document model for Swagger 2.0 ("flat") and OpenAPI 3.x ("namespaced")
//! documents.
//!
//! One [`Document`] type covers both families. The family is derived from the
//! version marker and decides where schemas live: the flat family keeps them
//! in the top-level `definitions` table, the namespaced family under
//! `components.schemas`. Anything the model does not name is preserved in the
//! flattened `extensions`/`extra` maps so a document survives a join intact.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{Map, Schema, escape_pointer_segment, is_false};

/// Schema-container family of a document.
///
/// # Examples
///
/// ```
/// use apijoin_core::SpecFamily;
///
/// assert_eq!(SpecFamily::Flat.schema_ref_prefix(), "#/definitions/");
/// assert_eq!(
///     SpecFamily::Namespaced.schema_ref("Pet"),
///     "#/components/schemas/Pet"
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecFamily {
    /// Swagger 2.0: one global `definitions` table.
    Flat,
    /// OpenAPI 3.x: schemas nested in `components`.
    Namespaced,
}

impl SpecFamily {
    /// Pointer prefix used by local schema references.
    pub fn schema_ref_prefix(self) -> &'static str {
        match self {
            Self::Flat => "#/definitions/",
            Self::Namespaced => "#/components/schemas/",
        }
    }

    /// Builds the local pointer for a schema name.
    pub fn schema_ref(self, name: &str) -> String {
        format!("{}{}", self.schema_ref_prefix(), escape_pointer_segment(name))
    }

    /// Structural path of the schema container, used in diagnostics.
    pub fn schema_container_path(self) -> &'static str {
        match self {
            Self::Flat => "definitions",
            Self::Namespaced => "components.schemas",
        }
    }

    /// Pointer prefix for reusable parameters.
    pub fn parameter_ref_prefix(self) -> &'static str {
        match self {
            Self::Flat => "#/parameters/",
            Self::Namespaced => "#/components/parameters/",
        }
    }

    /// Pointer prefix for reusable responses.
    pub fn response_ref_prefix(self) -> &'static str {
        match self {
            Self::Flat => "#/responses/",
            Self::Namespaced => "#/components/responses/",
        }
    }
}

impl fmt::Display for SpecFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => write!(f, "swagger 2.0"),
            Self::Namespaced => write!(f, "openapi 3.x"),
        }
    }
}

/// HTTP methods in the canonical traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl Method {
    /// All methods, in the order operations are visited.
    pub const ALL: [Method; 8] = [
        Method::Get,
        Method::Put,
        Method::Post,
        Method::Delete,
        Method::Options,
        Method::Head,
        Method::Patch,
        Method::Trace,
    ];

    /// Lowercase method name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Put => "put",
            Self::Post => "post",
            Self::Delete => "delete",
            Self::Options => "options",
            Self::Head => "head",
            Self::Patch => "patch",
            Self::Trace => "trace",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Security requirement: scheme name to required scopes.
pub type SecurityRequirement = Map<Vec<String>>;

/// Callback: runtime expression to path item.
pub type Callback = Map<PathItem>;

/// Document metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// An OpenAPI 3.x server entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Server {
    /// Creates a server entry for `url`.
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Default::default()
        }
    }
}

/// A document-level tag.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Tag {
    /// Creates a tag with no description.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

/// A parameter, or a `$ref` to a reusable one.
///
/// Swagger 2.0 body parameters (`in: body`) carry the request schema.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "in", default, skip_serializing_if = "String::is_empty")]
    pub location: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub content: Map<MediaType>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Parameter {
    /// Creates a parameter located `location` with a schema.
    pub fn new(name: &str, location: &str, schema: Schema) -> Self {
        Self {
            name: name.to_string(),
            location: location.to_string(),
            schema: Some(schema),
            ..Default::default()
        }
    }

    /// Returns `true` for a Swagger 2.0 body parameter.
    pub fn is_body(&self) -> bool {
        self.location == "body"
    }
}

/// A media type entry of a request or response body.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl MediaType {
    /// Creates a media type entry carrying `schema`.
    pub fn with_schema(schema: Schema) -> Self {
        Self {
            schema: Some(schema),
            ..Default::default()
        }
    }
}

/// An OpenAPI 3.x request body, or a `$ref` to a reusable one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub content: Map<MediaType>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A response header, or a `$ref` to a reusable one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Header {
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A response. Swagger 2.0 uses `schema`, OpenAPI 3.x uses `content`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub content: Map<MediaType>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: Map<Header>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Response {
    /// Creates an OpenAPI 3.x response with a single JSON body schema.
    pub fn json(description: &str, schema: Schema) -> Self {
        let mut content = Map::new();
        content.insert("application/json".to_string(), MediaType::with_schema(schema));
        Self {
            description: description.to_string(),
            content,
            ..Default::default()
        }
    }

    /// Creates a Swagger 2.0 response with a body schema.
    pub fn with_schema(description: &str, schema: Schema) -> Self {
        Self {
            description: description.to_string(),
            schema: Some(schema),
            ..Default::default()
        }
    }
}

/// A single API operation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub responses: Map<Response>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub callbacks: Map<Callback>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<SecurityRequirement>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Operation {
    /// Sets the operation identifier.
    pub fn with_operation_id(mut self, operation_id: &str) -> Self {
        self.operation_id = Some(operation_id.to_string());
        self
    }

    /// Adds a tag.
    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    /// Adds a response for a status code.
    pub fn with_response(mut self, status: &str, response: Response) -> Self {
        self.responses.insert(status.to_string(), response);
        self
    }

    /// Adds a parameter.
    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Sets an OpenAPI 3.x JSON request body.
    pub fn with_json_body(mut self, schema: Schema) -> Self {
        let mut content = Map::new();
        content.insert("application/json".to_string(), MediaType::with_schema(schema));
        self.request_body = Some(RequestBody {
            content,
            ..Default::default()
        });
        self
    }
}

/// Operations available on one path.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Operation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PathItem {
    /// Returns the operation slot for `method`.
    pub fn operation(&self, method: Method) -> Option<&Operation> {
        match method {
            Method::Get => self.get.as_ref(),
            Method::Put => self.put.as_ref(),
            Method::Post => self.post.as_ref(),
            Method::Delete => self.delete.as_ref(),
            Method::Options => self.options.as_ref(),
            Method::Head => self.head.as_ref(),
            Method::Patch => self.patch.as_ref(),
            Method::Trace => self.trace.as_ref(),
        }
    }

    /// Sets the operation for `method`, builder style.
    pub fn with_operation(mut self, method: Method, operation: Operation) -> Self {
        let slot = match method {
            Method::Get => &mut self.get,
            Method::Put => &mut self.put,
            Method::Post => &mut self.post,
            Method::Delete => &mut self.delete,
            Method::Options => &mut self.options,
            Method::Head => &mut self.head,
            Method::Patch => &mut self.patch,
            Method::Trace => &mut self.trace,
        };
        *slot = Some(operation);
        self
    }

    /// Present operations in canonical method order.
    pub fn operations(&self) -> impl Iterator<Item = (Method, &Operation)> {
        Method::ALL
            .into_iter()
            .filter_map(|method| self.operation(method).map(|op| (method, op)))
    }

    /// Mutable access to every present operation.
    pub fn operations_mut(&mut self) -> Vec<&mut Operation> {
        [
            &mut self.get,
            &mut self.put,
            &mut self.post,
            &mut self.delete,
            &mut self.options,
            &mut self.head,
            &mut self.patch,
            &mut self.trace,
        ]
        .into_iter()
        .filter_map(Option::as_mut)
        .collect()
    }
}

/// Reusable OpenAPI 3.x components.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub schemas: Map<Schema>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub responses: Map<Response>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: Map<Parameter>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub examples: Map<Value>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub request_bodies: Map<RequestBody>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: Map<Header>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub security_schemes: Map<Value>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub links: Map<Value>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub callbacks: Map<Callback>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub path_items: Map<PathItem>,
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

impl Components {
    /// Returns `true` when no component table holds an entry.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty() && self.other_count() == 0 && self.extensions.is_empty()
    }

    /// Number of entries across all non-schema tables.
    pub fn other_count(&self) -> usize {
        self.responses.len()
            + self.parameters.len()
            + self.examples.len()
            + self.request_bodies.len()
            + self.headers.len()
            + self.security_schemes.len()
            + self.links.len()
            + self.callbacks.len()
            + self.path_items.len()
    }
}

/// A Swagger 2.0 or OpenAPI 3.x document.
///
/// # Examples
///
/// ```
/// use apijoin_core::{Document, SpecFamily};
///
/// let flat: Document = serde_json::from_str(
///     r#"{"swagger":"2.0","info":{"title":"a","version":"1"},"paths":{}}"#,
/// ).unwrap();
/// assert_eq!(flat.family(), Some(SpecFamily::Flat));
///
/// let namespaced = Document::openapi("3.0.3");
/// assert_eq!(namespaced.family(), Some(SpecFamily::Namespaced));
/// assert_eq!(namespaced.version(), "3.0.3");
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swagger: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openapi: Option<String>,
    #[serde(default)]
    pub info: Info,

    // Swagger 2.0 connection details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schemes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub consumes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub produces: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    #[serde(default)]
    pub paths: Map<PathItem>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub webhooks: Map<PathItem>,

    // Swagger 2.0 reusable definitions.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub definitions: Map<Schema>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: Map<Parameter>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub responses: Map<Response>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub security_definitions: Map<Value>,

    #[serde(default, skip_serializing_if = "Components::is_empty")]
    pub components: Components,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<SecurityRequirement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

impl Document {
    /// Creates an empty Swagger 2.0 document.
    pub fn swagger() -> Self {
        Self {
            swagger: Some("2.0".to_string()),
            ..Default::default()
        }
    }

    /// Creates an empty OpenAPI 3.x document with the given version.
    pub fn openapi(version: &str) -> Self {
        Self {
            openapi: Some(version.to_string()),
            ..Default::default()
        }
    }

    /// Derives the schema-container family from the version marker.
    ///
    /// Returns `None` when the marker is missing, ambiguous (both present),
    /// or names an unknown major version.
    pub fn family(&self) -> Option<SpecFamily> {
        match (self.swagger.as_deref(), self.openapi.as_deref()) {
            (Some(version), None) if version.starts_with('2') => Some(SpecFamily::Flat),
            (None, Some(version)) if version.starts_with('3') => Some(SpecFamily::Namespaced),
            _ => None,
        }
    }

    /// The version string (`"2.0"`, `"3.0.3"`, ...), or `""` when absent.
    pub fn version(&self) -> &str {
        self.swagger
            .as_deref()
            .or(self.openapi.as_deref())
            .unwrap_or_default()
    }

    /// The schema container for `family`.
    pub fn schemas(&self, family: SpecFamily) -> &Map<Schema> {
        match family {
            SpecFamily::Flat => &self.definitions,
            SpecFamily::Namespaced => &self.components.schemas,
        }
    }

    /// Mutable schema container for `family`.
    pub fn schemas_mut(&mut self, family: SpecFamily) -> &mut Map<Schema> {
        match family {
            SpecFamily::Flat => &mut self.definitions,
            SpecFamily::Namespaced => &mut self.components.schemas,
        }
    }

    /// Adds a path item, builder style.
    pub fn with_path(mut self, path: &str, item: PathItem) -> Self {
        self.paths.insert(path.to_string(), item);
        self
    }

    /// Adds a schema to the container matching the document's family.
    ///
    /// Documents without a recognizable version marker are treated as
    /// namespaced.
    pub fn with_schema(mut self, name: &str, schema: Schema) -> Self {
        let family = self.family().unwrap_or(SpecFamily::Namespaced);
        self.schemas_mut(family).insert(name.to_string(), schema);
        self
    }

    /// Number of operations across all paths.
    pub fn operation_count(&self) -> usize {
        self.paths
            .values()
            .map(|item| item.operations().count())
            .sum()
    }

    /// Number of non-schema reusable components for `family`.
    pub fn other_component_count(&self, family: SpecFamily) -> usize {
        match family {
            SpecFamily::Flat => {
                self.parameters.len() + self.responses.len() + self.security_definitions.len()
            }
            SpecFamily::Namespaced => self.components.other_count(),
        }
    }
}
