use crate::extractor::{HttpMethod, ParameterKind, RouteRecord};
use crate::schema_generator::component_name;
use crate::serializer::{serialize_json, serialize_yaml};
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

lazy_static! {
    static ref COLON_PARAM: Regex = Regex::new(r":([A-Za-z_][A-Za-z0-9_]*)\??").unwrap();
}

/// OpenAPI version emitted by the builder
pub const OPENAPI_VERSION: &str = "3.1.0";

/// Operations of one path, keyed by lower-case method.
///
/// Operations are kept as JSON values because model-written fragments may carry any
/// OpenAPI construct, not only the subset the builder itself generates.
pub type PathItem = BTreeMap<String, Value>;

/// OpenAPI document builder
///
/// Accumulates routes (manual or model-sourced) into one document. Call
/// [`finalize_document`](Self::finalize_document) after the last addition to refresh
/// component schemas and tags.
pub struct OpenApiBuilder {
    document: OpenApiDocument,
}

/// OpenAPI Info object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// API description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI Server object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI Tag object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI Components object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    /// Schema definitions
    #[serde(default)]
    pub schemas: BTreeMap<String, Value>,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    /// OpenAPI version
    pub openapi: String,
    /// API info
    pub info: Info,
    /// Servers hosting the API
    pub servers: Vec<Server>,
    /// API paths
    pub paths: BTreeMap<String, PathItem>,
    /// Components (schemas, etc.)
    pub components: Components,
    /// Tags, unique by name
    pub tags: Vec<Tag>,
}

impl OpenApiDocument {
    /// Number of paths in the document
    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    /// Number of operations across all paths
    pub fn operation_count(&self) -> usize {
        self.paths
            .values()
            .map(|item| item.keys().filter(|k| HttpMethod::parse(k).is_some()).count())
            .sum()
    }
}

/// OpenAPI Operation object, as generated from a route record
#[derive(Debug, Clone, Serialize)]
struct Operation {
    summary: String,
    description: String,
    #[serde(rename = "operationId")]
    operation_id: String,
    tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    parameters: Vec<Parameter>,
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    request_body: Option<RequestBody>,
    responses: BTreeMap<String, Response>,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, Serialize)]
struct Parameter {
    name: String,
    #[serde(rename = "in")]
    location: String,
    required: bool,
    schema: Value,
    description: String,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, Serialize)]
struct RequestBody {
    required: bool,
    content: BTreeMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, Serialize)]
struct MediaType {
    schema: Value,
}

/// OpenAPI Response object
#[derive(Debug, Clone, Serialize)]
struct Response {
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<BTreeMap<String, MediaType>>,
}

impl OpenApiBuilder {
    /// Create a new OpenApiBuilder with default info and server
    pub fn new() -> Self {
        debug!("Initializing OpenApiBuilder");
        Self {
            document: OpenApiDocument {
                openapi: OPENAPI_VERSION.to_string(),
                info: Info {
                    title: "Express API".to_string(),
                    version: "1.0.0".to_string(),
                    description: Some("API documentation generated from Express routes".to_string()),
                },
                servers: vec![Server {
                    url: "http://localhost:3000".to_string(),
                    description: Some("Development server".to_string()),
                }],
                paths: BTreeMap::new(),
                components: Components::default(),
                tags: Vec::new(),
            },
        }
    }

    /// Replace the API info wholesale
    pub fn set_info(&mut self, title: impl Into<String>, version: impl Into<String>, description: Option<String>) {
        self.document.info = Info {
            title: title.into(),
            version: version.into(),
            description,
        };
    }

    /// Replace the server list with a single entry
    pub fn set_server(&mut self, url: impl Into<String>, description: Option<String>) {
        self.document.servers = vec![Server {
            url: url.into(),
            description: Some(description.unwrap_or_else(|| "API Server".to_string())),
        }];
    }

    /// The document as accumulated so far
    pub fn document(&self) -> &OpenApiDocument {
        &self.document
    }

    /// Consume the builder, returning the document
    pub fn into_document(self) -> OpenApiDocument {
        self.document
    }

    /// Add routes to the OpenAPI document, one operation per record.
    ///
    /// Records sharing a normalized path land in the same path item; a later record for the
    /// same path and method replaces the earlier operation.
    pub fn add_routes(&mut self, routes: &[RouteRecord]) {
        let mut grouped: BTreeMap<String, Vec<&RouteRecord>> = BTreeMap::new();
        for route in routes {
            grouped.entry(normalize_path(&route.path)).or_default().push(route);
        }

        for (path, group) in grouped {
            let path_item = self.document.paths.entry(path).or_default();
            for route in group {
                debug!("Adding route: {} {}", route.method, route.path);
                match serde_json::to_value(build_operation(route)) {
                    Ok(operation) => {
                        path_item.insert(route.method.key().to_string(), operation);
                    }
                    Err(e) => warn!("Failed to build operation for {} {}: {}", route.method, route.path, e),
                }
            }
        }
    }

    /// Merge a model-written YAML fragment for one route.
    ///
    /// The fragment must be a mapping with a single path key whose value maps lower-case
    /// methods to operations. Its entries are shallow-assigned into the path item and any new
    /// operation tags are registered. A fragment that does not parse, has another shape, or
    /// does not describe this route's method falls back to [`add_routes`](Self::add_routes).
    pub fn add_route_with_ai_doc(&mut self, route: &RouteRecord, raw_yaml: &str) {
        let Some((path, operations)) = parse_fragment(raw_yaml) else {
            warn!(
                "AI documentation for {} {} is not a single-path fragment; using generated operation",
                route.method, route.path
            );
            self.add_routes(std::slice::from_ref(route));
            return;
        };

        debug!("Merging AI documentation for {} {}", route.method, path);
        let mut new_tags = Vec::new();
        let path_item = self.document.paths.entry(path).or_default();
        for (key, value) in operations {
            if HttpMethod::parse(&key).is_some() {
                collect_tags(&value, &mut new_tags);
            }
            path_item.insert(key, value);
        }
        for tag in new_tags {
            self.add_tag(&tag, Some(format!("{} endpoints", tag)));
        }

        let covered = self
            .document
            .paths
            .get(&normalize_path(&route.path))
            .and_then(|item| item.get(route.method.key()))
            .map(Value::is_object)
            .unwrap_or(false);
        if !covered {
            warn!(
                "AI documentation did not describe {} {}; adding generated operation",
                route.method, route.path
            );
            self.add_routes(std::slice::from_ref(route));
        }
    }

    /// Register a tag unless one with the same name exists
    fn add_tag(&mut self, name: &str, description: Option<String>) {
        if !self.document.tags.iter().any(|t| t.name == name) {
            self.document.tags.push(Tag {
                name: name.to_string(),
                description,
            });
        }
    }

    /// Lift recognisable response schemas into `components.schemas`.
    ///
    /// Only JSON response schemas of object type whose property set matches a naming rule are
    /// extracted; the first schema seen under a name wins. Inline schemas are left in place.
    pub fn extract_schemas_to_components(&mut self) {
        let mut found: Vec<(&'static str, Value)> = Vec::new();
        for path_item in self.document.paths.values() {
            for operation in path_item.values() {
                let Some(responses) = operation.get("responses").and_then(Value::as_object) else {
                    continue;
                };
                for response in responses.values() {
                    let schema = response
                        .get("content")
                        .and_then(|c| c.get("application/json"))
                        .and_then(|m| m.get("schema"));
                    if let Some(schema) = schema {
                        if let Some(name) = component_name(schema) {
                            found.push((name, schema.clone()));
                        }
                    }
                }
            }
        }

        for (name, schema) in found {
            if !self.document.components.schemas.contains_key(name) {
                debug!("Extracted component schema: {}", name);
                self.document.components.schemas.insert(name.to_string(), schema);
            }
        }
    }

    /// Extract component schemas and guarantee at least one tag.
    ///
    /// Idempotent; call again after further additions.
    pub fn finalize_document(&mut self) {
        self.extract_schemas_to_components();
        if self.document.tags.is_empty() {
            self.add_tag("Default", Some("API endpoints".to_string()));
        }
    }

    /// Serialize the document to YAML
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        serialize_yaml(&self.document)
    }

    /// Serialize the document to 2-space indented JSON
    pub fn to_json(&self) -> anyhow::Result<String> {
        serialize_json(&self.document)
    }
}

impl Default for OpenApiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert Express colon parameters to OpenAPI brace form (`/users/:id?` -> `/users/{id}`)
pub fn normalize_path(path: &str) -> String {
    COLON_PARAM.replace_all(path, "{$1}").into_owned()
}

/// Capitalize the first character of a segment
fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// First non-empty path segment, capitalized, with any leading `:` dropped
fn resource_name(path: &str) -> String {
    path.split('/')
        .find(|s| !s.is_empty())
        .map(|s| capitalize(s.trim_start_matches(':').trim_end_matches('?')))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Root".to_string())
}

/// Capitalized first non-parameter segment, or `Default`
fn tag_name(path: &str) -> String {
    path.split('/')
        .find(|s| !s.is_empty() && !s.starts_with(':') && !s.starts_with('{'))
        .map(capitalize)
        .unwrap_or_else(|| "Default".to_string())
}

fn verb(method: HttpMethod) -> &'static str {
    match method {
        HttpMethod::Get => "Get",
        HttpMethod::Post => "Create",
        HttpMethod::Put | HttpMethod::Patch => "Update",
        HttpMethod::Delete => "Delete",
        HttpMethod::Options => "Options",
        HttpMethod::Head => "Head",
    }
}

/// Handler name when it is an identifier, else `<method><Resource>[ById]`
fn operation_id(route: &RouteRecord) -> String {
    if route.has_named_handler() {
        return route.handler_name.clone();
    }
    let by_id = if route.path.contains(':') { "ById" } else { "" };
    format!("{}{}{}", route.method.key(), resource_name(&route.path), by_id)
}

fn build_operation(route: &RouteRecord) -> Operation {
    let resource = resource_name(&route.path);

    let parameters = route
        .parameters
        .iter()
        .filter(|p| p.kind != ParameterKind::Body)
        .map(|p| Parameter {
            name: p.name.clone(),
            location: p.kind.as_str().to_string(),
            required: p.required,
            schema: json!({ "type": p.data_type }),
            description: format!("{} parameter", p.name),
        })
        .collect();

    let body_fields: Vec<_> = route.parameters_of(ParameterKind::Body).collect();
    let request_body = if route.method.accepts_body() && !body_fields.is_empty() {
        let mut properties = Map::new();
        for field in &body_fields {
            properties.insert(field.name.clone(), json!({ "type": field.data_type }));
        }
        let required: Vec<&str> = body_fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect();
        let mut schema = json!({ "type": "object", "properties": properties });
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        Some(RequestBody {
            required: !required.is_empty(),
            content: BTreeMap::from([("application/json".to_string(), MediaType { schema })]),
        })
    } else {
        None
    };

    let mut responses = BTreeMap::new();
    for response in &route.responses {
        let content = if response.content_type.is_empty() {
            None
        } else {
            let schema = response
                .schema
                .as_ref()
                .map(|s| s.to_json())
                .unwrap_or_else(default_response_schema);
            Some(BTreeMap::from([(
                response.content_type.clone(),
                MediaType { schema },
            )]))
        };
        responses
            .entry(response.status_code.to_string())
            .or_insert(Response {
                description: response.description.clone(),
                content,
            });
    }
    responses.entry("200".to_string()).or_insert(Response {
        description: "Success".to_string(),
        content: None,
    });

    Operation {
        summary: format!("{} {}", verb(route.method), resource),
        description: route
            .description
            .clone()
            .unwrap_or_else(|| format!("{} operation for {}", route.method, route.path)),
        operation_id: operation_id(route),
        tags: vec![tag_name(&route.path)],
        parameters,
        request_body,
        responses,
    }
}

/// Message object used when no response shape could be inferred
fn default_response_schema() -> Value {
    json!({
        "type": "object",
        "properties": { "message": { "type": "string" } }
    })
}

/// Parse a single-path fragment into its normalized path and operation entries.
///
/// Method entries must be lower-case keys with object values; other method entries are
/// dropped. Non-method keys pass through unchanged.
fn parse_fragment(raw_yaml: &str) -> Option<(String, Map<String, Value>)> {
    let parsed: serde_yaml::Value = match serde_yaml::from_str(raw_yaml) {
        Ok(value) => value,
        Err(e) => {
            debug!("AI fragment is not valid YAML: {}", e);
            return None;
        }
    };
    let Value::Object(top) = yaml_to_json(parsed) else {
        return None;
    };
    if top.len() != 1 {
        return None;
    }
    let (path, operations) = top.into_iter().next()?;
    let Value::Object(entries) = operations else {
        return None;
    };

    let mut operations = Map::new();
    for (key, value) in entries {
        if HttpMethod::parse(&key).is_some() && (key != key.to_lowercase() || !value.is_object()) {
            debug!("Skipping malformed operation entry '{}' in AI fragment", key);
            continue;
        }
        operations.insert(key, value);
    }
    if !operations.keys().any(|key| HttpMethod::parse(key).is_some()) {
        return None;
    }
    Some((normalize_path(&path), operations))
}

/// Split a multi-path fragment into single-path fragments keyed by normalized path.
///
/// Used for batch responses; each entry can be passed to
/// [`OpenApiBuilder::add_route_with_ai_doc`]. Non-mapping input yields an empty map.
pub fn split_path_fragments(raw_yaml: &str) -> BTreeMap<String, String> {
    let mut fragments = BTreeMap::new();
    let Ok(serde_yaml::Value::Mapping(top)) = serde_yaml::from_str::<serde_yaml::Value>(raw_yaml) else {
        return fragments;
    };

    for (key, value) in top {
        let serde_yaml::Value::String(path) = key else {
            continue;
        };
        let mut single = serde_yaml::Mapping::new();
        single.insert(serde_yaml::Value::String(path.clone()), value);
        match serde_yaml::to_string(&single) {
            Ok(text) => {
                fragments.insert(normalize_path(&path), text);
            }
            Err(e) => debug!("Failed to re-serialize fragment for {}: {}", path, e),
        }
    }
    fragments
}

/// Convert YAML to JSON, stringifying scalar mapping keys such as unquoted `200:`
fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                json!(i)
            } else if let Some(u) = n.as_u64() {
                json!(u)
            } else {
                n.as_f64().map(|f| json!(f)).unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => {
            let mut object = Map::new();
            for (key, value) in mapping {
                let key = match key {
                    serde_yaml::Value::String(s) => s,
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => {
                        debug!("Dropping non-scalar mapping key: {:?}", other);
                        continue;
                    }
                };
                object.insert(key, yaml_to_json(value));
            }
            Value::Object(object)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

/// Push string entries of an operation's `tags` array
fn collect_tags(operation: &Value, tags: &mut Vec<String>) {
    if let Some(list) = operation.get("tags").and_then(Value::as_array) {
        for tag in list.iter().filter_map(Value::as_str) {
            if !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }
    }
}
