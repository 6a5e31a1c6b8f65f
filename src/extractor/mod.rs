//! Route extraction module for parsing Express route definitions.
//!
//! This module defines the route model shared by every later stage of the pipeline and a
//! unified interface for extractors. The Express extractor recognises
//! `router.METHOD(path, ...middlewares, handler)` and the `app.` equivalent.
//!
//! # Example
//!
//! ```no_run
//! use openapi_from_express::extractor::{RouteExtractor, express::ExpressExtractor};
//!
//! let source = "router.get('/users/:id', getUser);";
//! let routes = ExpressExtractor.extract_routes(source, "routes/users.js");
//! println!("Found {} routes", routes.len());
//! ```

pub mod express;
pub mod patterns;

use crate::schema_generator::InferredSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handler name recorded when the terminal argument is an inline function.
pub const INLINE_HANDLER: &str = "inline function";

/// Handler name recorded when the terminal argument is neither an identifier nor a function.
pub const ANONYMOUS_HANDLER: &str = "anonymous";

/// Trait for extracting route information from a single source file.
///
/// Implementations never fail: unparsable input yields an empty list and a logged diagnostic.
pub trait RouteExtractor {
    /// Extracts all route records from one file's source text.
    ///
    /// # Arguments
    ///
    /// * `source` - Full text of the file
    /// * `file_path` - Identifier of the file, recorded on every route and used to pick a grammar
    fn extract_routes(&self, source: &str, file_path: &str) -> Vec<RouteRecord>;
}

/// One discovered endpoint.
///
/// Produced once per scan and consumed by documentation synthesis; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    /// The HTTP method for this route
    pub method: HttpMethod,
    /// The route string as written, including colon parameters (e.g. `/users/:id`)
    pub path: String,
    /// Name of the terminal handler argument, or one of the handler sentinels
    pub handler_name: String,
    /// Path, query and body parameters, in that order
    pub parameters: Vec<ParameterRecord>,
    /// Responses detected in the handler body; never empty
    pub responses: Vec<ResponseRecord>,
    /// Identifier middlewares between the path and the handler
    pub middlewares: Vec<MiddlewareRecord>,
    /// Explicit operation description, when one is known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Originating file
    pub source_file: String,
    /// 1-based line of the registration call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<usize>,
}

/// HTTP methods recognised on `router`/`app` receivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// HTTP GET method
    Get,
    /// HTTP POST method
    Post,
    /// HTTP PUT method
    Put,
    /// HTTP DELETE method
    Delete,
    /// HTTP PATCH method
    Patch,
    /// HTTP OPTIONS method
    Options,
    /// HTTP HEAD method
    Head,
}

impl HttpMethod {
    /// Parse a method name case-insensitively
    pub fn parse(name: &str) -> Option<HttpMethod> {
        match name.to_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "DELETE" => Some(HttpMethod::Delete),
            "PATCH" => Some(HttpMethod::Patch),
            "OPTIONS" => Some(HttpMethod::Options),
            "HEAD" => Some(HttpMethod::Head),
            _ => None,
        }
    }

    /// Upper-case wire name, e.g. `GET`
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
        }
    }

    /// Lower-case name used as the operation key inside an OpenAPI path item
    pub fn key(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
        }
    }

    /// Whether an OpenAPI request body is generated for this method
    pub fn accepts_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Information about a single request parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterRecord {
    /// The parameter name
    pub name: String,
    /// Where the parameter is read from
    pub kind: ParameterKind,
    /// Whether the parameter is required
    pub required: bool,
    /// Schema type name, e.g. `string`
    pub data_type: String,
}

impl ParameterRecord {
    /// Create a new string-typed parameter
    pub fn new(name: impl Into<String>, kind: ParameterKind, required: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            required,
            data_type: "string".to_string(),
        }
    }
}

/// The location a parameter value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    /// Colon parameter embedded in the route path (e.g. `/users/:id`)
    Path,
    /// `req.query.<name>` access
    Query,
    /// `req.body` field
    Body,
}

impl ParameterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterKind::Path => "path",
            ParameterKind::Query => "query",
            ParameterKind::Body => "body",
        }
    }
}

/// A response the handler can produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub status_code: u16,
    pub description: String,
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<InferredSchema>,
}

impl ResponseRecord {
    /// The response synthesized for handlers with no detectable `res.*` call
    pub fn default_success() -> Self {
        Self {
            status_code: 200,
            description: status_description(200).to_string(),
            content_type: "application/json".to_string(),
            schema: None,
        }
    }
}

/// Fixed description table for status codes.
pub fn status_description(status: u16) -> &'static str {
    match status {
        200 => "Success",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// A middleware passed between the path and the handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiddlewareRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MiddlewareKind,
}

impl MiddlewareRecord {
    /// Classify a middleware by its identifier
    pub fn classify(name: impl Into<String>) -> Self {
        let name = name.into();
        let lower = name.to_lowercase();
        let kind = if lower.contains("auth") || lower.contains("verify") {
            MiddlewareKind::Auth
        } else if lower.contains("valid") || lower.contains("check") {
            MiddlewareKind::Validation
        } else {
            MiddlewareKind::Custom
        };
        Self { name, kind }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MiddlewareKind {
    Auth,
    Validation,
    Custom,
}

impl MiddlewareKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MiddlewareKind::Auth => "auth",
            MiddlewareKind::Validation => "validation",
            MiddlewareKind::Custom => "custom",
        }
    }
}

impl RouteRecord {
    /// Create a new RouteRecord with minimal required fields
    pub fn new(method: HttpMethod, path: impl Into<String>, handler_name: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            handler_name: handler_name.into(),
            parameters: Vec::new(),
            responses: vec![ResponseRecord::default_success()],
            middlewares: Vec::new(),
            description: None,
            source_file: String::new(),
            line_number: None,
        }
    }

    /// Parameters of one kind, in declaration order
    pub fn parameters_of(&self, kind: ParameterKind) -> impl Iterator<Item = &ParameterRecord> {
        self.parameters.iter().filter(move |p| p.kind == kind)
    }

    /// Whether the handler name is an identifier rather than a sentinel
    pub fn has_named_handler(&self) -> bool {
        self.handler_name != INLINE_HANDLER && self.handler_name != ANONYMOUS_HANDLER
    }
}
