//! OpenAPI document validation.
//!
//! Validation never fails with an error value: every problem, including a document that is
//! not an object at all, is reported through [`ValidationResult`].

use crate::openapi_builder::OpenApiDocument;
use serde_json::{Map, Value};

/// Operation keys inside a path item.
const OPERATION_KEYS: &[&str] = &["get", "put", "post", "delete", "options", "head", "patch", "trace"];

/// Allowed values of a parameter's `in` field.
const PARAMETER_LOCATIONS: &[&str] = &["query", "header", "path", "cookie"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
    pub path: Option<String>,
    /// Structural rule that failed (`required`, `type`)
    pub keyword: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    pub message: String,
    pub path: Option<String>,
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn error(&mut self, message: impl Into<String>, path: Option<String>, keyword: Option<&str>) {
        self.is_valid = false;
        self.errors.push(ValidationError {
            message: message.into(),
            path,
            keyword: keyword.map(str::to_string),
        });
    }

    fn warning(&mut self, message: impl Into<String>, path: Option<String>, suggestion: Option<&str>) {
        self.warnings.push(ValidationWarning {
            message: message.into(),
            path,
            suggestion: suggestion.map(str::to_string),
        });
    }
}

/// Validates a synthesized document.
pub fn validate_openapi(doc: &OpenApiDocument) -> ValidationResult {
    match serde_json::to_value(doc) {
        Ok(value) => validate_document(&value),
        Err(e) => {
            let mut result = ValidationResult::new();
            result.error(format!("Validation failed: {}", e), None, None);
            result
        }
    }
}

/// Validates an OpenAPI document given as JSON.
///
/// Runs the structural pass first, then the content checks.
pub fn validate_document(doc: &Value) -> ValidationResult {
    let mut result = ValidationResult::new();

    let Some(root) = doc.as_object() else {
        result.error(
            format!("Validation failed: document must be an object, found {}", type_name(doc)),
            None,
            None,
        );
        return result;
    };

    check_structure(root, &mut result);
    check_version(root, &mut result);
    check_info(root, &mut result);
    check_paths(root, &mut result);
    check_tags(root, &mut result);
    check_components(root, &mut result);

    result
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn expect_type(
    value: &Value,
    expected: &str,
    path: String,
    result: &mut ValidationResult,
) -> bool {
    let actual = type_name(value);
    if actual == expected {
        return true;
    }
    result.error(
        format!("Expected {} but found {}", expected, actual),
        Some(path),
        Some("type"),
    );
    false
}

fn check_structure(root: &Map<String, Value>, result: &mut ValidationResult) {
    for key in ["openapi", "paths"] {
        if !root.contains_key(key) {
            result.error(
                format!("Missing required property '{}'", key),
                Some(String::new()),
                Some("required"),
            );
        }
    }

    if let Some(openapi) = root.get("openapi") {
        expect_type(openapi, "string", "openapi".to_string(), result);
    }
    if let Some(info) = root.get("info") {
        if expect_type(info, "object", "info".to_string(), result) {
            for field in ["title", "version", "summary", "description"] {
                if let Some(value) = info.get(field) {
                    expect_type(value, "string", format!("info.{}", field), result);
                }
            }
        }
    }
    if let Some(tags) = root.get("tags") {
        if expect_type(tags, "array", "tags".to_string(), result) {
            for (index, tag) in tags.as_array().into_iter().flatten().enumerate() {
                check_tag_structure(tag, format!("tags[{}]", index), result);
            }
        }
    }
    if let Some(components) = root.get("components") {
        expect_type(components, "object", "components".to_string(), result);
    }

    let Some(paths) = root.get("paths") else {
        return;
    };
    if !expect_type(paths, "object", "paths".to_string(), result) {
        return;
    }

    for (path, item) in paths.as_object().into_iter().flatten() {
        let item_path = format!("paths.{}", path);
        if !expect_type(item, "object", item_path.clone(), result) {
            continue;
        }
        for (key, operation) in item.as_object().into_iter().flatten() {
            if key == "parameters" {
                check_parameters_structure(operation, format!("{}.parameters", item_path), result);
                continue;
            }
            if !OPERATION_KEYS.contains(&key.as_str()) {
                continue;
            }
            let op_path = format!("{}.{}", item_path, key);
            if expect_type(operation, "object", op_path.clone(), result) {
                check_operation_structure(operation, &op_path, result);
            }
        }
    }
}

fn check_tag_structure(tag: &Value, path: String, result: &mut ValidationResult) {
    if !expect_type(tag, "object", path.clone(), result) {
        return;
    }
    match tag.get("name") {
        Some(name) => {
            expect_type(name, "string", format!("{}.name", path), result);
        }
        None => result.error("Tag is missing 'name'", Some(path), Some("required")),
    }
}

fn check_operation_structure(operation: &Value, op_path: &str, result: &mut ValidationResult) {
    for field in ["summary", "description", "operationId"] {
        if let Some(value) = operation.get(field) {
            expect_type(value, "string", format!("{}.{}", op_path, field), result);
        }
    }
    if let Some(deprecated) = operation.get("deprecated") {
        expect_type(deprecated, "boolean", format!("{}.deprecated", op_path), result);
    }
    if let Some(tags) = operation.get("tags") {
        let tags_path = format!("{}.tags", op_path);
        if expect_type(tags, "array", tags_path.clone(), result) {
            for (index, tag) in tags.as_array().into_iter().flatten().enumerate() {
                expect_type(tag, "string", format!("{}[{}]", tags_path, index), result);
            }
        }
    }

    if let Some(responses) = operation.get("responses") {
        let responses_path = format!("{}.responses", op_path);
        if expect_type(responses, "object", responses_path.clone(), result) {
            for (code, response) in responses.as_object().into_iter().flatten() {
                let response_path = format!("{}.{}", responses_path, code);
                if !expect_type(response, "object", response_path.clone(), result)
                    || response.get("$ref").is_some()
                {
                    continue;
                }
                match response.get("description") {
                    Some(description) => {
                        expect_type(description, "string", format!("{}.description", response_path), result);
                    }
                    None => result.error(
                        "Response is missing 'description'",
                        Some(response_path),
                        Some("required"),
                    ),
                }
            }
        }
    }

    if let Some(request_body) = operation.get("requestBody") {
        let body_path = format!("{}.requestBody", op_path);
        if expect_type(request_body, "object", body_path.clone(), result) {
            if let Some(required) = request_body.get("required") {
                expect_type(required, "boolean", format!("{}.required", body_path), result);
            }
        }
    }

    if let Some(parameters) = operation.get("parameters") {
        check_parameters_structure(parameters, format!("{}.parameters", op_path), result);
    }
}

fn check_parameters_structure(parameters: &Value, path: String, result: &mut ValidationResult) {
    if !expect_type(parameters, "array", path.clone(), result) {
        return;
    }
    for (index, parameter) in parameters.as_array().into_iter().flatten().enumerate() {
        let parameter_path = format!("{}[{}]", path, index);
        if !expect_type(parameter, "object", parameter_path.clone(), result)
            || parameter.get("$ref").is_some()
        {
            continue;
        }
        if let Some(name) = parameter.get("name") {
            expect_type(name, "string", format!("{}.name", parameter_path), result);
        }
        if let Some(location) = parameter.get("in") {
            let in_path = format!("{}.in", parameter_path);
            if expect_type(location, "string", in_path.clone(), result)
                && !location.as_str().is_some_and(|l| PARAMETER_LOCATIONS.contains(&l))
            {
                result.error(
                    format!("Parameter location must be one of: {}", PARAMETER_LOCATIONS.join(", ")),
                    Some(in_path),
                    Some("enum"),
                );
            }
        }
        if let Some(required) = parameter.get("required") {
            expect_type(required, "boolean", format!("{}.required", parameter_path), result);
        }
    }
}

fn check_version(root: &Map<String, Value>, result: &mut ValidationResult) {
    if let Some(version) = root.get("openapi").and_then(Value::as_str) {
        if !version.starts_with("3.") {
            result.warning(
                format!("OpenAPI version '{}' is not a 3.x version", version),
                Some("openapi".to_string()),
                Some("Use openapi: 3.1.0"),
            );
        }
    }
}

fn check_info(root: &Map<String, Value>, result: &mut ValidationResult) {
    let Some(info) = root.get("info") else {
        result.error("Missing required field: info", Some("info".to_string()), Some("required"));
        return;
    };

    for field in ["title", "version"] {
        if info.get(field).is_none() {
            result.error(
                format!("Missing required field: info.{}", field),
                Some(format!("info.{}", field)),
                Some("required"),
            );
        }
    }
}

fn check_paths(root: &Map<String, Value>, result: &mut ValidationResult) {
    let paths = root.get("paths").and_then(Value::as_object);
    let Some(paths) = paths.filter(|p| !p.is_empty()) else {
        result.warning(
            "No paths defined in the document",
            Some("paths".to_string()),
            Some("Add at least one route"),
        );
        return;
    };

    for (path, item) in paths {
        if !path.starts_with('/') {
            result.warning(
                format!("Path '{}' should start with /", path),
                Some(format!("paths.{}", path)),
                Some("Prefix the path with /"),
            );
        }

        let Some(item) = item.as_object() else {
            continue;
        };

        if let Some(parameters) = item.get("parameters").and_then(Value::as_array) {
            check_parameters(parameters, &format!("paths.{}.parameters", path), result);
        }

        for (method, operation) in item {
            if !OPERATION_KEYS.contains(&method.as_str()) {
                continue;
            }
            if let Some(operation) = operation.as_object() {
                check_operation(operation, &format!("paths.{}.{}", path, method), result);
            }
        }
    }
}

fn check_operation(operation: &Map<String, Value>, op_path: &str, result: &mut ValidationResult) {
    if !operation.contains_key("summary") && !operation.contains_key("description") {
        result.warning(
            "Operation has neither a summary nor a description",
            Some(op_path.to_string()),
            Some("Add a summary describing the operation"),
        );
    }

    let responses = operation.get("responses").and_then(Value::as_object);
    match responses.filter(|r| !r.is_empty()) {
        None => result.error(
            "Operation must define at least one response",
            Some(format!("{}.responses", op_path)),
            None,
        ),
        Some(responses) => {
            let has_success = responses
                .keys()
                .any(|code| code == "default" || (code.len() == 3 && code.starts_with('2')));
            if !has_success {
                result.warning(
                    "Operation defines no 2xx or default response",
                    Some(format!("{}.responses", op_path)),
                    Some("Add a 200 response"),
                );
            }
        }
    }

    if let Some(parameters) = operation.get("parameters").and_then(Value::as_array) {
        check_parameters(parameters, &format!("{}.parameters", op_path), result);
    }
}

fn check_parameters(parameters: &[Value], base: &str, result: &mut ValidationResult) {
    for (index, parameter) in parameters.iter().enumerate() {
        let Some(parameter) = parameter.as_object() else {
            continue;
        };
        if parameter.contains_key("$ref") {
            continue;
        }

        let path = format!("{}[{}]", base, index);
        if !parameter.contains_key("name") {
            result.error("Parameter is missing 'name'", Some(path.clone()), Some("required"));
        }
        if !parameter.contains_key("in") {
            result.error("Parameter is missing 'in'", Some(path.clone()), Some("required"));
        }
        if !parameter.contains_key("schema") && !parameter.contains_key("content") {
            result.error(
                "Parameter must define either 'schema' or 'content'",
                Some(path),
                Some("required"),
            );
        }
    }
}

fn check_tags(root: &Map<String, Value>, result: &mut ValidationResult) {
    let empty = root
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| tags.is_empty())
        .unwrap_or(true);
    if empty {
        result.warning(
            "No tags defined",
            Some("tags".to_string()),
            Some("Group operations with tags"),
        );
    }
}

fn check_components(root: &Map<String, Value>, result: &mut ValidationResult) {
    let empty = root
        .get("components")
        .and_then(|c| c.get("schemas"))
        .and_then(Value::as_object)
        .map(|schemas| schemas.is_empty())
        .unwrap_or(true);
    if empty {
        result.warning(
            "No reusable schemas defined in components",
            Some("components.schemas".to_string()),
            Some("Move shared response shapes into components.schemas"),
        );
    }
}

/// Renders a plain-text report of a validation result.
pub fn generate_report(result: &ValidationResult) -> String {
    let mut lines = vec![
        "OpenAPI Validation Report".to_string(),
        "=========================".to_string(),
        String::new(),
        format!(
            "Status: {}",
            if result.is_valid { "VALID" } else { "INVALID" }
        ),
    ];

    if !result.errors.is_empty() {
        lines.push(String::new());
        lines.push(format!("Errors ({}):", result.errors.len()));
        for (index, error) in result.errors.iter().enumerate() {
            lines.push(format!("  {}. {}", index + 1, error.message));
            if let Some(path) = error.path.as_deref().filter(|p| !p.is_empty()) {
                lines.push(format!("     Path: {}", path));
            }
            if let Some(keyword) = &error.keyword {
                lines.push(format!("     Keyword: {}", keyword));
            }
        }
    }

    if !result.warnings.is_empty() {
        lines.push(String::new());
        lines.push(format!("Warnings ({}):", result.warnings.len()));
        for (index, warning) in result.warnings.iter().enumerate() {
            lines.push(format!("  {}. {}", index + 1, warning.message));
            if let Some(path) = warning.path.as_deref().filter(|p| !p.is_empty()) {
                lines.push(format!("     Path: {}", path));
            }
            if let Some(suggestion) = &warning.suggestion {
                lines.push(format!("     Suggestion: {}", suggestion));
            }
        }
    }

    if result.errors.is_empty() && result.warnings.is_empty() {
        lines.push(String::new());
        lines.push("All checks passed. The document is ready to publish!".to_string());
    }

    lines.push(String::new());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{HttpMethod, RouteRecord};
    use crate::openapi_builder::OpenApiBuilder;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn complete_document() -> Value {
        json!({
            "openapi": "3.1.0",
            "info": {"title": "Users", "version": "1.0.0"},
            "paths": {
                "/users": {
                    "get": {
                        "summary": "List users",
                        "parameters": [
                            {"name": "limit", "in": "query", "schema": {"type": "string"}}
                        ],
                        "responses": {"200": {"description": "Success"}}
                    }
                }
            },
            "components": {"schemas": {"User": {"type": "object"}}},
            "tags": [{"name": "Users"}]
        })
    }

    fn messages(result: &ValidationResult) -> Vec<String> {
        result.errors.iter().map(|e| e.message.clone()).collect()
    }

    fn warning_messages(result: &ValidationResult) -> Vec<String> {
        result.warnings.iter().map(|w| w.message.clone()).collect()
    }

    #[test]
    fn test_complete_document_is_clean() {
        let result = validate_document(&complete_document());
        assert!(result.is_valid);
        assert_eq!(result.errors, vec![]);
        assert_eq!(result.warnings, vec![]);
    }

    #[test]
    fn test_empty_paths_warns() {
        let mut doc = complete_document();
        doc["paths"] = json!({});
        let result = validate_document(&doc);

        assert!(result.is_valid);
        assert!(warning_messages(&result)
            .iter()
            .any(|m| m.contains("No paths defined")));
    }

    #[test]
    fn test_missing_info_is_invalid() {
        let mut doc = complete_document();
        doc.as_object_mut().unwrap().remove("info");
        let result = validate_document(&doc);

        assert!(!result.is_valid);
        assert!(messages(&result).iter().any(|m| m.contains("info")));
    }

    #[test]
    fn test_missing_title_and_version() {
        let mut doc = complete_document();
        doc["info"] = json!({});
        let result = validate_document(&doc);

        assert_eq!(
            messages(&result),
            vec![
                "Missing required field: info.title".to_string(),
                "Missing required field: info.version".to_string()
            ]
        );
    }

    #[test]
    fn test_null_document_yields_single_error() {
        let result = validate_document(&Value::Null);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_structural_errors_carry_keyword() {
        let doc = json!({"openapi": 3, "info": {"title": "x", "version": "1"}});
        let result = validate_document(&doc);

        let required = result
            .errors
            .iter()
            .find(|e| e.keyword.as_deref() == Some("required"))
            .unwrap();
        assert_eq!(required.message, "Missing required property 'paths'");

        let type_error = result
            .errors
            .iter()
            .find(|e| e.keyword.as_deref() == Some("type"))
            .unwrap();
        assert_eq!(type_error.path.as_deref(), Some("openapi"));
    }

    #[test]
    fn test_structural_pass_checks_nested_keywords() {
        let mut doc = complete_document();
        doc["info"]["version"] = json!(1);
        doc["tags"] = json!([{"description": "no name"}]);
        doc["paths"]["/users"]["get"]["tags"] = json!(["Users", 7]);
        doc["paths"]["/users"]["get"]["responses"]["404"] = json!({});
        doc["paths"]["/users"]["get"]["parameters"] = json!([
            {"name": "limit", "in": "body", "required": "yes", "schema": {"type": "string"}}
        ]);
        let result = validate_document(&doc);

        assert!(!result.is_valid);
        let found: Vec<(Option<&str>, Option<&str>)> = result
            .errors
            .iter()
            .map(|e| (e.path.as_deref(), e.keyword.as_deref()))
            .collect();
        assert_eq!(
            found,
            vec![
                (Some("info.version"), Some("type")),
                (Some("tags[0]"), Some("required")),
                (Some("paths./users.get.tags[1]"), Some("type")),
                (Some("paths./users.get.responses.404"), Some("required")),
                (Some("paths./users.get.parameters[0].in"), Some("enum")),
                (Some("paths./users.get.parameters[0].required"), Some("type")),
            ]
        );
    }

    #[test]
    fn test_version_warning() {
        let mut doc = complete_document();
        doc["openapi"] = json!("2.0");
        let result = validate_document(&doc);

        assert!(result.is_valid);
        assert_eq!(result.warnings[0].path.as_deref(), Some("openapi"));
    }

    #[test]
    fn test_operation_checks() {
        let mut doc = complete_document();
        doc["paths"] = json!({
            "users": {
                "post": {"responses": {"404": {"description": "Not Found"}}},
                "delete": {"summary": "Remove", "responses": {}}
            }
        });
        let result = validate_document(&doc);

        assert!(!result.is_valid);
        assert_eq!(
            messages(&result),
            vec!["Operation must define at least one response".to_string()]
        );
        let warnings = warning_messages(&result);
        assert!(warnings.contains(&"Path 'users' should start with /".to_string()));
        assert!(warnings.contains(&"Operation has neither a summary nor a description".to_string()));
        assert!(warnings.contains(&"Operation defines no 2xx or default response".to_string()));
    }

    #[test]
    fn test_parameter_checks() {
        let mut doc = complete_document();
        doc["paths"]["/users"]["get"]["parameters"] = json!([
            {"in": "query"},
            {"name": "id"},
            {"$ref": "#/components/parameters/Limit"}
        ]);
        let result = validate_document(&doc);

        assert_eq!(
            messages(&result),
            vec![
                "Parameter is missing 'name'".to_string(),
                "Parameter must define either 'schema' or 'content'".to_string(),
                "Parameter is missing 'in'".to_string(),
                "Parameter must define either 'schema' or 'content'".to_string(),
            ]
        );
        assert_eq!(
            result.errors[2].path.as_deref(),
            Some("paths./users.get.parameters[1]")
        );
    }

    #[test]
    fn test_missing_tags_and_schemas_warn() {
        let mut doc = complete_document();
        doc["tags"] = json!([]);
        doc.as_object_mut().unwrap().remove("components");
        let result = validate_document(&doc);

        assert!(result.is_valid);
        assert_eq!(
            warning_messages(&result),
            vec![
                "No tags defined".to_string(),
                "No reusable schemas defined in components".to_string()
            ]
        );
    }

    #[test]
    fn test_builder_output_validates() {
        let mut builder = OpenApiBuilder::new();
        builder.add_routes(&[RouteRecord::new(HttpMethod::Get, "/users/:id", "getUser")]);
        builder.finalize_document();

        let result = validate_openapi(builder.document());
        assert!(result.is_valid, "{:?}", result.errors);
    }

    #[test]
    fn test_report_for_clean_result() {
        let report = generate_report(&validate_document(&complete_document()));
        assert!(report.contains("Status: VALID"));
        assert!(!report.contains("Errors"));
        assert!(report.contains("All checks passed"));
    }

    #[test]
    fn test_report_enumerates_findings() {
        let mut doc = complete_document();
        doc.as_object_mut().unwrap().remove("info");
        doc["tags"] = json!([]);
        let report = generate_report(&validate_document(&doc));

        assert!(report.contains("Status: INVALID"));
        assert!(report.contains("Errors (1):\n  1. Missing required field: info\n     Path: info\n     Keyword: required"));
        assert!(report.contains("Warnings (1):\n  1. No tags defined\n     Path: tags\n     Suggestion: Group operations with tags"));
        assert!(!report.contains("All checks passed"));
    }

    #[test]
    fn test_report_is_deterministic() {
        let result = validate_document(&json!({"paths": {}}));
        assert_eq!(generate_report(&result), generate_report(&result));
    }
}
