//! Prompt construction and response cleanup for AI-assisted documentation.
//!
//! Prompts are rendered deterministically from [`RouteRecord`]s; the same input always
//! produces byte-identical text.

use crate::extractor::{ParameterKind, RouteRecord};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref OPENING_FENCE: Regex = Regex::new(r"(?i)^```(?:yaml|yml)?[ \t]*\r?\n?").unwrap();
    static ref CLOSING_FENCE: Regex = Regex::new(r"\r?\n?```\s*$").unwrap();
}

/// Minimum length of a plausible YAML fragment.
const MIN_RESPONSE_LENGTH: usize = 10;

const SYSTEM_CONTEXT: &str = "You are an expert API documentation assistant that writes precise OpenAPI 3.1 specifications for Express.js routes.";

const SINGLE_TASK: &str =
    "Generate the OpenAPI path item for the following route. Describe what the endpoint does, its parameters, request body and responses.";

const BATCH_TASK: &str =
    "Generate OpenAPI path items for the following routes. Describe what each endpoint does, its parameters, request body and responses.";

const EXAMPLE_YAML: &str = r#"EXAMPLE:
/users/{id}:
  get:
    summary: Get user by ID
    description: Retrieves a single user by its unique identifier.
    operationId: getUserById
    tags:
      - Users
    parameters:
      - name: id
        in: path
        required: true
        schema:
          type: string
        description: The user identifier
    responses:
      '200':
        description: User found
        content:
          application/json:
            schema:
              type: object
              properties:
                id:
                  type: string
                name:
                  type: string
      '404':
        description: User not found"#;

const OUTPUT_FOOTER: &str = r#"OUTPUT FORMAT:
Return only YAML. The top-level key must be the route path in OpenAPI form (use {param} instead of :param), mapped to lowercase HTTP methods.

REQUIREMENTS:
- Include summary, description, operationId and tags for every operation
- Document every path, query and body parameter
- Include every listed response with a meaningful description
- Do not wrap the output in explanations"#;

/// Outcome of [`validate_response`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Builds the prompt for a single route, optionally embedding its handler source.
pub fn build_route_prompt(route: &RouteRecord, code_snippet: Option<&str>) -> String {
    let mut sections = vec![
        SYSTEM_CONTEXT.to_string(),
        SINGLE_TASK.to_string(),
        route_block(route),
    ];

    if let Some(snippet) = code_snippet {
        sections.push(format!("CODE SNIPPET:\n```javascript\n{}\n```", snippet));
    }

    sections.push(EXAMPLE_YAML.to_string());
    sections.push(OUTPUT_FOOTER.to_string());
    sections.join("\n\n")
}

/// Builds one prompt covering several routes; each block is numbered from 1.
pub fn build_multiple_routes_prompt(routes: &[RouteRecord]) -> String {
    let mut sections = vec![SYSTEM_CONTEXT.to_string(), BATCH_TASK.to_string()];

    for (index, route) in routes.iter().enumerate() {
        sections.push(format!("Route {}:\n{}", index + 1, route_block(route)));
    }

    sections.push(EXAMPLE_YAML.to_string());
    sections.push(OUTPUT_FOOTER.to_string());
    sections.join("\n\n")
}

fn route_block(route: &RouteRecord) -> String {
    let mut lines = vec![
        "ROUTE INFORMATION:".to_string(),
        format!("Method: {}", route.method.as_str()),
        format!("Path: {}", route.path),
        format!("Handler: {}", route.handler_name),
    ];

    if !route.parameters.is_empty() {
        lines.push("PARAMETERS:".to_string());
        for (label, kind) in [
            ("Path", ParameterKind::Path),
            ("Query", ParameterKind::Query),
            ("Body", ParameterKind::Body),
        ] {
            let names: Vec<String> = route
                .parameters_of(kind)
                .map(|p| {
                    if p.required {
                        format!("{} (required)", p.name)
                    } else {
                        p.name.clone()
                    }
                })
                .collect();
            if !names.is_empty() {
                lines.push(format!("  {}: {}", label, names.join(", ")));
            }
        }
    }

    if !route.middlewares.is_empty() {
        let names: Vec<String> = route
            .middlewares
            .iter()
            .map(|m| format!("{} ({})", m.name, m.kind.as_str()))
            .collect();
        lines.push(format!("MIDDLEWARES: {}", names.join(", ")));
    }

    lines.push("RESPONSES:".to_string());
    for response in &route.responses {
        lines.push(format!("  {}: {}", response.status_code, response.description));
    }

    lines.join("\n")
}

/// Strips Markdown code fences around a completion and trims it.
///
/// Repeated until stable, so `extract_yaml(extract_yaml(x)) == extract_yaml(x)`.
pub fn extract_yaml(text: &str) -> String {
    let mut current = text.trim().to_string();
    loop {
        let opened = OPENING_FENCE.replace(&current, "");
        let closed = CLOSING_FENCE.replace(&opened, "");
        let next = closed.trim().to_string();
        if next == current {
            return next;
        }
        current = next;
    }
}

/// Heuristic shape check for an AI fragment.
pub fn validate_response(text: &str) -> ResponseValidation {
    let mut errors = Vec::new();

    if text.trim().len() < MIN_RESPONSE_LENGTH || !text.contains(':') {
        errors.push("Response is too short or does not look like YAML".to_string());
    }

    if !text.contains("summary:") && !text.contains("responses:") {
        errors.push("Response is missing required fields (summary or responses)".to_string());
    }

    ResponseValidation {
        is_valid: errors.is_empty(),
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{HttpMethod, MiddlewareRecord, ParameterRecord, ResponseRecord};
    use pretty_assertions::assert_eq;

    fn create_route() -> RouteRecord {
        let mut route = RouteRecord::new(HttpMethod::Post, "/users/:id", "updateUser");
        route.parameters = vec![
            ParameterRecord::new("id", ParameterKind::Path, true),
            ParameterRecord::new("name", ParameterKind::Body, true),
        ];
        route.middlewares = vec![MiddlewareRecord::classify("authMiddleware")];
        route.responses = vec![ResponseRecord {
            status_code: 201,
            description: "Created".to_string(),
            content_type: "application/json".to_string(),
            schema: None,
        }];
        route
    }

    #[test]
    fn test_route_prompt_sections() {
        let prompt = build_route_prompt(&create_route(), None);

        assert!(prompt.starts_with(SYSTEM_CONTEXT));
        assert!(prompt.contains("Method: POST"));
        assert!(prompt.contains("Path: /users/:id"));
        assert!(prompt.contains("Handler: updateUser"));
        assert!(prompt.contains("PARAMETERS:"));
        assert!(prompt.contains("  Path: id (required)"));
        assert!(prompt.contains("  Body: name (required)"));
        assert!(!prompt.contains("  Query:"));
        assert!(prompt.contains("MIDDLEWARES: authMiddleware (auth)"));
        assert!(prompt.contains("  201: Created"));
        assert!(!prompt.contains("CODE SNIPPET"));
        assert!(prompt.contains("EXAMPLE:"));
        assert!(prompt.ends_with("- Do not wrap the output in explanations"));
    }

    #[test]
    fn test_route_prompt_omits_empty_sections() {
        let route = RouteRecord::new(HttpMethod::Get, "/health", "health");
        let prompt = build_route_prompt(&route, None);

        assert!(!prompt.contains("PARAMETERS:"));
        assert!(!prompt.contains("MIDDLEWARES:"));
        assert!(prompt.contains("  200: Success"));
    }

    #[test]
    fn test_route_prompt_with_snippet() {
        let prompt = build_route_prompt(&create_route(), Some("res.status(201).json(user);"));
        assert!(prompt.contains("CODE SNIPPET:\n```javascript\nres.status(201).json(user);\n```"));
    }

    #[test]
    fn test_route_prompt_is_deterministic() {
        let route = create_route();
        assert_eq!(build_route_prompt(&route, None), build_route_prompt(&route, None));
    }

    #[test]
    fn test_multiple_routes_prompt_numbers_blocks() {
        let routes = vec![
            RouteRecord::new(HttpMethod::Get, "/users", "listUsers"),
            create_route(),
        ];
        let prompt = build_multiple_routes_prompt(&routes);

        let first = prompt.find("Route 1:\nROUTE INFORMATION:").unwrap();
        let second = prompt.find("Route 2:\nROUTE INFORMATION:").unwrap();
        assert!(first < second);
        assert!(!prompt.contains("Route 3:"));
        assert!(prompt.contains(BATCH_TASK));
    }

    #[test]
    fn test_extract_yaml_strips_fences() {
        let text = "```yaml\n/users:\n  get:\n    summary: List\n```";
        assert_eq!(extract_yaml(text), "/users:\n  get:\n    summary: List");

        let upper = "```YML\nkey: value\n```\n";
        assert_eq!(extract_yaml(upper), "key: value");

        let bare = "```\nkey: value\n```";
        assert_eq!(extract_yaml(bare), "key: value");
    }

    #[test]
    fn test_extract_yaml_without_fences() {
        assert_eq!(extract_yaml("  key: value \n"), "key: value");
    }

    #[test]
    fn test_extract_yaml_empty_and_fence_only() {
        assert_eq!(extract_yaml(""), "");
        assert_eq!(extract_yaml("```"), "");
        assert_eq!(extract_yaml("```yaml\n```"), "");
    }

    #[test]
    fn test_extract_yaml_is_idempotent() {
        let inputs = [
            "```yaml\n```yaml\nkey: value\n```\n```",
            "```yaml\nkey: value\n```",
            "key: value",
            "",
            "```",
        ];
        for input in inputs {
            let once = extract_yaml(input);
            assert_eq!(extract_yaml(&once), once);
        }
    }

    #[test]
    fn test_validate_response_accepts_fragment() {
        let result = validate_response("/users:\n  get:\n    summary: List users");
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_validate_response_reports_all_errors() {
        let result = validate_response("nope");
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 2);

        let result = validate_response("/users:\n  get:\n    operationId: listUsers");
        assert!(!result.is_valid);
        assert_eq!(
            result.errors,
            vec!["Response is missing required fields (summary or responses)".to_string()]
        );
    }
}
