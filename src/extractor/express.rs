use super::patterns::{
    collect_matches, handler_predicates, is_route_call, HandlerFact, Predicate, RouteCall,
};
use super::{
    MiddlewareRecord, ParameterKind, ParameterRecord, ResponseRecord, RouteExtractor, RouteRecord,
    ANONYMOUS_HANDLER, INLINE_HANDLER,
};
use crate::error::{Error, Result};
use crate::parser::{AstParser, SourceDialect};
use crate::schema_generator::unquote;
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use std::collections::HashSet;
use std::path::PathBuf;
use tree_sitter::Node;

lazy_static! {
    static ref PATH_PARAM: Regex = Regex::new(r":([A-Za-z_][A-Za-z0-9_]*)(\?)?").unwrap();
}

/// Express route extractor
pub struct ExpressExtractor;

impl RouteExtractor for ExpressExtractor {
    fn extract_routes(&self, source: &str, file_path: &str) -> Vec<RouteRecord> {
        let parsed = match AstParser::parse_source(source, SourceDialect::from_path(file_path)) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Skipping {}: {}", file_path, e);
                return Vec::new();
            }
        };

        let bytes = source.as_bytes();
        let predicates = [is_route_call as Predicate<'_, RouteCall<'_>>];
        let calls = collect_matches(parsed.tree.root_node(), bytes, &predicates);
        debug!("Found {} candidate route calls in {}", calls.len(), file_path);

        let mut routes = Vec::new();
        for call in calls {
            match extract_route(&call, bytes, file_path) {
                Ok(Some(route)) => {
                    debug!("Extracted route: {} {}", route.method, route.path);
                    routes.push(route);
                }
                Ok(None) => {}
                Err(e) => warn!("{}", e),
            }
        }
        routes
    }
}

/// Turn one candidate call into a route record.
///
/// Returns `Ok(None)` when the call is not a registration with a literal path.
fn extract_route(call: &RouteCall, source: &[u8], file_path: &str) -> Result<Option<RouteRecord>> {
    let args = call.arguments();
    let Some(path_node) = args.first() else {
        return Ok(None);
    };
    if path_node.kind() != "string" {
        debug!(
            "Skipping {} call with non-literal path at line {}",
            call.method,
            line_of(&call.node)
        );
        return Ok(None);
    }
    let path = unquote(text(path_node, source, file_path)?);

    // `args` is non-empty, so the terminal argument always exists; with a single argument it
    // is the path literal itself and classifies as anonymous.
    let handler = args[args.len() - 1];
    let (handler_name, body) = match handler.kind() {
        "identifier" => (text(&handler, source, file_path)?.to_string(), None),
        "arrow_function" | "function_expression" | "function" => (
            INLINE_HANDLER.to_string(),
            handler.child_by_field_name("body"),
        ),
        _ => (ANONYMOUS_HANDLER.to_string(), None),
    };

    let mut middlewares = Vec::new();
    if args.len() > 2 {
        for arg in &args[1..args.len() - 1] {
            if arg.kind() == "identifier" {
                middlewares.push(MiddlewareRecord::classify(text(arg, source, file_path)?));
            }
        }
    }

    let mut parameters = extract_path_parameters(&path);
    let mut responses = Vec::new();
    if let Some(body) = body {
        let (query, body_params, found) = inspect_handler(body, source);
        parameters.extend(query);
        parameters.extend(body_params);
        responses = found;
    }
    if responses.is_empty() {
        responses.push(ResponseRecord::default_success());
    }

    Ok(Some(RouteRecord {
        method: call.method,
        path,
        handler_name,
        parameters: dedup_parameters(parameters),
        responses,
        middlewares,
        description: None,
        source_file: file_path.to_string(),
        line_number: Some(line_of(&call.node)),
    }))
}

/// Query parameters, body parameters and responses discovered in a handler body
fn inspect_handler<'t>(
    body: Node<'t>,
    source: &[u8],
) -> (Vec<ParameterRecord>, Vec<ParameterRecord>, Vec<ResponseRecord>) {
    let predicates = handler_predicates();

    let mut query = Vec::new();
    let mut body_params: Vec<ParameterRecord> = Vec::new();
    let mut responses: Vec<ResponseRecord> = Vec::new();

    for fact in collect_matches(body, source, &predicates) {
        match fact {
            HandlerFact::QueryParam(name) => {
                query.push(ParameterRecord::new(name, ParameterKind::Query, false));
            }
            HandlerFact::BodyFields { names, required } => {
                for name in names {
                    // First sighting decides `required`, whichever form it came from
                    if !body_params.iter().any(|p| p.name == name) {
                        body_params.push(ParameterRecord::new(name, ParameterKind::Body, required));
                    }
                }
            }
            HandlerFact::Response(response) => {
                if !responses.iter().any(|r| r.status_code == response.status_code) {
                    responses.push(response);
                }
            }
        }
    }

    (query, body_params, responses)
}

/// Extract path parameters from a route path (e.g. "/users/:id?" -> optional `id`)
pub fn extract_path_parameters(path: &str) -> Vec<ParameterRecord> {
    let mut parameters: Vec<ParameterRecord> = Vec::new();
    for caps in PATH_PARAM.captures_iter(path) {
        let name = &caps[1];
        if parameters.iter().any(|p| p.name == name) {
            continue;
        }
        let optional = caps.get(2).is_some();
        parameters.push(ParameterRecord::new(name, ParameterKind::Path, !optional));
    }
    parameters
}

/// Drop repeated (name, kind) pairs, keeping the first occurrence
fn dedup_parameters(parameters: Vec<ParameterRecord>) -> Vec<ParameterRecord> {
    let mut seen = HashSet::new();
    parameters
        .into_iter()
        .filter(|p| seen.insert((p.name.clone(), p.kind)))
        .collect()
}

fn text<'s>(node: &Node, source: &'s [u8], file_path: &str) -> Result<&'s str> {
    node.utf8_text(source).map_err(|e| Error::ExtractionError {
        file: PathBuf::from(file_path),
        line: line_of(node),
        message: e.to_string(),
    })
}

fn line_of(node: &Node) -> usize {
    node.start_position().row + 1
}
