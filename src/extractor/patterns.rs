//! Structural predicates over the JavaScript syntax tree.
//!
//! Each predicate recognises one Express idiom at a single node and returns a typed match.
//! [`collect_matches`] walks a subtree in source order and applies a list of predicates to
//! every node, so new idioms are supported by adding a predicate rather than another
//! hand-written traversal.

use super::{status_description, HttpMethod, ResponseRecord};
use crate::schema_generator::infer_from_literal;
use tree_sitter::Node;

/// A structural predicate: inspects one node and reports a match, if any.
pub type Predicate<'t, T> = fn(&Node<'t>, &[u8]) -> Option<T>;

/// Walks `root` in pre-order and applies every predicate to every node.
///
/// Matches are returned in source order; when several predicates match the same node their
/// results follow the order of `predicates`.
pub fn collect_matches<'t, T>(root: Node<'t>, source: &[u8], predicates: &[Predicate<'t, T>]) -> Vec<T> {
    let mut matches = Vec::new();
    let mut cursor = root.walk();

    // Iterative pre-order walk so deeply nested handlers cannot exhaust the stack
    'walk: loop {
        let node = cursor.node();
        for predicate in predicates {
            if let Some(found) = predicate(&node, source) {
                matches.push(found);
            }
        }

        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.node() == root {
                break 'walk;
            }
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                break 'walk;
            }
        }
    }

    matches
}

/// A call of the form `router.<method>(...)` or `app.<method>(...)`.
#[derive(Debug, Clone, Copy)]
pub struct RouteCall<'t> {
    pub node: Node<'t>,
    pub method: HttpMethod,
}

impl<'t> RouteCall<'t> {
    /// Named arguments of the call, comments excluded
    pub fn arguments(&self) -> Vec<Node<'t>> {
        call_arguments(&self.node)
    }
}

/// Facts about a request or response discovered inside a handler body.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerFact {
    /// `req.query.<name>`
    QueryParam(String),
    /// Body fields from `const { a, b } = req.body` (required) or `req.body.<name>` (optional)
    BodyFields { names: Vec<String>, required: bool },
    /// `res.status(N).json(...)`, `res.json(...)` and their `send` variants
    Response(ResponseRecord),
}

/// The handler-body predicates in the order their facts are consumed.
pub fn handler_predicates<'t>() -> [Predicate<'t, HandlerFact>; 4] {
    [
        is_req_query_access as Predicate<'t, HandlerFact>,
        is_req_body_destructure as Predicate<'t, HandlerFact>,
        is_req_body_access as Predicate<'t, HandlerFact>,
        is_res_response as Predicate<'t, HandlerFact>,
    ]
}

/// Matches a candidate route registration call.
pub fn is_route_call<'t>(node: &Node<'t>, source: &[u8]) -> Option<RouteCall<'t>> {
    if node.kind() != "call_expression" {
        return None;
    }
    let callee = node.child_by_field_name("function")?;
    let (object, property) = member_parts(&callee, source)?;
    if object != "router" && object != "app" {
        return None;
    }
    let method = HttpMethod::parse(property)?;
    Some(RouteCall { node: *node, method })
}

/// Matches `req.query.<name>`.
pub fn is_req_query_access(node: &Node, source: &[u8]) -> Option<HandlerFact> {
    req_member_field(node, source, "query").map(HandlerFact::QueryParam)
}

/// Matches `req.body.<name>`.
pub fn is_req_body_access(node: &Node, source: &[u8]) -> Option<HandlerFact> {
    req_member_field(node, source, "body").map(|name| HandlerFact::BodyFields {
        names: vec![name],
        required: false,
    })
}

/// Matches `const { a, b: renamed, c = 1 } = req.body`.
pub fn is_req_body_destructure(node: &Node, source: &[u8]) -> Option<HandlerFact> {
    if node.kind() != "variable_declarator" {
        return None;
    }
    let pattern = node.child_by_field_name("name")?;
    let value = node.child_by_field_name("value")?;
    if pattern.kind() != "object_pattern" || !is_req_property(&value, source, "body") {
        return None;
    }

    let mut names = Vec::new();
    let mut cursor = pattern.walk();
    for property in pattern.named_children(&mut cursor) {
        let name_node = match property.kind() {
            "shorthand_property_identifier_pattern" => Some(property),
            "pair_pattern" => property.child_by_field_name("key"),
            "object_assignment_pattern" => property.child_by_field_name("left"),
            _ => None,
        };
        if let Some(text) = name_node.and_then(|n| n.utf8_text(source).ok()) {
            names.push(text.to_string());
        }
    }
    Some(HandlerFact::BodyFields {
        names,
        required: true,
    })
}

/// Matches `res.status(<int>).json|send(...)` and bare `res.json|send(...)`.
pub fn is_res_response(node: &Node, source: &[u8]) -> Option<HandlerFact> {
    if node.kind() != "call_expression" {
        return None;
    }
    let callee = node.child_by_field_name("function")?;
    if callee.kind() != "member_expression" {
        return None;
    }
    let sender = callee.child_by_field_name("property")?.utf8_text(source).ok()?;
    let content_type = match sender {
        "json" => "application/json",
        "send" => "text/plain",
        _ => return None,
    };

    let receiver = callee.child_by_field_name("object")?;
    let status_code = match receiver.kind() {
        "identifier" if receiver.utf8_text(source).ok()? == "res" => 200,
        "call_expression" => explicit_status(&receiver, source)?,
        _ => return None,
    };

    let schema = if sender == "json" {
        call_arguments(node)
            .first()
            .and_then(|arg| infer_from_literal(arg, source))
    } else {
        None
    };

    Some(HandlerFact::Response(ResponseRecord {
        status_code,
        description: status_description(status_code).to_string(),
        content_type: content_type.to_string(),
        schema,
    }))
}

/// Status code of a `res.status(<int>)` call
fn explicit_status(call: &Node, source: &[u8]) -> Option<u16> {
    let callee = call.child_by_field_name("function")?;
    let (object, property) = member_parts(&callee, source)?;
    if object != "res" || property != "status" {
        return None;
    }
    let arg = call_arguments(call).into_iter().next()?;
    if arg.kind() != "number" {
        return None;
    }
    arg.utf8_text(source).ok()?.parse().ok()
}

/// `<req>.<field>.<name>` where the inner access is `req.<field>`
fn req_member_field(node: &Node, source: &[u8], field: &str) -> Option<String> {
    if node.kind() != "member_expression" {
        return None;
    }
    let object = node.child_by_field_name("object")?;
    if !is_req_property(&object, source, field) {
        return None;
    }
    let property = node.child_by_field_name("property")?;
    if property.kind() != "property_identifier" {
        return None;
    }
    property.utf8_text(source).ok().map(str::to_string)
}

/// Whether `node` is exactly `req.<field>`
fn is_req_property(node: &Node, source: &[u8], field: &str) -> bool {
    member_parts(node, source) == Some(("req", field))
}

/// `(object, property)` of a member access whose object is a plain identifier
fn member_parts<'s>(node: &Node, source: &'s [u8]) -> Option<(&'s str, &'s str)> {
    if node.kind() != "member_expression" {
        return None;
    }
    let object = node.child_by_field_name("object")?;
    if object.kind() != "identifier" {
        return None;
    }
    let property = node.child_by_field_name("property")?;
    Some((object.utf8_text(source).ok()?, property.utf8_text(source).ok()?))
}

/// Named argument nodes of a call, skipping comments
pub fn call_arguments<'t>(call: &Node<'t>) -> Vec<Node<'t>> {
    let Some(args) = call.child_by_field_name("arguments") else {
        return Vec::new();
    };
    let mut cursor = args.walk();
    args.named_children(&mut cursor)
        .filter(|arg| arg.kind() != "comment")
        .collect()
}
