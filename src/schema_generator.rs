//! Best-effort schemas inferred from literal response shapes.
//!
//! Handlers rarely declare their response types, so the only structure available is the
//! literal passed to `res.json(...)`. Inference is shallow: an object literal yields one
//! property per key typed from the value's literal kind, an array literal yields an array of
//! objects. Anything else is `unknown`.

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tree_sitter::Node;

/// Structural type descriptor attached to a detected response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InferredSchema {
    Object {
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        properties: BTreeMap<String, InferredSchema>,
    },
    Array {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        items: Option<Box<InferredSchema>>,
    },
    String,
    Number,
    Boolean,
    Unknown,
}

impl InferredSchema {
    /// An object schema without known properties
    pub fn empty_object() -> Self {
        InferredSchema::Object {
            properties: BTreeMap::new(),
        }
    }

    /// JSON form used inside OpenAPI documents
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Infer a response schema from the argument passed to `res.json(...)`.
///
/// Returns `None` unless the argument is an object or array literal.
pub fn infer_from_literal(node: &Node, source: &[u8]) -> Option<InferredSchema> {
    match node.kind() {
        "object" => {
            let mut properties = BTreeMap::new();
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                match child.kind() {
                    "pair" => {
                        let key = child.child_by_field_name("key").and_then(|k| property_key(&k, source));
                        let value = child.child_by_field_name("value");
                        if let (Some(key), Some(value)) = (key, value) {
                            properties.entry(key).or_insert_with(|| literal_kind(&value));
                        }
                    }
                    "shorthand_property_identifier" => {
                        if let Ok(name) = child.utf8_text(source) {
                            properties
                                .entry(name.to_string())
                                .or_insert(InferredSchema::Unknown);
                        }
                    }
                    _ => {}
                }
            }
            debug!("Inferred object schema with {} properties", properties.len());
            Some(InferredSchema::Object { properties })
        }
        "array" => Some(InferredSchema::Array {
            items: Some(Box::new(InferredSchema::empty_object())),
        }),
        _ => None,
    }
}

/// Type of a property value, judged from its literal kind only
fn literal_kind(node: &Node) -> InferredSchema {
    match node.kind() {
        "array" => InferredSchema::Array { items: None },
        "number" => InferredSchema::Number,
        "string" => InferredSchema::String,
        "true" | "false" => InferredSchema::Boolean,
        _ => InferredSchema::Unknown,
    }
}

fn property_key(node: &Node, source: &[u8]) -> Option<String> {
    let text = node.utf8_text(source).ok()?;
    match node.kind() {
        "property_identifier" | "number" => Some(text.to_string()),
        "string" => Some(unquote(text)),
        _ => None,
    }
}

/// Strip the surrounding quote characters of a string literal
pub fn unquote(text: &str) -> String {
    let mut chars = text.chars();
    match (chars.next(), chars.next_back()) {
        (Some(open), Some(close)) if open == close && matches!(open, '\'' | '"' | '`') => {
            chars.as_str().to_string()
        }
        _ => text.to_string(),
    }
}

/// Closed naming rules for reusable response schemas; the first matching rule wins.
const COMPONENT_RULES: &[(&[&str], &str)] = &[
    (&["id", "name", "email"], "User"),
    (&["id", "name", "price"], "Product"),
    (&["message"], "ErrorResponse"),
];

/// Canonical component name for an object schema, judged by its property set.
///
/// Schemas matching no rule stay inline.
pub fn component_name(schema: &Value) -> Option<&'static str> {
    if schema.get("type").and_then(Value::as_str) != Some("object") {
        return None;
    }
    let keys: BTreeSet<&str> = schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| props.keys().map(String::as_str).collect())
        .unwrap_or_default();

    COMPONENT_RULES
        .iter()
        .find(|(required, _)| required.iter().all(|key| keys.contains(key)))
        .map(|(_, name)| *name)
}
