//! Serialization module for converting OpenAPI documents to YAML or JSON format.
//!
//! This module provides functions to serialize OpenAPI documents into standard formats
//! and write them, or validation reports, to files.

use crate::openapi_builder::OpenApiDocument;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Serializes an OpenAPI document to YAML format.
///
/// Map keys are emitted in sorted order, so equal documents serialize identically.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_yaml(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to YAML");
    serde_yaml::to_string(doc).context("Failed to serialize OpenAPI document to YAML")
}

/// Serializes an OpenAPI document to JSON with 2-space indentation.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_json(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to JSON");
    serde_json::to_string_pretty(doc).context("Failed to serialize OpenAPI document to JSON")
}

/// Writes string content to a file.
///
/// Creates the file and any missing parent directories, or overwrites an existing file.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

/// Writes the YAML and JSON forms of a document next to each other.
///
/// `base` names the output without caring about its extension: `api/openapi.yaml` produces
/// `api/openapi.yaml` and `api/openapi.json`.
pub fn write_document_pair(doc: &OpenApiDocument, base: &Path) -> Result<(PathBuf, PathBuf)> {
    let yaml_path = base.with_extension("yaml");
    let json_path = base.with_extension("json");
    write_to_file(&serialize_yaml(doc)?, &yaml_path)?;
    write_to_file(&serialize_json(doc)?, &json_path)?;
    Ok((yaml_path, json_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{HttpMethod, ParameterKind, ParameterRecord, RouteRecord};
    use crate::openapi_builder::OpenApiBuilder;
    use tempfile::TempDir;

    /// Helper function to create a small finalized document for testing
    fn create_test_document() -> OpenApiDocument {
        let mut builder = OpenApiBuilder::new();
        builder.set_info("Test API", "1.0.0", Some("A test API".to_string()));
        let mut route = RouteRecord::new(HttpMethod::Get, "/users/:id", "getUser");
        route
            .parameters
            .push(ParameterRecord::new("id", ParameterKind::Path, true));
        builder.add_routes(&[route]);
        builder.finalize_document();
        builder.into_document()
    }

    #[test]
    fn test_serialize_yaml() {
        let doc = create_test_document();
        let yaml = serialize_yaml(&doc).unwrap();

        assert!(yaml.contains("openapi:"));
        assert!(yaml.contains("3.1.0"));
        assert!(yaml.contains("title: Test API"));
        assert!(yaml.contains("description: A test API"));
        assert!(yaml.contains("/users/{id}"));
        assert!(yaml.contains("operationId: getUser"));
    }

    #[test]
    fn test_serialize_json() {
        let doc = create_test_document();
        let json = serialize_json(&doc).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["openapi"], "3.1.0");
        assert_eq!(parsed["info"]["title"], "Test API");
        assert!(parsed["paths"]["/users/{id}"]["get"].is_object());
        assert_eq!(parsed["tags"][0]["name"], "Default");
    }

    #[test]
    fn test_serialize_json_uses_two_space_indent() {
        let doc = create_test_document();
        let json = serialize_json(&doc).unwrap();

        assert!(json.starts_with("{\n  \"openapi\""));
        assert!(json.lines().count() > 5);
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let first = create_test_document();
        let second = create_test_document();
        assert_eq!(serialize_yaml(&first).unwrap(), serialize_yaml(&second).unwrap());
        assert_eq!(serialize_json(&first).unwrap(), serialize_json(&second).unwrap());
    }

    #[test]
    fn test_write_to_file_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("subdir").join("nested").join("test.yaml");

        write_to_file("test content", &file_path).unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "test content");
    }

    #[test]
    fn test_write_to_file_overwrites_existing() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.yaml");

        write_to_file("initial content", &file_path).unwrap();
        write_to_file("new content", &file_path).unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "new content");
    }

    #[test]
    fn test_write_document_pair() {
        let temp_dir = TempDir::new().unwrap();
        let doc = create_test_document();

        let (yaml_path, json_path) =
            write_document_pair(&doc, &temp_dir.path().join("openapi.yaml")).unwrap();

        assert_eq!(yaml_path, temp_dir.path().join("openapi.yaml"));
        assert_eq!(json_path, temp_dir.path().join("openapi.json"));

        let from_yaml: OpenApiDocument =
            serde_yaml::from_str(&fs::read_to_string(&yaml_path).unwrap()).unwrap();
        let from_json: OpenApiDocument =
            serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(from_yaml, doc);
        assert_eq!(from_json, doc);
    }
}
