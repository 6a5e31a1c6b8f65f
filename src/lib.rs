//! OpenAPI From Express - OpenAPI documentation from Express.js route sources.
//!
//! This library statically analyzes JavaScript and TypeScript files for Express route
//! registrations (`router.get('/users/:id', handler)` and the `app.` equivalents) and turns
//! them into an OpenAPI 3.1 document. A chat-completion model can optionally write the
//! operations instead; its output is merged into the same document and falls back to the
//! generated operation whenever it cannot be used.
//!
//! # Architecture
//!
//! 1. [`scanner`] - Recursively scans project directories for source files
//! 2. [`detector`] - Cheap text heuristics for Express route modules
//! 3. [`parser`] - Parses sources into tree-sitter syntax trees
//! 4. [`extractor`] - Extracts route records through structural predicates
//! 5. [`schema_generator`] - Infers response schemas from object literals
//! 6. [`openapi_builder`] - Constructs the OpenAPI document and merges AI fragments
//! 7. [`prompt`] / [`client`] - Prompt rendering and the retrying completion client
//! 8. [`validator`] - Checks the document and renders a report
//! 9. [`serializer`] - Serializes the document to YAML or JSON
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_express::{
//!     extractor::{express::ExpressExtractor, RouteExtractor},
//!     openapi_builder::OpenApiBuilder,
//!     scanner::{read_file, FileScanner},
//!     serializer::serialize_yaml,
//! };
//! use std::path::PathBuf;
//!
//! let scan_result = FileScanner::new(PathBuf::from("./my-api")).scan().unwrap();
//!
//! let mut builder = OpenApiBuilder::new();
//! for path in &scan_result.source_files {
//!     let source = read_file(path).unwrap();
//!     let routes = ExpressExtractor.extract_routes(&source, &path.to_string_lossy());
//!     builder.add_routes(&routes);
//! }
//! builder.finalize_document();
//!
//! println!("{}", serialize_yaml(builder.document()).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod cli;
pub mod client;
pub mod scanner;
pub mod parser;
pub mod detector;
pub mod extractor;
pub mod schema_generator;
pub mod openapi_builder;
pub mod prompt;
pub mod serializer;
pub mod validator;
pub mod error;
