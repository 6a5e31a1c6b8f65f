use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tree_sitter::{Language, Node, Parser, Tree};

/// AST (Abstract Syntax Tree) parser for JavaScript and TypeScript sources.
///
/// The `AstParser` uses tree-sitter grammars that accept type annotations and JSX, so route
/// files written in plain JavaScript, TypeScript or TSX all parse with the same front end.
///
/// # Example
///
/// ```no_run
/// use openapi_from_express::parser::{AstParser, SourceDialect};
///
/// let parsed = AstParser::parse_source("router.get('/', home);", SourceDialect::Tsx).unwrap();
/// println!("Root node: {}", parsed.tree.root_node().kind());
/// ```
pub struct AstParser;

/// Grammar used to parse a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceDialect {
    /// TypeScript with JSX; also used for `.js`, `.jsx`, `.mjs` and `.cjs`
    Tsx,
    /// Plain TypeScript, which allows `<Type>value` assertions that TSX rejects
    TypeScript,
}

impl SourceDialect {
    /// Pick the grammar for a file by extension
    pub fn from_path(path: &str) -> Self {
        match Path::new(path).extension().and_then(|e| e.to_str()) {
            Some("ts") | Some("mts") | Some("cts") => SourceDialect::TypeScript,
            _ => SourceDialect::Tsx,
        }
    }

    fn language(&self) -> Language {
        match self {
            SourceDialect::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            SourceDialect::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        }
    }
}

/// A successfully parsed source text with its syntax tree.
#[derive(Debug)]
pub struct ParsedSource {
    /// The parsed syntax tree
    pub tree: Tree,
}

impl AstParser {
    /// Parses source text into a syntax tree.
    ///
    /// tree-sitter always produces a tree; a tree containing error or missing nodes is
    /// reported as a parse failure so callers never work on half-recovered syntax.
    ///
    /// # Errors
    ///
    /// Returns `Error::ParseError` if the grammar cannot be loaded or the text is not valid
    /// syntax for the dialect.
    pub fn parse_source(source: &str, dialect: SourceDialect) -> Result<ParsedSource> {
        let mut parser = Parser::new();
        parser
            .set_language(&dialect.language())
            .map_err(|e| Error::ParseError {
                file: PathBuf::new(),
                message: format!("Failed to load grammar: {}", e),
            })?;

        let tree = parser.parse(source, None).ok_or_else(|| Error::ParseError {
            file: PathBuf::new(),
            message: "Parser produced no syntax tree".to_string(),
        })?;

        let root = tree.root_node();
        if root.has_error() {
            let message = match first_error(root) {
                Some(node) => format!(
                    "Unexpected syntax at line {}, column {}",
                    node.start_position().row + 1,
                    node.start_position().column + 1
                ),
                None => "Unexpected syntax".to_string(),
            };
            return Err(Error::ParseError {
                file: PathBuf::new(),
                message,
            });
        }

        Ok(ParsedSource { tree })
    }
}

/// Leftmost error or missing node in pre-order
fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error())
        .find_map(first_error)
}
