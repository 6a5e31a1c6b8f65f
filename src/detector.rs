use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use std::path::Path;

lazy_static! {
    static ref ROUTE_CALL: Regex =
        Regex::new(r"\b(?:router|app)\.(?:get|post|put|delete|patch|options|head)\s*\(").unwrap();
    static ref EXPRESS_IMPORT: Regex = Regex::new(
        r#"(?:require\s*\(\s*['"]express['"]\s*\)|from\s+['"]express['"]|import\s+['"]express['"])"#
    )
    .unwrap();
}

/// Directory names that conventionally hold Express route modules.
const ROUTE_DIRECTORIES: &[&str] = &["routes", "routers", "controllers", "api", "endpoints"];

/// File stem fragments that conventionally mark Express route modules.
const ROUTE_STEM_HINTS: &[&str] = &["route", "router", "controller", "api"];

/// Express usage detector.
///
/// The `ExpressDetector` decides cheaply, from raw text, whether a file is worth parsing.
/// It looks for the tokens every Express route module carries:
/// - `express.Router()`
/// - a `router.<method>(` or `app.<method>(` call
/// - an `express` import or require
pub struct ExpressDetector;

impl ExpressDetector {
    /// Returns true if the text contains any Express-characteristic token.
    ///
    /// # Example
    ///
    /// ```
    /// use openapi_from_express::detector::ExpressDetector;
    ///
    /// assert!(ExpressDetector::looks_like_routes_file("const r = express.Router();"));
    /// assert!(!ExpressDetector::looks_like_routes_file("export const add = (a, b) => a + b;"));
    /// ```
    pub fn looks_like_routes_file(text: &str) -> bool {
        let matched = text.contains("express.Router()")
            || ROUTE_CALL.is_match(text)
            || EXPRESS_IMPORT.is_match(text);
        debug!("Routes-file heuristic matched: {}", matched);
        matched
    }

    /// Returns true if the path follows a route-module naming convention.
    ///
    /// Used to order candidates; files outside the conventions are still scanned.
    pub fn is_conventional_route_path(path: &Path) -> bool {
        let in_route_dir = path.parent().into_iter().flat_map(|p| p.components()).any(|c| {
            let name = c.as_os_str().to_string_lossy().to_lowercase();
            ROUTE_DIRECTORIES.contains(&name.as_str())
        });

        let stem_hint = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .map(|stem| ROUTE_STEM_HINTS.iter().any(|hint| stem.contains(hint)))
            .unwrap_or(false);

        in_route_dir || stem_hint
    }
}
