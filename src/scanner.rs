use crate::detector::ExpressDetector;
use anyhow::{Context, Result};
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Source file extensions considered by the scanner.
const SOURCE_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx", "mjs", "cjs"];

/// Directory names never descended into.
const SKIPPED_DIRECTORIES: &[&str] = &["node_modules", "dist", "build", "coverage"];

/// File scanner for traversing project directories.
///
/// The `FileScanner` recursively walks through a project directory to find all JavaScript and
/// TypeScript source files. It automatically skips dependency and build output directories
/// such as `node_modules` and `dist`, and hidden directories (those starting with `.`).
///
/// # Example
///
/// ```no_run
/// use openapi_from_express::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./my-project"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} source files", result.source_files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
}

/// Result of directory scanning operation.
///
/// Contains the list of discovered files and any warnings encountered during scanning.
pub struct ScanResult {
    /// Discovered source files, conventional route modules first
    pub source_files: Vec<PathBuf>,
    /// Warning messages for any issues encountered (e.g., inaccessible directories)
    pub warnings: Vec<String>,
}

impl FileScanner {
    /// Creates a new `FileScanner` for the specified root directory.
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Scans the directory tree and collects all source files.
    ///
    /// If any directories or files cannot be accessed, warnings are logged and added to
    /// the result, but scanning continues. Files under route-like directories or with
    /// route-like names are listed first; only the part of the path below the root counts.
    /// Order is otherwise the walk order.
    pub fn scan(&self) -> Result<ScanResult> {
        let mut source_files = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                // Don't filter the root directory itself
                if e.path() == self.root_path {
                    return true;
                }

                let file_name = e.file_name().to_string_lossy();
                let is_hidden = file_name.starts_with('.');
                let is_skipped =
                    e.file_type().is_dir() && SKIPPED_DIRECTORIES.contains(&file_name.as_ref());

                !is_hidden && !is_skipped
            })
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file() && is_source_file(path) {
                        source_files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    // Record warning for inaccessible directories/files
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        // Rank on the project-relative path; stable sort keeps walk order within each group
        source_files.sort_by_key(|p| {
            let relative = p.strip_prefix(&self.root_path).unwrap_or(p);
            !ExpressDetector::is_conventional_route_path(relative)
        });

        Ok(ScanResult {
            source_files,
            warnings,
        })
    }
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| SOURCE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Reads a source file as text.
pub fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn file_names(result: &ScanResult) -> Vec<String> {
        result
            .source_files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_scan_normal_directory() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("app.js"), "const app = express();").unwrap();
        fs::write(root.join("server.ts"), "app.listen(3000);").unwrap();
        fs::write(root.join("readme.md"), "# README").unwrap();

        let scanner = FileScanner::new(root.to_path_buf());
        let result = scanner.scan().unwrap();

        assert_eq!(result.source_files.len(), 2);
        assert!(result.warnings.is_empty());

        let names = file_names(&result);
        assert!(names.contains(&"app.js".to_string()));
        assert!(names.contains(&"server.ts".to_string()));
    }

    #[test]
    fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();

        let scanner = FileScanner::new(temp_dir.path().to_path_buf());
        let result = scanner.scan().unwrap();

        assert_eq!(result.source_files.len(), 0);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_scan_skips_dependency_and_hidden_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("node_modules/express")).unwrap();
        fs::write(root.join("node_modules/express/index.js"), "module.exports = {};").unwrap();
        fs::create_dir(root.join(".cache")).unwrap();
        fs::write(root.join(".cache/tmp.js"), "// cache").unwrap();
        fs::create_dir(root.join("dist")).unwrap();
        fs::write(root.join("dist/bundle.js"), "// bundle").unwrap();
        fs::write(root.join("index.js"), "// entry").unwrap();

        let scanner = FileScanner::new(root.to_path_buf());
        let result = scanner.scan().unwrap();

        assert_eq!(file_names(&result), vec!["index.js".to_string()]);
    }

    #[test]
    fn test_scan_lists_route_modules_first() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("src/routes")).unwrap();
        fs::create_dir_all(root.join("src/lib")).unwrap();
        fs::write(root.join("src/lib/a.js"), "").unwrap();
        fs::write(root.join("src/routes/users.js"), "").unwrap();
        fs::write(root.join("src/lib/b.tsx"), "").unwrap();

        let scanner = FileScanner::new(root.to_path_buf());
        let result = scanner.scan().unwrap();

        assert_eq!(
            file_names(&result),
            vec!["users.js".to_string(), "a.js".to_string(), "b.tsx".to_string()]
        );
    }

    #[test]
    fn test_scan_ignores_route_names_above_the_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("api/project");

        fs::create_dir_all(root.join("src/routes")).unwrap();
        fs::create_dir_all(root.join("src/lib")).unwrap();
        fs::write(root.join("src/lib/a.js"), "").unwrap();
        fs::write(root.join("src/routes/users.js"), "").unwrap();

        let scanner = FileScanner::new(root);
        let result = scanner.scan().unwrap();

        assert_eq!(
            file_names(&result),
            vec!["users.js".to_string(), "a.js".to_string()]
        );
    }

    #[test]
    fn test_read_file_missing() {
        let err = read_file(Path::new("/nonexistent/routes.js")).unwrap_err();
        assert!(err.to_string().contains("Failed to read file"));
    }
}
