use crate::client::{ClientConfig, CompletionClient, DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::detector::ExpressDetector;
use crate::error::Error;
use crate::extractor::express::ExpressExtractor;
use crate::extractor::{RouteExtractor, RouteRecord};
use crate::openapi_builder::{normalize_path, split_path_fragments, OpenApiBuilder, OpenApiDocument};
use crate::scanner::{read_file, FileScanner};
use crate::serializer::{serialize_json, serialize_yaml, write_document_pair, write_to_file};
use crate::validator::{generate_report, validate_openapi};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Lines of source handed to the model after a route's registration line.
const SNIPPET_LINES: usize = 30;

/// OpenAPI From Express - Generate OpenAPI documentation from Express.js route files
#[derive(Parser, Debug)]
#[command(name = "openapi-from-express")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the Express project directory
    #[arg(value_name = "PROJECT_PATH")]
    pub project_path: PathBuf,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// API title
    #[arg(long, default_value = "Express API")]
    pub title: String,

    /// API version
    #[arg(long = "api-version", default_value = "1.0.0")]
    pub api_version: String,

    /// API description
    #[arg(long)]
    pub description: Option<String>,

    /// Server URL
    #[arg(long = "server-url")]
    pub server_url: Option<String>,

    /// Server description
    #[arg(long = "server-description")]
    pub server_description: Option<String>,

    /// Document routes with a chat-completion model
    #[arg(long)]
    pub ai: bool,

    /// API key for the completion service
    #[arg(long = "api-key", env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model name
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Chat-completion endpoint
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Request timeout in seconds
    #[arg(long = "timeout-secs", default_value_t = 60)]
    pub timeout_secs: u64,

    /// Send one request per file instead of one per route
    #[arg(long)]
    pub batch: bool,

    /// Validate the generated document and print a report
    #[arg(long)]
    pub validate: bool,

    /// Write the validation report to this file (implies --validate)
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Extract from every source file, not only files that look like route modules
    #[arg(long = "all-files")]
    pub all_files: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
    /// YAML and JSON files side by side (requires --output)
    Both,
}

/// Routes extracted from one source file
#[derive(Debug)]
pub struct SourceRoutes {
    pub path: PathBuf,
    pub source: String,
    pub routes: Vec<RouteRecord>,
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args.project_path);

    if !args.project_path.exists() {
        anyhow::bail!(
            "Project path does not exist: {}",
            args.project_path.display()
        );
    }

    if !args.project_path.is_dir() {
        anyhow::bail!(
            "Project path is not a directory: {}",
            args.project_path.display()
        );
    }

    if args.output_format == OutputFormat::Both && args.output_path.is_none() {
        return Err(Error::InvalidArgument("--format both requires --output".to_string()).into());
    }

    if args.ai && args.api_key.as_deref().map(str::trim).unwrap_or("").is_empty() {
        return Err(Error::InvalidArgument(
            "--ai requires an API key (--api-key or OPENAI_API_KEY)".to_string(),
        )
        .into());
    }

    info!("Project path: {}", args.project_path.display());
    info!("Output format: {:?}", args.output_format);
    if let Some(ref output) = args.output_path {
        info!("Output file: {}", output.display());
    } else {
        info!("Output: stdout");
    }
    if args.ai {
        info!(
            "AI documentation: {} ({})",
            args.model,
            if args.batch { "batch" } else { "per route" }
        );
    }

    Ok(args)
}

/// Scan the project and extract routes file by file.
///
/// Unreadable files and files without Express markers are skipped; a file that fails to
/// parse contributes no routes.
pub fn collect_routes(project_path: &Path, all_files: bool) -> Result<Vec<SourceRoutes>> {
    info!("Scanning project directory...");
    let scan_result = FileScanner::new(project_path.to_path_buf()).scan()?;

    info!("Found {} source files", scan_result.source_files.len());
    if scan_result.source_files.is_empty() {
        anyhow::bail!("No JavaScript or TypeScript files found in the project directory");
    }

    let extractor = ExpressExtractor;
    let mut collected = Vec::new();

    for path in scan_result.source_files {
        let source = match read_file(&path) {
            Ok(source) => source,
            Err(e) => {
                warn!("{:#}", e);
                continue;
            }
        };

        if !all_files && !ExpressDetector::looks_like_routes_file(&source) {
            debug!("Skipping {}: no Express markers", path.display());
            continue;
        }

        let routes = extractor.extract_routes(&source, &path.to_string_lossy());
        debug!("Extracted {} routes from {}", routes.len(), path.display());
        if !routes.is_empty() {
            collected.push(SourceRoutes {
                path,
                source,
                routes,
            });
        }
    }

    Ok(collected)
}

/// Source lines starting at the route's registration call
fn handler_snippet(source: &str, line_number: Option<usize>) -> Option<String> {
    let start = line_number?.checked_sub(1)?;
    let snippet: Vec<&str> = source.lines().skip(start).take(SNIPPET_LINES).collect();
    if snippet.is_empty() {
        None
    } else {
        Some(snippet.join("\n"))
    }
}

/// Document every route through the completion client.
///
/// A failed request falls back to the generated operation for the affected routes. The
/// cancellation flag is checked before each request.
pub async fn document_with_ai(
    builder: &mut OpenApiBuilder,
    client: &CompletionClient,
    files: &[SourceRoutes],
    batch: bool,
    cancelled: &AtomicBool,
) -> crate::error::Result<()> {
    for file in files {
        if batch {
            if cancelled.load(Ordering::SeqCst) {
                return Err(Error::Cancelled);
            }
            info!(
                "Requesting documentation for {} routes in {}",
                file.routes.len(),
                file.path.display()
            );
            match client.generate_batch_documentation(&file.routes).await {
                Ok(yaml) => {
                    let fragments = split_path_fragments(&yaml);
                    for route in &file.routes {
                        let fragment = fragments
                            .get(&normalize_path(&route.path))
                            .map(String::as_str)
                            .unwrap_or_default();
                        builder.add_route_with_ai_doc(route, fragment);
                    }
                }
                Err(e) => {
                    warn!("AI documentation failed for {}: {}", file.path.display(), e);
                    builder.add_routes(&file.routes);
                }
            }
            continue;
        }

        for route in &file.routes {
            if cancelled.load(Ordering::SeqCst) {
                return Err(Error::Cancelled);
            }
            info!("Requesting documentation for {} {}", route.method, route.path);
            let snippet = handler_snippet(&file.source, route.line_number);
            match client.generate_documentation(route, snippet.as_deref()).await {
                Ok(yaml) => builder.add_route_with_ai_doc(route, &yaml),
                Err(e) => {
                    warn!("AI documentation failed for {} {}: {}", route.method, route.path, e);
                    builder.add_routes(std::slice::from_ref(route));
                }
            }
        }
    }

    Ok(())
}

/// Sets the returned flag when Ctrl-C is received
fn install_cancel_handler() -> Arc<AtomicBool> {
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Cancellation requested; stopping before the next request");
            flag.store(true, Ordering::SeqCst);
        }
    });
    cancelled
}

/// Write the document in the requested format(s), or print it when no output is given
fn write_output(document: &OpenApiDocument, args: &CliArgs) -> Result<()> {
    match (args.output_format, &args.output_path) {
        (OutputFormat::Both, Some(output_path)) => {
            let (yaml_path, json_path) = write_document_pair(document, output_path)?;
            info!(
                "Successfully wrote {} and {}",
                yaml_path.display(),
                json_path.display()
            );
        }
        (format, Some(output_path)) => {
            let content = match format {
                OutputFormat::Json => serialize_json(document)?,
                _ => serialize_yaml(document)?,
            };
            write_to_file(&content, output_path)?;
            info!("Successfully wrote OpenAPI document to {}", output_path.display());
        }
        (OutputFormat::Json, None) => println!("{}", serialize_json(document)?),
        (_, None) => println!("{}", serialize_yaml(document)?),
    }
    Ok(())
}

/// Run the main workflow
pub async fn run(args: CliArgs) -> Result<()> {
    info!("Starting OpenAPI document generation...");

    let files = collect_routes(&args.project_path, args.all_files)?;
    let route_count: usize = files.iter().map(|f| f.routes.len()).sum();
    info!("Extracted {} routes from {} files", route_count, files.len());
    if route_count == 0 {
        warn!("No routes found in the project");
    }

    let mut builder = OpenApiBuilder::new();
    builder.set_info(&args.title, &args.api_version, args.description.clone());
    if let Some(url) = &args.server_url {
        builder.set_server(url, args.server_description.clone());
    }

    if args.ai {
        let mut config = ClientConfig::new(args.api_key.clone().unwrap_or_default());
        config.endpoint = args.endpoint.clone();
        config.model = args.model.clone();
        config.timeout = Duration::from_secs(args.timeout_secs);
        let client = CompletionClient::new(config).map_err(Error::from)?;

        if !client.test_connection().await {
            warn!("Connection test failed; requests may fall back to generated operations");
        }

        let cancelled = install_cancel_handler();
        document_with_ai(&mut builder, &client, &files, args.batch, &cancelled).await?;
    } else {
        for file in &files {
            builder.add_routes(&file.routes);
        }
    }

    builder.finalize_document();
    let document = builder.into_document();
    info!("OpenAPI document built successfully");

    write_output(&document, &args)?;

    if args.validate || args.report.is_some() {
        let result = validate_openapi(&document);
        info!(
            "Validation: {} errors, {} warnings",
            result.errors.len(),
            result.warnings.len()
        );
        let report = generate_report(&result);
        match &args.report {
            Some(report_path) => {
                write_to_file(&report, report_path).context("Failed to write validation report")?;
                info!("Validation report written to {}", report_path.display());
            }
            None => eprintln!("{}", report),
        }
    }

    info!("Generation complete!");
    info!("Summary:");
    info!("  - Files with routes: {}", files.len());
    info!("  - Routes found: {}", route_count);
    info!("  - Paths documented: {}", document.path_count());
    info!("  - Operations documented: {}", document.operation_count());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{
        ChatChoice, ChatRequest, ChatResponse, ChatResponseMessage, CompletionTransport, Sleeper,
        TransportError,
    };
    use crate::extractor::HttpMethod;
    use async_trait::async_trait;
    use std::fs;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    /// Answers every request with the same content
    struct FixedTransport {
        content: Option<String>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CompletionTransport for FixedTransport {
        async fn post_chat(&self, _request: &ChatRequest) -> std::result::Result<ChatResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.content {
                Some(content) => Ok(ChatResponse {
                    choices: vec![ChatChoice {
                        message: ChatResponseMessage {
                            content: Some(content.clone()),
                        },
                    }],
                }),
                None => Err(TransportError::Status {
                    status: 401,
                    detail: None,
                }),
            }
        }
    }

    struct NoSleep;

    #[async_trait]
    impl Sleeper for NoSleep {
        async fn sleep(&self, _duration: Duration) {}
    }

    fn client(content: Option<&str>) -> (CompletionClient, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let transport = FixedTransport {
            content: content.map(str::to_string),
            calls: calls.clone(),
        };
        let client = CompletionClient::with_transport(
            ClientConfig::new("sk-test"),
            Box::new(transport),
            Box::new(NoSleep),
        );
        (client, calls)
    }

    fn users_file() -> Vec<SourceRoutes> {
        let mut list = RouteRecord::new(HttpMethod::Get, "/users", "listUsers");
        list.line_number = Some(1);
        let get = RouteRecord::new(HttpMethod::Get, "/users/:id", "getUser");
        vec![SourceRoutes {
            path: PathBuf::from("routes/users.js"),
            source: "router.get('/users', listUsers);\nrouter.get('/users/:id', getUser);".to_string(),
            routes: vec![list, get],
        }]
    }

    fn args(project: &Path, extra: &[&str]) -> CliArgs {
        let mut argv = vec!["openapi-from-express".to_string(), project.display().to_string()];
        argv.extend(extra.iter().map(|s| s.to_string()));
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let args = args(temp_dir.path(), &[]);

        assert_eq!(args.output_format, OutputFormat::Yaml);
        assert_eq!(args.title, "Express API");
        assert_eq!(args.api_version, "1.0.0");
        assert_eq!(args.timeout_secs, 60);
        assert!(!args.ai);
    }

    #[test]
    fn test_rejects_missing_project() {
        let args = args(Path::new("/nonexistent/project"), &[]);
        assert!(parse_args_from_parsed(args).is_err());
    }

    #[test]
    fn test_both_format_requires_output() {
        let temp_dir = TempDir::new().unwrap();
        let err = parse_args_from_parsed(args(temp_dir.path(), &["--format", "both"])).unwrap_err();
        assert!(err.to_string().contains("--format both requires --output"));
    }

    #[test]
    fn test_ai_requires_key() {
        let temp_dir = TempDir::new().unwrap();
        let err = parse_args_from_parsed(args(temp_dir.path(), &["--ai", "--api-key", " "])).unwrap_err();
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn test_handler_snippet() {
        let source = "a\nb\nc";
        assert_eq!(handler_snippet(source, Some(2)), Some("b\nc".to_string()));
        assert_eq!(handler_snippet(source, Some(9)), None);
        assert_eq!(handler_snippet(source, None), None);
        assert_eq!(handler_snippet(source, Some(0)), None);
    }

    #[test]
    fn test_collect_routes_respects_heuristic() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join("routes")).unwrap();
        fs::write(
            root.join("routes/users.js"),
            "const router = express.Router();\nrouter.get('/users', listUsers);\n",
        )
        .unwrap();
        fs::write(root.join("helpers.js"), "app.get('/hidden', hidden);\n").unwrap();
        fs::write(root.join("util.js"), "server.get('/nothing', x);\n").unwrap();

        let files = collect_routes(root, false).unwrap();
        let paths: Vec<&str> = files
            .iter()
            .flat_map(|f| f.routes.iter().map(|r| r.path.as_str()))
            .collect();
        assert_eq!(paths, vec!["/users", "/hidden"]);
    }

    #[tokio::test]
    async fn test_document_with_ai_merges_fragments() {
        let (client, calls) = client(Some("```yaml\n/users:\n  get:\n    summary: List all users\n    tags: [Users]\n    responses:\n      '200':\n        description: OK\n```"));
        let mut builder = OpenApiBuilder::new();
        let cancelled = AtomicBool::new(false);

        document_with_ai(&mut builder, &client, &users_file(), false, &cancelled)
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let doc = builder.document();
        assert_eq!(doc.paths["/users"]["get"]["summary"], "List all users");
        assert_eq!(doc.paths["/users/{id}"]["get"]["operationId"], "getUser");
        assert!(doc.tags.iter().any(|t| t.name == "Users"));
    }

    #[tokio::test]
    async fn test_document_with_ai_batch_splits_fragments() {
        let (client, calls) = client(Some(
            "/users:\n  get:\n    summary: List all users\n/users/{id}:\n  get:\n    summary: Fetch one user\n",
        ));
        let mut builder = OpenApiBuilder::new();
        let cancelled = AtomicBool::new(false);

        document_with_ai(&mut builder, &client, &users_file(), true, &cancelled)
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let doc = builder.document();
        assert_eq!(doc.paths["/users/{id}"]["get"]["summary"], "Fetch one user");
    }

    #[tokio::test]
    async fn test_document_with_ai_falls_back_on_failure() {
        let (client, _) = client(None);
        let mut builder = OpenApiBuilder::new();
        let cancelled = AtomicBool::new(false);

        document_with_ai(&mut builder, &client, &users_file(), false, &cancelled)
            .await
            .unwrap();

        assert_eq!(builder.document().operation_count(), 2);
    }

    #[tokio::test]
    async fn test_document_with_ai_honours_cancellation() {
        let (client, calls) = client(Some("/users:\n  get:\n    summary: x"));
        let mut builder = OpenApiBuilder::new();
        let cancelled = AtomicBool::new(true);

        let err = document_with_ai(&mut builder, &client, &users_file(), false, &cancelled)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_writes_both_formats_and_report() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(
            root.join("app.js"),
            "const express = require('express');\nconst app = express();\napp.get('/health', (req, res) => { res.json({ status: 'ok' }); });\n",
        )
        .unwrap();
        let out = root.join("out").join("openapi.yaml");
        let report = root.join("out").join("report.txt");

        let args = args(
            root,
            &[
                "--format",
                "both",
                "--output",
                out.to_str().unwrap(),
                "--report",
                report.to_str().unwrap(),
                "--title",
                "Health API",
            ],
        );
        run(args).await.unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(root.join("out/openapi.json")).unwrap()).unwrap();
        assert_eq!(json["info"]["title"], "Health API");
        assert!(json["paths"]["/health"]["get"].is_object());
        assert!(fs::read_to_string(&out).unwrap().contains("/health"));
        assert!(fs::read_to_string(&report).unwrap().contains("Status: VALID"));
    }
}
