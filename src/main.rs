//! OpenAPI From Express - Command-line tool for generating OpenAPI documentation.
//!
//! Scans an Express.js project for route registrations and writes an OpenAPI 3.1 document,
//! optionally letting a chat-completion model write the operation descriptions.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-express [OPTIONS] <PROJECT_PATH>
//! ```
//!
//! # Examples
//!
//! Generate YAML documentation:
//! ```bash
//! openapi-from-express ./my-api -o openapi.yaml
//! ```
//!
//! Write YAML and JSON with a validation report:
//! ```bash
//! openapi-from-express ./my-api -f both -o docs/openapi.yaml --report docs/report.txt
//! ```
//!
//! Let a model document each route:
//! ```bash
//! OPENAI_API_KEY=sk-... openapi-from-express ./my-api --ai -o openapi.yaml
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_express::cli;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .init();

    info!("OpenAPI From Express starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args).await?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
