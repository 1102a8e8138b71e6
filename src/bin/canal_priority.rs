//! Canal priority lookup (command line)
//!
//! Prints exactly one JSON object on stdout: the resolution, or `{"error", "kind"}`.
//! Logs go to stderr (`RUST_LOG=canal_priority=debug` for the walk details).
//!
//! `TAXONOMY_PATH` and `DISTRIBUTARY_TAG` are honoured as for the server.

use canal_priority::{ErrorPayload, QueryError, QueryResponse, ServiceConfig, TableSources};
use clap::{error::ErrorKind, Parser};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "canal_priority", version)]
#[command(about = "Priority group and this week's turn for a canal", long_about = None)]
struct Args {
    /// Canal hierarchy CSV (CHANNEL_NA, PARENT_CHA, CHANNEL_TY)
    hierarchy: PathBuf,

    /// Rotation plan CSV (Start Date, End Date, one column per group)
    rotation: PathBuf,

    /// Canal name; unquoted multi-word names are joined with single spaces
    #[arg(required = true, num_args = 1..)]
    canal: Vec<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "canal_priority=warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let response = match Args::try_parse() {
        Ok(args) => run(args),
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => err.exit(),
        Err(err) => QueryResponse::Failed(ErrorPayload::from(QueryError::InvalidInput(
            err.to_string().trim().to_string(),
        ))),
    };

    let json = serde_json::to_value(&response)
        .unwrap_or_else(|e| serde_json::json!({"error": e.to_string(), "kind": "internal"}));
    println!("{}", json);
}

fn run(args: Args) -> QueryResponse {
    let canal = args.canal.join(" ");

    let config = ServiceConfig::from_env();
    let resolver = match config.build_resolver() {
        Ok(resolver) => resolver,
        Err(e) => return QueryResponse::Failed(ErrorPayload::from(QueryError::Config(format!("{:#}", e)))),
    };

    resolver.query_canal(&canal, &TableSources::new(args.hierarchy, args.rotation))
}
