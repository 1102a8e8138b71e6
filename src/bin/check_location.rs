//! Location check (command line)
//!
//! Prints one JSON object: `{"nearest_canals": [...]}`, `{"message": ...}`
//! or `{"error", "kind"}`. Layer paths come from the same environment
//! variables as the server (`DATA_DIR`, `DIVISIONS_LAYER`, `NETWORK_LAYER`).

use canal_priority::geospatial::check_location_response;
use canal_priority::{ErrorPayload, LocationResponse, QueryError, ServiceConfig};
use clap::{error::ErrorKind, Parser};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "check_location", version)]
#[command(about = "Whether a point lies in the command area, and the nearest canals", long_about = None)]
struct Args {
    /// Latitude in decimal degrees
    #[arg(allow_negative_numbers = true)]
    lat: f64,

    /// Longitude in decimal degrees
    #[arg(allow_negative_numbers = true)]
    lon: f64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "canal_priority=warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let response = match Args::try_parse() {
        Ok(args) => {
            let config = ServiceConfig::from_env();
            check_location_response(&config.geo_sources(), args.lon, args.lat, config.nearest_k)
        }
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => err.exit(),
        Err(err) => LocationResponse::Failed(ErrorPayload::from(QueryError::InvalidInput(
            err.to_string().trim().to_string(),
        ))),
    };

    let json = serde_json::to_value(&response)
        .unwrap_or_else(|e| serde_json::json!({"error": e.to_string(), "kind": "internal"}));
    println!("{}", json);
}
