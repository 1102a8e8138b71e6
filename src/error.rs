//! Query error taxonomy
//!
//! Every failure during a single query ends up as one `QueryError`. Resolution
//! misses (unknown canal, no parent, no availability window) are NOT errors and
//! never reach this type; they are valid outcomes carried by `Resolution`.

use serde::Serialize;
use std::path::PathBuf;

/// Failure while loading sources or answering a query
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Source file does not exist
    #[error("Source not found: {}", path.display())]
    SourceMissing { path: PathBuf },

    /// File exists but could not be read as a table
    #[error("Failed to read table {}: {reason}", path.display())]
    MalformedTable { path: PathBuf, reason: String },

    /// Table is readable but lacks a required column
    #[error("Column '{column}' not found in {}. Available columns: {available:?}", path.display())]
    MissingColumn {
        path: PathBuf,
        column: String,
        available: Vec<String>,
    },

    /// Geometry layer (GeoJSON or shapefile) could not be parsed
    #[error("Invalid geometry layer {}: {reason}", path.display())]
    MalformedGeometry { path: PathBuf, reason: String },

    /// Layer declares a reference frame we cannot reproject
    #[error("Unsupported coordinate reference system '{crs}' in {}", path.display())]
    UnsupportedCrs { path: PathBuf, crs: String },

    /// Caller supplied an unusable argument (e.g. non-finite coordinate)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Service configuration could not be applied (taxonomy file, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Worker failure unrelated to the inputs
    #[error("Internal error: {0}")]
    Internal(String),
}

impl QueryError {
    /// Stable machine-readable discriminant for the error payload
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::SourceMissing { .. } => "source_missing",
            QueryError::MalformedTable { .. } => "malformed_table",
            QueryError::MissingColumn { .. } => "missing_column",
            QueryError::MalformedGeometry { .. } => "malformed_geometry",
            QueryError::UnsupportedCrs { .. } => "unsupported_crs",
            QueryError::InvalidInput(_) => "invalid_input",
            QueryError::Config(_) => "config",
            QueryError::Internal(_) => "internal",
        }
    }

    /// Whether the failure is on the service side (as opposed to bad input)
    pub fn is_source_failure(&self) -> bool {
        !matches!(self, QueryError::InvalidInput(_))
    }
}

/// Structured error result. The only output of a failed query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub error: String,
    pub kind: String,
}

impl From<&QueryError> for ErrorPayload {
    fn from(err: &QueryError) -> Self {
        Self {
            error: err.to_string(),
            kind: err.kind().to_string(),
        }
    }
}

impl From<QueryError> for ErrorPayload {
    fn from(err: QueryError) -> Self {
        ErrorPayload::from(&err)
    }
}
