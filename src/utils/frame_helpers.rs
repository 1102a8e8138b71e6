//! DataFrame helpers for the tabular sources
//!
//! Upstream CSVs are exported by hand and padded inconsistently, so every
//! header lookup goes through `normalize_header` and every cell is trimmed.

use crate::error::QueryError;
use polars::prelude::*;
use std::path::Path;

/// Read a CSV with a header row, keeping every column as text
///
/// Schema inference is disabled so numeric-looking columns stay strings and
/// coercion (ranks, dates) happens in one place with our defaults.
pub fn read_text_csv(path: &Path) -> Result<DataFrame, QueryError> {
    if !path.exists() {
        return Err(QueryError::SourceMissing {
            path: path.to_path_buf(),
        });
    }

    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|e| QueryError::MalformedTable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Canonical form of a header: trimmed, lowercase, alphanumerics only
///
/// "Start Date", "start_date" and " START-DATE " all map to "startdate".
pub fn normalize_header(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// All column names of the frame, as stored (untrimmed)
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

/// First column whose normalized header matches one of the aliases
pub fn find_column(df: &DataFrame, aliases: &[&str]) -> Option<String> {
    let wanted: Vec<String> = aliases.iter().map(|a| normalize_header(a)).collect();
    column_names(df)
        .into_iter()
        .find(|name| wanted.contains(&normalize_header(name)))
}

/// Trimmed cell values of a named column; blank cells become `None`
pub fn text_values(df: &DataFrame, column: &str, path: &Path) -> Result<Vec<Option<String>>, QueryError> {
    let series = df
        .column(column)
        .and_then(|c| c.str())
        .map_err(|e| QueryError::MalformedTable {
            path: path.to_path_buf(),
            reason: format!("column '{}': {}", column, e),
        })?;

    Ok(series
        .into_iter()
        .map(|cell| {
            cell.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .collect())
}

/// Resolve a required column by alias and return its trimmed values
///
/// # Errors
/// `MissingColumn` naming the first alias when no header matches.
pub fn require_text_column(
    df: &DataFrame,
    aliases: &[&str],
    path: &Path,
) -> Result<Vec<Option<String>>, QueryError> {
    let column = find_column(df, aliases).ok_or_else(|| QueryError::MissingColumn {
        path: path.to_path_buf(),
        column: aliases.first().map(|s| s.to_string()).unwrap_or_default(),
        available: column_names(df),
    })?;

    text_values(df, &column, path)
}
