//! Source Table Loading
//!
//! Loads the channel hierarchy and rotation plan CSVs using Polars.
//! Both tables are read fresh for every query; nothing here is cached.

use crate::error::QueryError;
use crate::hierarchy::ChannelHierarchy;
use crate::rotation::{RotationPeriod, RotationPlan};
use crate::utils::frame_helpers::{column_names, find_column, normalize_header, text_values};
use crate::utils::{parse_day_first, read_text_csv, require_text_column};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

/// Accepted headers for each hierarchy field (matched after normalisation)
pub const CHANNEL_NAME_COLUMNS: &[&str] = &["channel_name", "CHANNEL_NA"];
pub const PARENT_CHANNEL_COLUMNS: &[&str] = &["parent_channel", "PARENT_CHA"];
pub const CHANNEL_TYPE_COLUMNS: &[&str] = &["channel_type", "CHANNEL_TY"];

/// Accepted headers for the rotation interval
pub const START_DATE_COLUMNS: &[&str] = &["start_date", "Start Date"];
pub const END_DATE_COLUMNS: &[&str] = &["end_date", "End Date"];

/// One row of the channel hierarchy, already trimmed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyRecord {
    pub channel_name: String,
    pub parent_channel: Option<String>,
    pub channel_type: Option<String>,
}

impl HierarchyRecord {
    pub fn new(channel_name: &str, parent_channel: Option<&str>, channel_type: Option<&str>) -> Self {
        Self {
            channel_name: channel_name.to_string(),
            parent_channel: parent_channel.map(str::to_string),
            channel_type: channel_type.map(str::to_string),
        }
    }
}

/// Locations of the two tabular sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSources {
    pub hierarchy: PathBuf,
    pub rotation: PathBuf,
}

impl TableSources {
    pub fn new(hierarchy: impl Into<PathBuf>, rotation: impl Into<PathBuf>) -> Self {
        Self {
            hierarchy: hierarchy.into(),
            rotation: rotation.into(),
        }
    }

    /// Load both tables
    pub fn load(&self, distributary_tag: &str) -> Result<(ChannelHierarchy, RotationPlan), QueryError> {
        let hierarchy = load_hierarchy(&self.hierarchy, distributary_tag)?;
        let rotation = load_rotation_plan(&self.rotation)?;
        Ok((hierarchy, rotation))
    }
}

/// Read hierarchy rows from CSV
///
/// Rows without a channel name are dropped; they cannot be reached by lookup.
pub fn load_hierarchy_records(path: &Path) -> Result<Vec<HierarchyRecord>, QueryError> {
    let df = read_text_csv(path)?;

    let names = require_text_column(&df, CHANNEL_NAME_COLUMNS, path)?;
    let parents = require_text_column(&df, PARENT_CHANNEL_COLUMNS, path)?;
    let types = require_text_column(&df, CHANNEL_TYPE_COLUMNS, path)?;

    let records: Vec<HierarchyRecord> = names
        .into_iter()
        .zip(parents)
        .zip(types)
        .filter_map(|((name, parent_channel), channel_type)| {
            name.map(|channel_name| HierarchyRecord {
                channel_name,
                parent_channel,
                channel_type,
            })
        })
        .collect();

    tracing::debug!("Loaded {} hierarchy rows from {:?}", records.len(), path);
    Ok(records)
}

/// Read the hierarchy CSV into a lookup table
pub fn load_hierarchy(path: &Path, distributary_tag: &str) -> Result<ChannelHierarchy, QueryError> {
    let records = load_hierarchy_records(path)?;
    let hierarchy = ChannelHierarchy::from_records(&records, distributary_tag);
    tracing::debug!("Hierarchy covers {} channels", hierarchy.len());
    Ok(hierarchy)
}

/// Read the rotation plan CSV
///
/// Every column other than the two date columns is a group column keyed by its
/// trimmed header. Cells are kept only when they parse as a number; the rest
/// fall back to the lowest rank at lookup time.
pub fn load_rotation_plan(path: &Path) -> Result<RotationPlan, QueryError> {
    let df = read_text_csv(path)?;

    let start_col = find_column(&df, START_DATE_COLUMNS).ok_or_else(|| missing(path, START_DATE_COLUMNS, &df))?;
    let end_col = find_column(&df, END_DATE_COLUMNS).ok_or_else(|| missing(path, END_DATE_COLUMNS, &df))?;

    let starts = text_values(&df, &start_col, path)?;
    let ends = text_values(&df, &end_col, path)?;

    let mut group_columns: Vec<(String, Vec<Option<String>>)> = Vec::new();
    for column in column_names(&df) {
        if column == start_col || column == end_col {
            continue;
        }
        let group = column.trim().to_string();
        if group.is_empty() || normalize_header(&group).is_empty() {
            continue;
        }
        let values = text_values(&df, &column, path)?;
        group_columns.push((group, values));
    }

    let periods: Vec<RotationPeriod> = (0..df.height())
        .map(|row| {
            let mut ranks = FxHashMap::default();
            for (group, values) in &group_columns {
                if let Some(rank) = values[row].as_deref().and_then(parse_rank) {
                    ranks.insert(group.clone(), rank);
                }
            }
            RotationPeriod {
                start_date: starts[row].as_deref().and_then(parse_day_first),
                end_date: ends[row].as_deref().and_then(parse_day_first),
                ranks,
            }
        })
        .collect();

    let groups = group_columns.into_iter().map(|(group, _)| group).collect();
    tracing::debug!("Loaded {} rotation periods from {:?}", periods.len(), path);

    Ok(RotationPlan::new(groups, periods))
}

/// Numeric rank, or `None` for anything that is not a finite number
pub fn parse_rank(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn missing(path: &Path, aliases: &[&str], df: &polars::prelude::DataFrame) -> QueryError {
    QueryError::MissingColumn {
        path: path.to_path_buf(),
        column: aliases.first().map(|s| s.to_string()).unwrap_or_default(),
        available: column_names(df),
    }
}
