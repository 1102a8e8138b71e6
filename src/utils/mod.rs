//! Shared helpers for loading and normalising source tables
//!
//! - Frame helpers: CSV reading, header normalisation, column validation
//! - Dates: day-first parsing and display formatting

pub mod frame_helpers;
pub mod dates;

pub use frame_helpers::{read_text_csv, normalize_header, require_text_column};
pub use dates::{parse_day_first, format_day_first};
