//! Rotation plan and weekly availability lookup
//!
//! A rotation plan is a list of scheduling periods. Each period carries a closed
//! date interval and a rank per group/sub-group column (lower = earlier turn).

use crate::utils::format_day_first;
use chrono::NaiveDate;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Serialize, Serializer};

/// Rank used when a cell is blank or not a number
pub const LOWEST_RANK: f64 = 999.0;

/// Priority rank of a group within one period
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rank(pub f64);

impl Rank {
    pub fn or_lowest(value: Option<f64>) -> Self {
        Rank(value.unwrap_or(LOWEST_RANK))
    }

    pub fn is_lowest(&self) -> bool {
        self.0 == LOWEST_RANK
    }
}

// Whole ranks go out as JSON integers ("1", not "1.0")
impl Serialize for Rank {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.fract() == 0.0 && self.0.abs() < i64::MAX as f64 {
            serializer.serialize_i64(self.0 as i64)
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

/// One row of the rotation plan
#[derive(Debug, Clone, Default)]
pub struct RotationPeriod {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// group identifier -> numeric rank; unparsable cells are absent
    pub ranks: FxHashMap<String, f64>,
}

impl RotationPeriod {
    /// Closed-interval containment; a period with a missing date contains nothing
    pub fn contains(&self, day: NaiveDate) -> bool {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => start <= day && day <= end,
            _ => false,
        }
    }

    pub fn rank(&self, group: &str) -> Rank {
        Rank::or_lowest(self.ranks.get(group).copied())
    }
}

/// Availability window for a classified canal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Availability {
    /// Day-month-year
    pub start_date: String,
    /// Day-month-year
    pub end_date: String,
    pub group_priority: Rank,
    pub sub_group_priority: Rank,
}

/// Full rotation table
#[derive(Debug, Clone, Default)]
pub struct RotationPlan {
    groups: FxHashSet<String>,
    periods: Vec<RotationPeriod>,
}

impl RotationPlan {
    pub fn new(groups: Vec<String>, periods: Vec<RotationPeriod>) -> Self {
        Self {
            groups: groups.into_iter().collect(),
            periods,
        }
    }

    /// Whether the table has a column for this group identifier
    pub fn has_group(&self, group: &str) -> bool {
        self.groups.contains(group)
    }

    pub fn periods(&self) -> &[RotationPeriod] {
        &self.periods
    }

    /// First period (in source order) whose interval contains `today`
    pub fn current_period(&self, today: NaiveDate) -> Option<&RotationPeriod> {
        self.periods.iter().find(|p| p.contains(today))
    }

    /// Availability for a (main group, sub-group) pair on `today`
    ///
    /// `None` when either identifier is not a column of the table, or when no
    /// period contains `today`. Missing or non-numeric ranks read as 999.
    pub fn availability(&self, main_group: &str, sub_group: &str, today: NaiveDate) -> Option<Availability> {
        if !self.has_group(main_group) || !self.has_group(sub_group) {
            tracing::debug!(
                "Rotation plan has no column for '{}' and/or '{}'",
                main_group, sub_group
            );
            return None;
        }

        let period = self.current_period(today)?;
        let (start, end) = (period.start_date?, period.end_date?);

        Some(Availability {
            start_date: format_day_first(start),
            end_date: format_day_first(end),
            group_priority: period.rank(main_group),
            sub_group_priority: period.rank(sub_group),
        })
    }
}
