//! End-to-end canal priority resolution
//!
//! Ties the classifier, the hierarchy walk and the availability lookup together.
//! A canal ends in exactly one of four outcomes:
//!
//! 1. `Direct`: listed in the taxonomy itself
//! 2. `Inherited`: not listed, but its nearest Distributary ancestor is
//! 3. `ParentNotInPlan`: a Distributary ancestor exists but is not listed either
//! 4. `NotFound`: no Distributary ancestor could be reached
//!
//! Load failures are the only errors. `query_canal` folds them into an
//! `ErrorPayload` so the host (CLI or HTTP) always has one well-formed object to emit.

use crate::data::TableSources;
use crate::error::{ErrorPayload, QueryError};
use crate::hierarchy::{ChannelHierarchy, DEFAULT_DISTRIBUTARY_TAG};
use crate::rotation::{Availability, RotationPlan};
use crate::taxonomy::{Classification, PriorityTaxonomy};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

pub const MSG_NO_WINDOW_DIRECT: &str = "Canal is in the plan but no availability data for this week.";
pub const MSG_INHERITED: &str = "Canal is not directly in the plan, but its parent is.";
pub const MSG_NO_WINDOW_INHERITED: &str =
    "No availability data found for the parent distributary in the current week.";
pub const MSG_PARENT_NOT_IN_PLAN: &str = "Canal and its parent are not in the rotational plan.";
pub const MSG_NOT_FOUND: &str = "No Canal found in the Rabi Season.";

/// Terminal state of a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Direct,
    Inherited,
    ParentNotInPlan,
    NotFound,
}

impl Outcome {
    /// Whether a classification was found (directly or through a parent)
    pub fn is_classified(&self) -> bool {
        matches!(self, Outcome::Direct | Outcome::Inherited)
    }
}

/// Result of resolving one canal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub canal: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_canal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<Availability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip)]
    pub outcome: Outcome,
}

impl Resolution {
    fn new(canal: &str, outcome: Outcome) -> Self {
        Self {
            canal: canal.to_string(),
            parent_canal: None,
            priority_group: None,
            sub_group: None,
            availability: None,
            message: None,
            outcome,
        }
    }

    fn classified(mut self, classification: Classification) -> Self {
        self.priority_group = Some(classification.main_group);
        self.sub_group = Some(classification.sub_group);
        self
    }

    fn message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }
}

/// Output of a query: a resolution or a single error payload, never both
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryResponse {
    Resolved(Resolution),
    Failed(ErrorPayload),
}

impl QueryResponse {
    pub fn is_error(&self) -> bool {
        matches!(self, QueryResponse::Failed(_))
    }
}

impl From<Result<Resolution, QueryError>> for QueryResponse {
    fn from(result: Result<Resolution, QueryError>) -> Self {
        match result {
            Ok(resolution) => QueryResponse::Resolved(resolution),
            Err(err) => {
                tracing::error!("Canal query failed: {}", err);
                QueryResponse::Failed(ErrorPayload::from(&err))
            }
        }
    }
}

/// Resolves canal names to priority classification and availability
#[derive(Debug, Clone)]
pub struct PriorityResolver {
    taxonomy: Arc<PriorityTaxonomy>,
    distributary_tag: String,
}

impl PriorityResolver {
    pub fn new(taxonomy: Arc<PriorityTaxonomy>) -> Self {
        Self {
            taxonomy,
            distributary_tag: DEFAULT_DISTRIBUTARY_TAG.to_string(),
        }
    }

    pub fn with_distributary_tag(mut self, tag: &str) -> Self {
        self.distributary_tag = tag.to_string();
        self
    }

    pub fn taxonomy(&self) -> &PriorityTaxonomy {
        &self.taxonomy
    }

    pub fn distributary_tag(&self) -> &str {
        &self.distributary_tag
    }

    /// Resolve against already loaded tables
    pub fn resolve(
        &self,
        canal: &str,
        hierarchy: &ChannelHierarchy,
        rotation: &RotationPlan,
        today: NaiveDate,
    ) -> Resolution {
        let canal = canal.trim();

        if let Some(classification) = self.taxonomy.classify(canal) {
            tracing::debug!("'{}' is listed under {}/{}", canal, classification.main_group, classification.sub_group);
            let availability = rotation.availability(&classification.main_group, &classification.sub_group, today);

            let resolution = Resolution::new(canal, Outcome::Direct).classified(classification);
            return match availability {
                Some(window) => Resolution {
                    availability: Some(window),
                    ..resolution
                },
                None => resolution.message(MSG_NO_WINDOW_DIRECT),
            };
        }

        let Some(parent) = hierarchy.find_distributary(canal) else {
            tracing::debug!("'{}' has no reachable distributary", canal);
            return Resolution::new(canal, Outcome::NotFound).message(MSG_NOT_FOUND);
        };

        tracing::debug!(
            "'{}' resolves to distributary '{}' ({:?} hops)",
            canal,
            parent,
            hierarchy.depth_to_distributary(canal)
        );

        let Some(classification) = self.taxonomy.classify(parent) else {
            let mut resolution = Resolution::new(canal, Outcome::ParentNotInPlan).message(MSG_PARENT_NOT_IN_PLAN);
            resolution.parent_canal = Some(parent.to_string());
            return resolution;
        };

        let availability = rotation.availability(&classification.main_group, &classification.sub_group, today);

        let mut resolution = Resolution::new(canal, Outcome::Inherited).classified(classification);
        resolution.parent_canal = Some(parent.to_string());

        match availability {
            Some(window) => {
                resolution.availability = Some(window);
                resolution.message(MSG_INHERITED)
            }
            None => resolution.message(MSG_NO_WINDOW_INHERITED),
        }
    }

    /// Load both tables fresh and resolve for the given day
    pub fn query_on(&self, canal: &str, sources: &TableSources, today: NaiveDate) -> Result<Resolution, QueryError> {
        let (hierarchy, rotation) = sources.load(&self.distributary_tag)?;
        Ok(self.resolve(canal, &hierarchy, &rotation, today))
    }

    /// Load both tables fresh and resolve for the local date
    pub fn query(&self, canal: &str, sources: &TableSources) -> Result<Resolution, QueryError> {
        self.query_on(canal, sources, today())
    }

    /// Like `query`, but failures become an error payload
    pub fn query_canal(&self, canal: &str, sources: &TableSources) -> QueryResponse {
        self.query(canal, sources).into()
    }
}

/// Local calendar date
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::HierarchyRecord;
    use crate::rotation::{Rank, RotationPeriod};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn resolver() -> PriorityResolver {
        PriorityResolver::new(Arc::new(PriorityTaxonomy::rabi_default()))
    }

    fn hierarchy() -> ChannelHierarchy {
        let records = vec![
            HierarchyRecord::new("Unknown Minor", Some("Chamman Disty"), Some("M")),
            HierarchyRecord::new("Chamman Disty", Some("Panjnad Canal"), Some("D")),
            HierarchyRecord::new("Khanpur Minor", Some("Khanpur Disty"), Some("M")),
            HierarchyRecord::new("Khanpur Disty", Some("Panjnad Canal"), Some("D")),
        ];
        ChannelHierarchy::from_records(&records, "D")
    }

    fn rotation() -> RotationPlan {
        let groups = ["A", "A1", "A2", "B", "B1", "B2"].iter().map(|s| s.to_string()).collect();
        let ranks = [("A", 1.0), ("A1", 2.0), ("B", 2.0), ("B1", 1.0)]
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
        RotationPlan::new(
            groups,
            vec![RotationPeriod {
                start_date: Some(ymd(2026, 10, 12)),
                end_date: Some(ymd(2026, 10, 18)),
                ranks,
            }],
        )
    }

    #[test]
    fn test_direct_hit_with_window() {
        let r = resolver().resolve("Nal Disty", &hierarchy(), &rotation(), ymd(2026, 10, 15));

        assert_eq!(r.outcome, Outcome::Direct);
        assert_eq!(r.priority_group.as_deref(), Some("A"));
        assert_eq!(r.sub_group.as_deref(), Some("A1"));
        assert_eq!(r.parent_canal, None);
        assert_eq!(r.message, None);

        let window = r.availability.unwrap();
        assert_eq!(window.start_date, "12-10-2026");
        assert_eq!(window.end_date, "18-10-2026");
        assert_eq!(window.group_priority, Rank(1.0));
        assert_eq!(window.sub_group_priority, Rank(2.0));
    }

    #[test]
    fn test_direct_hit_without_window_keeps_classification() {
        let r = resolver().resolve("Nal Disty", &hierarchy(), &rotation(), ymd(2026, 11, 1));

        assert_eq!(r.outcome, Outcome::Direct);
        assert_eq!(r.priority_group.as_deref(), Some("A"));
        assert_eq!(r.availability, None);
        assert_eq!(r.message.as_deref(), Some(MSG_NO_WINDOW_DIRECT));
    }

    #[test]
    fn test_inherited_from_distributary() {
        let r = resolver().resolve("  Unknown Minor ", &hierarchy(), &rotation(), ymd(2026, 10, 15));

        assert_eq!(r.canal, "Unknown Minor");
        assert_eq!(r.outcome, Outcome::Inherited);
        assert_eq!(r.parent_canal.as_deref(), Some("Chamman Disty"));
        assert_eq!(r.priority_group.as_deref(), Some("A"));
        assert_eq!(r.sub_group.as_deref(), Some("A1"));
        assert!(r.availability.is_some());
        assert_eq!(r.message.as_deref(), Some(MSG_INHERITED));
    }

    #[test]
    fn test_inherited_without_window() {
        let r = resolver().resolve("Unknown Minor", &hierarchy(), &rotation(), ymd(2027, 1, 1));

        assert_eq!(r.outcome, Outcome::Inherited);
        assert_eq!(r.parent_canal.as_deref(), Some("Chamman Disty"));
        assert_eq!(r.sub_group.as_deref(), Some("A1"));
        assert_eq!(r.availability, None);
        assert_eq!(r.message.as_deref(), Some(MSG_NO_WINDOW_INHERITED));
    }

    #[test]
    fn test_parent_not_in_plan() {
        let r = resolver().resolve("Khanpur Minor", &hierarchy(), &rotation(), ymd(2026, 10, 15));

        assert_eq!(r.outcome, Outcome::ParentNotInPlan);
        assert_eq!(r.parent_canal.as_deref(), Some("Khanpur Disty"));
        assert_eq!(r.priority_group, None);
        assert_eq!(r.message.as_deref(), Some(MSG_PARENT_NOT_IN_PLAN));
    }

    #[test]
    fn test_not_found_serializes_canal_and_message_only() {
        let r = resolver().resolve("Nowhere Minor", &hierarchy(), &rotation(), ymd(2026, 10, 15));

        assert_eq!(r.outcome, Outcome::NotFound);
        assert!(!r.outcome.is_classified());
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            serde_json::json!({
                "canal": "Nowhere Minor",
                "message": "No Canal found in the Rabi Season."
            })
        );
    }

    #[test]
    fn test_response_serialization() {
        let ok: QueryResponse = Ok(resolver().resolve("Nal Disty", &hierarchy(), &rotation(), ymd(2026, 10, 15))).into();
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["availability"]["group_priority"], 1);
        assert_eq!(json["availability"]["sub_group_priority"], 2);

        let failed: QueryResponse = Err(QueryError::InvalidInput("empty".into())).into();
        assert!(failed.is_error());
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["kind"], "invalid_input");
        assert!(json.get("canal").is_none());
    }
}
