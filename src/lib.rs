//! Canal priority and location lookup for Rabi season water rotation
//!
//! Two independent components:
//! - `resolver`: canal name -> priority group, sub-group and this week's turn,
//!   inheriting from the nearest Distributary when a canal is not listed itself
//! - `geospatial`: user coordinate -> whether it lies in the command area, and
//!   the nearest canals when it does
//!
//! Supporting modules:
//! - `taxonomy`: the two-level priority configuration and direct classifier
//! - `hierarchy`: parent-pointer channel table and Distributary walk
//! - `rotation`: rotation plan periods and availability windows
//! - `data`: CSV loading with Polars
//! - `utils/`: header normalisation and day-first dates
//!
//! Sources are loaded fresh per query; nothing is cached between calls.

pub mod utils;
pub mod error;
pub mod taxonomy;
pub mod data;
pub mod hierarchy;
pub mod rotation;
pub mod resolver;
pub mod geospatial;
pub mod config;

// Axum server (feature-gated)
pub mod api_server;

// Re-export commonly used types
pub use error::{ErrorPayload, QueryError};
pub use taxonomy::{Classification, PriorityTaxonomy};
pub use data::TableSources;
pub use hierarchy::ChannelHierarchy;
pub use rotation::{Availability, Rank, RotationPlan};
pub use resolver::{Outcome, PriorityResolver, QueryResponse, Resolution};
pub use geospatial::{check_location, GeoSources, LocationResponse, LocationResult};
pub use config::ServiceConfig;

#[cfg(feature = "api")]
pub use api_server::{AppState, create_router};
