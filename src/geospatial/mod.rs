//! Geo lookup: which division contains a user, and which canals are closest
//!
//! - `crs`: reprojection of supported frames to WGS84
//! - `layers`: GeoJSON and shapefile loading for the division and network layers
//!
//! Distances are planar in lon/lat degrees. That is an approximation (a degree
//! of longitude is shorter than a degree of latitude away from the equator) and
//! is kept as-is until a projected or geodesic ranking is asked for.

pub mod crs;
pub mod layers;

pub use crs::Crs;
pub use layers::{DivisionLayer, NetworkFeature, NetworkLayer, DEFAULT_NAME_PROPERTY};

use crate::error::{ErrorPayload, QueryError};
use geo::{Contains, EuclideanDistance, Geometry, Point};
use serde::Serialize;
use std::path::PathBuf;

/// Number of canals reported by default
pub const DEFAULT_NEAREST_K: usize = 3;

pub const MSG_OUTSIDE_DIVISIONS: &str = "You are not in the division";

/// Locations of the two geospatial layers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoSources {
    pub divisions: PathBuf,
    pub network: PathBuf,
    pub name_property: String,
}

impl GeoSources {
    pub fn new(divisions: impl Into<PathBuf>, network: impl Into<PathBuf>) -> Self {
        Self {
            divisions: divisions.into(),
            network: network.into(),
            name_property: DEFAULT_NAME_PROPERTY.to_string(),
        }
    }

    pub fn with_name_property(mut self, name_property: &str) -> Self {
        self.name_property = name_property.to_string();
        self
    }
}

/// Outcome of a location check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LocationResult {
    Inside { nearest_canals: Vec<String> },
    Outside { message: String },
}

/// Location check result or a single error payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LocationResponse {
    Checked(LocationResult),
    Failed(ErrorPayload),
}

impl From<Result<LocationResult, QueryError>> for LocationResponse {
    fn from(result: Result<LocationResult, QueryError>) -> Self {
        match result {
            Ok(location) => LocationResponse::Checked(location),
            Err(err) => {
                tracing::error!("Location check failed: {}", err);
                LocationResponse::Failed(ErrorPayload::from(&err))
            }
        }
    }
}

impl DivisionLayer {
    /// Whether any division polygon contains the point
    ///
    /// Points exactly on a boundary are not contained.
    pub fn contains(&self, point: Point<f64>) -> bool {
        self.geometries.iter().any(|geometry| match geometry {
            Geometry::Polygon(polygon) => polygon.contains(&point),
            Geometry::MultiPolygon(polygons) => polygons.contains(&point),
            Geometry::Rect(rect) => rect.to_polygon().contains(&point),
            _ => false,
        })
    }
}

impl NetworkLayer {
    /// Names of the `k` features closest to the point
    ///
    /// Equal distances keep source order.
    pub fn nearest(&self, point: Point<f64>, k: usize) -> Vec<String> {
        let mut ranked: Vec<(f64, &str)> = self
            .features
            .iter()
            .filter_map(|f| planar_distance(&f.geometry, point).map(|d| (d, f.name.as_str())))
            .collect();

        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

        ranked.into_iter().take(k).map(|(_, name)| name.to_string()).collect()
    }
}

/// Planar distance from a point to a geometry, in the layer's units
pub fn planar_distance(geometry: &Geometry<f64>, point: Point<f64>) -> Option<f64> {
    let distance = match geometry {
        Geometry::Point(p) => point.euclidean_distance(p),
        Geometry::Line(line) => point.euclidean_distance(line),
        Geometry::LineString(line) => point.euclidean_distance(line),
        Geometry::Polygon(polygon) => point.euclidean_distance(polygon),
        Geometry::MultiLineString(lines) => min_distance(lines.0.iter().map(|l| point.euclidean_distance(l)))?,
        Geometry::MultiPolygon(polygons) => min_distance(polygons.0.iter().map(|p| point.euclidean_distance(p)))?,
        Geometry::MultiPoint(points) => min_distance(points.0.iter().map(|p| point.euclidean_distance(p)))?,
        _ => return None,
    };
    Some(distance)
}

fn min_distance(distances: impl Iterator<Item = f64>) -> Option<f64> {
    distances.min_by(|a, b| a.total_cmp(b))
}

/// Validate a WGS84 coordinate
pub fn user_point(lon: f64, lat: f64) -> Result<Point<f64>, QueryError> {
    if !lon.is_finite() || !lat.is_finite() {
        return Err(QueryError::InvalidInput(format!("coordinate ({}, {}) is not finite", lon, lat)));
    }
    if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
        return Err(QueryError::InvalidInput(format!(
            "coordinate ({}, {}) is outside lon [-180, 180] / lat [-90, 90]",
            lon, lat
        )));
    }
    Ok(Point::new(lon, lat))
}

/// Check a user location against the division layer and, when inside,
/// return the `k` nearest canals
///
/// The network layer is only read when the point is inside a division.
pub fn check_location(sources: &GeoSources, lon: f64, lat: f64, k: usize) -> Result<LocationResult, QueryError> {
    let point = user_point(lon, lat)?;

    let divisions = DivisionLayer::load(&sources.divisions)?;
    if !divisions.contains(point) {
        tracing::debug!("({}, {}) is outside every division", lon, lat);
        return Ok(LocationResult::Outside {
            message: MSG_OUTSIDE_DIVISIONS.to_string(),
        });
    }

    let network = NetworkLayer::load(&sources.network, &sources.name_property)?;
    let nearest_canals = network.nearest(point, k);
    tracing::debug!("({}, {}) nearest canals: {:?}", lon, lat, nearest_canals);

    Ok(LocationResult::Inside { nearest_canals })
}

/// Like `check_location`, but failures become an error payload
pub fn check_location_response(sources: &GeoSources, lon: f64, lat: f64, k: usize) -> LocationResponse {
    check_location(sources, lon, lat, k).into()
}
