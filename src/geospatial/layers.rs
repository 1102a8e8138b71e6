//! Geometry layer loading
//!
//! Division polygons and the irrigation network are exported either as GeoJSON
//! FeatureCollections or as ESRI shapefiles (`.shp` with its `.dbf`/`.shx`, and a
//! `.prj` naming the frame). The file extension selects the reader. Geometries
//! are converted to `geo` types and reprojected to WGS84 once, at load.

use super::crs::{declared_crs, Crs};
use crate::error::QueryError;
use geo::{Geometry, MapCoords};
use geojson::{FeatureCollection, GeoJson};
use shapefile::dbase::{FieldValue, Record};
use shapefile::Shape;
use std::fs;
use std::path::Path;

/// Default attribute holding the channel name in the network layer
pub const DEFAULT_NAME_PROPERTY: &str = "CHANNEL_NA";

/// A named linear feature of the irrigation network
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkFeature {
    pub name: String,
    pub geometry: Geometry<f64>,
}

/// Administrative division polygons
#[derive(Debug, Clone, Default)]
pub struct DivisionLayer {
    pub geometries: Vec<Geometry<f64>>,
}

/// Canal network features, in source order
#[derive(Debug, Clone, Default)]
pub struct NetworkLayer {
    pub features: Vec<NetworkFeature>,
}

/// One feature as read from either format, already in WGS84
struct RawFeature {
    name: Option<String>,
    geometry: Option<Geometry<f64>>,
}

impl DivisionLayer {
    pub fn load(path: &Path) -> Result<Self, QueryError> {
        let geometries: Vec<_> = read_layer(path, None)?
            .into_iter()
            .filter_map(|feature| feature.geometry)
            .collect();

        tracing::debug!("Loaded {} division geometries from {:?}", geometries.len(), path);
        Ok(Self { geometries })
    }
}

impl NetworkLayer {
    /// Load network features
    ///
    /// Features without geometry are dropped. Features without a usable name
    /// are dropped too, since they cannot be reported.
    pub fn load(path: &Path, name_property: &str) -> Result<Self, QueryError> {
        let raw = read_layer(path, Some(name_property))?;

        let mut features = Vec::with_capacity(raw.len());
        let mut unnamed = 0usize;

        for feature in raw {
            let Some(geometry) = feature.geometry else {
                continue;
            };
            let Some(name) = feature.name else {
                unnamed += 1;
                continue;
            };
            features.push(NetworkFeature { name, geometry });
        }

        if unnamed > 0 {
            tracing::warn!("Skipped {} network features without '{}' in {:?}", unnamed, name_property, path);
        }
        tracing::debug!("Loaded {} network features from {:?}", features.len(), path);

        Ok(Self { features })
    }
}

fn read_layer(path: &Path, name_property: Option<&str>) -> Result<Vec<RawFeature>, QueryError> {
    if !path.exists() {
        return Err(QueryError::SourceMissing {
            path: path.to_path_buf(),
        });
    }

    if is_shapefile(path) {
        read_shapefile(path, name_property)
    } else {
        read_geojson(path, name_property)
    }
}

fn is_shapefile(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("shp"))
}

fn malformed(path: &Path, reason: impl ToString) -> QueryError {
    QueryError::MalformedGeometry {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

// ============================================================================
// GeoJSON
// ============================================================================

fn read_geojson(path: &Path, name_property: Option<&str>) -> Result<Vec<RawFeature>, QueryError> {
    let (collection, crs) = read_collection(path)?;

    collection
        .features
        .into_iter()
        .map(|feature| -> Result<RawFeature, QueryError> {
            let name = name_property.and_then(|property| {
                feature
                    .property(property)
                    .and_then(|v| v.as_str())
                    .and_then(clean_name)
            });
            let geometry = match feature.geometry {
                Some(geometry) => Some(convert(geometry.value, crs, path)?),
                None => None,
            };
            Ok(RawFeature { name, geometry })
        })
        .collect()
}

fn read_collection(path: &Path) -> Result<(FeatureCollection, Crs), QueryError> {
    let text = fs::read_to_string(path).map_err(|e| malformed(path, e))?;

    let geojson: GeoJson = text.parse().map_err(|e: geojson::Error| malformed(path, e))?;

    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(malformed(path, "expected a FeatureCollection"));
    };

    let member = collection.foreign_members.as_ref().and_then(|m| m.get("crs"));
    let crs = declared_crs(member)
        .map_err(|crs| QueryError::UnsupportedCrs {
            path: path.to_path_buf(),
            crs,
        })?
        .unwrap_or(Crs::Wgs84);

    Ok((collection, crs))
}

fn convert(value: geojson::Value, crs: Crs, path: &Path) -> Result<Geometry<f64>, QueryError> {
    let geometry = Geometry::<f64>::try_from(value).map_err(|e| malformed(path, e))?;
    Ok(reproject(geometry, crs, path))
}

// ============================================================================
// Shapefile
// ============================================================================

fn read_shapefile(path: &Path, name_property: Option<&str>) -> Result<Vec<RawFeature>, QueryError> {
    let crs = prj_crs(path)?;
    let mut reader = shapefile::Reader::from_path(path).map_err(|e| malformed(path, e))?;

    let mut features = Vec::new();
    for item in reader.iter_shapes_and_records() {
        let (shape, record) = item.map_err(|e| malformed(path, e))?;

        let name = name_property.and_then(|property| record_text(&record, property));
        let geometry = match shape {
            Shape::NullShape => None,
            shape => {
                let geometry = Geometry::<f64>::try_from(shape).map_err(|e| malformed(path, e))?;
                Some(reproject(geometry, crs, path))
            }
        };

        features.push(RawFeature { name, geometry });
    }

    Ok(features)
}

/// Frame from the `.prj` next to a shapefile; WGS84 when there is none
fn prj_crs(shp_path: &Path) -> Result<Crs, QueryError> {
    let prj = shp_path.with_extension("prj");
    if !prj.exists() {
        tracing::debug!("No .prj next to {:?}, assuming WGS84", shp_path);
        return Ok(Crs::Wgs84);
    }

    let wkt = fs::read_to_string(&prj).map_err(|e| malformed(&prj, e))?;
    Crs::from_wkt(&wkt).ok_or_else(|| QueryError::UnsupportedCrs {
        path: prj.clone(),
        crs: wkt.trim().to_string(),
    })
}

// dBase character fields come back space padded
fn record_text(record: &Record, field: &str) -> Option<String> {
    match record.get(field)? {
        FieldValue::Character(Some(text)) => clean_name(text),
        FieldValue::Memo(text) => clean_name(text),
        _ => None,
    }
}

fn clean_name(raw: &str) -> Option<String> {
    Some(raw.trim()).filter(|s| !s.is_empty()).map(str::to_string)
}

fn reproject(geometry: Geometry<f64>, crs: Crs, path: &Path) -> Geometry<f64> {
    if crs.is_geographic() {
        return geometry;
    }
    tracing::trace!("Reprojecting geometry from {:?} ({:?}) to WGS84", path, crs);
    geometry.map_coords(move |c| crs.to_wgs84(c))
}
