//! Environment configuration for the binaries
//!
//! Defaults suit local development (`data/` next to the binary). On the server
//! the same variables are set by the service manager.

use crate::data::TableSources;
use crate::geospatial::{GeoSources, DEFAULT_NAME_PROPERTY, DEFAULT_NEAREST_K};
use crate::hierarchy::DEFAULT_DISTRIBUTARY_TAG;
use crate::resolver::PriorityResolver;
use crate::taxonomy::PriorityTaxonomy;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_PORT: u16 = 8000;

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
    pub port: u16,
    pub hierarchy_csv: PathBuf,
    pub rotation_csv: PathBuf,
    pub divisions_layer: PathBuf,
    pub network_layer: PathBuf,
    /// `None` selects the built-in Rabi taxonomy
    pub taxonomy_path: Option<PathBuf>,
    pub distributary_tag: String,
    pub canal_name_property: String,
    pub nearest_k: usize,
}

impl ServiceConfig {
    /// Read configuration from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup (environment, test map, ...)
    ///
    /// Blank values count as unset; unparsable numbers fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let data_dir = PathBuf::from(get("DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()));
        let path_or = |key: &str, file: &str| get(key).map(PathBuf::from).unwrap_or_else(|| data_dir.join(file));
        // Layers may be GeoJSON or shapefiles; the older *_GEOJSON keys still apply
        let layer_or = |key: &str, legacy: &str, file: &str| {
            get(key).map(PathBuf::from).unwrap_or_else(|| path_or(legacy, file))
        };

        Self {
            port: get("PORT").and_then(|p| p.parse().ok()).unwrap_or(DEFAULT_PORT),
            hierarchy_csv: path_or("HIERARCHY_CSV", "canal_hierarchy.csv"),
            rotation_csv: path_or("ROTATION_CSV", "rotation_plan.csv"),
            divisions_layer: layer_or("DIVISIONS_LAYER", "DIVISIONS_GEOJSON", "divisions.geojson"),
            network_layer: layer_or("NETWORK_LAYER", "NETWORK_GEOJSON", "irrigation_network.geojson"),
            taxonomy_path: get("TAXONOMY_PATH").map(PathBuf::from),
            distributary_tag: get("DISTRIBUTARY_TAG").unwrap_or_else(|| DEFAULT_DISTRIBUTARY_TAG.to_string()),
            canal_name_property: get("CANAL_NAME_PROPERTY").unwrap_or_else(|| DEFAULT_NAME_PROPERTY.to_string()),
            nearest_k: get("NEAREST_K")
                .and_then(|k| k.parse().ok())
                .filter(|k| *k > 0)
                .unwrap_or(DEFAULT_NEAREST_K),
            data_dir,
        }
    }

    pub fn table_sources(&self) -> TableSources {
        TableSources::new(&self.hierarchy_csv, &self.rotation_csv)
    }

    pub fn geo_sources(&self) -> GeoSources {
        GeoSources::new(&self.divisions_layer, &self.network_layer).with_name_property(&self.canal_name_property)
    }

    /// Taxonomy from `TAXONOMY_PATH`, or the built-in one
    pub fn load_taxonomy(&self) -> Result<PriorityTaxonomy> {
        match &self.taxonomy_path {
            Some(path) => PriorityTaxonomy::load(path),
            None => Ok(PriorityTaxonomy::rabi_default()),
        }
    }

    pub fn build_resolver(&self) -> Result<PriorityResolver> {
        let taxonomy = Arc::new(self.load_taxonomy()?);
        Ok(PriorityResolver::new(taxonomy).with_distributary_tag(&self.distributary_tag))
    }

    pub fn log_summary(&self) {
        tracing::info!("Configuration:");
        tracing::info!("  DATA_DIR: {:?}", self.data_dir);
        tracing::info!("  PORT: {}", self.port);
        tracing::info!("  HIERARCHY_CSV: {:?}", self.hierarchy_csv);
        tracing::info!("  ROTATION_CSV: {:?}", self.rotation_csv);
        tracing::info!("  DIVISIONS_LAYER: {:?}", self.divisions_layer);
        tracing::info!("  NETWORK_LAYER: {:?}", self.network_layer);
        match &self.taxonomy_path {
            Some(path) => tracing::info!("  TAXONOMY_PATH: {:?}", path),
            None => tracing::info!("  TAXONOMY_PATH: <built-in Rabi plan>"),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
