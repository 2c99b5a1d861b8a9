//! Catchment exports
//!
//! File names keep the historical spellings:
//! `watershed - {name}.geojson` and `watershed_-_{name}.kml`.

pub mod geojson;
pub mod kml;

use sheed_cloud::cache::file_component;
use std::path::{Path, PathBuf};

pub fn geojson_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("watershed - {}.geojson", file_component(name)))
}

pub fn kml_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("watershed_-_{}.kml", file_component(name)))
}
