//! Coordinate Reference System handling

use serde::{Deserialize, Serialize};
use std::fmt;

/// EPSG code of WGS84 geographic coordinates.
pub const EPSG_WGS84: u32 = 4326;

/// Kind of model a CRS describes, as stored in GeoTIFF GeoKeys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrsKind {
    /// Latitude/longitude in degrees
    Geographic,
    /// Planar coordinates (usually meters)
    Projected,
}

/// Coordinate Reference System identified by its EPSG code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CRS {
    epsg: u32,
    kind: CrsKind,
}

impl CRS {
    /// Create a geographic CRS from an EPSG code
    pub fn geographic(epsg: u32) -> Self {
        Self { epsg, kind: CrsKind::Geographic }
    }

    /// Create a projected CRS from an EPSG code
    pub fn projected(epsg: u32) -> Self {
        Self { epsg, kind: CrsKind::Projected }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::geographic(EPSG_WGS84)
    }

    /// Get the EPSG code
    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    /// Model kind
    pub fn kind(&self) -> CrsKind {
        self.kind
    }

    /// Whether coordinates are expressed in degrees
    pub fn is_geographic(&self) -> bool {
        self.kind == CrsKind::Geographic
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        format!("EPSG:{}", self.epsg)
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}
