//! GeoJSON export: one Polygon feature per catchment polygon.

use crate::error::Result;
use geo::{GeodesicArea, Polygon};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use std::path::Path;

const M2_PER_KM2: f64 = 1_000_000.0;

/// Build the collection. Each feature carries the job name and its
/// geodesic area in km².
pub fn feature_collection(name: &str, polygons: &[Polygon<f64>]) -> FeatureCollection {
    let features = polygons
        .iter()
        .map(|polygon| {
            let mut properties = JsonObject::new();
            properties.insert("name".to_string(), name.into());
            properties.insert(
                "area_km2".to_string(),
                (polygon.geodesic_area_unsigned() / M2_PER_KM2).into(),
            );
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::from(polygon))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

pub async fn write(path: &Path, name: &str, polygons: &[Polygon<f64>]) -> Result<()> {
    let text = serde_json::to_string(&feature_collection(name, polygons))?;
    tokio::fs::write(path, text).await?;
    Ok(())
}
