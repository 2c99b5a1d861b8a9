//! Full job runs against a synthetic DEM provider.

use async_trait::async_trait;
use sheed_cloud::{DemCache, DemError, DemRequest, DemSource};
use sheed_core::io::write_geotiff_to_buffer;
use sheed_core::{GeoTransform, Raster, CRS};
use sheed_pipeline::{JobError, JobRequest, WatershedJob};
use std::sync::Mutex;

const CELL: f64 = 0.001;
const LAT: f64 = 45.0;
const LON: f64 = -120.0;
/// Centre of the column carrying the channel
const CHANNEL_X: f64 = LON + CELL / 2.0;

#[derive(Clone, Copy)]
enum Terrain {
    /// Bowl of radius 0.04° centred 0.02° north of the pour point, drained
    /// south through the pour point by a channel.
    Bowl,
    /// Open valley: every cell drains to the channel, so any box clips.
    Valley,
}

impl Terrain {
    fn elevation(self, x: f64, y: f64) -> f64 {
        let on_channel = (x - CHANNEL_X).abs() < CELL * 0.4;
        match self {
            Terrain::Bowl => {
                let (cx, cy) = (LON, LAT + 0.02);
                let rim = 40.0;
                let d = ((x - cx).powi(2) + (y - cy).powi(2)).sqrt() / CELL;
                if on_channel && y <= cy {
                    100.0 - (cy - y) / CELL * 0.5
                } else if d < rim {
                    100.0 + d
                } else {
                    100.0 + 2.0 * rim - d
                }
            }
            Terrain::Valley => {
                let across = (x - CHANNEL_X).abs() / CELL * 2.0;
                let along = (y - LAT) / CELL * 0.5;
                200.0 + across + along
            }
        }
    }
}

/// Renders the requested box on a 0.001° grid and records every request.
struct SyntheticProvider {
    terrain: Terrain,
    requests: Mutex<Vec<DemRequest>>,
}

impl SyntheticProvider {
    fn new(terrain: Terrain) -> Self {
        Self { terrain, requests: Mutex::new(Vec::new()) }
    }

    fn requests(&self) -> Vec<DemRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl DemSource for SyntheticProvider {
    async fn fetch(&self, request: &DemRequest) -> sheed_cloud::Result<Vec<u8>> {
        self.requests.lock().unwrap().push(request.clone());

        let bbox = request.bbox;
        let rows = (bbox.height() / CELL).round() as usize;
        let cols = (bbox.width() / CELL).round() as usize;
        let mut dem = Raster::new(rows, cols);
        dem.set_transform(GeoTransform::new(bbox.min_x, bbox.max_y, CELL, -CELL));
        dem.set_crs(Some(CRS::wgs84()));
        for row in 0..rows {
            for col in 0..cols {
                let (x, y) = dem.pixel_to_geo(col, row);
                dem.set(row, col, self.terrain.elevation(x, y)).unwrap();
            }
        }
        Ok(write_geotiff_to_buffer(&dem).unwrap())
    }
}

struct Rejecting;

#[async_trait]
impl DemSource for Rejecting {
    async fn fetch(&self, request: &DemRequest) -> sheed_cloud::Result<Vec<u8>> {
        Err(DemError::Status {
            status: 401,
            request: request.describe(),
            body: "Invalid API key".to_string(),
        })
    }
}

fn request(expand_factor: f64, name: &str) -> JobRequest {
    JobRequest {
        name: name.to_string(),
        expand_factor,
        client_id: "ab12".to_string(),
        ..JobRequest::new(LAT, LON)
    }
}

#[tokio::test]
async fn clipped_catchment_retries_once_on_larger_box() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = DemCache::new(tmp.path());
    let provider = SyntheticProvider::new(Terrain::Bowl);
    let lines = Mutex::new(Vec::<String>::new());
    let log = |line: &str| lines.lock().unwrap().push(line.to_string());

    let job = WatershedJob::new(request(0.03, "")).unwrap();
    assert_eq!(job.name(), "45.0_-120.0_0.03");
    let outcome = job.run(&provider, &cache, &log).await.unwrap();

    assert!(!outcome.clipped);
    assert_eq!(outcome.expand_factor, 0.1);
    assert_eq!(outcome.name, "45.0_-120.0_0.1");
    assert_eq!(outcome.dem, "USGS10m");
    assert_eq!(outcome.geojson, tmp.path().join("watershed - 45.0_-120.0_0.1.geojson"));
    assert_eq!(outcome.kml, tmp.path().join("watershed_-_45.0_-120.0_0.1.kml"));
    assert!(outcome.geojson.is_file());
    assert!(outcome.kml.is_file());

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].bbox.max_y, 45.03);
    assert_eq!(requests[1].bbox.max_y, 45.1);
    assert!(cache.lookup("USGS10m", "45.0_-120.0_0.03").await.is_some());
    assert!(cache.lookup("USGS10m", "45.0_-120.0_0.1").await.is_some());

    let lines = lines.into_inner().unwrap();
    assert!(lines.iter().all(|l| l.starts_with("[ab12] ")));
    assert_eq!(
        lines[0],
        "[ab12] Fetching USGS10m DEM centered on 45.0,-120.0 from opentopography.org..."
    );
    assert!(lines.iter().any(|l| l.starts_with("[ab12] Clipping detected: ")));
    assert_eq!(
        lines.iter().filter(|l| l.ends_with("retrying with expand_factor=0.1")).count(),
        1
    );
    assert_eq!(lines.last().map(String::as_str), Some("[ab12] Done!"));
}

#[tokio::test]
async fn no_second_retry_when_still_clipped() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = DemCache::new(tmp.path());
    let provider = SyntheticProvider::new(Terrain::Valley);
    let log = |_: &str| {};

    let outcome = WatershedJob::new(request(0.03, "valley"))
        .unwrap()
        .run(&provider, &cache, &log)
        .await
        .unwrap();

    assert!(outcome.clipped);
    assert_eq!(outcome.expand_factor, 0.1);
    assert_eq!(outcome.name, "45.0_-120.0_0.1");
    assert_eq!(provider.requests().len(), 2);
}

#[tokio::test]
async fn cached_dem_is_reused() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = DemCache::new(tmp.path());
    let provider = SyntheticProvider::new(Terrain::Bowl);
    let lines = Mutex::new(Vec::<String>::new());
    let log = |line: &str| lines.lock().unwrap().push(line.to_string());

    for _ in 0..2 {
        let outcome = WatershedJob::new(request(0.1, "Mill Creek"))
            .unwrap()
            .run(&provider, &cache, &log)
            .await
            .unwrap();
        assert!(!outcome.clipped);
        assert_eq!(outcome.name, "Mill Creek");
    }

    assert_eq!(provider.requests().len(), 1);
    let cached = tmp.path().join("dem_USGS10m_Mill Creek.tif");
    let expected = format!("[ab12] Using cached DEM {}", cached.display());
    assert!(lines.into_inner().unwrap().contains(&expected));
}

#[tokio::test]
async fn exported_geojson_describes_the_catchment() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = DemCache::new(tmp.path());
    let provider = SyntheticProvider::new(Terrain::Bowl);
    let log = |_: &str| {};

    let outcome = WatershedJob::new(request(0.1, "bowl"))
        .unwrap()
        .run(&provider, &cache, &log)
        .await
        .unwrap();

    let text = std::fs::read_to_string(&outcome.geojson).unwrap();
    let collection: geojson::FeatureCollection = text.parse().unwrap();
    assert_eq!(collection.features.len(), 1);
    let feature = &collection.features[0];
    assert_eq!(feature.property("name").and_then(|v| v.as_str()), Some("bowl"));

    // Most of a 0.04° radius bowl at 45°N: a few tens of km²
    let area = feature.property("area_km2").and_then(|v| v.as_f64()).unwrap();
    assert!(area > 20.0 && area < 50.0, "area={area}");

    let kml = std::fs::read_to_string(&outcome.kml).unwrap();
    assert!(kml.contains("<name>Watershed Calculation Point - bowl</name>"));
    assert!(kml.contains("<coordinates>-120,45,0</coordinates>"));
}

#[tokio::test]
async fn provider_error_is_logged_and_returned() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = DemCache::new(tmp.path());
    let lines = Mutex::new(Vec::<String>::new());
    let log = |line: &str| lines.lock().unwrap().push(line.to_string());

    let err = WatershedJob::new(request(0.05, ""))
        .unwrap()
        .run(&Rejecting, &cache, &log)
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::Dem(DemError::Status { status: 401, .. })));

    let lines = lines.into_inner().unwrap();
    assert!(lines[1].starts_with("[ab12] Error: 401. Request was datasetName=USGS10m"));
    assert_eq!(lines[2], "[ab12] Invalid API key");
    assert!(lines.iter().all(|l| !l.contains("Done!")));
    assert!(cache.lookup("USGS10m", "45.0_-120.0_0.05").await.is_none());
}
