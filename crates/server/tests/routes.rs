//! Router behaviour through `tower::ServiceExt::oneshot`.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use sheed_cloud::{DemError, DemRequest, DemSource};
use sheed_core::io::write_geotiff_to_buffer;
use sheed_core::{GeoTransform, Raster, CRS};
use sheed_server::{app, AppState};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const CELL: f64 = 0.001;
const LAT: f64 = 45.0;
const LON: f64 = -120.0;

/// Open valley draining south along the pour point's meridian
struct Valley;

#[async_trait]
impl DemSource for Valley {
    async fn fetch(&self, request: &DemRequest) -> sheed_cloud::Result<Vec<u8>> {
        let bbox = request.bbox;
        let rows = (bbox.height() / CELL).round() as usize;
        let cols = (bbox.width() / CELL).round() as usize;
        let mut dem = Raster::new(rows, cols);
        dem.set_transform(GeoTransform::new(bbox.min_x, bbox.max_y, CELL, -CELL));
        dem.set_crs(Some(CRS::wgs84()));
        let channel_x = LON + CELL / 2.0;
        for row in 0..rows {
            for col in 0..cols {
                let (x, y) = dem.pixel_to_geo(col, row);
                let z = 200.0 + (x - channel_x).abs() / CELL * 2.0 + (y - LAT) / CELL * 0.5;
                dem.set(row, col, z).unwrap();
            }
        }
        Ok(write_geotiff_to_buffer(&dem).unwrap())
    }
}

struct Unavailable;

#[async_trait]
impl DemSource for Unavailable {
    async fn fetch(&self, request: &DemRequest) -> sheed_cloud::Result<Vec<u8>> {
        Err(DemError::Status {
            status: 503,
            request: request.describe(),
            body: "Service Unavailable".to_string(),
        })
    }
}

struct Fixture {
    _dirs: (TempDir, TempDir),
    state: AppState,
}

fn fixture(source: Arc<dyn DemSource>) -> Fixture {
    let output = tempfile::tempdir().unwrap();
    let assets = tempfile::tempdir().unwrap();
    std::fs::write(assets.path().join("index.html"), "<html>sheed</html>").unwrap();
    std::fs::write(assets.path().join("sheed.js"), "// js").unwrap();
    let state = AppState::new(source, output.path(), assets.path());
    Fixture { _dirs: (output, assets), state }
}

fn router(fixture: &Fixture) -> Router {
    app(fixture.state.clone())
}

fn post(content_type: &str, body: impl Into<String>) -> Request<Body> {
    Request::post("/")
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body.into()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn index_serves_page() {
    let fixture = fixture(Arc::new(Valley));
    let response = router(&fixture)
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "<html>sheed</html>");
}

#[tokio::test]
async fn static_assets_are_served() {
    let fixture = fixture(Arc::new(Valley));
    let response = router(&fixture)
        .oneshot(Request::get("/static/sheed.js").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unsupported_content_type() {
    let fixture = fixture(Arc::new(Valley));
    let response = router(&fixture).oneshot(post("text/plain", "hello")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "Unsupported content type");
}

#[tokio::test]
async fn invalid_input() {
    let fixture = fixture(Arc::new(Valley));
    for body in [
        r#"{"coordinates":"45.0","name":"","expand_factor":0.05,"client_id":"","dem":"USGS10m"}"#,
        r#"{"coordinates":"45.0,-120.0","name":"","expand_factor":"wide","client_id":"","dem":"USGS10m"}"#,
        r#"{"coordinates":"45.0,-120.0","name":"","expand_factor":-1,"client_id":"","dem":"USGS10m"}"#,
        r#"{"coordinates":"45.0,-120.0","expand_factor":0.05,"client_id":"","dem":"USGS10m"}"#,
        "not json",
    ] {
        let response = router(&fixture)
            .oneshot(post("application/json", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(body_text(response).await, "Invalid input");
    }
}

#[tokio::test]
async fn json_submission_runs_job_and_streams_progress() {
    let fixture = fixture(Arc::new(Valley));
    let (client_id, mut progress) = fixture.state.registry.register();

    let body = format!(
        r#"{{"coordinates":"45.0, -120.0","name":"creek","expand_factor":0.05,"client_id":"{client_id}","dem":"USGS10m"}}"#
    );
    let response = router(&fixture)
        .oneshot(post("application/json", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let outcome: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    // The open valley always reaches the DEM edge: one retry, then give up
    assert_eq!(outcome["clipped"], true);
    assert_eq!(outcome["expand_factor"], 0.1);
    assert_eq!(outcome["name"], "45.0_-120.0_0.1");
    assert_eq!(outcome["dem"], "USGS10m");
    assert_eq!(outcome["lat"], 45.0);
    assert_eq!(outcome["lon"], -120.0);
    let geojson = outcome["geojson"].as_str().unwrap();
    assert!(geojson.ends_with("watershed - 45.0_-120.0_0.1.geojson"));
    assert!(std::path::Path::new(geojson).is_file());

    let mut lines = Vec::new();
    while let Ok(line) = progress.try_recv() {
        lines.push(line);
    }
    let prefix = format!("log:[{client_id}] ");
    assert!(lines.iter().all(|l| l.starts_with(&prefix)));
    assert_eq!(lines.last().unwrap(), &format!("{prefix}Done!"));
}

#[tokio::test]
async fn form_submission_and_output_download() {
    let fixture = fixture(Arc::new(Valley));
    let response = router(&fixture)
        .oneshot(post(
            "application/x-www-form-urlencoded; charset=UTF-8",
            "coordinates=45.0%2C-120.0&name=&expand_factor=0.1&client_id=&dem=USGS10m",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let outcome: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(outcome["expand_factor"], 0.1);

    let response = router(&fixture)
        .oneshot(
            Request::get("/output/watershed_-_45.0_-120.0_0.1.kml")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("<kml"));
}

#[tokio::test]
async fn provider_failure_is_server_error() {
    let fixture = fixture(Arc::new(Unavailable));
    let response = router(&fixture)
        .oneshot(post(
            "application/json",
            r#"{"coordinates":"45.0,-120.0","name":"","expand_factor":"0.05","client_id":"","dem":"USGS10m"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.contains("503"));
}

#[tokio::test]
async fn websocket_route_requires_upgrade() {
    let fixture = fixture(Arc::new(Valley));
    let response = router(&fixture)
        .oneshot(Request::get("/ws").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}
