//! HTTP routes

use crate::error::AppError;
use crate::registry::{Registry, SessionLog};
use crate::ws;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use sheed_cloud::{DemCache, DemSource};
use sheed_pipeline::{JobOutcome, JobRequest, WatershedJob};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Everything the handlers share
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn DemSource>,
    /// DEMs and exports both live in the cache directory
    pub cache: DemCache,
    pub static_dir: PathBuf,
    pub registry: Registry,
}

impl AppState {
    pub fn new(source: Arc<dyn DemSource>, output_dir: impl Into<PathBuf>, static_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            cache: DemCache::new(output_dir),
            static_dir: static_dir.into(),
            registry: Registry::new(),
        }
    }
}

pub fn app(state: AppState) -> Router {
    let output = ServeDir::new(state.cache.dir());
    let assets = ServeDir::new(&state.static_dir);

    Router::new()
        .route("/", get(index).post(submit))
        .route("/ws", get(ws::handler))
        .nest_service("/output", output)
        .nest_service("/static", assets)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let page = tokio::fs::read_to_string(state.static_dir.join("index.html")).await?;
    Ok(Html(page))
}

/// `expand_factor` arrives as a number from JSON clients and as a string
/// from forms.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Factor {
    Number(f64),
    Text(String),
}

impl Factor {
    fn value(&self) -> Option<f64> {
        match self {
            Factor::Number(v) => Some(*v),
            Factor::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Body of `POST /`. Every field is required.
#[derive(Debug, Deserialize)]
struct Submission {
    coordinates: String,
    name: String,
    expand_factor: Factor,
    client_id: String,
    dem: String,
}

/// Parse `"lat,lon"`
pub fn parse_coordinates(text: &str) -> Option<(f64, f64)> {
    let (lat, lon) = text.split_once(',')?;
    Some((lat.trim().parse().ok()?, lon.trim().parse().ok()?))
}

impl Submission {
    fn decode(headers: &HeaderMap, body: &[u8]) -> Result<Self, AppError> {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .unwrap_or_default();

        match content_type.as_str() {
            "application/json" => serde_json::from_slice(body).map_err(|_| AppError::InvalidInput),
            "application/x-www-form-urlencoded" => {
                serde_urlencoded::from_bytes(body).map_err(|_| AppError::InvalidInput)
            }
            _ => Err(AppError::UnsupportedContentType),
        }
    }

    fn into_request(self) -> Result<JobRequest, AppError> {
        let (lat, lon) = parse_coordinates(&self.coordinates).ok_or(AppError::InvalidInput)?;
        let expand_factor = self.expand_factor.value().ok_or(AppError::InvalidInput)?;
        Ok(JobRequest {
            lat,
            lon,
            name: self.name,
            expand_factor,
            client_id: self.client_id,
            dataset: self.dem,
        })
    }
}

async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<JobOutcome>, AppError> {
    let request = Submission::decode(&headers, &body)?.into_request()?;
    info!(lat = request.lat, lon = request.lon, client_id = %request.client_id, "job submitted");

    let log = SessionLog::new(state.registry.clone(), request.client_id.clone());
    let job = WatershedJob::new(request)?;
    let outcome = job.run(state.source.as_ref(), &state.cache, &log).await?;
    Ok(Json(outcome))
}
