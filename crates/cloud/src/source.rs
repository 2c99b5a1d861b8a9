//! DEM providers

use crate::error::{DemError, Result};
use crate::http::HttpClient;
use async_trait::async_trait;
use sheed_core::BoundingBox;
use std::time::Duration;
use tracing::debug;

/// Default OpenTopography endpoint for USGS 3DEP DEMs
pub const OPENTOPOGRAPHY_USGS_URL: &str = "https://portal.opentopography.org/API/usgsdem";

/// DEM dataset used when a job does not name one
pub const DEFAULT_DATASET: &str = "USGS10m";

/// A DEM covering `bbox` from the provider dataset `dataset`
#[derive(Debug, Clone, PartialEq)]
pub struct DemRequest {
    pub dataset: String,
    pub bbox: BoundingBox,
}

impl DemRequest {
    pub fn new(dataset: impl Into<String>, bbox: BoundingBox) -> Self {
        Self { dataset: dataset.into(), bbox }
    }

    /// Provider query pairs, API key excluded
    pub fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("datasetName", self.dataset.clone()),
            ("west", self.bbox.min_x.to_string()),
            ("south", self.bbox.min_y.to_string()),
            ("east", self.bbox.max_x.to_string()),
            ("north", self.bbox.max_y.to_string()),
            ("outputFormat", "GTiff".to_string()),
        ]
    }

    /// Query string safe to log: the API key is shown as `<redacted>`
    pub fn describe(&self) -> String {
        let mut query = self.query();
        query.push(("API_Key", "<redacted>".to_string()));
        serde_urlencoded::to_string(&query).unwrap_or_else(|_| format!("{query:?}"))
    }
}

/// Something that can produce GeoTIFF bytes for a DEM request
#[async_trait]
pub trait DemSource: Send + Sync {
    /// Fetch the GeoTIFF covering `request`
    async fn fetch(&self, request: &DemRequest) -> Result<Vec<u8>>;
}

/// OpenTopography global/USGS DEM API client
#[derive(Debug, Clone)]
pub struct OpenTopography {
    http: HttpClient,
    base_url: String,
    api_key: String,
}

impl OpenTopography {
    /// Client for the default endpoint
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, OPENTOPOGRAPHY_USGS_URL)
    }

    /// Client for a custom endpoint (mirrors, tests)
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(DemError::InvalidRequest("API key is empty".to_string()));
        }
        Ok(Self {
            http: HttpClient::new(Duration::from_secs(300), 2)?,
            base_url: base_url.into(),
            api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl DemSource for OpenTopography {
    async fn fetch(&self, request: &DemRequest) -> Result<Vec<u8>> {
        if request.bbox.is_empty() {
            return Err(DemError::InvalidRequest(format!(
                "bounding box has no area ({} x {})",
                request.bbox.width(),
                request.bbox.height()
            )));
        }

        let mut query = request.query();
        query.push(("API_Key", self.api_key.clone()));
        debug!(url = %self.base_url, request = %request.describe(), "requesting DEM");

        let response = self.http.get(&self.base_url, &query).await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(DemError::Status {
                status: status.as_u16(),
                request: request.describe(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(reqwest::Error::without_url)?;
        if bytes.is_empty() {
            return Err(DemError::EmptyBody { request: request.describe() });
        }
        Ok(bytes.to_vec())
    }
}
