//! Error types for watershed jobs

use sheed_cloud::DemError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("invalid job: {0}")]
    Invalid(String),

    #[error("DEM acquisition failed: {0}")]
    Dem(#[from] DemError),

    #[error("raster processing failed: {0}")]
    Raster(#[from] sheed_core::Error),

    #[error("no catchment found for pour point {lat},{lon}")]
    NoCatchment { lat: f64, lon: f64 },

    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to encode KML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("delineation worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, JobError>;
