//! Error types for DEM acquisition.

use thiserror::Error;

/// Errors produced while fetching or caching DEMs.
#[derive(Error, Debug)]
pub enum DemError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status. `request` is the
    /// query string with the API key redacted.
    #[error("DEM provider returned {status} for {request}")]
    Status {
        status: u16,
        request: String,
        body: String,
    },

    #[error("DEM provider returned an empty body for {request}")]
    EmptyBody { request: String },

    #[error("invalid DEM request: {0}")]
    InvalidRequest(String),

    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for DEM operations.
pub type Result<T> = std::result::Result<T, DemError>;
