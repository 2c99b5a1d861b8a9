//! HTTP error mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sheed_pipeline::JobError;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unsupported content type")]
    UnsupportedContentType,

    #[error("Invalid input")]
    InvalidInput,

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::UnsupportedContentType | AppError::InvalidInput => StatusCode::BAD_REQUEST,
            AppError::Job(JobError::Invalid(reason)) => {
                warn!("rejected job: {reason}");
                return (StatusCode::BAD_REQUEST, AppError::InvalidInput.to_string()).into_response();
            }
            AppError::Job(_) | AppError::Io(_) => {
                error!("request failed: {self}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}
