//! # Sheed Server
//!
//! HTTP front end for watershed jobs:
//!
//! - `GET /` serves the submission page
//! - `POST /` runs a job and answers with its outcome as JSON
//! - `GET /ws` streams job progress to the page that submitted it
//! - `/output/*` and `/static/*` serve generated files and page assets

pub mod config;
pub mod error;
pub mod logging;
pub mod registry;
pub mod routes;
pub mod ws;

pub use error::AppError;
pub use registry::Registry;
pub use routes::{app, AppState};
