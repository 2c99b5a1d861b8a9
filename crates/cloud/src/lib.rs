//! # Sheed Cloud
//!
//! DEM acquisition for watershed jobs.
//!
//! - [`DemSource`]: anything that turns a [`DemRequest`] into GeoTIFF bytes
//! - [`OpenTopography`]: the OpenTopography REST API, with retry on
//!   transient network failures
//! - [`DemCache`]: downloaded DEMs kept on disk and reused by name

pub mod cache;
pub mod error;
pub mod http;
pub mod source;

pub use cache::DemCache;
pub use error::{DemError, Result};
pub use source::{DemRequest, DemSource, OpenTopography, DEFAULT_DATASET, OPENTOPOGRAPHY_USGS_URL};
