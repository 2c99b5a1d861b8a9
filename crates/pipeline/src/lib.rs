//! # Sheed Pipeline
//!
//! Runs one watershed job end to end:
//!
//! 1. fetch (or reuse) a DEM around the pour point
//! 2. delineate the catchment draining to it
//! 3. check whether the catchment was cut off by the DEM extent, and if so
//!    retry once on a larger box
//! 4. export the catchment as GeoJSON and KML
//!
//! Progress lines go to a [`JobLog`] so callers can stream them.

pub mod error;
pub mod export;
pub mod job;
pub mod log;

pub use error::{JobError, Result};
pub use job::{
    clipping_vertex, default_name, format_float, JobOutcome, JobRequest, WatershedJob,
    CLIP_TOLERANCE, DEFAULT_EXPAND_FACTOR, RETRY_EXPAND_FACTOR,
};
pub use log::JobLog;
