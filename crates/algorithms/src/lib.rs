//! # Sheed Algorithms
//!
//! Hydrology engine behind watershed delineation.
//!
//! ## Available Algorithm Categories
//!
//! - **hydrology**: pit and depression filling, flat resolution, D8 flow
//!   direction and accumulation, pour point snapping, catchment labelling
//! - **vector**: polygonization of label rasters

pub mod hydrology;
pub(crate) mod maybe_rayon;
pub mod vector;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::hydrology::{
        clip_to_mask, delineate_catchment, fill_pits, flow_accumulation, flow_direction,
        priority_flood, resolve_flats, snap_to_mask, watershed, Catchment, CatchmentParams,
        FlowAccumulation, FlowDirection, PriorityFlood, PriorityFloodParams, ResolveFlats,
        ResolveFlatsParams, SnappedPoint, Watershed, WatershedParams,
    };
    pub use crate::vector::polygonize;
    pub use sheed_core::prelude::*;
}
