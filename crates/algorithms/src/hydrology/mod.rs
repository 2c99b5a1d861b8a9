//! Hydrological analysis algorithms
//!
//! Conditioning, routing and delineation on DEM rasters:
//! - Fill pits: single-cell pit removal
//! - Priority-Flood: O(n log n) depression filling (Barnes 2014)
//! - Resolve flats: drainage gradients on flat areas (Barnes 2014)
//! - Flow direction: D8 single flow direction
//! - Flow accumulation: upstream contributing area
//! - Snap: move a pour point onto the channel network
//! - Watershed: basin labelling from pour points
//! - Clip: crop a label raster to its labelled extent
//! - Catchment: the whole chain for one pour point

mod catchment;
mod clip;
mod fill_pits;
pub(crate) mod flow_accumulation;
pub(crate) mod flow_direction;
mod priority_flood;
mod resolve_flats;
mod snap;
mod watershed;

pub use catchment::{delineate_catchment, Catchment, CatchmentDelineation, CatchmentParams};
pub use clip::clip_to_mask;
pub use fill_pits::{fill_pits, FillPits};
pub use flow_accumulation::{flow_accumulation, FlowAccumulation};
pub use flow_direction::{flow_direction, FlowDirection};
pub use priority_flood::{priority_flood, PriorityFlood, PriorityFloodParams};
pub use resolve_flats::{resolve_flats, ResolveFlats, ResolveFlatsParams};
pub use snap::{snap_to_mask, SnappedPoint};
pub use watershed::{watershed, Watershed, WatershedParams};
