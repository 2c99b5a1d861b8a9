//! End-to-end catchment delineation for a single pour point
//!
//! Chains the conditioning and routing steps:
//! pits → depressions → flats → D8 → accumulation → snap → upstream
//! labelling → crop → polygons.

use crate::hydrology::{
    clip_to_mask, snap_to_mask, FillPits, FlowAccumulation, FlowDirection, PriorityFlood,
    PriorityFloodParams, ResolveFlats, ResolveFlatsParams, SnappedPoint, Watershed,
    WatershedParams,
};
use crate::vector::polygonize;
use geo::Polygon;
use sheed_core::raster::Raster;
use sheed_core::{Algorithm, Error, Result};
use tracing::debug;

/// Parameters for catchment delineation
#[derive(Debug, Clone)]
pub struct CatchmentParams {
    /// The pour point snaps to the nearest cell whose flow accumulation
    /// (in cells) is strictly greater than this
    pub snap_threshold: f64,
    /// Per-step rise used when imposing gradients on flats
    pub flat_epsilon: f64,
}

impl Default for CatchmentParams {
    fn default() -> Self {
        Self {
            snap_threshold: 1000.0,
            flat_epsilon: 1e-5,
        }
    }
}

/// Result of [`delineate_catchment`]
#[derive(Debug, Clone)]
pub struct Catchment {
    /// Catchment outline(s) in the DEM's coordinate system, largest first
    pub polygons: Vec<Polygon<f64>>,
    /// Channel cell the pour point was moved to
    pub outlet: SnappedPoint,
    /// Number of DEM cells draining through the outlet, outlet included
    pub cell_count: usize,
}

/// Catchment delineation algorithm
#[derive(Debug, Clone, Default)]
pub struct CatchmentDelineation {
    /// Pour point (x, y) in map coordinates
    pub pour_point: (f64, f64),
}

impl Algorithm for CatchmentDelineation {
    type Input = Raster<f64>;
    type Output = Catchment;
    type Params = CatchmentParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Catchment Delineation"
    }

    fn description(&self) -> &'static str {
        "Condition a DEM and trace the catchment draining to a pour point"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (rows, cols) = input.shape();
        debug!(rows, cols, "conditioning DEM");

        let pits_filled = run_step(&FillPits, input, ())?;
        let flooded = run_step(&PriorityFlood, pits_filled, PriorityFloodParams { epsilon: 0.0 })?;
        let inflated = run_step(
            &ResolveFlats,
            flooded,
            ResolveFlatsParams { epsilon: params.flat_epsilon },
        )?;

        let fdir = run_step(&FlowDirection, inflated, ())?;
        let acc = run_step(&FlowAccumulation, fdir.clone(), ())?;

        let threshold = params.snap_threshold;
        let outlet = snap_to_mask(&acc, |a| a > threshold, self.pour_point)?;
        debug!(row = outlet.row, col = outlet.col, x = outlet.x, y = outlet.y, "snapped pour point");

        let labels = run_step(
            &Watershed,
            fdir,
            WatershedParams { pour_points: vec![(outlet.row, outlet.col)] },
        )?;
        let cell_count = labels.data().iter().filter(|&&id| id != 0).count();

        let clipped = clip_to_mask(&labels)?;
        let polygons = polygonize(&clipped)?;
        debug!(cell_count, polygons = polygons.len(), "catchment traced");

        Ok(Catchment { polygons, outlet, cell_count })
    }
}

fn run_step<A>(step: &A, input: A::Input, params: A::Params) -> Result<A::Output>
where
    A: Algorithm<Error = Error>,
{
    debug!(step = step.name(), "running");
    step.execute(input, params)
}

/// Delineate the catchment draining to `pour_point` (x, y in map units).
pub fn delineate_catchment(
    dem: &Raster<f64>,
    pour_point: (f64, f64),
    params: CatchmentParams,
) -> Result<Catchment> {
    CatchmentDelineation { pour_point }.execute(dem.clone(), params)
}
