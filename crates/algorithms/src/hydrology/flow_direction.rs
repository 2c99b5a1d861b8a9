//! D8 flow direction algorithm
//!
//! Calculates the direction of flow from each cell to its steepest
//! downslope neighbor using the D8 (deterministic eight-node) method.
//!
//! Flow direction encoding:
//! ```text
//!   4  3  2
//!   5  0  1
//!   6  7  8
//! ```
//! 0 = pit/flat/nodata (no outflow), 1-8 = direction to steepest neighbor

use crate::maybe_rayon::*;
use ndarray::Array2;
use sheed_core::raster::{d8, Raster};
use sheed_core::{Algorithm, Error, Result};

/// Flow direction algorithm (D8)
#[derive(Debug, Clone, Default)]
pub struct FlowDirection;

impl Algorithm for FlowDirection {
    type Input = Raster<f64>;
    type Output = Raster<u8>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Flow Direction (D8)"
    }

    fn description(&self) -> &'static str {
        "Calculate D8 flow direction from a conditioned DEM"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        flow_direction(&input)
    }
}

/// Calculate D8 flow direction from a DEM.
///
/// The DEM should be conditioned first (pits, depressions and flats
/// resolved), otherwise pits and flats come out as `0`. Border cells only
/// look at their in-grid neighbours. When two neighbours have the same
/// drop the lower direction code wins. Drops are measured against the
/// true centre-to-centre distance, so cells that are not square (degree
/// grids away from the equator) still pick the steepest neighbour.
pub fn flow_direction(dem: &Raster<f64>) -> Result<Raster<u8>> {
    let (rows, cols) = dem.shape();
    let (cell_width, cell_height) = dem.transform().cell_extent();
    let distances = d8::distances(cell_width, cell_height);

    let output_data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0u8; cols];

            for (col, out) in row_data.iter_mut().enumerate() {
                let center = unsafe { dem.get_unchecked(row, col) };
                if dem.is_nodata(center) {
                    continue;
                }

                let mut max_drop = 0.0_f64;
                for (dir, nr, nc) in d8::neighbors(row, col, rows, cols) {
                    let neighbor = unsafe { dem.get_unchecked(nr, nc) };
                    if dem.is_nodata(neighbor) {
                        continue;
                    }

                    let drop = (center - neighbor) / distances[dir as usize];
                    if drop > max_drop {
                        max_drop = drop;
                        *out = dir;
                    }
                }
            }

            row_data
        })
        .collect();

    let mut output = dem.with_same_meta::<u8>(rows, cols);
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}
