//! Single-cell pit removal
//!
//! A pit is an interior cell whose valid neighbours are all strictly higher.
//! Raising it to its lowest neighbour leaves the rest of the DEM untouched,
//! which makes this a cheap first pass before full depression filling.

use crate::maybe_rayon::*;
use ndarray::Array2;
use sheed_core::raster::{d8, Raster};
use sheed_core::{Algorithm, Error, Result};

/// Single-cell pit filling
#[derive(Debug, Clone, Default)]
pub struct FillPits;

impl Algorithm for FillPits {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Fill Pits"
    }

    fn description(&self) -> &'static str {
        "Raise single-cell pits to the level of their lowest neighbour"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        fill_pits(&input)
    }
}

/// Raise every single-cell pit to its lowest neighbour.
///
/// Border cells and nodata cells are never modified. A cell next to nodata
/// only compares against its valid neighbours.
pub fn fill_pits(dem: &Raster<f64>) -> Result<Raster<f64>> {
    let (rows, cols) = dem.shape();

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| {
                    let center = unsafe { dem.get_unchecked(row, col) };
                    if dem.is_nodata(center) || dem.is_border(row, col) {
                        return center;
                    }

                    let lowest = d8::neighbors(row, col, rows, cols)
                        .map(|(_, r, c)| unsafe { dem.get_unchecked(r, c) })
                        .filter(|&z| !dem.is_nodata(z))
                        .fold(f64::INFINITY, f64::min);

                    if lowest.is_finite() && lowest > center {
                        lowest
                    } else {
                        center
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect();

    let mut output = dem.with_same_meta::<f64>(rows, cols);
    output.set_nodata(dem.nodata());
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}
