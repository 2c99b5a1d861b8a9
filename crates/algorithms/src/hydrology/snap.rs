//! Pour point snapping
//!
//! A user-picked outlet rarely lands exactly on the modelled channel. The
//! outlet is moved to the nearest cell that passes a mask test, typically
//! "accumulation above a threshold".

use crate::maybe_rayon::*;
use sheed_core::raster::{Raster, RasterElement};
use sheed_core::{Error, Result};

/// A cell selected by [`snap_to_mask`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnappedPoint {
    pub row: usize,
    pub col: usize,
    /// Cell centre in map coordinates
    pub x: f64,
    pub y: f64,
}

/// Find the cell nearest to `(x, y)` whose value satisfies `mask`.
///
/// Distance is Euclidean in map units between `(x, y)` and cell centres.
/// Nodata cells never qualify. Ties go to the first cell in row-major order.
pub fn snap_to_mask<T, F>(raster: &Raster<T>, mask: F, point: (f64, f64)) -> Result<SnappedPoint>
where
    T: RasterElement,
    F: Fn(T) -> bool + Sync,
{
    let (x, y) = point;
    if !x.is_finite() || !y.is_finite() {
        return Err(Error::PointOutside { x, y });
    }

    let (rows, cols) = raster.shape();
    let best = (0..rows)
        .into_par_iter()
        .filter_map(|row| {
            let mut row_best: Option<(f64, usize, usize)> = None;
            for col in 0..cols {
                let value = unsafe { raster.get_unchecked(row, col) };
                if raster.is_nodata(value) || !mask(value) {
                    continue;
                }
                let (cx, cy) = raster.pixel_to_geo(col, row);
                let dist2 = (cx - x).powi(2) + (cy - y).powi(2);
                if row_best.map_or(true, |(d, _, _)| dist2 < d) {
                    row_best = Some((dist2, row, col));
                }
            }
            row_best
        })
        .min_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    let (_, row, col) = best.ok_or_else(|| {
        Error::Algorithm("no cell satisfies the snapping mask".to_string())
    })?;
    let (x, y) = raster.pixel_to_geo(col, row);

    Ok(SnappedPoint { row, col, x, y })
}
