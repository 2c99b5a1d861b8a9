//! Crop a label raster to the extent of its labelled cells

use sheed_core::raster::{Raster, RasterElement};
use sheed_core::{Error, Result};

/// Crop `raster` to the smallest window holding every non-zero, non-nodata
/// cell. The returned raster's geotransform is shifted so cells keep their
/// map position.
pub fn clip_to_mask<T: RasterElement>(raster: &Raster<T>) -> Result<Raster<T>> {
    let (rows, cols) = raster.shape();
    let zero = T::zero();

    let mut extent: Option<(usize, usize, usize, usize)> = None;
    for ((row, col), &value) in raster.data().indexed_iter() {
        if value == zero || raster.is_nodata(value) {
            continue;
        }
        extent = Some(match extent {
            None => (row, row, col, col),
            Some((r0, r1, c0, c1)) => (r0.min(row), r1.max(row), c0.min(col), c1.max(col)),
        });
    }

    let (r0, r1, c0, c1) =
        extent.ok_or_else(|| Error::Algorithm("mask has no labelled cells".to_string()))?;

    if (r0, c0) == (0, 0) && (r1 + 1, c1 + 1) == (rows, cols) {
        return Ok(raster.clone());
    }
    raster.window(r0, c0, r1 - r0 + 1, c1 - c0 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sheed_core::GeoTransform;

    #[test]
    fn test_clip_shrinks_to_labels() {
        let mut labels: Raster<i32> = Raster::new(6, 8);
        labels.set_transform(GeoTransform::new(10.0, 50.0, 0.5, -0.5));
        labels.set_nodata(Some(0));
        labels.set(2, 3, 1).unwrap();
        labels.set(4, 5, 1).unwrap();

        let clipped = clip_to_mask(&labels).unwrap();
        assert_eq!(clipped.shape(), (3, 3));
        assert_eq!(clipped.get(0, 0).unwrap(), 1);
        assert_eq!(clipped.get(2, 2).unwrap(), 1);
        assert_eq!(clipped.get(1, 1).unwrap(), 0);

        let gt = clipped.transform();
        assert_relative_eq!(gt.origin_x, 11.5);
        assert_relative_eq!(gt.origin_y, 49.0);
        assert_eq!(clipped.nodata(), Some(0));
    }

    #[test]
    fn test_clip_empty_mask_fails() {
        let labels: Raster<i32> = Raster::new(3, 3);
        assert!(clip_to_mask(&labels).is_err());
    }

    #[test]
    fn test_full_extent_is_unchanged() {
        let labels: Raster<u8> = Raster::filled(2, 2, 1);
        let clipped = clip_to_mask(&labels).unwrap();
        assert_eq!(clipped.shape(), (2, 2));
    }
}
