//! Flat resolution
//!
//! After flat filling, depressions become perfectly level areas where D8
//! finds no downslope neighbour. This module imposes a tiny synthetic
//! gradient on those flats so flow leaves them through their outlets,
//! following Barnes et al. (2014):
//!
//! 1. A gradient *away from higher terrain* (BFS from the flat's high edges)
//! 2. A gradient *towards lower terrain* (BFS from the flat's low edges),
//!    weighted double so it always dominates
//!
//! The combined BFS distances form an integer mask; each flat cell is raised
//! by `epsilon * mask`. Cells that already drain are never modified.
//!
//! Reference:
//! Barnes, R., Lehman, C., & Mulla, D. (2014). An efficient assignment of
//! drainage direction over flat surfaces in raster digital elevation models.
//! *Computers & Geosciences*, 62, 128–135.

use ndarray::Array2;
use sheed_core::raster::{d8, Raster};
use sheed_core::{Algorithm, Error, Result};
use std::collections::VecDeque;

/// Parameters for flat resolution
#[derive(Debug, Clone)]
pub struct ResolveFlatsParams {
    /// Elevation added per unit of the gradient mask
    pub epsilon: f64,
}

impl Default for ResolveFlatsParams {
    fn default() -> Self {
        Self { epsilon: 1e-5 }
    }
}

/// Flat resolution algorithm
#[derive(Debug, Clone, Default)]
pub struct ResolveFlats;

impl Algorithm for ResolveFlats {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = ResolveFlatsParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Resolve Flats"
    }

    fn description(&self) -> &'static str {
        "Impose drainage gradients on flat areas (Barnes 2014)"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        resolve_flats(&input, params)
    }
}

/// Raise cells on drainable flats so each one gets a downslope neighbour.
///
/// Grid-border cells and cells next to nodata count as draining, since
/// water leaves the grid there. Flats with no draining cell at their
/// elevation (no outlet) are returned unchanged.
pub fn resolve_flats(dem: &Raster<f64>, params: ResolveFlatsParams) -> Result<Raster<f64>> {
    if params.epsilon <= 0.0 || !params.epsilon.is_finite() {
        return Err(Error::InvalidParameter {
            name: "epsilon",
            value: params.epsilon.to_string(),
            reason: "must be a finite, positive number".into(),
        });
    }

    let (rows, cols) = dem.shape();
    let z = |r: usize, c: usize| unsafe { dem.get_unchecked(r, c) };
    let valid = |r: usize, c: usize| !dem.is_nodata(z(r, c));

    // Cells with no way out: not on an edge, no strictly lower neighbour
    let mut no_flow = Array2::<bool>::from_elem((rows, cols), false);
    for row in 0..rows {
        for col in 0..cols {
            if !valid(row, col) || dem.is_border(row, col) {
                continue;
            }
            let center = z(row, col);
            let mut drains = false;
            for (_, r, c) in d8::neighbors(row, col, rows, cols) {
                if !valid(r, c) || z(r, c) < center {
                    drains = true;
                    break;
                }
            }
            no_flow[(row, col)] = !drains;
        }
    }

    let mut low_edges = Vec::new();
    let mut high_edges = Vec::new();
    for row in 0..rows {
        for col in 0..cols {
            if !valid(row, col) {
                continue;
            }
            let center = z(row, col);
            for (_, r, c) in d8::neighbors(row, col, rows, cols) {
                if !valid(r, c) {
                    continue;
                }
                if !no_flow[(row, col)] && no_flow[(r, c)] && z(r, c) == center {
                    low_edges.push((row, col));
                    break;
                }
                if no_flow[(row, col)] && z(r, c) > center {
                    high_edges.push((row, col));
                    break;
                }
            }
        }
    }

    let mut output = dem.clone();
    if low_edges.is_empty() {
        return Ok(output);
    }

    // Label each drainable flat by flooding equal-elevation cells from its low edges
    let mut labels = Array2::<u32>::zeros((rows, cols));
    let mut next_label = 1u32;
    for &(row, col) in &low_edges {
        if labels[(row, col)] != 0 {
            continue;
        }
        let level = z(row, col);
        labels[(row, col)] = next_label;
        let mut queue = VecDeque::from([(row, col)]);
        while let Some((r, c)) = queue.pop_front() {
            for (_, nr, nc) in d8::neighbors(r, c, rows, cols) {
                if labels[(nr, nc)] == 0 && valid(nr, nc) && z(nr, nc) == level {
                    labels[(nr, nc)] = next_label;
                    queue.push_back((nr, nc));
                }
            }
        }
        next_label += 1;
    }

    // High edges on flats without an outlet stay unresolved
    high_edges.retain(|&(r, c)| labels[(r, c)] != 0);

    let mut mask = Array2::<i64>::zeros((rows, cols));
    let mut flat_height = vec![0i64; next_label as usize];

    // Away from higher terrain
    let mut frontier = high_edges;
    let mut loops = 1i64;
    while !frontier.is_empty() {
        let mut next = Vec::new();
        for (row, col) in frontier {
            if mask[(row, col)] > 0 {
                continue;
            }
            let label = labels[(row, col)];
            mask[(row, col)] = loops;
            flat_height[label as usize] = loops;
            for (_, r, c) in d8::neighbors(row, col, rows, cols) {
                if labels[(r, c)] == label && no_flow[(r, c)] && mask[(r, c)] == 0 {
                    next.push((r, c));
                }
            }
        }
        frontier = next;
        loops += 1;
    }

    // Invert so cells far from high terrain sit lowest
    for ((row, col), value) in mask.indexed_iter_mut() {
        if *value > 0 {
            *value = flat_height[labels[(row, col)] as usize] - *value;
        }
    }

    // Towards lower terrain, weighted double
    let mut seen = Array2::<bool>::from_elem((rows, cols), false);
    let mut frontier = low_edges;
    let mut loops = 1i64;
    while !frontier.is_empty() {
        let mut next = Vec::new();
        for (row, col) in frontier {
            if seen[(row, col)] {
                continue;
            }
            seen[(row, col)] = true;
            mask[(row, col)] += 2 * loops;
            let label = labels[(row, col)];
            for (_, r, c) in d8::neighbors(row, col, rows, cols) {
                if labels[(r, c)] == label && no_flow[(r, c)] && !seen[(r, c)] {
                    next.push((r, c));
                }
            }
        }
        frontier = next;
        loops += 1;
    }

    let data = output.data_mut();
    for ((row, col), cell) in data.indexed_iter_mut() {
        if no_flow[(row, col)] && seen[(row, col)] {
            *cell += params.epsilon * mask[(row, col)] as f64;
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydrology::flow_direction::flow_direction;
    use sheed_core::GeoTransform;

    /// 7x7 plateau at 5.0 walled by 9.0 with a single outlet notch at (6, 3)
    fn walled_flat() -> Raster<f64> {
        let mut dem = Raster::filled(7, 7, 9.0);
        dem.set_transform(GeoTransform::new(0.0, 7.0, 1.0, -1.0));
        for row in 1..6 {
            for col in 1..6 {
                dem.set(row, col, 5.0).unwrap();
            }
        }
        dem.set(6, 3, 5.0).unwrap();
        dem
    }

    #[test]
    fn test_every_flat_cell_gets_a_direction() {
        let dem = walled_flat();
        let before = flow_direction(&dem).unwrap();
        assert_eq!(before.get(3, 3).unwrap(), 0);

        let resolved = resolve_flats(&dem, ResolveFlatsParams::default()).unwrap();
        let fdir = flow_direction(&resolved).unwrap();
        for row in 1..6 {
            for col in 1..6 {
                assert_ne!(fdir.get(row, col).unwrap(), 0, "cell ({row}, {col}) still flat");
            }
        }
    }

    #[test]
    fn test_draining_cells_untouched() {
        let dem = walled_flat();
        let resolved = resolve_flats(&dem, ResolveFlatsParams::default()).unwrap();

        // The outlet is on the border and the walls drain inward
        assert_eq!(resolved.get(6, 3).unwrap(), 5.0);
        assert_eq!(resolved.get(0, 0).unwrap(), 9.0);
        assert_eq!(resolved.get(0, 3).unwrap(), 9.0);
    }

    #[test]
    fn test_increments_are_tiny_and_grow_away_from_outlet() {
        let dem = walled_flat();
        let resolved = resolve_flats(&dem, ResolveFlatsParams::default()).unwrap();

        let near = resolved.get(5, 3).unwrap();
        let far = resolved.get(1, 3).unwrap();
        assert!(near > 5.0);
        assert!(far > near, "near={near}, far={far}");
        assert!(far - 5.0 < 1e-3);
    }

    #[test]
    fn test_closed_flat_left_alone() {
        let mut dem = walled_flat();
        dem.set(6, 3, 9.0).unwrap();
        let resolved = resolve_flats(&dem, ResolveFlatsParams::default()).unwrap();
        for row in 1..6 {
            for col in 1..6 {
                assert_eq!(resolved.get(row, col).unwrap(), 5.0);
            }
        }
    }

    #[test]
    fn test_rejects_zero_epsilon() {
        assert!(resolve_flats(&walled_flat(), ResolveFlatsParams { epsilon: 0.0 }).is_err());
    }
}
