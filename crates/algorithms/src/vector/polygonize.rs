//! Raster to polygon conversion
//!
//! Traces the outline of each 4-connected region of non-zero cells along
//! cell edges. Every boundary edge is oriented with the region on its
//! right, so traced exteriors run clockwise and holes counter-clockwise.
//! Rings are reversed on output to give the usual convention:
//! counter-clockwise exteriors, clockwise holes.
//!
//! Where two cells of a region touch only at a corner, tracing turns right
//! so the diagonal contact never merges outlines.

use geo::{Coord, LineString, Polygon};
use ndarray::Array2;
use sheed_core::raster::{Raster, RasterElement};
use sheed_core::{Error, Result};
use std::collections::{HashMap, VecDeque};

/// Grid-line vertex: (x = column line, y = row line)
type Vertex = (usize, usize);

#[derive(Debug, Clone, Copy)]
struct Edge {
    from: Vertex,
    to: Vertex,
}

impl Edge {
    fn direction(&self) -> (i64, i64) {
        (
            self.to.0 as i64 - self.from.0 as i64,
            self.to.1 as i64 - self.from.1 as i64,
        )
    }
}

/// Trace every 4-connected region of non-zero, non-nodata cells into a
/// polygon in map coordinates.
///
/// Holes become interior rings and collinear vertices are dropped, so a
/// rectangular region yields exactly four corners. Polygons are ordered by
/// region size, largest first.
pub fn polygonize<T: RasterElement>(mask: &Raster<T>) -> Result<Vec<Polygon<f64>>> {
    let (rows, cols) = mask.shape();
    let zero = T::zero();
    let inside = |row: usize, col: usize| {
        let value = unsafe { mask.get_unchecked(row, col) };
        value != zero && !mask.is_nodata(value)
    };

    let (labels, sizes) = label_regions(rows, cols, &inside);

    let mut edges: Vec<Vec<Edge>> = vec![Vec::new(); sizes.len()];
    for row in 0..rows {
        for col in 0..cols {
            let label = labels[(row, col)];
            if label == 0 {
                continue;
            }
            let region = &mut edges[label as usize - 1];
            if row == 0 || !inside(row - 1, col) {
                region.push(Edge { from: (col, row), to: (col + 1, row) });
            }
            if col + 1 == cols || !inside(row, col + 1) {
                region.push(Edge { from: (col + 1, row), to: (col + 1, row + 1) });
            }
            if row + 1 == rows || !inside(row + 1, col) {
                region.push(Edge { from: (col + 1, row + 1), to: (col, row + 1) });
            }
            if col == 0 || !inside(row, col - 1) {
                region.push(Edge { from: (col, row + 1), to: (col, row) });
            }
        }
    }

    let transform = mask.transform();
    let to_line = |ring: &[Vertex]| -> LineString<f64> {
        ring.iter()
            .rev()
            .map(|&(x, y)| {
                let (gx, gy) = transform.pixel_to_geo_corner(x, y);
                Coord { x: gx, y: gy }
            })
            .collect()
    };

    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by(|&a, &b| sizes[b].cmp(&sizes[a]));

    let mut polygons = Vec::with_capacity(order.len());
    for idx in order {
        let mut exteriors = Vec::new();
        let mut holes = Vec::new();
        for ring in trace_rings(&edges[idx])? {
            let ring = drop_collinear(ring);
            let area2 = signed_area2(&ring);
            if area2 > 0 {
                exteriors.push((area2, ring));
            } else if area2 < 0 {
                holes.push(ring);
            }
        }

        // A 4-connected region has a single outer boundary
        exteriors.sort_by(|a, b| b.0.cmp(&a.0));
        let mut exteriors = exteriors.into_iter();
        let (_, outer) = exteriors
            .next()
            .ok_or_else(|| Error::Algorithm("region without an outer boundary".to_string()))?;

        let interiors = holes.iter().map(|h| to_line(h.as_slice())).collect();
        polygons.push(Polygon::new(to_line(outer.as_slice()), interiors));
        polygons.extend(exteriors.map(|(_, ring)| Polygon::new(to_line(ring.as_slice()), vec![])));
    }

    Ok(polygons)
}

/// 4-connected component labelling. Labels are 1-based; `sizes[i]` is the
/// cell count of label `i + 1`.
fn label_regions(
    rows: usize,
    cols: usize,
    inside: &impl Fn(usize, usize) -> bool,
) -> (Array2<u32>, Vec<usize>) {
    let mut labels = Array2::<u32>::zeros((rows, cols));
    let mut sizes = Vec::new();
    let mut queue = VecDeque::new();

    for row in 0..rows {
        for col in 0..cols {
            if labels[(row, col)] != 0 || !inside(row, col) {
                continue;
            }
            let label = sizes.len() as u32 + 1;
            let mut size = 0;
            labels[(row, col)] = label;
            queue.push_back((row, col));

            while let Some((r, c)) = queue.pop_front() {
                size += 1;
                let mut visit = |nr: usize, nc: usize| {
                    if labels[(nr, nc)] == 0 && inside(nr, nc) {
                        labels[(nr, nc)] = label;
                        queue.push_back((nr, nc));
                    }
                };
                if r > 0 {
                    visit(r - 1, c);
                }
                if r + 1 < rows {
                    visit(r + 1, c);
                }
                if c > 0 {
                    visit(r, c - 1);
                }
                if c + 1 < cols {
                    visit(r, c + 1);
                }
            }
            sizes.push(size);
        }
    }

    (labels, sizes)
}

/// Link directed edges into closed rings of vertices (first vertex not
/// repeated). At a vertex with two ways out, prefer turning right, then
/// going straight, then turning left.
fn trace_rings(edges: &[Edge]) -> Result<Vec<Vec<Vertex>>> {
    let mut outgoing: HashMap<Vertex, Vec<usize>> = HashMap::with_capacity(edges.len());
    for (i, edge) in edges.iter().enumerate() {
        outgoing.entry(edge.from).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        let mut ring = Vec::new();
        let mut current = start;
        loop {
            used[current] = true;
            ring.push(edges[current].from);

            let (dx, dy) = edges[current].direction();
            let candidates = outgoing.get(&edges[current].to).map(Vec::as_slice).unwrap_or(&[]);
            let next = [(-dy, dx), (dx, dy), (dy, -dx)]
                .iter()
                .find_map(|&turn| {
                    candidates
                        .iter()
                        .copied()
                        .find(|&e| edges[e].direction() == turn)
                })
                .ok_or_else(|| Error::Algorithm("open boundary while tracing".to_string()))?;

            if next == start {
                break;
            }
            if used[next] {
                return Err(Error::Algorithm("boundary edges cross".to_string()));
            }
            current = next;
        }
        rings.push(ring);
    }

    Ok(rings)
}

/// Remove vertices sitting in the middle of a straight run
fn drop_collinear(ring: Vec<Vertex>) -> Vec<Vertex> {
    let n = ring.len();
    if n < 4 {
        return ring;
    }
    let dir = |a: Vertex, b: Vertex| {
        (
            (b.0 as i64 - a.0 as i64).signum(),
            (b.1 as i64 - a.1 as i64).signum(),
        )
    };
    (0..n)
        .filter(|&i| {
            let prev = ring[(i + n - 1) % n];
            let next = ring[(i + 1) % n];
            dir(prev, ring[i]) != dir(ring[i], next)
        })
        .map(|i| ring[i])
        .collect()
}

/// Twice the shoelace area in grid space (rows grow downward); positive
/// for exteriors as traced.
fn signed_area2(ring: &[Vertex]) -> i64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (x0, y0) = ring[i];
            let (x1, y1) = ring[(i + 1) % n];
            x0 as i64 * y1 as i64 - x1 as i64 * y0 as i64
        })
        .sum()
}
