//! D8 neighborhood shared by the hydrology algorithms

/// D8 flow directions.
///
/// Direction encoding:
/// ```text
///   4  3  2
///   5  0  1
///   6  7  8
/// ```
/// 0 = no outflow (pit, unresolved flat, or nodata), 1-8 = direction code.
pub mod d8 {
    /// Direction offsets: (row_offset, col_offset)
    /// Indexed by direction code (1-8), 0 is unused
    pub const OFFSETS: [(isize, isize); 9] = [
        (0, 0),   // 0: no flow / pit
        (0, 1),   // 1: E
        (-1, 1),  // 2: NE
        (-1, 0),  // 3: N
        (-1, -1), // 4: NW
        (0, -1),  // 5: W
        (1, -1),  // 6: SW
        (1, 0),   // 7: S
        (1, 1),   // 8: SE
    ];

    /// Centre-to-centre distance for each direction code on cells of
    /// `cell_width` by `cell_height` map units (index 0 is unused)
    pub fn distances(cell_width: f64, cell_height: f64) -> [f64; 9] {
        let mut out = [0.0; 9];
        for dir in DIRECTIONS {
            let (dr, dc) = OFFSETS[dir as usize];
            out[dir as usize] = (dr as f64 * cell_height).hypot(dc as f64 * cell_width);
        }
        out
    }

    /// All valid direction codes
    pub const DIRECTIONS: std::ops::RangeInclusive<u8> = 1..=8;

    /// Get the opposite direction
    pub fn opposite(dir: u8) -> u8 {
        if dir == 0 {
            0
        } else {
            ((dir - 1 + 4) % 8) + 1
        }
    }

    /// Step from (row, col) in direction `dir` on a `rows` x `cols` grid.
    ///
    /// Returns `None` for code 0, invalid codes, and steps off the grid.
    pub fn step(row: usize, col: usize, dir: u8, rows: usize, cols: usize) -> Option<(usize, usize)> {
        if dir == 0 || dir > 8 {
            return None;
        }
        let (dr, dc) = OFFSETS[dir as usize];
        let nr = row as isize + dr;
        let nc = col as isize + dc;
        if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
            return None;
        }
        Some((nr as usize, nc as usize))
    }

    /// In-grid D8 neighbours of (row, col) with their direction codes
    pub fn neighbors(
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    ) -> impl Iterator<Item = (u8, usize, usize)> {
        DIRECTIONS.filter_map(move |dir| step(row, col, dir, rows, cols).map(|(r, c)| (dir, r, c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_d8_opposite() {
        assert_eq!(d8::opposite(1), 5); // E -> W
        assert_eq!(d8::opposite(3), 7); // N -> S
        assert_eq!(d8::opposite(2), 6); // NE -> SW
        assert_eq!(d8::opposite(8), 4); // SE -> NW
        assert_eq!(d8::opposite(0), 0);
    }

    #[test]
    fn test_d8_neighbors_corner_and_interior() {
        assert_eq!(d8::neighbors(0, 0, 3, 3).count(), 3);
        assert_eq!(d8::neighbors(1, 1, 3, 3).count(), 8);
        assert_eq!(d8::step(1, 1, 9, 3, 3), None);
        assert_eq!(d8::step(1, 1, 6, 3, 3), Some((2, 0)));
    }

    #[test]
    fn test_d8_distances_follow_cell_shape() {
        let square = d8::distances(1.0, 1.0);
        assert_eq!(square[1], 1.0);
        assert_eq!(square[3], 1.0);
        assert!((square[2] - std::f64::consts::SQRT_2).abs() < 1e-12);

        let wide = d8::distances(2.0, 1.0);
        assert_eq!(wide[1], 2.0);
        assert_eq!(wide[5], 2.0);
        assert_eq!(wide[3], 1.0);
        assert_eq!(wide[7], 1.0);
        assert!((wide[8] - 5f64.sqrt()).abs() < 1e-12);
    }
}
