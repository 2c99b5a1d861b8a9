//! Vector extents

use serde::{Deserialize, Serialize};

/// Number of decimals kept on job bounding boxes.
const BBOX_DECIMALS: usize = 5;

/// Axis-aligned bounding box in map coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Square box of half-size `expand` centred on (x, y), each bound
    /// rounded to 5 decimals.
    pub fn around(x: f64, y: f64, expand: f64) -> Self {
        Self {
            min_x: round_to(x - expand, BBOX_DECIMALS),
            min_y: round_to(y - expand, BBOX_DECIMALS),
            max_x: round_to(x + expand, BBOX_DECIMALS),
            max_y: round_to(y + expand, BBOX_DECIMALS),
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Whether the box encloses no area
    pub fn is_empty(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }

    /// Smallest distance from (x, y) to any of the four edge lines
    pub fn distance_to_edge(&self, x: f64, y: f64) -> f64 {
        (self.max_x - x)
            .abs()
            .min((self.min_x - x).abs())
            .min((self.max_y - y).abs())
            .min((self.min_y - y).abs())
    }
}

/// Round to `decimals` places using the exact decimal expansion of `value`,
/// so 47.757175 (stored just below the half) rounds down.
fn round_to(value: f64, decimals: usize) -> f64 {
    format!("{value:.decimals$}").parse().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_around_is_symmetric() {
        let bbox = BoundingBox::around(-122.3, 47.6, 0.05);
        assert_relative_eq!(bbox.min_x, -122.35, epsilon = 1e-12);
        assert_relative_eq!(bbox.max_x, -122.25, epsilon = 1e-12);
        assert_relative_eq!(bbox.min_y, 47.55, epsilon = 1e-12);
        assert_relative_eq!(bbox.max_y, 47.65, epsilon = 1e-12);
        assert_relative_eq!(bbox.width(), 0.1, epsilon = 1e-9);
        assert_relative_eq!(bbox.height(), 0.1, epsilon = 1e-9);
    }

    #[test]
    fn test_around_rounds_to_five_decimals() {
        let bbox = BoundingBox::around(10.1234567, -3.9876543, 0.0333333);
        assert_eq!(bbox.min_x, 10.09012);
        assert_eq!(bbox.max_x, 10.15679);
        assert_eq!(bbox.min_y, -4.02099);
        assert_eq!(bbox.max_y, -3.95432);
    }

    #[test]
    fn test_around_rounds_stored_value_not_scaled_value() {
        // 47.857175 - 0.1 is stored as 47.75717499999..., scaling by 1e5
        // first would push it onto the half and round up
        let bbox = BoundingBox::around(0.0, 47.857175, 0.1);
        assert_eq!(bbox.min_y, 47.75717);
        assert_eq!(round_to(-0.000004, 5), -0.0);
    }

    #[test]
    fn test_empty_box() {
        assert!(!BoundingBox::new(0.0, 0.0, 1.0, 1.0).is_empty());
        assert!(BoundingBox::new(0.0, 0.0, 0.0, 1.0).is_empty());
        assert!(BoundingBox::new(0.0, 1.0, 1.0, 0.5).is_empty());
        assert!(BoundingBox::new(f64::NAN, 0.0, 1.0, 1.0).is_empty());
    }

    #[test]
    fn test_distance_to_edge() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 4.0);
        assert_relative_eq!(bbox.distance_to_edge(5.0, 2.0), 2.0);
        assert_relative_eq!(bbox.distance_to_edge(9.5, 2.0), 0.5);
        assert_relative_eq!(bbox.distance_to_edge(5.0, 0.0), 0.0);
    }
}
