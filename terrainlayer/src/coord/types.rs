//! Tile coordinate and geographic rectangle types.

use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;

use serde::{Deserialize, Serialize};

/// A quadtree tile address.
///
/// Level 0 is the coarsest level. `x` increases eastward and `y` increases
/// southward, following the geographic tiling scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Tile column
    pub x: u32,
    /// Tile row
    pub y: u32,
    /// Quadtree level
    pub level: u32,
}

impl TileCoord {
    /// Create a new tile coordinate.
    pub fn new(x: u32, y: u32, level: u32) -> Self {
        Self { x, y, level }
    }

    /// Canonical cache key for this tile.
    ///
    /// The key is the compact JSON serialization of `[x, y, level]`, which
    /// is stable across calls and human-readable in logs.
    ///
    /// # Example
    ///
    /// ```
    /// use terrainlayer::coord::TileCoord;
    ///
    /// assert_eq!(TileCoord::new(3, 1, 2).cache_key(), "[3,1,2]");
    /// ```
    pub fn cache_key(&self) -> String {
        format!("[{},{},{}]", self.x, self.y, self.level)
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}/{}/{}", self.level, self.x, self.y)
    }
}

/// A geographic rectangle in radians.
///
/// Rectangles are plain `Copy` values; intersection and union always return
/// fresh values instead of writing into shared scratch storage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    /// Westernmost longitude
    pub west: f64,
    /// Southernmost latitude
    pub south: f64,
    /// Easternmost longitude
    pub east: f64,
    /// Northernmost latitude
    pub north: f64,
}

impl Rectangle {
    /// The whole globe.
    pub const MAX_VALUE: Rectangle = Rectangle {
        west: -PI,
        south: -FRAC_PI_2,
        east: PI,
        north: FRAC_PI_2,
    };

    /// Create a rectangle from bounds in radians.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Create a rectangle from bounds in degrees.
    pub fn from_degrees(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self::new(
            west.to_radians(),
            south.to_radians(),
            east.to_radians(),
            north.to_radians(),
        )
    }

    /// Width in radians.
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// Height in radians.
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Whether every bound is finite and the rectangle is not inverted.
    pub fn is_valid(&self) -> bool {
        [self.west, self.south, self.east, self.north]
            .iter()
            .all(|v| v.is_finite())
            && self.west <= self.east
            && self.south <= self.north
    }

    /// Overlapping area of two rectangles.
    ///
    /// Returns `None` unless the overlap has positive width and height, so
    /// rectangles that only share an edge do not intersect.
    pub fn intersection(&self, other: &Rectangle) -> Option<Rectangle> {
        let west = self.west.max(other.west);
        let east = self.east.min(other.east);
        if east <= west {
            return None;
        }

        let south = self.south.max(other.south);
        let north = self.north.min(other.north);
        if north <= south {
            return None;
        }

        Some(Rectangle::new(west, south, east, north))
    }

    /// Smallest rectangle enclosing both rectangles.
    pub fn union(&self, other: &Rectangle) -> Rectangle {
        Rectangle::new(
            self.west.min(other.west),
            self.south.min(other.south),
            self.east.max(other.east),
            self.north.max(other.north),
        )
    }

    /// Whether `other` lies entirely within this rectangle.
    pub fn contains(&self, other: &Rectangle) -> bool {
        other.west >= self.west
            && other.east <= self.east
            && other.south >= self.south
            && other.north <= self.north
    }
}

impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.4}°, {:.4}°, {:.4}°, {:.4}°]",
            self.west.to_degrees(),
            self.south.to_degrees(),
            self.east.to_degrees(),
            self.north.to_degrees()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_stable() {
        let coord = TileCoord::new(12, 7, 5);
        assert_eq!(coord.cache_key(), "[12,7,5]");
        assert_eq!(coord.cache_key(), coord.cache_key());
    }

    #[test]
    fn test_cache_key_distinguishes_field_order() {
        assert_ne!(
            TileCoord::new(1, 2, 3).cache_key(),
            TileCoord::new(2, 1, 3).cache_key()
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", TileCoord::new(4, 2, 3)), "L3/4/2");
    }

    #[test]
    fn test_intersection_overlap() {
        let a = Rectangle::new(0.0, 0.0, 2.0, 2.0);
        let b = Rectangle::new(1.0, 1.0, 3.0, 3.0);
        let i = a.intersection(&b).unwrap();
        assert_eq!(i, Rectangle::new(1.0, 1.0, 2.0, 2.0));
    }

    #[test]
    fn test_intersection_disjoint() {
        let a = Rectangle::new(0.0, 0.0, 1.0, 1.0);
        let b = Rectangle::new(2.0, 2.0, 3.0, 3.0);
        assert!(a.intersection(&b).is_none());
    }

    #[test]
    fn test_intersection_shared_edge_is_none() {
        let a = Rectangle::new(0.0, 0.0, 1.0, 1.0);
        let b = Rectangle::new(1.0, 0.0, 2.0, 1.0);
        assert!(a.intersection(&b).is_none());
    }

    #[test]
    fn test_union_contains_both() {
        let a = Rectangle::new(-1.0, -0.5, 0.0, 0.5);
        let b = Rectangle::new(0.5, 0.0, 1.5, 1.0);
        let u = a.union(&b);
        assert!(u.contains(&a));
        assert!(u.contains(&b));
        assert_eq!(u, Rectangle::new(-1.0, -0.5, 1.5, 1.0));
    }

    #[test]
    fn test_from_degrees() {
        let r = Rectangle::from_degrees(-180.0, -90.0, 180.0, 90.0);
        assert!((r.west - Rectangle::MAX_VALUE.west).abs() < 1e-12);
        assert!((r.north - Rectangle::MAX_VALUE.north).abs() < 1e-12);
    }

    #[test]
    fn test_is_valid() {
        assert!(Rectangle::MAX_VALUE.is_valid());
        assert!(!Rectangle::new(1.0, 0.0, 0.0, 1.0).is_valid());
        assert!(!Rectangle::new(0.0, 1.0, 1.0, 0.0).is_valid());
        assert!(!Rectangle::new(f64::NAN, 0.0, 1.0, 1.0).is_valid());
    }
}
