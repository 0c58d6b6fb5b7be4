use serde::{Deserialize, Serialize};

use crate::geo::LonLat;

/// Geographic axis-aligned bounds in degrees.
///
/// Containment is a closed interval on both axes, so a point exactly on an
/// edge is inside. Bounds crossing the antimeridian are not represented.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl GeoBounds {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Builds bounds from any two opposite corners.
    pub fn from_corners(a: LonLat, b: LonLat) -> Self {
        Self {
            west: a.lon.min(b.lon),
            south: a.lat.min(b.lat),
            east: a.lon.max(b.lon),
            north: a.lat.max(b.lat),
        }
    }

    pub fn contains(&self, p: LonLat) -> bool {
        p.lon >= self.west && p.lon <= self.east && p.lat >= self.south && p.lat <= self.north
    }

    pub fn center(&self) -> LonLat {
        LonLat::new(
            (self.west + self.east) * 0.5,
            (self.south + self.north) * 0.5,
        )
    }

    pub fn width(&self) -> f64 {
        (self.east - self.west).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.north - self.south).max(0.0)
    }

    /// Closed ring (counter-clockwise, first == last) suitable for a polygon hole.
    pub fn ring(&self) -> Vec<LonLat> {
        vec![
            LonLat::new(self.west, self.south),
            LonLat::new(self.west, self.north),
            LonLat::new(self.east, self.north),
            LonLat::new(self.east, self.south),
            LonLat::new(self.west, self.south),
        ]
    }

    pub fn world() -> Self {
        Self::new(-180.0, -90.0, 180.0, 90.0)
    }
}

#[cfg(test)]
mod tests {
    use super::GeoBounds;
    use crate::geo::LonLat;

    #[test]
    fn containment_is_closed_on_both_axes() {
        let b = GeoBounds::new(124.0, 13.0, 125.0, 14.0);
        assert!(b.contains(LonLat::new(124.5, 13.5)));
        assert!(b.contains(LonLat::new(124.0, 13.0)));
        assert!(b.contains(LonLat::new(125.0, 14.0)));
        assert!(!b.contains(LonLat::new(125.000001, 13.5)));
        assert!(!b.contains(LonLat::new(124.5, 12.999999)));
    }

    #[test]
    fn from_corners_normalizes_order() {
        let b = GeoBounds::from_corners(LonLat::new(125.0, 14.0), LonLat::new(124.0, 13.0));
        assert_eq!(b, GeoBounds::new(124.0, 13.0, 125.0, 14.0));
        assert_eq!(b.center(), LonLat::new(124.5, 13.5));
    }

    #[test]
    fn ring_is_closed() {
        let r = GeoBounds::new(0.0, 0.0, 1.0, 1.0).ring();
        assert_eq!(r.len(), 5);
        assert_eq!(r.first(), r.last());
    }
}
