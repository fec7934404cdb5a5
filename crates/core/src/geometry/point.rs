//! Points and axis-aligned extents

use serde::{Deserialize, Serialize};

/// A location in 3D space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Separation vector from `self` to `other`.
    #[inline]
    pub fn offset_to(&self, other: &Point3) -> [f64; 3] {
        [other.x - self.x, other.y - self.y, other.z - self.z]
    }

    /// Squared Euclidean distance to another point
    #[inline]
    pub fn dist_sq(&self, other: &Point3) -> f64 {
        let [dx, dy, dz] = self.offset_to(other);
        dx * dx + dy * dy + dz * dz
    }

    /// Euclidean distance to another point
    #[inline]
    pub fn dist(&self, other: &Point3) -> f64 {
        self.dist_sq(other).sqrt()
    }

    #[inline]
    pub fn coord(&self, axis: usize) -> f64 {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f64; 3]> for Point3 {
    fn from(c: [f64; 3]) -> Self {
        Point3::new(c[0], c[1], c[2])
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent3 {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Extent3 {
    /// Bounding box of a set of points. `None` for an empty iterator.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point3>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut min = [first.x, first.y, first.z];
        let mut max = min;
        for p in iter {
            for axis in 0..3 {
                let c = p.coord(axis);
                min[axis] = min[axis].min(c);
                max[axis] = max[axis].max(c);
            }
        }
        Some(Self { min, max })
    }

    /// Side length along `axis`.
    pub fn length(&self, axis: usize) -> f64 {
        self.max[axis] - self.min[axis]
    }

    pub fn contains(&self, p: &Point3) -> bool {
        (0..3).all(|a| p.coord(a) >= self.min[a] && p.coord(a) <= self.max[a])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 2.0, 2.0);
        assert!((a.dist(&b) - 3.0).abs() < 1e-12);
        assert_eq!(a.offset_to(&b), [1.0, 2.0, 2.0]);
    }

    #[test]
    fn test_extent() {
        let pts = vec![
            Point3::new(1.0, 5.0, -1.0),
            Point3::new(-2.0, 3.0, 4.0),
            Point3::new(0.5, 7.0, 0.0),
        ];
        let ext = Extent3::from_points(pts).unwrap();
        assert_eq!(ext.min, [-2.0, 3.0, -1.0]);
        assert_eq!(ext.max, [1.0, 7.0, 4.0]);
        assert!((ext.length(2) - 5.0).abs() < 1e-12);
        assert!(ext.contains(&Point3::new(0.0, 4.0, 0.0)));
        assert!(!ext.contains(&Point3::new(0.0, 8.0, 0.0)));
    }

    #[test]
    fn test_extent_empty() {
        assert!(Extent3::from_points(Vec::new()).is_none());
    }
}
