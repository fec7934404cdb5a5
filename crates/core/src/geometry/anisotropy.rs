//! Anisotropy ellipsoids and their rotation matrices
//!
//! Angles follow the GSLIB convention:
//! - `azimuth`: direction of the major axis, degrees clockwise from north (+y)
//! - `dip`: downward inclination of the major axis, degrees
//! - `rake`: rotation of the minor axes around the major axis, degrees
//!
//! The ranges are folded into the matrix rows, so that applying the matrix to
//! a separation vector yields coordinates in which the ellipsoid is the unit
//! sphere:
//! ```text
//! h = | M · (b − a) |      h ≤ 1  ⇔  b inside the ellipsoid centered at a
//! ```
//!
//! Reference:
//! Deutsch, C.V. & Journel, A.G. (1998). GSLIB: Geostatistical Software
//! Library and User's Guide, 2nd ed., §II.3 (subroutine `setrot`).

use serde::{Deserialize, Serialize};

use super::Point3;
use crate::error::{Error, Result};

/// Ellipsoid given by three ranges and three rotation angles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anisotropy {
    /// Range along the major axis
    pub major: f64,
    /// Range along the horizontal axis perpendicular to the major axis
    pub minor: f64,
    /// Range along the vertical axis
    pub vertical: f64,
    /// Degrees clockwise from north
    #[serde(default)]
    pub azimuth: f64,
    /// Degrees below horizontal
    #[serde(default)]
    pub dip: f64,
    /// Degrees around the major axis
    #[serde(default)]
    pub rake: f64,
}

impl Anisotropy {
    /// Sphere of the given radius.
    pub fn isotropic(range: f64) -> Self {
        Self::new([range, range, range], [0.0, 0.0, 0.0])
    }

    /// Ellipsoid from `[major, minor, vertical]` ranges and
    /// `[azimuth, dip, rake]` angles in degrees.
    pub fn new(ranges: [f64; 3], angles: [f64; 3]) -> Self {
        Self {
            major: ranges[0],
            minor: ranges[1],
            vertical: ranges[2],
            azimuth: angles[0],
            dip: angles[1],
            rake: angles[2],
        }
    }

    pub fn ranges(&self) -> [f64; 3] {
        [self.major, self.minor, self.vertical]
    }

    pub fn max_range(&self) -> f64 {
        self.major.max(self.minor).max(self.vertical)
    }

    /// Check that all ranges are positive and all values finite.
    ///
    /// `name` identifies the owner in the error message.
    pub fn validate(&self, name: &'static str) -> Result<()> {
        for (axis, r) in ["major", "minor", "vertical"].iter().zip(self.ranges()) {
            if !r.is_finite() || r <= 0.0 {
                return Err(Error::invalid_parameter(
                    name,
                    r,
                    format!("{axis} range must be positive and finite"),
                ));
            }
        }
        for (label, a) in [("azimuth", self.azimuth), ("dip", self.dip), ("rake", self.rake)] {
            if !a.is_finite() {
                return Err(Error::invalid_parameter(
                    name,
                    a,
                    format!("{label} angle must be finite"),
                ));
            }
        }
        Ok(())
    }

    /// Orthonormal rotation whose rows are the major, minor and vertical
    /// axis directions.
    pub fn axes(&self) -> [[f64; 3]; 3] {
        let deg = std::f64::consts::PI / 180.0;
        let alpha = if (0.0..270.0).contains(&self.azimuth) {
            (90.0 - self.azimuth) * deg
        } else {
            (450.0 - self.azimuth) * deg
        };
        let beta = -self.dip * deg;
        let theta = self.rake * deg;

        let (sina, cosa) = alpha.sin_cos();
        let (sinb, cosb) = beta.sin_cos();
        let (sint, cost) = theta.sin_cos();

        [
            [cosb * cosa, cosb * sina, -sinb],
            [
                -cost * sina + sint * sinb * cosa,
                cost * cosa + sint * sinb * sina,
                sint * cosb,
            ],
            [
                sint * sina + cost * sinb * cosa,
                -sint * cosa + cost * sinb * sina,
                cost * cosb,
            ],
        ]
    }

    /// Rotation matrix with each axis scaled by the inverse of its range.
    pub fn rotation(&self) -> RotationMatrix {
        let mut m = self.axes();
        for (row, r) in m.iter_mut().zip(self.ranges()) {
            for v in row.iter_mut() {
                *v /= r;
            }
        }
        RotationMatrix { m }
    }

    /// Half side lengths of the axis-aligned box enclosing the ellipsoid.
    pub fn half_extents(&self) -> [f64; 3] {
        let axes = self.axes();
        let ranges = self.ranges();
        let mut ext = [0.0; 3];
        for (i, e) in ext.iter_mut().enumerate() {
            *e = (0..3)
                .map(|j| {
                    let v = ranges[j] * axes[j][i];
                    v * v
                })
                .sum::<f64>()
                .sqrt();
        }
        ext
    }
}

/// Range-scaled rotation matrix of an [`Anisotropy`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationMatrix {
    m: [[f64; 3]; 3],
}

impl RotationMatrix {
    pub fn rows(&self) -> &[[f64; 3]; 3] {
        &self.m
    }

    #[inline]
    pub fn apply(&self, d: [f64; 3]) -> [f64; 3] {
        let m = &self.m;
        [
            m[0][0] * d[0] + m[0][1] * d[1] + m[0][2] * d[2],
            m[1][0] * d[0] + m[1][1] * d[1] + m[1][2] * d[2],
            m[2][0] * d[0] + m[2][1] * d[1] + m[2][2] * d[2],
        ]
    }

    /// Squared normalized length of a separation vector.
    #[inline]
    pub fn norm_sq(&self, d: [f64; 3]) -> f64 {
        let [u, v, w] = self.apply(d);
        u * u + v * v + w * w
    }

    /// Normalized (anisotropic) distance between two points.
    #[inline]
    pub fn distance(&self, a: &Point3, b: &Point3) -> f64 {
        self.norm_sq(a.offset_to(b)).sqrt()
    }
}
