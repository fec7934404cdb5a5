//! Estimation targets: points and discretized blocks

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::Point3;

/// Number of discretization points along each axis of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discretization {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
}

impl Discretization {
    pub const fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self { nx, ny, nz }
    }

    pub fn count(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    pub fn validate(&self) -> Result<()> {
        if self.nx == 0 || self.ny == 0 || self.nz == 0 {
            return Err(Error::invalid_parameter(
                "discretization",
                format!("{}x{}x{}", self.nx, self.ny, self.nz),
                "each axis needs at least one point",
            ));
        }
        Ok(())
    }
}

impl Default for Discretization {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

/// Support of a target: a point or a block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Support {
    Point,
    Block {
        /// Block side lengths along x, y, z
        size: [f64; 3],
        discretization: Discretization,
    },
}

/// A location (or volume) at which to estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub center: Point3,
    pub support: Support,
    /// External drift value or local mean at the target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<f64>,
}

impl Target {
    pub fn point(x: f64, y: f64, z: f64) -> Self {
        Self {
            center: Point3::new(x, y, z),
            support: Support::Point,
            secondary: None,
        }
    }

    pub fn block(center: Point3, size: [f64; 3], discretization: Discretization) -> Self {
        Self {
            center,
            support: Support::Block {
                size,
                discretization,
            },
            secondary: None,
        }
    }

    pub fn with_secondary(mut self, secondary: f64) -> Self {
        self.secondary = Some(secondary);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.center.is_finite() {
            return Err(Error::invalid_parameter(
                "target",
                format!("{:?}", self.center),
                "center must be finite",
            ));
        }
        if let Support::Block {
            size,
            discretization,
        } = self.support
        {
            discretization.validate()?;
            if size.iter().any(|s| !s.is_finite() || *s < 0.0) {
                return Err(Error::invalid_parameter(
                    "target",
                    format!("{size:?}"),
                    "block size must be finite and non-negative",
                ));
            }
        }
        Ok(())
    }

    /// Number of points representing the target support.
    pub fn point_count(&self) -> usize {
        match self.support {
            Support::Point => 1,
            Support::Block { discretization, .. } => discretization.count(),
        }
    }

    /// Fill `out` with the points representing the target support.
    ///
    /// A point target yields its center; a block yields the centers of its
    /// `nx × ny × nz` sub-cells, x fastest.
    pub fn discretize(&self, out: &mut Vec<Point3>) {
        out.clear();
        match self.support {
            Support::Point => out.push(self.center),
            Support::Block {
                size,
                discretization: d,
            } => {
                let step = [
                    size[0] / d.nx as f64,
                    size[1] / d.ny as f64,
                    size[2] / d.nz as f64,
                ];
                let x0 = self.center.x - 0.5 * size[0] + 0.5 * step[0];
                let y0 = self.center.y - 0.5 * size[1] + 0.5 * step[1];
                let z0 = self.center.z - 0.5 * size[2] + 0.5 * step[2];
                for k in 0..d.nz {
                    for j in 0..d.ny {
                        for i in 0..d.nx {
                            out.push(Point3::new(
                                x0 + i as f64 * step[0],
                                y0 + j as f64 * step[1],
                                z0 + k as f64 * step[2],
                            ));
                        }
                    }
                }
            }
        }
    }
}
