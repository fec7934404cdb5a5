//! Regular block-model grid definitions (GSLIB convention)
//!
//! A grid is given by the number of cells, the center of the first cell and
//! the cell size along each axis. Cells are ordered x fastest, then y, then z.

use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::Point3;
use crate::target::{Discretization, Support, Target};

/// A regular 3D grid of cells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridDefinition {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    /// Center of the first cell
    pub xmn: f64,
    pub ymn: f64,
    pub zmn: f64,
    /// Cell sizes
    pub xsiz: f64,
    pub ysiz: f64,
    pub zsiz: f64,
}

impl GridDefinition {
    pub fn validate(&self) -> Result<()> {
        if self.nx == 0 || self.ny == 0 || self.nz == 0 {
            return Err(Error::invalid_parameter(
                "grid",
                format!("{}x{}x{}", self.nx, self.ny, self.nz),
                "grid needs at least one cell per axis",
            ));
        }
        for (label, s) in [("xsiz", self.xsiz), ("ysiz", self.ysiz), ("zsiz", self.zsiz)] {
            if !(s.is_finite() && s > 0.0) {
                return Err(Error::invalid_parameter(
                    "grid",
                    s,
                    format!("{label} must be positive"),
                ));
            }
        }
        if ![self.xmn, self.ymn, self.zmn].iter().all(|v| v.is_finite()) {
            return Err(Error::invalid_parameter(
                "grid",
                format!("({}, {}, {})", self.xmn, self.ymn, self.zmn),
                "origin must be finite",
            ));
        }
        Ok(())
    }

    pub fn cell_count(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// Linear index of cell `(ix, iy, iz)`.
    pub fn index(&self, ix: usize, iy: usize, iz: usize) -> usize {
        ix + iy * self.nx + iz * self.nx * self.ny
    }

    pub fn cell_center(&self, ix: usize, iy: usize, iz: usize) -> Point3 {
        Point3::new(
            self.xmn + ix as f64 * self.xsiz,
            self.ymn + iy as f64 * self.ysiz,
            self.zmn + iz as f64 * self.zsiz,
        )
    }

    /// Targets for every cell, in grid order.
    ///
    /// With `discretization`, each cell becomes a block of the cell size;
    /// otherwise each cell center is a point target.
    pub fn targets(&self, discretization: Option<Discretization>) -> Vec<Target> {
        let support = match discretization {
            Some(discretization) => Support::Block {
                size: [self.xsiz, self.ysiz, self.zsiz],
                discretization,
            },
            None => Support::Point,
        };
        let mut targets = Vec::with_capacity(self.cell_count());
        for iz in 0..self.nz {
            for iy in 0..self.ny {
                for ix in 0..self.nx {
                    targets.push(Target {
                        center: self.cell_center(ix, iy, iz),
                        support,
                        secondary: None,
                    });
                }
            }
        }
        targets
    }

    /// Reshape values in grid order into an array indexed `[z, y, x]`.
    pub fn to_array3(&self, values: Vec<f64>) -> Result<Array3<f64>> {
        if values.len() != self.cell_count() {
            return Err(Error::SizeMismatch {
                expected: self.cell_count(),
                actual: values.len(),
            });
        }
        Array3::from_shape_vec((self.nz, self.ny, self.nx), values)
            .map_err(|e| Error::Other(e.to_string()))
    }
}
