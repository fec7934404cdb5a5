//! Nested variogram structures
//!
//! Each structure contributes a covariance that depends only on the
//! normalized distance `h` (separation measured in range units of the
//! structure's anisotropy ellipsoid). Practical ranges follow GSLIB:
//! ```text
//! spherical    c·(1 − 1.5h + 0.5h³)   h < 1, else 0
//! exponential  c·exp(−3h)
//! gaussian     c·exp(−3h²)
//! power        PMX − c·h^ω            0 < ω < 2
//! hole effect  c·cos(πh)
//! ```

use std::f64::consts::PI;
use std::fmt;

use krigeo_core::{Anisotropy, Error, Result};
use serde::{Deserialize, Serialize};

/// Stand-in for the unbounded sill of a power structure.
pub const PMX: f64 = 999.0;

/// Shape of a nested structure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StructureKind {
    Spherical,
    Exponential,
    Gaussian,
    /// Power model; `sill` is the slope and the anisotropy scales distance
    Power { exponent: f64 },
    HoleEffect,
}

impl StructureKind {
    fn abbrev(&self) -> &'static str {
        match self {
            StructureKind::Spherical => "Sph",
            StructureKind::Exponential => "Exp",
            StructureKind::Gaussian => "Gau",
            StructureKind::Power { .. } => "Pow",
            StructureKind::HoleEffect => "Hol",
        }
    }
}

/// One nested structure of a variogram model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    #[serde(flatten)]
    pub kind: StructureKind,
    /// Sill contribution (slope for the power model)
    pub sill: f64,
    pub anisotropy: Anisotropy,
}

impl Structure {
    pub fn new(kind: StructureKind, sill: f64, anisotropy: Anisotropy) -> Self {
        Self {
            kind,
            sill,
            anisotropy,
        }
    }

    /// Isotropic spherical structure
    pub fn spherical(sill: f64, range: f64) -> Self {
        Self::new(StructureKind::Spherical, sill, Anisotropy::isotropic(range))
    }

    /// Isotropic exponential structure (practical range)
    pub fn exponential(sill: f64, range: f64) -> Self {
        Self::new(StructureKind::Exponential, sill, Anisotropy::isotropic(range))
    }

    /// Isotropic gaussian structure (practical range)
    pub fn gaussian(sill: f64, range: f64) -> Self {
        Self::new(StructureKind::Gaussian, sill, Anisotropy::isotropic(range))
    }

    /// Isotropic power structure `slope · h^exponent`, with `h` in raw
    /// distance units.
    pub fn power(slope: f64, exponent: f64) -> Self {
        Self::new(
            StructureKind::Power { exponent },
            slope,
            Anisotropy::isotropic(1.0),
        )
    }

    /// Isotropic hole-effect structure
    pub fn hole_effect(sill: f64, range: f64) -> Self {
        Self::new(StructureKind::HoleEffect, sill, Anisotropy::isotropic(range))
    }

    pub fn with_anisotropy(mut self, anisotropy: Anisotropy) -> Self {
        self.anisotropy = anisotropy;
        self
    }

    pub(crate) fn validate(&self, index: usize) -> Result<()> {
        if !(self.sill.is_finite() && self.sill >= 0.0) {
            return Err(Error::InvalidModel(format!(
                "structure {index}: sill {} must be finite and non-negative",
                self.sill
            )));
        }
        let a = &self.anisotropy;
        for (axis, r) in ["major", "minor", "vertical"].iter().zip(a.ranges()) {
            if !(r.is_finite() && r > 0.0) {
                return Err(Error::InvalidModel(format!(
                    "structure {index}: {axis} range {r} must be positive"
                )));
            }
        }
        if ![a.azimuth, a.dip, a.rake].iter().all(|v| v.is_finite()) {
            return Err(Error::InvalidModel(format!(
                "structure {index}: rotation angles must be finite"
            )));
        }
        if let StructureKind::Power { exponent } = self.kind
            && !(exponent > 0.0 && exponent < 2.0)
        {
            return Err(Error::InvalidModel(format!(
                "structure {index}: power exponent {exponent} must be in (0, 2)"
            )));
        }
        Ok(())
    }

    /// Covariance contribution at normalized distance `h`.
    #[inline]
    pub fn covariance(&self, h: f64) -> f64 {
        let c = self.sill;
        match self.kind {
            StructureKind::Spherical => {
                if h < 1.0 {
                    c * (1.0 - h * (1.5 - 0.5 * h * h))
                } else {
                    0.0
                }
            }
            StructureKind::Exponential => c * (-3.0 * h).exp(),
            StructureKind::Gaussian => c * (-3.0 * h * h).exp(),
            StructureKind::Power { exponent } => PMX - c * h.powf(exponent),
            StructureKind::HoleEffect => c * (PI * h).cos(),
        }
    }

    /// Covariance contribution at zero separation.
    pub fn max_covariance(&self) -> f64 {
        match self.kind {
            StructureKind::Power { .. } => PMX,
            _ => self.sill,
        }
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = &self.anisotropy;
        write!(
            f,
            "{} {}({}/{}/{}; {}/{}/{})",
            self.sill,
            self.kind.abbrev(),
            a.major,
            a.minor,
            a.vertical,
            a.azimuth,
            a.dip,
            a.rake
        )?;
        if let StructureKind::Power { exponent } = self.kind {
            write!(f, "^{exponent}")?;
        }
        Ok(())
    }
}
