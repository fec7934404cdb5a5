//! Variogram model evaluation
//!
//! A model is a nugget effect plus nested anisotropic structures. The
//! covariance between two locations separated by `d` is
//! ```text
//! C(d) = c₀·[|d| < ε] + Σₛ Cₛ(|Mₛ·d|)
//! ```
//! where `Mₛ` is the range-scaled rotation of structure `s`, and the
//! semivariance is `γ(d) = C(0) − C(d)`.
//!
//! Rotation matrices are computed once when the model is built, so
//! evaluation costs O(structures) and never allocates.
//!
//! Reference:
//! Deutsch, C.V. & Journel, A.G. (1998). GSLIB, 2nd ed., §II.3 (`cova3`).
//! Isaaks, E.H. & Srivastava, R.M. (1989). An Introduction to Applied
//! Geostatistics, ch. 16.

mod structure;

pub use structure::{Structure, StructureKind, PMX};

use std::fmt;

use krigeo_core::{Error, Point3, Result, RotationMatrix, EPSILON};
use serde::{Deserialize, Serialize};

/// Serializable description of a variogram model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariogramSpec {
    #[serde(default)]
    pub nugget: f64,
    #[serde(default)]
    pub structures: Vec<Structure>,
}

/// A validated nested variogram model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "VariogramSpec", into = "VariogramSpec")]
pub struct VariogramModel {
    nugget: f64,
    structures: Vec<Structure>,
    rotations: Vec<RotationMatrix>,
    cmax: f64,
}

impl VariogramModel {
    /// Build and validate a model.
    ///
    /// # Errors
    /// [`Error::InvalidModel`] for negative or non-finite sills, non-positive
    /// ranges, power exponents outside (0, 2), or a model with no structure
    /// and no nugget.
    pub fn new(nugget: f64, structures: Vec<Structure>) -> Result<Self> {
        if !(nugget.is_finite() && nugget >= 0.0) {
            return Err(Error::InvalidModel(format!(
                "nugget {nugget} must be finite and non-negative"
            )));
        }
        for (i, s) in structures.iter().enumerate() {
            s.validate(i)?;
        }
        if structures.is_empty() && nugget == 0.0 {
            return Err(Error::InvalidModel(
                "model needs at least one structure or a positive nugget".into(),
            ));
        }

        let cmax = nugget + structures.iter().map(Structure::max_covariance).sum::<f64>();
        if cmax <= 0.0 {
            return Err(Error::InvalidModel("model has zero total sill".into()));
        }

        let rotations = structures
            .iter()
            .map(|s| s.anisotropy.rotation())
            .collect();

        Ok(Self {
            nugget,
            structures,
            rotations,
            cmax,
        })
    }

    /// Pure nugget model.
    pub fn pure_nugget(nugget: f64) -> Result<Self> {
        Self::new(nugget, Vec::new())
    }

    pub fn nugget(&self) -> f64 {
        self.nugget
    }

    pub fn structures(&self) -> &[Structure] {
        &self.structures
    }

    /// Covariance at zero separation: nugget plus every structure's
    /// contribution at the origin.
    pub fn sill(&self) -> f64 {
        self.cmax
    }

    /// Covariance between two locations.
    #[inline]
    pub fn covariance(&self, a: &Point3, b: &Point3) -> f64 {
        self.covariance_offset(a.offset_to(b))
    }

    /// Semivariance between two locations.
    #[inline]
    pub fn variogram(&self, a: &Point3, b: &Point3) -> f64 {
        self.cmax - self.covariance(a, b)
    }

    /// Covariance for a separation vector.
    #[inline]
    pub fn covariance_offset(&self, d: [f64; 3]) -> f64 {
        if is_coincident(d) {
            return self.cmax;
        }
        self.structured(d)
    }

    /// Covariance for a separation vector, without the nugget effect.
    ///
    /// Used for averages over block discretization points, where the
    /// nugget does not contribute to the spatial average.
    #[inline]
    pub fn structural_covariance_offset(&self, d: [f64; 3]) -> f64 {
        if is_coincident(d) {
            return self.cmax - self.nugget;
        }
        self.structured(d)
    }

    #[inline]
    fn structured(&self, d: [f64; 3]) -> f64 {
        self.structures
            .iter()
            .zip(&self.rotations)
            .map(|(s, rot)| s.covariance(rot.norm_sq(d).sqrt()))
            .sum()
    }
}

#[inline]
fn is_coincident(d: [f64; 3]) -> bool {
    d[0] * d[0] + d[1] * d[1] + d[2] * d[2] < EPSILON
}

impl TryFrom<VariogramSpec> for VariogramModel {
    type Error = Error;

    fn try_from(spec: VariogramSpec) -> Result<Self> {
        Self::new(spec.nugget, spec.structures)
    }
}

impl From<VariogramModel> for VariogramSpec {
    fn from(model: VariogramModel) -> Self {
        Self {
            nugget: model.nugget,
            structures: model.structures,
        }
    }
}

impl fmt::Display for VariogramModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Nug", self.nugget)?;
        for s in &self.structures {
            write!(f, " + {s}")?;
        }
        write!(f, " (sill {})", self.cmax)
    }
}
