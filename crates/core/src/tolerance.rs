//! Numerical tolerances shared by a whole estimation run

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Squared separation below which two locations are treated as coincident.
pub const EPSILON: f64 = 1.0e-10;

/// Tolerances applied while solving and post-checking kriging systems.
///
/// Built once at run start and read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Pivot magnitude, relative to the largest diagonal entry, below which
    /// a column is treated as linearly dependent.
    pub pivot: f64,
    /// Negative kriging variances down to `-variance × sill` are rounding
    /// noise and clamped to zero; anything lower is an anomaly.
    pub variance: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            pivot: 1.0e-10,
            variance: 1.0e-8,
        }
    }
}

impl Tolerances {
    pub fn validate(&self) -> Result<()> {
        if !(self.pivot.is_finite() && self.pivot > 0.0 && self.pivot < 1.0) {
            return Err(Error::invalid_parameter(
                "tolerances.pivot",
                self.pivot,
                "must be in (0, 1)",
            ));
        }
        if !(self.variance.is_finite() && self.variance >= 0.0) {
            return Err(Error::invalid_parameter(
                "tolerances.variance",
                self.variance,
                "must be non-negative",
            ));
        }
        Ok(())
    }
}
