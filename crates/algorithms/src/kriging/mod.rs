//! Kriging estimation
//!
//! Best linear unbiased estimation at points and blocks from a sample
//! neighborhood. One assembly path serves every variant; they differ only
//! in the drift functions appended to the covariance system:
//! - Simple: known global mean, no constraint
//! - Ordinary: unknown constant mean, one constraint Σwᵢ = 1
//! - Universal: constant plus polynomial trend in the coordinates
//! - External drift: constant plus a linear function of a secondary variable
//! - Local mean: simple kriging of residuals from a locally varying mean
//!
//! Reference:
//! Matheron, G. (1963). Principles of geostatistics. Economic Geology.
//! Deutsch, C.V. & Journel, A.G. (1998). GSLIB, 2nd ed., §IV.1 (`kt3d`).
//! Goovaerts, P. (1997). Geostatistics for Natural Resources Evaluation, ch. 5–6.

mod auxiliary;
mod block;
mod cross_validation;
mod drift;
mod estimator;
mod result;
mod solver;
mod system;

pub use auxiliary::{AuxiliaryEstimates, AuxiliaryOptions};
pub use block::{block_covariance, mean_covariance};
pub use cross_validation::{
    CrossValidation, CrossValidationMode, CrossValidationRecord, CrossValidationSummary,
};
pub use drift::DriftTerms;
pub use estimator::{estimate, Estimator};
pub use result::{
    Anomaly, Diagnostics, EstimationResult, EstimationRun, EstimationStatus, RunSummary,
    TargetState,
};
pub use solver::{solve, solve_in_place, SolveFailure};
pub use system::{KrigingSystem, KrigingWorkspace};

use krigeo_core::{Error, Result, Tolerances};
use krigeo_parallel::ProcessingMode;
use serde::{Deserialize, Serialize};

use drift::DriftSet;

/// Kriging variant
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KrigingType {
    /// Known mean; `None` uses the declustered sample mean
    Simple {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mean: Option<f64>,
    },
    #[default]
    Ordinary,
    Universal {
        #[serde(default)]
        drift: DriftTerms,
    },
    /// Drift linear in the samples' and targets' secondary values
    ExternalDrift,
    /// Simple kriging around the samples' and targets' secondary values
    LocalMean,
}

impl KrigingType {
    pub fn name(&self) -> &'static str {
        match self {
            KrigingType::Simple { .. } => "simple",
            KrigingType::Ordinary => "ordinary",
            KrigingType::Universal { .. } => "universal",
            KrigingType::ExternalDrift => "external drift",
            KrigingType::LocalMean => "local mean",
        }
    }

    /// Whether samples and targets need a secondary value
    pub fn needs_secondary(&self) -> bool {
        matches!(self, KrigingType::ExternalDrift | KrigingType::LocalMean)
    }

    /// Number of drift rows added to the system
    pub fn drift_terms(&self) -> usize {
        self.drift_set(1.0).len()
    }

    pub fn validate(&self) -> Result<()> {
        if let KrigingType::Simple { mean: Some(m) } = self
            && !m.is_finite()
        {
            return Err(Error::invalid_parameter(
                "kriging.mean",
                m,
                "simple kriging mean must be finite",
            ));
        }
        Ok(())
    }

    pub(crate) fn drift_set(&self, max_radius: f64) -> DriftSet {
        match self {
            KrigingType::Simple { .. } | KrigingType::LocalMean => DriftSet::None,
            KrigingType::Ordinary => DriftSet::Polynomial {
                monomials: Vec::new(),
                scale: 1.0,
            },
            KrigingType::Universal { drift } => DriftSet::Polynomial {
                monomials: drift.monomials(),
                scale: 1.0 / max_radius,
            },
            KrigingType::ExternalDrift => DriftSet::External,
        }
    }
}

/// Run-wide estimation options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KrigingOptions {
    pub tolerances: Tolerances,
    /// Keep neighbor indices and weights in every result (default: true)
    pub keep_weights: bool,
    pub auxiliary: AuxiliaryOptions,
    pub mode: ProcessingMode,
    /// Targets per dispatched chunk (default: 256)
    pub chunk_size: usize,
}

impl Default for KrigingOptions {
    fn default() -> Self {
        Self {
            tolerances: Tolerances::default(),
            keep_weights: true,
            auxiliary: AuxiliaryOptions::default(),
            mode: ProcessingMode::default(),
            chunk_size: 256,
        }
    }
}

impl KrigingOptions {
    pub fn validate(&self) -> Result<()> {
        self.tolerances.validate()?;
        self.auxiliary.validate()?;
        self.mode.validate()?;
        if self.chunk_size == 0 {
            return Err(Error::invalid_parameter(
                "options.chunk_size",
                0,
                "must be at least 1",
            ));
        }
        Ok(())
    }
}
