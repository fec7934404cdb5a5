//! Cross validation
//!
//! Each sample is estimated from the others, either with only itself
//! removed or with its whole source group removed (drillhole-out). Errors
//! are `estimate − true value`; the standardized squared error divides by
//! the kriging variance and should average near 1 for a sound model.

use krigeo_core::{Result, Target};
use krigeo_parallel::map_chunks;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::estimator::Estimator;
use super::result::EstimationResult;
use crate::search::Exclusion;

/// What is hidden from the search while estimating a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossValidationMode {
    /// The sample itself
    #[default]
    LeaveOneOut,
    /// Every sample of the same source group; samples without a group
    /// fall back to leave-one-out
    LeaveGroupOut,
}

/// Estimate at one sample location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationRecord {
    /// Sample index
    pub index: usize,
    pub truth: f64,
    /// `estimate − truth`, when estimated
    pub error: Option<f64>,
    pub result: EstimationResult,
}

/// Error statistics over the estimated samples.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CrossValidationSummary {
    pub count: usize,
    pub estimated: usize,
    pub mean_error: f64,
    pub mean_squared_error: f64,
    /// Mean of `error² / variance` over samples with positive variance
    pub mean_standardized_squared_error: f64,
}

impl CrossValidationSummary {
    pub fn from_records(records: &[CrossValidationRecord]) -> Self {
        let mut summary = CrossValidationSummary {
            count: records.len(),
            ..Default::default()
        };
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        let mut sum_std = 0.0;
        let mut n_std = 0usize;
        for r in records {
            let Some(e) = r.error else { continue };
            summary.estimated += 1;
            sum += e;
            sum_sq += e * e;
            if let Some(v) = r.result.variance
                && v > 0.0
            {
                sum_std += e * e / v;
                n_std += 1;
            }
        }
        if summary.estimated > 0 {
            summary.mean_error = sum / summary.estimated as f64;
            summary.mean_squared_error = sum_sq / summary.estimated as f64;
        }
        if n_std > 0 {
            summary.mean_standardized_squared_error = sum_std / n_std as f64;
        }
        summary
    }
}

/// Records in sample order plus their summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidation {
    pub records: Vec<CrossValidationRecord>,
    pub summary: CrossValidationSummary,
}

impl Estimator {
    /// Estimate every sample from the remaining ones.
    pub fn cross_validate(&self, mode: CrossValidationMode) -> Result<CrossValidation> {
        let samples = self.samples();
        let indices: Vec<usize> = (0..samples.len()).collect();
        let options = self.options();

        let output = map_chunks(
            options.mode,
            &indices,
            options.chunk_size,
            None,
            || self.workspace(),
            |ws, &i| {
                let s = &samples[i];
                let exclusion = match (mode, s.group) {
                    (CrossValidationMode::LeaveGroupOut, Some(g)) => Exclusion::Group(g),
                    _ => Exclusion::Sample(i),
                };
                let mut target = Target::point(s.x, s.y, s.z);
                target.secondary = s.secondary;
                let result = self.krige(&target, exclusion, ws);
                CrossValidationRecord {
                    index: i,
                    truth: s.value,
                    error: result.estimate.map(|z| z - s.value),
                    result,
                }
            },
        )?;

        let summary = CrossValidationSummary::from_records(&output.results);
        debug!(
            "cross validation ({:?}): {}/{} estimated, ME {:.4}, MSE {:.4}, MSSE {:.4}",
            mode,
            summary.estimated,
            summary.count,
            summary.mean_error,
            summary.mean_squared_error,
            summary.mean_standardized_squared_error
        );
        Ok(CrossValidation {
            records: output.results,
            summary,
        })
    }
}
