//! Per-target results and run summaries

use serde::{Deserialize, Serialize};

use super::auxiliary::AuxiliaryEstimates;

/// Outcome of one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimationStatus {
    Ok,
    /// Estimated after dropping linearly dependent neighbors
    SingularRepaired,
    /// Fewer accepted neighbors than the search minimum
    TooFewNeighbors,
    /// The system could not be solved or produced an anomaly
    NotEstimated,
}

impl EstimationStatus {
    pub fn is_estimated(&self) -> bool {
        matches!(self, EstimationStatus::Ok | EstimationStatus::SingularRepaired)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EstimationStatus::Ok => "ok",
            EstimationStatus::SingularRepaired => "singular_repaired",
            EstimationStatus::TooFewNeighbors => "too_few_neighbors",
            EstimationStatus::NotEstimated => "not_estimated",
        }
    }
}

/// Last state a target reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetState {
    #[default]
    Pending,
    NeighborsFound,
    SystemBuilt,
    Solved,
    Done,
    Skipped,
}

/// Why a target was not estimated after its system was built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// Dropping dependent neighbors left fewer than the minimum
    RepairExhausted { remaining: usize },
    /// A drift column depends on the others; the drift cannot be resolved
    /// from these neighbors
    DriftUnresolved { term: usize },
    /// NaN or infinity in the solution, estimate or variance
    NonFinite,
    /// Kriging variance below the negative tolerance
    NegativeVariance { variance: f64 },
}

/// Diagnostics recorded for every target, whatever its outcome.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    pub state: TargetState,
    /// Neighbors used in the final system
    pub neighbor_count: usize,
    /// Sample indices removed to repair a singular system
    pub dropped: Vec<usize>,
    pub anomaly: Option<Anomaly>,
    /// Smallest over largest pivot magnitude
    pub pivot_ratio: Option<f64>,
    /// Lagrange multipliers of the drift terms
    pub lagrange: Vec<f64>,
    pub weight_sum: f64,
    pub positive_weight_sum: f64,
    /// Normalized distance of the closest neighbor
    pub nearest_distance: Option<f64>,
    pub sectors_informed: usize,
}

/// Estimate at one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationResult {
    pub estimate: Option<f64>,
    pub variance: Option<f64>,
    pub status: EstimationStatus,
    /// Sample indices of the neighbors, empty unless weights are kept
    pub neighbors: Vec<usize>,
    /// Kriging weights, parallel to `neighbors`
    pub weights: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auxiliary: Option<AuxiliaryEstimates>,
    pub diagnostics: Diagnostics,
}

impl EstimationResult {
    pub(crate) fn skipped(status: EstimationStatus, diagnostics: Diagnostics) -> Self {
        Self {
            estimate: None,
            variance: None,
            status,
            neighbors: Vec::new(),
            weights: Vec::new(),
            auxiliary: None,
            diagnostics,
        }
    }
}

/// Counters over a run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Targets requested
    pub total: usize,
    pub ok: usize,
    pub repaired: usize,
    pub too_few: usize,
    pub not_estimated: usize,
    /// Average neighbor count over estimated targets
    pub mean_neighbors: f64,
    /// Dispatch stopped before every target was processed
    pub cancelled: bool,
}

impl RunSummary {
    pub fn from_results(results: &[EstimationResult], total: usize, cancelled: bool) -> Self {
        let mut summary = RunSummary {
            total,
            cancelled,
            ..Default::default()
        };
        let mut neighbor_sum = 0usize;
        for r in results {
            match r.status {
                EstimationStatus::Ok => summary.ok += 1,
                EstimationStatus::SingularRepaired => summary.repaired += 1,
                EstimationStatus::TooFewNeighbors => summary.too_few += 1,
                EstimationStatus::NotEstimated => summary.not_estimated += 1,
            }
            if r.status.is_estimated() {
                neighbor_sum += r.diagnostics.neighbor_count;
            }
        }
        let estimated = summary.ok + summary.repaired;
        if estimated > 0 {
            summary.mean_neighbors = neighbor_sum as f64 / estimated as f64;
        }
        summary
    }

    /// Targets with a result
    pub fn processed(&self) -> usize {
        self.ok + self.repaired + self.too_few + self.not_estimated
    }
}

/// Results of [`Estimator::estimate`](super::Estimator::estimate), in target
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationRun {
    pub results: Vec<EstimationResult>,
    pub summary: RunSummary,
}

impl EstimationRun {
    /// Estimates in target order, `NaN` where not estimated.
    pub fn estimates(&self) -> Vec<f64> {
        self.results
            .iter()
            .map(|r| r.estimate.unwrap_or(f64::NAN))
            .collect()
    }

    /// Kriging variances in target order, `NaN` where not estimated.
    pub fn variances(&self) -> Vec<f64> {
        self.results
            .iter()
            .map(|r| r.variance.unwrap_or(f64::NAN))
            .collect()
    }
}
