//! Estimator driver
//!
//! Each target goes through
//! ```text
//! Pending → NeighborsFound → SystemBuilt → Solved → Done
//!              ↘ Skipped (too few neighbors, failed repair, anomaly)
//! ```
//! A singular system is repaired by dropping the neighbor whose column is
//! dependent on the previous ones and solving again, as long as the
//! neighborhood keeps the search minimum.
//!
//! The estimate and kriging variance for weights `w` and Lagrange
//! multipliers `μ` are
//! ```text
//! z* = Σ wᵢ·zᵢ                         ordinary / universal / external drift
//! z* = m + Σ wᵢ·(zᵢ − m)               simple, global mean m
//! z* = m₀ + Σ wᵢ·(zᵢ − mᵢ)             simple, local means
//! σ² = C(x₀, x₀) − Σ wᵢ·cᵢ − Σ μₗ·fₗ(x₀)
//! ```

use krigeo_core::{declustered_mean, Error, Result, Sample, Target};
use krigeo_parallel::{map_chunks, CancelToken};
use ndarray::s;
use tracing::{debug, warn};

use super::auxiliary::{self, AuxiliaryEstimates};
use super::drift::DriftSet;
use super::result::{
    Anomaly, Diagnostics, EstimationResult, EstimationRun, EstimationStatus, RunSummary,
    TargetState,
};
use super::solver::{solve_in_place, SolveFailure};
use super::system::{KrigingSystem, KrigingWorkspace, SystemBuilder};
use super::{KrigingOptions, KrigingType};
use crate::search::{informed_sectors, Exclusion, SearchIndex, SearchParameters};
use crate::variogram::VariogramModel;

/// Kriging estimator over a fixed sample table.
///
/// Samples, model and search index are read-only after construction, so
/// one estimator can serve any number of targets from any number of threads.
#[derive(Debug, Clone)]
pub struct Estimator {
    index: SearchIndex,
    model: VariogramModel,
    kind: KrigingType,
    /// Global mean for simple kriging
    mean: f64,
    drift: DriftSet,
    options: KrigingOptions,
}

impl Estimator {
    /// Validate every input and build the search index.
    ///
    /// # Errors
    /// - [`Error::InvalidParameter`] for bad search parameters, options,
    ///   non-finite samples, or samples without the secondary value that
    ///   external drift and local mean kriging need
    /// - [`Error::Algorithm`] for simple kriging without a mean and without
    ///   samples to derive one from
    pub fn new(
        samples: Vec<Sample>,
        model: VariogramModel,
        search: SearchParameters,
        kind: KrigingType,
        options: KrigingOptions,
    ) -> Result<Self> {
        options.validate()?;
        kind.validate()?;
        if kind.needs_secondary()
            && let Some(i) = samples.iter().position(|s| s.secondary.is_none())
        {
            return Err(Error::invalid_parameter(
                "samples",
                i,
                format!("{} kriging needs a secondary value on every sample", kind.name()),
            ));
        }

        let mean = match kind {
            KrigingType::Simple { mean: Some(m) } => m,
            KrigingType::Simple { mean: None } => declustered_mean(&samples).ok_or_else(|| {
                Error::Algorithm("simple kriging needs a mean or at least one sample".into())
            })?,
            _ => 0.0,
        };
        let drift = kind.drift_set(search.ellipsoid.max_range());
        let index = SearchIndex::new(samples, search)?;

        debug!(
            "estimator: {} kriging, {} samples, model {}",
            kind.name(),
            index.len(),
            model
        );

        Ok(Self {
            index,
            model,
            kind,
            mean,
            drift,
            options,
        })
    }

    pub fn samples(&self) -> &[Sample] {
        self.index.samples()
    }

    pub fn search_index(&self) -> &SearchIndex {
        &self.index
    }

    pub fn model(&self) -> &VariogramModel {
        &self.model
    }

    pub fn kind(&self) -> &KrigingType {
        &self.kind
    }

    pub fn options(&self) -> &KrigingOptions {
        &self.options
    }

    /// Mean used by simple kriging (given or declustered)
    pub fn simple_mean(&self) -> Option<f64> {
        matches!(self.kind, KrigingType::Simple { .. }).then_some(self.mean)
    }

    /// Scratch buffers sized for this estimator's largest system.
    pub fn workspace(&self) -> KrigingWorkspace {
        KrigingWorkspace::new(self.index.params().max_samples + self.drift.len())
    }

    pub(crate) fn builder(&self) -> SystemBuilder<'_> {
        SystemBuilder {
            model: &self.model,
            drift: &self.drift,
            samples: self.index.samples(),
        }
    }

    /// Check that targets are well formed and carry what the kriging type
    /// needs.
    pub fn validate_targets(&self, targets: &[Target]) -> Result<()> {
        for (i, t) in targets.iter().enumerate() {
            t.validate()?;
            if self.kind.needs_secondary() && t.secondary.is_none() {
                return Err(Error::invalid_parameter(
                    "targets",
                    i,
                    format!("{} kriging needs a secondary value on every target", self.kind.name()),
                ));
            }
        }
        Ok(())
    }

    /// Estimate every target, in order.
    pub fn estimate(&self, targets: &[Target]) -> Result<EstimationRun> {
        self.run(targets, None)
    }

    /// Estimate every target, stopping early once `cancel` is set.
    ///
    /// Chunks already dispatched complete; the run returns the results of
    /// the completed prefix with `summary.cancelled` set.
    pub fn estimate_with_cancel(
        &self,
        targets: &[Target],
        cancel: &CancelToken,
    ) -> Result<EstimationRun> {
        self.run(targets, Some(cancel))
    }

    fn run(&self, targets: &[Target], cancel: Option<&CancelToken>) -> Result<EstimationRun> {
        self.validate_targets(targets)?;
        let output = map_chunks(
            self.options.mode,
            targets,
            self.options.chunk_size,
            cancel,
            || self.workspace(),
            |ws, target| self.krige(target, Exclusion::None, ws),
        )?;

        let summary = RunSummary::from_results(&output.results, targets.len(), output.cancelled);
        debug!(
            "estimated {}/{} targets: {} ok, {} repaired, {} too few, {} not estimated, {:.1} neighbors avg{}",
            summary.processed(),
            summary.total,
            summary.ok,
            summary.repaired,
            summary.too_few,
            summary.not_estimated,
            summary.mean_neighbors,
            if summary.cancelled { " (cancelled)" } else { "" }
        );
        Ok(EstimationRun {
            results: output.results,
            summary,
        })
    }

    /// Lazy, sequential estimation with a single workspace.
    pub fn estimate_iter<'a>(
        &'a self,
        targets: &'a [Target],
    ) -> Result<impl Iterator<Item = EstimationResult> + 'a> {
        self.validate_targets(targets)?;
        let mut ws = self.workspace();
        Ok(targets
            .iter()
            .map(move |t| self.krige(t, Exclusion::None, &mut ws)))
    }

    /// Estimate one target with caller-owned buffers.
    pub fn estimate_target(
        &self,
        target: &Target,
        workspace: &mut KrigingWorkspace,
    ) -> Result<EstimationResult> {
        self.validate_targets(std::slice::from_ref(target))?;
        Ok(self.krige(target, Exclusion::None, workspace))
    }

    /// The kriging system for `target` over its full neighborhood, before
    /// any repair.
    pub fn system(&self, target: &Target) -> Result<KrigingSystem> {
        self.validate_targets(std::slice::from_ref(target))?;
        let neighbors = self.index.neighbors(&target.center, Exclusion::None);
        Ok(KrigingSystem::build(&self.builder(), neighbors, target))
    }

    pub(crate) fn krige(
        &self,
        target: &Target,
        exclusion: Exclusion,
        ws: &mut KrigingWorkspace,
    ) -> EstimationResult {
        let samples = self.index.samples();
        let min_samples = self.index.params().min_samples;
        let mut diag = Diagnostics::default();

        self.index
            .query(&target.center, exclusion, &mut ws.search, &mut ws.neighbors);
        diag.neighbor_count = ws.neighbors.len();
        diag.nearest_distance = ws.neighbors.first().map(|n| n.distance);
        diag.sectors_informed = informed_sectors(&ws.neighbors);
        let aux = auxiliary::compute(&self.options.auxiliary, samples, &ws.neighbors);

        if ws.neighbors.len() < min_samples {
            diag.state = TargetState::Skipped;
            let mut result = EstimationResult::skipped(EstimationStatus::TooFewNeighbors, diag);
            result.auxiliary = aux;
            return result;
        }
        diag.state = TargetState::NeighborsFound;

        target.discretize(&mut ws.points);
        let c00 = ws.target_covariance(&self.model, target);
        let builder = self.builder();
        let tolerances = self.options.tolerances;

        let pivot_ratio = loop {
            let k = ws.neighbors.len();
            let n = builder.size(k);
            ws.reserve(n);
            builder.assemble(
                &ws.neighbors,
                target,
                &ws.points,
                ws.lhs.slice_mut(s![..n, ..n]),
                ws.rhs.slice_mut(s![..n]),
            );
            diag.state = TargetState::SystemBuilt;

            ws.solution
                .slice_mut(s![..n])
                .assign(&ws.rhs.slice(s![..n]));
            match solve_in_place(
                ws.lhs.slice_mut(s![..n, ..n]),
                ws.solution.slice_mut(s![..n]),
                tolerances.pivot,
            ) {
                Ok(ratio) => break ratio,
                Err(SolveFailure::Singular { column }) if column < k => {
                    let removed = ws.neighbors.remove(column);
                    diag.dropped.push(removed.index);
                    diag.neighbor_count = ws.neighbors.len();
                    if ws.neighbors.len() < min_samples {
                        let anomaly = Anomaly::RepairExhausted {
                            remaining: ws.neighbors.len(),
                        };
                        return self.not_estimated(target, diag, anomaly, aux);
                    }
                }
                Err(SolveFailure::Singular { column }) => {
                    let anomaly = Anomaly::DriftUnresolved { term: column - k };
                    return self.not_estimated(target, diag, anomaly, aux);
                }
                Err(SolveFailure::NonFinite) => {
                    return self.not_estimated(target, diag, Anomaly::NonFinite, aux);
                }
            }
        };
        diag.state = TargetState::Solved;
        diag.pivot_ratio = Some(pivot_ratio);

        let k = ws.neighbors.len();
        let n = builder.size(k);
        let x = ws.solution.slice(s![..n]);
        let weights = x.slice(s![..k]);
        let variance = c00 - x.dot(&ws.rhs.slice(s![..n]));

        let (target_mean, sample_mean): (f64, fn(&Sample, f64) -> f64) = match self.kind {
            KrigingType::Simple { .. } => (self.mean, |_, m| m),
            KrigingType::LocalMean => (target.secondary.unwrap_or(0.0), |s, _| {
                s.secondary.unwrap_or(0.0)
            }),
            _ => (0.0, |_, _| 0.0),
        };
        let estimate = target_mean
            + ws.neighbors
                .iter()
                .zip(weights.iter())
                .map(|(nb, w)| {
                    let s = &samples[nb.index];
                    w * (s.value - sample_mean(s, self.mean))
                })
                .sum::<f64>();

        diag.lagrange = x.slice(s![k..]).to_vec();
        diag.weight_sum = weights.sum();
        diag.positive_weight_sum = weights.iter().filter(|w| **w > 0.0).sum();

        if !estimate.is_finite() || !variance.is_finite() {
            return self.not_estimated(target, diag, Anomaly::NonFinite, aux);
        }
        let variance = if variance < 0.0 {
            if variance < -tolerances.variance * self.model.sill() {
                return self.not_estimated(target, diag, Anomaly::NegativeVariance { variance }, aux);
            }
            0.0
        } else {
            variance
        };

        let (neighbors, weights) = if self.options.keep_weights {
            (
                ws.neighbors.iter().map(|nb| nb.index).collect(),
                weights.to_vec(),
            )
        } else {
            (Vec::new(), Vec::new())
        };
        let status = if diag.dropped.is_empty() {
            EstimationStatus::Ok
        } else {
            EstimationStatus::SingularRepaired
        };
        diag.state = TargetState::Done;

        EstimationResult {
            estimate: Some(estimate),
            variance: Some(variance),
            status,
            neighbors,
            weights,
            auxiliary: aux,
            diagnostics: diag,
        }
    }

    fn not_estimated(
        &self,
        target: &Target,
        mut diag: Diagnostics,
        anomaly: Anomaly,
        aux: Option<AuxiliaryEstimates>,
    ) -> EstimationResult {
        let c = &target.center;
        warn!(
            "target ({:.3}, {:.3}, {:.3}) not estimated: {:?} ({} neighbors, dropped {:?}, state {:?})",
            c.x, c.y, c.z, anomaly, diag.neighbor_count, diag.dropped, diag.state
        );
        diag.anomaly = Some(anomaly);
        diag.state = TargetState::Skipped;
        let mut result = EstimationResult::skipped(EstimationStatus::NotEstimated, diag);
        result.auxiliary = aux;
        result
    }
}

/// One-shot estimation with default options.
pub fn estimate(
    targets: &[Target],
    samples: Vec<Sample>,
    model: VariogramModel,
    search: SearchParameters,
    kind: KrigingType,
) -> Result<EstimationRun> {
    Estimator::new(samples, model, search, kind, KrigingOptions::default())?.estimate(targets)
}
