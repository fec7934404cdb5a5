//! Kriging system assembly
//!
//! For `k` neighbors and `d` drift functions the system has `k + d`
//! unknowns. The covariance block is point-to-point for every support;
//! only the right-hand side changes for blocks (average covariance over the
//! discretization points). The builder writes into the leading corner of
//! worker-local buffers and never solves.

use krigeo_core::{Point3, Sample, Support, Target};
use ndarray::{s, Array1, Array2, ArrayViewMut1, ArrayViewMut2};

use super::block::{block_covariance, mean_covariance};
use super::drift::{DriftSet, MAX_DRIFT};
use super::solver::{self, SolveFailure};
use crate::search::{Neighbor, SearchScratch};
use crate::variogram::VariogramModel;

/// Per-worker scratch buffers for one target at a time.
///
/// Sized for the maximum neighbor count plus drift terms; grows if a
/// larger system ever shows up.
#[derive(Debug)]
pub struct KrigingWorkspace {
    pub(crate) search: SearchScratch,
    pub(crate) neighbors: Vec<Neighbor>,
    pub(crate) points: Vec<Point3>,
    pub(crate) lhs: Array2<f64>,
    pub(crate) rhs: Array1<f64>,
    pub(crate) solution: Array1<f64>,
    block_cache: Option<(Support, f64)>,
}

impl KrigingWorkspace {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            search: SearchScratch::new(),
            neighbors: Vec::with_capacity(capacity),
            points: Vec::new(),
            lhs: Array2::zeros((capacity, capacity)),
            rhs: Array1::zeros(capacity),
            solution: Array1::zeros(capacity),
            block_cache: None,
        }
    }

    /// Largest system the buffers hold without reallocating
    pub fn capacity(&self) -> usize {
        self.rhs.len()
    }

    pub(crate) fn reserve(&mut self, n: usize) {
        if n > self.capacity() {
            self.lhs = Array2::zeros((n, n));
            self.rhs = Array1::zeros(n);
            self.solution = Array1::zeros(n);
        }
    }

    /// Covariance of the target support with itself: the sill for a point,
    /// the block covariance for a block.
    ///
    /// Block covariances only depend on the block geometry, so the last one
    /// is cached.
    pub(crate) fn target_covariance(&mut self, model: &VariogramModel, target: &Target) -> f64 {
        let Support::Block {
            size,
            discretization,
        } = target.support
        else {
            return model.sill();
        };
        if let Some((support, cbb)) = self.block_cache
            && support == target.support
        {
            return cbb;
        }
        // Centered at the origin so the value does not depend on the target
        let mut points = Vec::with_capacity(discretization.count());
        Target::block(Point3::default(), size, discretization).discretize(&mut points);
        let cbb = block_covariance(model, &points);
        self.block_cache = Some((target.support, cbb));
        cbb
    }
}

/// Assembles kriging systems for one model and drift set.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SystemBuilder<'a> {
    pub(crate) model: &'a VariogramModel,
    pub(crate) drift: &'a DriftSet,
    pub(crate) samples: &'a [Sample],
}

impl SystemBuilder<'_> {
    pub(crate) fn size(&self, neighbor_count: usize) -> usize {
        neighbor_count + self.drift.len()
    }

    /// Fill the `size × size` system for `neighbors` and `target`.
    ///
    /// `points` are the target's discretization points.
    pub(crate) fn assemble(
        &self,
        neighbors: &[Neighbor],
        target: &Target,
        points: &[Point3],
        mut lhs: ArrayViewMut2<f64>,
        mut rhs: ArrayViewMut1<f64>,
    ) {
        let k = neighbors.len();
        let nd = self.drift.len();
        let origin = &target.center;
        let mut row = [0.0; MAX_DRIFT];

        for (i, ni) in neighbors.iter().enumerate() {
            let si = &self.samples[ni.index];
            let pi = si.position();

            lhs[[i, i]] = self.model.sill();
            for (j, nj) in neighbors.iter().enumerate().skip(i + 1) {
                let c = self.model.covariance(&pi, &self.samples[nj.index].position());
                lhs[[i, j]] = c;
                lhs[[j, i]] = c;
            }

            self.drift.fill_sample(si, origin, &mut row[..nd]);
            for (l, &f) in row[..nd].iter().enumerate() {
                lhs[[i, k + l]] = f;
                lhs[[k + l, i]] = f;
            }

            rhs[i] = mean_covariance(self.model, &pi, points);
        }

        lhs.slice_mut(s![k..k + nd, k..k + nd]).fill(0.0);
        self.drift.fill_target(origin, points, target.secondary, &mut row[..nd]);
        for (l, &f) in row[..nd].iter().enumerate() {
            rhs[k + l] = f;
        }
    }
}

/// A fully assembled kriging system, detached from any workspace.
///
/// Built by [`Estimator::system`](super::Estimator::system) for inspection
/// and testing; the estimator itself works on workspace buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct KrigingSystem {
    pub neighbors: Vec<Neighbor>,
    pub lhs: Array2<f64>,
    pub rhs: Array1<f64>,
    /// Number of drift rows after the neighbor rows
    pub drift_terms: usize,
}

impl KrigingSystem {
    pub(crate) fn build(builder: &SystemBuilder<'_>, neighbors: Vec<Neighbor>, target: &Target) -> Self {
        let n = builder.size(neighbors.len());
        let mut points = Vec::with_capacity(target.point_count());
        target.discretize(&mut points);

        let mut lhs = Array2::zeros((n, n));
        let mut rhs = Array1::zeros(n);
        builder.assemble(&neighbors, target, &points, lhs.view_mut(), rhs.view_mut());
        Self {
            neighbors,
            lhs,
            rhs,
            drift_terms: builder.drift.len(),
        }
    }

    pub fn size(&self) -> usize {
        self.rhs.len()
    }

    /// Solve for the weights followed by the Lagrange multipliers.
    pub fn solve(&self, pivot_tolerance: f64) -> Result<(Array1<f64>, f64), SolveFailure> {
        solver::solve(&self.lhs, &self.rhs, pivot_tolerance)
    }

    /// Largest absolute residual `|A·x − b|` of a candidate solution.
    pub fn max_residual(&self, x: &Array1<f64>) -> f64 {
        (self.lhs.dot(x) - &self.rhs)
            .iter()
            .fold(0.0_f64, |m, r| m.max(r.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kriging::drift::DriftTerms;
    use crate::variogram::Structure;
    use krigeo_core::Discretization;

    fn setup() -> (VariogramModel, Vec<Sample>, Vec<Neighbor>) {
        let model = VariogramModel::new(0.1, vec![Structure::spherical(0.9, 10.0)]).unwrap();
        let samples = vec![
            Sample::new(0.0, 0.0, 0.0, 1.0),
            Sample::new(3.0, 0.0, 0.0, 2.0),
            Sample::new(0.0, 4.0, 0.0, 3.0),
        ];
        let neighbors = (0..3)
            .map(|index| Neighbor {
                index,
                distance: 0.0,
                sector: 0,
            })
            .collect();
        (model, samples, neighbors)
    }

    #[test]
    fn test_ordinary_layout_symmetric() {
        let (model, samples, neighbors) = setup();
        let drift = DriftSet::Polynomial {
            monomials: Vec::new(),
            scale: 1.0,
        };
        let builder = SystemBuilder {
            model: &model,
            drift: &drift,
            samples: &samples,
        };
        let sys = KrigingSystem::build(&builder, neighbors, &Target::point(1.0, 1.0, 0.0));
        assert_eq!(sys.size(), 4);
        for i in 0..4 {
            for j in 0..4 {
                assert_eq!(sys.lhs[[i, j]], sys.lhs[[j, i]]);
            }
        }
        assert_eq!(sys.lhs[[0, 0]], 1.0);
        assert_eq!(sys.lhs[[3, 3]], 0.0);
        assert_eq!(sys.lhs[[1, 3]], 1.0);
        assert_eq!(sys.rhs[3], 1.0);
        let c01 = model.covariance(&samples[0].position(), &samples[1].position());
        assert_eq!(sys.lhs[[0, 1]], c01);
    }

    #[test]
    fn test_simple_has_no_drift_rows() {
        let (model, samples, neighbors) = setup();
        let builder = SystemBuilder {
            model: &model,
            drift: &DriftSet::None,
            samples: &samples,
        };
        let sys = KrigingSystem::build(&builder, neighbors, &Target::point(1.0, 1.0, 0.0));
        assert_eq!(sys.size(), 3);
        assert_eq!(sys.drift_terms, 0);
    }

    #[test]
    fn test_universal_rows() {
        let (model, samples, neighbors) = setup();
        let drift = DriftSet::Polynomial {
            monomials: DriftTerms::linear_horizontal().monomials(),
            scale: 0.1,
        };
        let builder = SystemBuilder {
            model: &model,
            drift: &drift,
            samples: &samples,
        };
        let sys = KrigingSystem::build(&builder, neighbors, &Target::point(0.0, 0.0, 0.0));
        assert_eq!(sys.size(), 6);
        // x drift of sample 1, relative to the target and scaled
        assert!((sys.lhs[[1, 4]] - 0.3).abs() < 1e-12);
        assert!((sys.lhs[[2, 5]] - 0.4).abs() < 1e-12);
        assert_eq!(sys.rhs[4], 0.0);
    }

    #[test]
    fn test_block_rhs_without_nugget() {
        let (model, samples, neighbors) = setup();
        let builder = SystemBuilder {
            model: &model,
            drift: &DriftSet::None,
            samples: &samples,
        };
        let target = Target::block(Point3::new(0.0, 0.0, 0.0), [2.0, 2.0, 2.0], Discretization::new(2, 2, 2));
        let sys = KrigingSystem::build(&builder, neighbors, &target);
        // Sample 0 sits at the block center, away from every discretization point
        assert!(sys.rhs[0] < 0.9);
        // Sample-to-sample part stays point covariance
        assert_eq!(sys.lhs[[0, 0]], model.sill());
    }

    #[test]
    fn test_block_covariance_cached_per_support() {
        let (model, _, _) = setup();
        let mut ws = KrigingWorkspace::new(4);
        let a = Target::block(Point3::new(0.0, 0.0, 0.0), [4.0, 4.0, 2.0], Discretization::new(3, 3, 2));
        let b = Target::block(Point3::new(1e5, 2e5, 10.0), [4.0, 4.0, 2.0], Discretization::new(3, 3, 2));
        let ca = ws.target_covariance(&model, &a);
        let cb = ws.target_covariance(&model, &b);
        assert_eq!(ca, cb);
        assert!(ca < model.sill());
        assert_eq!(ws.target_covariance(&model, &Target::point(0.0, 0.0, 0.0)), model.sill());
    }

    #[test]
    fn test_workspace_grows() {
        let mut ws = KrigingWorkspace::new(2);
        ws.reserve(10);
        assert_eq!(ws.capacity(), 10);
        ws.reserve(3);
        assert_eq!(ws.capacity(), 10);
    }
}
