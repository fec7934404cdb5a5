//! Neighborhood search
//!
//! Finds, for a target location, the samples inside the search ellipsoid,
//! ordered by normalized ellipsoid distance (ties by sample index), and
//! applies the neighborhood limits in that order:
//! - global maximum sample count,
//! - per-sector maximum (quadrants or octants of the ellipsoid frame),
//! - per-group maximum (samples from one drillhole).
//!
//! Candidates come from a super-block grid, so a query touches only the
//! blocks that can intersect the ellipsoid.

mod neighborhood;
mod params;
mod sector;
mod superblock;

pub use neighborhood::{informed_sectors, Exclusion, Neighbor, SearchScratch};
pub use params::{SearchParameters, SectorMode};
pub use superblock::MAX_BLOCKS;

use krigeo_core::{validate_samples, Point3, Result, RotationMatrix, Sample};
use tracing::debug;

use superblock::SuperBlockGrid;

/// Sample table indexed for neighborhood queries.
///
/// Built once per run; read-only and shared across workers afterwards.
#[derive(Debug, Clone)]
pub struct SearchIndex {
    samples: Vec<Sample>,
    params: SearchParameters,
    rotation: RotationMatrix,
    grid: SuperBlockGrid,
}

impl SearchIndex {
    /// Validate `samples` and `params` and build the super-block grid.
    pub fn new(samples: Vec<Sample>, params: SearchParameters) -> Result<Self> {
        params.validate()?;
        validate_samples(&samples)?;

        let rotation = params.ellipsoid.rotation();
        let grid = SuperBlockGrid::build(&samples, params.ellipsoid.half_extents());
        debug!(
            "search index: {} samples, {:?} super-blocks, {} offsets",
            samples.len(),
            grid.counts(),
            grid.offset_count()
        );

        Ok(Self {
            samples,
            params,
            rotation,
            grid,
        })
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn params(&self) -> &SearchParameters {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Fill `out` with the neighborhood of `target`.
    ///
    /// `out` is cleared first. Accepted neighbors are in ascending
    /// (distance, index) order.
    pub fn query(
        &self,
        target: &Point3,
        exclusion: Exclusion,
        scratch: &mut SearchScratch,
        out: &mut Vec<Neighbor>,
    ) {
        out.clear();
        scratch.reset();

        let mode = self.params.sectors;
        let candidates = &mut scratch.candidates;
        self.grid.for_each_candidate(target, |i| {
            let s = &self.samples[i];
            let hidden = match exclusion {
                Exclusion::None => false,
                Exclusion::Sample(j) => i == j,
                Exclusion::Group(g) => s.group == Some(g),
            };
            if hidden {
                return;
            }
            let u = self.rotation.apply(target.offset_to(&s.position()));
            let h2 = u[0] * u[0] + u[1] * u[1] + u[2] * u[2];
            if h2 <= 1.0 {
                candidates.push((h2.sqrt(), i, sector::classify(mode, u)));
            }
        });
        candidates.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let sector_cap = self.params.sector_cap();
        for &(distance, index, sector) in scratch.candidates.iter() {
            if out.len() >= self.params.max_samples {
                break;
            }
            if scratch.sector_counts[sector as usize] >= sector_cap {
                continue;
            }
            if let Some(max) = self.params.max_per_group
                && let Some(g) = self.samples[index].group
            {
                let count = scratch.group_counts.entry(g).or_insert(0);
                if *count >= max {
                    continue;
                }
                *count += 1;
            }
            scratch.sector_counts[sector as usize] += 1;
            out.push(Neighbor {
                index,
                distance,
                sector,
            });
        }
    }

    /// Allocating convenience wrapper around [`SearchIndex::query`].
    pub fn neighbors(&self, target: &Point3, exclusion: Exclusion) -> Vec<Neighbor> {
        let mut scratch = SearchScratch::new();
        let mut out = Vec::with_capacity(self.params.max_samples);
        self.query(target, exclusion, &mut scratch, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use krigeo_core::Anisotropy;

    fn scattered(n: usize, seed: u64) -> Vec<Sample> {
        let mut rng = seed;
        let mut next = || {
            rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (rng >> 33) as f64 / (1u64 << 31) as f64
        };
        (0..n)
            .map(|i| {
                let x = next() * 200.0;
                let y = next() * 200.0;
                let z = next() * 40.0;
                Sample::new(x, y, z, i as f64).with_group((i / 5) as u64)
            })
            .collect()
    }

    /// Exhaustive scan with the same ordering and limits.
    fn brute_force(index: &SearchIndex, target: &Point3, exclusion: Exclusion) -> Vec<Neighbor> {
        let p = index.params();
        let rot = p.ellipsoid.rotation();
        let mut all: Vec<(f64, usize, u8)> = index
            .samples()
            .iter()
            .enumerate()
            .filter(|(i, s)| match exclusion {
                Exclusion::None => true,
                Exclusion::Sample(j) => *i != j,
                Exclusion::Group(g) => s.group != Some(g),
            })
            .filter_map(|(i, s)| {
                let u = rot.apply(target.offset_to(&s.position()));
                let h2 = u[0] * u[0] + u[1] * u[1] + u[2] * u[2];
                (h2 <= 1.0).then(|| (h2.sqrt(), i, sector::classify(p.sectors, u)))
            })
            .collect();
        all.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut sectors = [0usize; 8];
        let mut groups = std::collections::HashMap::new();
        let mut out = Vec::new();
        for (distance, index_, sector) in all {
            if out.len() >= p.max_samples {
                break;
            }
            if sectors[sector as usize] >= p.sector_cap() {
                continue;
            }
            if let Some(max) = p.max_per_group {
                let g = index.samples()[index_].group.unwrap();
                let c = groups.entry(g).or_insert(0usize);
                if *c >= max {
                    continue;
                }
                *c += 1;
            }
            sectors[sector as usize] += 1;
            out.push(Neighbor {
                index: index_,
                distance,
                sector,
            });
        }
        out
    }

    #[test]
    fn test_matches_brute_force() {
        let samples = scattered(2000, 42);
        let params = SearchParameters {
            ellipsoid: Anisotropy::new([60.0, 30.0, 10.0], [35.0, 10.0, 0.0]),
            min_samples: 1,
            max_samples: 24,
            max_per_group: Some(3),
            sectors: SectorMode::Octants,
            max_per_sector: Some(4),
        };
        let index = SearchIndex::new(samples, params).unwrap();
        for t in scattered(50, 7) {
            let target = t.position();
            assert_eq!(
                index.neighbors(&target, Exclusion::None),
                brute_force(&index, &target, Exclusion::None),
                "mismatch at {target:?}"
            );
        }
    }

    #[test]
    fn test_matches_brute_force_unlimited() {
        let samples = scattered(800, 3);
        let params = SearchParameters {
            ellipsoid: Anisotropy::new([25.0, 25.0, 25.0], [0.0, 0.0, 0.0]),
            max_samples: 10_000,
            ..Default::default()
        };
        let index = SearchIndex::new(samples, params).unwrap();
        for t in scattered(30, 99) {
            let target = t.position();
            let fast = index.neighbors(&target, Exclusion::None);
            let slow = brute_force(&index, &target, Exclusion::None);
            assert_eq!(fast, slow);
        }
        // A target well outside the data
        let outside = Point3::new(-1000.0, -1000.0, 0.0);
        assert!(index.neighbors(&outside, Exclusion::None).is_empty());
    }

    #[test]
    fn test_sorted_with_index_ties() {
        let samples = vec![
            Sample::new(1.0, 0.0, 0.0, 1.0),
            Sample::new(-1.0, 0.0, 0.0, 2.0),
            Sample::new(0.0, 1.0, 0.0, 3.0),
            Sample::new(0.0, 0.5, 0.0, 4.0),
        ];
        let index = SearchIndex::new(samples, SearchParameters::isotropic(2.0)).unwrap();
        let found = index.neighbors(&Point3::default(), Exclusion::None);
        let order: Vec<usize> = found.iter().map(|n| n.index).collect();
        assert_eq!(order, vec![3, 0, 1, 2]);
        assert!((found[0].distance - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_exclusions() {
        let samples = vec![
            Sample::new(0.0, 0.0, 0.0, 1.0).with_group(1),
            Sample::new(0.0, 0.0, 1.0, 2.0).with_group(1),
            Sample::new(1.0, 0.0, 0.0, 3.0).with_group(2),
        ];
        let index = SearchIndex::new(samples, SearchParameters::isotropic(5.0)).unwrap();
        let o = Point3::default();
        let ids = |ex| -> Vec<usize> { index.neighbors(&o, ex).iter().map(|n| n.index).collect() };
        assert_eq!(ids(Exclusion::Sample(0)), vec![1, 2]);
        assert_eq!(ids(Exclusion::Group(1)), vec![2]);
        assert_eq!(ids(Exclusion::Group(9)), vec![0, 1, 2]);
    }

    #[test]
    fn test_group_cap() {
        let samples: Vec<Sample> = (0..10)
            .map(|i| Sample::new(0.0, 0.0, i as f64, i as f64).with_group(if i < 8 { 1 } else { 2 }))
            .collect();
        let params = SearchParameters {
            max_per_group: Some(2),
            ..SearchParameters::isotropic(50.0)
        };
        let index = SearchIndex::new(samples, params).unwrap();
        let found = index.neighbors(&Point3::default(), Exclusion::None);
        let ids: Vec<usize> = found.iter().map(|n| n.index).collect();
        assert_eq!(ids, vec![0, 1, 8, 9]);
    }

    #[test]
    fn test_quadrant_cap() {
        // Twelve samples in the first quadrant, one in each of the others
        let mut samples: Vec<Sample> = (1..=12)
            .map(|i| Sample::new(i as f64, i as f64, 0.0, 0.0))
            .collect();
        samples.push(Sample::new(-5.0, 5.0, 0.0, 0.0));
        samples.push(Sample::new(-5.0, -5.0, 0.0, 0.0));
        samples.push(Sample::new(5.0, -5.0, 0.0, 0.0));
        let params = SearchParameters {
            sectors: SectorMode::Quadrants,
            max_per_sector: Some(2),
            max_samples: 32,
            ..SearchParameters::isotropic(100.0)
        };
        let index = SearchIndex::new(samples, params).unwrap();
        let found = index.neighbors(&Point3::default(), Exclusion::None);
        assert_eq!(found.len(), 5);
        assert_eq!(informed_sectors(&found), 4);
    }

    #[test]
    fn test_rejects_invalid_samples() {
        let samples = vec![Sample::new(f64::INFINITY, 0.0, 0.0, 1.0)];
        assert!(SearchIndex::new(samples, SearchParameters::default()).is_err());
    }
}
