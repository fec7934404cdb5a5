//! Super-block grid over the sample bounding box
//!
//! The bounding box is cut into at most `MAX_BLOCKS` cells per axis, each
//! roughly half the ellipsoid's axis-aligned half extent. Sample indices are
//! stored block by block in a compressed row layout:
//! ```text
//! members[starts[b] .. starts[b + 1]]   samples of block b, ascending index
//! ```
//! A query visits a precomputed list of block offsets, sorted by the
//! smallest possible gap between the target's block and the offset block
//! (spiral order). Offsets whose gap exceeds the ellipsoid's half extent on
//! any axis can never hold a sample inside the ellipsoid and are left out.
//!
//! Reference:
//! Deutsch, C.V. & Journel, A.G. (1998). GSLIB, 2nd ed., §II.4
//! (subroutines `setsupr`, `picksup`, `srchsupr`).

use krigeo_core::{Extent3, Point3, Sample};

/// Maximum number of super-blocks along one axis
pub const MAX_BLOCKS: usize = 64;

#[derive(Debug, Clone)]
pub(crate) struct SuperBlockGrid {
    origin: [f64; 3],
    size: [f64; 3],
    counts: [usize; 3],
    starts: Vec<usize>,
    members: Vec<usize>,
    /// Block offsets in visiting order
    offsets: Vec<[i64; 3]>,
}

impl SuperBlockGrid {
    /// Build the grid for `samples` and an ellipsoid with the given
    /// axis-aligned half extents.
    pub(crate) fn build(samples: &[Sample], half_extents: [f64; 3]) -> Self {
        let extent = Extent3::from_points(samples.iter().map(Sample::position))
            .unwrap_or(Extent3 {
                min: [0.0; 3],
                max: [0.0; 3],
            });

        let mut origin = [0.0; 3];
        let mut size = [0.0; 3];
        let mut counts = [1usize; 3];
        for axis in 0..3 {
            origin[axis] = extent.min[axis];
            let desired = (0.5 * half_extents[axis]).max(f64::MIN_POSITIVE);
            let length = extent.length(axis);
            let n = ((length / desired).ceil() as usize).clamp(1, MAX_BLOCKS);
            counts[axis] = n;
            size[axis] = if n == 1 {
                desired.max(length)
            } else {
                length / n as f64
            };
        }

        let mut grid = Self {
            origin,
            size,
            counts,
            starts: Vec::new(),
            members: Vec::new(),
            offsets: Vec::new(),
        };
        grid.fill(samples);
        grid.offsets = grid.visit_order(half_extents);
        grid
    }

    fn fill(&mut self, samples: &[Sample]) {
        let n_blocks = self.block_count();
        let mut keyed: Vec<(usize, usize)> = samples
            .iter()
            .enumerate()
            .map(|(i, s)| (self.block_of_sample(&s.position()), i))
            .collect();
        keyed.sort_unstable();

        let mut starts = vec![0usize; n_blocks + 1];
        for &(block, _) in &keyed {
            starts[block + 1] += 1;
        }
        for b in 0..n_blocks {
            starts[b + 1] += starts[b];
        }
        self.starts = starts;
        self.members = keyed.into_iter().map(|(_, i)| i).collect();
    }

    /// Offsets sorted by the smallest gap between two blocks that far apart.
    fn visit_order(&self, half_extents: [f64; 3]) -> Vec<[i64; 3]> {
        let mut reach = [0i64; 3];
        for axis in 0..3 {
            reach[axis] = (half_extents[axis] / self.size[axis]).ceil() as i64 + 1;
        }

        let mut offsets: Vec<([i64; 3], f64)> = Vec::new();
        for dz in -reach[2]..=reach[2] {
            for dy in -reach[1]..=reach[1] {
                for dx in -reach[0]..=reach[0] {
                    let d = [dx, dy, dz];
                    let mut gap_sq = 0.0;
                    let mut inside = true;
                    for axis in 0..3 {
                        let gap = (d[axis].abs() - 1).max(0) as f64 * self.size[axis];
                        if gap > half_extents[axis] {
                            inside = false;
                            break;
                        }
                        gap_sq += gap * gap;
                    }
                    if inside {
                        offsets.push((d, gap_sq));
                    }
                }
            }
        }
        let steps = |d: &[i64; 3]| d.iter().map(|v| v.abs()).sum::<i64>();
        offsets.sort_by(|a, b| {
            a.1.total_cmp(&b.1)
                .then_with(|| steps(&a.0).cmp(&steps(&b.0)))
                .then_with(|| a.0.cmp(&b.0))
        });
        offsets.into_iter().map(|(d, _)| d).collect()
    }

    pub(crate) fn block_count(&self) -> usize {
        self.counts[0] * self.counts[1] * self.counts[2]
    }

    pub(crate) fn counts(&self) -> [usize; 3] {
        self.counts
    }

    pub(crate) fn offset_count(&self) -> usize {
        self.offsets.len()
    }

    /// Unclamped block coordinates of a location.
    #[inline]
    fn cell_of(&self, p: &Point3) -> [i64; 3] {
        let mut c = [0i64; 3];
        for (axis, v) in c.iter_mut().enumerate() {
            *v = ((p.coord(axis) - self.origin[axis]) / self.size[axis]).floor() as i64;
        }
        c
    }

    fn block_of_sample(&self, p: &Point3) -> usize {
        let c = self.cell_of(p);
        let ix = c[0].clamp(0, self.counts[0] as i64 - 1) as usize;
        let iy = c[1].clamp(0, self.counts[1] as i64 - 1) as usize;
        let iz = c[2].clamp(0, self.counts[2] as i64 - 1) as usize;
        self.linear(ix, iy, iz)
    }

    #[inline]
    fn linear(&self, ix: usize, iy: usize, iz: usize) -> usize {
        ix + iy * self.counts[0] + iz * self.counts[0] * self.counts[1]
    }

    /// Call `f` with every sample index in the blocks near `target`,
    /// nearest blocks first.
    pub(crate) fn for_each_candidate(&self, target: &Point3, mut f: impl FnMut(usize)) {
        let base = self.cell_of(target);
        for off in &self.offsets {
            let mut cell = [0usize; 3];
            let mut valid = true;
            for axis in 0..3 {
                // Saturated coordinates of far targets must not overflow
                match base[axis].checked_add(off[axis]) {
                    Some(c) if c >= 0 && c < self.counts[axis] as i64 => cell[axis] = c as usize,
                    _ => {
                        valid = false;
                        break;
                    }
                }
            }
            if !valid {
                continue;
            }
            let b = self.linear(cell[0], cell[1], cell[2]);
            for &i in &self.members[self.starts[b]..self.starts[b + 1]] {
                f(i);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_samples(n: usize, spacing: f64) -> Vec<Sample> {
        (0..n)
            .map(|i| Sample::new(i as f64 * spacing, 0.0, 0.0, i as f64))
            .collect()
    }

    #[test]
    fn test_every_sample_stored_once() {
        let samples = line_samples(500, 0.7);
        let grid = SuperBlockGrid::build(&samples, [10.0, 10.0, 10.0]);
        let mut seen: Vec<usize> = grid.members.clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..500).collect::<Vec<_>>());
        assert_eq!(*grid.starts.last().unwrap(), 500);
    }

    #[test]
    fn test_block_count_capped() {
        let samples = line_samples(10_000, 1.0);
        let grid = SuperBlockGrid::build(&samples, [1.0, 1.0, 1.0]);
        assert_eq!(grid.counts()[0], MAX_BLOCKS);
        assert_eq!(grid.counts()[1], 1);
        assert_eq!(grid.counts()[2], 1);
    }

    #[test]
    fn test_offsets_start_at_home_block() {
        let samples = line_samples(100, 1.0);
        let grid = SuperBlockGrid::build(&samples, [8.0, 8.0, 8.0]);
        assert!(grid.offset_count() > 0);
        assert_eq!(grid.offsets[0], [0, 0, 0]);
    }

    #[test]
    fn test_candidates_cover_radius() {
        let samples = line_samples(200, 0.5);
        let grid = SuperBlockGrid::build(&samples, [5.0, 5.0, 5.0]);
        let target = Point3::new(50.0, 0.0, 0.0);
        let mut found = Vec::new();
        grid.for_each_candidate(&target, |i| found.push(i));
        for (i, s) in samples.iter().enumerate() {
            if (s.x - target.x).abs() <= 5.0 {
                assert!(found.contains(&i), "sample {i} at x={} missed", s.x);
            }
        }
    }

    #[test]
    fn test_target_outside_extent() {
        let samples = line_samples(50, 1.0);
        let grid = SuperBlockGrid::build(&samples, [4.0, 4.0, 4.0]);
        let mut found = Vec::new();
        grid.for_each_candidate(&Point3::new(-3.0, 0.0, 0.0), |i| found.push(i));
        assert!(found.contains(&0));
        let mut far = Vec::new();
        grid.for_each_candidate(&Point3::new(-500.0, 0.0, 0.0), |i| far.push(i));
        assert!(far.is_empty());
    }

    #[test]
    fn test_huge_finite_target() {
        let samples = line_samples(50, 1.0);
        let grid = SuperBlockGrid::build(&samples, [4.0, 4.0, 4.0]);
        for x in [1e300, -1e300] {
            let mut found = Vec::new();
            grid.for_each_candidate(&Point3::new(x, 0.0, 0.0), |i| found.push(i));
            assert!(found.is_empty());
        }
        let mut found = Vec::new();
        grid.for_each_candidate(&Point3::new(10.0, -1e300, 1e300), |i| found.push(i));
        assert!(found.is_empty());
    }

    #[test]
    fn test_empty_samples() {
        let grid = SuperBlockGrid::build(&[], [1.0, 1.0, 1.0]);
        assert_eq!(grid.block_count(), 1);
        let mut found = 0;
        grid.for_each_candidate(&Point3::default(), |_| found += 1);
        assert_eq!(found, 0);
    }
}
