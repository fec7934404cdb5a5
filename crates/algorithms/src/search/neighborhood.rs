//! Query inputs and outputs of the neighborhood search

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A sample accepted into a target's neighborhood.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Index into the sample table
    pub index: usize,
    /// Normalized ellipsoid distance to the target, in [0, 1]
    pub distance: f64,
    pub sector: u8,
}

/// Samples hidden from a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Exclusion {
    #[default]
    None,
    /// One sample, by index
    Sample(usize),
    /// Every sample of a source group
    Group(u64),
}

/// Reusable buffers for neighborhood queries.
///
/// One per worker; never shared between threads.
#[derive(Debug, Default)]
pub struct SearchScratch {
    pub(crate) candidates: Vec<(f64, usize, u8)>,
    pub(crate) sector_counts: [usize; 8],
    pub(crate) group_counts: HashMap<u64, usize>,
}

impl SearchScratch {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reset(&mut self) {
        self.candidates.clear();
        self.sector_counts = [0; 8];
        self.group_counts.clear();
    }
}

/// Number of distinct sectors among `neighbors`.
pub fn informed_sectors(neighbors: &[Neighbor]) -> usize {
    let mut seen = 0u8;
    for n in neighbors {
        seen |= 1 << n.sector;
    }
    seen.count_ones() as usize
}
