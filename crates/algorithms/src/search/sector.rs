//! Sector classification by sign pattern
//!
//! The offset from target to sample is expressed in the search ellipsoid
//! frame `(u, v, w)` = (major, minor, vertical). Its three sign bits index a
//! table, so classification is branch-free:
//! ```text
//! bit 0: u < 0    bit 1: v < 0    bit 2: w < 0
//!
//! quadrants   u≥0,v≥0 → 0   u<0,v≥0 → 1   u<0,v<0 → 2   u≥0,v<0 → 3
//! octants     quadrant + 4 when w < 0
//! ```

use super::params::SectorMode;

const QUADRANTS: [u8; 8] = [0, 1, 3, 2, 0, 1, 3, 2];
const OCTANTS: [u8; 8] = [0, 1, 3, 2, 4, 5, 7, 6];

#[inline]
fn sign_bits(u: [f64; 3]) -> usize {
    (u[0] < 0.0) as usize | ((u[1] < 0.0) as usize) << 1 | ((u[2] < 0.0) as usize) << 2
}

/// Sector of an offset given in the ellipsoid frame.
#[inline]
pub(crate) fn classify(mode: SectorMode, u: [f64; 3]) -> u8 {
    match mode {
        SectorMode::None => 0,
        SectorMode::Quadrants => QUADRANTS[sign_bits(u)],
        SectorMode::Octants => OCTANTS[sign_bits(u)],
    }
}
