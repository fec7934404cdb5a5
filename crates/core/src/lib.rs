//! # Krigeo Core
//!
//! Core types for the krigeo geostatistical estimation engine.
//!
//! This crate provides:
//! - `Sample`: measured values with location and source group
//! - `Target`: point or discretized block to estimate
//! - `GridDefinition`: regular block-model grids
//! - `Anisotropy`: rotated ellipsoids shared by variograms and searches
//! - `Tolerances`: run-wide numerical settings
//! - `Error`: configuration-level errors

pub mod error;
pub mod geometry;
pub mod grid;
pub mod sample;
pub mod target;
pub mod tolerance;

pub use error::{Error, Result};
pub use geometry::{Anisotropy, Extent3, Point3, RotationMatrix};
pub use grid::GridDefinition;
pub use sample::{declustered_mean, validate_samples, Sample};
pub use target::{Discretization, Support, Target};
pub use tolerance::{Tolerances, EPSILON};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::geometry::{Anisotropy, Point3};
    pub use crate::grid::GridDefinition;
    pub use crate::sample::Sample;
    pub use crate::target::{Discretization, Support, Target};
    pub use crate::tolerance::Tolerances;
}
