//! # Krigeo Algorithms
//!
//! Geostatistical estimation for krigeo.
//!
//! ## Modules
//!
//! - **variogram**: nested covariance models (nugget, spherical, exponential,
//!   gaussian, power, hole effect) with 3D anisotropy
//! - **search**: super-block neighborhood search with octant and group limits
//! - **kriging**: simple, ordinary, universal, external drift and local mean
//!   kriging at points and blocks, plus cross validation

pub mod kriging;
pub mod search;
pub mod variogram;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::kriging::{
        estimate, CrossValidationMode, DriftTerms, EstimationResult, EstimationRun,
        EstimationStatus, Estimator, KrigingOptions, KrigingType,
    };
    pub use crate::search::{SearchParameters, SectorMode};
    pub use crate::variogram::{Structure, StructureKind, VariogramModel};
    pub use krigeo_core::prelude::*;
}
