//! Geometric primitives: points, extents and anisotropy ellipsoids

mod anisotropy;
mod point;

pub use anisotropy::{Anisotropy, RotationMatrix};
pub use point::{Extent3, Point3};
