//! Point-to-block and block-to-block covariances
//!
//! A block is represented by its discretization points. Averages use the
//! structural covariance only (no nugget) when the block has more than one
//! point; a single-point block is a point, nugget included.
//!
//! Reference:
//! Deutsch, C.V. & Journel, A.G. (1998). GSLIB, 2nd ed., §IV.1 (`kt3d`).
//! Journel, A.G. & Huijbregts, C.J. (1978). Mining Geostatistics, §V.A.

use krigeo_core::Point3;

use crate::variogram::VariogramModel;

/// Average covariance between `p` and the discretization points of a block.
pub fn mean_covariance(model: &VariogramModel, p: &Point3, points: &[Point3]) -> f64 {
    match points {
        [] => 0.0,
        [q] => model.covariance(p, q),
        _ => {
            points
                .iter()
                .map(|q| model.structural_covariance_offset(p.offset_to(q)))
                .sum::<f64>()
                / points.len() as f64
        }
    }
}

/// Average covariance of a block with itself.
pub fn block_covariance(model: &VariogramModel, points: &[Point3]) -> f64 {
    if points.len() <= 1 {
        return model.sill();
    }
    let n = points.len();
    let mut sum = 0.0;
    for i in 0..n {
        // Diagonal once, off-diagonal pairs twice
        sum += model.structural_covariance_offset([0.0; 3]);
        for j in (i + 1)..n {
            sum += 2.0 * model.structural_covariance_offset(points[i].offset_to(&points[j]));
        }
    }
    sum / (n * n) as f64
}
