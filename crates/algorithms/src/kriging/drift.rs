//! Drift terms appended to the kriging system
//!
//! Every kriging type is one covariance block plus a (possibly empty) set
//! of drift functions `f_l`. Each function adds a row and column:
//! ```text
//! [ C   F ] [w]   [c₀]        F[i][l] = f_l(xᵢ)
//! [ Fᵀ  0 ] [μ] = [f₀]        f₀[l]   = f_l(x₀)
//! ```
//! Monomials are evaluated in coordinates relative to the target center,
//! divided by the largest search radius, which keeps the drift entries on
//! the same order of magnitude as the covariances.

use krigeo_core::{Point3, Sample};
use serde::{Deserialize, Serialize};

/// Constant term plus the nine monomials
pub(crate) const MAX_DRIFT: usize = 10;

/// Polynomial drift terms for universal kriging.
///
/// The constant term is always present and not listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftTerms {
    pub x: bool,
    pub y: bool,
    pub z: bool,
    pub xx: bool,
    pub yy: bool,
    pub zz: bool,
    pub xy: bool,
    pub xz: bool,
    pub yz: bool,
}

impl DriftTerms {
    /// Linear drift in x, y and z
    pub fn linear() -> Self {
        Self {
            x: true,
            y: true,
            z: true,
            ..Default::default()
        }
    }

    /// Linear drift in x and y only
    pub fn linear_horizontal() -> Self {
        Self {
            x: true,
            y: true,
            ..Default::default()
        }
    }

    /// Full quadratic drift
    pub fn quadratic() -> Self {
        Self {
            x: true,
            y: true,
            z: true,
            xx: true,
            yy: true,
            zz: true,
            xy: true,
            xz: true,
            yz: true,
        }
    }

    /// Number of selected monomials
    pub fn count(&self) -> usize {
        self.monomials().len()
    }

    pub(crate) fn monomials(&self) -> Vec<Monomial> {
        [
            (self.x, Monomial::X),
            (self.y, Monomial::Y),
            (self.z, Monomial::Z),
            (self.xx, Monomial::Xx),
            (self.yy, Monomial::Yy),
            (self.zz, Monomial::Zz),
            (self.xy, Monomial::Xy),
            (self.xz, Monomial::Xz),
            (self.yz, Monomial::Yz),
        ]
        .into_iter()
        .filter_map(|(on, m)| on.then_some(m))
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Monomial {
    X,
    Y,
    Z,
    Xx,
    Yy,
    Zz,
    Xy,
    Xz,
    Yz,
}

impl Monomial {
    #[inline]
    fn eval(self, u: [f64; 3]) -> f64 {
        let [x, y, z] = u;
        match self {
            Monomial::X => x,
            Monomial::Y => y,
            Monomial::Z => z,
            Monomial::Xx => x * x,
            Monomial::Yy => y * y,
            Monomial::Zz => z * z,
            Monomial::Xy => x * y,
            Monomial::Xz => x * z,
            Monomial::Yz => y * z,
        }
    }
}

/// Drift functions of one kriging type.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DriftSet {
    /// Simple kriging: no constraint
    None,
    /// Constant term plus optional monomials (ordinary / universal)
    Polynomial { monomials: Vec<Monomial>, scale: f64 },
    /// Constant term plus the secondary variable
    External,
}

impl DriftSet {
    pub(crate) fn len(&self) -> usize {
        match self {
            DriftSet::None => 0,
            DriftSet::Polynomial { monomials, .. } => 1 + monomials.len(),
            DriftSet::External => 2,
        }
    }

    /// Drift function values at a sample.
    pub(crate) fn fill_sample(&self, sample: &Sample, origin: &Point3, out: &mut [f64]) {
        match self {
            DriftSet::None => {}
            DriftSet::Polynomial { monomials, scale } => {
                out[0] = 1.0;
                let u = scaled(origin.offset_to(&sample.position()), *scale);
                for (v, m) in out[1..].iter_mut().zip(monomials) {
                    *v = m.eval(u);
                }
            }
            DriftSet::External => {
                out[0] = 1.0;
                out[1] = sample.secondary.unwrap_or(0.0);
            }
        }
    }

    /// Drift function values at the target, averaged over its
    /// discretization points.
    pub(crate) fn fill_target(
        &self,
        origin: &Point3,
        points: &[Point3],
        secondary: Option<f64>,
        out: &mut [f64],
    ) {
        match self {
            DriftSet::None => {}
            DriftSet::Polynomial { monomials, scale } => {
                out[0] = 1.0;
                let n = points.len().max(1) as f64;
                for (v, m) in out[1..].iter_mut().zip(monomials) {
                    *v = points
                        .iter()
                        .map(|p| m.eval(scaled(origin.offset_to(p), *scale)))
                        .sum::<f64>()
                        / n;
                }
            }
            DriftSet::External => {
                out[0] = 1.0;
                out[1] = secondary.unwrap_or(0.0);
            }
        }
    }
}

#[inline]
fn scaled(d: [f64; 3], scale: f64) -> [f64; 3] {
    [d[0] * scale, d[1] * scale, d[2] * scale]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_counts() {
        assert_eq!(DriftTerms::default().count(), 0);
        assert_eq!(DriftTerms::linear().count(), 3);
        assert_eq!(DriftTerms::linear_horizontal().count(), 2);
        assert_eq!(DriftTerms::quadratic().count(), 9);
    }

    #[test]
    fn test_polynomial_rows() {
        let set = DriftSet::Polynomial {
            monomials: DriftTerms {
                x: true,
                xy: true,
                ..Default::default()
            }
            .monomials(),
            scale: 0.1,
        };
        assert_eq!(set.len(), 3);
        let origin = Point3::new(10.0, 10.0, 0.0);
        let mut row = [0.0; 3];
        set.fill_sample(&Sample::new(30.0, 40.0, 0.0, 1.0), &origin, &mut row);
        assert_eq!(row[0], 1.0);
        assert!((row[1] - 2.0).abs() < 1e-12);
        assert!((row[2] - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_target_average() {
        let set = DriftSet::Polynomial {
            monomials: DriftTerms {
                x: true,
                xx: true,
                ..Default::default()
            }
            .monomials(),
            scale: 1.0,
        };
        let origin = Point3::default();
        let points = [Point3::new(-1.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let mut f0 = [0.0; 3];
        set.fill_target(&origin, &points, None, &mut f0);
        assert_eq!(f0, [1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_external_rows() {
        let set = DriftSet::External;
        let mut row = [0.0; 2];
        set.fill_sample(&Sample::new(0.0, 0.0, 0.0, 1.0).with_secondary(4.5), &Point3::default(), &mut row);
        assert_eq!(row, [1.0, 4.5]);
        set.fill_target(&Point3::default(), &[Point3::default()], Some(3.0), &mut row);
        assert_eq!(row, [1.0, 3.0]);
    }

    #[test]
    fn test_deserialize_terms() {
        let terms: DriftTerms = serde_json::from_str(r#"{"x":true,"zz":true}"#).unwrap();
        assert_eq!(terms.count(), 2);
        assert!(terms.x && terms.zz && !terms.y);
    }
}
