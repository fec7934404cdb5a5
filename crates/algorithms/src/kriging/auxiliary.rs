//! Reference estimates on the kriging neighborhood
//!
//! Nearest-neighbor and inverse distance weighting on the same samples the
//! kriging system uses, with normalized ellipsoid distances:
//! ```text
//! z_idw = Σ(wᵢ · zᵢ) / Σ(wᵢ)     wᵢ = 1 / hᵢ^p
//! ```
//!
//! Reference:
//! Shepard, D. (1968). A two-dimensional interpolation function for
//! irregularly-spaced data. ACM National Conference.

use krigeo_core::{Error, Result, Sample};
use serde::{Deserialize, Serialize};

use crate::search::Neighbor;

/// Normalized distance below which IDW snaps to the sample value
const SNAP_DISTANCE: f64 = 1e-10;

/// Which reference estimates to compute
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuxiliaryOptions {
    pub nearest: bool,
    pub idw: bool,
    /// IDW power parameter (default: 2.0)
    pub idw_power: f64,
}

impl Default for AuxiliaryOptions {
    fn default() -> Self {
        Self {
            nearest: false,
            idw: false,
            idw_power: 2.0,
        }
    }
}

impl AuxiliaryOptions {
    pub fn enabled(&self) -> bool {
        self.nearest || self.idw
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.idw_power.is_finite() && self.idw_power > 0.0) {
            return Err(Error::invalid_parameter(
                "auxiliary.idw_power",
                self.idw_power,
                "must be positive",
            ));
        }
        Ok(())
    }
}

/// Reference estimates for one target.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AuxiliaryEstimates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearest: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idw: Option<f64>,
}

/// Compute the enabled reference estimates. `neighbors` must be sorted by
/// distance, as returned by the search.
pub(crate) fn compute(
    options: &AuxiliaryOptions,
    samples: &[Sample],
    neighbors: &[Neighbor],
) -> Option<AuxiliaryEstimates> {
    if !options.enabled() || neighbors.is_empty() {
        return None;
    }
    Some(AuxiliaryEstimates {
        nearest: options
            .nearest
            .then(|| samples[neighbors[0].index].value),
        idw: options
            .idw
            .then(|| inverse_distance(samples, neighbors, options.idw_power)),
    })
}

fn inverse_distance(samples: &[Sample], neighbors: &[Neighbor], power: f64) -> f64 {
    let mut sum_w = 0.0;
    let mut sum_wz = 0.0;
    for n in neighbors {
        let value = samples[n.index].value;
        if n.distance < SNAP_DISTANCE {
            return value;
        }
        let w = 1.0 / n.distance.powf(power);
        sum_w += w;
        sum_wz += w * value;
    }
    sum_wz / sum_w
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neighbor(index: usize, distance: f64) -> Neighbor {
        Neighbor {
            index,
            distance,
            sector: 0,
        }
    }

    #[test]
    fn test_disabled_by_default() {
        let samples = vec![Sample::new(0.0, 0.0, 0.0, 1.0)];
        let out = compute(&AuxiliaryOptions::default(), &samples, &[neighbor(0, 0.5)]);
        assert!(out.is_none());
    }

    #[test]
    fn test_nearest_and_idw() {
        let samples = vec![
            Sample::new(0.0, 0.0, 0.0, 10.0),
            Sample::new(0.0, 0.0, 0.0, 20.0),
        ];
        let options = AuxiliaryOptions {
            nearest: true,
            idw: true,
            idw_power: 2.0,
        };
        let out = compute(&options, &samples, &[neighbor(1, 0.2), neighbor(0, 0.4)]).unwrap();
        assert_eq!(out.nearest, Some(20.0));
        // Weights 25 and 6.25
        let expected = (25.0 * 20.0 + 6.25 * 10.0) / 31.25;
        assert!((out.idw.unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_idw_snaps_to_coincident_sample() {
        let samples = vec![
            Sample::new(0.0, 0.0, 0.0, 3.0),
            Sample::new(0.0, 0.0, 0.0, 9.0),
        ];
        let options = AuxiliaryOptions {
            idw: true,
            ..Default::default()
        };
        let out = compute(&options, &samples, &[neighbor(0, 0.0), neighbor(1, 0.3)]).unwrap();
        assert_eq!(out.idw, Some(3.0));
        assert_eq!(out.nearest, None);
    }

    #[test]
    fn test_validate_power() {
        let bad = AuxiliaryOptions {
            idw_power: 0.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        assert!(AuxiliaryOptions::default().validate().is_ok());
    }
}
