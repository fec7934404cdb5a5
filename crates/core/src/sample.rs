//! Sample data

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::Point3;

/// A measured sample: location, value and optional attributes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub value: f64,
    /// Source group, e.g. the drillhole the sample comes from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<u64>,
    /// Declustering weight
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// Secondary value: external drift variable or local mean
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<f64>,
}

impl Sample {
    pub fn new(x: f64, y: f64, z: f64, value: f64) -> Self {
        Self {
            x,
            y,
            z,
            value,
            group: None,
            weight: None,
            secondary: None,
        }
    }

    pub fn with_group(mut self, group: u64) -> Self {
        self.group = Some(group);
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_secondary(mut self, secondary: f64) -> Self {
        self.secondary = Some(secondary);
        self
    }

    #[inline]
    pub fn position(&self) -> Point3 {
        Point3::new(self.x, self.y, self.z)
    }
}

/// Check a sample table before it is indexed.
///
/// Coordinates and values must be finite and weights non-negative.
pub fn validate_samples(samples: &[Sample]) -> Result<()> {
    for (i, s) in samples.iter().enumerate() {
        if !s.position().is_finite() || !s.value.is_finite() {
            return Err(Error::invalid_parameter(
                "samples",
                i,
                "coordinates and value must be finite",
            ));
        }
        if let Some(w) = s.weight
            && !(w.is_finite() && w >= 0.0)
        {
            return Err(Error::invalid_parameter(
                "samples",
                i,
                format!("weight {w} must be finite and non-negative"),
            ));
        }
        if let Some(m) = s.secondary
            && !m.is_finite()
        {
            return Err(Error::invalid_parameter(
                "samples",
                i,
                "secondary value must be finite",
            ));
        }
    }
    Ok(())
}

/// Weighted mean of the sample values.
///
/// Samples without a weight count with weight 1. Returns `None` when the
/// total weight is zero.
pub fn declustered_mean(samples: &[Sample]) -> Option<f64> {
    let (sum_w, sum_wz) = samples.iter().fold((0.0, 0.0), |(sw, swz), s| {
        let w = s.weight.unwrap_or(1.0);
        (sw + w, swz + w * s.value)
    });
    (sum_w > 0.0).then(|| sum_wz / sum_w)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_methods() {
        let s = Sample::new(1.0, 2.0, 3.0, 4.0)
            .with_group(7)
            .with_weight(0.5)
            .with_secondary(1.5);
        assert_eq!(s.group, Some(7));
        assert_eq!(s.weight, Some(0.5));
        assert_eq!(s.secondary, Some(1.5));
        assert_eq!(s.position(), Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_validate_rejects_nan() {
        let samples = vec![
            Sample::new(0.0, 0.0, 0.0, 1.0),
            Sample::new(f64::NAN, 0.0, 0.0, 1.0),
        ];
        assert!(validate_samples(&samples).is_err());
    }

    #[test]
    fn test_validate_rejects_negative_weight() {
        let samples = vec![Sample::new(0.0, 0.0, 0.0, 1.0).with_weight(-1.0)];
        assert!(validate_samples(&samples).is_err());
    }

    #[test]
    fn test_declustered_mean() {
        let samples = vec![
            Sample::new(0.0, 0.0, 0.0, 10.0).with_weight(3.0),
            Sample::new(1.0, 0.0, 0.0, 20.0).with_weight(1.0),
        ];
        let m = declustered_mean(&samples).unwrap();
        assert!((m - 12.5).abs() < 1e-12, "got {m}");
        assert!(declustered_mean(&[]).is_none());
    }

    #[test]
    fn test_deserialize_minimal() {
        let s: Sample = serde_json::from_str(r#"{"x":1,"y":2,"z":3,"value":4}"#).unwrap();
        assert_eq!(s, Sample::new(1.0, 2.0, 3.0, 4.0));
    }
}
