//! Search neighborhood parameters

use krigeo_core::{Anisotropy, Error, Result};
use serde::{Deserialize, Serialize};

/// Angular subdivision of the search ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectorMode {
    /// A single sector
    #[default]
    None,
    /// Four sectors split by the major and minor axes
    Quadrants,
    /// Eight sectors, quadrants split again by the vertical axis
    Octants,
}

impl SectorMode {
    /// Number of sectors
    pub fn count(&self) -> usize {
        match self {
            SectorMode::None => 1,
            SectorMode::Quadrants => 4,
            SectorMode::Octants => 8,
        }
    }
}

/// Parameters for the neighborhood search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchParameters {
    /// Search ellipsoid (radii and rotation)
    pub ellipsoid: Anisotropy,
    /// Targets with fewer accepted samples are not estimated (default 1)
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    /// Maximum number of samples retained (default 16)
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
    /// Maximum samples from a single source group (drillhole)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_per_group: Option<usize>,
    #[serde(default)]
    pub sectors: SectorMode,
    /// Maximum samples per sector; ignored when `sectors` is `None`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_per_sector: Option<usize>,
}

fn default_min_samples() -> usize {
    1
}

fn default_max_samples() -> usize {
    16
}

impl Default for SearchParameters {
    fn default() -> Self {
        Self {
            ellipsoid: Anisotropy::isotropic(100.0),
            min_samples: default_min_samples(),
            max_samples: default_max_samples(),
            max_per_group: None,
            sectors: SectorMode::None,
            max_per_sector: None,
        }
    }
}

impl SearchParameters {
    /// Isotropic search of the given radius, other settings default.
    pub fn isotropic(radius: f64) -> Self {
        Self {
            ellipsoid: Anisotropy::isotropic(radius),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.ellipsoid.validate("search.ellipsoid")?;
        if self.max_samples == 0 {
            return Err(Error::invalid_parameter(
                "search.max_samples",
                self.max_samples,
                "must be at least 1",
            ));
        }
        if self.min_samples == 0 || self.min_samples > self.max_samples {
            return Err(Error::invalid_parameter(
                "search.min_samples",
                self.min_samples,
                format!("must be between 1 and max_samples ({})", self.max_samples),
            ));
        }
        if self.max_per_group == Some(0) {
            return Err(Error::invalid_parameter(
                "search.max_per_group",
                0,
                "must be at least 1 when set",
            ));
        }
        if self.max_per_sector == Some(0) {
            return Err(Error::invalid_parameter(
                "search.max_per_sector",
                0,
                "must be at least 1 when set",
            ));
        }
        Ok(())
    }

    /// Per-sector cap actually in force.
    pub(crate) fn sector_cap(&self) -> usize {
        match self.sectors {
            SectorMode::None => usize::MAX,
            _ => self.max_per_sector.unwrap_or(usize::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SearchParameters::default().validate().is_ok());
    }

    #[test]
    fn test_min_above_max_rejected() {
        let params = SearchParameters {
            min_samples: 20,
            max_samples: 10,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(Error::InvalidParameter { name: "search.min_samples", .. })
        ));
    }

    #[test]
    fn test_zero_caps_rejected() {
        let params = SearchParameters {
            max_per_group: Some(0),
            ..Default::default()
        };
        assert!(params.validate().is_err());
        let params = SearchParameters {
            sectors: SectorMode::Octants,
            max_per_sector: Some(0),
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_bad_radius_rejected() {
        assert!(SearchParameters::isotropic(-1.0).validate().is_err());
    }

    #[test]
    fn test_sector_cap_ignored_without_sectors() {
        let params = SearchParameters {
            max_per_sector: Some(2),
            ..Default::default()
        };
        assert_eq!(params.sector_cap(), usize::MAX);
        let params = SearchParameters {
            sectors: SectorMode::Quadrants,
            ..params
        };
        assert_eq!(params.sector_cap(), 2);
    }

    #[test]
    fn test_deserialize_defaults() {
        let json = r#"{"ellipsoid":{"major":50,"minor":25,"vertical":5,"azimuth":45}}"#;
        let params: SearchParameters = serde_json::from_str(json).unwrap();
        assert_eq!(params.min_samples, 1);
        assert_eq!(params.max_samples, 16);
        assert_eq!(params.sectors, SectorMode::None);
        assert_eq!(params.ellipsoid.azimuth, 45.0);
    }
}
