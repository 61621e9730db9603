//! Supported spatial and temporal output resolutions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{SstError, SstResult};
use crate::grid::GridDef;

/// Spatial resolutions, in degrees, for which output grids are produced.
pub const SUPPORTED_SPATIAL_RESOLUTIONS: [f64; 24] = [
    0.05, 0.1, 0.15, 0.2, 0.25, 0.3, 0.4, 0.5, 0.6, 0.75, 0.8, 1.0, 1.2, 1.25, 2.0, 2.25, 2.4,
    2.5, 3.0, 3.75, 4.0, 4.5, 5.0, 10.0,
];

/// Spatial resolution of an output grid in degrees.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SpatialResolution(f64);

impl SpatialResolution {
    /// 5° resolution of intermediate cells.
    pub const DEG_5: SpatialResolution = SpatialResolution(5.0);

    pub fn from_degrees(degrees: f64) -> SstResult<Self> {
        SUPPORTED_SPATIAL_RESOLUTIONS
            .iter()
            .find(|&&r| (r - degrees).abs() < 1e-9)
            .map(|&r| SpatialResolution(r))
            .ok_or_else(|| SstError::InvalidResolution(format!("{}°", degrees)))
    }

    pub fn degrees(&self) -> f64 {
        self.0
    }

    /// Global grid at this resolution.
    pub fn grid_def(&self) -> GridDef {
        GridDef::global_with_size(
            (360.0 / self.0).round() as usize,
            (180.0 / self.0).round() as usize,
        )
    }

    pub fn all() -> impl Iterator<Item = SpatialResolution> {
        SUPPORTED_SPATIAL_RESOLUTIONS.iter().map(|&r| SpatialResolution(r))
    }
}

impl Default for SpatialResolution {
    fn default() -> Self {
        Self::DEG_5
    }
}

impl TryFrom<f64> for SpatialResolution {
    type Error = SstError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::from_degrees(value)
    }
}

impl From<SpatialResolution> for f64 {
    fn from(value: SpatialResolution) -> Self {
        value.0
    }
}

impl fmt::Display for SpatialResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SpatialResolution {
    type Err = SstError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let degrees: f64 = s
            .trim()
            .parse()
            .map_err(|_| SstError::InvalidResolution(s.to_string()))?;
        Self::from_degrees(degrees)
    }
}

/// Length of an output time step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TemporalResolution {
    #[serde(rename = "daily")]
    Daily,
    #[serde(rename = "weekly-5d")]
    Weekly5d,
    #[serde(rename = "weekly-7d")]
    Weekly7d,
    #[default]
    #[serde(rename = "monthly")]
    Monthly,
    #[serde(rename = "seasonal")]
    Seasonal,
    #[serde(rename = "annual")]
    Annual,
}

impl TemporalResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly5d => "weekly-5d",
            Self::Weekly7d => "weekly-7d",
            Self::Monthly => "monthly",
            Self::Seasonal => "seasonal",
            Self::Annual => "annual",
        }
    }

    /// Seasonal and annual steps are built from monthly steps.
    pub fn is_multi_month(&self) -> bool {
        matches!(self, Self::Seasonal | Self::Annual)
    }
}

impl fmt::Display for TemporalResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemporalResolution {
    type Err = SstError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly-5d" | "weekly5d" => Ok(Self::Weekly5d),
            "weekly-7d" | "weekly7d" => Ok(Self::Weekly7d),
            "monthly" => Ok(Self::Monthly),
            "seasonal" => Ok(Self::Seasonal),
            "annual" => Ok(Self::Annual),
            other => Err(SstError::InvalidResolution(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_spatial_resolutions() {
        assert_eq!(SpatialResolution::all().count(), 24);
        assert!(SpatialResolution::from_degrees(0.05).is_ok());
        assert!(SpatialResolution::from_degrees(16.0).is_err());
        assert_eq!(SpatialResolution::default().degrees(), 5.0);
    }

    #[test]
    fn test_spatial_grid_def() {
        let def = SpatialResolution::from_degrees(0.05).unwrap().grid_def();
        assert_eq!((def.width, def.height), (7200, 3600));
        let def = SpatialResolution::from_degrees(3.75).unwrap().grid_def();
        assert_eq!((def.width, def.height), (96, 48));
    }

    #[test]
    fn test_temporal_from_str() {
        assert_eq!("weekly-5d".parse::<TemporalResolution>().unwrap(), TemporalResolution::Weekly5d);
        assert_eq!("MONTHLY".parse::<TemporalResolution>().unwrap(), TemporalResolution::Monthly);
        assert!("hourly".parse::<TemporalResolution>().is_err());
    }
}
