//! Configuration for regional averaging and regridding.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sst_common::{GridDef, RegionMaskList, TemporalResolution};

use crate::error::{AggregationError, Result};
use crate::product::SstDepth;

/// Region list used when none is configured.
pub const DEFAULT_REGIONS: &str = "Global=-180,90,180,-90";

/// Configuration for an aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Minimum fraction of valid pixels for a first-level cell to count.
    pub min_coverage: f64,

    /// Minimum fraction of valid 5° cells for a 90° cell to count.
    pub min_coverage_90: f64,

    /// Length of the output time steps.
    pub temporal_resolution: TemporalResolution,

    /// Cell size of regridded output in degrees.
    pub target_resolution: f64,

    /// Cell size of the region-mask grid in degrees.
    pub region_resolution: f64,

    /// SST depth read from the source products.
    pub sst_depth: SstDepth,

    /// Spread cell accumulation and regions over the rayon pool.
    pub parallel: bool,

    /// Region list, `name=W,N,E,S` or `name=<mask file>` joined by `;`.
    pub regions: String,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            min_coverage: 0.0,
            min_coverage_90: 0.0,
            temporal_resolution: TemporalResolution::Monthly,
            target_resolution: 5.0,
            region_resolution: 5.0,
            sst_depth: SstDepth::Skin,
            parallel: true,
            regions: DEFAULT_REGIONS.to_string(),
        }
    }
}

impl AggregationConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("SST_MIN_COVERAGE") {
            if let Ok(value) = val.parse() {
                config.min_coverage = value;
            }
        }

        if let Ok(val) = std::env::var("SST_MIN_COVERAGE_90") {
            if let Ok(value) = val.parse() {
                config.min_coverage_90 = value;
            }
        }

        if let Ok(val) = std::env::var("SST_TEMPORAL_RESOLUTION") {
            if let Ok(value) = val.parse() {
                config.temporal_resolution = value;
            }
        }

        if let Ok(val) = std::env::var("SST_TARGET_RESOLUTION") {
            if let Ok(value) = val.parse() {
                config.target_resolution = value;
            }
        }

        if let Ok(val) = std::env::var("SST_REGION_RESOLUTION") {
            if let Ok(value) = val.parse() {
                config.region_resolution = value;
            }
        }

        if let Ok(val) = std::env::var("SST_DEPTH") {
            if let Ok(value) = val.parse() {
                config.sst_depth = value;
            }
        }

        if let Ok(val) = std::env::var("SST_PARALLEL") {
            config.parallel = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("SST_REGIONS") {
            if !val.trim().is_empty() {
                config.regions = val;
            }
        }

        config
    }

    /// Parse a YAML document. Missing keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (name, value) in [
            ("min_coverage", self.min_coverage),
            ("min_coverage_90", self.min_coverage_90),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be in [0, 1], got {}", name, value));
            }
        }

        for (name, value) in [
            ("target_resolution", self.target_resolution),
            ("region_resolution", self.region_resolution),
        ] {
            GridDef::global(value).map_err(|e| format!("{}: {}", name, e))?;
        }

        if self.regions.trim().is_empty() {
            return Err("regions must not be empty".to_string());
        }

        Ok(())
    }

    /// Grid of the region masks.
    pub fn region_grid_def(&self) -> Result<GridDef> {
        Ok(GridDef::global(self.region_resolution)?)
    }

    /// Grid of regridded output.
    pub fn target_grid_def(&self) -> Result<GridDef> {
        Ok(GridDef::global(self.target_resolution)?)
    }

    /// Parse the configured region list on the region grid.
    pub fn region_masks(&self) -> Result<RegionMaskList> {
        Ok(RegionMaskList::parse(&self.regions, self.region_grid_def()?)?)
    }

    /// Validate, turning failures into configuration errors.
    pub fn checked(self) -> Result<Self> {
        self.validate().map_err(AggregationError::Config)?;
        Ok(self)
    }
}
