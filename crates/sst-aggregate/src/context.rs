//! Inputs shared by the cells of one aggregation run.

use std::sync::Arc;

use sst_common::{grids, ArrayGrid, Grid, GridDef};

use crate::coverage::CoverageUncertaintyProvider;
use crate::error::{AggregationError, Result};
use crate::resample::downscale;
use crate::synoptic::SynopticUncertaintyProvider;

/// Quality level a pixel must have when a quality grid is present.
pub const BEST_QUALITY_LEVEL: i32 = 5;

/// Source grids of one product file, all on the same source grid.
///
/// Only the SST grid is mandatory. Missing optional grids leave the
/// corresponding result slots NaN; a missing sea coverage grid counts
/// every pixel as open water.
#[derive(Clone)]
pub struct AggregationContext {
    pub sst: Arc<dyn Grid>,
    pub climatology_sst: Option<Arc<dyn Grid>>,
    pub quality: Option<Arc<dyn Grid>>,
    pub random_uncertainty: Option<Arc<dyn Grid>>,
    pub large_scale_uncertainty: Option<Arc<dyn Grid>>,
    pub adjustment_uncertainty: Option<Arc<dyn Grid>>,
    pub synoptic_uncertainty: Option<Arc<dyn Grid>>,
    pub sea_ice_fraction: Option<Arc<dyn Grid>>,
    pub sea_coverage: Option<Arc<dyn Grid>>,
}

impl std::fmt::Debug for AggregationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregationContext")
            .field("grid_def", self.grid_def())
            .field("climatology_sst", &self.climatology_sst.is_some())
            .field("quality", &self.quality.is_some())
            .field("random_uncertainty", &self.random_uncertainty.is_some())
            .field("large_scale_uncertainty", &self.large_scale_uncertainty.is_some())
            .field("adjustment_uncertainty", &self.adjustment_uncertainty.is_some())
            .field("synoptic_uncertainty", &self.synoptic_uncertainty.is_some())
            .field("sea_ice_fraction", &self.sea_ice_fraction.is_some())
            .field("sea_coverage", &self.sea_coverage.is_some())
            .finish()
    }
}

impl AggregationContext {
    pub fn new(sst: Arc<dyn Grid>) -> Self {
        Self {
            sst,
            climatology_sst: None,
            quality: None,
            random_uncertainty: None,
            large_scale_uncertainty: None,
            adjustment_uncertainty: None,
            synoptic_uncertainty: None,
            sea_ice_fraction: None,
            sea_coverage: None,
        }
    }

    pub fn with_climatology_sst(mut self, grid: Arc<dyn Grid>) -> Self {
        self.climatology_sst = Some(grid);
        self
    }

    pub fn with_quality(mut self, grid: Arc<dyn Grid>) -> Self {
        self.quality = Some(grid);
        self
    }

    pub fn with_random_uncertainty(mut self, grid: Arc<dyn Grid>) -> Self {
        self.random_uncertainty = Some(grid);
        self
    }

    pub fn with_large_scale_uncertainty(mut self, grid: Arc<dyn Grid>) -> Self {
        self.large_scale_uncertainty = Some(grid);
        self
    }

    pub fn with_adjustment_uncertainty(mut self, grid: Arc<dyn Grid>) -> Self {
        self.adjustment_uncertainty = Some(grid);
        self
    }

    pub fn with_synoptic_uncertainty(mut self, grid: Arc<dyn Grid>) -> Self {
        self.synoptic_uncertainty = Some(grid);
        self
    }

    pub fn with_sea_ice_fraction(mut self, grid: Arc<dyn Grid>) -> Self {
        self.sea_ice_fraction = Some(grid);
        self
    }

    pub fn with_sea_coverage(mut self, grid: Arc<dyn Grid>) -> Self {
        self.sea_coverage = Some(grid);
        self
    }

    /// Grid definition of the source pixels.
    pub fn grid_def(&self) -> &GridDef {
        self.sst.grid_def()
    }

    /// Check that every optional grid matches the SST grid.
    pub fn validate(&self) -> Result<()> {
        let def = *self.grid_def();
        let optional = [
            ("climatology_sst", &self.climatology_sst),
            ("quality", &self.quality),
            ("random_uncertainty", &self.random_uncertainty),
            ("large_scale_uncertainty", &self.large_scale_uncertainty),
            ("adjustment_uncertainty", &self.adjustment_uncertainty),
            ("synoptic_uncertainty", &self.synoptic_uncertainty),
            ("sea_ice_fraction", &self.sea_ice_fraction),
            ("sea_coverage", &self.sea_coverage),
        ];
        for (name, grid) in optional {
            if let Some(grid) = grid {
                if !grid.grid_def().same_size(&def) {
                    return Err(AggregationError::invalid_argument(format!(
                        "{} grid is {}x{}, expected {}x{}",
                        name,
                        grid.grid_def().width,
                        grid.grid_def().height,
                        def.width,
                        def.height
                    )));
                }
            }
        }
        Ok(())
    }

    /// Sea coverage of pixel (x, y), 1.0 without a sea coverage grid.
    #[inline]
    pub fn sea_coverage_at(&self, x: usize, y: usize) -> f64 {
        self.sea_coverage
            .as_ref()
            .map_or(1.0, |grid| grid.sample_double(x, y))
    }

    /// A pixel contributes if it is (partly) water, has a positive SST
    /// and, if the product grades quality, the best quality level.
    #[inline]
    pub fn is_valid_pixel(&self, x: usize, y: usize, sea_coverage: f64, sst: f64) -> bool {
        sea_coverage > 0.0
            && sst > 0.0
            && self
                .quality
                .as_ref()
                .map_or(true, |grid| grid.sample_int(x, y) == BEST_QUALITY_LEVEL)
    }
}

/// Uncertainty providers and thresholds shared by all cells of a run.
#[derive(Debug, Clone)]
pub struct CellContext {
    /// Resolution of the first-level cells, in degrees.
    pub resolution: f64,
    pub coverage: CoverageUncertaintyProvider,
    /// Without a provider synoptic and adjustment uncertainties are NaN.
    pub synoptic: Option<SynopticUncertaintyProvider>,
    /// Minimum fraction of valid pixels in a first-level cell.
    pub min_coverage: f64,
    /// Minimum fraction of valid children in a 90° cell.
    pub min_coverage_90: f64,
}

impl CellContext {
    pub fn new(resolution: f64, coverage: CoverageUncertaintyProvider) -> Self {
        Self {
            resolution,
            coverage,
            synoptic: None,
            min_coverage: 0.0,
            min_coverage_90: 0.0,
        }
    }

    pub fn with_synoptic(mut self, synoptic: SynopticUncertaintyProvider) -> Self {
        self.synoptic = Some(synoptic);
        self
    }

    pub fn with_min_coverage(mut self, min_coverage: f64, min_coverage_90: f64) -> Self {
        self.min_coverage = min_coverage;
        self.min_coverage_90 = min_coverage_90;
        self
    }
}

/// Sea coverage fractions on the 5° and 90° cell grids, used as weights
/// when cells are rolled up.
#[derive(Debug, Clone)]
pub struct SeaCoverageGrids {
    pub cell_5: ArrayGrid,
    pub cell_90: ArrayGrid,
}

impl SeaCoverageGrids {
    pub fn new(cell_5: ArrayGrid, cell_90: ArrayGrid) -> Result<Self> {
        if !cell_5.grid_def().same_size(&grids::cell_5())
            || !cell_90.grid_def().same_size(&grids::cell_90())
        {
            return Err(AggregationError::invalid_argument(
                "sea coverage grids must be 72x36 and 4x2",
            ));
        }
        Ok(Self { cell_5, cell_90 })
    }

    /// Block means of a full-resolution sea coverage (or land/sea mask) grid.
    pub fn from_source(sea_coverage: &dyn Grid) -> Result<Self> {
        let cell_5 = downscale(sea_coverage, grids::cell_5())?;
        let cell_90 = downscale(&cell_5, grids::cell_90())?;
        Ok(Self { cell_5, cell_90 })
    }

    /// All water.
    pub fn open_ocean() -> Self {
        Self {
            cell_5: ArrayGrid::filled(grids::cell_5(), 1.0),
            cell_90: ArrayGrid::filled(grids::cell_90(), 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sst_common::ScalarGrid;

    #[test]
    fn test_validate_rejects_mismatched_grid() {
        let sst: Arc<dyn Grid> = Arc::new(ScalarGrid::new(grids::cell_5(), 290.0));
        let other: Arc<dyn Grid> = Arc::new(ScalarGrid::new(grids::cell_90(), 0.5));
        let ctx = AggregationContext::new(sst).with_sea_ice_fraction(other);
        assert!(ctx.validate().is_err());
    }

    #[test]
    fn test_quality_gate() {
        let def = GridDef::global_with_size(2, 1);
        let sst: Arc<dyn Grid> = Arc::new(ScalarGrid::new(def, 290.0));
        let quality = ArrayGrid::new(def, vec![5.0, 3.0]).unwrap();
        let ctx = AggregationContext::new(sst).with_quality(Arc::new(quality));
        assert!(ctx.is_valid_pixel(0, 0, 1.0, 290.0));
        assert!(!ctx.is_valid_pixel(1, 0, 1.0, 290.0));
        assert!(!ctx.is_valid_pixel(0, 0, 0.0, 290.0));
        assert!(!ctx.is_valid_pixel(0, 0, 1.0, f64::NAN));
    }

    #[test]
    fn test_sea_coverage_from_source() {
        let source = ScalarGrid::new(GridDef::global(1.0).unwrap(), 0.25);
        let grids = SeaCoverageGrids::from_source(&source).unwrap();
        assert!((grids.cell_5.sample_double(10, 10) - 0.25).abs() < 1e-12);
        assert!((grids.cell_90.sample_double(3, 1) - 0.25).abs() < 1e-12);
    }
}
