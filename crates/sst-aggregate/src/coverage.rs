//! Coverage (sampling) uncertainty.
//!
//! The uncertainty introduced by incomplete sampling of a grid box is
//! modelled empirically. At 5° it decays with the fraction of observed
//! pixels:
//!
//! ```text
//! u5  = magnitude5(x, y) * (1 - (n / 77500) ^ exponent5(x, y))
//! ```
//!
//! At 90° it falls off with the number of contributing 5° cells:
//!
//! ```text
//! u90 = magnitude90(x, y, month) / sqrt(n)
//! ```

use std::sync::Arc;

use sst_common::{grids, ArrayGrid, Grid};

use crate::error::{AggregationError, Result};
use crate::resample::resample;

/// Number of full-resolution pixels tiling one 5° cell.
pub const PIXELS_PER_CELL_5: f64 = 77500.0;

/// Resolutions the coverage model is calibrated for, in degrees.
pub const CELL_5_RESOLUTION: f64 = 5.0;
pub const CELL_90_RESOLUTION: f64 = 90.0;

const MONTHS: usize = 12;

/// Source of the empirical coverage parameters.
///
/// `x`/`y` index the 72x36 grid for the 5° parameters and the 4x2 grid
/// for `magnitude90`; `month` is 0-based.
pub trait CoverageLut: Send + Sync {
    fn magnitude5(&self, x: usize, y: usize) -> f64;
    fn exponent5(&self, x: usize, y: usize) -> f64;
    fn magnitude90(&self, x: usize, y: usize, month: usize) -> f64;
}

/// Constant coverage parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarCoverageLut {
    pub magnitude5: f64,
    pub exponent5: f64,
    pub magnitude90: f64,
}

impl ScalarCoverageLut {
    pub fn new(magnitude5: f64, exponent5: f64, magnitude90: f64) -> Self {
        Self {
            magnitude5,
            exponent5,
            magnitude90,
        }
    }
}

impl CoverageLut for ScalarCoverageLut {
    fn magnitude5(&self, _x: usize, _y: usize) -> f64 {
        self.magnitude5
    }

    fn exponent5(&self, _x: usize, _y: usize) -> f64 {
        self.exponent5
    }

    fn magnitude90(&self, _x: usize, _y: usize, _month: usize) -> f64 {
        self.magnitude90
    }
}

/// Coverage parameters held as grids on the 5° and 90° cell grids.
#[derive(Debug, Clone)]
pub struct GridCoverageLut {
    magnitude5: ArrayGrid,
    exponent5: ArrayGrid,
    magnitude90: Vec<ArrayGrid>,
}

impl GridCoverageLut {
    /// Build from grids already on the cell grids: 72x36 for the 5°
    /// parameters and twelve monthly 4x2 grids for `magnitude90`.
    pub fn new(
        magnitude5: ArrayGrid,
        exponent5: ArrayGrid,
        magnitude90: Vec<ArrayGrid>,
    ) -> Result<Self> {
        let cell_5 = grids::cell_5();
        let cell_90 = grids::cell_90();
        for (name, grid) in [("magnitude5", &magnitude5), ("exponent5", &exponent5)] {
            if !grid.grid_def().same_size(&cell_5) {
                return Err(AggregationError::lut(format!(
                    "{} must be {}x{}, got {}x{}",
                    name,
                    cell_5.width,
                    cell_5.height,
                    grid.grid_def().width,
                    grid.grid_def().height
                )));
            }
        }
        if magnitude90.len() != MONTHS {
            return Err(AggregationError::lut(format!(
                "magnitude90 needs {} monthly grids, got {}",
                MONTHS,
                magnitude90.len()
            )));
        }
        if let Some(month) = magnitude90
            .iter()
            .position(|grid| !grid.grid_def().same_size(&cell_90))
        {
            return Err(AggregationError::lut(format!(
                "magnitude90 for month {} must be {}x{}",
                month, cell_90.width, cell_90.height
            )));
        }
        Ok(Self {
            magnitude5,
            exponent5,
            magnitude90,
        })
    }

    /// Build from grids at their native resolution.
    pub fn from_native(
        magnitude5: &dyn Grid,
        exponent5: &dyn Grid,
        magnitude90: &[&dyn Grid],
    ) -> Result<Self> {
        let cell_5 = grids::cell_5();
        let cell_90 = grids::cell_90();
        let magnitude90 = magnitude90
            .iter()
            .map(|grid| resample(*grid, cell_90))
            .collect::<Result<Vec<_>>>()?;
        Self::new(
            resample(magnitude5, cell_5)?,
            resample(exponent5, cell_5)?,
            magnitude90,
        )
    }
}

impl CoverageLut for GridCoverageLut {
    fn magnitude5(&self, x: usize, y: usize) -> f64 {
        self.magnitude5.sample_double(x, y)
    }

    fn exponent5(&self, x: usize, y: usize) -> f64 {
        self.exponent5.sample_double(x, y)
    }

    fn magnitude90(&self, x: usize, y: usize, month: usize) -> f64 {
        self.magnitude90
            .get(month)
            .map_or(f64::NAN, |grid| grid.sample_double(x, y))
    }
}

/// Coverage uncertainty for one month of one aggregation run.
#[derive(Clone)]
pub struct CoverageUncertaintyProvider {
    lut: Arc<dyn CoverageLut>,
    month: usize,
}

impl std::fmt::Debug for CoverageUncertaintyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoverageUncertaintyProvider")
            .field("month", &self.month)
            .finish_non_exhaustive()
    }
}

impl CoverageUncertaintyProvider {
    /// `month` is 0-based.
    pub fn new(lut: Arc<dyn CoverageLut>, month: usize) -> Result<Self> {
        if month >= MONTHS {
            return Err(AggregationError::invalid_argument(format!(
                "month must be in [0, {}), got {}",
                MONTHS, month
            )));
        }
        Ok(Self { lut, month })
    }

    pub fn month(&self) -> usize {
        self.month
    }

    /// True if the model is calibrated for cells of this resolution.
    pub fn supports(resolution: f64) -> bool {
        resolution == CELL_5_RESOLUTION || resolution == CELL_90_RESOLUTION
    }

    /// Coverage uncertainty of a 5° cell with `sample_count` pixels.
    pub fn calculate5(&self, x: usize, y: usize, sample_count: usize) -> f64 {
        if sample_count == 0 {
            return f64::NAN;
        }
        let magnitude = self.lut.magnitude5(x, y);
        let exponent = self.lut.exponent5(x, y);
        magnitude * (1.0 - (sample_count as f64 / PIXELS_PER_CELL_5).powf(exponent))
    }

    /// Coverage uncertainty of a 90° cell with `sample_count` 5° cells.
    pub fn calculate90(&self, x: usize, y: usize, sample_count: usize) -> f64 {
        if sample_count == 0 {
            return f64::NAN;
        }
        self.lut.magnitude90(x, y, self.month) / (sample_count as f64).sqrt()
    }

    /// Dispatch on the cell resolution; NaN for uncalibrated resolutions.
    pub fn calculate(&self, x: usize, y: usize, sample_count: usize, resolution: f64) -> f64 {
        if resolution == CELL_5_RESOLUTION {
            self.calculate5(x, y, sample_count)
        } else if resolution == CELL_90_RESOLUTION {
            self.calculate90(x, y, sample_count)
        } else {
            f64::NAN
        }
    }
}
