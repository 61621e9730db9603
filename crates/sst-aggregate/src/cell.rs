//! Aggregation cells.
//!
//! Cells reduce their inputs into a fixed result vector indexed by the
//! slot constants below. [`Cell5`] reduces source pixels of one grid box,
//! [`Cell90`] reduces the results of the 5° cells it contains.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sst_common::GridRectangle;

use crate::accumulate::{Accumulator, ArithmeticMean, PlainUncertainty, WeightedUncertainty};
use crate::context::{AggregationContext, CellContext};
use crate::coverage::CELL_90_RESOLUTION;

pub const SST: usize = 0;
pub const SST_ANOMALY: usize = 1;
pub const RANDOM_UNCERTAINTY: usize = 2;
pub const COVERAGE_UNCERTAINTY: usize = 3;
pub const LARGE_SCALE_UNCERTAINTY: usize = 4;
pub const ADJUSTMENT_UNCERTAINTY: usize = 5;
pub const SYNOPTIC_UNCERTAINTY: usize = 6;
pub const SEA_ICE_FRACTION: usize = 7;

/// Number of result slots.
pub const RESULT_COUNT: usize = 8;

/// Output variable name of each slot.
pub const RESULT_NAMES: [&str; RESULT_COUNT] = [
    "sst",
    "sst_anomaly",
    "uncorrelated_uncertainty",
    "coverage_uncertainty",
    "large_scale_correlated_uncertainty",
    "adjustment_uncertainty",
    "synoptically_correlated_uncertainty",
    "sea_ice_fraction",
];

/// Result vector of a cell or aggregation, NaN where undefined.
pub type Results = [f64; RESULT_COUNT];

/// Read side shared by all cells.
pub trait AggregationCell: Send + Sync {
    fn x(&self) -> usize;
    fn y(&self) -> usize;

    /// Number of valid contributions, zero for an empty cell.
    fn sample_count(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.sample_count() == 0
    }

    fn results(&self) -> Results;
}

/// A cell that reduces the results of finer cells.
pub trait CoarseCell<C: AggregationCell>: AggregationCell {
    fn accumulate_cell(&mut self, child: &C, weight: f64);
}

/// Snapshot of a cell's results, for output and serialization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellResults {
    pub x: usize,
    pub y: usize,
    pub sample_count: usize,
    pub results: Results,
}

impl CellResults {
    pub fn of<C: AggregationCell>(cell: &C) -> Self {
        Self {
            x: cell.x(),
            y: cell.y(),
            sample_count: cell.sample_count(),
            results: cell.results(),
        }
    }
}

/// First-level cell over source pixels.
///
/// SST, anomaly and large-scale uncertainty are sea-coverage weighted
/// means, random uncertainty a weighted RSS. Adjustment and synoptic
/// uncertainties are plain RSS scaled by the synoptic provider. Sea ice
/// fraction is averaged over all pixels, valid or not.
#[derive(Debug, Clone)]
pub struct Cell5 {
    x: usize,
    y: usize,
    context: Arc<CellContext>,
    sst: ArithmeticMean,
    anomaly: ArithmeticMean,
    random: WeightedUncertainty,
    large_scale: ArithmeticMean,
    adjustment: PlainUncertainty,
    synoptic: PlainUncertainty,
    sea_ice: ArithmeticMean,
    max_sample_count: usize,
}

impl Cell5 {
    pub fn new(context: Arc<CellContext>, x: usize, y: usize) -> Self {
        Self {
            x,
            y,
            context,
            sst: ArithmeticMean::new(),
            anomaly: ArithmeticMean::new(),
            random: WeightedUncertainty::new(),
            large_scale: ArithmeticMean::new(),
            adjustment: PlainUncertainty::new(),
            synoptic: PlainUncertainty::new(),
            sea_ice: ArithmeticMean::new(),
            max_sample_count: 0,
        }
    }

    /// Feed all pixels of `rect` on the source grid.
    pub fn accumulate(&mut self, source: &AggregationContext, rect: &GridRectangle) {
        let width = source.grid_def().width;
        for (x, y) in rect.pixels(width) {
            let sea_coverage = source.sea_coverage_at(x, y);
            let sst = source.sst.sample_double(x, y);

            if source.is_valid_pixel(x, y, sea_coverage, sst) {
                self.sst.accumulate(sst, sea_coverage);
                if let Some(grid) = &source.climatology_sst {
                    self.anomaly
                        .accumulate(sst - grid.sample_double(x, y), sea_coverage);
                }
                if let Some(grid) = &source.random_uncertainty {
                    self.random.accumulate(grid.sample_double(x, y), sea_coverage);
                }
                if let Some(grid) = &source.large_scale_uncertainty {
                    self.large_scale
                        .accumulate(grid.sample_double(x, y), sea_coverage);
                }
                if let Some(grid) = &source.adjustment_uncertainty {
                    self.adjustment.accumulate(grid.sample_double(x, y));
                }
                if let Some(grid) = &source.synoptic_uncertainty {
                    self.synoptic.accumulate(grid.sample_double(x, y));
                }
            }

            if let Some(grid) = &source.sea_ice_fraction {
                self.sea_ice.accumulate(grid.sample_double(x, y), 1.0);
            }
        }
        self.max_sample_count += rect.pixel_count();
    }

    /// Pixels visited so far, valid or not.
    pub fn max_sample_count(&self) -> usize {
        self.max_sample_count
    }

    fn has_enough_samples(&self) -> bool {
        self.sst.sample_count() as f64 > self.context.min_coverage * self.max_sample_count as f64
    }

    pub fn sea_surface_temperature(&self) -> f64 {
        self.sst.combine()
    }

    pub fn sea_surface_temperature_anomaly(&self) -> f64 {
        self.anomaly.combine()
    }

    pub fn random_uncertainty(&self) -> f64 {
        self.random.combine()
    }

    pub fn coverage_uncertainty(&self) -> f64 {
        self.context.coverage.calculate(
            self.x,
            self.y,
            self.sst.sample_count(),
            self.context.resolution,
        )
    }

    pub fn large_scale_uncertainty(&self) -> f64 {
        self.large_scale.combine()
    }

    pub fn adjustment_uncertainty(&self) -> f64 {
        self.scale_synoptic(&self.adjustment)
    }

    pub fn synoptic_uncertainty(&self) -> f64 {
        self.scale_synoptic(&self.synoptic)
    }

    pub fn sea_ice_fraction(&self) -> f64 {
        self.sea_ice.combine()
    }

    fn scale_synoptic(&self, accumulator: &PlainUncertainty) -> f64 {
        match &self.context.synoptic {
            Some(provider) => {
                provider.calculate(self.y, self.sst.sample_count(), accumulator.combine())
            }
            None => f64::NAN,
        }
    }
}

impl AggregationCell for Cell5 {
    fn x(&self) -> usize {
        self.x
    }

    fn y(&self) -> usize {
        self.y
    }

    fn sample_count(&self) -> usize {
        self.sst.sample_count()
    }

    fn results(&self) -> Results {
        let mut results = [f64::NAN; RESULT_COUNT];
        if self.has_enough_samples() {
            results[SST] = self.sea_surface_temperature();
            results[SST_ANOMALY] = self.sea_surface_temperature_anomaly();
            results[RANDOM_UNCERTAINTY] = self.random_uncertainty();
            results[COVERAGE_UNCERTAINTY] = self.coverage_uncertainty();
            results[LARGE_SCALE_UNCERTAINTY] = self.large_scale_uncertainty();
            results[ADJUSTMENT_UNCERTAINTY] = self.adjustment_uncertainty();
            results[SYNOPTIC_UNCERTAINTY] = self.synoptic_uncertainty();
        }
        results[SEA_ICE_FRACTION] = self.sea_ice_fraction();
        results
    }
}

/// 90° cell over 5° cells, weighted by the 90° sea coverage of each child.
///
/// The coverage uncertainty combines the RSS of the children's 5°
/// coverage uncertainties with the 90° sampling term:
/// `sqrt(u5^2 + u90^2)`.
#[derive(Debug, Clone)]
pub struct Cell90 {
    x: usize,
    y: usize,
    context: Arc<CellContext>,
    sst: ArithmeticMean,
    anomaly: ArithmeticMean,
    random: WeightedUncertainty,
    coverage_5: WeightedUncertainty,
    large_scale: ArithmeticMean,
    adjustment: WeightedUncertainty,
    synoptic: WeightedUncertainty,
    sea_ice: ArithmeticMean,
    child_count: usize,
}

impl Cell90 {
    pub fn new(context: Arc<CellContext>, x: usize, y: usize) -> Self {
        Self {
            x,
            y,
            context,
            sst: ArithmeticMean::new(),
            anomaly: ArithmeticMean::new(),
            random: WeightedUncertainty::new(),
            coverage_5: WeightedUncertainty::new(),
            large_scale: ArithmeticMean::new(),
            adjustment: WeightedUncertainty::new(),
            synoptic: WeightedUncertainty::new(),
            sea_ice: ArithmeticMean::new(),
            child_count: 0,
        }
    }

    /// Children fed so far, with or without a valid SST.
    pub fn child_count(&self) -> usize {
        self.child_count
    }

    fn has_enough_samples(&self) -> bool {
        self.sst.sample_count() as f64 > self.context.min_coverage_90 * self.child_count as f64
    }

    pub fn coverage_uncertainty(&self) -> f64 {
        let u5 = self.coverage_5.combine();
        let u90 = self.context.coverage.calculate(
            self.x,
            self.y,
            self.sst.sample_count(),
            CELL_90_RESOLUTION,
        );
        (u5 * u5 + u90 * u90).sqrt()
    }
}

impl CoarseCell<Cell5> for Cell90 {
    fn accumulate_cell(&mut self, child: &Cell5, weight: f64) {
        let r = child.results();
        self.sst.accumulate(r[SST], weight);
        self.anomaly.accumulate(r[SST_ANOMALY], weight);
        self.random.accumulate(r[RANDOM_UNCERTAINTY], weight);
        self.coverage_5.accumulate(r[COVERAGE_UNCERTAINTY], weight);
        self.large_scale.accumulate(r[LARGE_SCALE_UNCERTAINTY], weight);
        self.adjustment.accumulate(r[ADJUSTMENT_UNCERTAINTY], weight);
        self.synoptic.accumulate(r[SYNOPTIC_UNCERTAINTY], weight);
        self.sea_ice.accumulate(r[SEA_ICE_FRACTION], weight);
        self.child_count += 1;
    }
}

impl AggregationCell for Cell90 {
    fn x(&self) -> usize {
        self.x
    }

    fn y(&self) -> usize {
        self.y
    }

    fn sample_count(&self) -> usize {
        self.sst.sample_count()
    }

    fn results(&self) -> Results {
        let mut results = [f64::NAN; RESULT_COUNT];
        if self.has_enough_samples() {
            results[SST] = self.sst.combine();
            results[SST_ANOMALY] = self.anomaly.combine();
            results[RANDOM_UNCERTAINTY] = self.random.combine();
            results[COVERAGE_UNCERTAINTY] = self.coverage_uncertainty();
            results[LARGE_SCALE_UNCERTAINTY] = self.large_scale.combine();
            results[ADJUSTMENT_UNCERTAINTY] = self.adjustment.combine();
            results[SYNOPTIC_UNCERTAINTY] = self.synoptic.combine();
        }
        results[SEA_ICE_FRACTION] = self.sea_ice.combine();
        results
    }
}
