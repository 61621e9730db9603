//! Regional averaging over time steps.
//!
//! For every time step the sources are reduced into 5° cells over the
//! union of all region masks. Each region then averages its own cells,
//! rolling them up to 90° first when it covers a hemisphere or the
//! globe. Seasonal and annual steps combine monthly results.

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sst_common::{
    grids, time_steps, Grid, RegionMask, RegionMaskList, SpatialResolution,
    TemporalResolution, TimeStep,
};
use tracing::{debug, info, warn};

use crate::aggregation::{
    aggregate_cell_grid, aggregate_source, MultiMonthAggregation, RegionalAggregation,
    SameMonthAggregation,
};
use crate::cell::{AggregationCell, Cell5, Cell90};
use crate::cell_grid::CellGrid;
use crate::config::AggregationConfig;
use crate::context::{AggregationContext, CellContext, SeaCoverageGrids};
use crate::coverage::{CoverageLut, CoverageUncertaintyProvider, CELL_5_RESOLUTION};
use crate::error::{AggregationError, Result};
use crate::product::ProductType;
use crate::synoptic::SynopticUncertaintyProvider;

/// Supplies the source grids of a product for a time range.
///
/// Implementations wrap the file layer: finding files by date, reading
/// their variables and attaching climatology and sea coverage.
pub trait SourceProvider: Send + Sync {
    fn product_type(&self) -> ProductType;

    /// One context per source file whose date falls into `step`.
    fn sources(&self, step: &TimeStep) -> Result<Vec<AggregationContext>>;
}

/// In-memory sources keyed by date.
#[derive(Debug, Clone)]
pub struct StaticSourceProvider {
    product_type: ProductType,
    sources: Vec<(NaiveDate, AggregationContext)>,
}

impl StaticSourceProvider {
    pub fn new(product_type: ProductType) -> Self {
        Self {
            product_type,
            sources: Vec::new(),
        }
    }

    pub fn with_source(mut self, date: NaiveDate, source: AggregationContext) -> Self {
        self.sources.push((date, source));
        self
    }

    pub fn add(&mut self, date: NaiveDate, source: AggregationContext) {
        self.sources.push((date, source));
    }
}

impl SourceProvider for StaticSourceProvider {
    fn product_type(&self) -> ProductType {
        self.product_type
    }

    fn sources(&self, step: &TimeStep) -> Result<Vec<AggregationContext>> {
        Ok(self
            .sources
            .iter()
            .filter(|(date, _)| step.contains(date))
            .map(|(_, source)| source.clone())
            .collect())
    }
}

/// Regional results of one output time step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AveragingTimeStep {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub regions: Vec<RegionalAggregation>,
}

impl AveragingTimeStep {
    pub fn region(&self, name: &str) -> Option<&RegionalAggregation> {
        self.regions.iter().find(|r| r.region == name)
    }
}

/// Computes regional averages with propagated uncertainties.
pub struct RegionalAverager {
    config: AggregationConfig,
    coverage_lut: Arc<dyn CoverageLut>,
    sea_coverage: SeaCoverageGrids,
    regions: RegionMaskList,
}

impl RegionalAverager {
    /// Regions are parsed from the configuration.
    pub fn new(
        config: AggregationConfig,
        coverage_lut: Arc<dyn CoverageLut>,
        sea_coverage: SeaCoverageGrids,
    ) -> Result<Self> {
        let config = config.checked()?;
        let regions = config.region_masks()?;
        Self::with_regions(config, coverage_lut, sea_coverage, regions)
    }

    pub fn with_regions(
        config: AggregationConfig,
        coverage_lut: Arc<dyn CoverageLut>,
        sea_coverage: SeaCoverageGrids,
        regions: RegionMaskList,
    ) -> Result<Self> {
        let config = config.checked()?;
        let cell_5 = grids::cell_5();
        if let Some(mask) = regions
            .iter()
            .find(|mask| mask.width() != cell_5.width || mask.height() != cell_5.height)
        {
            return Err(AggregationError::config(format!(
                "region '{}' is {}x{}, regional averaging needs masks on the 5° grid",
                mask.name(),
                mask.width(),
                mask.height()
            )));
        }
        Ok(Self {
            config,
            coverage_lut,
            sea_coverage,
            regions,
        })
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    pub fn regions(&self) -> &RegionMaskList {
        &self.regions
    }

    /// Average all regions over `[start, end)`.
    pub fn aggregate(
        &self,
        provider: &dyn SourceProvider,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AveragingTimeStep>> {
        let resolution = self.config.temporal_resolution;
        let steps = time_steps(start, end, resolution)?;
        info!(
            product = %provider.product_type(),
            resolution = %resolution,
            steps = steps.len(),
            regions = self.regions.len(),
            "Starting regional averaging"
        );

        let mut output = Vec::with_capacity(steps.len());
        for step in steps {
            let regions = if resolution.is_multi_month() {
                self.aggregate_multi_month(provider, &step)?
            } else {
                self.aggregate_step(provider, &step, resolution)?
            };
            output.push(AveragingTimeStep {
                start: step.start,
                end: step.end,
                regions,
            });
        }
        Ok(output)
    }

    /// Combine the monthly results of each region, one accumulator per region.
    fn aggregate_multi_month(
        &self,
        provider: &dyn SourceProvider,
        step: &TimeStep,
    ) -> Result<Vec<RegionalAggregation>> {
        let mut combined: Vec<MultiMonthAggregation> =
            vec![MultiMonthAggregation::new(); self.regions.len()];
        for month in time_steps(step.start, step.end, TemporalResolution::Monthly)? {
            let monthly = self.aggregate_step(provider, &month, TemporalResolution::Monthly)?;
            for (aggregation, result) in combined.iter_mut().zip(&monthly) {
                aggregation.accumulate(result);
            }
        }
        Ok(self
            .regions
            .iter()
            .zip(&combined)
            .map(|(mask, aggregation)| RegionalAggregation::of(mask.name(), aggregation))
            .collect())
    }

    /// Regional results of a single step of at most one month.
    fn aggregate_step(
        &self,
        provider: &dyn SourceProvider,
        step: &TimeStep,
        resolution: TemporalResolution,
    ) -> Result<Vec<RegionalAggregation>> {
        let started = Instant::now();
        info!(start = %step.start, end = %step.end, "Aggregating time step");

        let coverage = CoverageUncertaintyProvider::new(self.coverage_lut.clone(), step.month0())?;
        let synoptic = SynopticUncertaintyProvider::new(SpatialResolution::DEG_5, resolution);
        let cell_context = Arc::new(
            CellContext::new(CELL_5_RESOLUTION, coverage)
                .with_synoptic(synoptic)
                .with_min_coverage(self.config.min_coverage, self.config.min_coverage_90),
        );

        let mut cell_grid: CellGrid<Cell5> = CellGrid::new(grids::cell_5());
        if let Some(combined) = self.regions.combined()? {
            let sources = provider.sources(step)?;
            if sources.is_empty() {
                warn!(start = %step.start, end = %step.end, "No sources for time step");
            }
            for source in &sources {
                aggregate_source(
                    &mut cell_grid,
                    source,
                    &cell_context,
                    &combined,
                    self.config.parallel,
                )?;
            }
        }

        let aggregate =
            |mask: &Arc<RegionMask>| self.aggregate_region(&cell_grid, mask, &cell_context);
        let results: Vec<RegionalAggregation> = if self.config.parallel {
            self.regions.as_slice().par_iter().map(aggregate).collect()
        } else {
            self.regions.iter().map(aggregate).collect()
        };

        debug!(
            cells = cell_grid.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Time step aggregated"
        );
        Ok(results)
    }

    fn aggregate_region(
        &self,
        cell_grid: &CellGrid<Cell5>,
        mask: &RegionMask,
        cell_context: &Arc<CellContext>,
    ) -> RegionalAggregation {
        let mut region_cells: CellGrid<Cell5> = CellGrid::new(*cell_grid.grid_def());
        for cell in cell_grid.cells_in_mask(mask) {
            region_cells.insert(cell.clone());
        }

        let mut aggregation = SameMonthAggregation::new();
        if mask.coverage().must_aggregate_to_90() {
            let cell_90_grid = aggregate_cell_grid(
                &region_cells,
                grids::cell_90(),
                &self.sea_coverage.cell_5,
                |x, y| Cell90::new(cell_context.clone(), x, y),
            );
            for cell in cell_90_grid.non_empty_cells() {
                let weight = self.sea_coverage.cell_90.sample_double(cell.x(), cell.y());
                aggregation.accumulate(cell, weight);
            }
        } else {
            for cell in region_cells.non_empty_cells() {
                let weight = self.sea_coverage.cell_5.sample_double(cell.x(), cell.y());
                aggregation.accumulate(cell, weight);
            }
        }

        debug!(
            region = %mask.name(),
            coverage = ?mask.coverage(),
            cells = region_cells.len(),
            "Region aggregated"
        );
        RegionalAggregation::of(mask.name(), &aggregation)
    }
}
