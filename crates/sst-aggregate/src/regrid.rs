//! Regridding of source products onto a coarser global grid.
//!
//! Every target cell reduces the source pixels it covers, producing one
//! output grid per result slot. Cells outside the configured regions
//! stay NaN.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use sst_common::{time_steps, ArrayGrid, GridDef, RegionMaskList, TemporalResolution, TimeStep};
use tracing::{debug, info, warn};

use crate::aggregation::{aggregate_source, Aggregation, MultiMonthAggregation};
use crate::averaging::SourceProvider;
use crate::cell::{AggregationCell, Cell5, RESULT_COUNT};
use crate::cell_grid::CellGrid;
use crate::config::AggregationConfig;
use crate::context::CellContext;
use crate::coverage::{CoverageLut, CoverageUncertaintyProvider};
use crate::error::Result;
use crate::product::SstDepth;
use crate::synoptic::SynopticUncertaintyProvider;

/// Result grids of one output time step.
#[derive(Debug, Clone)]
pub struct RegriddedTimeStep {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub grid_def: GridDef,
    /// One grid per result slot, indexed like [`crate::cell::Results`].
    pub grids: Vec<ArrayGrid>,
}

impl RegriddedTimeStep {
    pub fn grid(&self, slot: usize) -> Option<&ArrayGrid> {
        self.grids.get(slot)
    }
}

/// Regrids source products onto the configured target resolution.
pub struct Regridder {
    config: AggregationConfig,
    coverage_lut: Arc<dyn CoverageLut>,
    grid_def: GridDef,
    regions: RegionMaskList,
}

impl Regridder {
    pub fn new(config: AggregationConfig, coverage_lut: Arc<dyn CoverageLut>) -> Result<Self> {
        let config = config.checked()?;
        if !CoverageUncertaintyProvider::supports(config.target_resolution) {
            warn!(
                target_resolution = config.target_resolution,
                "Coverage uncertainty is only calibrated for 5° and 90° cells, it will be NaN"
            );
        }
        let grid_def = config.target_grid_def()?;
        let regions = RegionMaskList::parse(&config.regions, grid_def)?;
        Ok(Self {
            config,
            coverage_lut,
            grid_def,
            regions,
        })
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    pub fn sst_depth(&self) -> SstDepth {
        self.config.sst_depth
    }

    pub fn grid_def(&self) -> &GridDef {
        &self.grid_def
    }

    /// Regrid all sources of `[start, end)`.
    pub fn regrid(
        &self,
        provider: &dyn SourceProvider,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RegriddedTimeStep>> {
        let resolution = self.config.temporal_resolution;
        let grid_def = self.grid_def;
        let steps = time_steps(start, end, resolution)?;
        info!(
            product = %provider.product_type(),
            resolution = %resolution,
            target_resolution = self.config.target_resolution,
            steps = steps.len(),
            "Starting regridding"
        );

        let mut output = Vec::with_capacity(steps.len());
        for step in steps {
            let grids = if resolution.is_multi_month() {
                self.regrid_multi_month(provider, &step, grid_def)?
            } else {
                self.regrid_step(provider, &step, resolution, grid_def)?
                    .result_grids()
            };
            output.push(RegriddedTimeStep {
                start: step.start,
                end: step.end,
                grid_def,
                grids,
            });
        }
        Ok(output)
    }

    /// Combine the monthly results of every cell without weights.
    fn regrid_multi_month(
        &self,
        provider: &dyn SourceProvider,
        step: &TimeStep,
        grid_def: GridDef,
    ) -> Result<Vec<ArrayGrid>> {
        let mut combined: HashMap<(usize, usize), MultiMonthAggregation> = HashMap::new();
        for month in time_steps(step.start, step.end, TemporalResolution::Monthly)? {
            let cells = self.regrid_step(provider, &month, TemporalResolution::Monthly, grid_def)?;
            for cell in cells.non_empty_cells() {
                combined
                    .entry((cell.x(), cell.y()))
                    .or_default()
                    .accumulate_results(&cell.results());
            }
        }

        let mut grids = vec![ArrayGrid::filled(grid_def, f64::NAN); RESULT_COUNT];
        for (&(x, y), aggregation) in &combined {
            for (grid, value) in grids.iter_mut().zip(aggregation.results()) {
                grid.set_sample(x, y, value);
            }
        }
        Ok(grids)
    }

    fn regrid_step(
        &self,
        provider: &dyn SourceProvider,
        step: &TimeStep,
        resolution: TemporalResolution,
        grid_def: GridDef,
    ) -> Result<CellGrid<Cell5>> {
        let started = Instant::now();
        let target_resolution = self.config.target_resolution;
        let coverage = CoverageUncertaintyProvider::new(self.coverage_lut.clone(), step.month0())?;
        let synoptic = SynopticUncertaintyProvider::with_degrees(target_resolution, resolution);
        let cell_context = Arc::new(
            CellContext::new(target_resolution, coverage)
                .with_synoptic(synoptic)
                .with_min_coverage(self.config.min_coverage, self.config.min_coverage_90),
        );

        let mut cells: CellGrid<Cell5> = CellGrid::new(grid_def);
        if let Some(mask) = self.regions.combined()? {
            let sources = provider.sources(step)?;
            if sources.is_empty() {
                warn!(start = %step.start, end = %step.end, "No sources for time step");
            }
            for source in &sources {
                aggregate_source(&mut cells, source, &cell_context, &mask, self.config.parallel)?;
            }
        }
        cells.retain_non_empty();

        debug!(
            start = %step.start,
            cells = cells.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Regridded time step"
        );
        Ok(cells)
    }
}
