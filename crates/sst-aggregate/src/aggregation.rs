//! Pipeline steps: source pixels into cells, cells into coarser cells,
//! and cells into regional aggregations.

use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sst_common::{Grid, GridDef, GridRectangle, RegionMask, SstError};
use tracing::debug;

use crate::accumulate::{Accumulator, ArithmeticMean, WeightedUncertainty};
use crate::cell::{
    AggregationCell, Cell5, CoarseCell, Results, ADJUSTMENT_UNCERTAINTY, COVERAGE_UNCERTAINTY,
    LARGE_SCALE_UNCERTAINTY, RANDOM_UNCERTAINTY, RESULT_COUNT, SEA_ICE_FRACTION, SST,
    SST_ANOMALY, SYNOPTIC_UNCERTAINTY,
};
use crate::cell_grid::CellGrid;
use crate::context::{AggregationContext, CellContext};
use crate::error::Result;

/// Pixel rectangle of the source grid covered by cell (x, y) of `cell_def`.
///
/// Exact when the source grid refines the cell grid, otherwise taken
/// from the cell's lon/lat bounds.
pub fn source_rectangle(
    source_def: &GridDef,
    cell_def: &GridDef,
    x: usize,
    y: usize,
) -> Result<GridRectangle> {
    match source_def.grid_rectangle_for_cell(x, y, cell_def) {
        Ok(rect) => Ok(rect),
        Err(_) => Ok(source_def.grid_rectangle_for_bbox(&cell_def.lon_lat_rectangle(x, y))?),
    }
}

/// Accumulate one source into the cells of `cell_grid` selected by `mask`.
///
/// `mask` must share the grid of `cell_grid`. Cells are created for the
/// mask and dropped again unless they receive a valid sample. With
/// `parallel` each cell is fed by one rayon worker; the call returns once
/// every cell is done.
pub fn aggregate_source(
    cell_grid: &mut CellGrid<Cell5>,
    source: &AggregationContext,
    cell_context: &Arc<CellContext>,
    mask: &RegionMask,
    parallel: bool,
) -> Result<()> {
    source.validate()?;
    let started = Instant::now();
    let source_def = *source.grid_def();
    let cell_def = *cell_grid.grid_def();
    if !mask.grid_def().same_size(&cell_def) {
        return Err(SstError::GridMismatch(format!(
            "mask '{}' is {}x{}, cell grid is {}x{}",
            mask.name(),
            mask.width(),
            mask.height(),
            cell_def.width,
            cell_def.height
        ))
        .into());
    }

    for (x, y) in mask.cells() {
        cell_grid.get_or_create(x, y, |x, y| Cell5::new(cell_context.clone(), x, y));
    }

    let cells = cell_grid.cells_mut();
    let mut rects = Vec::with_capacity(cells.len());
    for &(x, y) in cells.keys() {
        if mask.is_set(x, y) {
            rects.push(((x, y), source_rectangle(&source_def, &cell_def, x, y)?));
        }
    }

    if parallel {
        rects.par_sort_unstable_by_key(|(key, _)| *key);
        cells.par_iter_mut().for_each(|(key, cell)| {
            if let Ok(i) = rects.binary_search_by_key(key, |(k, _)| *k) {
                cell.accumulate(source, &rects[i].1);
            }
        });
    } else {
        for (key, rect) in &rects {
            if let Some(cell) = cells.get_mut(key) {
                cell.accumulate(source, rect);
            }
        }
    }

    cell_grid.retain_non_empty();

    debug!(
        cells = rects.len(),
        non_empty = cell_grid.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Aggregated source grid into cells"
    );
    Ok(())
}

/// Roll the non-empty cells of `source` up into a coarser grid.
///
/// Each cell lands in the target cell containing it and is weighted by
/// `sea_coverage`, sampled at the source cell's position.
pub fn aggregate_cell_grid<C, T, F>(
    source: &CellGrid<C>,
    target_def: GridDef,
    sea_coverage: &dyn Grid,
    factory: F,
) -> CellGrid<T>
where
    C: AggregationCell,
    T: CoarseCell<C>,
    F: Fn(usize, usize) -> T,
{
    let source_def = *source.grid_def();
    let mut target = CellGrid::new(target_def);
    for cell in source.non_empty_cells() {
        let x = cell.x() * target_def.width / source_def.width;
        let y = cell.y() * target_def.height / source_def.height;
        let weight = sea_coverage.sample_double(cell.x(), cell.y());
        target
            .get_or_create(x, y, &factory)
            .accumulate_cell(cell, weight);
    }
    target
}

/// Anything that yields a regional result vector.
pub trait Aggregation {
    fn sample_count(&self) -> usize;
    fn results(&self) -> Results;
}

/// One accumulator per result slot: means for SST, anomaly, large-scale
/// uncertainty and sea ice, RSS for the independent uncertainties.
#[derive(Debug, Clone, Default)]
struct SlotAccumulators {
    sst: ArithmeticMean,
    anomaly: ArithmeticMean,
    random: WeightedUncertainty,
    coverage: WeightedUncertainty,
    large_scale: ArithmeticMean,
    adjustment: WeightedUncertainty,
    synoptic: WeightedUncertainty,
    sea_ice: ArithmeticMean,
}

impl SlotAccumulators {
    fn accumulate(&mut self, r: &Results, weight: f64, sea_ice_weight: f64) {
        self.sst.accumulate(r[SST], weight);
        self.anomaly.accumulate(r[SST_ANOMALY], weight);
        self.random.accumulate(r[RANDOM_UNCERTAINTY], weight);
        self.coverage.accumulate(r[COVERAGE_UNCERTAINTY], weight);
        self.large_scale.accumulate(r[LARGE_SCALE_UNCERTAINTY], weight);
        self.adjustment.accumulate(r[ADJUSTMENT_UNCERTAINTY], weight);
        self.synoptic.accumulate(r[SYNOPTIC_UNCERTAINTY], weight);
        self.sea_ice.accumulate(r[SEA_ICE_FRACTION], sea_ice_weight);
    }

    fn sample_count(&self) -> usize {
        self.sst.sample_count()
    }

    fn results(&self) -> Results {
        let mut results = [f64::NAN; RESULT_COUNT];
        results[SST] = self.sst.combine();
        results[SST_ANOMALY] = self.anomaly.combine();
        results[RANDOM_UNCERTAINTY] = self.random.combine();
        results[COVERAGE_UNCERTAINTY] = self.coverage.combine();
        results[LARGE_SCALE_UNCERTAINTY] = self.large_scale.combine();
        results[ADJUSTMENT_UNCERTAINTY] = self.adjustment.combine();
        results[SYNOPTIC_UNCERTAINTY] = self.synoptic.combine();
        results[SEA_ICE_FRACTION] = self.sea_ice.combine();
        results
    }
}

/// Average of the cells of one region within one month.
///
/// Cells are weighted by their sea coverage, except for sea ice fraction
/// which is an unweighted mean.
#[derive(Debug, Clone, Default)]
pub struct SameMonthAggregation {
    slots: SlotAccumulators,
}

impl SameMonthAggregation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulate<C: AggregationCell>(&mut self, cell: &C, sea_coverage: f64) {
        self.slots.accumulate(&cell.results(), sea_coverage, 1.0);
    }
}

impl Aggregation for SameMonthAggregation {
    fn sample_count(&self) -> usize {
        self.slots.sample_count()
    }

    fn results(&self) -> Results {
        self.slots.results()
    }
}

/// Unweighted combination of monthly aggregations into a season or year.
#[derive(Debug, Clone, Default)]
pub struct MultiMonthAggregation {
    slots: SlotAccumulators,
}

impl MultiMonthAggregation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulate<A: Aggregation + ?Sized>(&mut self, month: &A) {
        self.accumulate_results(&month.results());
    }

    pub fn accumulate_results(&mut self, results: &Results) {
        self.slots.accumulate(results, 1.0, 1.0);
    }
}

impl Aggregation for MultiMonthAggregation {
    fn sample_count(&self) -> usize {
        self.slots.sample_count()
    }

    fn results(&self) -> Results {
        self.slots.results()
    }
}

/// Final result of one region for one time step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalAggregation {
    pub region: String,
    pub sample_count: usize,
    pub results: Results,
}

impl RegionalAggregation {
    pub fn of<A: Aggregation + ?Sized>(region: impl Into<String>, aggregation: &A) -> Self {
        Self {
            region: region.into(),
            sample_count: aggregation.sample_count(),
            results: aggregation.results(),
        }
    }
}

impl Aggregation for RegionalAggregation {
    fn sample_count(&self) -> usize {
        self.sample_count
    }

    fn results(&self) -> Results {
        self.results
    }
}
