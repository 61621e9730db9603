//! Tests for 5° and 90° cells and the cell-grid pipeline steps.

use std::sync::Arc;

use sst_aggregate::cell::{
    ADJUSTMENT_UNCERTAINTY, COVERAGE_UNCERTAINTY, LARGE_SCALE_UNCERTAINTY, RANDOM_UNCERTAINTY,
    SEA_ICE_FRACTION, SST, SST_ANOMALY, SYNOPTIC_UNCERTAINTY,
};
use sst_aggregate::{
    aggregate_cell_grid, aggregate_source, AggregationCell, AggregationContext, AggregationError,
    Cell5, Cell90, CellContext, CellGrid, CoarseCell, CoverageUncertaintyProvider,
    ScalarCoverageLut, SynopticUncertaintyProvider,
};
use sst_common::{
    grids, Grid, GridDef, GridRectangle, RegionMask, ScalarGrid, SpatialResolution, SstError,
    TemporalResolution,
};
use test_utils::{assert_approx_eq, boxed_grid, gradient_grid, init_tracing, nan_holed_grid};

/// 0.05° grid, large enough to hold 10x20 pixel rectangles inside one 5° cell.
fn fine_grid() -> GridDef {
    GridDef::global_with_size(7200, 3600)
}

fn scalar(grid_def: GridDef, value: f64) -> Arc<dyn Grid> {
    Arc::new(ScalarGrid::new(grid_def, value))
}

fn cell_context() -> Arc<CellContext> {
    let lut = Arc::new(ScalarCoverageLut::new(1.2, 0.5, 1.1));
    let coverage = CoverageUncertaintyProvider::new(lut, 0).unwrap();
    let synoptic =
        SynopticUncertaintyProvider::new(SpatialResolution::DEG_5, TemporalResolution::Monthly);
    Arc::new(CellContext::new(5.0, coverage).with_synoptic(synoptic))
}

fn full_source(grid_def: GridDef) -> AggregationContext {
    AggregationContext::new(scalar(grid_def, 292.0))
        .with_climatology_sst(scalar(grid_def, 291.5))
        .with_sea_coverage(scalar(grid_def, 0.8))
        .with_random_uncertainty(scalar(grid_def, 0.1))
        .with_large_scale_uncertainty(scalar(grid_def, 0.2))
        .with_adjustment_uncertainty(scalar(grid_def, 0.05))
        .with_synoptic_uncertainty(scalar(grid_def, 0.3))
        .with_sea_ice_fraction(scalar(grid_def, 0.0))
}

fn cell_with_pixels(ctx: &Arc<CellContext>, x: usize, width: usize, height: usize) -> Cell5 {
    let source = full_source(fine_grid());
    let mut cell = Cell5::new(ctx.clone(), x, 0);
    cell.accumulate(&source, &GridRectangle::new(x * 100, 0, width, height));
    cell
}

// ============================================================================
// Cell5
// ============================================================================

#[test]
fn test_cell5_results() {
    let ctx = cell_context();
    let cell = cell_with_pixels(&ctx, 0, 10, 10);
    let results = cell.results();

    assert_eq!(cell.sample_count(), 100);
    assert_eq!(cell.max_sample_count(), 100);
    assert_approx_eq!(results[SST], 292.0, 1e-10);
    assert_approx_eq!(results[SST_ANOMALY], 0.5, 1e-10);
    assert_approx_eq!(results[RANDOM_UNCERTAINTY], 0.01, 1e-12);
    assert_approx_eq!(
        results[COVERAGE_UNCERTAINTY],
        1.2 * (1.0 - (100.0f64 / 77500.0).sqrt()),
        1e-12
    );
    assert_approx_eq!(results[LARGE_SCALE_UNCERTAINTY], 0.2, 1e-12);
    assert_approx_eq!(results[SEA_ICE_FRACTION], 0.0, 1e-12);

    let synoptic =
        SynopticUncertaintyProvider::new(SpatialResolution::DEG_5, TemporalResolution::Monthly);
    let eta = synoptic.eta(0, 100);
    assert_approx_eq!(results[ADJUSTMENT_UNCERTAINTY], 0.5 / eta, 1e-10);
    assert_approx_eq!(results[SYNOPTIC_UNCERTAINTY], 3.0 / eta, 1e-10);
}

#[test]
fn test_cell5_quality_filter() {
    let def = GridDef::global_with_size(4, 1);
    let quality = sst_common::ArrayGrid::new(def, vec![5.0, 4.0, 5.0, 0.0]).unwrap();
    let sst = gradient_grid(def, 290.0, 1.0, 0.0);
    let source = AggregationContext::new(Arc::new(sst)).with_quality(Arc::new(quality));

    let mut cell = Cell5::new(cell_context(), 0, 0);
    cell.accumulate(&source, &GridRectangle::new(0, 0, 4, 1));

    assert_eq!(cell.sample_count(), 2);
    assert_approx_eq!(cell.results()[SST], 291.0, 1e-12);
}

#[test]
fn test_cell5_zero_sea_coverage_is_invalid() {
    let def = GridDef::global_with_size(2, 1);
    let sea = sst_common::ArrayGrid::new(def, vec![0.0, 1.0]).unwrap();
    let sst = sst_common::ArrayGrid::new(def, vec![280.0, 290.0]).unwrap();
    let source = AggregationContext::new(Arc::new(sst)).with_sea_coverage(Arc::new(sea));

    let mut cell = Cell5::new(cell_context(), 0, 0);
    cell.accumulate(&source, &GridRectangle::new(0, 0, 2, 1));
    assert_eq!(cell.sample_count(), 1);
    assert_eq!(cell.results()[SST], 290.0);
}

#[test]
fn test_cell5_results_are_repeatable() {
    let cell = cell_with_pixels(&cell_context(), 0, 10, 10);
    let first = cell.results();
    let second = cell.results();
    assert_eq!(first[SST], second[SST]);
    assert_eq!(first[COVERAGE_UNCERTAINTY], second[COVERAGE_UNCERTAINTY]);
}

// ============================================================================
// Cell90
// ============================================================================

#[test]
fn test_cell90_coverage_uncertainty() {
    let ctx = cell_context();
    let children = [
        (cell_with_pixels(&ctx, 0, 10, 10), 0.25),
        (cell_with_pixels(&ctx, 1, 10, 10), 0.5),
        (cell_with_pixels(&ctx, 2, 10, 10), 0.25),
        (cell_with_pixels(&ctx, 3, 10, 20), 1.0),
    ];

    let mut cell = Cell90::new(ctx, 0, 0);
    for (child, weight) in &children {
        cell.accumulate_cell(child, *weight);
    }

    assert_eq!(cell.sample_count(), 4);
    assert_eq!(cell.child_count(), 4);
    let results = cell.results();
    assert_approx_eq!(results[SST], 292.0, 1e-10);
    assert_approx_eq!(results[SST_ANOMALY], 0.5, 1e-10);
    assert_approx_eq!(results[COVERAGE_UNCERTAINTY], 0.8673687237391897, 1e-10);
    assert_approx_eq!(results[LARGE_SCALE_UNCERTAINTY], 0.2, 1e-10);
}

#[test]
fn test_cell90_min_coverage() {
    let lut = Arc::new(ScalarCoverageLut::new(1.2, 0.5, 1.1));
    let coverage = CoverageUncertaintyProvider::new(lut, 0).unwrap();
    let ctx = Arc::new(CellContext::new(5.0, coverage).with_min_coverage(0.0, 0.5));

    let valid = cell_with_pixels(&ctx, 0, 10, 10);
    let empty = Cell5::new(ctx.clone(), 1, 0);

    let mut cell = Cell90::new(ctx, 0, 0);
    cell.accumulate_cell(&valid, 1.0);
    cell.accumulate_cell(&empty, 1.0);
    cell.accumulate_cell(&empty, 1.0);

    // 1 valid child of 3 is below the 0.5 threshold
    assert_eq!(cell.sample_count(), 1);
    assert!(cell.results()[SST].is_nan());
}

// ============================================================================
// Cell grids
// ============================================================================

#[test]
fn test_aggregate_source_parallel_matches_sequential() {
    init_tracing();
    let source_def = GridDef::global(1.0).unwrap();
    let source = AggregationContext::new(Arc::new(nan_holed_grid(source_def, 290.0, 3)))
        .with_random_uncertainty(Arc::new(gradient_grid(source_def, 0.1, 0.001, 0.002)));
    let mask = RegionMask::from_bbox("Nino34", -170.0, 5.0, -120.0, -5.0, grids::cell_5()).unwrap();
    let ctx = cell_context();

    let mut sequential: CellGrid<Cell5> = CellGrid::new(grids::cell_5());
    aggregate_source(&mut sequential, &source, &ctx, &mask, false).unwrap();
    let mut parallel: CellGrid<Cell5> = CellGrid::new(grids::cell_5());
    aggregate_source(&mut parallel, &source, &ctx, &mask, true).unwrap();

    assert_eq!(sequential.len(), mask.count());
    let a = sequential.results();
    let b = parallel.results();
    assert_eq!(a.len(), b.len());
    for (a, b) in a.iter().zip(&b) {
        assert_eq!((a.x, a.y, a.sample_count), (b.x, b.y, b.sample_count));
        assert_approx_eq!(a.results[RANDOM_UNCERTAINTY], b.results[RANDOM_UNCERTAINTY], 1e-12);
    }
}

#[test]
fn test_aggregate_source_rejects_mismatched_grids() {
    let source = AggregationContext::new(scalar(grids::cell_5(), 290.0))
        .with_quality(scalar(grids::cell_90(), 5.0));
    let mask =
        RegionMask::from_bbox("Global", -180.0, 90.0, 180.0, -90.0, grids::cell_5()).unwrap();
    let mut cells: CellGrid<Cell5> = CellGrid::new(grids::cell_5());
    assert!(aggregate_source(&mut cells, &source, &cell_context(), &mask, false).is_err());
}

#[test]
fn test_aggregate_source_rejects_mask_on_other_grid() {
    let def = GridDef::global(1.0).unwrap();
    let source = AggregationContext::new(scalar(def, 290.0));
    let mask = RegionMask::from_bbox("Global", -180.0, 90.0, 180.0, -90.0, def).unwrap();
    let mut cells: CellGrid<Cell5> = CellGrid::new(grids::cell_5());

    let result = aggregate_source(&mut cells, &source, &cell_context(), &mask, true);
    assert!(matches!(
        result,
        Err(AggregationError::Common(SstError::GridMismatch(_)))
    ));
    assert!(cells.is_empty());
}

#[test]
fn test_aggregate_source_keeps_only_cells_with_samples() {
    let def = GridDef::global(1.0).unwrap();
    // valid samples only in the two 5° columns west of the prime meridian
    let sst = boxed_grid(def, 170..180, 0..180, 290.0, f64::NAN);
    let source = AggregationContext::new(Arc::new(sst));
    let mask =
        RegionMask::from_bbox("Global", -180.0, 90.0, 180.0, -90.0, grids::cell_5()).unwrap();

    let mut cells: CellGrid<Cell5> = CellGrid::new(grids::cell_5());
    aggregate_source(&mut cells, &source, &cell_context(), &mask, false).unwrap();
    assert_eq!(cells.len(), 2 * 36);
    assert!(cells.get(34, 0).is_some());
    assert!(cells.get(35, 35).is_some());
    assert!(cells.get(36, 0).is_none());
}

#[test]
fn test_cell_grid_to_90_degrees() {
    let source = AggregationContext::new(scalar(GridDef::global(1.0).unwrap(), 285.0));
    let mask = RegionMask::from_bbox("North", -180.0, 90.0, 180.0, 0.0, grids::cell_5()).unwrap();
    let ctx = cell_context();

    let mut cells: CellGrid<Cell5> = CellGrid::new(grids::cell_5());
    aggregate_source(&mut cells, &source, &ctx, &mask, true).unwrap();
    let sea = ScalarGrid::new(grids::cell_5(), 1.0);
    let coarse = aggregate_cell_grid(&cells, grids::cell_90(), &sea, |x, y| {
        Cell90::new(ctx.clone(), x, y)
    });

    assert_eq!(coarse.len(), 4);
    for x in 0..4 {
        let cell = coarse.get(x, 0).unwrap();
        assert_eq!(cell.sample_count(), 18 * 18);
        assert_approx_eq!(cell.results()[SST], 285.0, 1e-10);
    }
    assert!(coarse.get(0, 1).is_none());
}
