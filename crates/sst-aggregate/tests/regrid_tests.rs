//! End-to-end tests for regridding.

use std::sync::Arc;

use chrono::NaiveDate;
use sst_aggregate::cell::{COVERAGE_UNCERTAINTY, RANDOM_UNCERTAINTY, SST};
use sst_aggregate::{
    AggregationConfig, AggregationContext, ProductType, Regridder, ScalarCoverageLut,
    StaticSourceProvider, RESULT_NAMES,
};
use sst_common::{Grid, GridDef, ScalarGrid, TemporalResolution};
use test_utils::{assert_approx_eq, init_tracing, nan_holed_grid};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn one_degree() -> GridDef {
    GridDef::global(1.0).unwrap()
}

fn constant_source(sst: f64) -> AggregationContext {
    let def = one_degree();
    AggregationContext::new(Arc::new(ScalarGrid::new(def, sst)))
        .with_random_uncertainty(Arc::new(ScalarGrid::new(def, 0.5)))
}

fn regridder(config: AggregationConfig) -> Regridder {
    Regridder::new(config, Arc::new(ScalarCoverageLut::new(1.1, 0.5, 1.2))).unwrap()
}

#[test]
fn test_regrid_to_5_degrees() {
    init_tracing();
    let regridder = regridder(AggregationConfig::default());
    let provider = StaticSourceProvider::new(ProductType::CciL4)
        .with_source(date(2010, 1, 15), constant_source(290.0));

    let steps = regridder
        .regrid(&provider, date(2010, 1, 1), date(2010, 2, 1))
        .unwrap();
    assert_eq!(steps.len(), 1);
    let step = &steps[0];
    assert_eq!(step.grids.len(), RESULT_NAMES.len());
    assert_eq!(step.grid_def.width, 72);
    assert_eq!(step.grid_def.height, 36);

    let sst = step.grid(SST).unwrap();
    assert!(sst.data().iter().all(|&v| (v - 290.0).abs() < 1e-9));

    // 25 pixels of 1° per 5° cell
    let random = step.grid(RANDOM_UNCERTAINTY).unwrap();
    assert_approx_eq!(random.sample_double(40, 20), 0.5 / 5.0, 1e-12);
    let coverage = step.grid(COVERAGE_UNCERTAINTY).unwrap();
    assert_approx_eq!(
        coverage.sample_double(40, 20),
        1.1 * (1.0 - (25.0f64 / 77500.0).sqrt()),
        1e-12
    );
}

#[test]
fn test_regrid_outside_regions_is_nan() {
    let config = AggregationConfig {
        regions: "Nino34=-170,5,-120,-5".to_string(),
        ..Default::default()
    };
    let regridder = regridder(config);
    let provider = StaticSourceProvider::new(ProductType::CciL4)
        .with_source(date(2010, 1, 15), constant_source(290.0));

    let steps = regridder
        .regrid(&provider, date(2010, 1, 1), date(2010, 2, 1))
        .unwrap();
    let sst = steps[0].grid(SST).unwrap();
    assert_eq!(sst.data().iter().filter(|v| !v.is_nan()).count(), 20);
    assert_eq!(sst.sample_double(2, 17), 290.0);
    assert!(sst.sample_double(0, 0).is_nan());
}

#[test]
fn test_regrid_min_coverage() {
    let config = AggregationConfig {
        min_coverage: 0.5,
        ..Default::default()
    };
    let regridder = regridder(config);
    let source = AggregationContext::new(Arc::new(nan_holed_grid(one_degree(), 290.0, 2)));
    let provider =
        StaticSourceProvider::new(ProductType::CciL4).with_source(date(2010, 1, 15), source);

    let steps = regridder
        .regrid(&provider, date(2010, 1, 1), date(2010, 2, 1))
        .unwrap();
    let sst = steps[0].grid(SST).unwrap();
    // 12 of 25 pixels valid
    assert!(sst.sample_double(0, 0).is_nan());
    // 13 of 25 pixels valid
    assert_eq!(sst.sample_double(1, 0), 290.0);
}

#[test]
fn test_regrid_uncalibrated_resolution_has_no_coverage_uncertainty() {
    let config = AggregationConfig {
        target_resolution: 10.0,
        ..Default::default()
    };
    let regridder = regridder(config);
    let provider = StaticSourceProvider::new(ProductType::CciL4)
        .with_source(date(2010, 1, 15), constant_source(290.0));

    let steps = regridder
        .regrid(&provider, date(2010, 1, 1), date(2010, 2, 1))
        .unwrap();
    assert_eq!(steps[0].grid_def.width, 36);
    let coverage = steps[0].grid(COVERAGE_UNCERTAINTY).unwrap();
    assert!(coverage.data().iter().all(|v| v.is_nan()));
    assert_eq!(steps[0].grid(SST).unwrap().sample_double(3, 3), 290.0);
}

#[test]
fn test_regrid_annual_combines_months() {
    let config = AggregationConfig {
        temporal_resolution: TemporalResolution::Annual,
        regions: "Box=0,10,10,0".to_string(),
        ..Default::default()
    };
    let regridder = regridder(config);
    let provider = StaticSourceProvider::new(ProductType::CciL4)
        .with_source(date(2010, 2, 1), constant_source(288.0))
        .with_source(date(2010, 8, 1), constant_source(292.0));

    let steps = regridder
        .regrid(&provider, date(2010, 1, 1), date(2011, 1, 1))
        .unwrap();
    assert_eq!(steps.len(), 1);
    let sst = steps[0].grid(SST).unwrap();
    assert_approx_eq!(sst.sample_double(36, 16), 290.0, 1e-9);
    assert_approx_eq!(sst.sample_double(37, 17), 290.0, 1e-9);
    assert!(sst.sample_double(0, 0).is_nan());

    // two months of 0.1 each combine to sqrt(0.1^2 + 0.1^2) / 2
    let random = steps[0].grid(RANDOM_UNCERTAINTY).unwrap();
    assert_approx_eq!(random.sample_double(36, 16), (0.02f64).sqrt() / 2.0, 1e-12);
}
