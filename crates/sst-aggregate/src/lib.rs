//! Regional Averaging and Regridding of Gridded SST Products
//!
//! This crate reduces L3/L4 sea surface temperature grids to regional
//! means and coarser grids while propagating their uncertainties:
//!
//! - **Random** uncertainties combine as a weighted root-sum-square
//! - **Large-scale** uncertainties are fully correlated and averaged
//! - **Coverage** uncertainty models under-sampling of each cell
//! - **Synoptic** and adjustment uncertainties are decorrelated over
//!   space and time scales of the synoptic weather
//!
//! # Architecture
//!
//! ```text
//! SourceProvider::sources(step)
//!      │
//!      ▼
//! aggregate_source ──► CellGrid<Cell5>      (5° or target resolution)
//!      │                     │
//!      │                     ├─► Regridder: one grid per result slot
//!      │                     │
//!      │                     └─► aggregate_cell_grid ──► CellGrid<Cell90>
//!      │                                  │
//!      ▼                                  ▼
//! SameMonthAggregation per region  ◄──────┘
//!      │
//!      └─► MultiMonthAggregation for seasonal and annual steps
//! ```
//!
//! # Example
//!
//! ```ignore
//! use sst_aggregate::{AggregationConfig, RegionalAverager, ScalarCoverageLut, SeaCoverageGrids};
//!
//! let config = AggregationConfig::from_env();
//! let lut = Arc::new(ScalarCoverageLut::new(1.1, 0.5, 1.2));
//! let averager = RegionalAverager::new(config, lut, SeaCoverageGrids::open_ocean())?;
//!
//! for step in averager.aggregate(&provider, start, end)? {
//!     let global = step.region("Global");
//!     // ...
//! }
//! ```

pub mod accumulate;
pub mod aggregation;
pub mod averaging;
pub mod cell;
pub mod cell_grid;
pub mod config;
pub mod context;
pub mod coverage;
pub mod error;
pub mod product;
pub mod regrid;
pub mod resample;
pub mod synoptic;

// Re-export commonly used types at crate root
pub use accumulate::{Accumulator, ArithmeticMean, PlainUncertainty, WeightedUncertainty};
pub use aggregation::{
    aggregate_cell_grid, aggregate_source, source_rectangle, Aggregation, MultiMonthAggregation,
    RegionalAggregation, SameMonthAggregation,
};
pub use averaging::{AveragingTimeStep, RegionalAverager, SourceProvider, StaticSourceProvider};
pub use cell::{AggregationCell, Cell5, Cell90, CellResults, CoarseCell, Results, RESULT_NAMES};
pub use cell_grid::CellGrid;
pub use config::AggregationConfig;
pub use context::{AggregationContext, CellContext, SeaCoverageGrids};
pub use coverage::{CoverageLut, CoverageUncertaintyProvider, GridCoverageLut, ScalarCoverageLut};
pub use error::{AggregationError, Result};
pub use product::{ProductType, Quantity, SstDepth, Variable, VariableReader};
pub use regrid::{RegriddedTimeStep, Regridder};
pub use resample::{downscale, interpolate, resample};
pub use synoptic::SynopticUncertaintyProvider;
