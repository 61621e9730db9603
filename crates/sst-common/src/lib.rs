//! Common types shared across the SST aggregation crates.
//!
//! Grid geometry, region masks, output resolutions and time steps.

pub mod bbox;
pub mod error;
pub mod grid;
pub mod region;
pub mod resolution;
pub mod time;

pub use bbox::{BboxParseError, BoundingBox};
pub use error::{SstError, SstResult};
pub use grid::{grids, ArrayGrid, Grid, GridDef, GridRectangle, ScalarGrid, YFlip};
pub use region::{Coverage, RegionMask, RegionMaskList};
pub use resolution::{SpatialResolution, TemporalResolution};
pub use time::{time_steps, TimeStep};
