//! Test data generators for creating synthetic SST-like grids.
//!
//! These generators create predictable, verifiable patterns on global
//! grids that can be used across the test suite.

use sst_common::{ArrayGrid, GridDef};

/// Freezing point of sea water in Kelvin.
pub const SEA_WATER_FREEZING_K: f64 = 271.35;

/// Creates a grid with every sample set to `value`.
///
/// # Example
///
/// ```
/// use sst_common::{grids, Grid};
/// use test_utils::scalar_grid;
///
/// let grid = scalar_grid(grids::cell_5(), 290.0);
/// assert_eq!(grid.sample_double(10, 10), 290.0);
/// ```
pub fn scalar_grid(grid_def: GridDef, value: f64) -> ArrayGrid {
    ArrayGrid::filled(grid_def, value)
}

/// Creates a grid with predictable values: `base + x * step_x + y * step_y`.
///
/// This makes it easy to verify which pixels went into an aggregate.
///
/// # Example
///
/// ```
/// use sst_common::{GridDef, Grid};
/// use test_utils::gradient_grid;
///
/// let grid = gradient_grid(GridDef::global_with_size(4, 2), 10.0, 1.0, 100.0);
/// assert_eq!(grid.sample_double(0, 0), 10.0);
/// assert_eq!(grid.sample_double(3, 1), 113.0);
/// ```
pub fn gradient_grid(grid_def: GridDef, base: f64, step_x: f64, step_y: f64) -> ArrayGrid {
    let mut grid = ArrayGrid::filled(grid_def, base);
    for y in 0..grid_def.height {
        for x in 0..grid_def.width {
            grid.set_sample(x, y, base + x as f64 * step_x + y as f64 * step_y);
        }
    }
    grid
}

/// Creates a constant grid with NaN wherever `(x + y) % every == 0`.
///
/// With `every == 2` half of the samples are missing in a checkerboard.
pub fn nan_holed_grid(grid_def: GridDef, value: f64, every: usize) -> ArrayGrid {
    let every = every.max(1);
    let mut grid = ArrayGrid::filled(grid_def, value);
    for y in 0..grid_def.height {
        for x in 0..grid_def.width {
            if (x + y) % every == 0 {
                grid.set_sample(x, y, f64::NAN);
            }
        }
    }
    grid
}

/// Creates a latitude-dependent SST field in Kelvin.
///
/// Values range from the freezing point at the poles to about 302 K at
/// the equator.
pub fn sst_kelvin_grid(grid_def: GridDef) -> ArrayGrid {
    let mut grid = ArrayGrid::filled(grid_def, SEA_WATER_FREEZING_K);
    for y in 0..grid_def.height {
        let lat = grid_def.center_lat(y).to_radians();
        let value = SEA_WATER_FREEZING_K + 30.0 * lat.cos().powi(2);
        for x in 0..grid_def.width {
            grid.set_sample(x, y, value);
        }
    }
    grid
}

/// Creates a grid that is `value` inside the half-open pixel box and
/// `outside` elsewhere.
pub fn boxed_grid(
    grid_def: GridDef,
    x_range: std::ops::Range<usize>,
    y_range: std::ops::Range<usize>,
    value: f64,
    outside: f64,
) -> ArrayGrid {
    let mut grid = ArrayGrid::filled(grid_def, outside);
    for y in y_range {
        for x in x_range.clone() {
            grid.set_sample(x, y, value);
        }
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use sst_common::{grids, Grid};

    #[test]
    fn test_gradient_grid() {
        let grid = gradient_grid(grids::cell_5(), 0.0, 1.0, 1000.0);
        assert_eq!(grid.sample_double(5, 7), 7005.0);
    }

    #[test]
    fn test_nan_holed_grid_half_missing() {
        let grid = nan_holed_grid(grids::cell_5(), 1.0, 2);
        let missing = grid.data().iter().filter(|v| v.is_nan()).count();
        assert_eq!(missing, 72 * 36 / 2);
    }

    #[test]
    fn test_sst_kelvin_grid_range() {
        let grid = sst_kelvin_grid(grids::cell_5());
        let equator = grid.sample_double(0, 18);
        let pole = grid.sample_double(0, 0);
        assert!(equator > 300.0);
        assert!(pole < 272.0);
        assert!(pole >= SEA_WATER_FREEZING_K);
    }

    #[test]
    fn test_boxed_grid() {
        let grid = boxed_grid(grids::cell_5(), 2..4, 1..2, 1.0, 0.0);
        assert_eq!(grid.data().iter().filter(|&&v| v == 1.0).count(), 2);
    }
}
