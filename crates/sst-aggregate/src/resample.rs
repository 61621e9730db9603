//! Resampling of lookup-table grids between global resolutions.
//!
//! LUTs ship at their own native resolution and are brought onto the
//! cell grids before use: finer grids are block-averaged down, coarser
//! grids are bilinearly interpolated up.

use sst_common::{ArrayGrid, Grid, GridDef};

use crate::error::{AggregationError, Result};

/// Block mean onto a coarser grid whose size divides the source size.
///
/// NaN samples are skipped; a block without any valid sample is NaN.
pub fn downscale(grid: &dyn Grid, target_def: GridDef) -> Result<ArrayGrid> {
    let source_def = *grid.grid_def();
    let (scale_x, scale_y) = source_def.scale_factor(&target_def)?;

    let mut target = ArrayGrid::filled(target_def, f64::NAN);
    for target_y in 0..target_def.height {
        for target_x in 0..target_def.width {
            let mut sum = 0.0;
            let mut count = 0usize;

            for dy in 0..scale_y {
                let y = target_y * scale_y + dy;
                for dx in 0..scale_x {
                    let value = grid.sample_double(target_x * scale_x + dx, y);
                    if !value.is_nan() {
                        sum += value;
                        count += 1;
                    }
                }
            }

            if count > 0 {
                target.set_sample(target_x, target_y, sum / count as f64);
            }
        }
    }
    Ok(target)
}

/// Bilinear interpolation onto a finer grid.
///
/// Sample positions are cell centres. Longitude wraps around the
/// antimeridian, latitude is clamped at the poles. NaN corners drop out
/// and the remaining weights are renormalized.
pub fn interpolate(grid: &dyn Grid, target_def: GridDef) -> Result<ArrayGrid> {
    let source_def = *grid.grid_def();
    if source_def.is_empty() || target_def.is_empty() {
        return Err(AggregationError::invalid_argument(
            "cannot interpolate an empty grid",
        ));
    }

    let mut target = ArrayGrid::filled(target_def, f64::NAN);
    for y in 0..target_def.height {
        let sy = (source_def.northing - target_def.center_lat(y)) / source_def.resolution_y - 0.5;
        let sy = sy.clamp(0.0, (source_def.height - 1) as f64);
        let y0 = sy.floor() as usize;
        let y1 = (y0 + 1).min(source_def.height - 1);
        let fy = sy - y0 as f64;

        for x in 0..target_def.width {
            let sx = (target_def.center_lon(x) - source_def.easting) / source_def.resolution_x - 0.5;
            let x0f = sx.floor();
            let fx = sx - x0f;
            let x0 = source_def.wrap_x(x0f as i64);
            let x1 = source_def.wrap_x(x0f as i64 + 1);

            let corners = [
                (grid.sample_double(x0, y0), (1.0 - fx) * (1.0 - fy)),
                (grid.sample_double(x1, y0), fx * (1.0 - fy)),
                (grid.sample_double(x0, y1), (1.0 - fx) * fy),
                (grid.sample_double(x1, y1), fx * fy),
            ];

            let mut sum = 0.0;
            let mut weight_sum = 0.0;
            for (value, weight) in corners {
                if !value.is_nan() && weight > 0.0 {
                    sum += value * weight;
                    weight_sum += weight;
                }
            }
            if weight_sum > 0.0 {
                target.set_sample(x, y, sum / weight_sum);
            }
        }
    }
    Ok(target)
}

/// Bring a grid onto `target_def`.
///
/// Integer refinements of the target are block-averaged, everything else
/// (coarser grids, 2° onto 5°) is interpolated.
pub fn resample(grid: &dyn Grid, target_def: GridDef) -> Result<ArrayGrid> {
    let source_def = grid.grid_def();
    if source_def.same_size(&target_def) {
        return Ok(ArrayGrid::from_grid(grid));
    }
    if source_def.scale_factor(&target_def).is_ok() {
        downscale(grid, target_def)
    } else {
        interpolate(grid, target_def)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sst_common::grids;

    #[test]
    fn test_downscale_block_mean() {
        let source_def = GridDef::global_with_size(4, 2);
        let source = ArrayGrid::new(source_def, vec![1.0, 3.0, 5.0, 7.0, 1.0, 3.0, 5.0, 7.0])
            .unwrap();
        let target = downscale(&source, GridDef::global_with_size(2, 1)).unwrap();
        assert_eq!(target.data(), &[2.0, 6.0]);
    }

    #[test]
    fn test_downscale_skips_nan() {
        let source_def = GridDef::global_with_size(2, 2);
        let source = ArrayGrid::new(source_def, vec![f64::NAN, 2.0, f64::NAN, 4.0]).unwrap();
        let target = downscale(&source, GridDef::global_with_size(1, 1)).unwrap();
        assert_eq!(target.data(), &[3.0]);

        let empty = ArrayGrid::filled(source_def, f64::NAN);
        let target = downscale(&empty, GridDef::global_with_size(1, 1)).unwrap();
        assert!(target.data()[0].is_nan());
    }

    #[test]
    fn test_downscale_rejects_non_integer_ratio() {
        let source = ArrayGrid::filled(GridDef::global_with_size(5, 5), 1.0);
        assert!(downscale(&source, GridDef::global_with_size(2, 2)).is_err());
    }

    #[test]
    fn test_interpolate_constant_stays_constant() {
        let source = ArrayGrid::filled(GridDef::global_with_size(36, 18), 0.7);
        let target = interpolate(&source, grids::cell_5()).unwrap();
        assert!(target.data().iter().all(|v| (v - 0.7).abs() < 1e-12));
    }

    #[test]
    fn test_interpolate_wraps_longitude() {
        // West half 0, east half 1. The outermost target columns both
        // blend the two source columns across the antimeridian.
        let source = ArrayGrid::new(GridDef::global_with_size(2, 1), vec![0.0, 1.0]).unwrap();
        let target = interpolate(&source, GridDef::global_with_size(8, 1)).unwrap();
        let first = target.data()[0];
        assert!(first > 0.0 && first < 1.0);
        assert!((first - 0.375).abs() < 1e-12);
        assert!((target.data()[7] - 0.625).abs() < 1e-12);
    }

    #[test]
    fn test_resample_non_integer_ratio_interpolates() {
        let source = ArrayGrid::filled(GridDef::global(2.0).unwrap(), 4.0);
        let target = resample(&source, grids::cell_5()).unwrap();
        assert_eq!(target.grid_def().width, 72);
        assert!(target.data().iter().all(|v| (v - 4.0).abs() < 1e-12));
    }

    #[test]
    fn test_resample_identity() {
        let source = ArrayGrid::filled(grids::cell_5(), 2.0);
        let target = resample(&source, grids::cell_5()).unwrap();
        assert_eq!(target, source);
    }
}
