//! Global lat/lon grid geometry and read-only sample grids.
//!
//! All grids here are global, north-up and regular: column 0 starts at
//! `easting` (-180°) and row 0 starts at `northing` (90°).

use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::{SstError, SstResult};

/// Mean Earth radius used for cell diagonals, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

const RESOLUTION_EPS: f64 = 1e-6;

/// Offset keeping a box edge that lies on a grid line out of the next cell.
const EDGE_EPS: f64 = 1e-10;

/// Specification of a regular global lat/lon grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridDef {
    /// Number of columns
    pub width: usize,
    /// Number of rows
    pub height: usize,
    /// Column width in degrees
    pub resolution_x: f64,
    /// Row height in degrees
    pub resolution_y: f64,
    /// Longitude of the western edge of column 0
    pub easting: f64,
    /// Latitude of the northern edge of row 0
    pub northing: f64,
}

impl GridDef {
    /// Global grid of square cells with the given resolution in degrees.
    ///
    /// Fails unless the resolution tiles the globe exactly.
    pub fn global(resolution: f64) -> SstResult<Self> {
        if resolution.is_nan() || resolution <= 0.0 {
            return Err(SstError::invalid_argument(format!(
                "resolution must be > 0, got {}",
                resolution
            )));
        }
        let width = (360.0 / resolution).round();
        let height = (180.0 / resolution).round();
        if (width * resolution - 360.0).abs() > RESOLUTION_EPS
            || (height * resolution - 180.0).abs() > RESOLUTION_EPS
        {
            return Err(SstError::invalid_argument(format!(
                "resolution {} does not tile the globe",
                resolution
            )));
        }
        Ok(Self::global_with_size(width as usize, height as usize))
    }

    /// Global grid with the given number of columns and rows.
    pub fn global_with_size(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            resolution_x: 360.0 / width as f64,
            resolution_y: 180.0 / height as f64,
            easting: -180.0,
            northing: 90.0,
        }
    }

    /// Column width in degrees (grids here have square cells).
    pub fn resolution(&self) -> f64 {
        self.resolution_x
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Check if grid is empty.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Row-major index of (x, y).
    pub fn flat_index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// True if both definitions describe the same raster.
    pub fn same_size(&self, other: &GridDef) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Longitude of the western edge of (possibly fractional) column x.
    pub fn lon(&self, x: f64) -> f64 {
        self.easting + x * self.resolution_x
    }

    /// Latitude of the northern edge of (possibly fractional) row y.
    pub fn lat(&self, y: f64) -> f64 {
        self.northing - y * self.resolution_y
    }

    pub fn center_lon(&self, x: usize) -> f64 {
        self.lon(x as f64 + 0.5)
    }

    pub fn center_lat(&self, y: usize) -> f64 {
        self.lat(y as f64 + 0.5)
    }

    /// Map any column index onto [0, width).
    pub fn wrap_x(&self, x: i64) -> usize {
        x.rem_euclid(self.width as i64) as usize
    }

    /// Column containing the given longitude.
    ///
    /// Longitudes outside [-180, 180] are rejected. With `crop` the result
    /// is clamped to the grid, otherwise a column beyond it is an error.
    pub fn grid_x(&self, lon: f64, crop: bool) -> SstResult<usize> {
        if !(-180.0..=180.0).contains(&lon) {
            return Err(SstError::out_of_range(format!("lon = {}", lon)));
        }
        let x = ((lon - self.easting) / self.resolution_x).floor() as i64;
        self.crop_index(x, self.width, crop, "x")
    }

    /// Row containing the given latitude. See [`GridDef::grid_x`].
    pub fn grid_y(&self, lat: f64, crop: bool) -> SstResult<usize> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(SstError::out_of_range(format!("lat = {}", lat)));
        }
        let y = ((self.northing - lat) / self.resolution_y).floor() as i64;
        self.crop_index(y, self.height, crop, "y")
    }

    fn crop_index(&self, index: i64, size: usize, crop: bool, axis: &str) -> SstResult<usize> {
        if crop {
            return Ok(index.clamp(0, size as i64 - 1) as usize);
        }
        if index < 0 || index >= size as i64 {
            return Err(SstError::out_of_range(format!(
                "{} = {} not in [0, {})",
                axis, index, size
            )));
        }
        Ok(index as usize)
    }

    /// Pixel rectangle covering a lon/lat box.
    ///
    /// When `west > east` the box crosses the antimeridian and the
    /// returned rectangle wraps; iterate it with
    /// [`GridRectangle::x_ranges`]. `west == east` spans the full globe.
    pub fn grid_rectangle(
        &self,
        west: f64,
        south: f64,
        east: f64,
        north: f64,
    ) -> SstResult<GridRectangle> {
        if north < south {
            return Err(SstError::invalid_argument(format!(
                "north < south ({} < {})",
                north, south
            )));
        }
        let x1 = self.column(west)?;
        let width = if west == east {
            self.width
        } else {
            let x2 = self.column(east - EDGE_EPS)?;
            if west < east {
                (x2 - x1 + 1).max(0) as usize
            } else if x2 < x1 {
                (self.width as i64 - x1 + x2 + 1) as usize
            } else {
                self.width
            }
        };
        let y1 = self.grid_y(north, true)?;
        let y2 = self.grid_y((south + EDGE_EPS).min(90.0), true)?;
        let height = (y2 + 1).saturating_sub(y1);
        Ok(GridRectangle::new(self.wrap_x(x1), y1, width.min(self.width), height))
    }

    /// Unwrapped column index of a longitude, before wrapping onto the grid.
    fn column(&self, lon: f64) -> SstResult<i64> {
        if !(-180.0 - EDGE_EPS..=180.0).contains(&lon) {
            return Err(SstError::out_of_range(format!("lon = {}", lon)));
        }
        Ok(((lon - self.easting) / self.resolution_x).floor() as i64)
    }

    /// Pixel rectangle covering a bounding box.
    pub fn grid_rectangle_for_bbox(&self, bbox: &BoundingBox) -> SstResult<GridRectangle> {
        self.grid_rectangle(bbox.west, bbox.south, bbox.east, bbox.north)
    }

    /// Pixel rectangle of this grid covered by cell (x, y) of a coarser grid.
    pub fn grid_rectangle_for_cell(
        &self,
        x: usize,
        y: usize,
        coarser: &GridDef,
    ) -> SstResult<GridRectangle> {
        let (ratio_x, ratio_y) = self.scale_factor(coarser)?;
        Ok(GridRectangle::new(x * ratio_x, y * ratio_y, ratio_x, ratio_y))
    }

    /// Integer number of cells of this grid per cell of `coarser`.
    pub fn scale_factor(&self, coarser: &GridDef) -> SstResult<(usize, usize)> {
        let ratio = |fine: usize, coarse: usize| {
            if coarse == 0 || fine < coarse || fine % coarse != 0 {
                None
            } else {
                Some(fine / coarse)
            }
        };
        match (ratio(self.width, coarser.width), ratio(self.height, coarser.height)) {
            (Some(rx), Some(ry)) => Ok((rx, ry)),
            _ => Err(SstError::GridMismatch(format!(
                "{}x{} is not an integer refinement of {}x{}",
                self.width, self.height, coarser.width, coarser.height
            ))),
        }
    }

    /// Lon/lat bounds of cell (x, y).
    pub fn lon_lat_rectangle(&self, x: usize, y: usize) -> BoundingBox {
        BoundingBox::new(
            self.lon(x as f64),
            self.lat(y as f64 + 1.0),
            self.lon(x as f64 + 1.0),
            self.lat(y as f64),
        )
    }

    /// Great-circle length of the NW-SE diagonal of cell (x, y), in km.
    pub fn diagonal(&self, x: usize, y: usize) -> f64 {
        let lon1 = self.lon(x as f64);
        let lat1 = self.lat(y as f64);
        great_circle_km(lon1, lat1, lon1 + self.resolution_x, lat1 - self.resolution_y)
    }
}

/// Haversine distance between two lon/lat points in km.
pub fn great_circle_km(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = phi2 - phi1;
    let d_lambda = (lon2 - lon1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Integer pixel rectangle. `x + width` may exceed the grid width, in
/// which case the rectangle wraps around the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridRectangle {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl GridRectangle {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn wraps(&self, grid_width: usize) -> bool {
        self.x + self.width > grid_width
    }

    /// Column ranges to visit: `[x, grid_width) ∪ [0, max_x]` when wrapping.
    pub fn x_ranges(&self, grid_width: usize) -> Vec<Range<usize>> {
        if self.width == 0 {
            return Vec::new();
        }
        if self.wraps(grid_width) {
            let rest = (self.x + self.width - grid_width).min(self.x);
            vec![self.x..grid_width, 0..rest]
        } else {
            vec![self.x..self.x + self.width]
        }
    }

    pub fn y_range(&self) -> Range<usize> {
        self.y..self.y + self.height
    }

    /// All (x, y) pixels, row by row.
    pub fn pixels(&self, grid_width: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        let ranges = self.x_ranges(grid_width);
        self.y_range().flat_map(move |y| {
            ranges
                .clone()
                .into_iter()
                .flat_map(move |r| r.map(move |x| (x, y)))
        })
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

/// Read-only 2-D sample source.
pub trait Grid: Send + Sync {
    fn grid_def(&self) -> &GridDef;

    fn sample_double(&self, x: usize, y: usize) -> f64;

    /// Integer view; NaN maps to 0.
    fn sample_int(&self, x: usize, y: usize) -> i32 {
        let value = self.sample_double(x, y);
        if value.is_nan() {
            0
        } else {
            value as i32
        }
    }

    fn sample_boolean(&self, x: usize, y: usize) -> bool {
        self.sample_int(x, y) != 0
    }
}

impl<G: Grid + ?Sized> Grid for Arc<G> {
    fn grid_def(&self) -> &GridDef {
        (**self).grid_def()
    }

    fn sample_double(&self, x: usize, y: usize) -> f64 {
        (**self).sample_double(x, y)
    }

    fn sample_int(&self, x: usize, y: usize) -> i32 {
        (**self).sample_int(x, y)
    }

    fn sample_boolean(&self, x: usize, y: usize) -> bool {
        (**self).sample_boolean(x, y)
    }
}

/// Grid backed by an owned row-major buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayGrid {
    grid_def: GridDef,
    data: Vec<f64>,
}

impl ArrayGrid {
    pub fn new(grid_def: GridDef, data: Vec<f64>) -> SstResult<Self> {
        if data.len() != grid_def.len() {
            return Err(SstError::GridMismatch(format!(
                "expected {} samples for {}x{}, got {}",
                grid_def.len(),
                grid_def.width,
                grid_def.height,
                data.len()
            )));
        }
        Ok(Self { grid_def, data })
    }

    /// Grid with every sample set to `value`.
    pub fn filled(grid_def: GridDef, value: f64) -> Self {
        Self {
            data: vec![value; grid_def.len()],
            grid_def,
        }
    }

    /// Copy any grid into an owned buffer.
    pub fn from_grid(grid: &dyn Grid) -> Self {
        let def = *grid.grid_def();
        let mut data = Vec::with_capacity(def.len());
        for y in 0..def.height {
            for x in 0..def.width {
                data.push(grid.sample_double(x, y));
            }
        }
        Self { grid_def: def, data }
    }

    pub fn set_sample(&mut self, x: usize, y: usize, value: f64) {
        let index = self.grid_def.flat_index(x, y);
        self.data[index] = value;
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }
}

impl Grid for ArrayGrid {
    fn grid_def(&self) -> &GridDef {
        &self.grid_def
    }

    fn sample_double(&self, x: usize, y: usize) -> f64 {
        self.data[self.grid_def.flat_index(x, y)]
    }
}

/// Grid returning the same value everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarGrid {
    grid_def: GridDef,
    value: f64,
}

impl ScalarGrid {
    pub fn new(grid_def: GridDef, value: f64) -> Self {
        Self { grid_def, value }
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

impl Grid for ScalarGrid {
    fn grid_def(&self) -> &GridDef {
        &self.grid_def
    }

    fn sample_double(&self, _x: usize, _y: usize) -> f64 {
        self.value
    }
}

/// Presents a south-up grid in north-up row order.
#[derive(Debug, Clone)]
pub struct YFlip<G> {
    inner: G,
}

impl<G: Grid> YFlip<G> {
    pub fn new(inner: G) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> G {
        self.inner
    }
}

impl<G: Grid> Grid for YFlip<G> {
    fn grid_def(&self) -> &GridDef {
        self.inner.grid_def()
    }

    fn sample_double(&self, x: usize, y: usize) -> f64 {
        let height = self.inner.grid_def().height;
        self.inner.sample_double(x, height - 1 - y)
    }

    fn sample_int(&self, x: usize, y: usize) -> i32 {
        let height = self.inner.grid_def().height;
        self.inner.sample_int(x, height - 1 - y)
    }
}

/// Common grid definitions.
pub mod grids {
    use super::*;

    /// 0.05° global grid of the CCI L3/L4 products
    pub fn cci_0p05() -> GridDef {
        GridDef::global_with_size(7200, 3600)
    }

    /// 0.1° global grid of the ARC L3U products
    pub fn arc_0p1() -> GridDef {
        GridDef::global_with_size(3600, 1800)
    }

    /// 5° grid of intermediate cells and default region masks
    pub fn cell_5() -> GridDef {
        GridDef::global_with_size(72, 36)
    }

    /// 90° grid of hemispheric cells
    pub fn cell_90() -> GridDef {
        GridDef::global_with_size(4, 2)
    }
}
