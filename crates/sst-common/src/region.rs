//! Boolean region masks over the region grid and named region lists.
//!
//! Masks are immutable once built and are shared as `Arc<RegionMask>`.
//! Every mask carries the [`GridDef`] it was rasterized on; there is no
//! process-wide mask resolution.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bbox::{BboxParseError, BoundingBox};
use crate::error::{SstError, SstResult};
use crate::grid::{Grid, GridDef};

/// Name given to the union of several masks.
pub const COMBINED_MASK_NAME: &str = "Combined";

/// Spatial coverage classification of a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Coverage {
    Empty,
    Globe,
    NHemisphere,
    SHemisphere,
    Other,
}

impl Coverage {
    /// Globe and hemisphere regions are also reduced to the 90° level.
    pub fn must_aggregate_to_90(&self) -> bool {
        matches!(
            self,
            Coverage::Globe | Coverage::NHemisphere | Coverage::SHemisphere
        )
    }

    /// Classify from set-cell counts.
    ///
    /// Rows `j < height / 2` count as northern. Hemisphere classes compare
    /// against `width * height / 2` using integer division, so with an odd
    /// number of rows no mask is ever classified as a hemisphere.
    pub fn classify(n_global: usize, n_north: usize, n_south: usize, n_total: usize) -> Self {
        if n_global == 0 {
            Coverage::Empty
        } else if n_global == n_total {
            Coverage::Globe
        } else if n_north == n_global && n_north == n_total / 2 {
            Coverage::NHemisphere
        } else if n_south == n_global && n_south == n_total / 2 {
            Coverage::SHemisphere
        } else {
            Coverage::Other
        }
    }
}

/// Boolean mask of grid cells belonging to a named region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionMask {
    name: String,
    grid_def: GridDef,
    samples: Vec<bool>,
    coverage: Coverage,
}

impl RegionMask {
    fn from_samples(name: impl Into<String>, grid_def: GridDef, samples: Vec<bool>) -> Self {
        let half = grid_def.height / 2;
        let mut n_global = 0;
        let mut n_north = 0;
        let mut n_south = 0;
        for (index, &set) in samples.iter().enumerate() {
            if set {
                n_global += 1;
                if index / grid_def.width < half {
                    n_north += 1;
                } else {
                    n_south += 1;
                }
            }
        }
        let coverage = Coverage::classify(n_global, n_north, n_south, grid_def.len());
        Self {
            name: name.into(),
            grid_def,
            samples,
            coverage,
        }
    }

    /// Rasterize a W,N,E,S bounding box.
    ///
    /// `west > east` selects the two column ranges either side of the
    /// antimeridian.
    pub fn from_bbox(
        name: impl Into<String>,
        west: f64,
        north: f64,
        east: f64,
        south: f64,
        grid_def: GridDef,
    ) -> SstResult<Self> {
        let rect = grid_def.grid_rectangle(west, south, east, north)?;
        let mut samples = vec![false; grid_def.len()];
        for (x, y) in rect.pixels(grid_def.width) {
            samples[grid_def.flat_index(x, y)] = true;
        }
        Ok(Self::from_samples(name, grid_def, samples))
    }

    /// Rasterize a bounding box value.
    pub fn from_bounding_box(
        name: impl Into<String>,
        bbox: &BoundingBox,
        grid_def: GridDef,
    ) -> SstResult<Self> {
        Self::from_bbox(name, bbox.west, bbox.north, bbox.east, bbox.south, grid_def)
    }

    /// Parse an ASCII mask of `'0'`/`'1'` characters, one line per row.
    ///
    /// Lines are trimmed; blank lines and lines starting with `#` are
    /// skipped. Line numbers in errors count every input line from 1,
    /// columns count characters from 1 (0 when the whole line is at fault).
    pub fn from_text(name: impl Into<String>, data: &str, grid_def: GridDef) -> SstResult<Self> {
        let name = name.into();
        let width = grid_def.width;
        let mut samples = vec![false; grid_def.len()];
        let mut line_no = 0;
        let mut y = 0;

        for raw in data.lines() {
            line_no += 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if y == grid_def.height {
                return Err(SstError::mask_format(
                    &name,
                    line_no,
                    0,
                    format!("exactly {} lines are required", grid_def.height),
                ));
            }
            let chars: Vec<char> = line.chars().collect();
            if chars.len() != width {
                return Err(SstError::mask_format(
                    &name,
                    line_no,
                    chars.len().min(width) + 1,
                    format!(
                        "line must contain exactly {} characters, but found {}",
                        width,
                        chars.len()
                    ),
                ));
            }
            for (x, c) in chars.into_iter().enumerate() {
                match c {
                    '0' => {}
                    '1' => samples[grid_def.flat_index(x, y)] = true,
                    _ => {
                        return Err(SstError::mask_format(
                            &name,
                            line_no,
                            x + 1,
                            format!("only use characters '0' and '1', found '{}'", c),
                        ))
                    }
                }
            }
            y += 1;
        }

        if y != grid_def.height {
            return Err(SstError::mask_format(
                &name,
                line_no,
                0,
                format!(
                    "exactly {} lines are required, but found {}",
                    grid_def.height, y
                ),
            ));
        }

        Ok(Self::from_samples(name, grid_def, samples))
    }

    /// Read an ASCII mask file.
    pub fn from_file(name: impl Into<String>, path: &Path, grid_def: GridDef) -> SstResult<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_text(name, &data, grid_def)
    }

    /// Union of all masks.
    ///
    /// Returns `None` for an empty list and the very same mask for a
    /// single-element list.
    pub fn combine(masks: &[Arc<RegionMask>]) -> SstResult<Option<Arc<RegionMask>>> {
        match masks {
            [] => Ok(None),
            [only] => Ok(Some(Arc::clone(only))),
            [first, rest @ ..] => {
                let grid_def = first.grid_def;
                let mut samples = first.samples.clone();
                for mask in rest {
                    if !mask.grid_def.same_size(&grid_def) {
                        return Err(SstError::GridMismatch(format!(
                            "mask '{}' is {}x{}, expected {}x{}",
                            mask.name,
                            mask.grid_def.width,
                            mask.grid_def.height,
                            grid_def.width,
                            grid_def.height
                        )));
                    }
                    for (dst, &src) in samples.iter_mut().zip(&mask.samples) {
                        *dst |= src;
                    }
                }
                Ok(Some(Arc::new(Self::from_samples(
                    COMBINED_MASK_NAME,
                    grid_def,
                    samples,
                ))))
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coverage(&self) -> Coverage {
        self.coverage
    }

    pub fn width(&self) -> usize {
        self.grid_def.width
    }

    pub fn height(&self) -> usize {
        self.grid_def.height
    }

    pub fn is_set(&self, x: usize, y: usize) -> bool {
        self.samples[self.grid_def.flat_index(x, y)]
    }

    /// Number of cells in the mask.
    pub fn count(&self) -> usize {
        self.samples.iter().filter(|&&s| s).count()
    }

    /// All set cells, row by row.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let width = self.grid_def.width;
        self.samples
            .iter()
            .enumerate()
            .filter(|(_, set)| **set)
            .map(move |(index, _)| (index % width, index / width))
    }
}

impl Grid for RegionMask {
    fn grid_def(&self) -> &GridDef {
        &self.grid_def
    }

    fn sample_double(&self, x: usize, y: usize) -> f64 {
        if self.is_set(x, y) {
            1.0
        } else {
            0.0
        }
    }

    fn sample_int(&self, x: usize, y: usize) -> i32 {
        i32::from(self.is_set(x, y))
    }

    fn sample_boolean(&self, x: usize, y: usize) -> bool {
        self.is_set(x, y)
    }
}

/// Ordered list of named region masks.
#[derive(Debug, Clone, Default)]
pub struct RegionMaskList {
    masks: Vec<Arc<RegionMask>>,
}

impl RegionMaskList {
    pub fn new(masks: Vec<Arc<RegionMask>>) -> Self {
        Self { masks }
    }

    /// Parse `;`-separated entries of the form `name=W,N,E,S` or
    /// `name=<mask file>`.
    pub fn parse(value: &str, grid_def: GridDef) -> SstResult<Self> {
        let mut masks = Vec::new();

        for raw in value.split(';') {
            let entry = raw.trim();
            if entry.is_empty() {
                continue;
            }
            let entry_no = masks.len() + 1;
            let (name, mask) = entry
                .split_once('=')
                .ok_or_else(|| SstError::region_list(entry_no, "is missing the '=' character"))?;
            let name = name.trim();
            let mask = mask.trim();
            if name.is_empty() {
                return Err(SstError::region_list(entry_no, "name is empty"));
            }
            if mask.is_empty() {
                return Err(SstError::region_list(entry_no, "mask is empty"));
            }

            let region = match mask.split(',').count() {
                4 => Self::from_wnes(entry_no, name, mask, grid_def)?,
                1 => Self::from_mask_file(entry_no, name, mask, grid_def)?,
                n => {
                    return Err(SstError::region_list(
                        entry_no,
                        format!("expected W,N,E,S or a mask file, found {} values", n),
                    ))
                }
            };
            debug!(region = %region.name(), coverage = ?region.coverage(), "Parsed region");
            masks.push(Arc::new(region));
        }

        Ok(Self { masks })
    }

    fn from_wnes(entry_no: usize, name: &str, wnes: &str, grid_def: GridDef) -> SstResult<RegionMask> {
        let bbox = BoundingBox::from_wnes_str(wnes).map_err(|e| match e {
            BboxParseError::NorthBelowSouth { .. } => {
                SstError::region_list(entry_no, "N must not be less than S")
            }
            _ => SstError::region_list(entry_no, "failed to parse W,N,E,S coordinates"),
        })?;
        RegionMask::from_bounding_box(name, &bbox, grid_def)
    }

    fn from_mask_file(
        entry_no: usize,
        name: &str,
        file: &str,
        grid_def: GridDef,
    ) -> SstResult<RegionMask> {
        let path = Path::new(file);
        if !path.exists() {
            return Err(SstError::region_list(
                entry_no,
                format!("mask file not found: {}", path.display()),
            ));
        }
        RegionMask::from_file(name, path, grid_def)
    }

    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<RegionMask>> {
        self.masks.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<RegionMask>> {
        self.masks.iter()
    }

    pub fn as_slice(&self) -> &[Arc<RegionMask>] {
        &self.masks
    }

    /// Union of all masks in the list.
    pub fn combined(&self) -> SstResult<Option<Arc<RegionMask>>> {
        RegionMask::combine(&self.masks)
    }
}

impl<'a> IntoIterator for &'a RegionMaskList {
    type Item = &'a Arc<RegionMask>;
    type IntoIter = std::slice::Iter<'a, Arc<RegionMask>>;

    fn into_iter(self) -> Self::IntoIter {
        self.masks.iter()
    }
}
