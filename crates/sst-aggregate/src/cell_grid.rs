//! Sparse grids of aggregation cells.

use std::collections::HashMap;

use sst_common::{ArrayGrid, GridDef, RegionMask};

use crate::cell::{AggregationCell, CellResults, RESULT_COUNT};

/// Cells of one grid, keyed by `(x, y)`. Only touched cells exist.
#[derive(Debug, Clone)]
pub struct CellGrid<C> {
    grid_def: GridDef,
    cells: HashMap<(usize, usize), C>,
}

impl<C: AggregationCell> CellGrid<C> {
    pub fn new(grid_def: GridDef) -> Self {
        Self {
            grid_def,
            cells: HashMap::new(),
        }
    }

    pub fn grid_def(&self) -> &GridDef {
        &self.grid_def
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&C> {
        self.cells.get(&(x, y))
    }

    /// The cell at (x, y), created by `factory` on first access.
    pub fn get_or_create<F>(&mut self, x: usize, y: usize, factory: F) -> &mut C
    where
        F: FnOnce(usize, usize) -> C,
    {
        self.cells.entry((x, y)).or_insert_with(|| factory(x, y))
    }

    pub fn insert(&mut self, cell: C) {
        self.cells.insert((cell.x(), cell.y()), cell);
    }

    /// Number of materialized cells, empty ones included.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> impl Iterator<Item = &C> {
        self.cells.values()
    }

    pub(crate) fn cells_mut(&mut self) -> &mut HashMap<(usize, usize), C> {
        &mut self.cells
    }

    /// Cells with at least one valid contribution.
    pub fn non_empty_cells(&self) -> impl Iterator<Item = &C> {
        self.cells.values().filter(|cell| !cell.is_empty())
    }

    /// Non-empty cells inside `mask`, which must share this grid.
    pub fn cells_in_mask<'a>(&'a self, mask: &'a RegionMask) -> impl Iterator<Item = &'a C> + 'a {
        self.non_empty_cells()
            .filter(move |cell| mask.is_set(cell.x(), cell.y()))
    }

    /// Drop cells without valid contributions.
    pub fn retain_non_empty(&mut self) {
        self.cells.retain(|_, cell| !cell.is_empty());
    }

    /// Results of all non-empty cells in row-major order.
    pub fn results(&self) -> Vec<CellResults> {
        let mut results: Vec<CellResults> = self.non_empty_cells().map(CellResults::of).collect();
        results.sort_by_key(|r| (r.y, r.x));
        results
    }

    /// One NaN-filled grid per result slot with the non-empty cells written in.
    pub fn result_grids(&self) -> Vec<ArrayGrid> {
        let mut grids = vec![ArrayGrid::filled(self.grid_def, f64::NAN); RESULT_COUNT];
        for cell in self.non_empty_cells() {
            for (grid, value) in grids.iter_mut().zip(cell.results()) {
                grid.set_sample(cell.x(), cell.y(), value);
            }
        }
        grids
    }
}
