/*
 * Spatial Grid Module
 *
 * This module defines the SpatialGrid struct for neighbour candidate lookups.
 * It divides the world rectangle into square cells no smaller than the
 * largest neighbour radius, so every agent within that radius of a point
 * lives in the point's cell or one of the eight around it.
 *
 * Positions outside the world (an agent mid-bounce) are clamped into the
 * edge cells, which keeps them findable.
 */

use log::debug;
use nannou::prelude::*;

use crate::config::Bounds;

pub struct SpatialGrid {
    pub cell_size: f32,
    pub cols: usize,
    pub rows: usize,
    cells: Vec<Vec<usize>>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32, bounds: Bounds) -> Self {
        let cell_size = cell_size.max(1.0);
        let cols = ((bounds.width / cell_size).ceil() as usize).max(1);
        let rows = ((bounds.height / cell_size).ceil() as usize).max(1);
        debug!("spatial grid {}x{} cells of {:.1}", cols, rows, cell_size);

        Self {
            cell_size,
            cols,
            rows,
            cells: vec![Vec::new(); cols * rows],
        }
    }

    // Convert world coordinates to (column, row), clamped into the grid
    #[inline]
    fn cell_coords(&self, pos: Point2) -> (usize, usize) {
        let col = (pos.x / self.cell_size).floor().clamp(0.0, self.cols as f32 - 1.0) as usize;
        let row = (pos.y / self.cell_size).floor().clamp(0.0, self.rows as f32 - 1.0) as usize;
        (col, row)
    }

    // Clear the grid
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
    }

    // Insert an agent index into the grid
    #[inline]
    pub fn insert(&mut self, index: usize, position: Point2) {
        let (col, row) = self.cell_coords(position);
        self.cells[row * self.cols + col].push(index);
    }

    pub fn rebuild<I>(&mut self, positions: I)
    where
        I: IntoIterator<Item = Point2>,
    {
        self.clear();
        for (index, position) in positions.into_iter().enumerate() {
            self.insert(index, position);
        }
    }

    // Indices in the cell containing the position and the cells adjacent to it
    pub fn nearby(&self, position: Point2) -> Vec<usize> {
        let (col, row) = self.cell_coords(position);
        let mut result = Vec::new();

        for check_row in row.saturating_sub(1)..=(row + 1).min(self.rows - 1) {
            let row_start = check_row * self.cols;
            for check_col in col.saturating_sub(1)..=(col + 1).min(self.cols - 1) {
                result.extend_from_slice(&self.cells[row_start + check_col]);
            }
        }

        result
    }
}
