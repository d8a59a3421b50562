use ndarray::{Array2, ArrayView1, Axis};

use super::grid::Coord;

/// One value per grid cell, stored row-major as an `(height, width)` array.
///
/// Cells are always addressed by `(x, y)` through the accessors below; the
/// underlying `[[y, x]]` layout is an implementation detail. Cloning a
/// snapshot is a deep copy, so history entries never alias each other.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueSnapshot {
    values: Array2<f64>,
}

impl ValueSnapshot {
    /// Creates a snapshot with every cell set to 0.0.
    pub fn zeros(width: usize, height: usize) -> Self {
        Self {
            values: Array2::zeros((height, width)),
        }
    }

    pub fn width(&self) -> usize {
        self.values.ncols()
    }

    pub fn height(&self) -> usize {
        self.values.nrows()
    }

    /// Value of an in-bounds cell.
    ///
    /// # Panics
    ///
    /// Panics if `coord` lies outside the snapshot.
    pub fn get(&self, coord: Coord) -> f64 {
        self.values[[coord.y, coord.x]]
    }

    /// Overwrites the value of an in-bounds cell.
    ///
    /// # Panics
    ///
    /// Panics if `coord` lies outside the snapshot.
    pub fn set(&mut self, coord: Coord, value: f64) {
        self.values[[coord.y, coord.x]] = value;
    }

    /// Value at a possibly off-grid position, `None` when outside.
    pub fn value_at(&self, x: isize, y: isize) -> Option<f64> {
        if x < 0 || y < 0 {
            return None;
        }
        self.values.get([y as usize, x as usize]).copied()
    }

    /// Largest absolute per-cell difference between two snapshots of the
    /// same shape.
    pub fn max_abs_diff(&self, other: &ValueSnapshot) -> f64 {
        assert_eq!(
            self.values.dim(),
            other.values.dim(),
            "snapshots must have the same shape"
        );
        self.values
            .iter()
            .zip(other.values.iter())
            .fold(0.0_f64, |acc, (a, b)| acc.max((a - b).abs()))
    }

    /// Rows from the top of the grid (highest `y`) down to `y = 0`.
    pub fn rows_top_down(&self) -> impl Iterator<Item = (usize, ArrayView1<'_, f64>)> {
        self.values
            .axis_iter(Axis(0))
            .enumerate()
            .rev()
    }

    /// Read-only access to the raw `(height, width)` array.
    pub fn as_array(&self) -> &Array2<f64> {
        &self.values
    }

    /// Nested `values[y][x]` vectors, the shape the external formatter uses.
    pub fn to_nested(&self) -> Vec<Vec<f64>> {
        self.values
            .axis_iter(Axis(0))
            .map(|row| row.to_vec())
            .collect()
    }
}
