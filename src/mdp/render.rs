use std::fmt;

use super::engine::ValueIterationResult;
use super::grid::{Coord, GridWorld};
use super::snapshot::ValueSnapshot;

pub const DEFAULT_PRECISION: usize = 4;

/// Text rendering of one snapshot, top row (highest `y`) first.
/// Walls print as `w`.
pub struct SnapshotView<'a> {
    grid: &'a GridWorld,
    snapshot: &'a ValueSnapshot,
    precision: usize,
}

impl<'a> SnapshotView<'a> {
    pub fn new(grid: &'a GridWorld, snapshot: &'a ValueSnapshot) -> Self {
        Self {
            grid,
            snapshot,
            precision: DEFAULT_PRECISION,
        }
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    fn cell_text(&self, coord: Coord, value: f64) -> String {
        if self.grid.is_wall(coord) {
            "w".to_string()
        } else {
            format!("{:.*}", self.precision, value)
        }
    }
}

impl fmt::Display for SnapshotView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows: Vec<Vec<String>> = self
            .snapshot
            .rows_top_down()
            .map(|(y, row)| {
                row.iter()
                    .enumerate()
                    .map(|(x, &value)| self.cell_text(Coord::new(x, y), value))
                    .collect()
            })
            .collect();
        let width = rows
            .iter()
            .flatten()
            .map(|cell| cell.len())
            .max()
            .unwrap_or(0);

        for row in rows {
            let line: Vec<String> = row
                .iter()
                .map(|cell| format!("{:>width$}", cell, width = width))
                .collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

/// Text rendering of a whole run: every retained snapshot followed by a `-`
/// line, then `(width, height), states: N`.
pub struct HistoryView<'a> {
    grid: &'a GridWorld,
    result: &'a ValueIterationResult,
    precision: usize,
    final_only: bool,
}

impl<'a> HistoryView<'a> {
    pub fn new(grid: &'a GridWorld, result: &'a ValueIterationResult) -> Self {
        Self {
            grid,
            result,
            precision: DEFAULT_PRECISION,
            final_only: false,
        }
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    /// Print only the converged snapshot.
    pub fn final_only(mut self, final_only: bool) -> Self {
        self.final_only = final_only;
        self
    }
}

impl fmt::Display for HistoryView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshots: Vec<&ValueSnapshot> = if self.final_only {
            vec![self.result.final_snapshot()]
        } else {
            self.result.history.iter().collect()
        };

        for snapshot in snapshots {
            write!(
                f,
                "{}",
                SnapshotView::new(self.grid, snapshot).with_precision(self.precision)
            )?;
            writeln!(f, "-")?;
        }
        write!(
            f,
            "({}, {}), states: {}",
            self.result.width,
            self.result.height,
            self.result.history.total_recorded()
        )
    }
}
