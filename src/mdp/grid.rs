//! Static description of a grid world: dimensions, walls, terminal cells and
//! the per-step living cost. Builds the initial value snapshot for the engine.

use std::collections::HashMap;

use ndarray::Array2;

use super::snapshot::ValueSnapshot;
use crate::error::{Error, Result};

/// A 0-based cell position. `x` grows to the right, `y` grows upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
    pub x: usize,
    pub y: usize,
}

impl Coord {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Converts an externally supplied 1-based position into a 0-based one.
    ///
    /// Both axes are shifted by one. A zero component has no 0-based
    /// counterpart and is rejected.
    ///
    /// # Examples
    ///
    /// ```
    /// use gridmdp::mdp::Coord;
    ///
    /// assert_eq!(Coord::from_one_based(1, 1).unwrap(), Coord::new(0, 0));
    /// assert_eq!(Coord::from_one_based(4, 3).unwrap(), Coord::new(3, 2));
    /// assert!(Coord::from_one_based(0, 2).is_err());
    /// ```
    pub fn from_one_based(x: usize, y: usize) -> Result<Self> {
        match (x.checked_sub(1), y.checked_sub(1)) {
            (Some(x), Some(y)) => Ok(Self { x, y }),
            _ => Err(Error::invalid_input(format!(
                "1-based coordinate ({}, {}) has a zero component",
                x, y
            ))),
        }
    }
}

/// What occupies a cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellKind {
    /// Updated by every sweep.
    Free,
    /// Blocked; always 0.0 and never contributes to a neighbor.
    Wall,
    /// Holds a fixed reward and is never updated.
    Terminal(f64),
}

/// The immutable world the value-iteration engine runs over.
#[derive(Debug, Clone)]
pub struct GridWorld {
    width: usize,
    height: usize,
    /// Indexed `[[y, x]]`, matching `ValueSnapshot`.
    layout: Array2<CellKind>,
    living_cost: f64,
}

impl GridWorld {
    /// Builds a grid world from 0-based wall and terminal positions.
    ///
    /// Zero width or height is accepted and yields a grid with no cells.
    /// A wall listed twice is harmless; a terminal listed twice must carry
    /// the same reward both times.
    ///
    /// # Errors
    ///
    /// - `Error::OutOfBounds` if any position is outside `[0, width) x [0, height)`.
    /// - `Error::ConflictingCell` if a cell is both wall and terminal, or two
    ///   terminals at the same cell disagree on the reward.
    /// - `Error::InvalidInput` if the living cost or a reward is not finite.
    ///
    /// # Examples
    ///
    /// ```
    /// use gridmdp::mdp::{CellKind, Coord, GridWorld};
    ///
    /// let grid = GridWorld::new(
    ///     4,
    ///     3,
    ///     &[Coord::new(1, 1)],
    ///     &[(Coord::new(3, 2), 1.0), (Coord::new(3, 1), -1.0)],
    ///     0.04,
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(grid.kind(Coord::new(1, 1)), CellKind::Wall);
    /// assert_eq!(grid.initial_snapshot().get(Coord::new(3, 2)), 1.0);
    /// ```
    pub fn new(
        width: usize,
        height: usize,
        walls: &[Coord],
        terminals: &[(Coord, f64)],
        living_cost: f64,
    ) -> Result<Self> {
        if !living_cost.is_finite() {
            return Err(Error::invalid_input(format!(
                "living cost must be finite, got {}",
                living_cost
            )));
        }

        let check_bounds = |c: Coord| -> Result<()> {
            if c.x >= width || c.y >= height {
                return Err(Error::OutOfBounds {
                    x: c.x as isize,
                    y: c.y as isize,
                    width,
                    height,
                });
            }
            Ok(())
        };

        let mut layout = Array2::from_elem((height, width), CellKind::Free);

        for &wall in walls {
            check_bounds(wall)?;
            layout[[wall.y, wall.x]] = CellKind::Wall;
        }

        let mut seen: HashMap<Coord, f64> = HashMap::new();
        for &(cell, reward) in terminals {
            check_bounds(cell)?;
            if !reward.is_finite() {
                return Err(Error::invalid_input(format!(
                    "terminal reward at ({}, {}) must be finite, got {}",
                    cell.x, cell.y, reward
                )));
            }
            if layout[[cell.y, cell.x]] == CellKind::Wall {
                return Err(Error::ConflictingCell {
                    x: cell.x,
                    y: cell.y,
                });
            }
            if let Some(&previous) = seen.get(&cell) {
                if previous != reward {
                    return Err(Error::ConflictingCell {
                        x: cell.x,
                        y: cell.y,
                    });
                }
            }
            seen.insert(cell, reward);
            layout[[cell.y, cell.x]] = CellKind::Terminal(reward);
        }

        log::debug!(
            "built {}x{} grid world: {} walls, {} terminals, living cost {}",
            width,
            height,
            walls.len(),
            seen.len(),
            living_cost
        );

        Ok(Self {
            width,
            height,
            layout,
            living_cost,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Constant subtracted from every free cell's updated value.
    pub fn living_cost(&self) -> f64 {
        self.living_cost
    }

    pub fn contains(&self, x: isize, y: isize) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// # Panics
    ///
    /// Panics if `coord` lies outside the grid.
    pub fn kind(&self, coord: Coord) -> CellKind {
        self.layout[[coord.y, coord.x]]
    }

    pub fn is_wall(&self, coord: Coord) -> bool {
        self.kind(coord) == CellKind::Wall
    }

    pub fn terminal_reward(&self, coord: Coord) -> Option<f64> {
        match self.kind(coord) {
            CellKind::Terminal(reward) => Some(reward),
            _ => None,
        }
    }

    /// Every cell in raster order: `y` ascending, then `x` ascending.
    pub fn cells(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Coord::new(x, y)))
    }

    /// Cells the engine updates, in raster order.
    pub fn free_cells(&self) -> impl Iterator<Item = Coord> + '_ {
        self.cells()
            .filter(move |&c| self.kind(c) == CellKind::Free)
    }

    /// Snapshot before any sweep: terminals hold their reward, walls and free
    /// cells hold 0.0.
    pub fn initial_snapshot(&self) -> ValueSnapshot {
        let mut snapshot = ValueSnapshot::zeros(self.width, self.height);
        for cell in self.cells() {
            if let CellKind::Terminal(reward) = self.kind(cell) {
                snapshot.set(cell, reward);
            }
        }
        snapshot
    }
}
