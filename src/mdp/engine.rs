//! Value iteration over a `GridWorld` with a 0.8/0.1/0.1 action-noise model.
//!
//! Each free cell takes the best of four noisy moves (or staying put) and
//! pays the living cost:
//!
//! ```text
//! V'(c) = max(E[up], E[down], E[right], E[left], V(c)) - living_cost
//! E[a]  = 0.8 * V(a) + 0.1 * V(perp_1(a)) + 0.1 * V(perp_2(a))
//! ```
//!
//! Off-grid neighbors and walls contribute 0.0. Terminals and walls are
//! never updated.

use std::collections::VecDeque;

use super::grid::{Coord, GridWorld};
use super::snapshot::ValueSnapshot;

/// Probability that a move goes in the intended direction.
pub const INTENDED_PROBABILITY: f64 = 0.8;
/// Probability of slipping to each of the two perpendicular directions.
pub const SLIP_PROBABILITY: f64 = 0.1;

/// Default convergence threshold for `StoppingRule::Threshold`.
pub const DEFAULT_EPSILON: f64 = 1e-9;
/// Default upper bound on the number of sweeps.
pub const DEFAULT_MAX_SWEEPS: usize = 100_000;

/// The four moves available in every free cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Up,
    Down,
    Right,
    Left,
}

impl Action {
    /// Evaluation order used by the Bellman update.
    pub const ALL: [Action; 4] = [Action::Up, Action::Down, Action::Right, Action::Left];

    /// `(dx, dy)` of a successful move. Up increases `y`.
    pub fn offset(self) -> (isize, isize) {
        match self {
            Action::Up => (0, 1),
            Action::Down => (0, -1),
            Action::Right => (1, 0),
            Action::Left => (-1, 0),
        }
    }

    /// The two directions the agent may slip into instead.
    pub fn perpendicular(self) -> [Action; 2] {
        match self {
            Action::Up | Action::Down => [Action::Left, Action::Right],
            Action::Right | Action::Left => [Action::Up, Action::Down],
        }
    }
}

/// How a sweep reads the values it updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SweepMode {
    /// Cells are overwritten in raster order as they are computed, so later
    /// cells see the new values of earlier ones.
    #[default]
    InPlace,
    /// Every cell reads the pre-sweep values (two-buffer update).
    Synchronous,
}

/// When the convergence loop stops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StoppingRule {
    /// Stop once a sweep's delta is at most the given threshold.
    Threshold(f64),
    /// Stop once two consecutive deltas are bit-for-bit equal.
    ExactDelta,
}

impl StoppingRule {
    fn is_met(&self, previous_delta: f64, delta: f64) -> bool {
        match *self {
            StoppingRule::Threshold(epsilon) => delta <= epsilon,
            StoppingRule::ExactDelta => delta.to_bits() == previous_delta.to_bits(),
        }
    }
}

impl Default for StoppingRule {
    fn default() -> Self {
        StoppingRule::Threshold(DEFAULT_EPSILON)
    }
}

/// Settings for the convergence loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueIterationConfig {
    pub stopping: StoppingRule,
    pub sweep_mode: SweepMode,
    /// Hard bound on sweeps; the loop reports `converged == false` when hit.
    pub max_sweeps: usize,
    /// Number of snapshots kept in the history. `None` keeps all of them.
    pub history_limit: Option<usize>,
}

impl ValueIterationConfig {
    /// Threshold stopping at `DEFAULT_EPSILON`, in-place sweeps,
    /// `DEFAULT_MAX_SWEEPS` and an unbounded history.
    pub fn new() -> Self {
        Self {
            stopping: StoppingRule::default(),
            sweep_mode: SweepMode::default(),
            max_sweeps: DEFAULT_MAX_SWEEPS,
            history_limit: None,
        }
    }

    pub fn with_stopping(mut self, stopping: StoppingRule) -> Self {
        self.stopping = stopping;
        self
    }

    /// Shorthand for `with_stopping(StoppingRule::Threshold(epsilon))`.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.stopping = StoppingRule::Threshold(epsilon);
        self
    }

    pub fn with_sweep_mode(mut self, sweep_mode: SweepMode) -> Self {
        self.sweep_mode = sweep_mode;
        self
    }

    pub fn with_max_sweeps(mut self, max_sweeps: usize) -> Self {
        self.max_sweeps = max_sweeps;
        self
    }

    /// Keep only the newest `limit` snapshots (at least one).
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit.max(1));
        self
    }
}

impl Default for ValueIterationConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshots produced by the convergence loop, oldest first.
///
/// Starts with the initial snapshot and grows by one entry per sweep that
/// did not stop the loop. With a retention limit, the oldest entries are
/// dropped; the newest snapshot is always kept.
#[derive(Debug, Clone)]
pub struct History {
    snapshots: VecDeque<ValueSnapshot>,
    limit: Option<usize>,
    recorded: usize,
}

impl History {
    pub fn new(initial: ValueSnapshot, limit: Option<usize>) -> Self {
        let mut snapshots = VecDeque::new();
        snapshots.push_back(initial);
        Self {
            snapshots,
            limit: limit.map(|l| l.max(1)),
            recorded: 1,
        }
    }

    pub fn push(&mut self, snapshot: ValueSnapshot) {
        self.snapshots.push_back(snapshot);
        self.recorded += 1;
        if let Some(limit) = self.limit {
            while self.snapshots.len() > limit {
                self.snapshots.pop_front();
            }
        }
    }

    /// Most recent snapshot. The history is never empty.
    pub fn latest(&self) -> &ValueSnapshot {
        self.snapshots
            .back()
            .expect("history always holds at least the initial snapshot")
    }

    /// Number of snapshots currently retained.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Number of snapshots ever appended, the initial one included.
    pub fn total_recorded(&self) -> usize {
        self.recorded
    }

    /// Position of the oldest retained snapshot in the full sequence.
    pub fn first_retained_index(&self) -> usize {
        self.recorded - self.snapshots.len()
    }

    pub fn get(&self, index: usize) -> Option<&ValueSnapshot> {
        self.snapshots.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValueSnapshot> {
        self.snapshots.iter()
    }
}

/// Outcome of `value_iteration`.
#[derive(Debug, Clone)]
pub struct ValueIterationResult {
    pub history: History,
    /// Sweeps run, including the final one that met the stopping rule.
    pub sweeps: usize,
    /// Delta reported by the last sweep run.
    pub final_delta: f64,
    /// `false` when the loop gave up at `max_sweeps`.
    pub converged: bool,
    pub width: usize,
    pub height: usize,
}

impl ValueIterationResult {
    /// The converged value grid.
    pub fn final_snapshot(&self) -> &ValueSnapshot {
        self.history.latest()
    }
}

/// Value contributed by the cell at `coord + (dx, dy)`: 0.0 when off-grid or
/// a wall, otherwise its value in `snapshot`.
pub fn neighbor_value(
    grid: &GridWorld,
    snapshot: &ValueSnapshot,
    coord: Coord,
    dx: isize,
    dy: isize,
) -> f64 {
    let x = coord.x as isize + dx;
    let y = coord.y as isize + dy;
    if !grid.contains(x, y) {
        return 0.0;
    }
    let neighbor = Coord::new(x as usize, y as usize);
    if grid.is_wall(neighbor) {
        0.0
    } else {
        snapshot.get(neighbor)
    }
}

/// Expected value of attempting `action` from `coord` under the noise model.
pub fn expected_value(
    grid: &GridWorld,
    snapshot: &ValueSnapshot,
    coord: Coord,
    action: Action,
) -> f64 {
    let value_toward = |a: Action| {
        let (dx, dy) = a.offset();
        neighbor_value(grid, snapshot, coord, dx, dy)
    };
    let [slip_a, slip_b] = action.perpendicular();

    // Intended direction first, then the two slips, always in this order.
    INTENDED_PROBABILITY * value_toward(action)
        + SLIP_PROBABILITY * value_toward(slip_a)
        + SLIP_PROBABILITY * value_toward(slip_b)
}

/// New value of the free cell `coord` given the values in `snapshot`.
pub fn bellman_update(grid: &GridWorld, snapshot: &ValueSnapshot, coord: Coord) -> f64 {
    let stay = snapshot.get(coord);
    let best = Action::ALL
        .iter()
        .map(|&action| expected_value(grid, snapshot, coord, action))
        .fold(stay, f64::max);
    best - grid.living_cost()
}

/// Runs one Bellman sweep over every free cell of `snapshot`, row by row
/// (`y` ascending, then `x` ascending), and returns the largest increase
/// seen. The delta is never negative.
///
/// # Panics
///
/// Panics if the snapshot's shape does not match the grid.
///
/// # Examples
///
/// ```
/// use gridmdp::mdp::{sweep, Coord, GridWorld, SweepMode};
///
/// let grid = GridWorld::new(2, 1, &[], &[(Coord::new(1, 0), 1.0)], 0.0).unwrap();
/// let mut snapshot = grid.initial_snapshot();
/// let delta = sweep(&grid, &mut snapshot, SweepMode::InPlace);
///
/// assert!((snapshot.get(Coord::new(0, 0)) - 0.8).abs() < 1e-12);
/// assert!((delta - 0.8).abs() < 1e-12);
/// ```
pub fn sweep(grid: &GridWorld, snapshot: &mut ValueSnapshot, mode: SweepMode) -> f64 {
    assert_eq!(
        (snapshot.width(), snapshot.height()),
        (grid.width(), grid.height()),
        "snapshot shape does not match the grid"
    );

    let mut delta = 0.0_f64;
    match mode {
        SweepMode::InPlace => {
            for cell in grid.free_cells() {
                let old = snapshot.get(cell);
                let new = bellman_update(grid, snapshot, cell);
                delta = delta.max(new - old);
                snapshot.set(cell, new);
            }
        }
        SweepMode::Synchronous => {
            let before = snapshot.clone();
            for cell in grid.free_cells() {
                let old = before.get(cell);
                let new = bellman_update(grid, &before, cell);
                delta = delta.max(new - old);
                snapshot.set(cell, new);
            }
        }
    }
    delta
}

/// Repeats sweeps from the grid's initial snapshot until `config.stopping`
/// is met or `config.max_sweeps` sweeps have run.
///
/// Every sweep works on a fresh copy of the newest snapshot. The copy that
/// meets the stopping rule is discarded; every other one is appended to the
/// history. The previous delta starts at 0.0.
///
/// # Examples
///
/// ```
/// use gridmdp::mdp::{value_iteration, Coord, GridWorld, ValueIterationConfig};
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
/// let result = value_iteration(&grid, &ValueIterationConfig::new());
/// assert!(result.converged);
///
/// let values = result.final_snapshot();
/// assert!(values.get(Coord::new(2, 2)) > values.get(Coord::new(0, 0)));
/// assert_eq!(values.get(Coord::new(1, 1)), 0.0);
/// ```
pub fn value_iteration(grid: &GridWorld, config: &ValueIterationConfig) -> ValueIterationResult {
    let mut history = History::new(grid.initial_snapshot(), config.history_limit);
    let mut previous_delta = 0.0_f64;
    let mut sweeps = 0;
    let mut converged = false;

    while sweeps < config.max_sweeps {
        let mut candidate = history.latest().clone();
        let delta = sweep(grid, &mut candidate, config.sweep_mode);
        sweeps += 1;
        log::trace!("sweep {}: delta {:e}", sweeps, delta);

        let stop = config.stopping.is_met(previous_delta, delta);
        previous_delta = delta;
        if stop {
            converged = true;
            break;
        }
        history.push(candidate);
    }

    if converged {
        log::debug!(
            "value iteration converged after {} sweeps (delta {:e}, {} snapshots)",
            sweeps,
            previous_delta,
            history.total_recorded()
        );
    } else {
        log::warn!(
            "value iteration stopped at the {} sweep limit without converging (delta {:e})",
            config.max_sweeps,
            previous_delta
        );
    }

    ValueIterationResult {
        history,
        sweeps,
        final_delta: previous_delta,
        converged,
        width: grid.width(),
        height: grid.height(),
    }
}
