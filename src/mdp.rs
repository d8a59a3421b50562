pub mod config;
pub mod engine;
pub mod grid;
pub mod render;
pub mod snapshot;

#[cfg(test)]
mod tests;

// Re-export the grid world and value iteration API
pub use config::{CellPosition, GridSize, MdpConfig, StoppingKind, SweepKind, TerminalCell};
pub use engine::{
    bellman_update, expected_value, neighbor_value, sweep, value_iteration, Action, History,
    StoppingRule, SweepMode, ValueIterationConfig, ValueIterationResult, INTENDED_PROBABILITY,
    SLIP_PROBABILITY,
};
pub use grid::{CellKind, Coord, GridWorld};
pub use render::{HistoryView, SnapshotView};
pub use snapshot::ValueSnapshot;
