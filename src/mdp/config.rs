//! JSON description of a grid world and the solver settings that go with it.
//!
//! Positions in the file are 1-based; they are converted to 0-based
//! `Coord`s by `Coord::from_one_based` when the grid is built.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::engine::{
    StoppingRule, SweepMode, ValueIterationConfig, DEFAULT_EPSILON, DEFAULT_MAX_SWEEPS,
};
use super::grid::{Coord, GridWorld};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSize {
    pub x: usize,
    pub y: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellPosition {
    pub x: usize,
    pub y: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalCell {
    pub x: usize,
    pub y: usize,
    pub value: f64,
}

/// Which stopping rule the file asks for. The threshold itself comes from
/// `epsilon`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoppingKind {
    #[default]
    Threshold,
    ExactDelta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepKind {
    #[default]
    InPlace,
    Synchronous,
}

impl From<SweepKind> for SweepMode {
    fn from(kind: SweepKind) -> Self {
        match kind {
            SweepKind::InPlace => SweepMode::InPlace,
            SweepKind::Synchronous => SweepMode::Synchronous,
        }
    }
}

/// Top-level configuration record.
///
/// ```json
/// {
///   "size": { "x": 4, "y": 3 },
///   "walls": [{ "x": 2, "y": 2 }],
///   "terminal_cords": [{ "x": 4, "y": 3, "value": 1 }, { "x": 4, "y": 2, "value": -1 }],
///   "reward": 0.04,
///   "transitions": { "intended": 0.8, "slip": 0.1 },
///   "discount_rate": 1.0,
///   "epsilon": 0.0001
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MdpConfig {
    pub size: GridSize,
    #[serde(default)]
    pub walls: Vec<CellPosition>,
    #[serde(default, rename = "terminal_cords")]
    pub terminals: Vec<TerminalCell>,
    /// Living cost subtracted from every free cell on each update.
    pub reward: f64,
    /// Action model descriptor. Accepted for compatibility; the engine always
    /// uses the fixed 0.8/0.1/0.1 model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transitions: Option<serde_json::Value>,
    /// Not used by the update rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_rate: Option<f64>,
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    #[serde(default)]
    pub stopping: StoppingKind,
    #[serde(default)]
    pub sweep: SweepKind,
    #[serde(default = "default_max_sweeps")]
    pub max_sweeps: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<usize>,
}

fn default_epsilon() -> f64 {
    DEFAULT_EPSILON
}

fn default_max_sweeps() -> usize {
    DEFAULT_MAX_SWEEPS
}

impl MdpConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config = Self::from_json_str(&contents)?;
        log::info!(
            "Loaded {}x{} grid configuration from {}",
            config.size.x,
            config.size.y,
            path.display()
        );
        Ok(config)
    }

    /// Builds the grid world, converting every position from 1-based.
    ///
    /// # Errors
    ///
    /// Fails on zero-valued positions, positions outside the grid, conflicting
    /// cells, and non-finite rewards.
    pub fn to_grid_world(&self) -> Result<GridWorld> {
        if self.transitions.is_some() {
            log::debug!("ignoring `transitions`: the 0.8/0.1/0.1 model is fixed");
        }
        if let Some(rate) = self.discount_rate {
            log::debug!("ignoring `discount_rate` = {}: updates use the living cost only", rate);
        }

        let walls = self
            .walls
            .iter()
            .map(|w| Coord::from_one_based(w.x, w.y))
            .collect::<Result<Vec<_>>>()?;
        let terminals = self
            .terminals
            .iter()
            .map(|t| Coord::from_one_based(t.x, t.y).map(|c| (c, t.value)))
            .collect::<Result<Vec<_>>>()?;

        GridWorld::new(self.size.x, self.size.y, &walls, &terminals, self.reward)
    }

    /// Solver settings described by the file.
    ///
    /// # Errors
    ///
    /// `Error::InvalidInput` if `epsilon` is negative or not finite, or if
    /// `max_sweeps` or `history_limit` is zero.
    pub fn solver_config(&self) -> Result<ValueIterationConfig> {
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(Error::invalid_input(format!(
                "epsilon must be a finite, non-negative number, got {}",
                self.epsilon
            )));
        }
        if self.max_sweeps == 0 {
            return Err(Error::invalid_input("max_sweeps must be at least 1"));
        }

        let stopping = match self.stopping {
            StoppingKind::Threshold => StoppingRule::Threshold(self.epsilon),
            StoppingKind::ExactDelta => StoppingRule::ExactDelta,
        };
        let mut config = ValueIterationConfig::new()
            .with_stopping(stopping)
            .with_sweep_mode(self.sweep.into())
            .with_max_sweeps(self.max_sweeps);

        match self.history_limit {
            Some(0) => return Err(Error::invalid_input("history_limit must be at least 1")),
            Some(limit) => config = config.with_history_limit(limit),
            None => {}
        }
        Ok(config)
    }
}
