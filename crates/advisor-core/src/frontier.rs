//! Patience frontier: the Q-value gap across advisor A's win/loss history.
//!
//! Advisor B is held at its fresh `(0, 0)` state for every cell, so the grid
//! is a two-dimensional slice of the full state space rather than a general
//! decision boundary.

use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

use crate::belief::BeliefError;
use crate::model::InteractionState;
use crate::solver::{Solver, SolverError};

/// One grid cell: the gap `Q_A - Q_B`, or a marker for states beyond the horizon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(into = "Option<f64>")]
pub enum FrontierCell {
    Value(f64),
    NotApplicable,
}

impl FrontierCell {
    pub fn value(&self) -> Option<f64> {
        match self {
            FrontierCell::Value(gap) => Some(*gap),
            FrontierCell::NotApplicable => None,
        }
    }

    pub fn is_applicable(&self) -> bool {
        matches!(self, FrontierCell::Value(_))
    }
}

impl From<FrontierCell> for Option<f64> {
    fn from(cell: FrontierCell) -> Self {
        cell.value()
    }
}

/// Square grid indexed as `rows[losses][wins]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrontierGrid {
    grid_size: usize,
    horizon: u32,
    rows: Vec<Vec<FrontierCell>>,
}

impl FrontierGrid {
    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    pub fn horizon(&self) -> u32 {
        self.horizon
    }

    /// Cell for `wins` successes and `losses` failures with advisor A.
    pub fn cell(&self, wins: usize, losses: usize) -> Option<FrontierCell> {
        self.rows.get(losses).and_then(|row| row.get(wins)).copied()
    }

    /// Rows ordered by loss count; each row is ordered by win count.
    pub fn rows(&self) -> &[Vec<FrontierCell>] {
        &self.rows
    }

    /// Smallest loss count at which switching to B is strictly better after `wins` successes.
    pub fn switch_threshold(&self, wins: usize) -> Option<usize> {
        (0..self.grid_size).find(|&losses| {
            matches!(self.cell(wins, losses), Some(FrontierCell::Value(gap)) if gap < 0.0)
        })
    }

    /// Switch thresholds for every win count in the grid.
    pub fn switch_thresholds(&self) -> Vec<Option<usize>> {
        (0..self.grid_size)
            .map(|wins| self.switch_threshold(wins))
            .collect()
    }
}

/// Sweeps every `(wins, losses)` with both below `grid_size`.
///
/// `grid_size` must lie in `1..=horizon + 1`.
pub fn sweep(solver: &mut Solver, grid_size: usize) -> Result<FrontierGrid, FrontierError> {
    let horizon = solver.horizon();
    let max = horizon as usize + 1;
    if grid_size == 0 || grid_size > max {
        return Err(FrontierError::GridSize { grid_size, max });
    }

    let prior_a = solver.priors().a.clone();
    let prior_b = solver.priors().b.clone();

    let mut rows = Vec::with_capacity(grid_size);
    let mut applicable = 0u64;
    for losses in 0..grid_size {
        let mut row = Vec::with_capacity(grid_size);
        for wins in 0..grid_size {
            if wins + losses >= horizon as usize {
                row.push(FrontierCell::NotApplicable);
                continue;
            }

            let belief_a = prior_a.after_history(wins as u32, losses as u32)?;
            let state = InteractionState::new(wins as u32, losses as u32, 0, 0);
            let values = solver.solve(state, &belief_a, &prior_b)?;
            row.push(FrontierCell::Value(values.gap()));
            applicable += 1;
        }
        rows.push(row);
    }

    event!(
        target: "advisor_core::frontier",
        Level::DEBUG,
        grid_size = grid_size as u64,
        horizon,
        applicable,
        "frontier sweep complete"
    );

    Ok(FrontierGrid {
        grid_size,
        horizon,
        rows,
    })
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrontierError {
    #[error("grid size {grid_size} must be between 1 and {max} (horizon + 1)")]
    GridSize { grid_size: usize, max: usize },
    #[error("solver failed: {0}")]
    Solver(#[from] SolverError),
    #[error("belief reconstruction failed: {0}")]
    Belief(#[from] BeliefError),
}
