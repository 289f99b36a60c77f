//! Backward induction over belief states.
//!
//! The solver recurses top-down from a state, memoizing Q-value pairs keyed by
//! the four interaction counts. Beliefs travel alongside the counts but are not
//! part of the key: with fixed priors they are a function of the counts.

mod memo;

use memo::MemoTable;
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

use crate::belief::{AdvisorPriors, Belief, BeliefError};
use crate::model::{Advisor, InteractionState, QValues};

/// Largest supported horizon; keeps the memo table under a million slots.
pub const MAX_HORIZON: u32 = 64;

/// Priors and horizon a solver is built for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolverConfig {
    priors: AdvisorPriors,
    horizon: u32,
}

impl SolverConfig {
    pub fn new(priors: AdvisorPriors, horizon: u32) -> Result<Self, SolverError> {
        if horizon == 0 {
            return Err(SolverError::InvalidHorizon { horizon });
        }
        if horizon > MAX_HORIZON {
            return Err(SolverError::HorizonTooLarge {
                horizon,
                max: MAX_HORIZON,
            });
        }
        Ok(Self { priors, horizon })
    }

    pub fn priors(&self) -> &AdvisorPriors {
        &self.priors
    }

    pub fn horizon(&self) -> u32 {
        self.horizon
    }
}

/// Counters describing how the memo table has been used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SolverStats {
    /// States answered from the memo table.
    pub hits: u64,
    /// States whose Q-values were computed.
    pub evaluations: u64,
    /// Calls that landed on a terminal state.
    pub terminal: u64,
}

pub struct Solver {
    config: SolverConfig,
    memo: MemoTable,
    stats: SolverStats,
}

impl Solver {
    pub fn new(config: SolverConfig) -> Self {
        let memo = MemoTable::new(config.horizon);
        Self {
            config,
            memo,
            stats: SolverStats::default(),
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn priors(&self) -> &AdvisorPriors {
        &self.config.priors
    }

    pub fn horizon(&self) -> u32 {
        self.config.horizon
    }

    pub fn stats(&self) -> SolverStats {
        self.stats
    }

    /// Number of states currently memoized.
    pub fn cached_states(&self) -> usize {
        self.memo.len()
    }

    /// Number of non-terminal states the table can hold.
    pub fn table_capacity(&self) -> usize {
        self.memo.capacity()
    }

    pub fn is_cached(&self, state: InteractionState) -> bool {
        self.memo.get(state).is_some()
    }

    /// Q-values for `state`, where `belief_a`/`belief_b` are the beliefs implied
    /// by its counts.
    pub fn solve(
        &mut self,
        state: InteractionState,
        belief_a: &Belief,
        belief_b: &Belief,
    ) -> Result<QValues, SolverError> {
        if state.rounds_played() >= self.config.horizon {
            self.stats.terminal += 1;
            return Ok(QValues::TERMINAL);
        }

        if let Some(cached) = self.memo.get(state) {
            self.stats.hits += 1;
            return Ok(cached);
        }

        let q_a = self.choice_value(state, Advisor::A, belief_a, belief_b)?;
        let q_b = self.choice_value(state, Advisor::B, belief_a, belief_b)?;
        let values = QValues::new(q_a, q_b);

        self.memo.insert(state, values);
        self.stats.evaluations += 1;
        Ok(values)
    }

    /// Solves the start state from the configured priors.
    pub fn solve_initial(&mut self) -> Result<QValues, SolverError> {
        let priors = self.config.priors.clone();
        let values = self.solve(InteractionState::START, &priors.a, &priors.b)?;

        event!(
            target: "advisor_core::solver",
            Level::DEBUG,
            horizon = self.config.horizon,
            cached_states = self.memo.len() as u64,
            capacity = self.memo.capacity() as u64,
            q_a = values.a,
            q_b = values.b,
            "solved start state"
        );

        Ok(values)
    }

    /// Solves `state`, rebuilding both beliefs from the priors first.
    pub fn solve_counts(&mut self, state: InteractionState) -> Result<QValues, SolverError> {
        if state.rounds_played() >= self.config.horizon {
            self.stats.terminal += 1;
            return Ok(QValues::TERMINAL);
        }
        let (belief_a, belief_b) = self.config.priors.beliefs_at(state)?;
        self.solve(state, &belief_a, &belief_b)
    }

    /// Drops every memoized state. Subsequent solves recompute identical values.
    pub fn clear(&mut self) {
        let dropped = self.memo.len();
        self.memo.clear();
        self.stats = SolverStats::default();
        event!(
            target: "advisor_core::solver",
            Level::DEBUG,
            dropped = dropped as u64,
            "memo table cleared"
        );
    }

    /// Switches to a new configuration, rebuilding the memo table.
    pub fn reconfigure(&mut self, config: SolverConfig) {
        self.memo = MemoTable::new(config.horizon);
        self.stats = SolverStats::default();
        self.config = config;
        event!(
            target: "advisor_core::solver",
            Level::DEBUG,
            horizon = self.config.horizon,
            capacity = self.memo.capacity() as u64,
            "solver reconfigured"
        );
    }

    /// Expected reward of consulting `advisor` now and acting optimally afterwards.
    fn choice_value(
        &mut self,
        state: InteractionState,
        advisor: Advisor,
        belief_a: &Belief,
        belief_b: &Belief,
    ) -> Result<f64, SolverError> {
        let chosen = match advisor {
            Advisor::A => belief_a,
            Advisor::B => belief_b,
        };
        let expected = chosen.expected_value();

        let on_success = chosen.update(true)?;
        let future_success = self.continuation(
            state.record(advisor, true),
            advisor,
            &on_success,
            belief_a,
            belief_b,
        )?;

        let on_failure = chosen.update(false)?;
        let future_failure = self.continuation(
            state.record(advisor, false),
            advisor,
            &on_failure,
            belief_a,
            belief_b,
        )?;

        Ok(expected * (1.0 + future_success) + (1.0 - expected) * future_failure)
    }

    fn continuation(
        &mut self,
        next: InteractionState,
        advisor: Advisor,
        updated: &Belief,
        belief_a: &Belief,
        belief_b: &Belief,
    ) -> Result<f64, SolverError> {
        let values = match advisor {
            Advisor::A => self.solve(next, updated, belief_b)?,
            Advisor::B => self.solve(next, belief_a, updated)?,
        };
        Ok(values.best())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("horizon must be at least 1 (got {horizon})")]
    InvalidHorizon { horizon: u32 },
    #[error("horizon {horizon} exceeds the supported maximum of {max}")]
    HorizonTooLarge { horizon: u32, max: u32 },
    #[error("belief update failed: {0}")]
    Belief(#[from] BeliefError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin_priors() -> AdvisorPriors {
        let belief = Belief::from_pairs(&[(0.9, 0.5), (0.1, 0.5)]).unwrap();
        AdvisorPriors::new(belief.clone(), belief)
    }

    #[test]
    fn rejects_invalid_horizons() {
        assert_eq!(
            SolverConfig::new(coin_priors(), 0),
            Err(SolverError::InvalidHorizon { horizon: 0 })
        );
        assert!(matches!(
            SolverConfig::new(coin_priors(), MAX_HORIZON + 1),
            Err(SolverError::HorizonTooLarge { .. })
        ));
    }

    #[test]
    fn single_round_values_equal_expected_accuracy() {
        let a = Belief::from_pairs(&[(0.7, 1.0)]).unwrap();
        let b = Belief::from_pairs(&[(0.4, 0.5), (0.2, 0.5)]).unwrap();
        let config = SolverConfig::new(AdvisorPriors::new(a, b), 1).unwrap();
        let mut solver = Solver::new(config);

        let values = solver.solve_initial().unwrap();
        assert!((values.a - 0.7).abs() < 1e-12);
        assert!((values.b - 0.3).abs() < 1e-12);
        assert_eq!(solver.cached_states(), 1);
        assert_eq!(solver.stats().terminal, 4);
    }

    #[test]
    fn two_round_value_matches_hand_computation() {
        // Advisor A is either perfect-ish (0.9) or useless (0.1) with equal odds;
        // B is a known 0.5. Exploring A first is worth more than playing B twice.
        let a = Belief::from_pairs(&[(0.9, 0.5), (0.1, 0.5)]).unwrap();
        let b = Belief::from_pairs(&[(0.5, 1.0)]).unwrap();
        let config = SolverConfig::new(AdvisorPriors::new(a, b), 2).unwrap();
        let mut solver = Solver::new(config);

        let values = solver.solve_initial().unwrap();
        // After A succeeds the posterior mean of A is 0.82; after it fails B (0.5) wins.
        let expected_a = 0.5 * (1.0 + 0.82) + 0.5 * 0.5;
        let expected_b = 0.5 * (1.0 + 0.5) + 0.5 * 0.5;
        assert!((values.a - expected_a).abs() < 1e-12, "{values:?}");
        assert!((values.b - expected_b).abs() < 1e-12, "{values:?}");
    }

    #[test]
    fn states_at_horizon_are_terminal() {
        let mut solver = Solver::new(SolverConfig::new(coin_priors(), 3).unwrap());
        let values = solver
            .solve_counts(InteractionState::new(1, 0, 1, 1))
            .unwrap();
        assert_eq!(values, QValues::TERMINAL);
        assert_eq!(solver.cached_states(), 0);
    }

    #[test]
    fn terminal_counts_skip_belief_reconstruction() {
        let mut solver = Solver::new(SolverConfig::new(coin_priors(), 3).unwrap());
        // Rebuilding these beliefs would take billions of updates.
        let state = InteractionState::new(u32::MAX, u32::MAX, 0, 0);
        assert_eq!(solver.solve_counts(state).unwrap(), QValues::TERMINAL);
        assert_eq!(solver.stats().terminal, 1);
        assert_eq!(solver.stats().evaluations, 0);
    }

    #[test]
    fn degenerate_update_surfaces_as_solver_error() {
        // Accuracies are k times the smallest subnormal with k * p < 0.5, so
        // every success mass rounds to zero.
        let tiny = |k: u64| f64::from_bits(k);
        let a = Belief::from_pairs(&[
            (tiny(1), 0.48),
            (tiny(2), 0.24),
            (tiny(3), 0.16),
            (tiny(4), 0.12),
        ])
        .unwrap();
        let b = Belief::from_pairs(&[(0.5, 1.0)]).unwrap();
        let config = SolverConfig::new(AdvisorPriors::new(a, b), 2).unwrap();
        let mut solver = Solver::new(config);

        let err = solver.solve_initial().unwrap_err();
        assert!(
            matches!(
                err,
                SolverError::Belief(BeliefError::DegenerateUpdate { success: true, .. })
            ),
            "{err:?}"
        );
        assert_eq!(solver.cached_states(), 0);
    }

    #[test]
    fn reconfigure_rebuilds_the_table() {
        let mut solver = Solver::new(SolverConfig::new(coin_priors(), 4).unwrap());
        solver.solve_initial().unwrap();
        assert!(solver.cached_states() > 0);

        solver.reconfigure(SolverConfig::new(coin_priors(), 2).unwrap());
        assert_eq!(solver.cached_states(), 0);
        assert_eq!(solver.horizon(), 2);
        assert_eq!(solver.table_capacity(), 5);
    }
}
