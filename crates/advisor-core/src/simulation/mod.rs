//! Monte Carlo play-outs of a policy against hidden advisor accuracies.
//!
//! Each run draws its true accuracies once from the initial priors, then plays
//! the full horizon. Runs are seeded individually from a master RNG, so a run
//! is reproducible from its seed alone and two policies simulated with the
//! same master seed face the same hidden accuracies run by run.

mod record;

pub use record::{RoundRecord, SimulationRecord, SimulationReport};

use rand::distributions::{Distribution, WeightedError, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use thiserror::Error;
use tracing::{Level, event};

use crate::belief::{AdvisorPriors, Belief, BeliefError};
use crate::model::{Advisor, InteractionState};
use crate::policy::{Policy, PolicyContext};
use crate::solver::{SolverConfig, SolverError};

/// Batch parameters for a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationConfig {
    pub runs: usize,
    pub seed: u64,
}

pub struct MonteCarloSimulator {
    priors: AdvisorPriors,
    horizon: u32,
    runs: usize,
    seed: u64,
}

impl MonteCarloSimulator {
    pub fn new(solver: &SolverConfig, config: SimulationConfig) -> Result<Self, SimulationError> {
        if config.runs == 0 {
            return Err(SimulationError::NoRuns);
        }
        Ok(Self {
            priors: solver.priors().clone(),
            horizon: solver.horizon(),
            runs: config.runs,
            seed: config.seed,
        })
    }

    pub fn runs(&self) -> usize {
        self.runs
    }

    pub fn horizon(&self) -> u32 {
        self.horizon
    }

    /// Plays every run with `policy`.
    pub fn run<P: Policy + ?Sized>(&self, policy: &mut P) -> Result<SimulationReport, SimulationError> {
        self.check_policy(policy)?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut records = Vec::with_capacity(self.runs);

        for run_index in 0..self.runs {
            let run_seed = rng.next_u64();
            records.push(self.run_once(policy, run_index, run_seed)?);
        }

        let report = SimulationReport {
            policy: policy.kind(),
            horizon: self.horizon,
            seed: self.seed,
            records,
        };

        event!(
            target: "advisor_core::simulation",
            Level::INFO,
            policy = policy.kind().label(),
            runs = self.runs as u64,
            horizon = self.horizon,
            mean_score = report.mean_score(),
            "simulation complete"
        );

        Ok(report)
    }

    /// Plays a single run seeded with `run_seed`.
    pub fn run_once<P: Policy + ?Sized>(
        &self,
        policy: &mut P,
        run_index: usize,
        run_seed: u64,
    ) -> Result<SimulationRecord, SimulationError> {
        self.check_policy(policy)?;
        let mut rng = StdRng::seed_from_u64(run_seed);
        let true_accuracy_a = sample_accuracy(&self.priors.a, &mut rng)?;
        let true_accuracy_b = sample_accuracy(&self.priors.b, &mut rng)?;

        let mut state = InteractionState::START;
        let mut belief_a = self.priors.a.clone();
        let mut belief_b = self.priors.b.clone();
        let mut score = 0u32;
        let mut trace = Vec::with_capacity(self.horizon as usize);

        for round in 0..self.horizon {
            let ctx = PolicyContext {
                state,
                belief_a: &belief_a,
                belief_b: &belief_b,
            };
            let decision = policy.decide(&ctx)?;
            let advisor = decision.advisor;

            let accuracy = match advisor {
                Advisor::A => true_accuracy_a,
                Advisor::B => true_accuracy_b,
            };
            let success = rng.gen_bool(accuracy);
            if success {
                score += 1;
            }

            state = state.record(advisor, success);
            match advisor {
                Advisor::A => belief_a = belief_a.update(success)?,
                Advisor::B => belief_b = belief_b.update(success)?,
            }

            trace.push(RoundRecord {
                round,
                advisor,
                success,
                values: decision.values,
            });
        }

        event!(
            target: "advisor_core::simulation",
            Level::TRACE,
            run_index = run_index as u64,
            run_seed,
            true_accuracy_a,
            true_accuracy_b,
            score,
            "run complete"
        );

        Ok(SimulationRecord {
            run_index,
            seed: run_seed,
            true_accuracy_a,
            true_accuracy_b,
            trace,
            score,
        })
    }

    /// A solver-backed policy must share the simulator's priors and horizon.
    fn check_policy<P: Policy + ?Sized>(&self, policy: &P) -> Result<(), SimulationError> {
        let Some(config) = policy.solver_config() else {
            return Ok(());
        };
        let priors_match = config.priors() == &self.priors;
        if priors_match && config.horizon() == self.horizon {
            return Ok(());
        }
        Err(SimulationError::ConfigMismatch {
            simulator_horizon: self.horizon,
            solver_horizon: config.horizon(),
            priors_match,
        })
    }
}

/// Draws a ground-truth accuracy from `belief`'s distribution.
pub fn sample_accuracy<R: Rng + ?Sized>(belief: &Belief, rng: &mut R) -> Result<f64, SimulationError> {
    let weights = WeightedIndex::new(belief.points().iter().map(|point| point.probability))?;
    Ok(belief.points()[weights.sample(rng)].accuracy)
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("simulation requires at least one run")]
    NoRuns,
    #[error(
        "policy solver does not match the simulator (horizon {solver_horizon} vs {simulator_horizon}, priors match: {priors_match})"
    )]
    ConfigMismatch {
        simulator_horizon: u32,
        solver_horizon: u32,
        priors_match: bool,
    },
    #[error("solver failed: {0}")]
    Solver(#[from] SolverError),
    #[error("belief update failed: {0}")]
    Belief(#[from] BeliefError),
    #[error("cannot sample from prior: {0}")]
    Sampling(#[from] WeightedError),
}
