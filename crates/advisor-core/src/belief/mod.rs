//! Bayesian belief tracking over advisor accuracy.
//!
//! - `distribution`: the discrete `Belief` type, its validation and posterior updates.
//! - `priors`: the pair of initial priors a solver is configured with.

mod distribution;
mod priors;

pub use distribution::{Belief, BeliefError, PRIOR_SUM_TOLERANCE, SupportPoint};
pub use priors::AdvisorPriors;
