use serde::Serialize;

use super::{Belief, BeliefError};
use crate::model::{Advisor, InteractionState};

/// Initial beliefs for both advisors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvisorPriors {
    pub a: Belief,
    pub b: Belief,
}

impl AdvisorPriors {
    pub fn new(a: Belief, b: Belief) -> Self {
        Self { a, b }
    }

    pub fn get(&self, advisor: Advisor) -> &Belief {
        match advisor {
            Advisor::A => &self.a,
            Advisor::B => &self.b,
        }
    }

    /// Rebuilds both beliefs implied by `state`.
    pub fn beliefs_at(&self, state: InteractionState) -> Result<(Belief, Belief), BeliefError> {
        let a = self.a.after_history(state.wins_a, state.losses_a)?;
        let b = self.b.after_history(state.wins_b, state.losses_b)?;
        Ok((a, b))
    }

    /// True when both advisors share the same prior.
    pub fn is_symmetric(&self) -> bool {
        self.a == self.b
    }
}
