mod greedy;

pub use greedy::{MyopicPolicy, OptimalPolicy};

use serde::{Deserialize, Serialize};

use crate::belief::Belief;
use crate::model::{Advisor, InteractionState, QValues};
use crate::solver::{SolverConfig, SolverError};

/// Greedy decision over a Q-value pair; advisor A wins exact ties.
pub fn choose(values: QValues) -> Advisor {
    if values.a >= values.b {
        Advisor::A
    } else {
        Advisor::B
    }
}

/// Context provided to policies for decision-making
pub struct PolicyContext<'a> {
    pub state: InteractionState,
    pub belief_a: &'a Belief,
    pub belief_b: &'a Belief,
}

impl PolicyContext<'_> {
    pub fn belief(&self, advisor: Advisor) -> &Belief {
        match advisor {
            Advisor::A => self.belief_a,
            Advisor::B => self.belief_b,
        }
    }
}

/// Advisor picked for the next round plus the per-advisor scores behind it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Decision {
    pub advisor: Advisor,
    pub values: QValues,
}

impl Decision {
    pub fn from_values(values: QValues) -> Self {
        Self {
            advisor: choose(values),
            values,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Argmax over solver Q-values.
    Optimal,
    /// Argmax over the current expected accuracy, ignoring information value.
    Myopic,
}

impl PolicyKind {
    pub const fn label(self) -> &'static str {
        match self {
            PolicyKind::Optimal => "optimal",
            PolicyKind::Myopic => "myopic",
        }
    }
}

/// Unified interface for choosing the next advisor.
pub trait Policy {
    fn kind(&self) -> PolicyKind;

    fn decide(&mut self, ctx: &PolicyContext<'_>) -> Result<Decision, SolverError>;

    /// Priors and horizon the policy's values were computed for, if it depends on any.
    fn solver_config(&self) -> Option<&SolverConfig> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_prefer_advisor_a() {
        assert_eq!(choose(QValues::new(1.0, 1.0)), Advisor::A);
        assert_eq!(choose(QValues::new(1.0, 1.0 + 1e-12)), Advisor::B);
        assert_eq!(choose(QValues::new(2.0, 1.0)), Advisor::A);
    }

    #[test]
    fn decision_carries_the_values() {
        let decision = Decision::from_values(QValues::new(0.2, 0.3));
        assert_eq!(decision.advisor, Advisor::B);
        assert_eq!(decision.values.b, 0.3);
    }

    #[test]
    fn policy_kind_labels() {
        assert_eq!(PolicyKind::Optimal.label(), "optimal");
        assert_eq!(PolicyKind::Myopic.label(), "myopic");
    }
}
