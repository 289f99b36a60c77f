use super::{Decision, Policy, PolicyContext, PolicyKind};
use crate::model::{Advisor, QValues};
use crate::solver::{Solver, SolverConfig, SolverError};

/// Follows the solver: consults whichever advisor has the larger Q-value.
pub struct OptimalPolicy<'s> {
    solver: &'s mut Solver,
}

impl<'s> OptimalPolicy<'s> {
    pub fn new(solver: &'s mut Solver) -> Self {
        Self { solver }
    }
}

impl Policy for OptimalPolicy<'_> {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Optimal
    }

    fn decide(&mut self, ctx: &PolicyContext<'_>) -> Result<Decision, SolverError> {
        let values = self.solver.solve(ctx.state, ctx.belief_a, ctx.belief_b)?;
        Ok(Decision::from_values(values))
    }

    fn solver_config(&self) -> Option<&SolverConfig> {
        Some(self.solver.config())
    }
}

/// Exploits the current beliefs only; the scores are immediate expected accuracies.
#[derive(Debug, Default, Clone, Copy)]
pub struct MyopicPolicy;

impl Policy for MyopicPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Myopic
    }

    fn decide(&mut self, ctx: &PolicyContext<'_>) -> Result<Decision, SolverError> {
        let values = QValues::new(
            ctx.belief(Advisor::A).expected_value(),
            ctx.belief(Advisor::B).expected_value(),
        );
        Ok(Decision::from_values(values))
    }
}
