use serde::{Deserialize, Serialize};

use super::advisor::Advisor;

/// Win/loss counts for both advisors; the memoization key of the solver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InteractionState {
    pub wins_a: u32,
    pub losses_a: u32,
    pub wins_b: u32,
    pub losses_b: u32,
}

impl InteractionState {
    pub const START: InteractionState = InteractionState::new(0, 0, 0, 0);

    pub const fn new(wins_a: u32, losses_a: u32, wins_b: u32, losses_b: u32) -> Self {
        Self {
            wins_a,
            losses_a,
            wins_b,
            losses_b,
        }
    }

    pub const fn rounds_played(&self) -> u32 {
        self.wins_a
            .saturating_add(self.losses_a)
            .saturating_add(self.wins_b)
            .saturating_add(self.losses_b)
    }

    pub const fn wins(&self, advisor: Advisor) -> u32 {
        match advisor {
            Advisor::A => self.wins_a,
            Advisor::B => self.wins_b,
        }
    }

    pub const fn losses(&self, advisor: Advisor) -> u32 {
        match advisor {
            Advisor::A => self.losses_a,
            Advisor::B => self.losses_b,
        }
    }

    /// Returns the state after one more interaction with `advisor`.
    pub const fn record(self, advisor: Advisor, success: bool) -> Self {
        let mut next = self;
        match (advisor, success) {
            (Advisor::A, true) => next.wins_a += 1,
            (Advisor::A, false) => next.losses_a += 1,
            (Advisor::B, true) => next.wins_b += 1,
            (Advisor::B, false) => next.losses_b += 1,
        }
        next
    }

    pub const fn as_tuple(&self) -> (u32, u32, u32, u32) {
        (self.wins_a, self.losses_a, self.wins_b, self.losses_b)
    }
}
