//! Dense memo table over non-terminal interaction states.
//!
//! States with `rounds_played() <= budget` are ranked into a contiguous index
//! space of size `C(budget + 4, 4)` using the hockey-stick identity, so the
//! table never hashes and never stores terminal states.

use crate::model::{InteractionState, QValues};

#[derive(Debug, Clone)]
pub(crate) struct MemoTable {
    budget: usize,
    slots: Vec<Option<QValues>>,
    filled: usize,
}

impl MemoTable {
    /// Table for a solver whose terminal states sit at `horizon` rounds.
    pub(crate) fn new(horizon: u32) -> Self {
        let budget = horizon.saturating_sub(1) as usize;
        let capacity = if horizon == 0 {
            0
        } else {
            choose(budget + 4, 4)
        };
        Self {
            budget,
            slots: vec![None; capacity],
            filled: 0,
        }
    }

    pub(crate) fn get(&self, state: InteractionState) -> Option<QValues> {
        self.index(state).and_then(|idx| self.slots[idx])
    }

    pub(crate) fn insert(&mut self, state: InteractionState, values: QValues) {
        let Some(idx) = self.index(state) else {
            return;
        };
        if self.slots[idx].replace(values).is_none() {
            self.filled += 1;
        }
    }

    pub(crate) fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.filled = 0;
    }

    pub(crate) fn len(&self) -> usize {
        self.filled
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn index(&self, state: InteractionState) -> Option<usize> {
        if self.slots.is_empty() || state.rounds_played() as usize > self.budget {
            return None;
        }
        Some(rank(self.budget, state))
    }
}

/// Position of `state` in lexicographic order of all `(a, b, c, d)` with
/// `a + b + c + d <= budget`.
fn rank(budget: usize, state: InteractionState) -> usize {
    let (a, b, c, d) = state.as_tuple();
    let (a, b, c, d) = (a as usize, b as usize, c as usize, d as usize);
    let r1 = budget - a;
    let r2 = r1 - b;
    let r3 = r2 - c;
    (choose(budget + 4, 4) - choose(r1 + 4, 4))
        + (choose(r1 + 3, 3) - choose(r2 + 3, 3))
        + (choose(r2 + 2, 2) - choose(r3 + 2, 2))
        + d
}

fn choose(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let mut result = 1usize;
    for i in 0..k {
        result = result * (n - i) / (i + 1);
    }
    result
}
