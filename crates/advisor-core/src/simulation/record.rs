use serde::Serialize;

use crate::model::{Advisor, QValues};
use crate::policy::PolicyKind;

/// One round of a simulated run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoundRecord {
    pub round: u32,
    pub advisor: Advisor,
    pub success: bool,
    /// Scores the policy compared when choosing.
    pub values: QValues,
}

/// A full simulated run against fixed hidden accuracies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationRecord {
    pub run_index: usize,
    pub seed: u64,
    pub true_accuracy_a: f64,
    pub true_accuracy_b: f64,
    pub trace: Vec<RoundRecord>,
    pub score: u32,
}

impl SimulationRecord {
    pub fn true_accuracy(&self, advisor: Advisor) -> f64 {
        match advisor {
            Advisor::A => self.true_accuracy_a,
            Advisor::B => self.true_accuracy_b,
        }
    }

    pub fn choices(&self) -> impl Iterator<Item = Advisor> + '_ {
        self.trace.iter().map(|round| round.advisor)
    }

    /// Choices as a compact string such as `"AABBB"`.
    pub fn choice_string(&self) -> String {
        self.choices().map(|advisor| advisor.to_string()).collect()
    }

    pub fn times_chosen(&self, advisor: Advisor) -> usize {
        self.choices().filter(|choice| *choice == advisor).count()
    }

    pub fn first_choice(&self) -> Option<Advisor> {
        self.trace.first().map(|round| round.advisor)
    }

    /// Number of times the policy changed advisor between consecutive rounds.
    pub fn switches(&self) -> usize {
        self.trace
            .windows(2)
            .filter(|pair| pair[0].advisor != pair[1].advisor)
            .count()
    }
}

/// All runs of one simulation batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub policy: PolicyKind,
    pub horizon: u32,
    pub seed: u64,
    pub records: Vec<SimulationRecord>,
}

impl SimulationReport {
    pub fn scores(&self) -> Vec<u32> {
        self.records.iter().map(|record| record.score).collect()
    }

    pub fn mean_score(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        let total: u64 = self.records.iter().map(|record| u64::from(record.score)).sum();
        total as f64 / self.records.len() as f64
    }

    /// Run counts per score, indexed `0..=horizon`.
    pub fn histogram(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.horizon as usize + 1];
        for record in &self.records {
            if let Some(slot) = counts.get_mut(record.score as usize) {
                *slot += 1;
            }
        }
        counts
    }
}
