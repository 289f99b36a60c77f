use serde::{Deserialize, Serialize};

use super::advisor::Advisor;

/// Expected cumulative future reward of choosing each advisor next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QValues {
    pub a: f64,
    pub b: f64,
}

impl QValues {
    pub const TERMINAL: QValues = QValues::new(0.0, 0.0);

    pub const fn new(a: f64, b: f64) -> Self {
        Self { a, b }
    }

    pub const fn get(&self, advisor: Advisor) -> f64 {
        match advisor {
            Advisor::A => self.a,
            Advisor::B => self.b,
        }
    }

    /// Value of acting optimally from the state these values belong to.
    pub fn best(&self) -> f64 {
        self.a.max(self.b)
    }

    /// `Q_A - Q_B`: positive favours staying with A.
    pub fn gap(&self) -> f64 {
        self.a - self.b
    }
}
