//! Discrete distribution over an advisor's latent accuracy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum deviation from 1.0 accepted for a configured prior's total mass.
pub const PRIOR_SUM_TOLERANCE: f64 = 1e-6;

/// One support point: a candidate accuracy and the probability assigned to it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupportPoint {
    pub accuracy: f64,
    pub probability: f64,
}

impl SupportPoint {
    pub const fn new(accuracy: f64, probability: f64) -> Self {
        Self {
            accuracy,
            probability,
        }
    }
}

/// Probability distribution over a fixed set of accuracies.
///
/// Support points keep their configured order. Updates never mutate in place;
/// each observation yields a fresh `Belief`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "Vec<SupportPoint>")]
pub struct Belief {
    points: Vec<SupportPoint>,
}

impl Belief {
    /// Validates and normalizes a configured prior.
    pub fn new(points: Vec<SupportPoint>) -> Result<Self, BeliefError> {
        if points.is_empty() {
            return Err(BeliefError::EmptySupport);
        }

        for (idx, point) in points.iter().enumerate() {
            if !point.accuracy.is_finite() || point.accuracy <= 0.0 || point.accuracy >= 1.0 {
                return Err(BeliefError::AccuracyOutOfRange {
                    accuracy: point.accuracy,
                });
            }
            if !point.probability.is_finite() || !(0.0..=1.0).contains(&point.probability) {
                return Err(BeliefError::ProbabilityOutOfRange {
                    accuracy: point.accuracy,
                    probability: point.probability,
                });
            }
            if points[..idx]
                .iter()
                .any(|earlier| earlier.accuracy == point.accuracy)
            {
                return Err(BeliefError::DuplicateAccuracy {
                    accuracy: point.accuracy,
                });
            }
        }

        let total: f64 = points.iter().map(|point| point.probability).sum();
        if (total - 1.0).abs() > PRIOR_SUM_TOLERANCE {
            return Err(BeliefError::NotNormalized { total });
        }

        let points = points
            .into_iter()
            .map(|point| SupportPoint::new(point.accuracy, point.probability / total))
            .collect();
        Ok(Self { points })
    }

    /// Convenience constructor from `(accuracy, probability)` pairs.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self, BeliefError> {
        Self::new(
            pairs
                .iter()
                .map(|&(accuracy, probability)| SupportPoint::new(accuracy, probability))
                .collect(),
        )
    }

    pub fn points(&self) -> &[SupportPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Probability mass on `accuracy`, or `None` when it is not a support point.
    pub fn probability_of(&self, accuracy: f64) -> Option<f64> {
        self.points
            .iter()
            .find(|point| point.accuracy == accuracy)
            .map(|point| point.probability)
    }

    /// Expected accuracy; the immediate expected reward of consulting this advisor.
    pub fn expected_value(&self) -> f64 {
        self.points
            .iter()
            .map(|point| point.accuracy * point.probability)
            .sum()
    }

    /// Bayesian posterior after observing one success or failure.
    pub fn update(&self, success: bool) -> Result<Belief, BeliefError> {
        let mut total = 0.0;
        let mut points = Vec::with_capacity(self.points.len());
        for point in &self.points {
            let likelihood = if success {
                point.accuracy
            } else {
                1.0 - point.accuracy
            };
            let mass = point.probability * likelihood;
            total += mass;
            points.push(SupportPoint::new(point.accuracy, mass));
        }

        if !total.is_finite() || total <= 0.0 {
            return Err(BeliefError::DegenerateUpdate { success, total });
        }

        for point in &mut points {
            point.probability /= total;
        }
        Ok(Belief { points })
    }

    /// Applies `wins` success updates followed by `losses` failure updates.
    pub fn after_history(&self, wins: u32, losses: u32) -> Result<Belief, BeliefError> {
        let mut belief = self.clone();
        for _ in 0..wins {
            belief = belief.update(true)?;
        }
        for _ in 0..losses {
            belief = belief.update(false)?;
        }
        Ok(belief)
    }

    /// Total probability mass; 1.0 up to rounding.
    pub fn total_mass(&self) -> f64 {
        self.points.iter().map(|point| point.probability).sum()
    }
}

impl TryFrom<Vec<SupportPoint>> for Belief {
    type Error = BeliefError;

    fn try_from(points: Vec<SupportPoint>) -> Result<Self, Self::Error> {
        Belief::new(points)
    }
}

impl From<Belief> for Vec<SupportPoint> {
    fn from(belief: Belief) -> Self {
        belief.points
    }
}

/// Invalid priors and numerically degenerate updates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BeliefError {
    #[error("belief must contain at least one support point")]
    EmptySupport,
    #[error("accuracy {accuracy} must lie strictly between 0 and 1")]
    AccuracyOutOfRange { accuracy: f64 },
    #[error("probability {probability} for accuracy {accuracy} must lie in [0, 1]")]
    ProbabilityOutOfRange { accuracy: f64, probability: f64 },
    #[error("accuracy {accuracy} appears more than once")]
    DuplicateAccuracy { accuracy: f64 },
    #[error("probabilities sum to {total}, expected 1")]
    NotNormalized { total: f64 },
    #[error("posterior normalization failed after {} (total mass {total})", outcome_label(.success))]
    DegenerateUpdate { success: bool, total: f64 },
}

fn outcome_label(success: &bool) -> &'static str {
    if *success { "success" } else { "failure" }
}
