//! Property-based tests for Bayesian belief updates.

use advisor_core::belief::{Belief, SupportPoint};
use proptest::prelude::*;

/// Tolerance for floating point comparisons.
const TOL: f64 = 1e-9;

fn belief_strategy() -> impl Strategy<Value = Belief> {
    prop::collection::btree_set(1u32..100, 1..6)
        .prop_flat_map(|accuracies| {
            let len = accuracies.len();
            (Just(accuracies), prop::collection::vec(0.05f64..1.0, len))
        })
        .prop_map(|(accuracies, weights)| {
            let total: f64 = weights.iter().sum();
            let points = accuracies
                .into_iter()
                .zip(weights)
                .map(|(percent, weight)| SupportPoint::new(f64::from(percent) / 100.0, weight / total))
                .collect();
            Belief::new(points).expect("generated prior is valid")
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Both posteriors stay normalized.
    #[test]
    fn updates_stay_normalized(belief in belief_strategy()) {
        for success in [true, false] {
            let posterior = belief.update(success).unwrap();
            prop_assert!((posterior.total_mass() - 1.0).abs() <= TOL);
            prop_assert!(posterior.points().iter().all(|p| p.probability >= 0.0));
        }
    }

    /// Only the number of successes and failures matters, not their order.
    #[test]
    fn update_order_is_irrelevant(
        belief in belief_strategy(),
        outcomes in prop::collection::vec(any::<bool>(), 0..30),
    ) {
        let mut sequential = belief.clone();
        for &success in &outcomes {
            sequential = sequential.update(success).unwrap();
        }

        let wins = outcomes.iter().filter(|&&success| success).count() as u32;
        let losses = outcomes.len() as u32 - wins;
        let batched = belief.after_history(wins, losses).unwrap();

        for (lhs, rhs) in sequential.points().iter().zip(batched.points()) {
            prop_assert_eq!(lhs.accuracy, rhs.accuracy);
            prop_assert!((lhs.probability - rhs.probability).abs() <= TOL);
        }
        prop_assert!((sequential.expected_value() - batched.expected_value()).abs() <= TOL);
    }

    /// A success never lowers the expected accuracy and a failure never raises it.
    #[test]
    fn outcomes_move_expectation_monotonically(belief in belief_strategy()) {
        let prior = belief.expected_value();
        prop_assert!(belief.update(true).unwrap().expected_value() >= prior - TOL);
        prop_assert!(belief.update(false).unwrap().expected_value() <= prior + TOL);
    }
}
