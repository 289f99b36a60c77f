use advisor_core::belief::{AdvisorPriors, Belief};
use advisor_core::frontier::{self, FrontierCell};
use advisor_core::model::{Advisor, InteractionState, QValues};
use advisor_core::policy::{self, OptimalPolicy};
use advisor_core::simulation::{MonteCarloSimulator, SimulationConfig};
use advisor_core::solver::{Solver, SolverConfig};

const HORIZON: u32 = 20;

fn prior_a() -> Belief {
    Belief::from_pairs(&[(0.8, 0.30), (0.6, 0.30), (0.4, 0.20), (0.2, 0.20)]).unwrap()
}

fn prior_b() -> Belief {
    Belief::from_pairs(&[(0.8, 0.20), (0.6, 0.20), (0.4, 0.30), (0.2, 0.30)]).unwrap()
}

fn study_solver(horizon: u32) -> Solver {
    let priors = AdvisorPriors::new(prior_a(), prior_b());
    Solver::new(SolverConfig::new(priors, horizon).unwrap())
}

#[test]
fn dominant_prior_is_preferred_at_the_start() {
    let mut solver = study_solver(HORIZON);
    let values = solver
        .solve(InteractionState::START, &prior_a(), &prior_b())
        .unwrap();

    assert!(values.a > values.b, "{values:?}");
    assert_eq!(policy::choose(values), Advisor::A);
}

#[test]
fn start_value_beats_committing_to_one_advisor() {
    let mut solver = study_solver(HORIZON);
    let values = solver.solve_initial().unwrap();

    // Always consulting A earns H * E[accuracy_A] in expectation.
    let committed = f64::from(HORIZON) * prior_a().expected_value();
    assert!(values.best() >= committed - 1e-9, "{values:?} < {committed}");
    assert!(values.best() <= f64::from(HORIZON));
}

#[test]
fn terminal_states_have_zero_value() {
    let mut solver = study_solver(HORIZON);
    for state in [
        InteractionState::new(20, 0, 0, 0),
        InteractionState::new(5, 5, 5, 5),
        InteractionState::new(0, 3, 0, 17),
    ] {
        let values = solver.solve_counts(state).unwrap();
        assert_eq!(values, QValues::new(0.0, 0.0));
    }
}

#[test]
fn memoized_values_are_bit_identical() {
    let mut solver = study_solver(HORIZON);
    let first = solver.solve_initial().unwrap();
    let cached = solver.cached_states();
    assert!(solver.is_cached(InteractionState::START));

    let second = solver.solve_initial().unwrap();
    assert_eq!(first.a.to_bits(), second.a.to_bits());
    assert_eq!(first.b.to_bits(), second.b.to_bits());
    assert_eq!(solver.cached_states(), cached);
    assert!(solver.stats().hits >= 1);

    solver.clear();
    assert_eq!(solver.cached_states(), 0);
    let recomputed = solver.solve_initial().unwrap();
    assert_eq!(first.a.to_bits(), recomputed.a.to_bits());
    assert_eq!(first.b.to_bits(), recomputed.b.to_bits());
}

#[test]
fn start_state_reaches_every_non_terminal_state() {
    let mut solver = study_solver(8);
    solver.solve_initial().unwrap();
    assert_eq!(solver.cached_states(), solver.table_capacity());
}

#[test]
fn q_values_are_bounded_by_remaining_rounds() {
    let horizon = 7;
    let mut solver = study_solver(horizon);
    for wins_a in 0..horizon {
        for losses_a in 0..horizon - wins_a {
            for wins_b in 0..horizon - wins_a - losses_a {
                for losses_b in 0..horizon - wins_a - losses_a - wins_b {
                    let state = InteractionState::new(wins_a, losses_a, wins_b, losses_b);
                    let remaining = f64::from(horizon - state.rounds_played());
                    let values = solver.solve_counts(state).unwrap();
                    for q in [values.a, values.b] {
                        assert!(q >= 0.0 && q <= remaining + 1e-9, "{state:?}: {values:?}");
                    }
                }
            }
        }
    }
}

#[test]
fn symmetric_priors_give_equal_values() {
    let priors = AdvisorPriors::new(prior_a(), prior_a());
    let mut solver = Solver::new(SolverConfig::new(priors, HORIZON).unwrap());
    let values = solver.solve_initial().unwrap();
    assert!((values.a - values.b).abs() < 1e-9, "{values:?}");
}

#[test]
fn three_successes_raise_expected_accuracy() {
    let prior = prior_a();
    let posterior = prior
        .update(true)
        .and_then(|belief| belief.update(true))
        .and_then(|belief| belief.update(true))
        .unwrap();
    assert!(posterior.expected_value() > prior.expected_value());
}

#[test]
fn frontier_origin_matches_start_state_gap() {
    let mut solver = study_solver(HORIZON);
    let grid = frontier::sweep(&mut solver, 14).unwrap();
    let values = solver.solve_initial().unwrap();

    assert_eq!(
        grid.cell(0, 0),
        Some(FrontierCell::Value(values.a - values.b))
    );
    assert!(grid.cell(13, 13).is_some_and(|cell| !cell.is_applicable()));
    assert!(grid.cell(13, 6).is_some_and(|cell| cell.is_applicable()));
}

#[test]
fn monte_carlo_scores_beat_chance() {
    let mut solver = study_solver(HORIZON);
    let simulator = MonteCarloSimulator::new(
        solver.config(),
        SimulationConfig {
            runs: 5000,
            seed: 20_240_611,
        },
    )
    .unwrap();

    let report = simulator.run(&mut OptimalPolicy::new(&mut solver)).unwrap();
    assert_eq!(report.records.len(), 5000);
    assert!(report.scores().iter().all(|&score| score <= HORIZON));

    let mean = report.mean_score();
    assert!(mean > 10.0 && mean <= 20.0, "mean score {mean}");
}

#[test]
fn optimal_policy_opens_with_advisor_a() {
    let mut solver = study_solver(HORIZON);
    let simulator =
        MonteCarloSimulator::new(solver.config(), SimulationConfig { runs: 50, seed: 9 }).unwrap();
    let report = simulator.run(&mut OptimalPolicy::new(&mut solver)).unwrap();
    assert!(
        report
            .records
            .iter()
            .all(|record| record.first_choice() == Some(Advisor::A))
    );
}

#[test]
fn simulation_is_deterministic_for_a_seed() {
    let mut solver = study_solver(10);
    let config = SimulationConfig { runs: 200, seed: 77 };
    let simulator = MonteCarloSimulator::new(solver.config(), config).unwrap();

    let first = simulator.run(&mut OptimalPolicy::new(&mut solver)).unwrap();
    solver.clear();
    let second = simulator.run(&mut OptimalPolicy::new(&mut solver)).unwrap();
    assert_eq!(first, second);
}
