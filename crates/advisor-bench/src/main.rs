use std::path::PathBuf;

use clap::Parser;

use advisor_bench::config::{BenchmarkConfig, ResolvedOutputs};
use advisor_bench::experiment::ExperimentRunner;
use advisor_bench::logging::init_logging;
use advisor_core::AppInfo;

/// Batch experiment harness for the two-advisor bandit.
#[derive(Debug, Parser)]
#[command(
    name = "advisor-bench",
    author,
    version,
    about = "Solve, sweep and simulate the two-advisor finite-horizon bandit"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/advisor.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of Monte Carlo runs per policy.
    #[arg(long, value_name = "RUNS")]
    runs: Option<usize>,

    /// Override the master RNG seed.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Override the number of rounds.
    #[arg(long, value_name = "H")]
    horizon: Option<u32>,

    /// Override the frontier grid size.
    #[arg(long, value_name = "SIZE")]
    grid_size: Option<usize>,

    /// Exit after validating the configuration (nothing is solved).
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = BenchmarkConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(runs) = cli.runs {
        config.simulation.runs = runs;
    }

    if let Some(seed) = cli.seed {
        config.simulation.seed = seed;
    }

    if let Some(horizon) = cli.horizon {
        config.solver.horizon = horizon;
    }

    if let Some(grid_size) = cli.grid_size {
        config.frontier.grid_size = grid_size;
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let run_id = config.run_id.clone();
    let horizon = config.solver.horizon;
    let grid_size = config.frontier.grid_size;
    let runs = config.simulation.runs;
    let policy_count = config.simulation.policies.len();

    println!("{} ({}) v{}", AppInfo::name(), AppInfo::codename(), AppInfo::version());
    println!(
        "Loaded configuration '{run_id}': horizon {horizon}, {grid_size}x{grid_size} frontier, {runs} runs for {policy_count} polic{}",
        if policy_count == 1 { "y" } else { "ies" }
    );

    let _logging_guard = init_logging(&config.logging, &outputs)?;
    let runner = ExperimentRunner::new(config, outputs)?;

    if cli.validate_only {
        println!("Validation-only mode: experiment execution skipped.");
        return Ok(());
    }

    let summary = runner.run()?;
    println!(
        "Initial state: Q_A = {:.4}, Q_B = {:.4} → consult advisor {} first",
        summary.initial_values.a, summary.initial_values.b, summary.initial_decision
    );
    for report in &summary.analytics.policies {
        println!(
            "  {:<8} mean score {:.3} [{:.3}, {:.3}]",
            report.policy.label(),
            report.mean_score,
            report.ci95.0,
            report.ci95.1
        );
    }
    println!(
        "Experiment complete for '{run_id}': {} rows at {}",
        summary.rows_written,
        summary.runs_path.display()
    );
    println!("Frontier grid: {}", summary.frontier_path.display());
    println!("Summary table: {}", summary.summary_path.display());
    if let Some(plot_path) = summary.frontier_plot.as_ref() {
        println!("Frontier heatmap: {}", plot_path.display());
    }
    if let Some(plot_path) = summary.score_plot.as_ref() {
        println!("Score histogram: {}", plot_path.display());
    }
    if let Some(telemetry_path) = summary.telemetry_path.as_ref() {
        println!("Telemetry log: {}", telemetry_path.display());
    }

    Ok(())
}
