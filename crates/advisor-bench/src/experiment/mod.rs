mod rows;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use advisor_core::frontier::{self, FrontierError, FrontierGrid};
use advisor_core::model::{Advisor, QValues};
use advisor_core::policy::{self, MyopicPolicy, OptimalPolicy, PolicyKind};
use advisor_core::simulation::{
    MonteCarloSimulator, SimulationConfig, SimulationError, SimulationReport,
};
use advisor_core::solver::{Solver, SolverConfig, SolverError};
use thiserror::Error;
use tracing::{Level, event};

use crate::analytics::{AnalyticsCollector, AnalyticsError, AnalyticsSummary};
use crate::config::{BenchmarkConfig, ResolvedOutputs, ValidationError};
use crate::logging::TELEMETRY_FILE;
use crate::report::{self, ReportError};

use rows::write_run_rows;

/// Primary entry point for one experiment: solve, sweep, simulate, report.
pub struct ExperimentRunner {
    config: BenchmarkConfig,
    outputs: ResolvedOutputs,
    solver_config: SolverConfig,
    logging_enabled: bool,
}

/// Summary details returned after a run.
#[derive(Debug)]
pub struct RunSummary {
    pub initial_values: QValues,
    pub initial_decision: Advisor,
    pub runs: usize,
    pub policies: Vec<PolicyKind>,
    pub rows_written: usize,
    pub cached_states: usize,
    pub runs_path: PathBuf,
    pub frontier_path: PathBuf,
    pub summary_path: PathBuf,
    pub frontier_plot: Option<PathBuf>,
    pub score_plot: Option<PathBuf>,
    pub telemetry_path: Option<PathBuf>,
    pub analytics: AnalyticsSummary,
}

impl ExperimentRunner {
    /// Build a runner from a validated configuration.
    pub fn new(config: BenchmarkConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let solver_config = config.solver.solver_config()?;
        Ok(Self {
            logging_enabled: config.logging.enable_structured,
            config,
            outputs,
            solver_config,
        })
    }

    pub fn solver_config(&self) -> &SolverConfig {
        &self.solver_config
    }

    /// Execute the experiment, writing every artifact to disk.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.runs_jsonl.parent())?;
        ensure_parent(self.outputs.frontier_json.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;
        if !self.outputs.plots_dir.as_os_str().is_empty() {
            fs::create_dir_all(&self.outputs.plots_dir)?;
        }

        let run_id = self.config.run_id.as_str();
        let mut solver = Solver::new(self.solver_config.clone());

        let started = Instant::now();
        let initial_values = solver.solve_initial()?;
        let initial_decision = policy::choose(initial_values);
        event!(
            target: "advisor_bench::experiment",
            Level::INFO,
            run_id,
            q_a = initial_values.a,
            q_b = initial_values.b,
            decision = initial_decision.label(),
            symmetric_priors = self.solver_config.priors().is_symmetric(),
            cached_states = solver.cached_states() as u64,
            elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0,
            "initial state solved"
        );

        let grid = frontier::sweep(&mut solver, self.config.frontier.grid_size)?;
        report::write_frontier_json(&self.outputs.frontier_json, run_id, &grid)?;
        log_frontier(run_id, &grid);

        let simulator = MonteCarloSimulator::new(
            &self.solver_config,
            SimulationConfig {
                runs: self.config.simulation.runs,
                seed: self.config.simulation.seed,
            },
        )?;

        let mut writer = BufWriter::new(File::create(&self.outputs.runs_jsonl)?);
        let mut analytics = AnalyticsCollector::new(&self.config)?;
        let mut rows_written = 0usize;
        for &kind in &self.config.simulation.policies {
            let started = Instant::now();
            let report = simulate(&simulator, &mut solver, kind)?;
            analytics.record_report(&report)?;
            rows_written += write_run_rows(&mut writer, run_id, &report)?;

            if self.logging_enabled && tracing::enabled!(Level::INFO) {
                event!(
                    target: "advisor_bench::experiment",
                    Level::INFO,
                    run_id,
                    policy = kind.label(),
                    runs = report.records.len() as u64,
                    mean_score = report.mean_score(),
                    elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0,
                    "policy simulated"
                );
            }
        }
        writer.flush()?;

        let summary = analytics.finalize(initial_values)?;
        summary.write_markdown(&self.outputs.summary_md, &grid)?;

        let frontier_plot = warn_on_plot_error(report::render_frontier_heatmap(
            &self.outputs.plots_dir,
            &grid,
        ));
        let plotted = summary
            .policy(PolicyKind::Optimal)
            .or_else(|| summary.policies.first());
        let score_plot = plotted.and_then(|policy_report| {
            warn_on_plot_error(report::render_score_histogram(
                &self.outputs.plots_dir,
                policy_report,
                self.solver_config.horizon(),
            ))
        });

        let telemetry_path = self
            .logging_enabled
            .then(|| self.outputs.summary_dir().join(TELEMETRY_FILE));

        Ok(RunSummary {
            initial_values,
            initial_decision,
            runs: self.config.simulation.runs,
            policies: self.config.simulation.policies.clone(),
            rows_written,
            cached_states: solver.cached_states(),
            runs_path: self.outputs.runs_jsonl.clone(),
            frontier_path: self.outputs.frontier_json.clone(),
            summary_path: self.outputs.summary_md.clone(),
            frontier_plot,
            score_plot,
            telemetry_path,
            analytics: summary,
        })
    }
}

fn simulate(
    simulator: &MonteCarloSimulator,
    solver: &mut Solver,
    kind: PolicyKind,
) -> Result<SimulationReport, SimulationError> {
    match kind {
        PolicyKind::Optimal => simulator.run(&mut OptimalPolicy::new(solver)),
        PolicyKind::Myopic => simulator.run(&mut MyopicPolicy),
    }
}

fn log_frontier(run_id: &str, grid: &FrontierGrid) {
    for (wins, threshold) in grid.switch_thresholds().into_iter().enumerate() {
        event!(
            target: "advisor_bench::experiment",
            Level::DEBUG,
            run_id,
            wins = wins as u64,
            switch_at_losses = threshold.map(|losses| losses as i64).unwrap_or(-1),
            "frontier threshold"
        );
    }
}

fn warn_on_plot_error(result: Result<PathBuf, ReportError>) -> Option<PathBuf> {
    match result {
        Ok(path) => Some(path),
        Err(err) => {
            eprintln!("WARN: {}", err);
            event!(
                target: "advisor_bench::experiment",
                Level::WARN,
                error = %err,
                "plot skipped"
            );
            None
        }
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),
    #[error("solver error: {0}")]
    Solver(#[from] SolverError),
    #[error("frontier error: {0}")]
    Frontier(#[from] FrontierError),
    #[error("simulation error: {0}")]
    Simulation(#[from] SimulationError),
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
    #[error("report error: {0}")]
    Report(#[from] ReportError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialisation error: {0}")]
    Serialization(#[from] serde_json::Error),
}
