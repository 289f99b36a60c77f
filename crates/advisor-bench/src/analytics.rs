use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use advisor_core::belief::{AdvisorPriors, Belief};
use advisor_core::frontier::FrontierGrid;
use advisor_core::model::{Advisor, QValues};
use advisor_core::policy::{self, PolicyKind};
use advisor_core::simulation::SimulationReport;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use crate::config::BenchmarkConfig;

const CONFIDENCE_Z: f64 = 1.96; // 95% CI

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("baseline policy '{0}' not present in simulation results")]
    MissingBaseline(&'static str),
    #[error("policy '{0}' simulated but missing from configuration")]
    UnknownPolicy(&'static str),
    #[error("policy '{policy}' has {found} runs but the baseline has {expected}")]
    UnpairedRuns {
        policy: &'static str,
        found: usize,
        expected: usize,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("statistics failure: {0}")]
    Statistics(String),
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Collects simulation reports and turns them into summary statistics.
pub struct AnalyticsCollector {
    run_id: String,
    horizon: u32,
    grid_size: usize,
    runs: usize,
    seed: u64,
    priors: AdvisorPriors,
    baseline: Option<PolicyKind>,
    order: Vec<PolicyKind>,
    scores: HashMap<PolicyKind, ScoreAccumulator>,
}

impl AnalyticsCollector {
    pub fn new(config: &BenchmarkConfig) -> Result<Self, AnalyticsError> {
        let priors = config
            .solver
            .priors
            .advisor_priors()
            .map_err(|err| AnalyticsError::Config(err.to_string()))?;

        let horizon = config.solver.horizon;
        let scores = config
            .simulation
            .policies
            .iter()
            .map(|&kind| (kind, ScoreAccumulator::new(horizon)))
            .collect();

        Ok(Self {
            run_id: config.run_id.clone(),
            horizon,
            grid_size: config.frontier.grid_size,
            runs: config.simulation.runs,
            seed: config.simulation.seed,
            priors,
            baseline: config.simulation.baseline,
            order: config.simulation.policies.clone(),
            scores,
        })
    }

    pub fn record_report(&mut self, report: &SimulationReport) -> Result<(), AnalyticsError> {
        let acc = self
            .scores
            .get_mut(&report.policy)
            .ok_or(AnalyticsError::UnknownPolicy(report.policy.label()))?;
        for record in &report.records {
            acc.record(
                record.score,
                record.first_choice() == Some(Advisor::A),
                record.switches(),
            );
        }
        Ok(())
    }

    pub fn finalize(mut self, initial: QValues) -> Result<AnalyticsSummary, AnalyticsError> {
        let baseline_scores = match self.baseline {
            Some(kind) => Some(
                self.scores
                    .get(&kind)
                    .filter(|acc| acc.runs() > 0)
                    .map(|acc| acc.scores.clone())
                    .ok_or(AnalyticsError::MissingBaseline(kind.label()))?,
            ),
            None => None,
        };

        let mut policies = Vec::new();
        let mut comparisons = Vec::new();
        for kind in &self.order {
            let Some(acc) = self.scores.remove(kind) else {
                continue;
            };

            if let (Some(baseline), Some(base_scores)) = (self.baseline, &baseline_scores) {
                if *kind != baseline {
                    if acc.scores.len() != base_scores.len() {
                        return Err(AnalyticsError::UnpairedRuns {
                            policy: kind.label(),
                            found: acc.scores.len(),
                            expected: base_scores.len(),
                        });
                    }
                    let diffs: Vec<f64> = acc
                        .scores
                        .iter()
                        .zip(base_scores)
                        .map(|(&score, &base)| f64::from(score) - f64::from(base))
                        .collect();
                    let mean_delta = mean(&diffs);
                    let (p_value, sample_size) = wilcoxon_signed_rank(&diffs)?;
                    comparisons.push(ComparisonReport {
                        policy: *kind,
                        baseline,
                        mean_delta,
                        p_value,
                        sample_size,
                    });
                }
            }

            policies.push(acc.into_report(*kind));
        }

        Ok(AnalyticsSummary {
            run_id: self.run_id,
            horizon: self.horizon,
            grid_size: self.grid_size,
            runs: self.runs,
            seed: self.seed,
            priors: self.priors,
            initial,
            initial_decision: policy::choose(initial),
            baseline: self.baseline,
            policies,
            comparisons,
        })
    }
}

struct ScoreAccumulator {
    scores: Vec<u32>,
    histogram: Vec<usize>,
    first_choice_a: usize,
    total_switches: usize,
}

impl ScoreAccumulator {
    fn new(horizon: u32) -> Self {
        Self {
            scores: Vec::new(),
            histogram: vec![0; horizon as usize + 1],
            first_choice_a: 0,
            total_switches: 0,
        }
    }

    fn runs(&self) -> usize {
        self.scores.len()
    }

    fn record(&mut self, score: u32, first_choice_a: bool, switches: usize) {
        self.scores.push(score);
        if let Some(slot) = self.histogram.get_mut(score as usize) {
            *slot += 1;
        }
        if first_choice_a {
            self.first_choice_a += 1;
        }
        self.total_switches += switches;
    }

    fn into_report(self, policy: PolicyKind) -> PolicyReport {
        let runs = self.scores.len();
        let points: Vec<f64> = self.scores.iter().map(|&score| f64::from(score)).collect();
        let per_run = |count: usize| {
            if runs == 0 {
                0.0
            } else {
                count as f64 / runs as f64
            }
        };

        PolicyReport {
            policy,
            runs,
            mean_score: mean(&points),
            ci95: confidence_interval(&points),
            min_score: self.scores.iter().copied().min().unwrap_or(0),
            max_score: self.scores.iter().copied().max().unwrap_or(0),
            first_choice_a_share: per_run(self.first_choice_a),
            mean_switches: per_run(self.total_switches),
            histogram: self.histogram,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PolicyReport {
    pub policy: PolicyKind,
    pub runs: usize,
    pub mean_score: f64,
    pub ci95: (f64, f64),
    pub min_score: u32,
    pub max_score: u32,
    pub first_choice_a_share: f64,
    pub mean_switches: f64,
    /// Run counts per score, indexed `0..=horizon`.
    pub histogram: Vec<usize>,
}

impl PolicyReport {
    /// Histogram as percentages of all runs.
    pub fn histogram_percent(&self) -> Vec<f64> {
        let runs = self.runs.max(1) as f64;
        self.histogram
            .iter()
            .map(|&count| count as f64 * 100.0 / runs)
            .collect()
    }
}

/// Paired comparison of a policy against the baseline on identical hidden accuracies.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub policy: PolicyKind,
    pub baseline: PolicyKind,
    pub mean_delta: f64,
    pub p_value: f64,
    pub sample_size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSummary {
    pub run_id: String,
    pub horizon: u32,
    pub grid_size: usize,
    pub runs: usize,
    pub seed: u64,
    pub priors: AdvisorPriors,
    pub initial: QValues,
    pub initial_decision: Advisor,
    pub baseline: Option<PolicyKind>,
    pub policies: Vec<PolicyReport>,
    pub comparisons: Vec<ComparisonReport>,
}

impl AnalyticsSummary {
    pub fn policy(&self, kind: PolicyKind) -> Option<&PolicyReport> {
        self.policies.iter().find(|report| report.policy == kind)
    }

    pub fn render_markdown(&self, frontier: &FrontierGrid) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Advisor Experiment Summary\n");
        let _ = writeln!(
            out,
            "Run `{}`: horizon {}, frontier grid {}x{}, {} runs per policy, seed {}\n",
            self.run_id, self.horizon, self.grid_size, self.grid_size, self.runs, self.seed
        );

        out.push_str("## Priors\n\n");
        out.push_str("| Advisor | Support (accuracy: probability) | Expected accuracy |\n");
        out.push_str("|---------|----------------------------------|-------------------|\n");
        for advisor in Advisor::BOTH {
            let belief = self.priors.get(advisor);
            let _ = writeln!(
                out,
                "| {advisor} | {support} | {ev:.3} |",
                support = format_support(belief),
                ev = belief.expected_value(),
            );
        }

        out.push_str("\n## Initial decision\n\n");
        let _ = writeln!(
            out,
            "Q_A = {:.4}, Q_B = {:.4}, gap = {:+.4}: consult advisor {} first.\n",
            self.initial.a,
            self.initial.b,
            self.initial.gap(),
            self.initial_decision
        );

        out.push_str("## Patience frontier\n\n");
        out.push_str(
            "Cells show Q_A - Q_B after the given successes (columns) and failures (rows) \
             with advisor A while B is untried. Negative values favour switching.\n\n",
        );
        write_frontier_table(&mut out, frontier);

        out.push_str("\n## Score statistics\n\n");
        out.push_str(
            "| Policy | Runs | Mean | 95% CI | Min | Max | First pick A | Avg switches |\n",
        );
        out.push_str(
            "|--------|------|------|--------|-----|-----|--------------|--------------|\n",
        );
        for report in &self.policies {
            let _ = writeln!(
                out,
                "| {policy} | {runs} | {mean:.3} | [{lo:.3}, {hi:.3}] | {min} | {max} | {first:.1}% | {switches:.2} |",
                policy = report.policy.label(),
                runs = report.runs,
                mean = report.mean_score,
                lo = report.ci95.0,
                hi = report.ci95.1,
                min = report.min_score,
                max = report.max_score,
                first = report.first_choice_a_share * 100.0,
                switches = report.mean_switches,
            );
        }

        if let Some(baseline) = self.baseline {
            let _ = writeln!(
                out,
                "\n## Comparison vs baseline ({})\n",
                baseline.label()
            );
            out.push_str("| Policy | Mean Δ score | Non-zero pairs | p-value (Wilcoxon) |\n");
            out.push_str("|--------|--------------|----------------|--------------------|\n");
            for comparison in &self.comparisons {
                let _ = writeln!(
                    out,
                    "| {} | {:+.3} | {} | {:.4} |",
                    comparison.policy.label(),
                    comparison.mean_delta,
                    comparison.sample_size,
                    comparison.p_value
                );
            }
        }

        out.push_str("\n## Score distribution (% of runs)\n\n");
        out.push_str("| Score |");
        for report in &self.policies {
            let _ = write!(out, " {} |", report.policy.label());
        }
        out.push_str("\n|-------|");
        for _ in &self.policies {
            out.push_str("------|");
        }
        out.push('\n');
        let percents: Vec<Vec<f64>> = self
            .policies
            .iter()
            .map(PolicyReport::histogram_percent)
            .collect();
        for score in 0..=self.horizon as usize {
            let _ = write!(out, "| {score} |");
            for column in &percents {
                let _ = write!(out, " {:.1} |", column.get(score).copied().unwrap_or(0.0));
            }
            out.push('\n');
        }

        out
    }

    pub fn write_markdown(
        &self,
        path: impl AsRef<Path>,
        frontier: &FrontierGrid,
    ) -> Result<(), AnalyticsError> {
        fs::write(path.as_ref(), self.render_markdown(frontier)).map_err(|e| {
            AnalyticsError::Io {
                context: "writing summary markdown",
                source: e,
            }
        })
    }
}

fn format_support(belief: &Belief) -> String {
    belief
        .points()
        .iter()
        .map(|point| format!("{:.2}: {:.2}", point.accuracy, point.probability))
        .collect::<Vec<_>>()
        .join(", ")
}

fn write_frontier_table(out: &mut String, frontier: &FrontierGrid) {
    let size = frontier.grid_size();
    out.push_str("| losses \\ wins |");
    for wins in 0..size {
        let _ = write!(out, " {wins} |");
    }
    out.push_str("\n|---|");
    for _ in 0..size {
        out.push_str("---|");
    }
    out.push('\n');

    for (losses, row) in frontier.rows().iter().enumerate() {
        let _ = write!(out, "| {losses} |");
        for cell in row {
            match cell.value() {
                Some(gap) => {
                    let _ = write!(out, " {gap:+.3} |");
                }
                None => out.push_str(" n/a |"),
            }
        }
        out.push('\n');
    }

    out.push_str("| switch at |");
    for threshold in frontier.switch_thresholds() {
        match threshold {
            Some(losses) => {
                let _ = write!(out, " {losses} |");
            }
            None => out.push_str(" - |"),
        }
    }
    out.push('\n');
}

fn mean(points: &[f64]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    points.iter().sum::<f64>() / points.len() as f64
}

fn confidence_interval(points: &[f64]) -> (f64, f64) {
    if points.is_empty() {
        return (0.0, 0.0);
    }
    let mean = mean(points);
    if points.len() == 1 {
        return (mean, mean);
    }
    let variance = points
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (points.len() as f64 - 1.0);
    let std_error = (variance / points.len() as f64).sqrt();
    let margin = CONFIDENCE_Z * std_error;
    (mean - margin, mean + margin)
}

/// Two-sided Wilcoxon signed-rank test (normal approximation, tie corrected).
///
/// Returns the p-value and the number of non-zero differences used.
fn wilcoxon_signed_rank(diffs: &[f64]) -> Result<(f64, usize), AnalyticsError> {
    let mut paired: Vec<(f64, f64)> = diffs
        .iter()
        .filter(|d| d.abs() > f64::EPSILON)
        .map(|d| (d.abs(), d.signum()))
        .collect();
    let n = paired.len();
    if n == 0 {
        return Ok((1.0, 0));
    }
    paired.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut w_plus = 0.0;
    let mut w_minus = 0.0;
    let mut tie_adjustment = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && (paired[j + 1].0 - paired[i].0).abs() < 1e-12 {
            j += 1;
        }
        let rank = (i + j + 2) as f64 / 2.0;
        for &(_, sign) in &paired[i..=j] {
            if sign > 0.0 {
                w_plus += rank;
            } else {
                w_minus += rank;
            }
        }
        let ties = (j - i + 1) as f64;
        if ties > 1.0 {
            tie_adjustment += (ties.powi(3) - ties) / 48.0;
        }
        i = j + 1;
    }

    let w = f64::min(w_plus, w_minus);
    let n_f = n as f64;
    let mean_w = n_f * (n_f + 1.0) / 4.0;
    let variance_w = n_f * (n_f + 1.0) * (2.0 * n_f + 1.0) / 24.0 - tie_adjustment;
    if variance_w <= 0.0 {
        return Ok((1.0, n));
    }

    let z = ((w - mean_w).abs() - 0.5).max(0.0) / variance_w.sqrt();
    let normal =
        Normal::new(0.0, 1.0).map_err(|err| AnalyticsError::Statistics(err.to_string()))?;
    let p = 2.0 * (1.0 - normal.cdf(z));
    Ok((p.clamp(0.0, 1.0), n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_interval_brackets_the_mean() {
        let (lo, hi) = confidence_interval(&[10.0, 12.0, 14.0, 16.0]);
        assert!(lo < 13.0 && hi > 13.0);
        assert!(((lo + hi) / 2.0 - 13.0).abs() < 1e-12);
        assert_eq!(confidence_interval(&[7.0]), (7.0, 7.0));
        assert_eq!(confidence_interval(&[]), (0.0, 0.0));
    }

    #[test]
    fn wilcoxon_detects_consistent_improvement() {
        let diffs: Vec<f64> = (1..=20).map(f64::from).collect();
        let (p, n) = wilcoxon_signed_rank(&diffs).unwrap();
        assert_eq!(n, 20);
        assert!(p < 0.01, "p = {p}");
    }

    #[test]
    fn wilcoxon_ignores_zero_differences() {
        assert_eq!(wilcoxon_signed_rank(&[0.0, 0.0, 0.0]).unwrap(), (1.0, 0));
    }

    #[test]
    fn wilcoxon_balanced_differences_are_not_significant() {
        let diffs = [1.0, -1.0, 2.0, -2.0, 3.0, -3.0];
        let (p, n) = wilcoxon_signed_rank(&diffs).unwrap();
        assert_eq!(n, 6);
        assert!(p > 0.5, "p = {p}");
    }

    #[test]
    fn histogram_percentages_sum_to_one_hundred() {
        let mut acc = ScoreAccumulator::new(3);
        for (score, first_a) in [(0, true), (2, true), (2, false), (3, true)] {
            acc.record(score, first_a, 1);
        }
        let report = acc.into_report(PolicyKind::Myopic);
        assert_eq!(report.histogram, vec![1, 0, 2, 1]);
        assert_eq!(report.min_score, 0);
        assert_eq!(report.max_score, 3);
        assert!((report.first_choice_a_share - 0.75).abs() < 1e-12);
        let total: f64 = report.histogram_percent().iter().sum();
        assert!((total - 100.0).abs() < 1e-9);
    }
}
