use std::fs;
use std::path::Path;

use advisor_bench::config::BenchmarkConfig;
use advisor_bench::experiment::{ExperimentRunner, RunSummary};
use advisor_core::model::Advisor;
use advisor_core::policy::PolicyKind;
use sha2::{Digest, Sha256};
use tempfile::tempdir;

fn load_config(output_dir: &Path) -> BenchmarkConfig {
    let yaml = format!(
        r#"
run_id: "test_smoke"
solver:
  horizon: 6
  priors:
    a:
      - {{ accuracy: 0.8, probability: 0.30 }}
      - {{ accuracy: 0.6, probability: 0.30 }}
      - {{ accuracy: 0.4, probability: 0.20 }}
      - {{ accuracy: 0.2, probability: 0.20 }}
    b:
      - {{ accuracy: 0.8, probability: 0.20 }}
      - {{ accuracy: 0.6, probability: 0.20 }}
      - {{ accuracy: 0.4, probability: 0.30 }}
      - {{ accuracy: 0.2, probability: 0.30 }}
frontier:
  grid_size: 7
simulation:
  runs: 40
  seed: 4242
  policies: [optimal, myopic]
  baseline: myopic
outputs:
  runs_jsonl: "{runs}"
  frontier_json: "{frontier}"
  summary_md: "{summary}"
  plots_dir: "{plots}"
logging:
  enable_structured: false
"#,
        runs = output_dir.join("runs.jsonl").display(),
        frontier = output_dir.join("frontier.json").display(),
        summary = output_dir.join("summary.md").display(),
        plots = output_dir.join("plots").display()
    );

    let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("valid yaml");
    cfg.validate().expect("config validates");
    cfg
}

fn run_experiment(output_dir: &Path) -> RunSummary {
    let config = load_config(output_dir);
    let outputs = config.resolved_outputs();
    let runner = ExperimentRunner::new(config, outputs).expect("runner created");
    runner.run().expect("experiment completes")
}

fn file_digest(path: &Path) -> String {
    let bytes = fs::read(path).expect("artifact readable");
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    hex::encode(hasher.finalize())
}

#[test]
fn experiment_smoke_test_writes_all_artifacts() {
    let dir = tempdir().expect("temp dir");
    let summary = run_experiment(dir.path());

    assert_eq!(summary.initial_decision, Advisor::A);
    assert!(summary.initial_values.a > summary.initial_values.b);
    assert_eq!(summary.rows_written, 80);
    assert_eq!(summary.policies, vec![PolicyKind::Optimal, PolicyKind::Myopic]);

    let jsonl = fs::read_to_string(&summary.runs_path).expect("jsonl readable");
    assert_eq!(jsonl.lines().count(), 80);
    for line in jsonl.lines() {
        let row: serde_json::Value = serde_json::from_str(line).expect("row decodes to JSON");
        assert_eq!(row["run_id"], "test_smoke");
        let score = row["score"].as_u64().expect("score");
        assert!(score <= 6);
        assert_eq!(row["choices"].as_str().expect("choices").len(), 6);
    }

    let frontier: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&summary.frontier_path).expect("frontier"))
            .expect("frontier json");
    assert_eq!(frontier["grid_size"], 7);
    assert_eq!(frontier["horizon"], 6);
    let rows = frontier["rows"].as_array().expect("rows");
    assert_eq!(rows.len(), 7);
    assert!(rows[0][6].is_null(), "w + l >= H must be null");
    assert!(rows[3][3].is_null());
    let origin = rows[0][0].as_f64().expect("origin cell");
    assert!(origin > 0.0);
    assert!((origin - (summary.initial_values.a - summary.initial_values.b)).abs() < 1e-12);
    assert_eq!(frontier["switch_thresholds"].as_array().map(Vec::len), Some(7));

    let markdown = fs::read_to_string(&summary.summary_path).expect("summary readable");
    assert!(markdown.contains("## Patience frontier"));
    assert!(markdown.contains("n/a"));
    assert!(markdown.contains("| optimal |"));
    assert!(markdown.contains("## Comparison vs baseline (myopic)"));

    // Plot rendering is optional; ensure any failure surfaces explicitly
    for plot in [summary.frontier_plot, summary.score_plot].into_iter().flatten() {
        assert!(plot.exists(), "plot path reported but missing on disk");
    }
}

#[test]
fn experiment_artifacts_are_deterministic() {
    let first_dir = tempdir().expect("temp dir");
    let second_dir = tempdir().expect("temp dir");
    let first = run_experiment(first_dir.path());
    let second = run_experiment(second_dir.path());

    assert_eq!(file_digest(&first.runs_path), file_digest(&second.runs_path));
    assert_eq!(
        file_digest(&first.frontier_path),
        file_digest(&second.frontier_path)
    );
    assert_eq!(
        file_digest(&first.summary_path),
        file_digest(&second.summary_path)
    );
}
