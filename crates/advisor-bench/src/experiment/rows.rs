use std::io::Write;

use advisor_core::simulation::SimulationReport;
use serde::Serialize;

use super::RunnerError;

/// One `runs.jsonl` line: a single simulated run under one policy.
#[derive(Debug, Serialize)]
pub(super) struct RunLogRow<'a> {
    pub run_id: &'a str,
    pub policy: &'static str,
    pub run_index: usize,
    pub run_seed: u64,
    pub true_accuracy_a: f64,
    pub true_accuracy_b: f64,
    pub choices: String,
    pub switches: usize,
    pub score: u32,
}

pub(super) fn write_run_rows<W: Write>(
    writer: &mut W,
    run_id: &str,
    report: &SimulationReport,
) -> Result<usize, RunnerError> {
    let mut rows_written = 0usize;
    for record in &report.records {
        let row = RunLogRow {
            run_id,
            policy: report.policy.label(),
            run_index: record.run_index,
            run_seed: record.seed,
            true_accuracy_a: record.true_accuracy_a,
            true_accuracy_b: record.true_accuracy_b,
            choices: record.choice_string(),
            switches: record.switches(),
            score: record.score,
        };

        serde_json::to_writer(&mut *writer, &row)?;
        writer.write_all(b"\n")?;
        rows_written += 1;
    }

    Ok(rows_written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_core::model::{Advisor, QValues};
    use advisor_core::policy::PolicyKind;
    use advisor_core::simulation::{RoundRecord, SimulationRecord};

    #[test]
    fn writes_one_json_line_per_run() {
        let record = SimulationRecord {
            run_index: 3,
            seed: 99,
            true_accuracy_a: 0.8,
            true_accuracy_b: 0.4,
            trace: vec![
                RoundRecord {
                    round: 0,
                    advisor: Advisor::A,
                    success: true,
                    values: QValues::new(1.2, 1.0),
                },
                RoundRecord {
                    round: 1,
                    advisor: Advisor::B,
                    success: false,
                    values: QValues::new(0.4, 0.5),
                },
            ],
            score: 1,
        };
        let report = SimulationReport {
            policy: PolicyKind::Optimal,
            horizon: 2,
            seed: 5,
            records: vec![record.clone(), record],
        };

        let mut buffer = Vec::new();
        let rows = write_run_rows(&mut buffer, "unit", &report).unwrap();
        assert_eq!(rows, 2);

        let text = String::from_utf8(buffer).unwrap();
        let first: serde_json::Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert_eq!(first["policy"], "optimal");
        assert_eq!(first["choices"], "AB");
        assert_eq!(first["switches"], 1);
        assert_eq!(first["score"], 1);
        assert_eq!(first["run_seed"], 99);
    }
}
