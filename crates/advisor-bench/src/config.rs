use advisor_core::belief::{AdvisorPriors, Belief, SupportPoint};
use advisor_core::policy::PolicyKind;
use advisor_core::solver::{MAX_HORIZON, SolverConfig};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root experiment configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BenchmarkConfig {
    pub run_id: String,
    pub solver: SolverSection,
    pub frontier: FrontierSection,
    pub simulation: SimulationSection,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BenchmarkConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: BenchmarkConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        self.solver.validate()?;
        self.frontier.validate(self.solver.horizon)?;
        self.simulation.validate()?;
        self.outputs.validate(&self.run_id)?;
        self.logging.normalize();
        Ok(())
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            runs_jsonl: resolve_template(&self.run_id, &self.outputs.runs_jsonl),
            frontier_json: resolve_template(&self.run_id, &self.outputs.frontier_json),
            summary_md: resolve_template(&self.run_id, &self.outputs.summary_md),
            plots_dir: resolve_template(&self.run_id, &self.outputs.plots_dir),
        }
    }
}

/// Horizon and advisor priors.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SolverSection {
    pub horizon: u32,
    pub priors: PriorsConfig,
}

impl SolverSection {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.horizon == 0 || self.horizon > MAX_HORIZON {
            return Err(ValidationError::InvalidField {
                field: "solver.horizon".to_string(),
                message: format!("horizon must be between 1 and {MAX_HORIZON}"),
            });
        }
        self.priors.advisor_priors()?;
        Ok(())
    }

    /// Build the core solver configuration from this block.
    pub fn solver_config(&self) -> Result<SolverConfig, ValidationError> {
        let priors = self.priors.advisor_priors()?;
        SolverConfig::new(priors, self.horizon).map_err(|err| ValidationError::InvalidField {
            field: "solver.horizon".to_string(),
            message: err.to_string(),
        })
    }
}

/// Discrete accuracy priors, one list of support points per advisor.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PriorsConfig {
    pub a: Vec<SupportPoint>,
    pub b: Vec<SupportPoint>,
}

impl PriorsConfig {
    pub fn advisor_priors(&self) -> Result<AdvisorPriors, ValidationError> {
        let a = parse_prior("solver.priors.a", &self.a)?;
        let b = parse_prior("solver.priors.b", &self.b)?;
        Ok(AdvisorPriors::new(a, b))
    }
}

fn parse_prior(field: &str, points: &[SupportPoint]) -> Result<Belief, ValidationError> {
    Belief::new(points.to_vec()).map_err(|err| ValidationError::InvalidField {
        field: field.to_string(),
        message: err.to_string(),
    })
}

/// Patience frontier sweep block.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FrontierSection {
    pub grid_size: usize,
}

impl FrontierSection {
    fn validate(&self, horizon: u32) -> Result<(), ValidationError> {
        let max = horizon as usize + 1;
        if self.grid_size == 0 || self.grid_size > max {
            return Err(ValidationError::InvalidField {
                field: "frontier.grid_size".to_string(),
                message: format!("grid size must be between 1 and {max} (horizon + 1)"),
            });
        }
        Ok(())
    }
}

/// Monte Carlo batch block.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SimulationSection {
    pub runs: usize,
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_policies")]
    pub policies: Vec<PolicyKind>,
    #[serde(default)]
    pub baseline: Option<PolicyKind>,
}

impl SimulationSection {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.runs == 0 {
            return Err(ValidationError::InvalidField {
                field: "simulation.runs".to_string(),
                message: "number of runs must be greater than zero".to_string(),
            });
        }

        if self.policies.is_empty() {
            return Err(ValidationError::InvalidField {
                field: "simulation.policies".to_string(),
                message: "at least one policy must be specified".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for policy in &self.policies {
            if !seen.insert(*policy) {
                return Err(ValidationError::InvalidField {
                    field: "simulation.policies".to_string(),
                    message: format!("policy '{}' listed more than once", policy.label()),
                });
            }
        }

        if let Some(baseline) = self.baseline {
            if !self.policies.contains(&baseline) {
                return Err(ValidationError::InvalidField {
                    field: "simulation.baseline".to_string(),
                    message: format!(
                        "baseline policy '{}' is not listed in simulation.policies",
                        baseline.label()
                    ),
                });
            }
        }

        Ok(())
    }
}

fn default_policies() -> Vec<PolicyKind> {
    vec![PolicyKind::Optimal]
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub runs_jsonl: String,
    pub frontier_json: String,
    pub summary_md: String,
    pub plots_dir: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.runs_jsonl", &self.runs_jsonl),
            ("outputs.frontier_json", &self.frontier_json),
            ("outputs.summary_md", &self.summary_md),
            ("outputs.plots_dir", &self.plots_dir),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "path must not be empty".to_string(),
                });
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "resolved path is invalid".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id must not be empty".to_string(),
        });
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }

    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    PathBuf::from(template.replace("{run_id}", run_id))
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub runs_jsonl: PathBuf,
    pub frontier_json: PathBuf,
    pub summary_md: PathBuf,
    pub plots_dir: PathBuf,
}

impl ResolvedOutputs {
    /// Directory holding the summary; telemetry lands next to it.
    pub fn summary_dir(&self) -> PathBuf {
        self.summary_md
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}
