// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::config::consts::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_COPIES, DEFAULT_DISTRIBUTE, DEFAULT_STOP_POLL_INTERVAL_MS,
};
use crate::config::validation::{validate_config, GraphStep};
use crate::engine::{EngineOptions, ErrorFieldNames, ErrorHandling, Hop, RejectionLimits};
use crate::errors::ConfigError;
use crate::routing::{DistributionDefaults, DistributorRegistry};

/// A transformation described in YAML (or TOML).
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub distribution: DistributionDefaults,
    pub steps: Vec<StepConfig>,
    #[serde(default)]
    pub hops: Vec<Hop>,
}

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub channel_capacity: usize,
    pub safe_mode: bool,
    pub stop_poll_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            safe_mode: false,
            stop_poll_interval_ms: DEFAULT_STOP_POLL_INTERVAL_MS,
        }
    }
}

impl EngineConfig {
    pub fn options(&self) -> EngineOptions {
        EngineOptions {
            channel_capacity: self.channel_capacity,
            safe_mode: self.safe_mode,
            poll_interval: Duration::from_millis(self.stop_poll_interval_ms.max(1)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StepConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub step_type: String,
    #[serde(default = "default_copies")]
    pub copies: usize,
    #[serde(default = "default_distribute")]
    pub distribute: bool,
    #[serde(default)]
    pub distributor: Option<String>,
    #[serde(default)]
    pub partitioning: Option<PartitioningConfig>,
    #[serde(default)]
    pub channel_capacity: Option<usize>,
    #[serde(default)]
    pub error_handling: Option<ErrorHandlingConfig>,
    #[serde(default)]
    pub allow_empty_field_names: bool,
    #[serde(default)]
    pub options: HashMap<String, serde_yaml::Value>, // step-specific options
}

fn default_copies() -> usize {
    DEFAULT_COPIES
}

fn default_distribute() -> bool {
    DEFAULT_DISTRIBUTE
}

impl StepConfig {
    pub(crate) fn graph_step(&self) -> GraphStep<'_> {
        GraphStep {
            name: &self.name,
            copies: self.copies,
            partitions: self.partitioning.as_ref().map(|p| p.partitions),
            distributor: self.distributor.as_deref(),
            error_target: self.error_handling.as_ref().map(|e| e.target.as_str()),
        }
    }
}

/// Key-based routing of the rows a step receives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PartitioningConfig {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub fields: Vec<String>,
    pub partitions: usize,
}

impl PartitioningConfig {
    /// `field` followed by `fields`.
    pub fn key_fields(&self) -> Vec<String> {
        self.field.iter().chain(self.fields.iter()).cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorHandlingConfig {
    pub target: String,
    #[serde(flatten)]
    pub fields: ErrorFieldNames,
    #[serde(flatten)]
    pub limits: RejectionLimits,
}

impl From<&ErrorHandlingConfig> for ErrorHandling {
    fn from(config: &ErrorHandlingConfig) -> Self {
        ErrorHandling::to_step(config.target.as_str())
            .with_fields(config.fields.clone())
            .with_limits(config.limits.clone())
    }
}

/// Load a config from a YAML file, or TOML when the extension says so
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_toml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
    if is_toml {
        Ok(toml::from_str(&content)?)
    } else {
        Ok(serde_yaml::from_str(&content)?)
    }
}

/// Load a config and validate its steps and hops, accumulating every error.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let cfg = load_config(path)?;
    validate_config(&cfg, &DistributorRegistry::with_builtins()).map_err(ConfigError::Invalid)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ValidationError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const PIPELINE: &str = r#"
engine:
  channel_capacity: 50
distribution:
  distributing: broadcast
steps:
  - name: generate
    type: generate_rows
    options:
      limit: 5
      counter_field: n
  - name: check
    type: range_check
    copies: 2
    error_handling:
      target: rejects
      nr_errors_field: errs
      max_errors: 3
    options: { field: n, min: 0, max: 3 }
  - name: rejects
    type: write_to_log
  - name: group
    type: dummy
    partitioning: { field: n, partitions: 4 }
hops:
  - { from: generate, to: check }
  - { from: check, to: rejects }
  - { from: check, to: group }
"#;

    fn write_temp(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parse_basic_config() {
        let cfg: Config = serde_yaml::from_str(PIPELINE).unwrap();

        assert_eq!(cfg.engine.channel_capacity, 50);
        assert_eq!(cfg.engine.stop_poll_interval_ms, DEFAULT_STOP_POLL_INTERVAL_MS);
        assert_eq!(cfg.distribution.distributing, "broadcast");
        assert_eq!(cfg.distribution.copying, "broadcast");
        assert_eq!(cfg.steps.len(), 4);
        assert_eq!(cfg.hops.len(), 3);

        let check = &cfg.steps[1];
        assert_eq!(check.copies, 2);
        assert!(check.distribute);
        let handling = check.error_handling.as_ref().unwrap();
        assert_eq!(handling.fields.nr_errors, "errs");
        assert_eq!(handling.fields.codes, "error_codes");
        assert_eq!(handling.limits.max_errors, Some(3));

        let group = cfg.steps[3].partitioning.as_ref().unwrap();
        assert_eq!(group.key_fields(), vec!["n"]);
    }

    #[test]
    fn load_and_validate_yaml_file() {
        let file = write_temp(".yaml", PIPELINE);
        let cfg = load_and_validate_config(file.path()).unwrap();
        assert_eq!(cfg.steps[0].step_type, "generate_rows");
    }

    #[test]
    fn load_toml_file() {
        let toml = r#"
[[steps]]
name = "generate"
type = "generate_rows"

[[steps]]
name = "log"
type = "write_to_log"

[[hops]]
from = "generate"
to = "log"
"#;
        let file = write_temp(".toml", toml);
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.steps.len(), 2);
        assert_eq!(cfg.engine, EngineConfig::default());
    }

    #[test]
    fn validation_errors_are_accumulated() {
        let yaml = r#"
steps:
  - { name: a, type: generate_rows }
  - { name: a, type: teleport }
hops:
  - { from: a, to: b }
"#;
        let file = write_temp(".yaml", yaml);
        let Err(ConfigError::Invalid(errors)) = load_and_validate_config(file.path()) else {
            panic!("expected validation errors");
        };
        assert!(errors.contains(&ValidationError::UnknownStepType {
            step: "a".to_string(),
            step_type: "teleport".to_string(),
        }));
        assert!(errors.contains(&ValidationError::DuplicateStep {
            step: "a".to_string(),
        }));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::UnknownHopEndpoint { missing, .. } if missing == "b")));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = load_config("/definitely/not/here.yaml");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
