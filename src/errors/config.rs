// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while validating a transformation graph
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Two steps share a name
    DuplicateStep {
        /// The duplicated step name
        step: String,
    },
    /// A hop references a step that doesn't exist
    UnknownHopEndpoint {
        /// The step the hop starts from
        from: String,
        /// The step the hop leads to
        to: String,
        /// The endpoint that couldn't be resolved
        missing: String,
    },
    /// The hops form a loop
    CyclicHops {
        /// The cycle path showing the loop
        cycle: Vec<String>,
    },
    /// A step is configured to run zero copies
    ZeroCopies {
        /// The offending step
        step: String,
    },
    /// A partitioned step declares zero partitions
    ZeroPartitions {
        /// The offending step
        step: String,
    },
    /// A step sends rows to a partitioned target while also naming a distributor
    PartitioningWithDistributor {
        /// The producing step
        step: String,
        /// The partitioned target
        target: String,
    },
    /// A step's targets mix partitioned and unpartitioned steps
    MixedPartitionedTargets {
        /// The producing step
        step: String,
    },
    /// The error handling target is not one of the step's hops
    ErrorTargetNotHop {
        /// The step with error handling
        step: String,
        /// The configured error target
        target: String,
    },
    /// A distributor code is not registered
    UnknownDistributor {
        /// The step that names the distributor
        step: String,
        /// The unregistered code
        code: String,
    },
    /// A step type has no registered implementation
    UnknownStepType {
        /// The step naming the type
        step: String,
        /// The unknown type name
        step_type: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::DuplicateStep { step } => {
                write!(f, "Duplicate step name: '{}'", step)
            }
            ValidationError::UnknownHopEndpoint { from, to, missing } => {
                write!(
                    f,
                    "Hop '{}' -> '{}' references step '{}' which does not exist",
                    from, to, missing
                )
            }
            ValidationError::CyclicHops { cycle } => {
                write!(f, "Hops form a loop: {}", cycle.join(" -> "))
            }
            ValidationError::ZeroCopies { step } => {
                write!(f, "Step '{}' must run at least one copy", step)
            }
            ValidationError::ZeroPartitions { step } => {
                write!(f, "Step '{}' is partitioned into zero partitions", step)
            }
            ValidationError::PartitioningWithDistributor { step, target } => {
                write!(
                    f,
                    "Step '{}' names a distributor but its target '{}' is partitioned",
                    step, target
                )
            }
            ValidationError::MixedPartitionedTargets { step } => {
                write!(
                    f,
                    "Step '{}' sends rows to both partitioned and unpartitioned steps",
                    step
                )
            }
            ValidationError::ErrorTargetNotHop { step, target } => {
                write!(
                    f,
                    "Step '{}' sends error rows to '{}' but has no hop to it",
                    step, target
                )
            }
            ValidationError::UnknownDistributor { step, code } => {
                write!(
                    f,
                    "Step '{}' uses unknown row distributor '{}'",
                    step, code
                )
            }
            ValidationError::UnknownStepType { step, step_type } => {
                write!(f, "Step '{}' has unknown type '{}'", step, step_type)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors loading a transformation configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("configuration validation failed:\n{}", join_lines(.0))]
    Invalid(Vec<ValidationError>),

    /// A step's `options` could not be turned into business logic.
    #[error("step '{step}' has invalid options: {reason}")]
    StepOptions { step: String, reason: String },
}

fn join_lines(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
