// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::{ConfigError, ValidationError};
use thiserror::Error;

/// Run-level failures of a transformation.
///
/// Step-fatal errors are not represented here: they end the run normally
/// with a non-zero error count in the `RunResult`.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("transformation graph is invalid: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Validation(Vec<ValidationError>),

    #[error("initialization failed for steps: {}", .steps.join(", "))]
    InitFailed { steps: Vec<String> },

    #[error("step {step} panicked")]
    StepPanicked { step: String },

    #[error("could not start a thread for step {step}: {source}")]
    Spawn {
        step: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
