// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Step-level error types.
//!
//! [`RowFailure`] is the recoverable, per-row outcome reported by business
//! logic. Whether it is diverted to an error channel or escalated to a
//! [`StepError::UnhandledRowFailure`] depends on the step's error handling.

use super::ChannelError;
use thiserror::Error;

/// Conditions that end a step copy in the `Failed` state and stop the run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepError {
    #[error("step {step} failed to initialize")]
    InitFailed { step: String },

    /// Rows arriving on different inputs do not share a layout.
    #[error("step {step} received incompatible input rows: {reason}")]
    IncompatibleInputs { step: String, reason: String },

    #[error("step {step} failed on row without error handling: {description}")]
    UnhandledRowFailure { step: String, description: String },

    #[error("step {step} emitted an error row but has no error handling configured")]
    NoErrorHandling { step: String },

    #[error("step {step} emitted a schema with blank field names at positions {positions:?}")]
    InvalidSchema { step: String, positions: Vec<usize> },

    #[error("step {step} has no partition key field '{field}' in its input")]
    MissingPartitionKey { step: String, field: String },

    #[error("step {step} computed partition {partition} outside [0, {partitions})")]
    PartitionOutOfRange {
        step: String,
        partition: usize,
        partitions: usize,
    },

    #[error("step {step} addressed output {index} but has {outputs} outputs")]
    OutputOutOfRange {
        step: String,
        index: usize,
        outputs: usize,
    },

    #[error("step {step} rejected too many rows ({rejected} of {read} read): {limit}")]
    TooManyRejectedRows {
        step: String,
        rejected: u64,
        read: u64,
        limit: String,
    },

    /// Fatal condition raised by business logic itself.
    #[error("step {step}: {message}")]
    Logic { step: String, message: String },

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl StepError {
    /// Builds a business-logic fatal error; the step name is filled in by
    /// the engine when it is not known to the caller.
    pub fn logic(message: impl Into<String>) -> Self {
        StepError::Logic {
            step: String::new(),
            message: message.into(),
        }
    }

    /// True when the error only reflects a stop requested elsewhere.
    pub fn is_stop(&self) -> bool {
        matches!(self, StepError::Channel(e) if e.is_stopped())
    }
}

/// A recoverable failure processing one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFailure {
    pub description: String,
    pub field_names: Vec<String>,
    pub codes: Vec<String>,
    pub error_count: i64,
}

impl RowFailure {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            field_names: Vec::new(),
            codes: Vec::new(),
            error_count: 1,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field_names.push(field.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.codes.push(code.into());
        self
    }

    pub fn with_error_count(mut self, count: i64) -> Self {
        self.error_count = count;
        self
    }
}

impl std::fmt::Display for RowFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description)?;
        if !self.field_names.is_empty() {
            write!(f, " (fields: {})", self.field_names.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for RowFailure {}

/// Failures computing the partition of a row.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PartitionError {
    #[error("partition key field '{field}' not found in row")]
    MissingKey { field: String },
}

/// Failures releasing an external resource during dispose.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("resource '{name}' could not be released: {reason}")]
    Release { name: String, reason: String },

    #[error("resource '{name}' is no longer reachable")]
    Unreachable { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_errors_are_recognised() {
        let stopped = StepError::from(ChannelError::Stopped {
            channel: "a.0 -> b.0".to_string(),
        });
        assert!(stopped.is_stop());

        let closed = StepError::from(ChannelError::Closed {
            channel: "a.0 -> b.0".to_string(),
        });
        assert!(!closed.is_stop());
    }

    #[test]
    fn row_failure_display_lists_fields() {
        let failure = RowFailure::new("value out of range")
            .with_field("amount")
            .with_code("RANGE");
        assert_eq!(failure.to_string(), "value out of range (fields: amount)");
        assert_eq!(failure.error_count, 1);
    }
}
