// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for transformation build and run lifecycle events.
//!
//! This module contains message types for logging events related to:
//! * Wiring step copies and channels into a transformation
//! * Run start, completion and initialization failure
//! * Cooperative stop requests

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Step copies and channels have been wired.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use the_conveyor::observability::messages::engine::TransformationBuilt;
///
/// let msg = TransformationBuilt {
///     steps: 3,
///     copies: 5,
///     channels: 6,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct TransformationBuilt {
    pub steps: usize,
    pub copies: usize,
    pub channels: usize,
}

impl Display for TransformationBuilt {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Built transformation: {} steps, {} step copies, {} row channels",
            self.steps, self.copies, self.channels
        )
    }
}

impl StructuredLog for TransformationBuilt {
    fn log(&self) {
        tracing::info!(
            steps = self.steps,
            copies = self.copies,
            channels = self.channels,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "transformation",
            span_name = name,
            steps = self.steps,
            copies = self.copies,
            channels = self.channels,
        )
    }
}

/// Every copy initialized and the start gate is about to open.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RunStarted {
    pub copies: usize,
}

impl Display for RunStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Starting transformation with {} step copies", self.copies)
    }
}

impl StructuredLog for RunStarted {
    fn log(&self) {
        tracing::info!(copies = self.copies, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("run", span_name = name, copies = self.copies)
    }
}

/// Every copy has left its run loop.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use the_conveyor::observability::messages::engine::RunCompleted;
/// use std::time::Duration;
///
/// let msg = RunCompleted {
///     errors: 0,
///     duration: Duration::from_millis(250),
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct RunCompleted {
    pub errors: u64,
    pub duration: std::time::Duration,
}

impl Display for RunCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Transformation finished in {:?} with {} errors",
            self.duration, self.errors
        )
    }
}

impl StructuredLog for RunCompleted {
    fn log(&self) {
        if self.errors > 0 {
            tracing::error!(
                errors = self.errors,
                duration_ms = self.duration.as_millis() as u64,
                "{}", self
            );
        } else {
            tracing::info!(
                errors = self.errors,
                duration_ms = self.duration.as_millis() as u64,
                "{}", self
            );
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "run_completed",
            span_name = name,
            errors = self.errors,
            duration = ?self.duration,
        )
    }
}

/// One or more copies failed `init`; nothing was started.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct InitializationFailed<'a> {
    pub steps: &'a [String],
}

impl Display for InitializationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Unable to start transformation, initialization failed for: {}",
            self.steps.join(", ")
        )
    }
}

impl StructuredLog for InitializationFailed<'_> {
    fn log(&self) {
        tracing::error!(
            failed = self.steps.join(", "),
            failed_count = self.steps.len(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "initialization_failed",
            span_name = name,
            failed_count = self.steps.len(),
        )
    }
}

/// A stop of every step copy was requested.
///
/// # Log Level
/// `warn!` - The run will not complete normally
pub struct StopRequested<'a> {
    pub origin: &'a str,
}

impl Display for StopRequested<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Stopping all step copies (requested by {})", self.origin)
    }
}

impl StructuredLog for StopRequested<'_> {
    fn log(&self) {
        tracing::warn!(origin = self.origin, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("stop_requested", span_name = name, origin = self.origin)
    }
}

/// A step thread ended without reporting back.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct StepThreadLost<'a> {
    pub step: &'a str,
}

impl Display for StepThreadLost<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Thread for step {} terminated unexpectedly", self.step)
    }
}

impl StructuredLog for StepThreadLost<'_> {
    fn log(&self) {
        tracing::error!(step = self.step, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("step_thread_lost", span_name = name, step = self.step)
    }
}
