// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for step copy lifecycle events.

use crate::channel::StepCopyId;
use crate::engine::StepStatus;
use crate::errors::{ResourceError, RowFailure, StepError};
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// `init` succeeded.
///
/// # Log Level
/// `debug!` - Lifecycle detail
pub struct StepInitialized<'a> {
    pub step: &'a StepCopyId,
    pub partitions: &'a [usize],
}

impl Display for StepInitialized<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.partitions.is_empty() {
            write!(f, "Step {} initialized", self.step)
        } else {
            write!(
                f,
                "Step {} initialized for partitions {:?}",
                self.step, self.partitions
            )
        }
    }
}

impl StructuredLog for StepInitialized<'_> {
    fn log(&self) {
        tracing::debug!(step = %self.step, partitions = ?self.partitions, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("step_initialized", span_name = name, step = %self.step)
    }
}

/// `init` returned false.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct StepInitFailed<'a> {
    pub step: &'a StepCopyId,
}

impl Display for StepInitFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Step {} failed to initialize", self.step)
    }
}

impl StructuredLog for StepInitFailed<'_> {
    fn log(&self) {
        tracing::error!(step = %self.step, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("step_init_failed", span_name = name, step = %self.step)
    }
}

/// The run loop of a copy has begun.
///
/// # Log Level
/// `debug!` - Lifecycle detail
pub struct StepStarted<'a> {
    pub step: &'a StepCopyId,
    pub inputs: usize,
    pub outputs: usize,
    pub routing: &'a str,
}

impl Display for StepStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Step {} running: {} inputs, {} outputs ({})",
            self.step, self.inputs, self.outputs, self.routing
        )
    }
}

impl StructuredLog for StepStarted<'_> {
    fn log(&self) {
        tracing::debug!(
            step = %self.step,
            inputs = self.inputs,
            outputs = self.outputs,
            routing = self.routing,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "step",
            span_name = name,
            step = %self.step,
            routing = self.routing,
        )
    }
}

/// The run loop of a copy has ended.
///
/// # Log Level
/// `info!` - Important operational event
pub struct StepFinished<'a> {
    pub status: &'a StepStatus,
}

impl Display for StepFinished<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let s = self.status;
        write!(
            f,
            "Step {}.{} finished ({}): I={}, O={}, R={}, E={}",
            s.step, s.copy, s.state, s.lines_read, s.lines_written, s.lines_rejected, s.errors
        )
    }
}

impl StructuredLog for StepFinished<'_> {
    fn log(&self) {
        let s = self.status;
        tracing::info!(
            step = s.step.as_str(),
            copy = s.copy,
            state = %s.state,
            lines_read = s.lines_read,
            lines_written = s.lines_written,
            lines_rejected = s.lines_rejected,
            errors = s.errors,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "step_finished",
            span_name = name,
            step = self.status.step.as_str(),
            copy = self.status.copy,
        )
    }
}

/// A failing row was sent to the error channel.
///
/// # Log Level
/// `warn!` - Row-level problem, run continues
pub struct RowDiverted<'a> {
    pub step: &'a StepCopyId,
    pub failure: &'a RowFailure,
}

impl Display for RowDiverted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Step {} diverted row to error handling: {}",
            self.step, self.failure
        )
    }
}

impl StructuredLog for RowDiverted<'_> {
    fn log(&self) {
        tracing::warn!(
            step = %self.step,
            error_count = self.failure.error_count,
            fields = self.failure.field_names.join(","),
            codes = self.failure.codes.join(","),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("row_diverted", span_name = name, step = %self.step)
    }
}

/// A step-fatal error ended the copy.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct StepFailed<'a> {
    pub step: &'a StepCopyId,
    pub error: &'a StepError,
}

impl Display for StepFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Step {} failed: {}", self.step, self.error)
    }
}

impl StructuredLog for StepFailed<'_> {
    fn log(&self) {
        tracing::error!(step = %self.step, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "step_failed",
            span_name = name,
            step = %self.step,
            error = %self.error,
        )
    }
}

/// A resource did not release cleanly; cleanup continues.
///
/// # Log Level
/// `warn!` - Cleanup problem, never escalated
pub struct ResourceReleaseFailed<'a> {
    pub step: &'a StepCopyId,
    pub resource: &'a str,
    pub error: &'a ResourceError,
}

impl Display for ResourceReleaseFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Step {} could not release resource '{}': {}",
            self.step, self.resource, self.error
        )
    }
}

impl StructuredLog for ResourceReleaseFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            step = %self.step,
            resource = self.resource,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "resource_release_failed",
            span_name = name,
            step = %self.step,
            resource = self.resource,
        )
    }
}

/// Resources and channels of a copy were released.
///
/// # Log Level
/// `debug!` - Lifecycle detail
pub struct StepDisposed<'a> {
    pub step: &'a StepCopyId,
    pub released: usize,
    pub failed: usize,
}

impl Display for StepDisposed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Step {} disposed: {} resources released, {} failed",
            self.step, self.released, self.failed
        )
    }
}

impl StructuredLog for StepDisposed<'_> {
    fn log(&self) {
        tracing::debug!(
            step = %self.step,
            released = self.released,
            failed = self.failed,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("step_disposed", span_name = name, step = %self.step)
    }
}

/// Pause state of a copy changed.
///
/// # Log Level
/// `debug!` - Lifecycle detail
pub struct StepPauseChanged<'a> {
    pub step: &'a StepCopyId,
    pub paused: bool,
}

impl Display for StepPauseChanged<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.paused {
            write!(f, "Step {} paused", self.step)
        } else {
            write!(f, "Step {} resumed", self.step)
        }
    }
}

impl StructuredLog for StepPauseChanged<'_> {
    fn log(&self) {
        tracing::debug!(step = %self.step, paused = self.paused, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "step_pause",
            span_name = name,
            step = %self.step,
            paused = self.paused,
        )
    }
}

/// A row written to the log by a logging step.
///
/// # Log Level
/// `info!` - Requested output
pub struct RowLogged<'a> {
    pub step: &'a StepCopyId,
    pub line: u64,
    pub row: &'a str,
}

impl Display for RowLogged<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{} #{}: {}", self.step, self.line, self.row)
    }
}

impl StructuredLog for RowLogged<'_> {
    fn log(&self) {
        tracing::info!(step = %self.step, line = self.line, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("row_logged", span_name = name, step = %self.step, line = self.line)
    }
}
