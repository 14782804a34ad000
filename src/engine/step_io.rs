// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use super::error_channel::{ErrorChannel, RejectionLimits};
use super::input::InputStreams;
use super::output::OutputRouting;
use super::registry::StepRegistries;
use super::run_control::RunControl;
use super::status::StepShared;
use crate::channel::{RowChannel, StepCopyId};
use crate::errors::{RowFailure, StepError};
use crate::observability::messages::step::RowDiverted;
use crate::observability::messages::StructuredLog;
use crate::row::RowEnvelope;

/// Channels and routing owned by one step copy's thread.
pub(crate) struct StepIo {
    pub(crate) inputs: InputStreams,
    pub(crate) outputs: Vec<Arc<RowChannel>>,
    pub(crate) routing: OutputRouting,
    pub(crate) errors: Option<ErrorChannel>,
    pub(crate) limits: RejectionLimits,
    pub(crate) shared: Arc<StepShared>,
    pub(crate) control: Arc<RunControl>,
    pub(crate) allow_empty_field_names: bool,
    schema_checked: bool,
    fatal: Option<StepError>,
}

impl StepIo {
    pub(crate) fn new(
        inputs: InputStreams,
        outputs: Vec<Arc<RowChannel>>,
        routing: OutputRouting,
        errors: Option<ErrorChannel>,
        shared: Arc<StepShared>,
        control: Arc<RunControl>,
    ) -> Self {
        Self {
            inputs,
            outputs,
            routing,
            errors,
            limits: RejectionLimits::default(),
            shared,
            control,
            allow_empty_field_names: false,
            schema_checked: false,
            fatal: None,
        }
    }

    fn id(&self) -> &StepCopyId {
        &self.shared.id
    }

    pub(crate) fn has_inputs(&self) -> bool {
        !self.inputs.is_none()
    }

    pub(crate) fn has_error_handling(&self) -> bool {
        self.errors.is_some()
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.control.is_stopped()
    }

    pub(crate) fn take_fatal(&mut self) -> Option<StepError> {
        self.fatal.take()
    }

    /// Reads the next input row, honouring pause.
    pub(crate) fn acquire(&mut self) -> Result<Option<RowEnvelope>, StepError> {
        let control = Arc::clone(&self.control);
        self.shared
            .wait_while_paused(control.poll_interval(), || control.is_stopped());

        let id = self.shared.id.clone();
        let row = self.inputs.read(&id).map_err(|e| self.keep(e))?;
        if let Some(env) = &row {
            self.shared.counters.add_read();
            for listener in self.shared.registries.row_listeners.snapshot() {
                listener.row_read(&id, env);
            }
            self.verify_rejection_rates().map_err(|e| self.keep(e))?;
        }
        Ok(row)
    }

    /// Routes a row through the step's outputs.
    pub(crate) fn emit(&mut self, row: RowEnvelope) -> Result<(), StepError> {
        self.check_schema(&row).map_err(|e| self.keep(e))?;
        let id = self.shared.id.clone();
        let listeners = self.shared.registries.row_listeners.snapshot();
        let notified = if listeners.is_empty() {
            None
        } else {
            Some(row.clone())
        };

        let delivered = self
            .routing
            .route(&id, row, &self.outputs)
            .map_err(|e| self.keep(e))?;
        // With no outputs a row still counts as written.
        self.shared.counters.add_written(delivered.max(1) as u64);

        if let Some(env) = notified {
            for listener in listeners {
                listener.row_written(&id, &env);
            }
        }
        Ok(())
    }

    /// Writes a row to one specific output, bypassing routing.
    pub(crate) fn emit_to(&mut self, output: usize, row: RowEnvelope) -> Result<(), StepError> {
        self.check_schema(&row).map_err(|e| self.keep(e))?;
        let Some(channel) = self.outputs.get(output).cloned() else {
            let error = StepError::OutputOutOfRange {
                step: self.id().to_string(),
                index: output,
                outputs: self.outputs.len(),
            };
            return Err(self.keep(error));
        };
        let id = self.shared.id.clone();
        channel
            .put(&row.schema, row.row.clone())
            .map_err(|e| self.keep(e.into()))?;
        self.shared.counters.add_written(1);
        for listener in self.shared.registries.row_listeners.snapshot() {
            listener.row_written(&id, &row);
        }
        Ok(())
    }

    /// Diverts a failing row to the error channel.
    pub(crate) fn emit_error(
        &mut self,
        row: &RowEnvelope,
        failure: &RowFailure,
    ) -> Result<(), StepError> {
        let id = self.shared.id.clone();
        let Some(errors) = self.errors.as_mut() else {
            let error = StepError::NoErrorHandling {
                step: id.to_string(),
            };
            return Err(self.keep(error));
        };
        let sent = match errors.put_error(row, failure) {
            Ok(sent) => sent,
            Err(e) => return Err(self.keep(e.into())),
        };

        self.shared.counters.add_rejected();
        RowDiverted { step: &id, failure }.log();
        for listener in self.shared.registries.row_listeners.snapshot() {
            listener.error_row_written(&id, &sent);
        }
        self.verify_rejection_rates().map_err(|e| self.keep(e))
    }

    /// Consumes and discards whatever input remains so producers never block
    /// on a step that has stopped reading.
    pub(crate) fn drain_inputs(&mut self) -> Result<(), StepError> {
        let id = self.shared.id.clone();
        while self.inputs.read(&id)?.is_some() {}
        Ok(())
    }

    /// Marks every output done, including the error channel.
    pub(crate) fn finish(&self) {
        for channel in &self.outputs {
            channel.mark_done();
        }
        if let Some(errors) = &self.errors {
            errors.mark_done();
        }
    }

    /// Drops every channel reference held by this copy.
    pub(crate) fn clear(&mut self) {
        self.inputs = InputStreams::None;
        self.outputs.clear();
        self.routing = OutputRouting::Direct;
        self.errors = None;
    }

    fn verify_rejection_rates(&self) -> Result<(), StepError> {
        if self.errors.is_none() {
            return Ok(());
        }
        let counters = &self.shared.counters;
        match self.limits.exceeded(counters.rejected(), counters.read()) {
            Some(limit) => Err(StepError::TooManyRejectedRows {
                step: self.id().to_string(),
                rejected: counters.rejected(),
                read: counters.read(),
                limit,
            }),
            None => Ok(()),
        }
    }

    fn check_schema(&mut self, row: &RowEnvelope) -> Result<(), StepError> {
        if self.schema_checked || self.allow_empty_field_names {
            return Ok(());
        }
        let blank = row.schema.blank_field_names();
        if !blank.is_empty() {
            return Err(StepError::InvalidSchema {
                step: self.id().to_string(),
                positions: blank,
            });
        }
        self.schema_checked = true;
        Ok(())
    }

    /// Remembers the first failure so the run loop sees it even if business
    /// logic swallows the error.
    fn keep(&mut self, error: StepError) -> StepError {
        if self.fatal.is_none() {
            self.fatal = Some(error.clone());
        }
        error
    }
}

/// The business logic's view of its step copy.
pub struct Emitter<'a> {
    io: &'a mut StepIo,
}

impl<'a> Emitter<'a> {
    pub(crate) fn new(io: &'a mut StepIo) -> Self {
        Self { io }
    }

    pub fn step(&self) -> &StepCopyId {
        self.io.id()
    }

    /// Routes a row to the step's outputs.
    pub fn emit(&mut self, row: RowEnvelope) -> Result<(), StepError> {
        self.io.emit(row)
    }

    /// Writes a row to output `index` only.
    pub fn emit_to(&mut self, index: usize, row: RowEnvelope) -> Result<(), StepError> {
        self.io.emit_to(index, row)
    }

    /// Sends `row` with diagnostics to the error channel.
    pub fn emit_error(&mut self, row: &RowEnvelope, failure: RowFailure) -> Result<(), StepError> {
        self.io.emit_error(row, &failure)
    }

    /// Reads another input row. `None` once every input is exhausted.
    pub fn acquire_row(&mut self) -> Result<Option<RowEnvelope>, StepError> {
        self.io.acquire()
    }

    pub fn has_error_handling(&self) -> bool {
        self.io.has_error_handling()
    }

    pub fn output_count(&self) -> usize {
        self.io.outputs.len()
    }

    pub fn is_stopped(&self) -> bool {
        self.io.is_stopped()
    }

    pub fn registries(&self) -> &StepRegistries {
        &self.io.shared.registries
    }
}
