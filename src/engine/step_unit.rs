// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use super::run_control::RunControl;
use super::status::{StepHandle, StepShared, StepState, StepStatus};
use super::step_io::{Emitter, StepIo};
use crate::channel::StepCopyId;
use crate::errors::StepError;
use crate::observability::messages::step::{
    StepDisposed, StepFailed, StepFinished, StepInitFailed, StepInitialized, StepStarted,
};
use crate::observability::messages::StructuredLog;
use crate::row::{Row, RowEnvelope, Schema};
use crate::traits::{InitContext, StepFailure, StepLogic, Transformed};

/// How the run loop ended when no fatal error occurred.
enum LoopEnd {
    Done,
    Stopped,
}

/// One copy of a step: its business logic plus the channels it reads and
/// writes. Lives on its own thread from `init` to `dispose`.
pub struct StepUnit {
    copies: usize,
    partitions: Vec<usize>,
    logic: Box<dyn StepLogic>,
    io: StepIo,
    shared: Arc<StepShared>,
    control: Arc<RunControl>,
    disposed: bool,
}

impl StepUnit {
    pub(crate) fn new(
        logic: Box<dyn StepLogic>,
        copies: usize,
        partitions: Vec<usize>,
        io: StepIo,
    ) -> Self {
        let shared = Arc::clone(&io.shared);
        let control = Arc::clone(&io.control);
        Self {
            copies,
            partitions,
            logic,
            io,
            shared,
            control,
            disposed: false,
        }
    }

    pub fn id(&self) -> &StepCopyId {
        &self.shared.id
    }

    pub fn handle(&self) -> StepHandle {
        StepHandle::new(Arc::clone(&self.shared))
    }

    pub fn state(&self) -> StepState {
        self.shared.state()
    }

    pub fn status(&self) -> StepStatus {
        self.shared.status()
    }

    /// Runs the business logic's one-time setup.
    pub fn init(&mut self) -> bool {
        if self.state() != StepState::Created {
            return false;
        }
        let ctx = InitContext {
            id: self.shared.id.clone(),
            copies: self.copies,
            partitions: self.partitions.clone(),
            has_inputs: self.io.has_inputs(),
        };
        if self.logic.init(&ctx) {
            self.shared.set_state(StepState::Initialized);
            StepInitialized {
                step: &self.shared.id,
                partitions: &self.partitions,
            }
            .log();
            true
        } else {
            StepInitFailed {
                step: &self.shared.id,
            }
            .log();
            let error = StepError::InitFailed {
                step: self.shared.id.to_string(),
            };
            self.shared.record_error(error.to_string());
            self.shared.counters.add_error();
            self.control.add_error();
            self.shared.set_state(StepState::Failed);
            false
        }
    }

    /// Waits for the start gate, then drives the loop until the step is done,
    /// stopped or failed. Returns the final status.
    pub fn run(&mut self) -> StepStatus {
        if self.state() != StepState::Initialized {
            return self.status();
        }
        if !self.control.wait_until_started() {
            self.io.finish();
            self.shared.set_state(StepState::Stopped);
            return self.status();
        }

        self.shared.set_state(StepState::Running);
        let routing = self.io.routing.describe();
        let started = StepStarted {
            step: &self.shared.id,
            inputs: self.io.inputs.count(),
            outputs: self.io.outputs.len(),
            routing: &routing,
        };
        started.log();
        let span = started.span("run");
        let _entered = span.enter();

        for listener in self.shared.registries.step_listeners.snapshot() {
            listener.started(&self.shared.id);
        }

        let state = match self.run_loop() {
            Ok(LoopEnd::Done) => StepState::Done,
            Ok(LoopEnd::Stopped) => StepState::Stopped,
            Err(error) if error.is_stop() => StepState::Stopped,
            Err(error) => {
                self.fail(&error);
                StepState::Failed
            }
        };
        self.io.finish();
        self.shared.set_state(state);

        let status = self.status();
        StepFinished { status: &status }.log();
        for listener in self.shared.registries.step_listeners.snapshot() {
            listener.finished(&status);
        }
        status
    }

    /// Releases the logic, registered resources and channels. Runs once.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        self.logic.dispose();
        let summary = self.shared.registries.release_resources(&self.shared.id);
        self.shared.registries.row_listeners.drain();
        self.shared.registries.step_listeners.drain();
        self.io.finish();
        self.io.clear();

        StepDisposed {
            step: &self.shared.id,
            released: summary.released,
            failed: summary.failed,
        }
        .log();
        self.shared.set_state(StepState::Disposed);
    }

    fn run_loop(&mut self) -> Result<LoopEnd, StepError> {
        let has_inputs = self.io.has_inputs();
        let control = Arc::clone(&self.control);
        loop {
            self.shared
                .wait_while_paused(control.poll_interval(), || control.is_stopped());
            if control.is_stopped() {
                return Ok(LoopEnd::Stopped);
            }
            if self.safe_stop_requested(has_inputs) {
                self.io.drain_inputs()?;
                return Ok(LoopEnd::Stopped);
            }

            if !has_inputs {
                if self.step_once(None)? {
                    return Ok(LoopEnd::Done);
                }
                continue;
            }

            let Some(row) = self.io.acquire()? else {
                // Last call so the logic can flush buffered state.
                self.step_once(None)?;
                return Ok(LoopEnd::Done);
            };
            if self.step_once(Some(&row))? {
                self.io.drain_inputs()?;
                return Ok(LoopEnd::Done);
            }
        }
    }

    fn safe_stop_requested(&self, has_inputs: bool) -> bool {
        self.shared.safe_stop_requested() || (!has_inputs && self.control.is_safe_stopping())
    }

    /// Calls the logic once and routes the result. Returns true at end of
    /// input.
    fn step_once(&mut self, input: Option<&RowEnvelope>) -> Result<bool, StepError> {
        let result = {
            let mut out = Emitter::new(&mut self.io);
            self.logic.transform(input, &mut out)
        };
        if let Some(error) = self.io.take_fatal() {
            return Err(error);
        }

        match result {
            Ok(Transformed::Emit(row)) => {
                self.io.emit(row)?;
                Ok(false)
            }
            Ok(Transformed::Skip) => Ok(false),
            Ok(Transformed::EndOfInput) => Ok(true),
            Err(StepFailure::Row(failure)) => match input {
                Some(row) if self.io.has_error_handling() => {
                    self.io.emit_error(row, &failure)?;
                    Ok(false)
                }
                // A source has no input row; only the diagnostics are sent.
                None if !self.io.has_inputs() && self.io.has_error_handling() => {
                    let empty = RowEnvelope::new(Arc::new(Schema::default()), Row::default());
                    self.io.emit_error(&empty, &failure)?;
                    Ok(false)
                }
                _ => Err(StepError::UnhandledRowFailure {
                    step: self.shared.id.to_string(),
                    description: failure.to_string(),
                }),
            },
            Err(StepFailure::Fatal(error)) => Err(self.attribute(error)),
        }
    }

    fn attribute(&self, error: StepError) -> StepError {
        match error {
            StepError::Logic { step, message } if step.is_empty() => StepError::Logic {
                step: self.shared.id.to_string(),
                message,
            },
            other => other,
        }
    }

    fn fail(&self, error: &StepError) {
        StepFailed {
            step: &self.shared.id,
            error,
        }
        .log();
        self.shared.record_error(error.to_string());
        self.shared.counters.add_error();
        self.control.add_error();
        self.control.stop_all(&self.shared.id.to_string());
    }
}
