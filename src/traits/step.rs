// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::channel::StepCopyId;
use crate::engine::Emitter;
use crate::errors::{RowFailure, StepError};
use crate::row::RowEnvelope;

/// What one call of [`StepLogic::transform`] produced.
#[derive(Debug, Clone)]
pub enum Transformed {
    /// Route this row through the step's outputs.
    Emit(RowEnvelope),
    /// Nothing to route for this call; the loop continues.
    Skip,
    /// The step has no more rows to produce.
    EndOfInput,
}

/// Failure returned from [`StepLogic::transform`].
#[derive(Debug, Clone)]
pub enum StepFailure {
    /// The current input row failed; diverted when error handling is set.
    Row(RowFailure),
    /// The step cannot continue.
    Fatal(StepError),
}

impl From<RowFailure> for StepFailure {
    fn from(failure: RowFailure) -> Self {
        StepFailure::Row(failure)
    }
}

impl From<StepError> for StepFailure {
    fn from(error: StepError) -> Self {
        StepFailure::Fatal(error)
    }
}

/// Facts about the copy being initialized.
#[derive(Debug, Clone)]
pub struct InitContext {
    pub id: StepCopyId,
    pub copies: usize,
    /// Partitions routed to this copy, when the step is partitioned.
    pub partitions: Vec<usize>,
    pub has_inputs: bool,
}

/// Step business logic driven by the engine.
///
/// The engine acquires input rows, calls `transform` once per row (or
/// repeatedly with `None` for a step without inputs), and routes whatever
/// comes back. When every input is exhausted `transform` is called one last
/// time with `None` so the step can flush buffered state.
pub trait StepLogic: Send {
    fn name(&self) -> &str;

    fn init(&mut self, _ctx: &InitContext) -> bool {
        true
    }

    fn transform(
        &mut self,
        input: Option<&RowEnvelope>,
        out: &mut Emitter<'_>,
    ) -> Result<Transformed, StepFailure>;

    fn dispose(&mut self) {}
}
