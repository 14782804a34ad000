// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::engine::Emitter;
use crate::row::RowEnvelope;
use crate::traits::{StepFailure, StepLogic, Transformed};

/// Passes every input row through unchanged.
pub struct Dummy;

impl StepLogic for Dummy {
    fn name(&self) -> &str {
        "dummy"
    }

    fn transform(
        &mut self,
        input: Option<&RowEnvelope>,
        _out: &mut Emitter<'_>,
    ) -> Result<Transformed, StepFailure> {
        Ok(match input {
            Some(row) => Transformed::Emit(row.clone()),
            None => Transformed::EndOfInput,
        })
    }
}
