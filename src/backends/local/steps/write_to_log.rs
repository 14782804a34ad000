// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;

use crate::engine::Emitter;
use crate::observability::messages::step::RowLogged;
use crate::observability::messages::StructuredLog;
use crate::row::RowEnvelope;
use crate::traits::{StepFailure, StepLogic, Transformed};

/// Options of the `write_to_log` step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WriteToLogOptions {
    /// Stop logging (but keep passing rows) after this many rows.
    pub limit_rows: Option<u64>,
}

/// Logs each row and passes it through.
pub struct WriteToLog {
    options: WriteToLogOptions,
    logged: u64,
}

impl WriteToLog {
    pub fn new(options: WriteToLogOptions) -> Self {
        Self { options, logged: 0 }
    }
}

impl StepLogic for WriteToLog {
    fn name(&self) -> &str {
        "write_to_log"
    }

    fn transform(
        &mut self,
        input: Option<&RowEnvelope>,
        out: &mut Emitter<'_>,
    ) -> Result<Transformed, StepFailure> {
        let Some(row) = input else {
            return Ok(Transformed::EndOfInput);
        };
        if self.options.limit_rows.map_or(true, |limit| self.logged < limit) {
            self.logged += 1;
            RowLogged {
                step: out.step(),
                line: self.logged,
                row: &row.describe(),
            }
            .log();
        }
        Ok(Transformed::Emit(row.clone()))
    }
}
