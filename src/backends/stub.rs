// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Test-only steps used by the engine tests.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::engine::Emitter;
use crate::errors::RowFailure;
use crate::row::{Row, RowEnvelope, Schema, Value, ValueMeta, ValueType};
use crate::traits::{InitContext, StepFailure, StepLogic, Transformed};

/// Emits a fixed list of rows, then ends.
pub struct VecSource {
    rows: std::vec::IntoIter<RowEnvelope>,
}

impl VecSource {
    pub fn new(rows: Vec<RowEnvelope>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }

    /// Rows `(key, n)` sharing one schema.
    pub fn keyed(rows: &[(&str, i64)]) -> Self {
        let schema = Arc::new(Schema::new(vec![
            ValueMeta::new("key", ValueType::String),
            ValueMeta::new("n", ValueType::Integer),
        ]));
        Self::new(
            rows.iter()
                .map(|(key, n)| {
                    RowEnvelope::new(
                        Arc::clone(&schema),
                        Row::new(vec![Value::from(*key), Value::Integer(*n)]),
                    )
                })
                .collect(),
        )
    }

    /// Rows with one integer field `n` from 1 to `count`.
    pub fn numbers(count: i64) -> Self {
        let schema = Arc::new(Schema::new(vec![ValueMeta::new("n", ValueType::Integer)]));
        Self::new(
            (1..=count)
                .map(|n| RowEnvelope::new(Arc::clone(&schema), Row::new(vec![Value::Integer(n)])))
                .collect(),
        )
    }
}

impl StepLogic for VecSource {
    fn name(&self) -> &str {
        "vec_source"
    }

    fn transform(
        &mut self,
        _input: Option<&RowEnvelope>,
        _out: &mut Emitter<'_>,
    ) -> Result<Transformed, StepFailure> {
        Ok(match self.rows.next() {
            Some(row) => Transformed::Emit(row),
            None => Transformed::EndOfInput,
        })
    }
}

/// Rows seen by a [`Collector`], shared with the test.
pub type Collected = Arc<Mutex<Vec<RowEnvelope>>>;

/// Records every row it receives and emits nothing.
pub struct Collector {
    rows: Collected,
}

impl Collector {
    pub fn new(rows: Collected) -> Self {
        Self { rows }
    }
}

impl StepLogic for Collector {
    fn name(&self) -> &str {
        "collector"
    }

    fn transform(
        &mut self,
        input: Option<&RowEnvelope>,
        _out: &mut Emitter<'_>,
    ) -> Result<Transformed, StepFailure> {
        match input {
            Some(row) => {
                self.rows.lock().push(row.clone());
                Ok(Transformed::Skip)
            }
            None => Ok(Transformed::EndOfInput),
        }
    }
}

/// Passes rows through, failing the row whose field `n` equals `bad`.
pub struct FailOnRow {
    bad: i64,
}

impl FailOnRow {
    pub fn new(bad: i64) -> Self {
        Self { bad }
    }
}

impl StepLogic for FailOnRow {
    fn name(&self) -> &str {
        "fail_on_row"
    }

    fn transform(
        &mut self,
        input: Option<&RowEnvelope>,
        _out: &mut Emitter<'_>,
    ) -> Result<Transformed, StepFailure> {
        let Some(row) = input else {
            return Ok(Transformed::EndOfInput);
        };
        if row.value("n").and_then(Value::as_integer) == Some(self.bad) {
            return Err(RowFailure::new(format!("row {} is malformed", self.bad))
                .with_field("n")
                .with_code("BAD")
                .into());
        }
        Ok(Transformed::Emit(row.clone()))
    }
}

/// Fails `init`.
pub struct RefuseInit;

impl StepLogic for RefuseInit {
    fn name(&self) -> &str {
        "refuse_init"
    }

    fn init(&mut self, _ctx: &InitContext) -> bool {
        false
    }

    fn transform(
        &mut self,
        _input: Option<&RowEnvelope>,
        _out: &mut Emitter<'_>,
    ) -> Result<Transformed, StepFailure> {
        Ok(Transformed::EndOfInput)
    }
}
