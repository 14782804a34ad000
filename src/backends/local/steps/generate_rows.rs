// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use serde::Deserialize;

use crate::engine::Emitter;
use crate::row::{Row, RowEnvelope, Schema, Value, ValueMeta, ValueType};
use crate::traits::{StepFailure, StepLogic, Transformed};

/// A constant field of every generated row.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeneratedField {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(default)]
    pub value: Value,
}

/// Options of the `generate_rows` step.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GenerateRowsOptions {
    pub limit: u64,
    /// Appends a field numbering the rows from 1.
    pub counter_field: Option<String>,
    pub fields: Vec<GeneratedField>,
}

impl Default for GenerateRowsOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            counter_field: None,
            fields: Vec::new(),
        }
    }
}

/// Source step emitting `limit` rows built from constant fields and an
/// optional counter.
pub struct GenerateRows {
    schema: Arc<Schema>,
    template: Row,
    counter: bool,
    limit: u64,
    produced: u64,
}

impl GenerateRows {
    pub fn new(options: GenerateRowsOptions) -> Self {
        let mut schema = Schema::default();
        let mut values = Vec::with_capacity(options.fields.len());
        for field in options.fields {
            schema.push(ValueMeta::new(field.name, field.value_type));
            values.push(field.value);
        }
        let counter = match options.counter_field {
            Some(name) => {
                schema.push(ValueMeta::new(name, ValueType::Integer));
                true
            }
            None => false,
        };
        Self {
            schema: Arc::new(schema),
            template: Row::new(values),
            counter,
            limit: options.limit,
            produced: 0,
        }
    }

    /// Rows with a single integer field `n` counting from 1 to `limit`.
    pub fn counting(limit: u64) -> Self {
        Self::new(GenerateRowsOptions {
            limit,
            counter_field: Some("n".to_string()),
            fields: Vec::new(),
        })
    }
}

impl StepLogic for GenerateRows {
    fn name(&self) -> &str {
        "generate_rows"
    }

    fn transform(
        &mut self,
        _input: Option<&RowEnvelope>,
        _out: &mut Emitter<'_>,
    ) -> Result<Transformed, StepFailure> {
        if self.produced >= self.limit {
            return Ok(Transformed::EndOfInput);
        }
        self.produced += 1;

        let mut row = self.template.clone();
        if self.counter {
            let n = i64::try_from(self.produced).unwrap_or(i64::MAX);
            row = row.extended([Value::Integer(n)]);
        }
        Ok(Transformed::Emit(RowEnvelope::new(Arc::clone(&self.schema), row)))
    }
}
