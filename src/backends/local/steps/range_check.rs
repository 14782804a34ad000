// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;

use crate::engine::Emitter;
use crate::errors::{RowFailure, StepError};
use crate::row::{RowEnvelope, Value};
use crate::traits::{StepFailure, StepLogic, Transformed};

/// Options of the `range_check` step.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RangeCheckOptions {
    pub field: String,
    #[serde(default = "lowest")]
    pub min: i64,
    #[serde(default = "highest")]
    pub max: i64,
}

fn lowest() -> i64 {
    i64::MIN
}

fn highest() -> i64 {
    i64::MAX
}

/// Passes rows whose integer `field` lies in `[min, max]`; any other row is a
/// row failure.
pub struct RangeCheck {
    options: RangeCheckOptions,
}

impl RangeCheck {
    pub fn new(options: RangeCheckOptions) -> Self {
        Self { options }
    }

    pub fn on_field(field: impl Into<String>, min: i64, max: i64) -> Self {
        Self::new(RangeCheckOptions {
            field: field.into(),
            min,
            max,
        })
    }

    fn check(&self, row: &RowEnvelope) -> Result<(), StepFailure> {
        let field = &self.options.field;
        let value = row.value(field).ok_or_else(|| {
            StepError::logic(format!("field '{}' is not in the input rows", field))
        })?;

        let failure = match value {
            Value::Integer(n) if (self.options.min..=self.options.max).contains(n) => return Ok(()),
            Value::Integer(n) => RowFailure::new(format!(
                "{} = {} is outside [{}, {}]",
                field, n, self.options.min, self.options.max
            ))
            .with_code("RANGE"),
            other => RowFailure::new(format!("{} = {} is not an integer", field, other))
                .with_code("TYPE"),
        };
        Err(failure.with_field(field.as_str()).into())
    }
}

impl StepLogic for RangeCheck {
    fn name(&self) -> &str {
        "range_check"
    }

    fn transform(
        &mut self,
        input: Option<&RowEnvelope>,
        _out: &mut Emitter<'_>,
    ) -> Result<Transformed, StepFailure> {
        let Some(row) = input else {
            return Ok(Transformed::EndOfInput);
        };
        self.check(row)?;
        Ok(Transformed::Emit(row.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::{Row, Schema, ValueMeta, ValueType};
    use std::sync::Arc;

    fn row(value: Value) -> RowEnvelope {
        let schema = Arc::new(Schema::new(vec![ValueMeta::new("n", ValueType::Integer)]));
        RowEnvelope::new(schema, Row::new(vec![value]))
    }

    #[test]
    fn range_check_table() {
        struct TestCase {
            name: &'static str,
            value: Value,
            code: Option<&'static str>,
        }

        let test_cases = vec![
            TestCase {
                name: "inside",
                value: Value::Integer(5),
                code: None,
            },
            TestCase {
                name: "on the bound",
                value: Value::Integer(10),
                code: None,
            },
            TestCase {
                name: "above",
                value: Value::Integer(11),
                code: Some("RANGE"),
            },
            TestCase {
                name: "not an integer",
                value: Value::from("five"),
                code: Some("TYPE"),
            },
        ];

        let check = RangeCheck::on_field("n", 0, 10);
        for test_case in test_cases {
            let result = check.check(&row(test_case.value));
            match (result, test_case.code) {
                (Ok(()), None) => {}
                (Err(StepFailure::Row(failure)), Some(code)) => {
                    assert_eq!(failure.codes, vec![code], "Test case '{}'", test_case.name);
                    assert_eq!(failure.field_names, vec!["n"], "Test case '{}'", test_case.name);
                }
                (other, _) => panic!("Test case '{}': unexpected {:?}", test_case.name, other),
            }
        }
    }

    #[test]
    fn missing_field_is_fatal() {
        let check = RangeCheck::on_field("amount", 0, 10);
        assert!(matches!(
            check.check(&row(Value::Integer(1))),
            Err(StepFailure::Fatal(StepError::Logic { .. }))
        ));
    }
}
