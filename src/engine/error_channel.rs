// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use serde::Deserialize;

use crate::channel::RowChannel;
use crate::errors::{ChannelError, RowFailure};
use crate::row::{RowEnvelope, Schema, Value, ValueMeta, ValueType};

/// Names of the diagnostic columns appended to error rows.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ErrorFieldNames {
    #[serde(rename = "nr_errors_field")]
    pub nr_errors: String,
    #[serde(rename = "descriptions_field")]
    pub descriptions: String,
    #[serde(rename = "fields_field")]
    pub fields: String,
    #[serde(rename = "codes_field")]
    pub codes: String,
}

impl Default for ErrorFieldNames {
    fn default() -> Self {
        Self {
            nr_errors: "nr_errors".to_string(),
            descriptions: "error_descriptions".to_string(),
            fields: "error_fields".to_string(),
            codes: "error_codes".to_string(),
        }
    }
}

/// Limits on rejected rows before the step fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RejectionLimits {
    pub max_errors: Option<u64>,
    pub max_percent_errors: Option<u64>,
    /// Rows to read before `max_percent_errors` applies.
    pub min_percent_rows: Option<u64>,
}

impl RejectionLimits {
    /// Describes the first limit exceeded, if any.
    pub fn exceeded(&self, rejected: u64, read: u64) -> Option<String> {
        if let Some(max) = self.max_errors.filter(|max| *max > 0) {
            if rejected > max {
                return Some(format!("more than {} rejected rows", max));
            }
        }

        let max_pct = self.max_percent_errors.filter(|pct| *pct > 0)?;
        let min_rows = self.min_percent_rows.unwrap_or(0);
        if rejected == 0 || (min_rows > 0 && read < min_rows) {
            return None;
        }
        let pct = (100 * rejected).div_ceil(read.max(1));
        (pct > max_pct).then(|| format!("{}% rejected exceeds {}%", pct, max_pct))
    }
}

/// Error handling configured on a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorHandling {
    /// Step receiving the error rows.
    pub target: String,
    pub fields: ErrorFieldNames,
    pub limits: RejectionLimits,
}

impl ErrorHandling {
    pub fn to_step(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            fields: ErrorFieldNames::default(),
            limits: RejectionLimits::default(),
        }
    }

    pub fn with_fields(mut self, fields: ErrorFieldNames) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_limits(mut self, limits: RejectionLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// Output carrying failed rows plus diagnostic columns.
///
/// The error schema is derived once, from the first failing row's schema
/// with the four diagnostic columns appended.
pub struct ErrorChannel {
    channel: Arc<RowChannel>,
    fields: ErrorFieldNames,
    schema: Option<Arc<Schema>>,
}

impl ErrorChannel {
    pub fn new(channel: Arc<RowChannel>, fields: ErrorFieldNames) -> Self {
        Self {
            channel,
            fields,
            schema: None,
        }
    }

    pub fn channel(&self) -> &Arc<RowChannel> {
        &self.channel
    }

    /// The error schema, once the first error row has been written.
    pub fn schema(&self) -> Option<&Arc<Schema>> {
        self.schema.as_ref()
    }

    /// Writes `row` with diagnostics and returns the envelope as sent.
    pub fn put_error(
        &mut self,
        row: &RowEnvelope,
        failure: &RowFailure,
    ) -> Result<RowEnvelope, ChannelError> {
        let schema = self.error_schema(&row.schema);
        let values = row.row.clone().extended([
            Value::Integer(failure.error_count),
            Value::String(failure.description.clone()),
            Value::String(failure.field_names.join(",")),
            Value::String(failure.codes.join(",")),
        ]);
        self.channel.put(&schema, values.clone())?;
        Ok(RowEnvelope::new(schema, values))
    }

    pub fn mark_done(&self) {
        self.channel.mark_done();
    }

    fn error_schema(&mut self, base: &Schema) -> Arc<Schema> {
        let fields = &self.fields;
        let schema = self.schema.get_or_insert_with(|| {
            let mut schema = base.clone();
            schema.push(ValueMeta::new(fields.nr_errors.as_str(), ValueType::Integer));
            schema.push(ValueMeta::new(fields.descriptions.as_str(), ValueType::String));
            schema.push(ValueMeta::new(fields.fields.as_str(), ValueType::String));
            schema.push(ValueMeta::new(fields.codes.as_str(), ValueType::String));
            Arc::new(schema)
        });
        Arc::clone(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelId, Received, StepCopyId};
    use crate::row::Row;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn error_rows_carry_diagnostics() {
        let id = ChannelId::new(StepCopyId::new("check", 0), StepCopyId::new("rejects", 0));
        let channel = Arc::new(RowChannel::new(id, 8, CancellationToken::new()));
        let names = ErrorFieldNames {
            nr_errors: "errs".to_string(),
            ..ErrorFieldNames::default()
        };
        let mut errors = ErrorChannel::new(Arc::clone(&channel), names);

        let schema = Arc::new(Schema::new(vec![ValueMeta::new("amount", ValueType::Integer)]));
        let failing = RowEnvelope::new(schema, Row::new(vec![Value::Integer(-5)]));
        let failure = RowFailure::new("negative amount")
            .with_field("amount")
            .with_code("NEG");

        errors.put_error(&failing, &failure).unwrap();

        let Received::Row(env) = channel.get().unwrap() else {
            panic!("expected an error row");
        };
        assert_eq!(
            env.schema.field_names(),
            vec!["amount", "errs", "error_descriptions", "error_fields", "error_codes"]
        );
        assert_eq!(env.value("errs"), Some(&Value::Integer(1)));
        assert_eq!(env.value("error_fields"), Some(&Value::from("amount")));
        assert_eq!(env.value("error_codes"), Some(&Value::from("NEG")));
    }

    #[test]
    fn rejection_limit_table() {
        struct TestCase {
            name: &'static str,
            limits: RejectionLimits,
            rejected: u64,
            read: u64,
            exceeded: bool,
        }

        let test_cases = vec![
            TestCase {
                name: "no limits",
                limits: RejectionLimits::default(),
                rejected: 100,
                read: 100,
                exceeded: false,
            },
            TestCase {
                name: "at max errors",
                limits: RejectionLimits {
                    max_errors: Some(2),
                    ..Default::default()
                },
                rejected: 2,
                read: 10,
                exceeded: false,
            },
            TestCase {
                name: "over max errors",
                limits: RejectionLimits {
                    max_errors: Some(2),
                    ..Default::default()
                },
                rejected: 3,
                read: 10,
                exceeded: true,
            },
            TestCase {
                name: "percentage rounds up",
                limits: RejectionLimits {
                    max_percent_errors: Some(33),
                    ..Default::default()
                },
                rejected: 1,
                read: 3,
                exceeded: true,
            },
            TestCase {
                name: "percentage waits for min rows",
                limits: RejectionLimits {
                    max_percent_errors: Some(10),
                    min_percent_rows: Some(100),
                    ..Default::default()
                },
                rejected: 5,
                read: 20,
                exceeded: false,
            },
        ];

        for test_case in test_cases {
            let result = test_case.limits.exceeded(test_case.rejected, test_case.read);
            assert_eq!(
                result.is_some(),
                test_case.exceeded,
                "Test case '{}': {:?}",
                test_case.name,
                result
            );
        }
    }
}
