// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::PartitionError;
use crate::row::{RowEnvelope, Value};

/// Maps a row to a partition index in `[0, nr_partitions)`.
///
/// Implementations must be pure: rows with equal key values always map to
/// the same partition within a run.
pub trait Partitioner: Send + Sync {
    fn nr_partitions(&self) -> usize;

    fn partition_of(&self, row: &RowEnvelope) -> Result<usize, PartitionError>;

    fn describe(&self) -> String {
        format!("{} partitions", self.nr_partitions())
    }
}

/// Remainder partitioning over one or more key fields.
///
/// Integer keys use their value directly; strings and binaries are hashed
/// with a 31-multiplier rolling hash; numbers are truncated. Multiple key
/// fields are folded with the same multiplier.
#[derive(Debug, Clone)]
pub struct ModPartitioner {
    fields: Vec<String>,
    partitions: usize,
}

impl ModPartitioner {
    pub fn new(fields: Vec<String>, partitions: usize) -> Self {
        Self {
            fields,
            partitions: partitions.max(1),
        }
    }

    pub fn on_field(field: impl Into<String>, partitions: usize) -> Self {
        Self::new(vec![field.into()], partitions)
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

impl Partitioner for ModPartitioner {
    fn nr_partitions(&self) -> usize {
        self.partitions
    }

    fn partition_of(&self, row: &RowEnvelope) -> Result<usize, PartitionError> {
        let mut key: i64 = 0;
        for field in &self.fields {
            let value = row.value(field).ok_or_else(|| PartitionError::MissingKey {
                field: field.clone(),
            })?;
            key = key.wrapping_mul(31).wrapping_add(key_of(value));
        }
        Ok(key.rem_euclid(self.partitions as i64) as usize)
    }

    fn describe(&self) -> String {
        format!(
            "mod({}) into {} partitions",
            self.fields.join(", "),
            self.partitions
        )
    }
}

fn key_of(value: &Value) -> i64 {
    match value {
        Value::Null => 0,
        Value::Boolean(b) => i64::from(*b),
        Value::Integer(i) => *i,
        Value::Number(n) => n.trunc() as i64,
        Value::String(s) => i64::from(rolling_hash(s.encode_utf16().map(i32::from))),
        Value::Binary(bytes) => i64::from(rolling_hash(bytes.iter().map(|b| i32::from(*b as i8)))),
    }
}

/// `h = 31 * h + unit`, wrapping at 32 bits.
fn rolling_hash(units: impl Iterator<Item = i32>) -> i32 {
    units.fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit))
}
