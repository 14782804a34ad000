// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Row data model shared by every step copy and channel.
//!
//! A [`Row`] is an ordered, fixed-arity sequence of [`Value`]s. Its shape is
//! described by a [`Schema`], an ordered list of [`ValueMeta`] descriptors.
//! Rows travel through the engine paired with their schema as a
//! [`RowEnvelope`].

mod schema;
mod value;

pub use schema::{Compatibility, Schema, ValueMeta};
pub use value::{Value, ValueType};

use std::sync::Arc;

/// One record of typed values.
///
/// Rows are immutable once handed to a channel: producers give up ownership
/// on `put`, and broadcast routing clones the row for every extra target.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row(pub Vec<Value>);

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// Appends `values` after the existing ones, consuming the row.
    pub fn extended(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.0.extend(values);
        self
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

/// A row together with the schema describing it.
#[derive(Debug, Clone)]
pub struct RowEnvelope {
    pub schema: Arc<Schema>,
    pub row: Row,
}

impl RowEnvelope {
    pub fn new(schema: Arc<Schema>, row: Row) -> Self {
        Self { schema, row }
    }

    /// Looks a value up by field name.
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.schema.index_of(field).and_then(|i| self.row.get(i))
    }

    /// Renders the row as `name=value` pairs for row-level logging.
    pub fn describe(&self) -> String {
        self.schema
            .fields()
            .iter()
            .zip(self.row.values())
            .map(|(meta, value)| format!("{}={}", meta.name, value))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_value_lookup_by_name() {
        let schema = Arc::new(Schema::new(vec![
            ValueMeta::new("customer", ValueType::String),
            ValueMeta::new("amount", ValueType::Integer),
        ]));
        let env = RowEnvelope::new(schema, Row::new(vec![Value::from("a"), Value::Integer(3)]));

        assert_eq!(env.value("amount"), Some(&Value::Integer(3)));
        assert_eq!(env.value("missing"), None);
        assert_eq!(env.describe(), "customer=a, amount=3");
    }

    #[test]
    fn extended_appends_values() {
        let row = Row::new(vec![Value::Integer(1)]).extended([Value::Null, Value::from("x")]);
        assert_eq!(row.len(), 3);
        assert_eq!(row.get(2), Some(&Value::from("x")));
    }
}
