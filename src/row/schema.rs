// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use super::ValueType;

/// Descriptor of one field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueMeta {
    pub name: String,
    pub value_type: ValueType,
    #[serde(default)]
    pub length: Option<u32>,
    #[serde(default)]
    pub precision: Option<u32>,
}

impl ValueMeta {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            length: None,
            precision: None,
        }
    }

    pub fn with_length(mut self, length: u32, precision: Option<u32>) -> Self {
        self.length = Some(length);
        self.precision = precision;
        self
    }
}

impl fmt::Display for ValueMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.value_type)?;
        match (self.length, self.precision) {
            (Some(len), Some(prec)) => write!(f, "({}, {})", len, prec),
            (Some(len), None) => write!(f, "({})", len),
            _ => Ok(()),
        }
    }
}

/// Result of comparing two schemas structurally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compatibility {
    Compatible,
    VaryingSize { expected: usize, actual: usize },
    MixingLayout { position: usize, expected: String, actual: String },
    MixingTypes { position: usize, expected: String, actual: String },
}

impl Compatibility {
    pub fn is_compatible(&self) -> bool {
        matches!(self, Compatibility::Compatible)
    }
}

impl fmt::Display for Compatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compatibility::Compatible => f.write_str("compatible"),
            Compatibility::VaryingSize { expected, actual } => write!(
                f,
                "rows have varying sizes: expected {} fields, found {}",
                expected, actual
            ),
            Compatibility::MixingLayout { position, expected, actual } => write!(
                f,
                "mixing row layouts at field {}: expected [{}], found [{}]",
                position, expected, actual
            ),
            Compatibility::MixingTypes { position, expected, actual } => write!(
                f,
                "mixing field types at field {}: expected [{}], found [{}]",
                position, expected, actual
            ),
        }
    }
}

/// Ordered description of the fields of every row on one channel.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<ValueMeta>,
}

impl Schema {
    pub fn new(fields: Vec<ValueMeta>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[ValueMeta] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, index: usize) -> Option<&ValueMeta> {
        self.fields.get(index)
    }

    pub fn push(&mut self, meta: ValueMeta) {
        self.fields.push(meta);
    }

    pub fn extend(&mut self, other: &Schema) {
        self.fields.extend(other.fields.iter().cloned());
    }

    /// Position of the field called `name`, compared case-insensitively.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|meta| meta.name.eq_ignore_ascii_case(name))
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|meta| meta.name.as_str()).collect()
    }

    /// Positions of fields whose name is empty or whitespace.
    pub fn blank_field_names(&self) -> Vec<usize> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, meta)| meta.name.trim().is_empty())
            .map(|(i, _)| i)
            .collect()
    }

    /// Field names that appear more than once, in first-repeat order.
    pub fn duplicate_field_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for meta in &self.fields {
            let key = meta.name.to_ascii_lowercase();
            if !seen.insert(key) && !duplicates.contains(&meta.name) {
                duplicates.push(meta.name.clone());
            }
        }
        duplicates
    }

    /// Compares `other` against `self` as the reference layout.
    ///
    /// Size is checked first, then each field's name (case-insensitive) and
    /// type in order; the first difference is reported.
    pub fn compatibility(&self, other: &Schema) -> Compatibility {
        if self.len() != other.len() {
            return Compatibility::VaryingSize {
                expected: self.len(),
                actual: other.len(),
            };
        }

        for (i, (reference, compare)) in self.fields.iter().zip(&other.fields).enumerate() {
            if !reference.name.eq_ignore_ascii_case(&compare.name) {
                return Compatibility::MixingLayout {
                    position: i + 1,
                    expected: reference.to_string(),
                    actual: compare.to_string(),
                };
            }
            if reference.value_type != compare.value_type {
                return Compatibility::MixingTypes {
                    position: i + 1,
                    expected: reference.to_string(),
                    actual: compare.to_string(),
                };
            }
        }

        Compatibility::Compatible
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.fields.iter().map(|m| m.to_string()).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}
