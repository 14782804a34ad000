// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for row channel and input stream events.

use crate::channel::{ChannelId, StepCopyId};
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A channel bound its schema from the first row put.
///
/// # Log Level
/// `debug!` - Wiring detail
pub struct SchemaBound<'a> {
    pub channel: &'a ChannelId,
    pub field_count: usize,
}

impl Display for SchemaBound<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Channel {} bound schema with {} fields",
            self.channel, self.field_count
        )
    }
}

impl StructuredLog for SchemaBound<'_> {
    fn log(&self) {
        tracing::debug!(
            channel = %self.channel,
            field_count = self.field_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("schema_bound", span_name = name, channel = %self.channel)
    }
}

/// An input channel is done and drained, and leaves the rotation.
///
/// # Log Level
/// `debug!` - Lifecycle detail
pub struct InputExhausted<'a> {
    pub step: &'a StepCopyId,
    pub channel: &'a ChannelId,
    pub remaining: usize,
}

impl Display for InputExhausted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Step {} finished reading from {} ({} inputs left)",
            self.step, self.channel, self.remaining
        )
    }
}

impl StructuredLog for InputExhausted<'_> {
    fn log(&self) {
        tracing::debug!(
            step = %self.step,
            channel = %self.channel,
            remaining = self.remaining,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "input_exhausted",
            span_name = name,
            step = %self.step,
            channel = %self.channel,
        )
    }
}

/// Rows from two producer steps were checked for a common layout.
///
/// # Log Level
/// `debug!` - One-time structural check
pub struct InputsChecked<'a> {
    pub step: &'a StepCopyId,
    pub reference: &'a str,
    pub other: &'a str,
}

impl Display for InputsChecked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Step {} verified rows from '{}' match rows from '{}'",
            self.step, self.other, self.reference
        )
    }
}

impl StructuredLog for InputsChecked<'_> {
    fn log(&self) {
        tracing::debug!(
            step = %self.step,
            reference = self.reference,
            other = self.other,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("inputs_checked", span_name = name, step = %self.step)
    }
}

/// A row was sent to the copy owning its partition.
///
/// # Log Level
/// `trace!` - Row-level detail
pub struct PartitionRouted<'a> {
    pub step: &'a StepCopyId,
    pub partition: usize,
    pub channel: &'a ChannelId,
}

impl Display for PartitionRouted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Step {} partitioned row #{} to {}",
            self.step, self.partition, self.channel
        )
    }
}

impl StructuredLog for PartitionRouted<'_> {
    fn log(&self) {
        tracing::trace!(
            step = %self.step,
            partition = self.partition,
            channel = %self.channel,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!(
            "partition_routed",
            span_name = name,
            step = %self.step,
            partition = self.partition,
        )
    }
}
