// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Bounded row exchange between step copies.
//!
//! Every [`RowChannel`] connects exactly one producing step copy with one
//! consuming step copy and preserves the order of the rows put into it.

mod row_channel;

pub use row_channel::{RowChannel, DEFAULT_POLL_INTERVAL};

use crate::row::RowEnvelope;
use serde::Serialize;
use std::fmt;

/// Identity of one copy of a step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StepCopyId {
    pub step: String,
    pub copy: usize,
}

impl StepCopyId {
    pub fn new(step: impl Into<String>, copy: usize) -> Self {
        Self {
            step: step.into(),
            copy,
        }
    }
}

impl fmt::Display for StepCopyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.step, self.copy)
    }
}

/// Identity of a channel: the producer and consumer copies it connects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelId {
    pub producer: StepCopyId,
    pub consumer: StepCopyId,
}

impl ChannelId {
    pub fn new(producer: StepCopyId, consumer: StepCopyId) -> Self {
        Self { producer, consumer }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.producer, self.consumer)
    }
}

/// Outcome of reading from a channel.
#[derive(Debug, Clone)]
pub enum Received {
    Row(RowEnvelope),
    /// The producer is done and every buffered row has been taken.
    EndOfStream,
}

impl Received {
    pub fn into_row(self) -> Option<RowEnvelope> {
        match self {
            Received::Row(env) => Some(env),
            Received::EndOfStream => None,
        }
    }
}
