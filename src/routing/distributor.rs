// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::channel::RowChannel;
use crate::errors::ChannelError;
use crate::row::RowEnvelope;

pub const BROADCAST: &str = "broadcast";
pub const ROUND_ROBIN: &str = "round_robin";

/// Chooses which of several equivalent outputs receive a row, and delivers it.
///
/// Implementations must deliver every row to at least one output when any
/// exist, and must not starve an output indefinitely.
pub trait RowDistributor: Send {
    fn code(&self) -> &str;

    fn describe(&self) -> &str;

    /// Delivers `row` and returns the number of channels that received it.
    fn distribute(
        &mut self,
        row: RowEnvelope,
        outputs: &[Arc<RowChannel>],
    ) -> Result<usize, ChannelError>;
}

/// Copies every row onto every output.
#[derive(Debug, Default)]
pub struct BroadcastDistributor;

impl RowDistributor for BroadcastDistributor {
    fn code(&self) -> &str {
        BROADCAST
    }

    fn describe(&self) -> &str {
        "copy each row to every output"
    }

    fn distribute(
        &mut self,
        row: RowEnvelope,
        outputs: &[Arc<RowChannel>],
    ) -> Result<usize, ChannelError> {
        let Some((first, rest)) = outputs.split_first() else {
            return Ok(0);
        };
        for channel in rest {
            channel.put(&row.schema, row.row.clone())?;
        }
        first.put(&row.schema, row.row)?;
        Ok(outputs.len())
    }
}

/// Sends each row to exactly one output, rotating.
#[derive(Debug, Default)]
pub struct RoundRobinDistributor {
    next: usize,
}

impl RowDistributor for RoundRobinDistributor {
    fn code(&self) -> &str {
        ROUND_ROBIN
    }

    fn describe(&self) -> &str {
        "send each row to the next output in turn"
    }

    fn distribute(
        &mut self,
        row: RowEnvelope,
        outputs: &[Arc<RowChannel>],
    ) -> Result<usize, ChannelError> {
        if outputs.is_empty() {
            return Ok(0);
        }
        let slot = self.next % outputs.len();
        outputs[slot].put(&row.schema, row.row)?;
        self.next = (slot + 1) % outputs.len();
        Ok(1)
    }
}

pub type DistributorFactory = Arc<dyn Fn() -> Box<dyn RowDistributor> + Send + Sync>;

/// Named distributor factories.
///
/// Every step copy gets its own distributor instance, so cursors are never
/// shared between threads.
#[derive(Clone, Default)]
pub struct DistributorRegistry {
    factories: BTreeMap<String, DistributorFactory>,
}

impl DistributorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(BROADCAST, || Box::new(BroadcastDistributor));
        registry.register(ROUND_ROBIN, || Box::new(RoundRobinDistributor::default()));
        registry
    }

    pub fn register<F>(&mut self, code: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn RowDistributor> + Send + Sync + 'static,
    {
        self.factories.insert(code.into(), Arc::new(factory));
    }

    pub fn contains(&self, code: &str) -> bool {
        self.factories.contains_key(code)
    }

    pub fn create(&self, code: &str) -> Option<Box<dyn RowDistributor>> {
        self.factories.get(code).map(|factory| factory())
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for DistributorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

/// Which distributor a step uses when it does, or does not, distribute.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DistributionDefaults {
    pub distributing: String,
    pub copying: String,
}

impl Default for DistributionDefaults {
    fn default() -> Self {
        Self {
            distributing: ROUND_ROBIN.to_string(),
            copying: BROADCAST.to_string(),
        }
    }
}

impl DistributionDefaults {
    /// The code to use for a step, honouring an explicit override.
    pub fn code_for<'a>(&'a self, distribute: bool, explicit: Option<&'a str>) -> &'a str {
        match explicit {
            Some(code) => code,
            None if distribute => &self.distributing,
            None => &self.copying,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelId, Received, StepCopyId};
    use crate::row::{Row, Schema, Value, ValueMeta, ValueType};
    use tokio_util::sync::CancellationToken;

    fn outputs(n: usize) -> Vec<Arc<RowChannel>> {
        let stop = CancellationToken::new();
        (0..n)
            .map(|copy| {
                let id = ChannelId::new(StepCopyId::new("src", 0), StepCopyId::new("dst", copy));
                Arc::new(RowChannel::new(id, 64, stop.clone()))
            })
            .collect()
    }

    fn envelope(n: i64) -> RowEnvelope {
        let schema = Arc::new(Schema::new(vec![ValueMeta::new("n", ValueType::Integer)]));
        RowEnvelope::new(schema, Row::new(vec![Value::Integer(n)]))
    }

    fn drain(channel: &RowChannel) -> Vec<i64> {
        channel.mark_done();
        let mut seen = Vec::new();
        while let Ok(Received::Row(env)) = channel.get() {
            seen.extend(env.row.get(0).and_then(Value::as_integer));
        }
        seen
    }

    #[test]
    fn round_robin_rotates_in_order() {
        let outs = outputs(3);
        let mut distributor = RoundRobinDistributor::default();
        for n in 0..7 {
            assert_eq!(distributor.distribute(envelope(n), &outs).unwrap(), 1);
        }
        assert_eq!(drain(&outs[0]), vec![0, 3, 6]);
        assert_eq!(drain(&outs[1]), vec![1, 4]);
        assert_eq!(drain(&outs[2]), vec![2, 5]);
    }

    #[test]
    fn broadcast_reaches_every_output() {
        let outs = outputs(3);
        let mut distributor = BroadcastDistributor;
        for n in 0..4 {
            assert_eq!(distributor.distribute(envelope(n), &outs).unwrap(), 3);
        }
        for out in &outs {
            assert_eq!(drain(out), vec![0, 1, 2, 3]);
        }
    }

    #[test]
    fn distributors_tolerate_no_outputs() {
        let mut rr = RoundRobinDistributor::default();
        let mut bc = BroadcastDistributor;
        assert_eq!(rr.distribute(envelope(1), &[]).unwrap(), 0);
        assert_eq!(bc.distribute(envelope(1), &[]).unwrap(), 0);
    }

    #[test]
    fn registry_creates_by_code() {
        let registry = DistributorRegistry::with_builtins();
        assert_eq!(registry.create(BROADCAST).unwrap().code(), BROADCAST);
        assert_eq!(registry.create(ROUND_ROBIN).unwrap().code(), ROUND_ROBIN);
        assert!(registry.create("load_balance").is_none());
        assert_eq!(registry.codes().collect::<Vec<_>>(), vec![BROADCAST, ROUND_ROBIN]);
    }

    #[test]
    fn polarity_follows_defaults() {
        let defaults = DistributionDefaults::default();
        assert_eq!(defaults.code_for(true, None), ROUND_ROBIN);
        assert_eq!(defaults.code_for(false, None), BROADCAST);
        assert_eq!(defaults.code_for(false, Some("custom")), "custom");

        let flipped = DistributionDefaults {
            distributing: BROADCAST.to_string(),
            copying: ROUND_ROBIN.to_string(),
        };
        assert_eq!(flipped.code_for(true, None), BROADCAST);
    }
}
