// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::channel::{RowChannel, StepCopyId};
use crate::errors::{PartitionError, StepError};
use crate::observability::messages::channel::PartitionRouted;
use crate::observability::messages::StructuredLog;
use crate::routing::{Partitioner, RowDistributor};
use crate::row::RowEnvelope;

/// The outputs feeding one partitioned target step.
pub(crate) struct PartitionGroup {
    pub(crate) partitioner: Arc<dyn Partitioner>,
    /// Indexed by target copy number.
    pub(crate) channel_by_copy: Vec<Arc<RowChannel>>,
}

impl PartitionGroup {
    fn channel_for(&self, partition: usize) -> Option<&Arc<RowChannel>> {
        match self.channel_by_copy.len() {
            0 => None,
            copies => self.channel_by_copy.get(partition % copies),
        }
    }
}

/// How a step copy routes its rows, resolved once when the graph is built.
pub(crate) enum OutputRouting {
    /// Zero or one output.
    Direct,
    Distributed(Box<dyn RowDistributor>),
    Partitioned(Vec<PartitionGroup>),
}

impl OutputRouting {
    pub(crate) fn describe(&self) -> String {
        match self {
            OutputRouting::Direct => "direct".to_string(),
            OutputRouting::Distributed(distributor) => {
                format!("distributed by {}", distributor.code())
            }
            OutputRouting::Partitioned(groups) => {
                let parts: Vec<String> = groups.iter().map(|g| g.partitioner.describe()).collect();
                format!("partitioned: {}", parts.join("; "))
            }
        }
    }

    /// Delivers `row` and returns the number of channels that received it.
    pub(crate) fn route(
        &mut self,
        step: &StepCopyId,
        row: RowEnvelope,
        outputs: &[Arc<RowChannel>],
    ) -> Result<usize, StepError> {
        match self {
            OutputRouting::Direct => match outputs.first() {
                Some(channel) => {
                    channel.put(&row.schema, row.row)?;
                    Ok(1)
                }
                None => Ok(0),
            },
            OutputRouting::Distributed(distributor) => Ok(distributor.distribute(row, outputs)?),
            OutputRouting::Partitioned(groups) => route_partitioned(step, groups, row),
        }
    }
}

fn route_partitioned(
    step: &StepCopyId,
    groups: &[PartitionGroup],
    row: RowEnvelope,
) -> Result<usize, StepError> {
    let mut delivered = 0;
    for group in groups {
        let partitions = group.partitioner.nr_partitions();
        let partition = group
            .partitioner
            .partition_of(&row)
            .map_err(|e| match e {
                PartitionError::MissingKey { field } => StepError::MissingPartitionKey {
                    step: step.to_string(),
                    field,
                },
            })?;
        if partition >= partitions {
            return Err(StepError::PartitionOutOfRange {
                step: step.to_string(),
                partition,
                partitions,
            });
        }
        let Some(channel) = group.channel_for(partition) else {
            continue;
        };
        channel.put(&row.schema, row.row.clone())?;
        PartitionRouted {
            step,
            partition,
            channel: channel.id(),
        }
        .log();
        delivered += 1;
    }
    Ok(delivered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelId, Received};
    use crate::routing::ModPartitioner;
    use crate::row::{Row, Schema, Value, ValueMeta, ValueType};
    use tokio_util::sync::CancellationToken;

    fn target_channels(copies: usize) -> Vec<Arc<RowChannel>> {
        let stop = CancellationToken::new();
        (0..copies)
            .map(|copy| {
                let id = ChannelId::new(StepCopyId::new("src", 0), StepCopyId::new("group", copy));
                Arc::new(RowChannel::new(id, 16, stop.clone()))
            })
            .collect()
    }

    fn keyed(key: &str, n: i64) -> RowEnvelope {
        let schema = Arc::new(Schema::new(vec![
            ValueMeta::new("key", ValueType::String),
            ValueMeta::new("n", ValueType::Integer),
        ]));
        RowEnvelope::new(schema, Row::new(vec![Value::from(key), Value::Integer(n)]))
    }

    fn values(channel: &RowChannel) -> Vec<i64> {
        channel.mark_done();
        let mut seen = Vec::new();
        while let Ok(Received::Row(env)) = channel.get() {
            seen.extend(env.value("n").and_then(Value::as_integer));
        }
        seen
    }

    #[test]
    fn partitions_map_onto_copies() {
        let channels = target_channels(2);
        let mut routing = OutputRouting::Partitioned(vec![PartitionGroup {
            partitioner: Arc::new(ModPartitioner::on_field("key", 4)),
            channel_by_copy: channels.clone(),
        }]);
        let step = StepCopyId::new("src", 0);

        // "a" = 97 -> p1 -> copy 1, "b" = 98 -> p2 -> copy 0, "c" = 99 -> p3 -> copy 1
        for (key, n) in [("a", 1), ("b", 2), ("c", 3), ("a", 4)] {
            assert_eq!(routing.route(&step, keyed(key, n), &[]).unwrap(), 1);
        }
        assert_eq!(values(&channels[0]), vec![2]);
        assert_eq!(values(&channels[1]), vec![1, 3, 4]);
    }

    #[test]
    fn missing_key_is_step_fatal() {
        let mut routing = OutputRouting::Partitioned(vec![PartitionGroup {
            partitioner: Arc::new(ModPartitioner::on_field("customer", 2)),
            channel_by_copy: target_channels(2),
        }]);
        let err = routing
            .route(&StepCopyId::new("src", 0), keyed("a", 1), &[])
            .unwrap_err();
        assert!(matches!(err, StepError::MissingPartitionKey { .. }));
    }

    #[test]
    fn direct_without_outputs_delivers_nowhere() {
        let mut routing = OutputRouting::Direct;
        let delivered = routing
            .route(&StepCopyId::new("src", 0), keyed("a", 1), &[])
            .unwrap();
        assert_eq!(delivered, 0);
    }
}
