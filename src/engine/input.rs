// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use crate::channel::{Received, RowChannel, StepCopyId};
use crate::errors::StepError;
use crate::observability::messages::channel::{InputExhausted, InputsChecked};
use crate::observability::messages::StructuredLog;
use crate::row::{RowEnvelope, Schema};

/// Rows read from one input before moving to the next.
const ROWS_PER_BLOCK: usize = 500;

/// How long to wait on an empty input before trying the next one.
const SWITCH_TIMEOUT: Duration = Duration::from_millis(1);

/// Where a step copy reads its rows from.
pub(crate) enum InputStreams {
    None,
    Single(Arc<RowChannel>),
    RoundRobin(RoundRobinInputs),
}

impl InputStreams {
    pub(crate) fn from_channels(channels: Vec<Arc<RowChannel>>, safe_mode: bool) -> Self {
        match channels.len() {
            0 => InputStreams::None,
            1 => channels
                .into_iter()
                .next()
                .map_or(InputStreams::None, InputStreams::Single),
            _ => InputStreams::RoundRobin(RoundRobinInputs::new(channels, safe_mode)),
        }
    }

    pub(crate) fn is_none(&self) -> bool {
        matches!(self, InputStreams::None)
    }

    pub(crate) fn count(&self) -> usize {
        match self {
            InputStreams::None => 0,
            InputStreams::Single(_) => 1,
            InputStreams::RoundRobin(inputs) => inputs.channels.len(),
        }
    }

    /// Reads the next row, or `None` once every input is exhausted.
    pub(crate) fn read(&mut self, step: &StepCopyId) -> Result<Option<RowEnvelope>, StepError> {
        match self {
            InputStreams::None => Ok(None),
            InputStreams::Single(channel) => match channel.get()? {
                Received::Row(env) => Ok(Some(env)),
                Received::EndOfStream => Ok(None),
            },
            InputStreams::RoundRobin(inputs) => inputs.read(step),
        }
    }
}

/// Several inputs read in turn.
///
/// The first row from each producer step other than the reference one
/// triggers a single structural check against the reference layout; in safe
/// mode every row is checked and the reference layout must not repeat a
/// field name.
pub(crate) struct RoundRobinInputs {
    channels: Vec<Arc<RowChannel>>,
    current: usize,
    block: usize,
    /// Producer steps whose layout has been compared with the reference.
    verified: BTreeSet<String>,
    safe_mode: bool,
    reference: Option<(String, Arc<Schema>)>,
}

impl RoundRobinInputs {
    fn new(channels: Vec<Arc<RowChannel>>, safe_mode: bool) -> Self {
        Self {
            channels,
            current: 0,
            block: 0,
            verified: BTreeSet::new(),
            safe_mode,
            reference: None,
        }
    }

    fn read(&mut self, step: &StepCopyId) -> Result<Option<RowEnvelope>, StepError> {
        loop {
            if self.channels.is_empty() {
                return Ok(None);
            }
            if self.block >= ROWS_PER_BLOCK {
                self.advance();
            }
            if self.current >= self.channels.len() {
                self.current = 0;
            }

            let channel = Arc::clone(&self.channels[self.current]);
            match channel.get_timeout(SWITCH_TIMEOUT)? {
                Some(Received::Row(env)) => {
                    self.block += 1;
                    self.verify(step, &channel.id().producer.step, &env)?;
                    return Ok(Some(env));
                }
                Some(Received::EndOfStream) => {
                    self.channels.remove(self.current);
                    self.block = 0;
                    InputExhausted {
                        step,
                        channel: channel.id(),
                        remaining: self.channels.len(),
                    }
                    .log();
                }
                None => self.advance(),
            }
        }
    }

    fn advance(&mut self) {
        self.block = 0;
        self.current += 1;
        if self.current >= self.channels.len() {
            self.current = 0;
        }
    }

    fn verify(
        &mut self,
        step: &StepCopyId,
        producer: &str,
        env: &RowEnvelope,
    ) -> Result<(), StepError> {
        let Some((reference_step, reference)) = &self.reference else {
            if self.safe_mode {
                let duplicates = env.schema.duplicate_field_names();
                if !duplicates.is_empty() {
                    return Err(StepError::IncompatibleInputs {
                        step: step.to_string(),
                        reason: format!(
                            "rows from '{}' repeat field names {:?}",
                            producer, duplicates
                        ),
                    });
                }
            }
            self.reference = Some((producer.to_string(), Arc::clone(&env.schema)));
            self.verified.insert(producer.to_string());
            return Ok(());
        };
        // Copies of one step always share a layout.
        let first_row = !self.verified.contains(producer);
        if !self.safe_mode && !first_row {
            return Ok(());
        }

        let compatibility = reference.compatibility(&env.schema);
        if !compatibility.is_compatible() {
            return Err(StepError::IncompatibleInputs {
                step: step.to_string(),
                reason: format!(
                    "rows from '{}' differ from rows from '{}': {}",
                    producer, reference_step, compatibility
                ),
            });
        }
        if first_row {
            InputsChecked {
                step,
                reference: reference_step,
                other: producer,
            }
            .log();
            self.verified.insert(producer.to_string());
        }
        Ok(())
    }
}
