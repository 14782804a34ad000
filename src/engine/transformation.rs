// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Wiring step definitions and hops into runnable step copies.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::error_channel::{ErrorChannel, ErrorHandling};
use super::input::InputStreams;
use super::output::{OutputRouting, PartitionGroup};
use super::run_control::RunControl;
use super::status::{StepHandle, StepShared, StepStatus};
use super::step_io::StepIo;
use super::step_unit::StepUnit;
use crate::channel::{ChannelId, RowChannel, StepCopyId, DEFAULT_POLL_INTERVAL};
use crate::config::consts::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_COPIES, DEFAULT_DISTRIBUTE};
use crate::config::{validate_graph, GraphStep};
use crate::errors::{ExecutionError, ValidationError};
use crate::observability::messages::engine::{
    InitializationFailed, RunCompleted, RunStarted, StepThreadLost, TransformationBuilt,
};
use crate::observability::messages::StructuredLog;
use crate::routing::{DistributionDefaults, DistributorRegistry, Partitioner, RowDistributor};
use crate::traits::StepLogic;

/// Creates the business logic of one step copy, given its copy number.
pub type LogicFactory = Arc<dyn Fn(usize) -> Box<dyn StepLogic> + Send + Sync>;

/// One step of a transformation, before it is split into copies.
#[derive(Clone)]
pub struct StepDefinition {
    pub name: String,
    pub copies: usize,
    /// Selects the distributing or the copying distributor when the step has
    /// several outputs.
    pub distribute: bool,
    /// Explicit distributor code, overriding `distribute`.
    pub distributor: Option<String>,
    /// Key-based routing of the rows this step receives.
    pub partitioner: Option<Arc<dyn Partitioner>>,
    pub error_handling: Option<ErrorHandling>,
    /// Capacity of this step's input channels.
    pub channel_capacity: Option<usize>,
    pub allow_empty_field_names: bool,
    logic: LogicFactory,
}

impl StepDefinition {
    pub fn new<F>(name: impl Into<String>, logic: F) -> Self
    where
        F: Fn(usize) -> Box<dyn StepLogic> + Send + Sync + 'static,
    {
        Self::from_factory(name, Arc::new(logic))
    }

    pub fn from_factory(name: impl Into<String>, logic: LogicFactory) -> Self {
        Self {
            name: name.into(),
            copies: DEFAULT_COPIES,
            distribute: DEFAULT_DISTRIBUTE,
            distributor: None,
            partitioner: None,
            error_handling: None,
            channel_capacity: None,
            allow_empty_field_names: false,
            logic,
        }
    }

    pub fn with_copies(mut self, copies: usize) -> Self {
        self.copies = copies;
        self
    }

    pub fn distributing(mut self, distribute: bool) -> Self {
        self.distribute = distribute;
        self
    }

    pub fn with_distributor(mut self, code: impl Into<String>) -> Self {
        self.distributor = Some(code.into());
        self
    }

    pub fn partitioned_by(mut self, partitioner: Arc<dyn Partitioner>) -> Self {
        self.partitioner = Some(partitioner);
        self
    }

    pub fn with_error_handling(mut self, handling: ErrorHandling) -> Self {
        self.error_handling = Some(handling);
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = Some(capacity);
        self
    }

    pub fn allowing_empty_field_names(mut self) -> Self {
        self.allow_empty_field_names = true;
        self
    }

    fn graph_step(&self) -> GraphStep<'_> {
        GraphStep {
            name: &self.name,
            copies: self.copies,
            partitions: self.partitioner.as_ref().map(|p| p.nr_partitions()),
            distributor: self.distributor.as_deref(),
            error_target: self.error_handling.as_ref().map(|e| e.target.as_str()),
        }
    }
}

/// A directed connection between two steps.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Hop {
    pub from: String,
    pub to: String,
}

impl Hop {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Engine-wide settings.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub channel_capacity: usize,
    /// Compare schemas on every multi-input read instead of once.
    pub safe_mode: bool,
    /// Upper bound on how long a blocked channel call waits before
    /// re-checking the stop token.
    pub poll_interval: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            safe_mode: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Builds a [`Transformation`] from step definitions and hops.
///
/// A hop between steps with equal copy counts wires copy `i` to copy `i`,
/// unless the target is partitioned. Any other hop wires every producer copy
/// to every consumer copy. A step's error hop always wires copy `i` to target
/// copy `i % copies`.
///
/// # Examples
///
/// ```rust
/// use the_conveyor::backends::local::{Dummy, GenerateRows};
/// use the_conveyor::engine::{StepDefinition, TransformationBuilder};
///
/// let transformation = TransformationBuilder::new()
///     .step(StepDefinition::new("generate", |_| Box::new(GenerateRows::counting(10))))
///     .step(StepDefinition::new("dummy", |_| Box::new(Dummy)).with_copies(2))
///     .hop("generate", "dummy")
///     .build()
///     .unwrap();
///
/// assert_eq!(transformation.handles().len(), 3);
/// ```
pub struct TransformationBuilder {
    steps: Vec<StepDefinition>,
    hops: Vec<Hop>,
    options: EngineOptions,
    distribution: DistributionDefaults,
    distributors: DistributorRegistry,
}

impl TransformationBuilder {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            hops: Vec::new(),
            options: EngineOptions::default(),
            distribution: DistributionDefaults::default(),
            distributors: DistributorRegistry::with_builtins(),
        }
    }

    pub fn step(mut self, step: StepDefinition) -> Self {
        self.steps.push(step);
        self
    }

    pub fn hop(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.hops.push(Hop::new(from, to));
        self
    }

    pub fn hops(mut self, hops: impl IntoIterator<Item = Hop>) -> Self {
        self.hops.extend(hops);
        self
    }

    pub fn options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn distribution(mut self, distribution: DistributionDefaults) -> Self {
        self.distribution = distribution;
        self
    }

    pub fn register_distributor<F>(mut self, code: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn RowDistributor> + Send + Sync + 'static,
    {
        self.distributors.register(code, factory);
        self
    }

    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let graph: Vec<GraphStep<'_>> = self.steps.iter().map(StepDefinition::graph_step).collect();
        let mut errors = validate_graph(&graph, &self.hops, &self.distributors)
            .err()
            .unwrap_or_default();
        for code in [&self.distribution.distributing, &self.distribution.copying] {
            if !self.distributors.contains(code) {
                errors.push(ValidationError::UnknownDistributor {
                    step: "distribution".to_string(),
                    code: code.clone(),
                });
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn build(self) -> Result<Transformation, ExecutionError> {
        self.validate().map_err(ExecutionError::Validation)?;

        let control = Arc::new(RunControl::with_poll_interval(self.options.poll_interval));
        let index: HashMap<&str, usize> = self
            .steps
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.as_str(), i))
            .collect();

        let mut wiring: Vec<Vec<CopyWiring>> = self
            .steps
            .iter()
            .map(|s| (0..s.copies).map(|_| CopyWiring::default()).collect())
            .collect();

        for hop in &self.hops {
            let (Some(&from), Some(&to)) = (index.get(hop.from.as_str()), index.get(hop.to.as_str()))
            else {
                continue;
            };
            let producer = &self.steps[from];
            let consumer = &self.steps[to];
            let capacity = consumer
                .channel_capacity
                .unwrap_or(self.options.channel_capacity);
            let is_error_hop = producer
                .error_handling
                .as_ref()
                .is_some_and(|e| e.target == consumer.name);
            let one_to_one =
                producer.copies == consumer.copies && consumer.partitioner.is_none();

            for copy in 0..producer.copies {
                let producer_id = StepCopyId::new(producer.name.as_str(), copy);
                let targets: Vec<usize> = if is_error_hop {
                    vec![copy % consumer.copies]
                } else if one_to_one {
                    vec![copy]
                } else {
                    (0..consumer.copies).collect()
                };

                let mut channels = Vec::with_capacity(targets.len());
                for target in targets {
                    let consumer_id = StepCopyId::new(consumer.name.as_str(), target);
                    let channel =
                        control.open_channel(ChannelId::new(producer_id.clone(), consumer_id), capacity);
                    wiring[to][target].inputs.push(Arc::clone(&channel));
                    channels.push(channel);
                }

                let outputs = &mut wiring[from][copy];
                if is_error_hop {
                    outputs.error = channels.into_iter().next();
                } else {
                    outputs.hops.push(HopOutputs {
                        partitioner: consumer.partitioner.clone(),
                        channels,
                    });
                }
            }
        }

        let mut units = Vec::new();
        for (step, copies) in self.steps.iter().zip(wiring) {
            for (copy, wired) in copies.into_iter().enumerate() {
                units.push(self.unit(step, copy, wired, &control)?);
            }
        }

        TransformationBuilt {
            steps: self.steps.len(),
            copies: units.len(),
            channels: control.channel_count(),
        }
        .log();

        Ok(Transformation { units, control })
    }

    fn unit(
        &self,
        step: &StepDefinition,
        copy: usize,
        wired: CopyWiring,
        control: &Arc<RunControl>,
    ) -> Result<StepUnit, ExecutionError> {
        let id = StepCopyId::new(step.name.as_str(), copy);
        let shared = Arc::new(StepShared::new(id));

        let outputs: Vec<Arc<RowChannel>> = wired
            .hops
            .iter()
            .flat_map(|h| h.channels.iter().cloned())
            .collect();
        let routing = if wired.hops.iter().any(|h| h.partitioner.is_some()) {
            OutputRouting::Partitioned(
                wired
                    .hops
                    .into_iter()
                    .filter_map(|h| {
                        h.partitioner.map(|partitioner| PartitionGroup {
                            partitioner,
                            channel_by_copy: h.channels,
                        })
                    })
                    .collect(),
            )
        } else if outputs.len() > 1 {
            let code = self
                .distribution
                .code_for(step.distribute, step.distributor.as_deref());
            let distributor = self.distributors.create(code).ok_or_else(|| {
                ExecutionError::Validation(vec![ValidationError::UnknownDistributor {
                    step: step.name.clone(),
                    code: code.to_string(),
                }])
            })?;
            OutputRouting::Distributed(distributor)
        } else {
            OutputRouting::Direct
        };

        let errors = match (wired.error, &step.error_handling) {
            (Some(channel), Some(handling)) => Some(ErrorChannel::new(channel, handling.fields.clone())),
            _ => None,
        };

        let mut io = StepIo::new(
            InputStreams::from_channels(wired.inputs, self.options.safe_mode),
            outputs,
            routing,
            errors,
            shared,
            Arc::clone(control),
        );
        if let Some(handling) = &step.error_handling {
            io.limits = handling.limits.clone();
        }
        io.allow_empty_field_names = step.allow_empty_field_names;

        let partitions = match &step.partitioner {
            Some(p) => (0..p.nr_partitions())
                .filter(|partition| partition % step.copies == copy)
                .collect(),
            None => Vec::new(),
        };

        Ok(StepUnit::new((step.logic)(copy), step.copies, partitions, io))
    }
}

impl Default for TransformationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct CopyWiring {
    inputs: Vec<Arc<RowChannel>>,
    hops: Vec<HopOutputs>,
    error: Option<Arc<RowChannel>>,
}

struct HopOutputs {
    partitioner: Option<Arc<dyn Partitioner>>,
    /// Indexed by target copy for all-to-all hops.
    channels: Vec<Arc<RowChannel>>,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    /// Step-fatal errors across the run.
    pub errors: u64,
    pub duration_ms: u128,
    pub statuses: Vec<StepStatus>,
}

impl RunResult {
    pub fn succeeded(&self) -> bool {
        self.errors == 0
    }

    /// Statuses of every copy of `step`.
    pub fn step<'a>(&'a self, step: &'a str) -> impl Iterator<Item = &'a StepStatus> + 'a {
        self.statuses.iter().filter(move |s| s.step == step)
    }

    pub fn lines_read(&self, step: &str) -> u64 {
        self.step(step).map(|s| s.lines_read).sum()
    }

    pub fn lines_written(&self, step: &str) -> u64 {
        self.step(step).map(|s| s.lines_written).sum()
    }

    pub fn lines_rejected(&self, step: &str) -> u64 {
        self.step(step).map(|s| s.lines_rejected).sum()
    }
}

/// A wired transformation, ready to run once.
pub struct Transformation {
    units: Vec<StepUnit>,
    control: Arc<RunControl>,
}

impl Transformation {
    pub fn control(&self) -> Arc<RunControl> {
        Arc::clone(&self.control)
    }

    pub fn handles(&self) -> Vec<StepHandle> {
        self.units.iter().map(StepUnit::handle).collect()
    }

    pub fn handle(&self, step: &str, copy: usize) -> Option<StepHandle> {
        self.units
            .iter()
            .find(|u| u.id().step == step && u.id().copy == copy)
            .map(StepUnit::handle)
    }

    /// Initializes every copy, then runs them all to completion.
    ///
    /// Each copy gets its own native thread for `init` and again for
    /// `run`/`dispose`. If any copy fails to initialize, every copy is
    /// disposed and nothing runs.
    pub async fn execute(self) -> Result<RunResult, ExecutionError> {
        let Transformation { units, control } = self;
        let started = Instant::now();

        let mut pending = Vec::with_capacity(units.len());
        for unit in units {
            let name = unit.id().to_string();
            let (tx, rx) = oneshot::channel();
            spawn(&name, &control, move || {
                let mut unit = unit;
                let ok = unit.init();
                let _ = tx.send((unit, ok));
            })?;
            pending.push((name, rx));
        }

        let mut initialized = Vec::with_capacity(pending.len());
        let mut failed = Vec::new();
        let mut lost = None;
        for (name, rx) in pending {
            match rx.await {
                Ok((unit, true)) => initialized.push(unit),
                Ok((unit, false)) => {
                    failed.push(name);
                    initialized.push(unit);
                }
                Err(_) => {
                    StepThreadLost { step: &name }.log();
                    lost.get_or_insert(name);
                }
            }
        }
        if let Some(step) = lost {
            control.stop_all(&step);
            initialized.iter_mut().for_each(StepUnit::dispose);
            return Err(ExecutionError::StepPanicked { step });
        }
        if !failed.is_empty() {
            InitializationFailed { steps: &failed }.log();
            initialized.iter_mut().for_each(StepUnit::dispose);
            return Err(ExecutionError::InitFailed { steps: failed });
        }

        let mut running = Vec::with_capacity(initialized.len());
        for unit in initialized {
            let name = unit.id().to_string();
            let (tx, rx) = oneshot::channel();
            spawn(&name, &control, move || {
                let mut unit = unit;
                let status = unit.run();
                unit.dispose();
                let _ = tx.send(status);
            })?;
            running.push((name, rx));
        }

        RunStarted {
            copies: running.len(),
        }
        .log();
        control.signal_started();

        let mut statuses = Vec::with_capacity(running.len());
        let mut lost = None;
        for (name, rx) in running {
            match rx.await {
                Ok(status) => statuses.push(status),
                Err(_) => {
                    StepThreadLost { step: &name }.log();
                    control.add_error();
                    control.stop_all(&name);
                    lost.get_or_insert(name);
                }
            }
        }
        if let Some(step) = lost {
            return Err(ExecutionError::StepPanicked { step });
        }

        let duration = started.elapsed();
        RunCompleted {
            errors: control.errors(),
            duration,
        }
        .log();

        Ok(RunResult {
            errors: control.errors(),
            duration_ms: duration.as_millis(),
            statuses,
        })
    }
}

fn spawn<F>(name: &str, control: &RunControl, work: F) -> Result<(), ExecutionError>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(work)
        .map(|_| ())
        .map_err(|source| {
            control.stop_all(name);
            ExecutionError::Spawn {
                step: name.to_string(),
                source,
            }
        })
}
