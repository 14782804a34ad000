// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::backends::local::LocalStepFactory;
use crate::config::Config;
use crate::engine::{ErrorHandling, StepDefinition, Transformation, TransformationBuilder};
use crate::errors::{ConfigError, ExecutionError};
use crate::routing::ModPartitioner;

/// Turns a loaded configuration into a runnable transformation.
///
/// Each step's `type` and `options` are resolved through the
/// [`LocalStepFactory`]; its copies, routing and error handling become a
/// [`StepDefinition`].
///
/// # Examples
///
/// ```
/// use the_conveyor::config::{Config, RuntimeBuilder};
///
/// let config: Config = serde_yaml::from_str(r#"
/// steps:
///   - { name: generate, type: generate_rows, options: { limit: 3, counter_field: n } }
///   - { name: log, type: write_to_log, copies: 2 }
/// hops:
///   - { from: generate, to: log }
/// "#).unwrap();
///
/// let transformation = RuntimeBuilder::build(&config).unwrap();
/// assert_eq!(transformation.handles().len(), 3);
/// ```
pub struct RuntimeBuilder;

impl RuntimeBuilder {
    /// Resolve every step of `cfg` and return a builder ready for `build()`.
    pub fn from_config(cfg: &Config) -> Result<TransformationBuilder, ConfigError> {
        let mut builder = TransformationBuilder::new()
            .options(cfg.engine.options())
            .distribution(cfg.distribution.clone())
            .hops(cfg.hops.iter().cloned());

        for step in &cfg.steps {
            let logic = LocalStepFactory::create(step)?;
            let mut definition = StepDefinition::from_factory(step.name.as_str(), logic)
                .with_copies(step.copies)
                .distributing(step.distribute);
            if let Some(code) = &step.distributor {
                definition = definition.with_distributor(code.as_str());
            }
            if let Some(partitioning) = &step.partitioning {
                definition = definition.partitioned_by(Arc::new(ModPartitioner::new(
                    partitioning.key_fields(),
                    partitioning.partitions,
                )));
            }
            if let Some(handling) = &step.error_handling {
                definition = definition.with_error_handling(ErrorHandling::from(handling));
            }
            if let Some(capacity) = step.channel_capacity {
                definition = definition.with_channel_capacity(capacity);
            }
            if step.allow_empty_field_names {
                definition = definition.allowing_empty_field_names();
            }
            builder = builder.step(definition);
        }
        Ok(builder)
    }

    /// Resolve and wire `cfg` in one go.
    pub fn build(cfg: &Config) -> Result<Transformation, ExecutionError> {
        Self::from_config(cfg)?.build()
    }
}
