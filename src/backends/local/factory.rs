// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use serde::de::DeserializeOwned;

use super::steps::*;
use crate::config::StepConfig;
use crate::engine::LogicFactory;
use crate::errors::ConfigError;
use crate::traits::StepLogic;

/// Factory for the built-in (in-process) step types
pub struct LocalStepFactory;

impl LocalStepFactory {
    /// Create the logic factory for a configured step
    ///
    /// The `type` field selects the step:
    /// - "dummy" -> Dummy (passes rows through)
    /// - "generate_rows" -> GenerateRows (`limit`, `counter_field`, `fields`)
    /// - "range_check" -> RangeCheck (`field`, `min`, `max`)
    /// - "write_to_log" -> WriteToLog (`limit_rows`)
    pub fn create(step: &StepConfig) -> Result<LogicFactory, ConfigError> {
        match step.step_type.as_str() {
            "dummy" => Ok(Arc::new(|_: usize| -> Box<dyn StepLogic> { Box::new(Dummy) })),
            "generate_rows" => {
                let options: GenerateRowsOptions = parse_options(step)?;
                Ok(Arc::new(move |_: usize| -> Box<dyn StepLogic> {
                    Box::new(GenerateRows::new(options.clone()))
                }))
            }
            "range_check" => {
                let options: RangeCheckOptions = parse_options(step)?;
                Ok(Arc::new(move |_: usize| -> Box<dyn StepLogic> {
                    Box::new(RangeCheck::new(options.clone()))
                }))
            }
            "write_to_log" => {
                let options: WriteToLogOptions = parse_options(step)?;
                Ok(Arc::new(move |_: usize| -> Box<dyn StepLogic> {
                    Box::new(WriteToLog::new(options.clone()))
                }))
            }
            other => Err(ConfigError::StepOptions {
                step: step.name.clone(),
                reason: format!("unknown step type '{}'", other),
            }),
        }
    }

    /// List all built-in step types
    pub fn available_types() -> Vec<&'static str> {
        vec!["dummy", "generate_rows", "range_check", "write_to_log"]
    }

    /// Check if a step type is available
    pub fn supports(step_type: &str) -> bool {
        Self::available_types().contains(&step_type)
    }
}

fn parse_options<T: DeserializeOwned>(step: &StepConfig) -> Result<T, ConfigError> {
    let mapping: serde_yaml::Mapping = step
        .options
        .iter()
        .map(|(k, v)| (serde_yaml::Value::String(k.clone()), v.clone()))
        .collect();
    serde_yaml::from_value(serde_yaml::Value::Mapping(mapping)).map_err(|e| ConfigError::StepOptions {
        step: step.name.clone(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(step_type: &str, options: &str) -> StepConfig {
        let yaml = format!("{{ name: s, type: {}, options: {} }}", step_type, options);
        serde_yaml::from_str(&yaml).unwrap()
    }

    #[test]
    fn creates_every_available_type() {
        let cases = vec![
            ("dummy", "{}"),
            ("generate_rows", "{ limit: 2 }"),
            ("range_check", "{ field: n, max: 5 }"),
            ("write_to_log", "{ limit_rows: 1 }"),
        ];
        for (step_type, options) in cases {
            let factory = LocalStepFactory::create(&step(step_type, options))
                .unwrap_or_else(|e| panic!("{}: {}", step_type, e));
            assert_eq!(factory(0).name(), step_type);
        }
    }

    #[test]
    fn invalid_options_name_the_step() {
        let Err(err) = LocalStepFactory::create(&step("range_check", "{ min: 1 }")) else {
            panic!("range_check without a field must fail");
        };
        assert!(matches!(err, ConfigError::StepOptions { ref step, .. } if step == "s"));
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(LocalStepFactory::create(&step("teleport", "{}")).is_err());
        assert!(!LocalStepFactory::supports("teleport"));
        assert!(LocalStepFactory::supports("dummy"));
    }
}
