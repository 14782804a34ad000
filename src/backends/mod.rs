// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Step business logic for The Conveyor.
//!
//! The engine drives any [`StepLogic`](crate::traits::StepLogic); this module
//! provides the implementations it ships with.
//!
//! # Available Backends
//!
//! ## Local Backend
//! In-process steps resolved by `type` through [`local::LocalStepFactory`]:
//! - **generate_rows**: Source emitting constant rows with an optional counter
//! - **dummy**: Passes rows through
//! - **write_to_log**: Logs each row and passes it on
//! - **range_check**: Row failure when an integer field is out of range
//!
//! ## Stub Backend (Test-Only)
//! Steps for engine tests (only available in test builds):
//! - **VecSource**: Emits a fixed list of rows
//! - **Collector**: Records every row it receives
//! - **FailOnRow**: Fails one chosen row
//! - **RefuseInit**: Fails `init`
//!
//! # Examples
//!
//! ```rust
//! use the_conveyor::backends::local::LocalStepFactory;
//! use the_conveyor::config::StepConfig;
//!
//! let step: StepConfig = serde_yaml::from_str("{ name: log, type: write_to_log }").unwrap();
//! let logic = LocalStepFactory::create(&step)?;
//! assert_eq!(logic(0).name(), "write_to_log");
//! # Ok::<(), the_conveyor::errors::ConfigError>(())
//! ```

pub mod local;
#[cfg(test)]
pub mod stub;
