// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod channel;
mod config;
mod execution;
mod step;

pub use channel::ChannelError;
pub use config::{ConfigError, ValidationError};
pub use execution::ExecutionError;
pub use step::{PartitionError, ResourceError, RowFailure, StepError};
