// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Step execution and row exchange.
//!
//! Every step copy runs on its own native thread as a [`StepUnit`]. Copies
//! exchange rows only through bounded row channels; a [`RunControl`] shared
//! by all copies carries the stop token, the start gate and the run's error
//! count.

pub mod error_channel;
mod input;
mod output;
pub mod registry;
pub mod run_control;
pub mod status;
mod step_io;
pub mod step_unit;
pub mod transformation;


pub use error_channel::{ErrorChannel, ErrorFieldNames, ErrorHandling, RejectionLimits};
pub use registry::{Registry, ReleaseSummary, ResultFile, ResultFiles, StepRegistries};
pub use run_control::RunControl;
pub use status::{StepCounters, StepHandle, StepState, StepStatus};
pub use step_io::Emitter;
pub use step_unit::StepUnit;
pub use transformation::{
    EngineOptions, Hop, LogicFactory, RunResult, StepDefinition, Transformation,
    TransformationBuilder,
};
