// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod factory;
pub mod steps;

pub use factory::LocalStepFactory;
pub use steps::*;
