// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;   // built-in step logic
pub mod channel;    // bounded row channels
pub mod config;     // config loading + validation
pub mod engine;     // step units, wiring, run control
pub mod errors;     // error handling
pub mod observability;
pub mod routing;    // partitioners + distributors
pub mod row;        // rows, values, schemas
pub mod traits;     // step logic + listener abstractions
