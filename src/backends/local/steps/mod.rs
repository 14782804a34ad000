// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod dummy;
pub mod generate_rows;
pub mod range_check;
pub mod write_to_log;

pub use dummy::*;
pub use generate_rows::*;
pub use range_check::*;
pub use write_to_log::*;
