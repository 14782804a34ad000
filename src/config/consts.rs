// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Rows a channel buffers before `put` blocks
pub const DEFAULT_CHANNEL_CAPACITY: usize = 10_000;
/// Longest a blocked channel call waits before re-checking the stop token
pub const DEFAULT_STOP_POLL_INTERVAL_MS: u64 = 50;
/// Copies of a step when none are configured
pub const DEFAULT_COPIES: usize = 1;
/// Steps share rows across their outputs unless told otherwise
pub const DEFAULT_DISTRIBUTE: bool = true;
