// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors returned by blocking row channel operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The run was stopped before or while the call was blocked.
    #[error("channel {channel} interrupted by stop request")]
    Stopped { channel: String },

    /// A row was offered after the producer marked the channel done.
    #[error("channel {channel} is closed; no rows accepted after done")]
    Closed { channel: String },
}

impl ChannelError {
    pub fn is_stopped(&self) -> bool {
        matches!(self, ChannelError::Stopped { .. })
    }
}
