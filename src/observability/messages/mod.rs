// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for the human-readable text and
//! [`StructuredLog`] to emit it as a `tracing` event with structured fields.
//!
//! # Organization
//!
//! * `engine` - Transformation build and run lifecycle events
//! * `step` - Step copy lifecycle, row diversion and failures
//! * `channel` - Row channel and input stream events
//! * `validation` - Configuration validation results

use tracing::Span;

pub mod channel;
pub mod engine;
pub mod step;
pub mod validation;

/// A message that knows its own log level and structured fields.
pub trait StructuredLog: std::fmt::Display {
    /// Emits the message as a `tracing` event.
    fn log(&self);

    /// Opens a span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
