// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! This module provides centralized message types for all diagnostic and operational
//! logging throughout The Conveyor. Message types follow a struct-based pattern
//! with `Display` trait implementation to:
//!
//! * Eliminate magic strings scattered throughout the codebase
//! * Keep field names consistent between the human text and structured fields
//! * Provide consistent, structured logging output
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::engine` - Transformation build and run lifecycle events
//! * `messages::step` - Step copy lifecycle, row diversion and failures
//! * `messages::channel` - Row channel and input stream events
//! * `messages::validation` - Configuration validation results
//!
//! # Usage
//!
//! ```rust
//! use the_conveyor::observability::messages::engine::StopRequested;
//! use the_conveyor::observability::messages::StructuredLog;
//!
//! StopRequested { origin: "check.0" }.log();
//! ```

pub mod messages;
