// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for configuration validation results.

use crate::errors::ValidationError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A configuration passed validation.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use the_conveyor::observability::messages::validation::ConfigValidated;
///
/// let msg = ConfigValidated { steps: 4, hops: 3 };
/// assert_eq!(msg.to_string(), "Configuration valid: 4 steps, 3 hops");
/// ```
pub struct ConfigValidated {
    pub steps: usize,
    pub hops: usize,
}

impl Display for ConfigValidated {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Configuration valid: {} steps, {} hops",
            self.steps, self.hops
        )
    }
}

impl StructuredLog for ConfigValidated {
    fn log(&self) {
        tracing::info!(steps = self.steps, hops = self.hops, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "config_validated",
            span_name = name,
            steps = self.steps,
            hops = self.hops,
        )
    }
}

/// One validation problem found in a configuration.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct ValidationFailed<'a> {
    pub error: &'a ValidationError,
}

impl Display for ValidationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Validation failed: {}", self.error)
    }
}

impl StructuredLog for ValidationFailed<'_> {
    fn log(&self) {
        tracing::error!(error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            error = %self.error,
        )
    }
}
