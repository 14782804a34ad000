// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::channel::StepCopyId;
use crate::engine::StepStatus;
use crate::errors::ResourceError;
use crate::row::RowEnvelope;

/// Observes rows flowing through one step copy.
///
/// Callbacks run on the step's own thread and must not block.
pub trait RowListener: Send + Sync {
    fn row_read(&self, _step: &StepCopyId, _row: &RowEnvelope) {}

    fn row_written(&self, _step: &StepCopyId, _row: &RowEnvelope) {}

    fn error_row_written(&self, _step: &StepCopyId, _row: &RowEnvelope) {}
}

/// Observes the lifecycle of a step copy.
pub trait StepListener: Send + Sync {
    fn started(&self, _step: &StepCopyId) {}

    fn finished(&self, _status: &StepStatus) {}
}

/// Something held open by business logic that must be released on dispose.
pub trait ExternalResource: Send + Sync {
    fn name(&self) -> &str;

    fn release(&self) -> Result<(), ResourceError>;
}
