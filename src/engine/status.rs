// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use serde::Serialize;

use super::registry::StepRegistries;
use crate::channel::StepCopyId;
use crate::observability::messages::step::StepPauseChanged;
use crate::observability::messages::StructuredLog;

/// Lifecycle of a step copy. No state is ever re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Created,
    Initialized,
    Running,
    Done,
    Stopped,
    Failed,
    Disposed,
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepState::Created => "created",
            StepState::Initialized => "initialized",
            StepState::Running => "running",
            StepState::Done => "done",
            StepState::Stopped => "stopped",
            StepState::Failed => "failed",
            StepState::Disposed => "disposed",
        };
        f.write_str(name)
    }
}

/// Line counters of one step copy.
#[derive(Debug, Default)]
pub struct StepCounters {
    read: AtomicU64,
    written: AtomicU64,
    rejected: AtomicU64,
    errors: AtomicU64,
}

impl StepCounters {
    pub(crate) fn add_read(&self) {
        self.read.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_written(&self, n: u64) {
        self.written.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn add_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn read(&self) -> u64 {
        self.read.load(Ordering::Relaxed)
    }

    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

/// Point-in-time view of a step copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepStatus {
    pub step: String,
    pub copy: usize,
    pub state: StepState,
    pub lines_read: u64,
    pub lines_written: u64,
    pub lines_rejected: u64,
    pub errors: u64,
    pub paused: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// State of a copy visible to other threads.
pub(crate) struct StepShared {
    pub(crate) id: StepCopyId,
    pub(crate) counters: StepCounters,
    pub(crate) registries: Arc<StepRegistries>,
    state: Mutex<StepState>,
    safe_stop: AtomicBool,
    paused: Mutex<bool>,
    resumed: Condvar,
    last_error: Mutex<Option<String>>,
}

impl StepShared {
    pub(crate) fn new(id: StepCopyId) -> Self {
        Self {
            id,
            counters: StepCounters::default(),
            registries: Arc::new(StepRegistries::new()),
            state: Mutex::new(StepState::Created),
            safe_stop: AtomicBool::new(false),
            paused: Mutex::new(false),
            resumed: Condvar::new(),
            last_error: Mutex::new(None),
        }
    }

    pub(crate) fn state(&self) -> StepState {
        *self.state.lock()
    }

    pub(crate) fn set_state(&self, state: StepState) {
        *self.state.lock() = state;
    }

    pub(crate) fn record_error(&self, message: String) {
        *self.last_error.lock() = Some(message);
    }

    pub(crate) fn safe_stop_requested(&self) -> bool {
        self.safe_stop.load(Ordering::SeqCst)
    }

    fn set_paused(&self, paused: bool) {
        let mut guard = self.paused.lock();
        if *guard != paused {
            *guard = paused;
            StepPauseChanged {
                step: &self.id,
                paused,
            }
            .log();
        }
        self.resumed.notify_all();
    }

    pub(crate) fn is_paused(&self) -> bool {
        *self.paused.lock()
    }

    /// Blocks while paused, re-checking `stopped` every `poll`.
    pub(crate) fn wait_while_paused(&self, poll: Duration, stopped: impl Fn() -> bool) {
        let mut paused = self.paused.lock();
        while *paused && !stopped() {
            self.resumed.wait_for(&mut paused, poll);
        }
    }

    pub(crate) fn status(&self) -> StepStatus {
        StepStatus {
            step: self.id.step.clone(),
            copy: self.id.copy,
            state: self.state(),
            lines_read: self.counters.read(),
            lines_written: self.counters.written(),
            lines_rejected: self.counters.rejected(),
            errors: self.counters.errors(),
            paused: self.is_paused(),
            error: self.last_error.lock().clone(),
        }
    }
}

/// Handle to a running step copy, usable from any thread.
#[derive(Clone)]
pub struct StepHandle {
    shared: Arc<StepShared>,
}

impl StepHandle {
    pub(crate) fn new(shared: Arc<StepShared>) -> Self {
        Self { shared }
    }

    pub fn id(&self) -> &StepCopyId {
        &self.shared.id
    }

    pub fn state(&self) -> StepState {
        self.shared.state()
    }

    pub fn status(&self) -> StepStatus {
        self.shared.status()
    }

    pub fn counters(&self) -> &StepCounters {
        &self.shared.counters
    }

    pub fn registries(&self) -> &StepRegistries {
        &self.shared.registries
    }

    /// The copy stops acquiring and emitting rows until resumed.
    pub fn pause(&self) {
        self.shared.set_paused(true);
    }

    pub fn resume(&self) {
        self.shared.set_paused(false);
    }

    /// Stops the copy at its next row boundary without failing the run.
    pub fn stop_safely(&self) {
        self.shared.safe_stop.store(true, Ordering::SeqCst);
        self.shared.resumed.notify_all();
    }
}

impl fmt::Debug for StepHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepHandle")
            .field("id", &self.shared.id)
            .field("state", &self.state())
            .finish()
    }
}
