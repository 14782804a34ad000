// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tokio_util::sync::CancellationToken;

use crate::channel::{ChannelId, RowChannel, DEFAULT_POLL_INTERVAL};
use crate::observability::messages::engine::StopRequested;
use crate::observability::messages::StructuredLog;

/// One-time barrier opened once every copy has initialized.
struct StartGate {
    started: Mutex<bool>,
    opened: Condvar,
}

/// State shared by every step copy of one run.
///
/// Holds the cooperative stop token, the run-level error counter and the
/// start gate, and knows every channel so that a stop can wake any thread
/// blocked in `put` or `get`.
pub struct RunControl {
    stop: CancellationToken,
    safe_stop: AtomicBool,
    errors: AtomicU64,
    gate: StartGate,
    channels: Mutex<Vec<Arc<RowChannel>>>,
    poll_interval: Duration,
}

impl RunControl {
    pub fn new() -> Self {
        Self::with_poll_interval(DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            stop: CancellationToken::new(),
            safe_stop: AtomicBool::new(false),
            errors: AtomicU64::new(0),
            gate: StartGate {
                started: Mutex::new(false),
                opened: Condvar::new(),
            },
            channels: Mutex::new(Vec::new()),
            poll_interval,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Creates a channel tied to this run's stop token.
    pub fn open_channel(&self, id: ChannelId, capacity: usize) -> Arc<RowChannel> {
        let channel = Arc::new(
            RowChannel::new(id, capacity, self.stop.clone()).with_poll_interval(self.poll_interval),
        );
        self.channels.lock().push(Arc::clone(&channel));
        channel
    }

    pub fn channel_count(&self) -> usize {
        self.channels.lock().len()
    }

    /// Every channel opened for this run, in wiring order.
    pub fn channels(&self) -> Vec<Arc<RowChannel>> {
        self.channels.lock().clone()
    }

    pub fn token(&self) -> CancellationToken {
        self.stop.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Stops every step copy and wakes every blocked channel call.
    pub fn stop_all(&self, origin: &str) {
        if !self.stop.is_cancelled() {
            StopRequested { origin }.log();
            self.stop.cancel();
        }
        let channels = self.channels.lock().clone();
        for channel in channels {
            channel.interrupt();
        }
        let _started = self.gate.started.lock();
        self.gate.opened.notify_all();
    }

    /// Asks copies without inputs to stop producing; downstream copies then
    /// drain and finish normally.
    pub fn stop_safely(&self) {
        self.safe_stop.store(true, Ordering::SeqCst);
    }

    pub fn is_safe_stopping(&self) -> bool {
        self.safe_stop.load(Ordering::SeqCst)
    }

    pub fn add_error(&self) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::SeqCst)
    }

    pub fn signal_started(&self) {
        let mut started = self.gate.started.lock();
        *started = true;
        self.gate.opened.notify_all();
    }

    pub fn is_started(&self) -> bool {
        *self.gate.started.lock()
    }

    /// Blocks until the run is started. Returns false when it was stopped
    /// first.
    pub fn wait_until_started(&self) -> bool {
        let mut started = self.gate.started.lock();
        loop {
            if *started {
                return true;
            }
            if self.stop.is_cancelled() {
                return false;
            }
            self.gate.opened.wait_for(&mut started, self.poll_interval);
        }
    }
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::StepCopyId;
    use std::thread;

    #[test]
    fn gate_releases_waiters_on_start() {
        let control = Arc::new(RunControl::new());
        let waiter = {
            let control = Arc::clone(&control);
            thread::spawn(move || control.wait_until_started())
        };
        thread::sleep(Duration::from_millis(20));
        control.signal_started();
        assert!(waiter.join().unwrap());
        assert!(control.is_started());
    }

    #[test]
    fn gate_releases_waiters_on_stop() {
        let control = Arc::new(RunControl::new());
        let waiter = {
            let control = Arc::clone(&control);
            thread::spawn(move || control.wait_until_started())
        };
        control.stop_all("test");
        assert!(!waiter.join().unwrap());
    }

    #[test]
    fn stop_all_wakes_blocked_readers() {
        let control = RunControl::with_poll_interval(Duration::from_secs(30));
        let channel = control.open_channel(
            ChannelId::new(StepCopyId::new("a", 0), StepCopyId::new("b", 0)),
            1,
        );
        let reader = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || channel.get())
        };
        thread::sleep(Duration::from_millis(20));

        let started = std::time::Instant::now();
        control.stop_all("test");
        assert!(reader.join().unwrap().is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn errors_accumulate() {
        let control = RunControl::new();
        control.add_error();
        control.add_error();
        assert_eq!(control.errors(), 2);
    }
}
