// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tokio_util::sync::CancellationToken;

use super::{ChannelId, Received};
use crate::errors::ChannelError;
use crate::observability::messages::channel::SchemaBound;
use crate::observability::messages::StructuredLog;
use crate::row::{Row, RowEnvelope, Schema};

/// Upper bound on how long a blocked `put`/`get` sleeps before re-checking
/// the stop token.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

struct ChannelState {
    buffer: VecDeque<Row>,
    done: bool,
}

/// Bounded FIFO queue of rows between one producer and one consumer copy.
///
/// The channel's schema is bound from the first row put and never rebound;
/// every channel keeps its own schema instance. Blocking calls wake up
/// promptly when the shared stop token is cancelled and [`interrupt`]
/// is called, and otherwise re-check it every poll interval.
///
/// [`interrupt`]: RowChannel::interrupt
pub struct RowChannel {
    id: ChannelId,
    capacity: usize,
    state: Mutex<ChannelState>,
    not_empty: Condvar,
    not_full: Condvar,
    schema: OnceLock<Arc<Schema>>,
    stop: CancellationToken,
    poll_interval: Duration,
    rows_put: AtomicU64,
    rows_taken: AtomicU64,
}

impl RowChannel {
    /// Creates a channel holding at most `capacity` rows. A capacity of zero
    /// is treated as one.
    pub fn new(id: ChannelId, capacity: usize, stop: CancellationToken) -> Self {
        let capacity = capacity.max(1);
        Self {
            id,
            capacity,
            state: Mutex::new(ChannelState {
                buffer: VecDeque::with_capacity(capacity.min(1024)),
                done: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            schema: OnceLock::new(),
            stop,
            poll_interval: DEFAULT_POLL_INTERVAL,
            rows_put: AtomicU64::new(0),
            rows_taken: AtomicU64::new(0),
        }
    }

    /// Single-slot channel for synchronous harnesses.
    pub fn unbuffered(id: ChannelId, stop: CancellationToken) -> Self {
        Self::new(id, 1, stop)
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(Duration::from_millis(1));
        self
    }

    pub fn id(&self) -> &ChannelId {
        &self.id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The bound schema, or `None` before the first row.
    pub fn schema(&self) -> Option<Arc<Schema>> {
        self.schema.get().cloned()
    }

    /// Puts a row, blocking while the buffer is full.
    pub fn put(&self, schema: &Schema, row: Row) -> Result<(), ChannelError> {
        match self.put_until(schema, row, None)? {
            None => Ok(()),
            // Unreachable without a deadline; treat as a stop.
            Some(_) => Err(self.stopped()),
        }
    }

    /// Puts a row, waiting at most `timeout` for free space. Returns the row
    /// back when no space became available in time.
    pub fn put_timeout(
        &self,
        schema: &Schema,
        row: Row,
        timeout: Duration,
    ) -> Result<Option<Row>, ChannelError> {
        self.put_until(schema, row, Some(Instant::now() + timeout))
    }

    /// Puts a row only if there is space right now.
    pub fn try_put(&self, schema: &Schema, row: Row) -> Result<Option<Row>, ChannelError> {
        self.put_until(schema, row, Some(Instant::now()))
    }

    /// Takes the next row, blocking until one is available or the producer
    /// is done.
    ///
    /// Rows still buffered are returned even after a stop request; only an
    /// empty, unfinished channel reports [`ChannelError::Stopped`].
    pub fn get(&self) -> Result<Received, ChannelError> {
        match self.get_until(None)? {
            Some(received) => Ok(received),
            None => Err(self.stopped()),
        }
    }

    /// Takes the next row, waiting at most `timeout`.
    pub fn get_timeout(&self, timeout: Duration) -> Result<Option<Received>, ChannelError> {
        self.get_until(Some(Instant::now() + timeout))
    }

    /// Takes the next row only if one is buffered (or the stream has ended).
    pub fn try_get(&self) -> Result<Option<Received>, ChannelError> {
        self.get_until(Some(Instant::now()))
    }

    /// Signals that the producer will put no more rows. Idempotent.
    pub fn mark_done(&self) {
        {
            let mut state = self.state.lock();
            state.done = true;
        }
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn is_done(&self) -> bool {
        self.state.lock().done
    }

    /// Done and fully drained: the consumer will see only end-of-stream.
    pub fn is_finished(&self) -> bool {
        let state = self.state.lock();
        state.done && state.buffer.is_empty()
    }

    /// Wakes every thread blocked on this channel so it re-checks the stop
    /// token.
    pub fn interrupt(&self) {
        let _state = self.state.lock();
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn len(&self) -> usize {
        self.state.lock().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rows_put(&self) -> u64 {
        self.rows_put.load(Ordering::Relaxed)
    }

    pub fn rows_taken(&self) -> u64 {
        self.rows_taken.load(Ordering::Relaxed)
    }

    fn put_until(
        &self,
        schema: &Schema,
        row: Row,
        deadline: Option<Instant>,
    ) -> Result<Option<Row>, ChannelError> {
        if self.stop.is_cancelled() {
            return Err(self.stopped());
        }

        let mut state = self.state.lock();
        loop {
            if state.done {
                return Err(ChannelError::Closed {
                    channel: self.id.to_string(),
                });
            }
            if state.buffer.len() < self.capacity {
                self.bind_schema(schema);
                state.buffer.push_back(row);
                self.rows_put.fetch_add(1, Ordering::Relaxed);
                drop(state);
                self.not_empty.notify_one();
                return Ok(None);
            }
            if self.stop.is_cancelled() {
                return Err(self.stopped());
            }
            match self.wait_slice(deadline) {
                Some(wait) => {
                    self.not_full.wait_for(&mut state, wait);
                }
                None => return Ok(Some(row)),
            }
        }
    }

    fn get_until(&self, deadline: Option<Instant>) -> Result<Option<Received>, ChannelError> {
        let mut state = self.state.lock();
        loop {
            if let Some(row) = state.buffer.pop_front() {
                self.rows_taken.fetch_add(1, Ordering::Relaxed);
                drop(state);
                self.not_full.notify_one();
                return Ok(Some(Received::Row(RowEnvelope::new(self.bound_schema(), row))));
            }
            if state.done {
                return Ok(Some(Received::EndOfStream));
            }
            if self.stop.is_cancelled() {
                return Err(self.stopped());
            }
            match self.wait_slice(deadline) {
                Some(wait) => {
                    self.not_empty.wait_for(&mut state, wait);
                }
                None => return Ok(None),
            }
        }
    }

    /// How long the next condvar wait may last, or `None` once the deadline
    /// has passed.
    fn wait_slice(&self, deadline: Option<Instant>) -> Option<Duration> {
        match deadline {
            None => Some(self.poll_interval),
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    None
                } else {
                    Some(remaining.min(self.poll_interval))
                }
            }
        }
    }

    fn bind_schema(&self, schema: &Schema) {
        if self.schema.get().is_some() {
            return;
        }
        let bound = self.schema.get_or_init(|| Arc::new(schema.clone()));
        SchemaBound {
            channel: &self.id,
            field_count: bound.len(),
        }
        .log();
    }

    fn bound_schema(&self) -> Arc<Schema> {
        self.schema
            .get()
            .cloned()
            .unwrap_or_else(|| Arc::new(Schema::default()))
    }

    fn stopped(&self) -> ChannelError {
        ChannelError::Stopped {
            channel: self.id.to_string(),
        }
    }
}

impl std::fmt::Debug for RowChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowChannel")
            .field("id", &self.id.to_string())
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("done", &self.is_done())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::StepCopyId;
    use crate::row::{Value, ValueMeta, ValueType};
    use std::thread;

    fn channel(capacity: usize) -> (RowChannel, CancellationToken) {
        let stop = CancellationToken::new();
        let id = ChannelId::new(StepCopyId::new("producer", 0), StepCopyId::new("consumer", 0));
        (RowChannel::new(id, capacity, stop.clone()), stop)
    }

    fn schema() -> Schema {
        Schema::new(vec![ValueMeta::new("n", ValueType::Integer)])
    }

    fn int_row(n: i64) -> Row {
        Row::new(vec![Value::Integer(n)])
    }

    fn taken_value(received: Received) -> Option<i64> {
        received
            .into_row()
            .and_then(|env| env.row.get(0).and_then(Value::as_integer))
    }

    #[test]
    fn schema_is_unbound_until_first_put() {
        let (ch, _stop) = channel(4);
        assert!(ch.schema().is_none());

        ch.put(&schema(), int_row(1)).unwrap();
        let other = Schema::new(vec![ValueMeta::new("other", ValueType::String)]);
        ch.put(&other, Row::new(vec![Value::from("x")])).unwrap();

        let bound = ch.schema().unwrap();
        assert_eq!(bound.field_names(), vec!["n"]);
    }

    #[test]
    fn buffered_rows_survive_mark_done() {
        let (ch, _stop) = channel(4);
        ch.put(&schema(), int_row(1)).unwrap();
        ch.put(&schema(), int_row(2)).unwrap();
        ch.mark_done();
        ch.mark_done();

        assert_eq!(taken_value(ch.get().unwrap()), Some(1));
        assert_eq!(taken_value(ch.get().unwrap()), Some(2));
        assert!(matches!(ch.get().unwrap(), Received::EndOfStream));
        assert!(matches!(ch.get().unwrap(), Received::EndOfStream));
        assert!(ch.is_finished());
    }

    #[test]
    fn put_after_done_is_rejected() {
        let (ch, _stop) = channel(4);
        ch.mark_done();
        let err = ch.put(&schema(), int_row(1)).unwrap_err();
        assert!(matches!(err, ChannelError::Closed { .. }));
        assert_eq!(ch.rows_put(), 0);
    }

    #[test]
    fn try_variants_do_not_block() {
        let (ch, _stop) = channel(1);
        assert!(ch.try_get().unwrap().is_none());

        assert!(ch.try_put(&schema(), int_row(1)).unwrap().is_none());
        let returned = ch.try_put(&schema(), int_row(2)).unwrap();
        assert_eq!(returned, Some(int_row(2)));

        let got = ch.try_get().unwrap().unwrap();
        assert_eq!(taken_value(got), Some(1));
    }

    #[test]
    fn zero_capacity_behaves_as_unbuffered() {
        let (ch, _stop) = channel(0);
        assert_eq!(ch.capacity(), 1);
    }

    #[test]
    fn timeouts_expire() {
        let (ch, _stop) = channel(1);
        let start = Instant::now();
        assert!(ch.get_timeout(Duration::from_millis(20)).unwrap().is_none());
        assert!(start.elapsed() >= Duration::from_millis(20));

        ch.put(&schema(), int_row(1)).unwrap();
        let back = ch
            .put_timeout(&schema(), int_row(2), Duration::from_millis(20))
            .unwrap();
        assert!(back.is_some());
    }

    #[test]
    fn stop_interrupts_blocked_get() {
        let (ch, stop) = channel(1);
        let ch = Arc::new(ch);

        let reader = {
            let ch = Arc::clone(&ch);
            thread::spawn(move || ch.get())
        };

        thread::sleep(Duration::from_millis(30));
        stop.cancel();
        ch.interrupt();

        let result = reader.join().unwrap();
        assert!(matches!(result, Err(ChannelError::Stopped { .. })));
    }

    #[test]
    fn stop_interrupts_blocked_put() {
        let (ch, stop) = channel(1);
        let ch = Arc::new(ch);
        ch.put(&schema(), int_row(1)).unwrap();

        let writer = {
            let ch = Arc::clone(&ch);
            thread::spawn(move || ch.put(&schema(), int_row(2)))
        };

        thread::sleep(Duration::from_millis(30));
        stop.cancel();

        // No interrupt: the poll interval alone must bound the wait.
        let result = writer.join().unwrap();
        assert!(matches!(result, Err(ChannelError::Stopped { .. })));
        assert_eq!(ch.rows_put(), 1);
    }

    #[test]
    fn full_channel_blocks_put_until_a_get_frees_a_slot() {
        let (ch, _stop) = channel(2);
        let ch = Arc::new(ch);
        ch.put(&schema(), int_row(1)).unwrap();
        ch.put(&schema(), int_row(2)).unwrap();

        let writer = {
            let ch = Arc::clone(&ch);
            thread::spawn(move || ch.put(&schema(), int_row(3)))
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!writer.is_finished());
        assert_eq!(ch.rows_put(), 2);
        assert_eq!(ch.len(), 2);

        assert_eq!(taken_value(ch.get().unwrap()), Some(1));
        writer.join().unwrap().unwrap();
        assert_eq!(ch.rows_put(), 3);
        assert_eq!(taken_value(ch.get().unwrap()), Some(2));
        assert_eq!(taken_value(ch.get().unwrap()), Some(3));
    }

    #[test]
    fn buffered_rows_are_readable_after_stop() {
        let (ch, stop) = channel(2);
        ch.put(&schema(), int_row(7)).unwrap();
        stop.cancel();

        assert_eq!(taken_value(ch.get().unwrap()), Some(7));
        assert!(matches!(ch.get(), Err(ChannelError::Stopped { .. })));
        assert!(matches!(ch.put(&schema(), int_row(8)), Err(ChannelError::Stopped { .. })));
    }

    #[test]
    fn counters_track_traffic() {
        let (ch, _stop) = channel(8);
        for n in 0..5 {
            ch.put(&schema(), int_row(n)).unwrap();
        }
        ch.get().unwrap();
        ch.get().unwrap();
        assert_eq!(ch.rows_put(), 5);
        assert_eq!(ch.rows_taken(), 2);
        assert_eq!(ch.len(), 3);
    }
}
