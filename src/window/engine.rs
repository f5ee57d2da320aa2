// src/window/engine.rs
//! Concurrent sliding/chunked window over a live packet stream
//!
//! One background ingestion thread pulls packets off the port and
//! publishes them to a shared active list; one consumer calls the query
//! methods to obtain a time- or count-bounded view of the recent stream.
//!
//! # Packet lifecycle
//!
//! ```text
//! Free (inactive list) → InFlight (being filled) → Active → Evicted (inactive)
//! ```
//!
//! Packets are immutable once published. Eviction moves a handle to the
//! inactive list; the ingestion thread only refills a packet whose handle
//! count has dropped back to one — a view issued to the consumer keeps its
//! packets pinned, so reuse can never clobber data a cursor still points
//! at.
//!
//! # Locking
//!
//! A single mutex guards the lists and accumulators and is held only for
//! list mutation, never across record iteration. A condition variable is
//! signaled on every ingest and once more when the loop stops, so a
//! blocked consumer always unblocks, worst case with an empty view.
//!
//! Exactly one consumer is supported: every query takes `&mut self`, so
//! exclusive ownership of the window handle is enforced by the borrow
//! checker rather than at runtime.

use crate::packet::batch::Packet;
use crate::packet::record::{BatchInfo, EventRecord};
use crate::transport::port::{Port, ReadOutcome};
use crate::utils::errors::Result;
use crate::window::view::{PacketRef, WindowView};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, warn};

/// Window engine configuration
#[derive(Debug, Clone)]
pub struct WindowConfig {
    /// How often the ingestion loop wakes from a blocking port read to
    /// honor a stop request (milliseconds)
    pub poll_interval_ms: u64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
        }
    }
}

/// State shared between the ingestion thread and the consumer.
struct Shared<T: EventRecord> {
    /// Packets received and not yet evicted, oldest first
    active: VecDeque<PacketRef<T>>,

    /// Evicted packets eligible for reuse once unreferenced
    inactive: Vec<PacketRef<T>>,

    /// Totals over the active list
    total: BatchInfo,

    /// Monotonic totals over everything ever ingested
    received: BatchInfo,

    /// The span currently exposed to the consumer
    window: BatchInfo,

    /// Packets in the current window; always a prefix of `active`
    window_len: usize,

    /// Ingestion has terminated; no more data will arrive
    stopping: bool,
}

impl<T: EventRecord> Default for Shared<T> {
    fn default() -> Self {
        Self {
            active: VecDeque::new(),
            inactive: Vec::new(),
            total: BatchInfo::default(),
            received: BatchInfo::default(),
            window: BatchInfo::default(),
            window_len: 0,
            stopping: false,
        }
    }
}

impl<T: EventRecord> Shared<T> {
    /// Evict the packets of the last query's window. They stay in the
    /// active list until the consumer's next call so any handle it took
    /// remains part of the visible history in between.
    fn evict_window(&mut self) {
        for _ in 0..self.window_len {
            self.evict_front();
        }
        self.window_len = 0;
        self.window = BatchInfo::default();
    }

    fn evict_front(&mut self) {
        if let Some(packet) = self.active.pop_front() {
            self.total.discount(&packet.info());
            self.inactive.push(packet);
        }
    }

    /// Expose the first `len` active packets as the new window.
    fn set_window(&mut self, len: usize, info: BatchInfo) -> WindowView<T> {
        self.window_len = len;
        self.window = info;
        WindowView::new(self.active.iter().take(len).cloned().collect(), info)
    }

    /// Pull a reusable packet out of the free list. Only a packet with no
    /// outstanding view handle may be refilled.
    fn reclaim(&mut self) -> Option<Packet<T>> {
        let idx = self
            .inactive
            .iter()
            .position(|p| Arc::strong_count(p) == 1)?;
        let handle = self.inactive.swap_remove(idx);
        match Arc::try_unwrap(handle) {
            Ok(mut packet) => {
                packet.clear();
                Some(packet)
            }
            Err(handle) => {
                // a view raced us to the handle; leave it for later
                self.inactive.push(handle);
                None
            }
        }
    }
}

struct Inner<T: EventRecord> {
    state: Mutex<Shared<T>>,
    arrived: Condvar,
}

/// Concurrent windowing engine over a live event stream.
pub struct EventWindow<T: EventRecord> {
    inner: Arc<Inner<T>>,
    stop: Arc<AtomicBool>,
    ingest: Option<JoinHandle<()>>,
}

impl<T: EventRecord> EventWindow<T> {
    /// Start ingesting from the port on a background thread.
    pub fn open(port: Port<T>) -> Result<Self> {
        Self::with_config(port, WindowConfig::default())
    }

    pub fn with_config(port: Port<T>, config: WindowConfig) -> Result<Self> {
        let inner = Arc::new(Inner {
            state: Mutex::new(Shared::default()),
            arrived: Condvar::new(),
        });
        let stop = Arc::new(AtomicBool::new(false));
        let poll = Duration::from_millis(config.poll_interval_ms.max(1));

        let thread_inner = Arc::clone(&inner);
        let thread_stop = Arc::clone(&stop);
        let ingest = std::thread::Builder::new()
            .name("evstream-ingest".to_string())
            .spawn(move || ingest_loop(port, thread_inner, thread_stop, poll))?;

        Ok(Self {
            inner,
            stop,
            ingest: Some(ingest),
        })
    }

    /// Expose and return exactly one packet, the oldest active one.
    ///
    /// The packet is evicted on the consumer's next query, not now, so
    /// the returned handle stays part of the visible history until then.
    pub fn read_packet(&mut self, blocking: bool) -> Option<PacketRef<T>> {
        let mut state = self.inner.state.lock();
        state.evict_window();
        if blocking {
            while state.total.count == 0 && !state.stopping {
                self.inner.arrived.wait(&mut state);
            }
        }
        match state.active.front().cloned() {
            None => None,
            Some(packet) => {
                let info = packet.info();
                state.window = info;
                state.window_len = 1;
                Some(packet)
            }
        }
    }

    /// Expose everything that arrived since the last read.
    pub fn read_all(&mut self, blocking: bool) -> WindowView<T> {
        let mut state = self.inner.state.lock();
        state.evict_window();
        if blocking {
            while state.total.count == 0 && !state.stopping {
                self.inner.arrived.wait(&mut state);
            }
        }
        let info = state.total;
        let len = state.active.len();
        state.set_window(len, info)
    }

    /// Expose a trailing window of roughly `seconds` of stream time.
    ///
    /// The newest packet anchors the window's right edge; older packets
    /// are kept while they total strictly less than `seconds`, and
    /// eviction always removes whole packets. The result therefore spans
    /// at most `seconds` plus the one packet at the right edge.
    pub fn read_sliding_time(&mut self, seconds: f64, blocking: bool) -> WindowView<T> {
        let mut state = self.inner.state.lock();
        if blocking {
            while state.total.count <= state.window.count && !state.stopping {
                self.inner.arrived.wait(&mut state);
            }
        }
        loop {
            if state.active.len() < 2 {
                break;
            }
            let newest = match state.active.back() {
                Some(p) => p.duration(),
                None => break,
            };
            if state.total.duration - newest < seconds {
                break;
            }
            state.evict_front();
        }
        let info = state.total;
        let len = state.active.len();
        state.set_window(len, info)
    }

    /// Fix the window's right edge at the first packet whose timestamp
    /// reaches `exact_time` instead of "now", for deterministic
    /// replay-style synchronization. Blocks until such a packet has
    /// arrived.
    pub fn read_sliding_time_until(&mut self, seconds: f64, exact_time: f64) -> WindowView<T> {
        let mut state = self.inner.state.lock();
        while !(state.total.count > 0 && state.total.timestamp >= exact_time) && !state.stopping {
            self.inner.arrived.wait(&mut state);
        }
        loop {
            let front_ts = match state.active.front() {
                Some(p) => p.timestamp(),
                None => break,
            };
            if front_ts + seconds >= exact_time {
                break;
            }
            state.evict_front();
        }
        if state.active.is_empty() {
            return state.set_window(0, BatchInfo::default());
        }
        let mut info = BatchInfo::default();
        let mut len = 0;
        for packet in state.active.iter() {
            if len > 0 && packet.timestamp() >= exact_time {
                break;
            }
            info.accumulate(&packet.info());
            len += 1;
        }
        state.set_window(len, info)
    }

    /// Expose a trailing window of at most roughly `count` events,
    /// evicting whole packets from the front while more than `count`
    /// events would remain without them.
    pub fn read_sliding_count(&mut self, count: u32, blocking: bool) -> WindowView<T> {
        let mut state = self.inner.state.lock();
        if blocking {
            while state.total.count <= state.window.count && !state.stopping {
                self.inner.arrived.wait(&mut state);
            }
        }
        loop {
            let front = match state.active.front() {
                Some(p) => p.len() as u32,
                None => break,
            };
            if state.total.count - front < count {
                break;
            }
            state.evict_front();
        }
        let info = state.total;
        let len = state.active.len();
        state.set_window(len, info)
    }

    /// Non-overlapping forward-progress read: wait until at least `count`
    /// new events are active, then expose exactly the shortest packet
    /// prefix reaching `count`. The prefix is evicted on the next call.
    pub fn read_chunk_count(&mut self, count: u32, blocking: bool) -> WindowView<T> {
        let mut state = self.inner.state.lock();
        state.evict_window();
        if blocking {
            while state.total.count < count && !state.stopping {
                self.inner.arrived.wait(&mut state);
            }
            if state.stopping && state.total.count < count {
                // leave the remainder in place for non-blocking pickup
                return WindowView::empty();
            }
        }
        let mut info = BatchInfo::default();
        let mut len = 0;
        for packet in state.active.iter() {
            info.accumulate(&packet.info());
            len += 1;
            if info.count >= count {
                break;
            }
        }
        state.set_window(len, info)
    }

    /// Time-based analog of [`read_chunk_count`].
    pub fn read_chunk_time(&mut self, seconds: f64, blocking: bool) -> WindowView<T> {
        let mut state = self.inner.state.lock();
        state.evict_window();
        if blocking {
            while state.total.duration < seconds && !state.stopping {
                self.inner.arrived.wait(&mut state);
            }
            if state.stopping && state.total.duration < seconds {
                return WindowView::empty();
            }
        }
        let mut info = BatchInfo::default();
        let mut len = 0;
        for packet in state.active.iter() {
            info.accumulate(&packet.info());
            len += 1;
            if info.duration >= seconds {
                break;
            }
        }
        state.set_window(len, info)
    }

    /// The span currently exposed to the consumer.
    pub fn stats_window(&self) -> BatchInfo {
        self.inner.state.lock().window
    }

    /// Totals over all packets not yet evicted.
    pub fn stats_active(&self) -> BatchInfo {
        self.inner.state.lock().total
    }

    /// Active data not covered by the current window.
    pub fn stats_unprocessed(&self) -> BatchInfo {
        let state = self.inner.state.lock();
        BatchInfo::new(
            state.total.count.saturating_sub(state.window.count),
            state.total.duration - state.window.duration,
            state.total.timestamp,
        )
    }

    /// Monotonic totals over everything ever ingested.
    pub fn stats_received(&self) -> BatchInfo {
        self.inner.state.lock().received
    }

    pub fn is_running(&self) -> bool {
        self.ingest
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Stop the ingestion thread and wait for it to exit. Already-ingested
    /// data stays queryable through the non-blocking reads.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.ingest.take() {
            let _ = handle.join();
        }
    }
}

impl<T: EventRecord> Drop for EventWindow<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn ingest_loop<T: EventRecord>(
    mut port: Port<T>,
    inner: Arc<Inner<T>>,
    stop: Arc<AtomicBool>,
    poll: Duration,
) {
    debug!("ingestion loop started");
    'ingest: while !stop.load(Ordering::Relaxed) {
        let mut packet = {
            let mut state = inner.state.lock();
            state.reclaim().unwrap_or_default()
        };

        loop {
            if stop.load(Ordering::Relaxed) {
                break 'ingest;
            }
            match port.read_into(&mut packet, poll) {
                ReadOutcome::Received => break,
                ReadOutcome::TimedOut | ReadOutcome::Rejected => continue,
                ReadOutcome::Closed => {
                    warn!("transport closed; ingestion stopping");
                    break 'ingest;
                }
            }
        }

        let info = packet.info();
        {
            let mut state = inner.state.lock();
            state.active.push_back(Arc::new(packet));
            state.total.accumulate(&info);
            state.received.accumulate(&info);
        }
        inner.arrived.notify_one();
    }

    let mut state = inner.state.lock();
    state.stopping = true;
    drop(state);
    inner.arrived.notify_all();
    debug!("ingestion loop stopped");
}
