// src/replay/loader.rs
//! Offline replay over a pre-loaded recording
//!
//! The single-threaded counterpart of the live window: the whole log is
//! materialized up front, then a pair of packet cursors advances
//! monotonically as playback time progresses. `synchronize` maps playback
//! wall-clock onto recorded timestamps so a consumer can drive the
//! cursors off its own clock. No producer thread, no locking.

use crate::packet::batch::Packet;
use crate::packet::record::{BatchInfo, EventRecord};
use crate::replay::log;
use crate::utils::errors::{Result, StreamError};
use crate::window::view::{PacketRef, WindowView};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Single-threaded replay of a recorded packet log.
pub struct OfflineReplay<T: EventRecord> {
    packets: Vec<PacketRef<T>>,
    /// First packet of the current window
    start: usize,
    /// One past the last packet of the current window; `start == end`
    /// means an empty window positioned at `start`
    end: usize,
    event_count: u64,
    time_sync_offset: f64,
}

impl<T: EventRecord> Default for OfflineReplay<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: EventRecord> OfflineReplay<T> {
    pub fn new() -> Self {
        Self {
            packets: Vec::new(),
            start: 0,
            end: 0,
            event_count: 0,
            time_sync_offset: 0.0,
        }
    }

    /// Load a recording, one wire-decoded packet per line, stopping once
    /// the loaded time range exceeds `max_seconds` (pass a negative value
    /// for no limit). Fails without retaining partial state if the file
    /// cannot be opened or holds no packets.
    pub fn load(&mut self, path: impl AsRef<Path>, max_seconds: f64) -> Result<()> {
        let max_seconds = if max_seconds < 0.0 {
            f64::MAX
        } else {
            max_seconds
        };
        let file = File::open(path.as_ref()).map_err(|e| {
            StreamError::Load(format!("cannot open {}: {}", path.as_ref().display(), e))
        })?;
        let reader = BufReader::new(file);

        let mut packets: Vec<PacketRef<T>> = Vec::new();
        let mut event_count = 0u64;
        let mut first_timestamp = None;
        for line in reader.lines() {
            let line = line.map_err(|e| StreamError::Load(format!("read failed: {}", e)))?;
            if line.trim().is_empty() {
                continue;
            }
            let mut packet = Packet::new();
            log::decode_line(&line, &mut packet)?;
            event_count += packet.len() as u64;
            let timestamp = packet.timestamp();
            let first = *first_timestamp.get_or_insert(timestamp);
            packets.push(Arc::new(packet));
            if timestamp - first > max_seconds {
                break;
            }
        }
        if packets.is_empty() {
            return Err(StreamError::Load(format!(
                "{} holds no packets",
                path.as_ref().display()
            )));
        }

        info!(
            "loaded {} packets, {} events from {}",
            packets.len(),
            event_count,
            path.as_ref().display()
        );
        self.packets = packets;
        self.event_count = event_count;
        self.start = 0;
        self.end = 0;
        self.time_sync_offset = 0.0;
        Ok(())
    }

    /// Map playback wall-clock onto recorded time: subsequent `advance_*`
    /// timestamps are interpreted relative to `now` at the log's start.
    pub fn synchronize(&mut self, now: f64) {
        if let Some(first) = self.packets.first() {
            self.time_sync_offset = now - first.timestamp();
        }
    }

    /// Advance playback to `timestamp`: the window becomes the packets
    /// after the previously consumed ones whose time has come. Returns
    /// false once the log is exhausted.
    pub fn advance_to(&mut self, timestamp: f64) -> bool {
        if self.packets.is_empty() || self.start >= self.packets.len() {
            return false;
        }
        let t = timestamp - self.time_sync_offset;

        // a non-empty window has been consumed; move past it
        if self.end > self.start {
            self.start = self.end;
            self.end = self.start;
            if self.start >= self.packets.len() {
                return false;
            }
        }

        let mut last = self.start;
        while last + 1 < self.packets.len() && self.packets[last + 1].timestamp() < t {
            last += 1;
        }
        if self.packets[self.start].timestamp() < t {
            self.end = last + 1;
        }
        true
    }

    /// Like [`advance_to`], but also slides the window start forward once
    /// the span would exceed `duration`, always retaining at least one
    /// packet. Returns false once the log is exhausted.
    ///
    /// [`advance_to`]: OfflineReplay::advance_to
    pub fn advance_windowed(&mut self, timestamp: f64, duration: f64) -> bool {
        if self.packets.is_empty() || self.start >= self.packets.len() {
            return false;
        }
        let t = timestamp - self.time_sync_offset;

        let mut last = if self.end > self.start {
            self.end - 1
        } else {
            self.start
        };
        while last + 1 < self.packets.len() && self.packets[last + 1].timestamp() < t {
            last += 1;
        }

        let mut start = self.start;
        while t - self.packets[start].timestamp() > duration {
            if start + 1 >= self.packets.len() {
                return false;
            }
            start += 1;
            if start == last {
                break;
            }
        }

        self.start = start;
        self.end = last + 1;
        true
    }

    /// The current playback window.
    pub fn view(&self) -> WindowView<T> {
        if self.start >= self.end || self.start >= self.packets.len() {
            return WindowView::empty();
        }
        let packets: Vec<PacketRef<T>> = self.packets[self.start..self.end].to_vec();
        let mut info = BatchInfo::default();
        for packet in &packets {
            info.accumulate(&packet.info());
        }
        WindowView::new(packets, info)
    }

    /// Total recorded duration in seconds, first to last packet
    /// timestamp.
    pub fn length(&self) -> f64 {
        match (self.packets.first(), self.packets.last()) {
            (Some(first), Some(last)) => last.timestamp() - first.timestamp(),
            _ => 0.0,
        }
    }

    pub fn packet_count(&self) -> usize {
        self.packets.len()
    }

    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    /// Human-readable description of the loaded log. Diagnostic only.
    pub fn summary(&self) -> String {
        match (self.packets.first(), self.packets.last()) {
            (Some(first), Some(last)) => format!(
                "{} packets loaded with {} total events. Timestamps range from {:.3} to {:.3}",
                self.packets.len(),
                self.event_count,
                first.timestamp(),
                last.timestamp()
            ),
            _ => "no events loaded".to_string(),
        }
    }
}
