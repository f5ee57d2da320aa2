// src/window/view.rs
//! Lock-free query results: packet snapshots and the cross-packet cursor
//!
//! A query against the window (or the offline replay) returns a
//! [`WindowView`]: the span's [`BatchInfo`] plus reference-counted handles
//! to the packets it covers. Holding a view pins those packets — the
//! ingestion loop only refills a packet once its handle count has dropped
//! back to the free list alone — so iteration needs no lock and can never
//! observe a packet being rewritten underneath it.

use crate::packet::batch::Packet;
use crate::packet::record::{BatchInfo, EventRecord};
use std::sync::Arc;

/// Shared, immutable-once-published handle to a packet.
pub type PacketRef<T> = Arc<Packet<T>>;

/// A bounded view over recently ingested packets.
#[derive(Debug, Clone)]
pub struct WindowView<T: EventRecord> {
    packets: Vec<PacketRef<T>>,
    info: BatchInfo,
}

impl<T: EventRecord> WindowView<T> {
    pub(crate) fn new(packets: Vec<PacketRef<T>>, info: BatchInfo) -> Self {
        Self { packets, info }
    }

    pub(crate) fn empty() -> Self {
        Self {
            packets: Vec::new(),
            info: BatchInfo::default(),
        }
    }

    /// Summary of the span this view covers.
    pub fn info(&self) -> BatchInfo {
        self.info
    }

    pub fn count(&self) -> u32 {
        self.info.count
    }

    pub fn duration(&self) -> f64 {
        self.info.duration
    }

    pub fn timestamp(&self) -> f64 {
        self.info.timestamp
    }

    pub fn is_empty(&self) -> bool {
        self.info.count == 0
    }

    /// Number of packets backing the view.
    pub fn packet_count(&self) -> usize {
        self.packets.len()
    }

    pub fn packets(&self) -> &[PacketRef<T>] {
        &self.packets
    }

    pub fn iter(&self) -> WindowIter<'_, T> {
        WindowIter {
            packets: &self.packets,
            packet_idx: 0,
            record_idx: 0,
        }
    }
}

impl<'a, T: EventRecord> IntoIterator for &'a WindowView<T> {
    type Item = &'a T;
    type IntoIter = WindowIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Cursor over every record in a view, crossing packet boundaries.
///
/// The cursor is an index pair `(packet, record)` rather than a raw
/// pointer, so advancing is always bounds-checked against the packet it
/// indexes. The producer-side timestamp and sequence id of the packet the
/// cursor currently sits in are available alongside each record; per-event
/// device timestamps stay the consumer's business.
#[derive(Debug, Clone)]
pub struct WindowIter<'a, T: EventRecord> {
    packets: &'a [PacketRef<T>],
    packet_idx: usize,
    record_idx: usize,
}

impl<'a, T: EventRecord> WindowIter<'a, T> {
    fn current_packet(&self) -> Option<&'a Packet<T>> {
        let idx = self.packet_idx.min(self.packets.len().checked_sub(1)?);
        Some(&self.packets[idx])
    }

    /// Producer timestamp of the packet the cursor is in (the last packet
    /// once exhausted), or 0.0 for an empty view.
    pub fn timestamp(&self) -> f64 {
        self.current_packet().map(|p| p.timestamp()).unwrap_or(0.0)
    }

    /// Sequence id of the packet the cursor is in, or -1 for an empty
    /// view.
    pub fn sequence(&self) -> i64 {
        self.current_packet().map(|p| p.sequence()).unwrap_or(-1)
    }
}

impl<'a, T: EventRecord> Iterator for WindowIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        while self.packet_idx < self.packets.len() {
            let packet = &self.packets[self.packet_idx];
            if self.record_idx < packet.len() {
                let record = &packet.records()[self.record_idx];
                self.record_idx += 1;
                return Some(record);
            }
            self.packet_idx += 1;
            self.record_idx = 0;
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let mut remaining = 0;
        for (i, packet) in self.packets.iter().enumerate().skip(self.packet_idx) {
            if i == self.packet_idx {
                remaining += packet.len().saturating_sub(self.record_idx);
            } else {
                remaining += packet.len();
            }
        }
        (remaining, Some(remaining))
    }
}
