// src/packet/record.rs
//! Record contract and batch metadata types.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Contract for a fixed-size, flat-copyable binary event record.
///
/// Implementors must be plain-old-data (`bytemuck::Pod`) so whole batches
/// can be moved between record space and byte space without copying field
/// by field. The wire tag identifies the record type on the wire; decoding
/// rejects any packet whose tag does not match.
pub trait EventRecord: Pod + Send + Sync + 'static {
    /// Short string identifying this record type on the wire.
    const TAG: &'static str;

    /// Byte size of one record.
    const SIZE: usize = std::mem::size_of::<Self>();
}

/// Summary of a span of events.
///
/// `duration` and `timestamp` are producer-clock seconds. An empty span has
/// zero duration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchInfo {
    /// Number of events in the span
    pub count: u32,

    /// Seconds of sensor time the span covers
    pub duration: f64,

    /// Producer timestamp of the newest packet in the span
    pub timestamp: f64,
}

impl BatchInfo {
    pub fn new(count: u32, duration: f64, timestamp: f64) -> Self {
        Self {
            count,
            duration,
            timestamp,
        }
    }

    /// Fold another span onto the end of this one. The count saturates:
    /// a long-lived monotonic accumulator pins at `u32::MAX` instead of
    /// wrapping.
    pub fn accumulate(&mut self, other: &BatchInfo) {
        self.count = self.count.saturating_add(other.count);
        self.duration += other.duration;
        self.timestamp = other.timestamp;
    }

    /// Remove a span from the front of this one. The timestamp is kept
    /// since the newest packet is unaffected.
    pub fn discount(&mut self, other: &BatchInfo) {
        self.count = self.count.saturating_sub(other.count);
        self.duration -= other.duration;
        if self.count == 0 {
            self.duration = 0.0;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Out-of-band metadata attached to a packet by the transport layer: a
/// monotonically increasing sequence id and a producer-side timestamp in
/// seconds. Never part of the packet payload itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Monotonically increasing packet sequence id
    pub sequence: i64,

    /// Producer wall-clock seconds
    pub timestamp: f64,
}

impl Envelope {
    pub fn new(sequence: i64, timestamp: f64) -> Self {
        Self {
            sequence,
            timestamp,
        }
    }

    /// Advance the sequence id and restamp with the given time. Producers
    /// call this once per outgoing packet.
    pub fn stamp(&mut self, now: f64) {
        self.sequence += 1;
        self.timestamp = now;
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            sequence: -1,
            timestamp: 0.0,
        }
    }
}

/// Address event: 32-bit device timestamp plus a 32-bit packed pixel
/// address with polarity. The core never looks inside; the layout is the
/// concern of the camera driver and the consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct AddressEvent {
    /// Device clock ticks
    pub stamp: u32,

    /// Packed pixel address and polarity
    pub address: u32,
}

impl EventRecord for AddressEvent {
    const TAG: &'static str = "AE";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_size() {
        assert_eq!(AddressEvent::SIZE, 8);
        assert_eq!(AddressEvent::TAG, "AE");
    }

    #[test]
    fn test_accumulate() {
        let mut info = BatchInfo::default();
        info.accumulate(&BatchInfo::new(100, 0.01, 1.5));
        info.accumulate(&BatchInfo::new(50, 0.005, 1.6));
        assert_eq!(info.count, 150);
        assert!((info.duration - 0.015).abs() < 1e-12);
        assert_eq!(info.timestamp, 1.6);
    }

    #[test]
    fn test_accumulate_saturates_count() {
        let mut info = BatchInfo::new(u32::MAX - 10, 1.0, 1.0);
        info.accumulate(&BatchInfo::new(100, 0.01, 2.0));
        assert_eq!(info.count, u32::MAX);
        assert_eq!(info.timestamp, 2.0);
    }

    #[test]
    fn test_discount_keeps_timestamp() {
        let mut info = BatchInfo::new(150, 0.015, 1.6);
        info.discount(&BatchInfo::new(100, 0.01, 1.5));
        assert_eq!(info.count, 50);
        assert_eq!(info.timestamp, 1.6);
    }

    #[test]
    fn test_discount_to_empty_zeroes_duration() {
        let mut info = BatchInfo::new(10, 0.01, 1.0);
        info.discount(&BatchInfo::new(10, 0.01, 1.0));
        assert!(info.is_empty());
        assert_eq!(info.duration, 0.0);
    }

    #[test]
    fn test_envelope_stamp() {
        let mut e = Envelope::default();
        assert_eq!(e.sequence, -1);
        e.stamp(12.5);
        e.stamp(13.0);
        assert_eq!(e.sequence, 1);
        assert_eq!(e.timestamp, 13.0);
    }
}
