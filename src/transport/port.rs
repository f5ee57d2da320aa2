// src/transport/port.rs
//! Buffered-port wrapper enforcing the prepare/write discipline
//!
//! A `Port` owns exactly one outgoing packet buffer. `prepare()` clears it
//! and hands it out for filling; `write()` encodes it, attaches the
//! envelope out-of-band, and blocks until the transport accepts the frame.
//! With a single buffer and a bounded transport there is never more than
//! one frame building up behind a slow consumer: the producer stalls
//! instead of the process growing without bound.
//!
//! On the receive side, `read()` hands back the next decoded packet with
//! its envelope already attached. Framing errors are logged and skipped so
//! a malformed frame cannot stall a live stream.

use crate::packet::batch::Packet;
use crate::packet::record::EventRecord;
use crate::transport::{Frame, Received, Transport};
use std::time::Duration;
use tracing::{error, warn};

/// Outcome of reading the next frame straight into a caller's packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The packet was filled and its envelope attached
    Received,

    /// A frame arrived but failed framing checks; it was dropped
    Rejected,

    /// No frame within the allowed wait
    TimedOut,

    /// The stream is closed; no further frames will arrive
    Closed,
}

/// Packet-typed wrapper over a [`Transport`].
pub struct Port<T: EventRecord> {
    transport: Box<dyn Transport>,
    tx: Packet<T>,
    rx: Packet<T>,
    prepared: bool,
    closed: bool,
}

impl<T: EventRecord> Port<T> {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Box::new(transport),
            tx: Packet::new(),
            rx: Packet::new(),
            prepared: false,
            closed: false,
        }
    }

    /// Clear and return the single outstanding send buffer.
    ///
    /// The buffer's envelope is retained across calls so a producer's
    /// sequence id keeps counting; stamp it before `write()`.
    pub fn prepare(&mut self) -> &mut Packet<T> {
        self.tx.clear();
        self.prepared = true;
        &mut self.tx
    }

    /// Abandon a prepared buffer without sending.
    pub fn unprepare(&mut self) -> bool {
        let was_prepared = self.prepared;
        self.prepared = false;
        was_prepared
    }

    /// Encode the prepared buffer and block until the transport accepts
    /// it.
    ///
    /// Calling without a prior `prepare()`, or with no duration set, is a
    /// protocol misuse: logged, nothing reaches the wire.
    pub fn write(&mut self) {
        if !self.prepared {
            error!("write() without prepare(); nothing written");
            return;
        }
        self.prepared = false;

        let payload = match self.tx.encode() {
            Ok(payload) => payload,
            Err(e) => {
                error!("packet not sent: {}", e);
                return;
            }
        };
        let frame = Frame {
            envelope: self.tx.envelope(),
            payload,
        };
        if let Err(e) = self.transport.send(frame) {
            error!("transport rejected frame: {}", e);
            self.closed = true;
        }
    }

    /// Return the next received packet with its envelope populated.
    ///
    /// `None` means no packet is pending (when `blocking` is false) or the
    /// stream has closed. A frame that fails framing checks is logged and
    /// dropped; a blocking read keeps waiting for the next frame.
    pub fn read(&mut self, blocking: bool) -> Option<&Packet<T>> {
        let timeout = if blocking {
            None
        } else {
            Some(Duration::ZERO)
        };
        loop {
            let frame = match self.transport.recv(timeout) {
                Received::Frame(frame) => frame,
                Received::Empty => return None,
                Received::Closed => {
                    self.closed = true;
                    return None;
                }
            };
            match self.rx.decode(&frame.payload) {
                Ok(()) => {
                    *self.rx.envelope_mut() = frame.envelope;
                    break;
                }
                Err(e) => {
                    warn!("rejected packet: {}", e);
                    if !blocking {
                        return None;
                    }
                }
            }
        }
        Some(&self.rx)
    }

    /// Decode the next frame directly into `packet`, waiting at most
    /// `timeout`. Used by ingestion loops that recycle packet memory.
    pub fn read_into(&mut self, packet: &mut Packet<T>, timeout: Duration) -> ReadOutcome {
        match self.transport.recv(Some(timeout)) {
            Received::Frame(frame) => match packet.decode(&frame.payload) {
                Ok(()) => {
                    *packet.envelope_mut() = frame.envelope;
                    ReadOutcome::Received
                }
                Err(e) => {
                    warn!("rejected packet: {}", e);
                    ReadOutcome::Rejected
                }
            },
            Received::Empty => ReadOutcome::TimedOut,
            Received::Closed => {
                self.closed = true;
                ReadOutcome::Closed
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::record::AddressEvent;
    use crate::transport::ChannelTransport;
    use crate::utils::clock;
    use bytes::Bytes;

    fn pair() -> (Port<AddressEvent>, Port<AddressEvent>) {
        let (a, b) = ChannelTransport::pair(4);
        (Port::new(a), Port::new(b))
    }

    fn send_packet(port: &mut Port<AddressEvent>, count: u32, duration: f64) {
        let p = port.prepare();
        for i in 0..count {
            p.push(AddressEvent {
                stamp: i,
                address: i,
            });
        }
        p.set_duration(duration);
        p.envelope_mut().stamp(clock::now());
        port.write();
    }

    #[test]
    fn test_prepare_write_read() {
        let (mut tx, mut rx) = pair();
        send_packet(&mut tx, 10, 0.001);
        let packet = rx.read(true).expect("packet");
        assert_eq!(packet.len(), 10);
        assert!((packet.duration() - 0.001).abs() < 1e-9);
        assert_eq!(packet.sequence(), 0);
        assert!(packet.timestamp() > 0.0);
    }

    #[test]
    fn test_sequence_continues_across_packets() {
        let (mut tx, mut rx) = pair();
        send_packet(&mut tx, 1, 0.001);
        send_packet(&mut tx, 1, 0.001);
        assert_eq!(rx.read(true).unwrap().sequence(), 0);
        assert_eq!(rx.read(true).unwrap().sequence(), 1);
    }

    #[test]
    fn test_write_without_prepare_is_noop() {
        let (mut tx, mut rx) = pair();
        tx.write();
        assert!(rx.read(false).is_none());
    }

    #[test]
    fn test_write_without_duration_sends_nothing() {
        let (mut tx, mut rx) = pair();
        let p = tx.prepare();
        p.push(AddressEvent {
            stamp: 0,
            address: 0,
        });
        tx.write();
        assert!(rx.read(false).is_none());
    }

    #[test]
    fn test_unprepare_discards() {
        let (mut tx, mut rx) = pair();
        tx.prepare().push(AddressEvent {
            stamp: 0,
            address: 0,
        });
        assert!(tx.unprepare());
        tx.write();
        assert!(rx.read(false).is_none());
    }

    #[test]
    fn test_nonblocking_read_empty() {
        let (_tx, mut rx) = pair();
        assert!(rx.read(false).is_none());
        assert!(!rx.is_closed());
    }

    #[test]
    fn test_read_after_close() {
        let (tx, mut rx) = pair();
        drop(tx);
        assert!(rx.read(true).is_none());
        assert!(rx.is_closed());
    }

    #[test]
    fn test_framing_error_skipped_on_blocking_read() {
        let (raw_a, raw_b) = ChannelTransport::pair(4);
        // garbage frame ahead of a good packet
        raw_a
            .send(Frame {
                envelope: Default::default(),
                payload: Bytes::from_static(b"junk"),
            })
            .unwrap();
        let mut tx: Port<AddressEvent> = Port::new(raw_a);
        send_packet(&mut tx, 3, 0.001);

        let mut rx: Port<AddressEvent> = Port::new(raw_b);
        let packet = rx.read(true).expect("good packet after skipping junk");
        assert_eq!(packet.len(), 3);
    }

    #[test]
    fn test_framing_error_rejected_nonblocking() {
        let (raw_a, raw_b) = ChannelTransport::pair(4);
        raw_a
            .send(Frame {
                envelope: Default::default(),
                payload: Bytes::from_static(b"\x02\x00\x00\x00XX"),
            })
            .unwrap();
        let mut rx: Port<AddressEvent> = Port::new(raw_b);
        assert!(rx.read(false).is_none());
    }

    #[test]
    fn test_read_into_outcomes() {
        let (mut tx, raw_rx) = {
            let (a, b) = ChannelTransport::pair(4);
            (Port::<AddressEvent>::new(a), b)
        };
        let mut rx: Port<AddressEvent> = Port::new(raw_rx);
        let mut packet = Packet::new();

        assert_eq!(
            rx.read_into(&mut packet, Duration::from_millis(1)),
            ReadOutcome::TimedOut
        );

        send_packet(&mut tx, 5, 0.002);
        assert_eq!(
            rx.read_into(&mut packet, Duration::from_millis(100)),
            ReadOutcome::Received
        );
        assert_eq!(packet.len(), 5);

        drop(tx);
        assert_eq!(
            rx.read_into(&mut packet, Duration::from_millis(1)),
            ReadOutcome::Closed
        );
    }
}
