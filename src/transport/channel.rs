// src/transport/channel.rs
//! In-process transport over bounded crossbeam channels.

use crate::transport::{Frame, Received, Transport};
use crate::utils::errors::{Result, StreamError};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::io::ErrorKind;
use std::time::Duration;

/// One endpoint of a cross-wired pair of bounded channels.
///
/// A bounded send queue gives the documented backpressure policy for free:
/// once `capacity` frames are in flight, `send` blocks until the consumer
/// drains one.
pub struct ChannelTransport {
    tx: Sender<Frame>,
    rx: Receiver<Frame>,
}

impl ChannelTransport {
    /// Build a connected pair: frames sent on one endpoint arrive on the
    /// other.
    pub fn pair(capacity: usize) -> (ChannelTransport, ChannelTransport) {
        let (a_tx, b_rx) = bounded(capacity);
        let (b_tx, a_rx) = bounded(capacity);
        (
            ChannelTransport { tx: a_tx, rx: a_rx },
            ChannelTransport { tx: b_tx, rx: b_rx },
        )
    }
}

impl Transport for ChannelTransport {
    fn send(&self, frame: Frame) -> Result<()> {
        self.tx.send(frame).map_err(|_| {
            StreamError::Io(std::io::Error::new(
                ErrorKind::BrokenPipe,
                "transport peer closed",
            ))
        })
    }

    fn recv(&self, timeout: Option<Duration>) -> Received {
        match timeout {
            None => match self.rx.recv() {
                Ok(frame) => Received::Frame(frame),
                Err(_) => Received::Closed,
            },
            Some(t) if t.is_zero() => match self.rx.try_recv() {
                Ok(frame) => Received::Frame(frame),
                Err(TryRecvError::Empty) => Received::Empty,
                Err(TryRecvError::Disconnected) => Received::Closed,
            },
            Some(t) => match self.rx.recv_timeout(t) {
                Ok(frame) => Received::Frame(frame),
                Err(RecvTimeoutError::Timeout) => Received::Empty,
                Err(RecvTimeoutError::Disconnected) => Received::Closed,
            },
        }
    }
}
