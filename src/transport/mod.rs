// src/transport/mod.rs
//! Transport boundary and the buffered-port wrapper
//!
//! The network transport itself is an external collaborator: anything that
//! moves whole frames in order, or not at all. This module specifies that
//! boundary as the [`Transport`] trait, ships a crossbeam-channel
//! in-process implementation for tests and same-process pipelines, and
//! wraps any transport in the [`Port`] discipline:
//!
//! - **prepare → fill → write** with at most one outstanding send buffer
//! - envelope attached out-of-band, never inside the payload
//! - the sender stalls rather than queueing unboundedly (backpressure)

pub mod channel;
pub mod port;

// Re-export commonly used types
pub use channel::ChannelTransport;
pub use port::{Port, ReadOutcome};

use crate::packet::record::Envelope;
use crate::utils::errors::Result;
use bytes::Bytes;
use std::time::Duration;

/// One unit of transport delivery: an encoded packet plus its out-of-band
/// envelope.
#[derive(Debug, Clone)]
pub struct Frame {
    pub envelope: Envelope,
    pub payload: Bytes,
}

/// Result of polling a transport for the next frame.
#[derive(Debug)]
pub enum Received {
    /// A whole frame arrived
    Frame(Frame),

    /// Nothing available within the allowed wait
    Empty,

    /// The peer is gone; no further frames will arrive
    Closed,
}

/// A frame-oriented, ordered, whole-frame-or-nothing delivery channel.
///
/// Connection setup, addressing, and reliability live behind this trait;
/// the core only assumes frames arrive intact and in order.
pub trait Transport: Send {
    /// Deliver a frame, blocking until the transport accepts it.
    fn send(&self, frame: Frame) -> Result<()>;

    /// Receive the next frame. `None` blocks indefinitely; `Some(ZERO)`
    /// polls without waiting.
    fn recv(&self, timeout: Option<Duration>) -> Received;
}
