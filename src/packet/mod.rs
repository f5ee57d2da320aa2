// src/packet/mod.rs
//! Packets of fixed-size binary event records
//!
//! This module provides the batch container shared by every producer and
//! consumer in the pipeline:
//!
//! - **Record contract**: any flat-copyable record type with a wire tag
//! - **Packet**: an append-only, reusable batch with duration metadata
//! - **Wire codec**: length-prefixed (de)serialization for the transport
//!
//! The core is generic over the record type and never inspects record
//! fields; spatial/visual interpretation belongs to downstream consumers.

pub mod batch;
pub mod record;
pub mod wire;

// Re-export commonly used types
pub use batch::Packet;
pub use record::{AddressEvent, BatchInfo, Envelope, EventRecord};
