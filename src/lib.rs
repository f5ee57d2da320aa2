// src/lib.rs
//! Event Stream Windowing Library
//!
//! This library provides the core components for moving high-rate event
//! streams between processes and querying them in temporal windows.
//!
//! # Architecture
//!
//! The crate is structured into several key modules:
//!
//! - **packet**: Typed event batches and the wire codec
//! - **transport**: Frame transports and the buffered send/receive port
//! - **window**: Background ingestion and sliding/chunked window queries
//! - **replay**: Recording files and offline windowed replay
//! - **utils**: Common utilities and helpers

// Public module exports
pub mod packet;
pub mod replay;
pub mod transport;
pub mod utils;
pub mod window;

// Re-export commonly used types
pub use packet::{AddressEvent, BatchInfo, Envelope, EventRecord, Packet};
pub use replay::{LogWriter, OfflineReplay};
pub use transport::channel::ChannelTransport;
pub use transport::port::{Port, ReadOutcome};
pub use transport::{Frame, Received, Transport};
pub use utils::errors::{Result, StreamError};
pub use window::{EventWindow, PacketRef, WindowConfig, WindowIter, WindowView};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
