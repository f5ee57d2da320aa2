// src/window/mod.rs
//! Concurrent windowing over a live event stream
//!
//! This module provides the consumer-facing view of a high-rate packet
//! stream:
//!
//! - **Engine**: background ingestion plus sliding/chunked query methods
//! - **View**: lock-free, reference-counted query results
//! - **Cursor**: bounds-checked iteration across packet boundaries
//!
//! # Architecture
//!
//! ```text
//! Port → ingestion thread → active list ─┬→ query → WindowView → consumer
//!                ↑                       │
//!            free list ←── eviction ←────┘
//! ```

pub mod engine;
pub mod view;

// Re-export commonly used types
pub use engine::{EventWindow, WindowConfig};
pub use view::{PacketRef, WindowIter, WindowView};
