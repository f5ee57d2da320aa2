// src/replay/mod.rs
//! Offline recording and replay
//!
//! A recording is a plain text file, one packet per line, carrying the
//! same producer metadata a live stream does. This module covers both
//! directions:
//!
//! - **Log**: the line format, plus a buffered writer for recordings
//! - **Loader**: loads a whole recording up front and replays it with
//!   the same windowed semantics the live engine provides

pub mod loader;
pub mod log;

// Re-export commonly used types
pub use loader::OfflineReplay;
pub use log::{decode_line, encode_line, LogWriter};
