// src/utils/errors.rs
//! Error types for the streaming core
//!
//! The taxonomy mirrors how failures are recovered:
//!
//! - **Framing**: malformed wire packet — rejected and logged, the stream
//!   continues.
//! - **Io**: hard read/write failure on a descriptor or transport —
//!   propagated, the ingestion loop terminates.
//! - **ProtocolMisuse**: caller violated the prepare/write discipline —
//!   logged, the operation is a no-op, nothing reaches the wire.
//! - **Load**: a recorded log could not be opened or holds no packets — no
//!   partial state is retained.

use thiserror::Error;

/// Errors produced by the streaming core
#[derive(Debug, Error)]
pub enum StreamError {
    /// Malformed wire packet: wrong tag, bad blob length, truncated field
    #[error("framing error: {0}")]
    Framing(String),

    /// Hard descriptor or transport I/O failure
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Caller violated the prepare/write or duration discipline
    #[error("protocol misuse: {0}")]
    ProtocolMisuse(String),

    /// Recorded log missing, unreadable, or empty
    #[error("log load failed: {0}")]
    Load(String),
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        let err: StreamError = io.into();
        assert!(matches!(err, StreamError::Io(_)));
    }

    #[test]
    fn test_display() {
        let err = StreamError::Framing("bad tag".to_string());
        assert_eq!(err.to_string(), "framing error: bad tag");
    }
}
