// src/utils/clock.rs
//! Wall-clock helper used for envelope stamping and replay synchronization.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as floating-point seconds since the Unix epoch.
pub fn now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
