// src/utils/mod.rs
//! Common utilities: error taxonomy and clock helpers.

pub mod clock;
pub mod errors;

pub use errors::{Result, StreamError};
