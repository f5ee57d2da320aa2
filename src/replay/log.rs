// src/replay/log.rs
//! Recorded-log line format
//!
//! One packet per line, whitespace-separated:
//!
//! ```text
//! <sequence> <timestamp> <tag> <duration_us> <hex blob>
//! ```
//!
//! The blob holds the same raw record bytes as the wire format,
//! hex-encoded so a recording stays a plain text file. An empty packet
//! simply has no blob field.

use crate::packet::batch::Packet;
use crate::packet::record::{Envelope, EventRecord};
use crate::utils::errors::{Result, StreamError};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Render a packet as one log line.
pub fn encode_line<T: EventRecord>(packet: &Packet<T>) -> String {
    let micros = (packet.duration() * MICROS_PER_SECOND + 0.5) as u32;
    format!(
        "{} {:.6} {} {} {}",
        packet.sequence(),
        packet.timestamp(),
        T::TAG,
        micros,
        hex::encode(packet.as_bytes())
    )
}

/// Parse one log line into a packet, reusing its buffer.
pub fn decode_line<T: EventRecord>(line: &str, packet: &mut Packet<T>) -> Result<()> {
    let mut fields = line.split_whitespace();

    let sequence: i64 = next_field(&mut fields, "sequence")?
        .parse()
        .map_err(|e| bad_field("sequence", e))?;
    let timestamp: f64 = next_field(&mut fields, "timestamp")?
        .parse()
        .map_err(|e| bad_field("timestamp", e))?;
    let tag = next_field(&mut fields, "tag")?;
    if tag != T::TAG {
        return Err(StreamError::Load(format!(
            "tag mismatch: expected {:?}, got {:?}",
            T::TAG,
            tag
        )));
    }
    let micros: u32 = next_field(&mut fields, "duration")?
        .parse()
        .map_err(|e| bad_field("duration", e))?;
    let blob = fields.next().unwrap_or("");
    let bytes =
        hex::decode(blob).map_err(|e| StreamError::Load(format!("bad blob encoding: {}", e)))?;

    packet.clear();
    *packet.envelope_mut() = Envelope::new(sequence, timestamp);
    packet.set_duration(micros as f64 / MICROS_PER_SECOND);
    packet
        .fill_from_memory(&bytes)
        .map_err(|e| StreamError::Load(format!("bad blob: {}", e)))?;
    Ok(())
}

fn next_field<'a>(
    fields: &mut impl Iterator<Item = &'a str>,
    name: &str,
) -> Result<&'a str> {
    fields
        .next()
        .ok_or_else(|| StreamError::Load(format!("missing {} field", name)))
}

fn bad_field(name: &str, err: impl std::fmt::Display) -> StreamError {
    StreamError::Load(format!("bad {} field: {}", name, err))
}

/// Appends packets to a recording, one line each.
pub struct LogWriter {
    out: BufWriter<File>,
}

impl LogWriter {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            out: BufWriter::new(file),
        })
    }

    pub fn append<T: EventRecord>(&mut self, packet: &Packet<T>) -> Result<()> {
        writeln!(self.out, "{}", encode_line(packet))?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
