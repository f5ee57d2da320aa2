// src/packet/batch.rs
//! Reusable batch container for fixed-size event records
//!
//! A `Packet` owns a growable record buffer plus batch metadata: the
//! seconds of sensor time it covers and the out-of-band envelope attached
//! by the transport. Buffers grow by a fixed increment and keep their
//! capacity across `clear()`, so a recycled packet ingests at full rate
//! without reallocating.

use crate::packet::record::{BatchInfo, Envelope, EventRecord};
use crate::utils::errors::{Result, StreamError};
use std::io::{ErrorKind, Read, Write};
use std::ops::Index;
use tracing::warn;

/// Records added beyond capacity grow the buffer by this many records.
const GROWTH_INCREMENT: usize = 16_384;

/// A timestamped, duration-tagged batch of fixed-size event records.
///
/// Only `[0, len)` of the underlying buffer is valid. A packet handed to a
/// consumer is read-only from then on; mutation is reserved for the filling
/// stage of its lifecycle.
#[derive(Debug, Clone)]
pub struct Packet<T: EventRecord> {
    buffer: Vec<T>,
    len: usize,
    duration: f64,
    envelope: Envelope,
}

impl<T: EventRecord> Default for Packet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: EventRecord> Packet<T> {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            len: 0,
            duration: 0.0,
            envelope: Envelope::default(),
        }
    }

    pub fn with_capacity(records: usize) -> Self {
        Self {
            buffer: vec![T::zeroed(); records],
            len: 0,
            duration: 0.0,
            envelope: Envelope::default(),
        }
    }

    /// Append one record, growing the buffer by a fixed increment when
    /// full. Amortized O(1).
    pub fn push(&mut self, record: T) {
        if self.len == self.buffer.len() {
            self.buffer
                .resize(self.buffer.len() + GROWTH_INCREMENT, T::zeroed());
        }
        self.buffer[self.len] = record;
        self.len += 1;
    }

    /// Reset length and duration to zero. Capacity and envelope are
    /// retained: capacity to amortize allocation across reuse, the
    /// envelope so a producer's sequence id continues across packets.
    pub fn clear(&mut self) {
        self.len = 0;
        self.duration = 0.0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Seconds of sensor time this batch covers.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn set_duration(&mut self, seconds: f64) {
        self.duration = seconds;
    }

    pub fn envelope(&self) -> Envelope {
        self.envelope
    }

    pub fn envelope_mut(&mut self) -> &mut Envelope {
        &mut self.envelope
    }

    /// Producer timestamp from the envelope.
    pub fn timestamp(&self) -> f64 {
        self.envelope.timestamp
    }

    /// Sequence id from the envelope.
    pub fn sequence(&self) -> i64 {
        self.envelope.sequence
    }

    /// Batch summary: count, duration, producer timestamp.
    pub fn info(&self) -> BatchInfo {
        BatchInfo::new(self.len as u32, self.duration, self.envelope.timestamp)
    }

    /// The valid records.
    pub fn records(&self) -> &[T] {
        &self.buffer[..self.len]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.records().iter()
    }

    /// The valid records viewed as raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.records())
    }

    fn byte_capacity_for(&mut self, bytes: usize) -> usize {
        let records = bytes.div_ceil(T::SIZE);
        if self.buffer.len() < records {
            self.buffer.resize(records, T::zeroed());
        }
        records
    }

    /// Bulk-fill from a raw byte buffer. The length must be an exact
    /// multiple of the record size; on failure the packet is untouched.
    pub fn fill_from_memory(&mut self, bytes: &[u8]) -> Result<usize> {
        if bytes.len() % T::SIZE != 0 {
            return Err(StreamError::Framing(format!(
                "{} bytes is not a multiple of the {}-byte record",
                bytes.len(),
                T::SIZE
            )));
        }
        let records = bytes.len() / T::SIZE;
        self.byte_capacity_for(bytes.len());
        bytemuck::cast_slice_mut::<T, u8>(&mut self.buffer[..records]).copy_from_slice(bytes);
        self.len = records;
        Ok(bytes.len())
    }

    /// Fill by repeated partial reads from a descriptor-backed reader.
    ///
    /// Reads until `max_chunk` bytes are obtained or a read shorter than
    /// `min_chunk` signals the device has no more data. `Interrupted` and
    /// `WouldBlock` are retried; any other I/O failure is propagated. A
    /// total that is not a record multiple is a fatal framing error and
    /// leaves the packet empty.
    pub fn fill_from_reader<R: Read>(
        &mut self,
        reader: &mut R,
        min_chunk: usize,
        max_chunk: usize,
    ) -> Result<usize> {
        let records = self.byte_capacity_for(max_chunk);
        let bytes = bytemuck::cast_slice_mut::<T, u8>(&mut self.buffer[..records]);

        let mut filled = 0;
        while filled < max_chunk {
            match reader.read(&mut bytes[filled..max_chunk]) {
                Ok(0) => break,
                Ok(n) => {
                    filled += n;
                    if n < min_chunk {
                        break;
                    }
                }
                Err(e) if matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock) => {
                    continue;
                }
                Err(e) => {
                    self.len = 0;
                    return Err(e.into());
                }
            }
        }

        if filled % T::SIZE != 0 {
            self.len = 0;
            return Err(StreamError::Framing(format!(
                "device read of {} bytes is not a multiple of the {}-byte record",
                filled,
                T::SIZE
            )));
        }
        self.len = filled / T::SIZE;
        Ok(filled)
    }

    /// Append whatever one read yields into the remaining preallocated
    /// capacity, without growing the buffer.
    ///
    /// Device-grabber loops preallocate with [`with_capacity`] and call
    /// this repeatedly, accumulating records until they cut a packet.
    /// `Interrupted` and `WouldBlock` are retried; a read that is not a
    /// record multiple is a framing error and leaves the packet
    /// unchanged. Returns the bytes appended, 0 at EOF or when full.
    ///
    /// [`with_capacity`]: Packet::with_capacity
    pub fn read_once<R: Read>(&mut self, reader: &mut R) -> Result<usize> {
        let offset = self.len * T::SIZE;
        let capacity = self.buffer.len() * T::SIZE;
        if offset == capacity {
            return Ok(0);
        }
        let bytes = bytemuck::cast_slice_mut::<T, u8>(&mut self.buffer);

        let filled = loop {
            match reader.read(&mut bytes[offset..capacity]) {
                Ok(n) => break n,
                Err(e) if matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock) => {
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        };
        if filled % T::SIZE != 0 {
            return Err(StreamError::Framing(format!(
                "device read of {} bytes is not a multiple of the {}-byte record",
                filled,
                T::SIZE
            )));
        }
        self.len += filled / T::SIZE;
        Ok(filled)
    }

    /// Write the valid records to a descriptor-backed writer, looping
    /// partial writes and retrying `WouldBlock`/`Interrupted`. Hard I/O
    /// errors are propagated.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let bytes = self.as_bytes();
        let mut written = 0;
        while written < bytes.len() {
            match writer.write(&bytes[written..]) {
                Ok(0) => {
                    warn!("descriptor refused {} remaining bytes", bytes.len() - written);
                    return Err(StreamError::Io(std::io::Error::new(
                        ErrorKind::WriteZero,
                        "descriptor accepted no bytes",
                    )));
                }
                Ok(n) => written += n,
                Err(e) if matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock) => {
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(written)
    }
}

impl<T: EventRecord> Index<usize> for Packet<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.records()[index]
    }
}

impl<'a, T: EventRecord> IntoIterator for &'a Packet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::record::AddressEvent;
    use std::io::Cursor;

    fn ae(stamp: u32) -> AddressEvent {
        AddressEvent {
            stamp,
            address: stamp * 2,
        }
    }

    #[test]
    fn test_push_and_index() {
        let mut p = Packet::new();
        for i in 0..100 {
            p.push(ae(i));
        }
        assert_eq!(p.len(), 100);
        assert_eq!(p[17], ae(17));
        assert_eq!(p.iter().count(), 100);
    }

    #[test]
    fn test_clear_retains_capacity() {
        let mut p = Packet::new();
        for i in 0..10 {
            p.push(ae(i));
        }
        p.set_duration(0.01);
        let cap = p.capacity();
        p.clear();
        assert_eq!(p.len(), 0);
        assert_eq!(p.duration(), 0.0);
        assert_eq!(p.capacity(), cap);
        assert!(cap >= 10);
    }

    #[test]
    fn test_fill_from_memory_roundtrip() {
        let mut src = Packet::new();
        for i in 0..32 {
            src.push(ae(i));
        }
        let mut dst: Packet<AddressEvent> = Packet::new();
        let n = dst.fill_from_memory(src.as_bytes()).unwrap();
        assert_eq!(n, 32 * AddressEvent::SIZE);
        assert_eq!(dst.records(), src.records());
    }

    #[test]
    fn test_fill_from_memory_rejects_bad_length() {
        let mut p: Packet<AddressEvent> = Packet::new();
        p.push(ae(1));
        let err = p.fill_from_memory(&[0u8; 13]).unwrap_err();
        assert!(matches!(err, StreamError::Framing(_)));
        // untouched on failure
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn test_fill_from_reader_full_chunk() {
        let mut src = Packet::new();
        for i in 0..64 {
            src.push(ae(i));
        }
        let bytes = src.as_bytes().to_vec();
        let mut cursor = Cursor::new(bytes);
        let mut dst: Packet<AddressEvent> = Packet::new();
        let n = dst
            .fill_from_reader(&mut cursor, 8, 64 * AddressEvent::SIZE)
            .unwrap();
        assert_eq!(n, 64 * AddressEvent::SIZE);
        assert_eq!(dst.records(), src.records());
    }

    #[test]
    fn test_fill_from_reader_short_read_stops() {
        let mut src = Packet::new();
        for i in 0..4 {
            src.push(ae(i));
        }
        let bytes = src.as_bytes().to_vec();
        let mut cursor = Cursor::new(bytes);
        let mut dst: Packet<AddressEvent> = Packet::new();
        // ask for more than is available; EOF ends the loop
        let n = dst.fill_from_reader(&mut cursor, 8, 1024).unwrap();
        assert_eq!(n, 4 * AddressEvent::SIZE);
        assert_eq!(dst.len(), 4);
    }

    #[test]
    fn test_fill_from_reader_partial_record_is_fatal() {
        let mut cursor = Cursor::new(vec![0u8; 12]);
        let mut dst: Packet<AddressEvent> = Packet::new();
        let err = dst.fill_from_reader(&mut cursor, 4, 12).unwrap_err();
        assert!(matches!(err, StreamError::Framing(_)));
        assert_eq!(dst.len(), 0);
    }

    #[test]
    fn test_read_once_appends_within_capacity() {
        let mut src = Packet::new();
        for i in 0..6 {
            src.push(ae(i));
        }
        let mut cursor = Cursor::new(src.as_bytes().to_vec());

        let mut dst: Packet<AddressEvent> = Packet::with_capacity(4);
        let n = dst.read_once(&mut cursor).unwrap();
        assert_eq!(n, 4 * AddressEvent::SIZE);
        assert_eq!(dst.len(), 4);

        // full buffer: nothing more is read
        assert_eq!(dst.read_once(&mut cursor).unwrap(), 0);
        assert_eq!(dst.records(), &src.records()[..4]);
    }

    #[test]
    fn test_read_once_accumulates_across_calls() {
        let mut src = Packet::new();
        for i in 0..3 {
            src.push(ae(i));
        }
        let bytes = src.as_bytes().to_vec();
        let mut dst: Packet<AddressEvent> = Packet::with_capacity(16);

        let mut first = Cursor::new(bytes[..AddressEvent::SIZE].to_vec());
        let mut rest = Cursor::new(bytes[AddressEvent::SIZE..].to_vec());
        assert_eq!(dst.read_once(&mut first).unwrap(), AddressEvent::SIZE);
        assert_eq!(dst.read_once(&mut rest).unwrap(), 2 * AddressEvent::SIZE);
        assert_eq!(dst.records(), src.records());

        // EOF
        assert_eq!(dst.read_once(&mut rest).unwrap(), 0);
    }

    #[test]
    fn test_read_once_partial_record_leaves_packet_unchanged() {
        let mut cursor = Cursor::new(vec![0u8; 5]);
        let mut dst: Packet<AddressEvent> = Packet::with_capacity(8);
        dst.push(ae(1));
        let err = dst.read_once(&mut cursor).unwrap_err();
        assert!(matches!(err, StreamError::Framing(_)));
        assert_eq!(dst.len(), 1);
    }

    #[test]
    fn test_write_to() {
        let mut src = Packet::new();
        for i in 0..16 {
            src.push(ae(i));
        }
        let mut sink = Vec::new();
        let n = src.write_to(&mut sink).unwrap();
        assert_eq!(n, 16 * AddressEvent::SIZE);
        assert_eq!(sink, src.as_bytes());
    }

    #[test]
    fn test_info() {
        let mut p = Packet::new();
        p.push(ae(0));
        p.set_duration(0.004);
        *p.envelope_mut() = Envelope::new(7, 3.25);
        let info = p.info();
        assert_eq!(info.count, 1);
        assert_eq!(info.duration, 0.004);
        assert_eq!(info.timestamp, 3.25);
        assert_eq!(p.sequence(), 7);
    }
}
