// src/packet/wire.rs
//! Length-prefixed wire codec for packets
//!
//! Frame layout, all integers little-endian:
//!
//! ```text
//! [u32 tag_len][tag bytes][u32 duration_us][u32 blob_len][blob]
//! ```
//!
//! The tag names the record type, the duration is microseconds of sensor
//! time, and the blob is the raw record bytes. Decoding rejects the whole
//! frame on a tag mismatch, a blob length that is not a record multiple,
//! or any missing field; a rejected frame never partially fills the
//! packet. The envelope travels out-of-band and is not part of this
//! layout.

use crate::packet::batch::Packet;
use crate::packet::record::EventRecord;
use crate::utils::errors::{Result, StreamError};
use bytes::{Buf, BufMut, Bytes, BytesMut};

const MICROS_PER_SECOND: f64 = 1_000_000.0;

impl<T: EventRecord> Packet<T> {
    /// Serialize to a wire frame. Fails if the duration was never set:
    /// a packet without a time span is meaningless to the receiver.
    pub fn encode(&self) -> Result<Bytes> {
        if !(self.duration() > 0.0) {
            return Err(StreamError::ProtocolMisuse(
                "packet has no duration; nothing sent".to_string(),
            ));
        }
        let payload = self.as_bytes();
        let tag = T::TAG.as_bytes();
        let micros = (self.duration() * MICROS_PER_SECOND + 0.5) as u32;

        let mut buf = BytesMut::with_capacity(12 + tag.len() + payload.len());
        buf.put_u32_le(tag.len() as u32);
        buf.put_slice(tag);
        buf.put_u32_le(micros);
        buf.put_u32_le(payload.len() as u32);
        buf.put_slice(payload);
        Ok(buf.freeze())
    }

    /// Deserialize a wire frame into this packet, reusing its buffer.
    /// On any framing error the packet is left empty.
    pub fn decode(&mut self, frame: &[u8]) -> Result<()> {
        let result = self.parse(frame);
        if result.is_err() {
            self.clear();
        }
        result
    }

    fn parse(&mut self, mut frame: &[u8]) -> Result<()> {
        if frame.remaining() < 4 {
            return Err(invalid("missing tag length"));
        }
        let tag_len = frame.get_u32_le() as usize;
        if frame.remaining() < tag_len {
            return Err(invalid("truncated tag"));
        }
        let tag = frame.copy_to_bytes(tag_len);
        if tag.as_ref() != T::TAG.as_bytes() {
            return Err(invalid(&format!(
                "tag mismatch: expected {:?}, got {:?}",
                T::TAG,
                String::from_utf8_lossy(&tag)
            )));
        }

        if frame.remaining() < 4 {
            return Err(invalid("missing duration"));
        }
        let micros = frame.get_u32_le();

        if frame.remaining() < 4 {
            return Err(invalid("missing blob length"));
        }
        let blob_len = frame.get_u32_le() as usize;
        if blob_len % T::SIZE != 0 {
            return Err(invalid(&format!(
                "blob of {} bytes is not a multiple of the {}-byte record",
                blob_len,
                T::SIZE
            )));
        }
        if frame.remaining() < blob_len {
            return Err(invalid("truncated blob"));
        }

        self.fill_from_memory(&frame[..blob_len])?;
        self.set_duration(micros as f64 / MICROS_PER_SECOND);
        Ok(())
    }
}

fn invalid(msg: &str) -> StreamError {
    StreamError::Framing(msg.to_string())
}
