//! Wire primitives - little-endian writer/reader used by the packet codec
//!
//! The layout is a fixed positional contract shared by all peers: fields are
//! written in declaration order, strings are a u16 byte-length prefix plus
//! UTF-8 bytes, booleans are a single strict 0/1 byte, floats are 4-byte
//! IEEE-754. Any reordering breaks interoperability with unmodified peers.

use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Errors produced while decoding a received packet.
///
/// A decode error always means the whole packet is discarded; a packet is
/// never partially applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("truncated packet: needed {needed} more byte(s) at offset {offset}")]
    Truncated { needed: usize, offset: usize },

    #[error("string field at offset {offset} is not valid UTF-8")]
    InvalidUtf8 { offset: usize },

    #[error("boolean field at offset {offset} holds invalid value {value:#04x}")]
    InvalidBool { offset: usize, value: u8 },

    #[error("unknown {field} discriminant {value}")]
    UnknownEnum { field: &'static str, value: u32 },

    #[error("header names method {found:?}, decoder expects {expected:?}")]
    MethodMismatch {
        expected: &'static str,
        found: String,
    },
}

/// Append-only packet buffer.
///
/// Encoding is infallible: all id strings on this wire are a couple dozen
/// bytes, far below the 64 KiB length-prefix limit.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: BytesMut,
}

impl WireWriter {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(64),
        }
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buf.put_u32_le(value);
    }

    pub fn put_i32(&mut self, value: i32) {
        self.buf.put_i32_le(value);
    }

    pub fn put_f32(&mut self, value: f32) {
        self.buf.put_f32_le(value);
    }

    pub fn put_bool(&mut self, value: bool) {
        self.buf.put_u8(u8::from(value));
    }

    pub fn put_string(&mut self, value: &str) {
        debug_assert!(value.len() <= u16::MAX as usize);
        self.buf.put_u16_le(value.len() as u16);
        self.buf.put_slice(value.as_bytes());
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Strict positional reader over a received byte slice.
///
/// Every read checks the remaining length first, so a truncated stream fails
/// with [`DecodeError::Truncated`] instead of mis-parsing.
#[derive(Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn ensure(&self, needed: usize) -> Result<(), DecodeError> {
        if self.buf.remaining() < needed {
            Err(DecodeError::Truncated {
                needed: needed - self.buf.remaining(),
                offset: self.offset,
            })
        } else {
            Ok(())
        }
    }

    fn advance(&mut self, count: usize) {
        self.buf.advance(count);
        self.offset += count;
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        self.ensure(1)?;
        let value = self.buf[0];
        self.advance(1);
        Ok(value)
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        self.ensure(2)?;
        let mut head = &self.buf[..2];
        let value = head.get_u16_le();
        self.advance(2);
        Ok(value)
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        self.ensure(4)?;
        let mut head = &self.buf[..4];
        let value = head.get_u32_le();
        self.advance(4);
        Ok(value)
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        self.ensure(4)?;
        let mut head = &self.buf[..4];
        let value = head.get_i32_le();
        self.advance(4);
        Ok(value)
    }

    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        self.ensure(4)?;
        let mut head = &self.buf[..4];
        let value = head.get_f32_le();
        self.advance(4);
        Ok(value)
    }

    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        let offset = self.offset;
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(DecodeError::InvalidBool { offset, value }),
        }
    }

    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let len = self.read_u16()? as usize;
        self.ensure(len)?;
        let offset = self.offset;
        let bytes = &self.buf[..len];
        let value = std::str::from_utf8(bytes)
            .map_err(|_| DecodeError::InvalidUtf8 { offset })?
            .to_string();
        self.advance(len);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_scalars_and_strings() {
        let mut writer = WireWriter::new();
        writer.put_string("profile-123");
        writer.put_u32(0xDEAD_BEEF);
        writer.put_f32(35.5);
        writer.put_u8(3);
        writer.put_bool(true);
        writer.put_i32(-7);
        let bytes = writer.freeze();

        let mut reader = WireReader::new(&bytes);
        assert_eq!(reader.read_string().unwrap(), "profile-123");
        assert_eq!(reader.read_u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(reader.read_f32().unwrap(), 35.5);
        assert_eq!(reader.read_u8().unwrap(), 3);
        assert!(reader.read_bool().unwrap());
        assert_eq!(reader.read_i32().unwrap(), -7);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn truncated_read_reports_offset() {
        let mut writer = WireWriter::new();
        writer.put_u32(9);
        let bytes = writer.freeze();

        let mut reader = WireReader::new(&bytes[..3]);
        assert_eq!(
            reader.read_u32(),
            Err(DecodeError::Truncated {
                needed: 1,
                offset: 0
            })
        );
    }

    #[test]
    fn truncated_string_body_fails() {
        let mut writer = WireWriter::new();
        writer.put_string("abcdef");
        let bytes = writer.freeze();

        // Length prefix intact, body cut short.
        let mut reader = WireReader::new(&bytes[..5]);
        assert!(matches!(
            reader.read_string(),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn bool_must_be_zero_or_one() {
        let mut reader = WireReader::new(&[2]);
        assert_eq!(
            reader.read_bool(),
            Err(DecodeError::InvalidBool {
                offset: 0,
                value: 2
            })
        );
    }

    #[test]
    fn string_rejects_invalid_utf8() {
        // Length 2, bytes are an invalid UTF-8 sequence.
        let mut reader = WireReader::new(&[2, 0, 0xC3, 0x28]);
        assert_eq!(
            reader.read_string(),
            Err(DecodeError::InvalidUtf8 { offset: 2 })
        );
    }
}
