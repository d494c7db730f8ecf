//! Binary wire format primitives.
//!
//! Layout rules, shared by every packet:
//! - fixed-width integers and floats are little-endian;
//! - strings are a `u16` length prefix followed by UTF-8 bytes;
//! - optional fields are a 1-byte presence flag (0 or 1) followed by the value.
//!
//! Decoding is the exact inverse of encoding and never reads out of bounds:
//! every read checks the remaining length first and reports failure as a
//! [`WireError`]. Encodings are canonical, so `encode(decode(bytes)) == bytes`
//! holds for any buffer that decodes successfully.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::WireError;
use crate::math::Vec3;

/// Types that write themselves into a wire buffer.
pub trait Encode {
    fn encode(&self, w: &mut WireWriter);
}

/// Types that reconstruct themselves from a wire buffer.
pub trait Decode: Sized {
    fn decode(r: &mut WireReader<'_>) -> Result<Self, WireError>;
}

/// Append-only writer over a growable byte buffer.
#[derive(Default)]
pub struct WireWriter {
    buf: BytesMut,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    pub fn put_u16(&mut self, v: u16) {
        self.buf.put_u16_le(v);
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.put_u32_le(v);
    }

    pub fn put_u64(&mut self, v: u64) {
        self.buf.put_u64_le(v);
    }

    pub fn put_i16(&mut self, v: i16) {
        self.buf.put_i16_le(v);
    }

    pub fn put_i32(&mut self, v: i32) {
        self.buf.put_i32_le(v);
    }

    pub fn put_f32(&mut self, v: f32) {
        self.buf.put_f32_le(v);
    }

    pub fn put_bool(&mut self, v: bool) {
        self.buf.put_u8(v as u8);
    }

    /// Writes a `u16` length prefix followed by UTF-8 bytes.
    ///
    /// Strings longer than `u16::MAX` bytes are truncated at a character
    /// boundary; callers enforce their own tighter limits before encoding.
    pub fn put_str(&mut self, s: &str) {
        let mut len = s.len().min(u16::MAX as usize);
        while !s.is_char_boundary(len) {
            len -= 1;
        }
        self.buf.put_u16_le(len as u16);
        self.buf.put_slice(&s.as_bytes()[..len]);
    }

    pub fn put_vec3(&mut self, v: Vec3) {
        self.put_f32(v.x);
        self.put_f32(v.y);
        self.put_f32(v.z);
    }

    pub fn put_optional<T: Encode>(&mut self, value: &Option<T>) {
        match value {
            Some(v) => {
                self.put_bool(true);
                v.encode(self);
            }
            None => self.put_bool(false),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Bounds-checked reader over a borrowed byte slice.
pub struct WireReader<'a> {
    buf: &'a [u8],
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn need(&self, n: usize) -> Result<(), WireError> {
        if self.buf.len() < n {
            return Err(WireError::UnexpectedEof {
                needed: n - self.buf.len(),
                remaining: self.buf.len(),
            });
        }
        Ok(())
    }

    pub fn get_u8(&mut self) -> Result<u8, WireError> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn get_u16(&mut self) -> Result<u16, WireError> {
        self.need(2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn get_u32(&mut self) -> Result<u32, WireError> {
        self.need(4)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn get_u64(&mut self) -> Result<u64, WireError> {
        self.need(8)?;
        Ok(self.buf.get_u64_le())
    }

    pub fn get_i16(&mut self) -> Result<i16, WireError> {
        self.need(2)?;
        Ok(self.buf.get_i16_le())
    }

    pub fn get_i32(&mut self) -> Result<i32, WireError> {
        self.need(4)?;
        Ok(self.buf.get_i32_le())
    }

    /// Reads a float, rejecting NaN and infinity so positions and rotations
    /// stay finite after any decode.
    pub fn get_f32(&mut self) -> Result<f32, WireError> {
        self.need(4)?;
        let v = self.buf.get_f32_le();
        if !v.is_finite() {
            return Err(WireError::NonFinite);
        }
        Ok(v)
    }

    pub fn get_bool(&mut self) -> Result<bool, WireError> {
        match self.get_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(WireError::BadPresenceFlag(other)),
        }
    }

    pub fn get_str(&mut self) -> Result<String, WireError> {
        let len = self.get_u16()? as usize;
        self.need(len)?;
        let (head, tail) = self.buf.split_at(len);
        let s = std::str::from_utf8(head).map_err(|_| WireError::BadUtf8)?;
        self.buf = tail;
        Ok(s.to_string())
    }

    pub fn get_vec3(&mut self) -> Result<Vec3, WireError> {
        Ok(Vec3::new(self.get_f32()?, self.get_f32()?, self.get_f32()?))
    }

    pub fn get_optional<T: Decode>(&mut self) -> Result<Option<T>, WireError> {
        if self.get_bool()? {
            Ok(Some(T::decode(self)?))
        } else {
            Ok(None)
        }
    }

    /// Asserts the whole buffer was consumed.
    pub fn finish(&self) -> Result<(), WireError> {
        if !self.buf.is_empty() {
            return Err(WireError::TrailingBytes(self.buf.len()));
        }
        Ok(())
    }
}

/// Encodes a value and asserts the whole body decodes back.
pub fn encode_to_bytes<T: Encode>(value: &T) -> Bytes {
    let mut w = WireWriter::new();
    value.encode(&mut w);
    w.freeze()
}

/// Decodes a complete packet body, rejecting trailing bytes.
pub fn decode_from_bytes<T: Decode>(buf: &[u8]) -> Result<T, WireError> {
    let mut r = WireReader::new(buf);
    let value = T::decode(&mut r)?;
    r.finish()?;
    Ok(value)
}
