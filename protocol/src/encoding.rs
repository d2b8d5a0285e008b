//! Canonical byte writer.
//!
//! Signatures are only meaningful if every party serializes a proposal to the
//! same bytes. serde formats make no such promise across versions, so the
//! signed payload is built by hand: fixed-width little-endian integers,
//! `u32` length prefixes on every variable-length field, and a one-byte tag
//! in front of every enum or optional value.

/// Append-only buffer with the canonical field encodings.
#[derive(Debug, Default)]
pub struct CanonicalWriter {
    buf: Vec<u8>,
}

impl CanonicalWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn put_u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn put_u16(&mut self, value: u16) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn put_u32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn put_u64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Raw bytes with no length prefix. Only for fixed-size values (keys, hashes).
    pub fn put_fixed(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Length-prefixed bytes.
    pub fn put_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.put_u32(bytes.len() as u32);
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn put_str(&mut self, value: &str) -> &mut Self {
        self.put_bytes(value.as_bytes())
    }

    pub fn put_opt_str(&mut self, value: Option<&str>) -> &mut Self {
        match value {
            Some(s) => self.put_u8(1).put_str(s),
            None => self.put_u8(0),
        }
    }

    /// Element count prefix for a sequence that follows.
    pub fn put_len(&mut self, len: usize) -> &mut Self {
        self.put_u32(len as u32)
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}
