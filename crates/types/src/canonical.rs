//! Unambiguous byte encoding for hashing multi-field records.
//!
//! Every variable-length field is prefixed with its length as a big-endian
//! `u32`, so no choice of field contents can shift a boundary.

/// Accumulates a domain tag followed by length-prefixed fields.
pub struct CanonicalWriter {
    buf: Vec<u8>,
}

impl CanonicalWriter {
    pub fn new(domain: &[u8]) -> Self {
        let mut writer = Self {
            buf: Vec::with_capacity(256),
        };
        writer.field(domain);
        writer
    }

    pub fn field(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}
