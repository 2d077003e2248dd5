//! Canonical big-endian encoding helpers shared by every block kind and by
//! network messages.
//!
//! All numeric fields are fixed-width big-endian. Variable-length byte strings
//! are prefixed with a `u32` length. A [`Decoder`] never reads past the end of
//! its buffer; every short read is a [`CodecError::MalformedEncoding`].

use dirchain_types::{Hash32, PublicKey, Signature, SIGNATURE_LENGTH};

use crate::CodecError;

/// Append-only writer for canonical encodings.
#[derive(Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn put_u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn put_u16(&mut self, v: u16) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn put_u32(&mut self, v: u32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn put_u64(&mut self, v: u64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn put_hash(&mut self, h: &Hash32) -> &mut Self {
        self.buf.extend_from_slice(h.as_bytes());
        self
    }

    pub fn put_public_key(&mut self, k: &PublicKey) -> &mut Self {
        self.buf.extend_from_slice(k.as_bytes());
        self
    }

    /// Public key followed by the raw signature bytes.
    pub fn put_signature(&mut self, s: &Signature) -> &mut Self {
        self.put_public_key(&s.public_key);
        self.buf.extend_from_slice(s.bytes());
        self
    }

    /// `u32` length prefix followed by the bytes.
    pub fn put_var_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.put_u32(bytes.len() as u32);
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn put_raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over a canonical encoding.
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize, field: &str) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::malformed(format!(
                "{field}: need {n} bytes at offset {}, have {}",
                self.pos,
                self.remaining()
            )));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn u8(&mut self, field: &str) -> Result<u8, CodecError> {
        Ok(self.take(1, field)?[0])
    }

    pub fn u16(&mut self, field: &str) -> Result<u16, CodecError> {
        let b = self.take(2, field)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn u32(&mut self, field: &str) -> Result<u32, CodecError> {
        let b = self.take(4, field)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn u64(&mut self, field: &str) -> Result<u64, CodecError> {
        let b = self.take(8, field)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_be_bytes(arr))
    }

    pub fn hash(&mut self, field: &str) -> Result<Hash32, CodecError> {
        let b = self.take(32, field)?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(b);
        Ok(Hash32::new(arr))
    }

    pub fn public_key(&mut self, field: &str) -> Result<PublicKey, CodecError> {
        let b = self.take(32, field)?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(b);
        Ok(PublicKey(arr))
    }

    pub fn signature(&mut self, field: &str) -> Result<Signature, CodecError> {
        let key = self.public_key(field)?;
        let b = self.take(SIGNATURE_LENGTH, field)?;
        let mut arr = [0u8; SIGNATURE_LENGTH];
        arr.copy_from_slice(b);
        Ok(Signature::new(key, arr))
    }

    pub fn var_bytes(&mut self, field: &str) -> Result<Vec<u8>, CodecError> {
        let len = self.u32(field)? as usize;
        if len > self.remaining() {
            return Err(CodecError::malformed(format!(
                "{field}: declared length {len} exceeds remaining {}",
                self.remaining()
            )));
        }
        Ok(self.take(len, field)?.to_vec())
    }

    /// Check that a count of fixed-size records agrees exactly with what is left.
    pub fn expect_exact(&self, count: usize, record_len: usize, field: &str) -> Result<(), CodecError> {
        let needed = count.checked_mul(record_len).ok_or_else(|| {
            CodecError::malformed(format!("{field}: count {count} overflows"))
        })?;
        if needed != self.remaining() {
            return Err(CodecError::malformed(format!(
                "{field}: count {count} needs {needed} bytes, {} remain",
                self.remaining()
            )));
        }
        Ok(())
    }

    /// Fail if any bytes are left unread.
    pub fn finish(self, what: &str) -> Result<(), CodecError> {
        if self.remaining() != 0 {
            return Err(CodecError::malformed(format!(
                "{what}: {} trailing bytes",
                self.remaining()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_are_big_endian() {
        let mut enc = Encoder::new();
        enc.put_u16(0x0102).put_u32(0x0304_0506).put_u64(7);
        assert_eq!(
            enc.into_bytes(),
            vec![1, 2, 3, 4, 5, 6, 0, 0, 0, 0, 0, 0, 0, 7]
        );
    }

    #[test]
    fn short_read_is_malformed() {
        let mut dec = Decoder::new(&[0, 1]);
        assert!(matches!(
            dec.u32("height"),
            Err(CodecError::MalformedEncoding(_))
        ));
    }

    #[test]
    fn var_bytes_length_past_end_is_malformed() {
        let mut enc = Encoder::new();
        enc.put_u32(100).put_raw(&[1, 2, 3]);
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        assert!(dec.var_bytes("content").is_err());
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let dec = Decoder::new(&[1]);
        assert!(dec.finish("block").is_err());
    }

    #[test]
    fn expect_exact_checks_count() {
        let data = [0u8; 64];
        let dec = Decoder::new(&data);
        assert!(dec.expect_exact(1, 64, "entries").is_ok());
        assert!(dec.expect_exact(2, 64, "entries").is_err());
        assert!(dec.expect_exact(usize::MAX, 64, "entries").is_err());
    }
}
