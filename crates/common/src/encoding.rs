//! Tagged-field binary encoding helpers for persisted records
//!
//! Persisted state uses a hand-rolled encoding rather than a runtime object
//! serializer: a leading format-version byte, big-endian integers,
//! length-prefixed strings, 1-byte enum tags. These helpers keep the per-type
//! codecs short.

use thiserror::Error;

/// Encoding/decoding errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("Unexpected end of input (wanted {wanted} more bytes)")]
    UnexpectedEof { wanted: usize },

    #[error("Invalid UTF-8 in encoded string")]
    InvalidUtf8,

    #[error("Unknown {what} tag: {tag}")]
    UnknownTag { what: &'static str, tag: u8 },

    #[error("Unsupported record version: {0}")]
    UnsupportedVersion(u8),

    #[error("Invalid encoded value: {0}")]
    Invalid(String),
}

pub fn put_u8(buf: &mut Vec<u8>, v: u8) {
    buf.push(v);
}

pub fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

pub fn put_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_be_bytes());
}

pub fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    put_u32(buf, bytes.len() as u32);
    buf.extend_from_slice(bytes);
}

pub fn put_str(buf: &mut Vec<u8>, s: &str) {
    put_bytes(buf, s.as_bytes());
}

pub fn put_str_list(buf: &mut Vec<u8>, items: &[String]) {
    put_u32(buf, items.len() as u32);
    for item in items {
        put_str(buf, item);
    }
}

/// Sequential reader over an encoded buffer
pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], EncodingError> {
        if self.bytes.len() - self.pos < n {
            return Err(EncodingError::UnexpectedEof {
                wanted: n - (self.bytes.len() - self.pos),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn u8(&mut self) -> Result<u8, EncodingError> {
        Ok(self.take(1)?[0])
    }

    pub fn u32(&mut self) -> Result<u32, EncodingError> {
        let mut b = [0u8; 4];
        b.copy_from_slice(self.take(4)?);
        Ok(u32::from_be_bytes(b))
    }

    pub fn u64(&mut self) -> Result<u64, EncodingError> {
        let mut b = [0u8; 8];
        b.copy_from_slice(self.take(8)?);
        Ok(u64::from_be_bytes(b))
    }

    pub fn bytes(&mut self) -> Result<Vec<u8>, EncodingError> {
        let len = self.u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    pub fn str(&mut self) -> Result<String, EncodingError> {
        String::from_utf8(self.bytes()?).map_err(|_| EncodingError::InvalidUtf8)
    }

    pub fn str_list(&mut self) -> Result<Vec<String>, EncodingError> {
        let len = self.u32()? as usize;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(self.str()?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut buf = Vec::new();
        put_u8(&mut buf, 1);
        put_u64(&mut buf, 42);
        put_str(&mut buf, "collage.jpg");
        put_str_list(&mut buf, &["a".to_string(), "b".to_string()]);

        let mut r = Reader::new(&buf);
        assert_eq!(r.u8().unwrap(), 1);
        assert_eq!(r.u64().unwrap(), 42);
        assert_eq!(r.str().unwrap(), "collage.jpg");
        assert_eq!(r.str_list().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_truncated_input_is_an_error() {
        let mut buf = Vec::new();
        put_str(&mut buf, "collage.jpg");
        buf.truncate(buf.len() - 1);

        let mut r = Reader::new(&buf);
        assert!(matches!(r.str(), Err(EncodingError::UnexpectedEof { .. })));
    }
}
