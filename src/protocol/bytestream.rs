//! Cursor-based big-endian byte stream codec
//!
//! Reads and writes integers in network byte order, length-prefixed and
//! NUL-terminated strings, and doubles encoded as decimal text. Reading past
//! the end of the buffer is an error, never a panic or an out-of-bounds
//! access.
//!
//! A stream is owned by a single worker; it is not synchronized.

use crate::error::{Error, Result};

/// Growable byte buffer with a read cursor
#[derive(Debug, Clone, Default)]
pub struct ByteStream {
    buf: Vec<u8>,
    cursor: usize,
}

impl ByteStream {
    /// Create an empty stream for writing
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing buffer for reading, cursor at the start
    pub fn from_vec(buf: Vec<u8>) -> Self {
        Self { buf, cursor: 0 }
    }

    /// Copy a slice into a new stream for reading
    pub fn from_slice(data: &[u8]) -> Self {
        Self::from_vec(data.to_vec())
    }

    /// Total bytes in the buffer
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes left between the cursor and the end
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.cursor
    }

    /// Full buffer contents, independent of the cursor
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the stream, returning the buffer
    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    /// Consume `n` bytes at the cursor, or fail without moving it
    fn take(&mut self, n: usize) -> Result<&[u8]> {
        if self.remaining() < n {
            return Err(Error::Truncated {
                needed: n,
                available: self.remaining(),
            });
        }
        let out = &self.buf[self.cursor..self.cursor + n];
        self.cursor += n;
        Ok(out)
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn get_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn get_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn get_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn get_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        Ok(u64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    /// Write a 2-byte length prefix followed by the raw bytes, no terminator
    pub fn put_len_string(&mut self, s: &str) {
        self.put_u16(s.len() as u16);
        self.buf.extend_from_slice(s.as_bytes());
    }

    /// Read a length-prefixed string; the full declared length must be present
    pub fn get_len_string(&mut self) -> Result<String> {
        let len = self.get_u16()? as usize;
        let bytes = self.take(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Write the bytes of `s` followed by a single NUL
    pub fn put_null_term_string(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
    }

    /// Read bytes until a NUL or the end of the buffer
    ///
    /// A missing terminator at end-of-buffer is tolerated; whatever was read
    /// is returned.
    pub fn get_null_term_string(&mut self) -> String {
        let mut out = Vec::new();
        while self.cursor < self.buf.len() {
            let b = self.buf[self.cursor];
            self.cursor += 1;
            if b == 0 {
                break;
            }
            out.push(b);
        }
        String::from_utf8_lossy(&out).into_owned()
    }

    /// Write a double as fixed six-decimal text in a length-prefixed string
    ///
    /// This matches the text rendering the controller-side parser was built
    /// against; it is not an IEEE-754 binary encoding.
    pub fn put_double(&mut self, v: f64) {
        self.put_len_string(&format!("{:.6}", v));
    }

    /// Read a text-encoded double
    ///
    /// Older senders counted the string's NUL terminator inside the length
    /// prefix; trailing NULs are stripped before parsing so both generations
    /// of peers decode.
    pub fn get_double(&mut self) -> Result<f64> {
        let s = self.get_len_string()?;
        let trimmed = s.trim_end_matches('\0');
        trimmed
            .parse::<f64>()
            .map_err(|_| Error::InvalidPacket(format!("bad decimal field: {:?}", trimmed)))
    }
}
