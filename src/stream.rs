//! Order-strict binary primitives used by the gateway and metadata codecs.
//!
//! Fixed-width integers are big-endian. Variable-width integers use 7 bits per
//! byte with the high bit as a continuation flag. Strings are a variable-width
//! byte length followed by UTF-8 bytes.

use crate::core::{ClusterError, Result};

/// Append-only output buffer.
#[derive(Debug, Default)]
pub struct StreamOutput {
    buf: Vec<u8>,
}

impl StreamOutput {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_vint(&mut self, value: u32) {
        let mut value = value;
        while value >= 0x80 {
            self.buf.push((value as u8) | 0x80);
            value >>= 7;
        }
        self.buf.push(value as u8);
    }

    /// Writes a version as a signed 64-bit value. Versions above `i64::MAX`
    /// have no binary form and are rejected rather than wrapped.
    pub fn write_version(&mut self, version: u64, what: &str) -> Result<()> {
        let raw = i64::try_from(version).map_err(|_| {
            ClusterError::MalformedState(format!(
                "{} {} does not fit in a signed 64-bit field",
                what, version
            ))
        })?;
        self.write_i64(raw);
        Ok(())
    }

    pub fn write_string(&mut self, value: &str) {
        self.write_vint(value.len() as u32);
        self.buf.extend_from_slice(value.as_bytes());
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

/// Cursor over an encoded buffer. Every read fails with
/// [`ClusterError::MalformedState`] instead of panicking on short input.
#[derive(Debug)]
pub struct StreamInput<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> StreamInput<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(ClusterError::MalformedState(format!(
                "truncated stream reading {} at offset {}: need {} bytes, {} left",
                what,
                self.pos,
                len,
                self.remaining()
            )));
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let bytes = self.take(8, "i64")?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(i64::from_be_bytes(raw))
    }

    /// Reads a version written by [`StreamOutput::write_version`].
    pub fn read_version(&mut self, what: &str) -> Result<u64> {
        let raw = self.read_i64()?;
        u64::try_from(raw)
            .map_err(|_| ClusterError::MalformedState(format!("negative {}: {}", what, raw)))
    }

    pub fn read_vint(&mut self) -> Result<u32> {
        let mut value = 0u32;
        let mut shift = 0u32;
        loop {
            let byte = self.take(1, "vint")?[0];
            let chunk = (byte & 0x7f) as u32;
            if shift == 28 && chunk > 0x0f {
                return Err(ClusterError::MalformedState(
                    "vint overflows 32 bits".to_string(),
                ));
            }
            value |= chunk << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
            if shift > 28 {
                return Err(ClusterError::MalformedState(
                    "vint longer than 5 bytes".to_string(),
                ));
            }
        }
    }

    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_vint()? as usize;
        let bytes = self.take(len, "string")?;
        String::from_utf8(bytes.to_vec())
            .map_err(|err| ClusterError::MalformedState(format!("invalid utf-8 string: {}", err)))
    }
}
