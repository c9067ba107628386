//! Jute record encoding as spoken on the ZooKeeper wire.
//!
//! Every integer is big-endian. Buffers and strings are prefixed with an
//! `i32` length where `-1` encodes a null value, which is how the server
//! distinguishes an absent payload from an empty one.

use snafu::{Snafu, ensure};

/// Length of the big-endian frame prefix preceding every packet.
pub const FRAME_HEADER_LEN: usize = 4;

#[derive(Debug, Default)]
pub struct JuteWriter {
    buf: Vec<u8>,
}

impl JuteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_i32(&mut self, value: i32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn write_i64(&mut self, value: i64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        self.buf.push(u8::from(value));
        self
    }

    /// Writes a length-prefixed buffer. Callers bound the length to the
    /// protocol's payload limit before encoding.
    pub fn write_buffer(&mut self, value: Option<&[u8]>) -> &mut Self {
        match value {
            Some(bytes) => {
                self.write_i32(bytes.len() as i32);
                self.buf.extend_from_slice(bytes);
            }
            None => {
                self.write_i32(-1);
            }
        }
        self
    }

    pub fn write_str(&mut self, value: &str) -> &mut Self {
        self.write_buffer(Some(value.as_bytes()))
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Consumes the writer and prepends the frame length.
    pub fn into_frame(self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + self.buf.len());
        frame.extend_from_slice(&(self.buf.len() as i32).to_be_bytes());
        frame.extend_from_slice(&self.buf);
        frame
    }
}

pub struct JuteReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> JuteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.bytes[self.position..]
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], DecodeError> {
        let remaining = self.bytes.len() - self.position;
        ensure!(
            remaining >= needed,
            UnexpectedEndSnafu {
                needed,
                remaining
            }
        );
        let slice = &self.bytes[self.position..self.position + needed];
        self.position += needed;
        Ok(slice)
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(i32::from_be_bytes(raw))
    }

    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(i64::from_be_bytes(raw))
    }

    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        Ok(self.take(1)?[0] != 0)
    }

    pub fn read_buffer(&mut self) -> Result<Option<Vec<u8>>, DecodeError> {
        let length = self.read_i32()?;
        if length == -1 {
            return Ok(None);
        }
        ensure!(length >= 0, NegativeLengthSnafu { length });
        Ok(Some(self.take(length as usize)?.to_vec()))
    }

    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let bytes = self.read_buffer()?.unwrap_or_default();
        String::from_utf8(bytes).map_err(|source| DecodeError::InvalidUtf8 { source })
    }

    /// Reads a vector of strings; a null vector decodes as empty.
    pub fn read_string_vec(&mut self) -> Result<Vec<String>, DecodeError> {
        let count = self.read_i32()?;
        if count == -1 {
            return Ok(Vec::new());
        }
        ensure!(count >= 0, NegativeLengthSnafu { length: count });
        (0..count).map(|_| self.read_string()).collect()
    }
}

#[derive(Debug, Snafu)]
pub enum DecodeError {
    #[snafu(display("Needed {} more bytes but only {} remain", needed, remaining))]
    UnexpectedEnd { needed: usize, remaining: usize },
    #[snafu(display("Invalid negative length {}", length))]
    NegativeLength { length: i32 },
    #[snafu(display("String is not valid UTF-8"))]
    InvalidUtf8 { source: std::string::FromUtf8Error },
}
