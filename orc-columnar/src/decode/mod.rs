pub mod bit_unpack;
pub mod byte_rle;
pub mod dictionary;
pub mod present;
pub mod rle_v2;

pub use byte_rle::{BooleanReader, ByteRleReader};
pub use dictionary::StringDictionary;
pub use present::read_present;
pub use rle_v2::RleV2Reader;

use crate::error::{Error, Result};
use std::io::{ErrorKind, Read};

/// Byte-at-a-time view over a decompressed stream.
pub(crate) struct ByteSource<R> {
    inner: R,
}

impl<R: Read> ByteSource<R> {
    pub(crate) fn new(inner: R) -> Self {
        ByteSource { inner }
    }

    /// Next byte, or `None` once the stream is exhausted.
    pub(crate) fn next_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }
    }

    /// Next byte of a run that has already started; running out is a decode error.
    pub(crate) fn require_byte(&mut self, context: &str) -> Result<u8> {
        self.next_byte()?.ok_or_else(|| {
            Error::RunLengthDecode(format!("stream ended inside {}", context))
        })
    }

    /// Big-endian unsigned integer of `width` bytes (1 to 8).
    pub(crate) fn read_be(&mut self, width: usize, context: &str) -> Result<u64> {
        let mut value = 0u64;
        for _ in 0..width {
            value = (value << 8) | self.require_byte(context)? as u64;
        }
        Ok(value)
    }

    /// Base-128 varint, least significant group first.
    pub(crate) fn read_varint(&mut self, context: &str) -> Result<u64> {
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.require_byte(context)?;
            if shift >= 64 {
                return Err(Error::RunLengthDecode(format!(
                    "varint longer than 64 bits in {}",
                    context
                )));
            }
            value |= ((byte & 0x7f) as u64) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    /// Varint of up to 128 bits, or `None` when the stream ends before it starts.
    pub(crate) fn next_varint_u128(&mut self, context: &str) -> Result<Option<u128>> {
        let mut byte = match self.next_byte()? {
            Some(byte) => byte,
            None => return Ok(None),
        };

        let mut value = 0u128;
        let mut shift = 0u32;
        loop {
            if shift >= 128 {
                return Err(Error::RunLengthDecode(format!(
                    "varint longer than 128 bits in {}",
                    context
                )));
            }
            value |= ((byte & 0x7f) as u128) << shift;
            if byte & 0x80 == 0 {
                return Ok(Some(value));
            }
            shift += 7;
            byte = self.require_byte(context)?;
        }
    }
}

pub(crate) fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

pub(crate) fn zigzag_decode_i128(value: u128) -> i128 {
    ((value >> 1) as i128) ^ -((value & 1) as i128)
}
