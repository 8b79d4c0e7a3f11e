//! Byte run-length decoding and the boolean streams built on it.

use super::ByteSource;
use crate::error::Result;
use std::io::Read;

const MIN_REPEAT: usize = 3;

/// Decodes ORC byte RLE: a control byte below 128 starts a run of
/// `control + 3` copies of the next byte, anything else is followed by
/// `256 - control` literal bytes.
pub struct ByteRleReader<R> {
    source: ByteSource<R>,
    literals: Vec<u8>,
    position: usize,
    failed: bool,
}

impl<R: Read> ByteRleReader<R> {
    pub fn new(source: R) -> Self {
        ByteRleReader {
            source: ByteSource::new(source),
            literals: Vec::new(),
            position: 0,
            failed: false,
        }
    }

    fn read_run(&mut self) -> Result<bool> {
        let control = match self.source.next_byte()? {
            Some(control) => control,
            None => return Ok(false),
        };

        self.literals.clear();
        self.position = 0;

        if control < 0x80 {
            let value = self.source.require_byte("a byte repeat run")?;
            self.literals.resize(control as usize + MIN_REPEAT, value);
        } else {
            let count = 0x100 - control as usize;
            for _ in 0..count {
                let byte = self.source.require_byte("a byte literal run")?;
                self.literals.push(byte);
            }
        }

        Ok(true)
    }
}

impl<R: Read> Iterator for ByteRleReader<R> {
    type Item = Result<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        if self.position == self.literals.len() {
            match self.read_run() {
                Ok(true) => {}
                Ok(false) => return None,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }

        let byte = self.literals[self.position];
        self.position += 1;
        Some(Ok(byte))
    }
}

/// Bits of a byte RLE stream, most significant bit of each byte first.
///
/// Trailing bits of the final byte are yielded too; callers stop after the
/// number of values they expect.
pub struct BooleanReader<R> {
    bytes: ByteRleReader<R>,
    current: u8,
    bits_left: u8,
}

impl<R: Read> BooleanReader<R> {
    pub fn new(source: R) -> Self {
        BooleanReader {
            bytes: ByteRleReader::new(source),
            current: 0,
            bits_left: 0,
        }
    }
}

impl<R: Read> Iterator for BooleanReader<R> {
    type Item = Result<bool>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.bits_left == 0 {
            match self.bytes.next()? {
                Ok(byte) => {
                    self.current = byte;
                    self.bits_left = 8;
                }
                Err(e) => return Some(Err(e)),
            }
        }

        self.bits_left -= 1;
        Some(Ok((self.current >> self.bits_left) & 1 == 1))
    }
}
