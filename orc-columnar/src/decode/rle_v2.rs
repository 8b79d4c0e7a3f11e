//! Integer run-length decoding, version 2.
//!
//! A stream is a concatenation of runs. The top two bits of each run header
//! select the sub-encoding: short repeat, direct, patched base or delta.

use super::bit_unpack::{closest_fixed_bits, decode_bit_width, unpack};
use super::{zigzag_decode, ByteSource};
use crate::error::{Error, Result};
use std::io::Read;

const SHORT_REPEAT: u8 = 0;
const DIRECT: u8 = 1;
const PATCHED_BASE: u8 = 2;
const DELTA: u8 = 3;

/// Lazily decodes a run-length encoded integer stream.
///
/// `signed` selects zig-zag decoding for short repeat, direct and delta runs.
/// Values of unsigned streams are returned bit-for-bit as `i64`.
pub struct RleV2Reader<R> {
    source: ByteSource<R>,
    signed: bool,
    literals: Vec<i64>,
    position: usize,
    failed: bool,
}

impl<R: Read> RleV2Reader<R> {
    pub fn new(source: R, signed: bool) -> Self {
        RleV2Reader {
            source: ByteSource::new(source),
            signed,
            literals: Vec::new(),
            position: 0,
            failed: false,
        }
    }

    /// Decode the next run into `literals`. Returns false at a clean end of stream.
    fn read_run(&mut self) -> Result<bool> {
        let header = match self.source.next_byte()? {
            Some(header) => header,
            None => return Ok(false),
        };

        self.literals.clear();
        self.position = 0;

        match header >> 6 {
            SHORT_REPEAT => self.read_short_repeat(header)?,
            DIRECT => self.read_direct(header)?,
            PATCHED_BASE => self.read_patched_base(header)?,
            DELTA => self.read_delta(header)?,
            _ => unreachable!("two-bit encoding tag"),
        }

        Ok(true)
    }

    fn decode_value(&self, raw: u64) -> i64 {
        if self.signed {
            zigzag_decode(raw)
        } else {
            raw as i64
        }
    }

    fn read_short_repeat(&mut self, header: u8) -> Result<()> {
        let width = ((header >> 3) & 0x07) as usize + 1;
        let count = (header & 0x07) as usize + 3;

        let raw = self.source.read_be(width, "a short repeat run")?;
        let value = self.decode_value(raw);
        self.literals.resize(count, value);
        Ok(())
    }

    fn read_direct(&mut self, header: u8) -> Result<()> {
        let width = decode_bit_width(header >> 1);
        let length = self.read_length(header, "a direct run")?;

        let mut unpacked = Vec::with_capacity(length);
        unpack(&mut self.source, width, length, &mut unpacked)?;

        for raw in unpacked {
            let value = self.decode_value(raw);
            self.literals.push(value);
        }
        Ok(())
    }

    fn read_patched_base(&mut self, header: u8) -> Result<()> {
        const CONTEXT: &str = "a patched base run";

        let width = decode_bit_width(header >> 1);
        let length = self.read_length(header, CONTEXT)?;

        let third = self.source.require_byte(CONTEXT)?;
        let base_width = ((third >> 5) & 0x07) as usize + 1;
        let patch_width = decode_bit_width(third);

        let fourth = self.source.require_byte(CONTEXT)?;
        let gap_width = ((fourth >> 5) & 0x07) as usize + 1;
        let patch_count = (fourth & 0x1f) as usize;

        if gap_width + patch_width > 64 {
            return Err(Error::RunLengthDecode(format!(
                "patch gap width {} plus patch width {} exceeds 64 bits",
                gap_width, patch_width
            )));
        }

        // Base is sign-magnitude: the top bit of its widest byte is the sign
        let raw_base = self.source.read_be(base_width, CONTEXT)?;
        let sign_mask = 1u64 << (base_width * 8 - 1);
        let base = if raw_base & sign_mask != 0 {
            -((raw_base & !sign_mask) as i64)
        } else {
            raw_base as i64
        };

        let mut values = Vec::with_capacity(length);
        unpack(&mut self.source, width, length, &mut values)?;

        let mut patches = Vec::with_capacity(patch_count);
        unpack(
            &mut self.source,
            closest_fixed_bits(gap_width + patch_width),
            patch_count,
            &mut patches,
        )?;

        let patch_mask = (1u64 << patch_width) - 1;
        let mut target = 0usize;
        for entry in patches {
            let gap = (entry >> patch_width) as usize;
            let patch = entry & patch_mask;
            target += gap;

            // A maximal gap with an empty patch only extends the distance to the next patch
            if gap == 255 && patch == 0 {
                continue;
            }

            let slot = values.get_mut(target).ok_or_else(|| {
                Error::RunLengthDecode(format!(
                    "patch at index {} beyond run of {} values",
                    target, length
                ))
            })?;
            *slot |= patch.checked_shl(width as u32).unwrap_or(0);
        }

        self.literals
            .extend(values.into_iter().map(|v| base.wrapping_add(v as i64)));
        Ok(())
    }

    fn read_delta(&mut self, header: u8) -> Result<()> {
        const CONTEXT: &str = "a delta run";

        let code = (header >> 1) & 0x1f;
        let width = if code == 0 { 0 } else { decode_bit_width(code) };
        let length = self.read_length(header, CONTEXT)?;

        let raw_first = self.source.read_varint(CONTEXT)?;
        let first = self.decode_value(raw_first);
        let delta_base = zigzag_decode(self.source.read_varint(CONTEXT)?);

        self.literals.push(first);
        if length == 1 {
            return Ok(());
        }

        let mut previous = first;
        if width == 0 {
            for _ in 1..length {
                previous = previous.wrapping_add(delta_base);
                self.literals.push(previous);
            }
            return Ok(());
        }

        previous = previous.wrapping_add(delta_base);
        self.literals.push(previous);

        let mut deltas = Vec::with_capacity(length.saturating_sub(2));
        unpack(&mut self.source, width, length.saturating_sub(2), &mut deltas)?;

        for delta in deltas {
            previous = if delta_base < 0 {
                previous.wrapping_sub(delta as i64)
            } else {
                previous.wrapping_add(delta as i64)
            };
            self.literals.push(previous);
        }
        Ok(())
    }

    /// 9-bit run length spread over the header's low bit and the following byte.
    fn read_length(&mut self, header: u8, context: &str) -> Result<usize> {
        let low = self.source.require_byte(context)?;
        Ok((((header & 0x01) as usize) << 8 | low as usize) + 1)
    }
}

impl<R: Read> Iterator for RleV2Reader<R> {
    type Item = Result<i64>;

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

        let value = self.literals[self.position];
        self.position += 1;
        Some(Ok(value))
    }
}
