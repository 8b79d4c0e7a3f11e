use super::ByteSource;
use crate::error::Result;
use std::io::Read;

/// Unpack `count` values of `bit_width` bits each, packed most significant bit first.
///
/// Packing restarts on a byte boundary: bits left over in the last byte belong to
/// nobody and are dropped.
pub(crate) fn unpack<R: Read>(
    source: &mut ByteSource<R>,
    bit_width: usize,
    count: usize,
    out: &mut Vec<u64>,
) -> Result<()> {
    out.reserve(count);

    let mut current = 0u64;
    let mut bits_left = 0usize;

    for _ in 0..count {
        let mut value = 0u64;
        let mut needed = bit_width;

        while needed > 0 {
            if bits_left == 0 {
                current = source.require_byte("a bit-packed run")? as u64;
                bits_left = 8;
            }

            let take = needed.min(bits_left);
            let shift = bits_left - take;
            let bits = (current >> shift) & ((1u64 << take) - 1);

            value = (value << take) | bits;
            bits_left -= take;
            needed -= take;
        }

        out.push(value);
    }

    Ok(())
}

/// Map the 5-bit width code of an RLE v2 header to a bit width.
pub(crate) fn decode_bit_width(code: u8) -> usize {
    match code & 0x1f {
        code @ 0..=23 => code as usize + 1,
        24 => 26,
        25 => 28,
        26 => 30,
        27 => 32,
        28 => 40,
        29 => 48,
        30 => 56,
        _ => 64,
    }
}

/// Round a bit count up to the nearest width RLE v2 can pack.
pub(crate) fn closest_fixed_bits(bits: usize) -> usize {
    match bits {
        0 => 1,
        1..=24 => bits,
        25..=26 => 26,
        27..=28 => 28,
        29..=30 => 30,
        31..=32 => 32,
        33..=40 => 40,
        41..=48 => 48,
        49..=56 => 56,
        _ => 64,
    }
}
