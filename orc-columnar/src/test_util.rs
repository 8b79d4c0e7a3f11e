//! Stream encoders and stripe fixtures for unit tests.

use crate::compression::{compress_stream, Codec, CompressionStrategy};
use crate::decode::bit_unpack::closest_fixed_bits;
use crate::metadata::{ColumnKind, ColumnType, FileMetadata, StripeInfo};
use crate::proto::{self, ColumnEncodingKind, CompressionKind, StreamKindProto};
use crate::stripe::{StreamKind, Stripe};
use prost::Message;
use std::sync::Arc;

pub(crate) fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

fn bits_needed(value: u64) -> usize {
    (64 - value.leading_zeros() as usize).max(1)
}

fn width_code(width: usize) -> u8 {
    match width {
        1..=24 => (width - 1) as u8,
        26 => 24,
        28 => 25,
        30 => 26,
        32 => 27,
        40 => 28,
        48 => 29,
        56 => 30,
        64 => 31,
        _ => panic!("width {} cannot be encoded", width),
    }
}

fn pack(values: &[u64], width: usize, out: &mut Vec<u8>) {
    let mut current = 0u8;
    let mut used = 0usize;

    for &value in values {
        for bit in (0..width).rev() {
            current = (current << 1) | ((value >> bit) & 1) as u8;
            used += 1;
            if used == 8 {
                out.push(current);
                current = 0;
                used = 0;
            }
        }
    }

    if used > 0 {
        out.push(current << (8 - used));
    }
}

fn push_varint(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// One short repeat run of an already zig-zagged (or unsigned) value.
pub(crate) fn encode_short_repeat(raw: u64, count: usize) -> Vec<u8> {
    assert!((3..=10).contains(&count));
    let width = bits_needed(raw).div_ceil(8);

    let mut out = vec![((width - 1) << 3 | (count - 3)) as u8];
    out.extend_from_slice(&raw.to_be_bytes()[8 - width..]);
    out
}

/// Direct runs of up to 512 values each.
pub(crate) fn encode_direct(raw: &[u64]) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in raw.chunks(512) {
        let width = closest_fixed_bits(chunk.iter().map(|&v| bits_needed(v)).max().unwrap_or(1));
        let length = chunk.len() - 1;

        out.push(0x40 | width_code(width) << 1 | (length >> 8) as u8);
        out.push(length as u8);
        pack(chunk, width, &mut out);
    }
    out
}

/// One delta run. `width` 0 writes a fixed-delta run of `length` values.
pub(crate) fn encode_delta(
    first_raw: u64,
    delta_base: i64,
    width: usize,
    deltas: &[u64],
    length: usize,
) -> Vec<u8> {
    let code = if width == 0 { 0 } else { width_code(width) };
    let stored = length - 1;

    let mut out = vec![0xc0 | code << 1 | (stored >> 8) as u8, stored as u8];
    push_varint(first_raw, &mut out);
    push_varint(zigzag_encode(delta_base), &mut out);
    if width > 0 {
        assert_eq!(deltas.len(), length - 2);
        pack(deltas, width, &mut out);
    }
    out
}

/// One patched base run. `patches` holds (gap from previous patch, patch bits) pairs;
/// gaps above 255 are split into extension entries.
pub(crate) fn encode_patched_base(
    base: i64,
    width: usize,
    values: &[u64],
    patch_width: usize,
    patches: &[(usize, u64)],
) -> Vec<u8> {
    let mut entries = Vec::new();
    for &(gap, patch) in patches {
        let mut gap = gap;
        while gap > 255 {
            entries.push((255u64, 0u64));
            gap -= 255;
        }
        entries.push((gap as u64, patch));
    }

    let gap_width = entries
        .iter()
        .map(|&(gap, _)| bits_needed(gap))
        .max()
        .unwrap_or(1);
    let magnitude = base.unsigned_abs();
    let base_width = (1..=8)
        .find(|w| magnitude < 1u64 << (8 * w - 1))
        .expect("base fits in 8 bytes");
    let encoded_base = if base < 0 {
        magnitude | 1 << (8 * base_width - 1)
    } else {
        magnitude
    };
    let stored = values.len() - 1;

    let mut out = vec![
        0x80 | width_code(width) << 1 | (stored >> 8) as u8,
        stored as u8,
        ((base_width - 1) << 5) as u8 | width_code(patch_width),
        ((gap_width - 1) << 5) as u8 | entries.len() as u8,
    ];
    out.extend_from_slice(&encoded_base.to_be_bytes()[8 - base_width..]);
    pack(values, width, &mut out);

    let packed_entries: Vec<u64> = entries
        .iter()
        .map(|&(gap, patch)| gap << patch_width | patch)
        .collect();
    pack(
        &packed_entries,
        closest_fixed_bits(gap_width + patch_width),
        &mut out,
    );
    out
}

/// Byte RLE using literal runs only.
pub(crate) fn encode_byte_literals(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in bytes.chunks(128) {
        out.push((chunk.len() as u8).wrapping_neg());
        out.extend_from_slice(chunk);
    }
    out
}

/// Byte RLE repeat run of `count` (3 to 130) copies.
pub(crate) fn encode_byte_repeat(value: u8, count: usize) -> Vec<u8> {
    assert!((3..=130).contains(&count));
    vec![(count - 3) as u8, value]
}

/// Boolean stream: bits packed most significant first, then byte RLE.
pub(crate) fn encode_booleans(bits: &[bool]) -> Vec<u8> {
    let bytes: Vec<u8> = bits
        .chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |acc, (i, &bit)| acc | (bit as u8) << (7 - i))
        })
        .collect();
    encode_byte_literals(&bytes)
}

/// Unsigned integer stream (lengths, dictionary ids).
pub(crate) fn encode_unsigned(values: &[u64]) -> Vec<u8> {
    encode_direct(values)
}

/// Signed integer stream.
pub(crate) fn encode_signed(values: &[i64]) -> Vec<u8> {
    let raw: Vec<u64> = values.iter().map(|&v| zigzag_encode(v)).collect();
    encode_direct(&raw)
}

pub(crate) fn column_type(kind: ColumnKind, children: &[u32], names: &[&str]) -> ColumnType {
    ColumnType {
        kind,
        field_names: names.iter().map(|n| n.to_string()).collect(),
        sub_type_ids: children.to_vec(),
        maximum_length: None,
        precision: None,
        scale: None,
    }
}

fn stream_kind_proto(kind: StreamKind) -> StreamKindProto {
    match kind {
        StreamKind::Present => StreamKindProto::Present,
        StreamKind::Data => StreamKindProto::Data,
        StreamKind::Length => StreamKindProto::Length,
        StreamKind::DictionaryData => StreamKindProto::DictionaryData,
        StreamKind::DictionaryCount => StreamKindProto::DictionaryCount,
        StreamKind::Secondary => StreamKindProto::Secondary,
        StreamKind::RowIndex => StreamKindProto::RowIndex,
        StreamKind::BloomFilter => StreamKindProto::BloomFilter,
        StreamKind::BloomFilterUtf8 => StreamKindProto::BloomFilterUtf8,
    }
}

/// Assembles a single in-memory stripe from raw (uncompressed) streams.
pub(crate) struct StripeBuilder {
    types: Vec<ColumnType>,
    num_rows: u64,
    compression: CompressionKind,
    streams: Vec<(u32, StreamKind, Vec<u8>)>,
    encodings: Vec<(ColumnEncodingKind, Option<u32>)>,
}

impl StripeBuilder {
    pub(crate) fn new(types: Vec<ColumnType>, num_rows: usize) -> Self {
        let encodings = vec![(ColumnEncodingKind::DirectV2, None); types.len()];
        StripeBuilder {
            types,
            num_rows: num_rows as u64,
            compression: CompressionKind::None,
            streams: Vec::new(),
            encodings,
        }
    }

    /// Root struct with one child column 1 of `kind`.
    pub(crate) fn single(kind: ColumnKind, num_rows: usize) -> Self {
        Self::new(
            vec![
                column_type(ColumnKind::Struct, &[1], &["value"]),
                column_type(kind, &[], &[]),
            ],
            num_rows,
        )
    }

    pub(crate) fn strings(num_rows: usize) -> Self {
        Self::single(ColumnKind::String, num_rows)
    }

    pub(crate) fn codec(mut self, compression: CompressionKind) -> Self {
        self.compression = compression;
        self
    }

    pub(crate) fn stream(mut self, column: u32, kind: StreamKind, bytes: Vec<u8>) -> Self {
        self.streams.push((column, kind, bytes));
        self
    }

    pub(crate) fn encoding(
        mut self,
        column: u32,
        kind: ColumnEncodingKind,
        dictionary_size: Option<u32>,
    ) -> Self {
        self.encodings[column as usize] = (kind, dictionary_size);
        self
    }

    pub(crate) fn dictionary(self, column: u32, size: u32) -> Self {
        self.encoding(column, ColumnEncodingKind::DictionaryV2, Some(size))
    }

    pub(crate) fn build(self) -> Stripe {
        let codec = Codec::new(self.compression, 1024).unwrap();
        let compress = |bytes: &[u8]| compress_stream(&codec, CompressionStrategy::Speed, bytes).unwrap();

        let mut bytes = Vec::new();
        let mut streams = Vec::new();
        for (column, kind, raw) in &self.streams {
            let compressed = compress(raw);
            streams.push(proto::Stream {
                kind: Some(stream_kind_proto(*kind) as i32),
                column: Some(*column),
                length: Some(compressed.len() as u64),
            });
            bytes.extend_from_slice(&compressed);
        }
        let data_length = bytes.len() as u64;

        let footer = proto::StripeFooter {
            streams,
            columns: self
                .encodings
                .iter()
                .map(|&(kind, dictionary_size)| proto::ColumnEncoding {
                    kind: Some(kind as i32),
                    dictionary_size,
                })
                .collect(),
            writer_timezone: Some("UTC".to_string()),
        };
        let footer_bytes = compress(&footer.encode_to_vec());
        bytes.extend_from_slice(&footer_bytes);

        let info = StripeInfo {
            offset: 0,
            index_length: 0,
            data_length,
            footer_length: footer_bytes.len() as u64,
            num_rows: self.num_rows,
        };
        let metadata = FileMetadata {
            codec,
            version: vec![0, 12],
            writer_version: None,
            num_rows: self.num_rows,
            row_index_stride: None,
            types: self.types,
            stripes: vec![info],
        };

        Stripe::new(Arc::new(metadata), info, bytes).unwrap()
    }
}
