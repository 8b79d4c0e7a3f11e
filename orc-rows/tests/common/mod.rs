//! ORC files assembled by hand.

#![allow(dead_code)]

use orc_columnar::compression::{compress_stream, Codec, CompressionStrategy};
use orc_columnar::proto::{self, ColumnEncodingKind, CompressionKind, StreamKindProto, TypeKind};
use prost::Message;

pub const BLOCK_SIZE: usize = 64 * 1024;

/// RLE v2 direct runs at 64 bits per value.
pub fn rle_unsigned(values: &[u64]) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in values.chunks(512) {
        let stored = chunk.len() - 1;
        out.push(0x40 | 31 << 1 | (stored >> 8) as u8);
        out.push(stored as u8);
        for v in chunk {
            out.extend_from_slice(&v.to_be_bytes());
        }
    }
    out
}

pub fn rle_signed(values: &[i64]) -> Vec<u8> {
    let zigzag: Vec<u64> = values
        .iter()
        .map(|&v| ((v << 1) ^ (v >> 63)) as u64)
        .collect();
    rle_unsigned(&zigzag)
}

/// Present stream for `bits`, as byte RLE literals.
pub fn present(bits: &[bool]) -> Vec<u8> {
    let packed: Vec<u8> = bits
        .chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |acc, (i, &bit)| acc | (bit as u8) << (7 - i))
        })
        .collect();

    let mut out = Vec::new();
    for chunk in packed.chunks(128) {
        out.push((chunk.len() as u8).wrapping_neg());
        out.extend_from_slice(chunk);
    }
    out
}

/// Data and Length streams of a direct string column.
pub fn strings(values: &[&str]) -> (Vec<u8>, Vec<u8>) {
    let data = values.iter().flat_map(|s| s.bytes()).collect();
    let lengths: Vec<u64> = values.iter().map(|s| s.len() as u64).collect();
    (data, rle_unsigned(&lengths))
}

pub fn struct_type(names: &[&str], children: &[u32]) -> proto::Type {
    proto::Type {
        kind: Some(TypeKind::Struct as i32),
        subtypes: children.to_vec(),
        field_names: names.iter().map(|n| n.to_string()).collect(),
        maximum_length: None,
        precision: None,
        scale: None,
    }
}

pub fn leaf_type(kind: TypeKind) -> proto::Type {
    proto::Type {
        kind: Some(kind as i32),
        ..struct_type(&[], &[])
    }
}

pub struct StripeSpec {
    pub num_rows: u64,
    pub streams: Vec<(u32, StreamKindProto, Vec<u8>)>,
}

impl StripeSpec {
    pub fn new(num_rows: u64) -> Self {
        StripeSpec {
            num_rows,
            streams: Vec::new(),
        }
    }

    pub fn stream(mut self, column: u32, kind: StreamKindProto, bytes: Vec<u8>) -> Self {
        self.streams.push((column, kind, bytes));
        self
    }
}

/// "ORC", the stripes, the footer, the postscript and its length byte.
pub fn build_file(
    types: Vec<proto::Type>,
    stripes: Vec<StripeSpec>,
    compression: CompressionKind,
) -> Vec<u8> {
    let codec = Codec::new(compression, BLOCK_SIZE).expect("codec");
    let compress = |bytes: &[u8]| {
        compress_stream(&codec, CompressionStrategy::Size, bytes).expect("compress")
    };

    let mut file = b"ORC".to_vec();
    let mut infos = Vec::new();
    let mut total_rows = 0;

    for spec in stripes {
        let offset = file.len() as u64;
        let mut streams = Vec::new();
        let mut data_length = 0u64;
        for (column, kind, raw) in &spec.streams {
            let bytes = compress(raw);
            streams.push(proto::Stream {
                kind: Some(*kind as i32),
                column: Some(*column),
                length: Some(bytes.len() as u64),
            });
            data_length += bytes.len() as u64;
            file.extend_from_slice(&bytes);
        }

        let columns = types
            .iter()
            .map(|_| proto::ColumnEncoding {
                kind: Some(ColumnEncodingKind::DirectV2 as i32),
                dictionary_size: None,
            })
            .collect();
        let footer = compress(
            &proto::StripeFooter {
                streams,
                columns,
                writer_timezone: None,
            }
            .encode_to_vec(),
        );
        file.extend_from_slice(&footer);

        infos.push(proto::StripeInformation {
            offset: Some(offset),
            index_length: Some(0),
            data_length: Some(data_length),
            footer_length: Some(footer.len() as u64),
            number_of_rows: Some(spec.num_rows),
        });
        total_rows += spec.num_rows;
    }

    let footer = compress(
        &proto::Footer {
            header_length: Some(3),
            content_length: Some(file.len() as u64 - 3),
            stripes: infos,
            types,
            number_of_rows: Some(total_rows),
            row_index_stride: None,
        }
        .encode_to_vec(),
    );
    file.extend_from_slice(&footer);

    let postscript = proto::PostScript {
        footer_length: Some(footer.len() as u64),
        compression: Some(compression as i32),
        compression_block_size: Some(BLOCK_SIZE as u64),
        version: vec![0, 12],
        metadata_length: Some(0),
        writer_version: Some(9),
        magic: Some("ORC".to_string()),
    }
    .encode_to_vec();
    file.extend_from_slice(&postscript);
    file.push(postscript.len() as u8);
    file
}
