use crate::column::{ColumnDecoder, ColumnValues, Shape};
use crate::compression::decompress_stream;
use crate::error::{Error, Result};
use crate::metadata::{read_at, ColumnType, FileMetadata, StripeInfo};
use crate::proto::{self, ColumnEncodingKind, StreamKindProto};
use log::{debug, trace};
use prost::Message;
use std::collections::HashMap;
use std::io::{Read, Seek};
use std::ops::Range;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Present,
    Data,
    Length,
    DictionaryData,
    DictionaryCount,
    Secondary,
    RowIndex,
    BloomFilter,
    BloomFilterUtf8,
}

impl From<StreamKindProto> for StreamKind {
    fn from(kind: StreamKindProto) -> Self {
        match kind {
            StreamKindProto::Present => StreamKind::Present,
            StreamKindProto::Data => StreamKind::Data,
            StreamKindProto::Length => StreamKind::Length,
            StreamKindProto::DictionaryData => StreamKind::DictionaryData,
            StreamKindProto::DictionaryCount => StreamKind::DictionaryCount,
            StreamKindProto::Secondary => StreamKind::Secondary,
            StreamKindProto::RowIndex => StreamKind::RowIndex,
            StreamKindProto::BloomFilter => StreamKind::BloomFilter,
            StreamKindProto::BloomFilterUtf8 => StreamKind::BloomFilterUtf8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnEncoding {
    pub kind: ColumnEncodingKind,
    pub dictionary_size: Option<u32>,
}

/// Where each stream of a stripe lives, keyed by (column id, stream kind).
#[derive(Debug, Clone, Default)]
pub struct StreamDirectory {
    /// Byte ranges relative to the start of the stripe.
    pub streams: HashMap<(u32, StreamKind), Range<usize>>,
}

impl StreamDirectory {
    /// Lay the footer's streams out back to back from the stripe start.
    ///
    /// Kinds this reader does not know still take up space and are skipped.
    pub fn build(streams: &[proto::Stream], region_len: usize) -> Result<Self> {
        let mut directory = HashMap::new();
        let mut offset = 0usize;

        for stream in streams {
            let length = usize::try_from(stream.length()).map_err(|_| {
                Error::MalformedFooter(format!("stream length {} too large", stream.length()))
            })?;
            let end = offset
                .checked_add(length)
                .filter(|&end| end <= region_len)
                .ok_or_else(|| {
                    Error::MalformedFooter(format!(
                        "stream of column {} at offset {} with {} bytes overruns {} byte stripe",
                        stream.column(),
                        offset,
                        length,
                        region_len
                    ))
                })?;

            if let Some(kind) = stream
                .kind
                .and_then(|raw| StreamKindProto::try_from(raw).ok())
            {
                let key = (stream.column(), StreamKind::from(kind));
                if directory.insert(key, offset..end).is_some() {
                    return Err(Error::MalformedFooter(format!(
                        "duplicate {:?} stream for column {}",
                        key.1, key.0
                    )));
                }
            }

            offset = end;
        }

        Ok(StreamDirectory { streams: directory })
    }

    pub fn get(&self, column: u32, kind: StreamKind) -> Option<&Range<usize>> {
        self.streams.get(&(column, kind))
    }
}

/// One stripe, read in full. Streams are decompressed on request.
pub struct Stripe {
    metadata: Arc<FileMetadata>,
    info: StripeInfo,
    bytes: Vec<u8>,
    directory: StreamDirectory,
    encodings: Vec<ColumnEncoding>,
    writer_timezone: Option<String>,
}

impl Stripe {
    /// Read stripe `index` of the file described by `metadata`.
    pub fn load<R: Read + Seek>(
        source: &mut R,
        metadata: Arc<FileMetadata>,
        index: usize,
    ) -> Result<Self> {
        let info = *metadata.stripes.get(index).ok_or_else(|| {
            Error::InvalidFormat(format!(
                "stripe {} out of range ({} stripes)",
                index,
                metadata.stripes.len()
            ))
        })?;

        let length = usize::try_from(info.total_length()).map_err(|_| {
            Error::MalformedFooter(format!("stripe {} is too large", index))
        })?;
        let bytes = read_at(source, info.offset, length)?;

        debug!(
            "Loaded stripe {}: {} rows, {} bytes at offset {}",
            index, info.num_rows, length, info.offset
        );

        Self::new(metadata, info, bytes)
    }

    /// Build a stripe from its raw bytes: index and data streams followed by the stripe footer.
    pub fn new(metadata: Arc<FileMetadata>, info: StripeInfo, bytes: Vec<u8>) -> Result<Self> {
        let footer_start = info
            .index_length
            .checked_add(info.data_length)
            .and_then(|start| usize::try_from(start).ok())
            .filter(|&start| start <= bytes.len())
            .ok_or_else(|| {
                Error::MalformedFooter(format!(
                    "stripe footer offset outside {} stripe bytes",
                    bytes.len()
                ))
            })?;

        let footer_bytes = decompress_stream(&metadata.codec, &bytes[footer_start..])?;
        let footer = proto::StripeFooter::decode(footer_bytes.as_slice())?;

        let directory = StreamDirectory::build(&footer.streams, footer_start)?;
        let encodings = footer
            .columns
            .iter()
            .enumerate()
            .map(|(column, encoding)| {
                let raw = encoding.kind.unwrap_or_default();
                let kind = ColumnEncodingKind::try_from(raw).map_err(|_| {
                    Error::MalformedFooter(format!(
                        "column {} has unknown encoding {}",
                        column, raw
                    ))
                })?;
                Ok(ColumnEncoding {
                    kind,
                    dictionary_size: encoding.dictionary_size,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Stripe {
            metadata,
            info,
            bytes,
            directory,
            encodings,
            writer_timezone: footer.writer_timezone,
        })
    }

    pub fn num_rows(&self) -> usize {
        self.info.num_rows as usize
    }

    pub fn info(&self) -> &StripeInfo {
        &self.info
    }

    pub fn writer_timezone(&self) -> Option<&str> {
        self.writer_timezone.as_deref()
    }

    pub fn directory(&self) -> &StreamDirectory {
        &self.directory
    }

    pub fn column_type(&self, column: u32) -> Result<&ColumnType> {
        self.metadata.column_type(column)
    }

    pub fn column_encoding(&self, column: u32) -> Result<ColumnEncoding> {
        self.encodings.get(column as usize).copied().ok_or_else(|| {
            Error::MalformedFooter(format!("stripe footer has no encoding for column {}", column))
        })
    }

    /// Decompressed bytes of a stream, or `None` when the stripe has no such stream.
    pub fn stream(&self, column: u32, kind: StreamKind) -> Result<Option<Vec<u8>>> {
        let range = match self.directory.get(column, kind) {
            Some(range) => range.clone(),
            None => return Ok(None),
        };

        trace!(
            "Decompressing {:?} stream of column {} ({} bytes)",
            kind,
            column,
            range.len()
        );
        decompress_stream(&self.metadata.codec, &self.bytes[range]).map(Some)
    }

    pub fn require_stream(&self, column: u32, kind: StreamKind) -> Result<Vec<u8>> {
        self.stream(column, kind)?
            .ok_or(Error::MissingRequiredStream { column, kind })
    }

    /// Lazy values of one column, exactly `num_rows` of them.
    pub fn read_column(&self, column: u32, shape: &Shape) -> Result<ColumnValues> {
        ColumnDecoder::new(self, column, self.num_rows())?.read(shape)
    }
}
