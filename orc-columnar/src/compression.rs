//! Codec layer: stream wrappers per compression kind plus ORC's chunk framing.
//!
//! Every compressed ORC stream (and the file footer) is a sequence of chunks,
//! each prefixed by a 3-byte little-endian header holding `length << 1 | original`.
//! An "original" chunk is stored as is because compressing it did not help.

use crate::error::{Error, Result};
use crate::proto::CompressionKind;
use log::trace;
use std::io::{self, Cursor, Read, Write};

const CHUNK_HEADER_SIZE: usize = 3;
const MAX_CHUNK_LENGTH: usize = (1 << 23) - 1;

/// Default ORC compression block size (256 KiB).
pub const DEFAULT_BLOCK_SIZE: usize = 256 * 1024;

/// Trade-off between compressor speed and output size. Has no effect on decompression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionStrategy {
    #[default]
    Speed,
    Size,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
    None,
    Zlib,
    Snappy,
    Lz4,
}

/// A validated codec selection together with the file's compression block size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    kind: CodecKind,
    block_size: usize,
}

impl Codec {
    /// Resolve a file-level compression kind. Kinds this build cannot decode fail
    /// here, before any stream is touched.
    pub fn new(kind: CompressionKind, block_size: usize) -> Result<Self> {
        let kind = match kind {
            CompressionKind::None => CodecKind::None,
            CompressionKind::Zlib => CodecKind::Zlib,
            CompressionKind::Snappy => CodecKind::Snappy,
            CompressionKind::Lz4 => CodecKind::Lz4,
            CompressionKind::Lzo | CompressionKind::Zstd => {
                return Err(Error::UnsupportedCodec(format!("{:?}", kind)))
            }
        };
        ensure_enabled(kind)?;

        if block_size == 0 || block_size > MAX_CHUNK_LENGTH {
            return Err(Error::MalformedFooter(format!(
                "Invalid compression block size {}",
                block_size
            )));
        }

        Ok(Codec { kind, block_size })
    }

    pub fn none() -> Self {
        Codec {
            kind: CodecKind::None,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    pub fn kind(&self) -> CodecKind {
        self.kind
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }
}

fn ensure_enabled(kind: CodecKind) -> Result<()> {
    let enabled = match kind {
        CodecKind::None => true,
        CodecKind::Zlib => cfg!(feature = "zlib"),
        CodecKind::Snappy => cfg!(feature = "snappy"),
        CodecKind::Lz4 => cfg!(feature = "lz4"),
    };

    if enabled {
        Ok(())
    } else {
        Err(Error::UnsupportedCodec(format!(
            "{:?} support not enabled in this build",
            kind
        )))
    }
}

/// Writable stream that compresses everything written to it before it reaches the sink.
pub enum Compressor<W: Write> {
    PassThrough(W),
    #[cfg(feature = "zlib")]
    Zlib(flate2::write::DeflateEncoder<W>),
    /// Block codecs compress the whole input at once on `finish`.
    Block {
        codec: Codec,
        strategy: CompressionStrategy,
        buffer: Vec<u8>,
        sink: W,
    },
}

pub fn create_compressor<W: Write>(
    codec: &Codec,
    strategy: CompressionStrategy,
    sink: W,
) -> Result<Compressor<W>> {
    ensure_enabled(codec.kind)?;

    match codec.kind {
        CodecKind::None => Ok(Compressor::PassThrough(sink)),
        CodecKind::Zlib => {
            #[cfg(feature = "zlib")]
            {
                let level = match strategy {
                    CompressionStrategy::Speed => flate2::Compression::fast(),
                    CompressionStrategy::Size => flate2::Compression::best(),
                };
                Ok(Compressor::Zlib(flate2::write::DeflateEncoder::new(sink, level)))
            }
            #[cfg(not(feature = "zlib"))]
            {
                Err(Error::UnsupportedCodec("Zlib support not enabled".to_string()))
            }
        }
        CodecKind::Snappy | CodecKind::Lz4 => Ok(Compressor::Block {
            codec: *codec,
            strategy,
            buffer: Vec::new(),
            sink,
        }),
    }
}

impl<W: Write> Compressor<W> {
    /// Flush all pending compressed output and hand back the sink.
    pub fn finish(self) -> Result<W> {
        match self {
            Compressor::PassThrough(sink) => Ok(sink),
            #[cfg(feature = "zlib")]
            Compressor::Zlib(encoder) => Ok(encoder.finish()?),
            Compressor::Block {
                codec,
                strategy,
                buffer,
                mut sink,
            } => {
                let compressed = compress_block(&codec, strategy, &buffer)?;
                sink.write_all(&compressed)?;
                Ok(sink)
            }
        }
    }
}

impl<W: Write> Write for Compressor<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Compressor::PassThrough(sink) => sink.write(buf),
            #[cfg(feature = "zlib")]
            Compressor::Zlib(encoder) => encoder.write(buf),
            Compressor::Block { buffer, .. } => {
                buffer.extend_from_slice(buf);
                Ok(buf.len())
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Compressor::PassThrough(sink) => sink.flush(),
            #[cfg(feature = "zlib")]
            Compressor::Zlib(encoder) => encoder.flush(),
            Compressor::Block { .. } => Ok(()),
        }
    }
}

#[allow(unused_variables)]
fn compress_block(codec: &Codec, strategy: CompressionStrategy, input: &[u8]) -> Result<Vec<u8>> {
    match codec.kind {
        CodecKind::Snappy => {
            #[cfg(feature = "snappy")]
            {
                snap::raw::Encoder::new()
                    .compress_vec(input)
                    .map_err(|e| Error::InvalidFormat(format!("Snappy compression failed: {}", e)))
            }
            #[cfg(not(feature = "snappy"))]
            {
                Err(Error::UnsupportedCodec("Snappy support not enabled".to_string()))
            }
        }
        CodecKind::Lz4 => {
            #[cfg(feature = "lz4")]
            {
                let mode = match strategy {
                    CompressionStrategy::Speed => lz4::block::CompressionMode::DEFAULT,
                    CompressionStrategy::Size => lz4::block::CompressionMode::HIGHCOMPRESSION(9),
                };
                lz4::block::compress(input, Some(mode), false)
                    .map_err(|e| Error::InvalidFormat(format!("LZ4 compression failed: {}", e)))
            }
            #[cfg(not(feature = "lz4"))]
            {
                Err(Error::UnsupportedCodec("LZ4 support not enabled".to_string()))
            }
        }
        CodecKind::None | CodecKind::Zlib => Err(Error::InvalidFormat(format!(
            "{:?} is not a block codec",
            codec.kind
        ))),
    }
}

/// Readable stream yielding the decompressed bytes of `source`.
pub enum Decompressor<R: Read> {
    PassThrough(R),
    #[cfg(feature = "zlib")]
    Zlib(flate2::read::DeflateDecoder<R>),
    /// Block codecs decode the entire input up front; reads are served from memory.
    Block(Cursor<Vec<u8>>),
}

pub fn create_decompressor<R: Read>(codec: &Codec, mut source: R) -> Result<Decompressor<R>> {
    ensure_enabled(codec.kind)?;

    match codec.kind {
        CodecKind::None => Ok(Decompressor::PassThrough(source)),
        CodecKind::Zlib => {
            #[cfg(feature = "zlib")]
            {
                Ok(Decompressor::Zlib(flate2::read::DeflateDecoder::new(source)))
            }
            #[cfg(not(feature = "zlib"))]
            {
                Err(Error::UnsupportedCodec("Zlib support not enabled".to_string()))
            }
        }
        CodecKind::Snappy | CodecKind::Lz4 => {
            let mut input = Vec::new();
            source.read_to_end(&mut input)?;
            let decoded = decompress_block(codec, &input)?;
            Ok(Decompressor::Block(Cursor::new(decoded)))
        }
    }
}

impl<R: Read> Read for Decompressor<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Decompressor::PassThrough(source) => source.read(buf),
            #[cfg(feature = "zlib")]
            Decompressor::Zlib(decoder) => decoder.read(buf),
            Decompressor::Block(cursor) => cursor.read(buf),
        }
    }
}

fn decompress_block(codec: &Codec, input: &[u8]) -> Result<Vec<u8>> {
    match codec.kind {
        CodecKind::Snappy => {
            #[cfg(feature = "snappy")]
            {
                snap::raw::Decoder::new()
                    .decompress_vec(input)
                    .map_err(|e| Error::InvalidFormat(format!("Snappy decompression failed: {}", e)))
            }
            #[cfg(not(feature = "snappy"))]
            {
                Err(Error::UnsupportedCodec("Snappy support not enabled".to_string()))
            }
        }
        CodecKind::Lz4 => {
            #[cfg(feature = "lz4")]
            {
                // Raw LZ4 block without a size prefix; a chunk never inflates past the block size
                lz4::block::decompress(input, Some(codec.block_size as i32))
                    .map_err(|e| Error::InvalidFormat(format!("LZ4 decompression failed: {}", e)))
            }
            #[cfg(not(feature = "lz4"))]
            {
                Err(Error::UnsupportedCodec("LZ4 support not enabled".to_string()))
            }
        }
        CodecKind::None | CodecKind::Zlib => Err(Error::InvalidFormat(format!(
            "{:?} is not a block codec",
            codec.kind
        ))),
    }
}

/// Undo ORC chunk framing and decompress every chunk of a stream.
pub fn decompress_stream(codec: &Codec, input: &[u8]) -> Result<Vec<u8>> {
    if codec.kind == CodecKind::None {
        return Ok(input.to_vec());
    }

    let mut output = Vec::with_capacity(input.len() * 2);
    let mut remaining = input;
    let mut chunks = 0usize;

    while !remaining.is_empty() {
        if remaining.len() < CHUNK_HEADER_SIZE {
            return Err(Error::InvalidFormat(format!(
                "Truncated chunk header: {} bytes left",
                remaining.len()
            )));
        }

        let header = u32::from_le_bytes([remaining[0], remaining[1], remaining[2], 0]);
        let is_original = header & 1 == 1;
        let length = (header >> 1) as usize;
        let body = &remaining[CHUNK_HEADER_SIZE..];

        if length > body.len() {
            return Err(Error::InvalidFormat(format!(
                "Chunk of {} bytes overruns stream ({} bytes left)",
                length,
                body.len()
            )));
        }

        let (chunk, rest) = body.split_at(length);
        if is_original {
            output.extend_from_slice(chunk);
        } else {
            let mut decompressor = create_decompressor(codec, chunk)?;
            decompressor.read_to_end(&mut output).map_err(|e| {
                Error::InvalidFormat(format!("{:?} chunk failed to decompress: {}", codec.kind, e))
            })?;
        }

        remaining = rest;
        chunks += 1;
    }

    trace!(
        "decompressed {} chunks: {} -> {} bytes ({:?})",
        chunks,
        input.len(),
        output.len(),
        codec.kind
    );

    Ok(output)
}

/// Frame `input` into ORC chunks of at most one block each. A chunk whose compressed form
/// is not smaller than the original is stored as original.
pub fn compress_stream(codec: &Codec, strategy: CompressionStrategy, input: &[u8]) -> Result<Vec<u8>> {
    if codec.kind == CodecKind::None {
        return Ok(input.to_vec());
    }

    let mut output = Vec::with_capacity(input.len());
    for chunk in input.chunks(codec.block_size) {
        let mut compressor = create_compressor(codec, strategy, Vec::with_capacity(chunk.len()))?;
        compressor.write_all(chunk)?;
        let compressed = compressor.finish()?;

        if compressed.len() < chunk.len() {
            output.extend_from_slice(&chunk_header(compressed.len(), false));
            output.extend_from_slice(&compressed);
        } else {
            output.extend_from_slice(&chunk_header(chunk.len(), true));
            output.extend_from_slice(chunk);
        }
    }

    Ok(output)
}

fn chunk_header(length: usize, is_original: bool) -> [u8; 3] {
    let header = ((length as u32) << 1) | is_original as u32;
    let bytes = header.to_le_bytes();
    [bytes[0], bytes[1], bytes[2]]
}
