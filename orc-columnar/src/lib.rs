pub mod coerce;
pub mod column;
pub mod compression;
pub mod decode;
pub mod error;
pub mod metadata;
pub mod proto;
pub mod reader;
pub mod stripe;

#[cfg(test)]
pub(crate) mod test_util;

pub use coerce::coerce_text;
pub use column::{ChildColumn, ColumnDecoder, ColumnValues, Decimal, Shape, Value};
pub use compression::{
    compress_stream, create_compressor, create_decompressor, decompress_stream, Codec, CodecKind,
    CompressionStrategy,
};
pub use error::{Error, Result};
pub use metadata::{ColumnKind, ColumnType, FileMetadata, StripeInfo};
pub use reader::{OrcReader, Stripes};
pub use stripe::{ColumnEncoding, StreamDirectory, StreamKind, Stripe};
