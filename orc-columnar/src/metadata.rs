use crate::compression::{decompress_stream, Codec, DEFAULT_BLOCK_SIZE};
use crate::error::{Error, Result};
use crate::proto::{self, CompressionKind, TypeKind};
use log::debug;
use prost::Message;
use std::io::{Cursor, Read, Seek, SeekFrom};

pub const MAGIC: &str = "ORC";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    Binary,
    Timestamp,
    List,
    Map,
    Struct,
    Union,
    Decimal,
    Date,
    Varchar,
    Char,
    TimestampInstant,
}

impl From<TypeKind> for ColumnKind {
    fn from(kind: TypeKind) -> Self {
        match kind {
            TypeKind::Boolean => ColumnKind::Boolean,
            TypeKind::Byte => ColumnKind::Byte,
            TypeKind::Short => ColumnKind::Short,
            TypeKind::Int => ColumnKind::Int,
            TypeKind::Long => ColumnKind::Long,
            TypeKind::Float => ColumnKind::Float,
            TypeKind::Double => ColumnKind::Double,
            TypeKind::String => ColumnKind::String,
            TypeKind::Binary => ColumnKind::Binary,
            TypeKind::Timestamp => ColumnKind::Timestamp,
            TypeKind::List => ColumnKind::List,
            TypeKind::Map => ColumnKind::Map,
            TypeKind::Struct => ColumnKind::Struct,
            TypeKind::Union => ColumnKind::Union,
            TypeKind::Decimal => ColumnKind::Decimal,
            TypeKind::Date => ColumnKind::Date,
            TypeKind::Varchar => ColumnKind::Varchar,
            TypeKind::Char => ColumnKind::Char,
            TypeKind::TimestampInstant => ColumnKind::TimestampInstant,
        }
    }
}

/// One node of the file's type tree. The node's position in
/// [`FileMetadata::types`] is its column id.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnType {
    pub kind: ColumnKind,
    /// Struct children only, parallel to `sub_type_ids`.
    pub field_names: Vec<String>,
    pub sub_type_ids: Vec<u32>,
    pub maximum_length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripeInfo {
    pub offset: u64,
    pub index_length: u64,
    pub data_length: u64,
    pub footer_length: u64,
    pub num_rows: u64,
}

impl StripeInfo {
    pub fn total_length(&self) -> u64 {
        self.index_length + self.data_length + self.footer_length
    }
}

/// File tail: postscript and footer, parsed once per file.
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub codec: Codec,
    pub version: Vec<u32>,
    pub writer_version: Option<u32>,
    pub num_rows: u64,
    pub row_index_stride: Option<u32>,
    pub types: Vec<ColumnType>,
    pub stripes: Vec<StripeInfo>,
}

impl FileMetadata {
    /// Parse the tail of an ORC file from a seekable source.
    pub fn read<R: Read + Seek>(source: &mut R) -> Result<Self> {
        let file_len = source.seek(SeekFrom::End(0))?;
        if file_len < MAGIC.len() as u64 + 1 {
            return Err(Error::MalformedFooter(format!(
                "file of {} bytes is too small to be ORC",
                file_len
            )));
        }

        // Last byte holds the postscript length
        let ps_len = read_at(source, file_len - 1, 1)?[0] as u64;
        let ps_start = (file_len - 1).checked_sub(ps_len).ok_or_else(|| {
            Error::MalformedFooter(format!(
                "postscript of {} bytes does not fit in {} byte file",
                ps_len, file_len
            ))
        })?;
        let postscript = proto::PostScript::decode(read_at(source, ps_start, ps_len as usize)?.as_slice())?;

        if let Some(magic) = &postscript.magic {
            if magic != MAGIC {
                return Err(Error::MalformedFooter(format!("Invalid magic: {:?}", magic)));
            }
        }

        let codec = Self::parse_codec(&postscript)?;

        let footer_len = postscript
            .footer_length
            .ok_or_else(|| Error::MalformedFooter("postscript has no footer length".to_string()))?;
        let footer_start = ps_start.checked_sub(footer_len).ok_or_else(|| {
            Error::MalformedFooter(format!(
                "footer of {} bytes does not fit before offset {}",
                footer_len, ps_start
            ))
        })?;
        let content_end = footer_start
            .checked_sub(postscript.metadata_length())
            .ok_or_else(|| {
                Error::MalformedFooter(format!(
                    "metadata of {} bytes does not fit before offset {}",
                    postscript.metadata_length(),
                    footer_start
                ))
            })?;

        let footer_bytes = read_at(source, footer_start, footer_len as usize)?;
        let footer = proto::Footer::decode(decompress_stream(&codec, &footer_bytes)?.as_slice())?;

        let types = footer
            .types
            .iter()
            .enumerate()
            .map(|(id, ty)| Self::parse_type(id, ty, footer.types.len()))
            .collect::<Result<Vec<_>>>()?;

        match types.first() {
            Some(root) if root.kind == ColumnKind::Struct => {}
            Some(root) => {
                return Err(Error::MalformedFooter(format!(
                    "root column is {:?}, expected Struct",
                    root.kind
                )))
            }
            None => return Err(Error::MalformedFooter("footer has no types".to_string())),
        }

        let stripes = footer
            .stripes
            .iter()
            .enumerate()
            .map(|(index, info)| Self::parse_stripe(index, info, content_end))
            .collect::<Result<Vec<_>>>()?;

        let metadata = FileMetadata {
            codec,
            version: postscript.version.clone(),
            writer_version: postscript.writer_version,
            num_rows: footer.number_of_rows(),
            row_index_stride: footer.row_index_stride,
            types,
            stripes,
        };

        debug!(
            "Parsed ORC tail: {} rows, {} stripes, {} columns, codec {:?}",
            metadata.num_rows,
            metadata.stripes.len(),
            metadata.types.len(),
            metadata.codec.kind()
        );

        Ok(metadata)
    }

    /// Parse the tail of an in-memory ORC file.
    pub fn parse(file: &[u8]) -> Result<Self> {
        Self::read(&mut Cursor::new(file))
    }

    fn parse_codec(postscript: &proto::PostScript) -> Result<Codec> {
        let raw = postscript.compression.unwrap_or(CompressionKind::None as i32);
        let kind = CompressionKind::try_from(raw)
            .map_err(|_| Error::UnsupportedCodec(format!("compression kind {}", raw)))?;

        let block_size = postscript
            .compression_block_size
            .unwrap_or(DEFAULT_BLOCK_SIZE as u64);
        let block_size = usize::try_from(block_size).map_err(|_| {
            Error::MalformedFooter(format!("Invalid compression block size {}", block_size))
        })?;

        Codec::new(kind, block_size)
    }

    fn parse_type(id: usize, ty: &proto::Type, type_count: usize) -> Result<ColumnType> {
        let raw = ty.kind.unwrap_or_default();
        let kind = TypeKind::try_from(raw)
            .map(ColumnKind::from)
            .map_err(|_| Error::MalformedFooter(format!("column {} has unknown type {}", id, raw)))?;

        for &child in &ty.subtypes {
            // Types are stored in pre-order, so children always follow their parent
            if child as usize <= id || child as usize >= type_count {
                return Err(Error::MalformedFooter(format!(
                    "column {} lists child {} outside ({}, {})",
                    id, child, id, type_count
                )));
            }
        }

        if kind == ColumnKind::Struct && ty.field_names.len() != ty.subtypes.len() {
            return Err(Error::MalformedFooter(format!(
                "struct column {} has {} field names for {} children",
                id,
                ty.field_names.len(),
                ty.subtypes.len()
            )));
        }

        Ok(ColumnType {
            kind,
            field_names: ty.field_names.clone(),
            sub_type_ids: ty.subtypes.clone(),
            maximum_length: ty.maximum_length,
            precision: ty.precision,
            scale: ty.scale,
        })
    }

    fn parse_stripe(index: usize, info: &proto::StripeInformation, content_end: u64) -> Result<StripeInfo> {
        let stripe = StripeInfo {
            offset: info.offset(),
            index_length: info.index_length(),
            data_length: info.data_length(),
            footer_length: info.footer_length(),
            num_rows: info.number_of_rows(),
        };

        let end = stripe
            .index_length
            .checked_add(stripe.data_length)
            .and_then(|len| len.checked_add(stripe.footer_length))
            .and_then(|len| len.checked_add(stripe.offset));

        match end {
            Some(end) if end <= content_end => {}
            _ => {
                return Err(Error::MalformedFooter(format!(
                    "stripe {} at offset {} runs past the end of file content at {}",
                    index, stripe.offset, content_end
                )))
            }
        }

        if stripe.num_rows > isize::MAX as u64 {
            return Err(Error::MalformedFooter(format!(
                "stripe {} claims {} rows",
                index, stripe.num_rows
            )));
        }

        Ok(stripe)
    }

    pub fn column_type(&self, column_id: u32) -> Result<&ColumnType> {
        self.types
            .get(column_id as usize)
            .ok_or_else(|| Error::ColumnNotFound(format!("column id {}", column_id)))
    }

    /// The root struct (column 0).
    pub fn root(&self) -> &ColumnType {
        &self.types[0]
    }

    pub fn num_columns(&self) -> usize {
        self.types.len()
    }
}

pub(crate) fn read_at<R: Read + Seek>(source: &mut R, offset: u64, len: usize) -> Result<Vec<u8>> {
    source.seek(SeekFrom::Start(offset))?;
    let mut bytes = vec![0u8; len];
    source.read_exact(&mut bytes)?;
    Ok(bytes)
}
