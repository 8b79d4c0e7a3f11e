//! String, varchar and char columns.
//!
//! Direct columns store each value inline: a Length stream gives the byte
//! count of every present value and the Data stream holds the bytes back to
//! back. Dictionary columns store each distinct value once in DictionaryData
//! (sized by Length) and the Data stream holds one dictionary id per present row.

use super::binary::{load_length_prefixed, LengthSlices};
use super::{
    load_present, read_lengths, unsupported_shape, value_stream, ColumnValues, PresentGate, Shape,
    Value,
};
use crate::coerce::coerce_text;
use crate::decode::{RleV2Reader, StringDictionary};
use crate::error::{Error, Result};
use crate::proto::ColumnEncodingKind;
use crate::stripe::{StreamKind, Stripe};
use log::trace;
use std::io::Cursor;

pub enum StringDecoder {
    Direct {
        column: u32,
        num_rows: usize,
        present: Option<Vec<bool>>,
        slices: LengthSlices,
    },
    Dictionary {
        column: u32,
        num_rows: usize,
        present: Option<Vec<bool>>,
        ids: Vec<u8>,
        dictionary: StringDictionary,
    },
}

impl StringDecoder {
    pub fn new(stripe: &Stripe, column: u32, num_rows: usize) -> Result<Self> {
        let encoding = stripe.column_encoding(column)?;
        trace!("Column {} string encoding {:?}", column, encoding.kind);

        match encoding.kind {
            ColumnEncodingKind::DirectV2 => {
                let (present, slices) = load_length_prefixed(stripe, column, num_rows)?;
                Ok(StringDecoder::Direct {
                    column,
                    num_rows,
                    present,
                    slices,
                })
            }
            ColumnEncodingKind::DictionaryV2 => {
                let (present, needed) = load_present(stripe, column, num_rows)?;
                let ids = value_stream(stripe, column, StreamKind::Data, needed)?;

                let expected = encoding.dictionary_size.map(|size| size as usize);
                let entries = expected.unwrap_or(1);
                let lengths = read_lengths(
                    value_stream(stripe, column, StreamKind::Length, entries)?,
                    column,
                )?;
                let data = value_stream(stripe, column, StreamKind::DictionaryData, entries)?;
                let dictionary = StringDictionary::build(&lengths, &data, expected)?;

                Ok(StringDecoder::Dictionary {
                    column,
                    num_rows,
                    present,
                    ids,
                    dictionary,
                })
            }
            ColumnEncodingKind::Direct | ColumnEncodingKind::Dictionary => {
                Err(Error::UnsupportedFeature(format!(
                    "{:?} (v1) encoding of string column {}",
                    encoding.kind, column
                )))
            }
        }
    }

    pub fn read(self, shape: &Shape) -> Result<ColumnValues> {
        if let Shape::Record(_) = shape {
            let column = match &self {
                StringDecoder::Direct { column, .. } | StringDecoder::Dictionary { column, .. } => {
                    *column
                }
            };
            return Err(unsupported_shape("String", column, shape));
        }
        let shape = shape.clone();

        match self {
            StringDecoder::Direct {
                column,
                num_rows,
                present,
                slices,
            } => {
                let values = slices.map(move |bytes| {
                    let text = String::from_utf8(bytes).map_err(|e| {
                        Error::InvalidFormat(format!("Invalid UTF-8 in column {}: {}", column, e))
                    })?;
                    Ok(coerce_text(text, &shape))
                });
                Ok(Box::new(PresentGate::new(
                    column,
                    StreamKind::Length,
                    present,
                    values,
                    num_rows,
                )))
            }
            StringDecoder::Dictionary {
                column,
                num_rows,
                present,
                ids,
                dictionary,
            } => {
                let values = RleV2Reader::new(Cursor::new(ids), false).map(move |id| {
                    let id = id?;
                    let text = dictionary.get(id as u64).ok_or_else(|| {
                        Error::InvalidFormat(format!(
                            "dictionary id {} out of range for {} entries in column {}",
                            id,
                            dictionary.len(),
                            column
                        ))
                    })?;
                    Ok(coerce_text(text.to_string(), &shape))
                });
                Ok(Box::new(PresentGate::new(
                    column,
                    StreamKind::Data,
                    present,
                    values,
                    num_rows,
                )))
            }
        }
    }
}
