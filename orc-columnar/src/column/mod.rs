//! Typed column decoders.
//!
//! Every decoder pairs a column's Present bitmap with a lazy sequence of its
//! data values. [`PresentGate`] walks the rows: absent rows yield `None`
//! without touching the data, present rows pull the next value. The result
//! always has exactly one item per row of the stripe.

pub mod binary;
pub mod decimal;
pub mod primitive;
pub mod string;
pub mod structure;
pub mod timestamp;
pub mod value;

pub use binary::BinaryDecoder;
pub use decimal::DecimalDecoder;
pub use primitive::{PrimitiveDecoder, PrimitiveKind};
pub use string::StringDecoder;
pub use structure::StructDecoder;
pub use timestamp::TimestampDecoder;
pub use value::{Decimal, Value, MAX_DECIMAL_SCALE};

use crate::decode::{present::present_count, read_present, RleV2Reader};
use crate::error::{Error, Result};
use crate::metadata::ColumnKind;
use crate::stripe::{StreamKind, Stripe};
use std::io::Cursor;

/// Lazy, single-pass values of one column in one stripe.
pub type ColumnValues = Box<dyn Iterator<Item = Result<Option<Value>>>>;

/// What a caller wants a column decoded into.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// The column's own value type.
    Native,
    /// Text parsed as a decimal; unparseable text becomes null.
    Decimal,
    /// Text parsed as a timestamp; unparseable text becomes null.
    Timestamp,
    /// A struct split into the listed sub-fields.
    Record(Vec<ChildColumn>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChildColumn {
    pub column: u32,
    pub shape: Shape,
}

impl ChildColumn {
    pub fn new(column: u32, shape: Shape) -> Self {
        ChildColumn { column, shape }
    }
}

/// One decoder per logical column type.
pub enum ColumnDecoder<'a> {
    Primitive(PrimitiveDecoder),
    Binary(BinaryDecoder),
    Decimal(DecimalDecoder),
    Timestamp(TimestampDecoder),
    String(StringDecoder),
    Struct(StructDecoder<'a>),
}

impl<'a> ColumnDecoder<'a> {
    /// Build the decoder for `column`, expecting `num_rows` rows.
    ///
    /// `num_rows` is the stripe's row count for top-level columns and the
    /// parent's present count for struct children.
    pub fn new(stripe: &'a Stripe, column: u32, num_rows: usize) -> Result<Self> {
        let kind = stripe.column_type(column)?.kind;

        let decoder = match kind {
            ColumnKind::Boolean => ColumnDecoder::Primitive(PrimitiveDecoder::new(
                stripe,
                column,
                num_rows,
                PrimitiveKind::Boolean,
            )?),
            ColumnKind::Byte => ColumnDecoder::Primitive(PrimitiveDecoder::new(
                stripe,
                column,
                num_rows,
                PrimitiveKind::Byte,
            )?),
            ColumnKind::Short | ColumnKind::Int | ColumnKind::Long => {
                ColumnDecoder::Primitive(PrimitiveDecoder::new(
                    stripe,
                    column,
                    num_rows,
                    PrimitiveKind::Integer,
                )?)
            }
            ColumnKind::Float => ColumnDecoder::Primitive(PrimitiveDecoder::new(
                stripe,
                column,
                num_rows,
                PrimitiveKind::Float,
            )?),
            ColumnKind::Double => ColumnDecoder::Primitive(PrimitiveDecoder::new(
                stripe,
                column,
                num_rows,
                PrimitiveKind::Double,
            )?),
            ColumnKind::Date => ColumnDecoder::Primitive(PrimitiveDecoder::new(
                stripe,
                column,
                num_rows,
                PrimitiveKind::Date,
            )?),
            ColumnKind::Binary => {
                ColumnDecoder::Binary(BinaryDecoder::new(stripe, column, num_rows)?)
            }
            ColumnKind::Decimal => {
                ColumnDecoder::Decimal(DecimalDecoder::new(stripe, column, num_rows)?)
            }
            ColumnKind::Timestamp | ColumnKind::TimestampInstant => {
                ColumnDecoder::Timestamp(TimestampDecoder::new(stripe, column, num_rows)?)
            }
            ColumnKind::String | ColumnKind::Varchar | ColumnKind::Char => {
                ColumnDecoder::String(StringDecoder::new(stripe, column, num_rows)?)
            }
            ColumnKind::Struct => {
                ColumnDecoder::Struct(StructDecoder::new(stripe, column, num_rows)?)
            }
            ColumnKind::List | ColumnKind::Map | ColumnKind::Union => {
                return Err(Error::UnsupportedFeature(format!(
                    "{:?} column {} cannot be decoded",
                    kind, column
                )))
            }
        };

        Ok(decoder)
    }

    pub fn read(self, shape: &Shape) -> Result<ColumnValues> {
        match self {
            ColumnDecoder::Primitive(decoder) => decoder.read(shape),
            ColumnDecoder::Binary(decoder) => decoder.read(shape),
            ColumnDecoder::Decimal(decoder) => decoder.read(shape),
            ColumnDecoder::Timestamp(decoder) => decoder.read(shape),
            ColumnDecoder::String(decoder) => decoder.read(shape),
            ColumnDecoder::Struct(decoder) => decoder.read(shape),
        }
    }
}

/// Yields one item per row, pulling from `values` only for present rows.
///
/// Running out of values before the last present row, or values left over
/// after it, is a `StreamLengthMismatch`. After any error the gate yields `None`.
pub struct PresentGate<I> {
    column: u32,
    /// Stream the values come from; `None` when they are struct child rows.
    stream: Option<StreamKind>,
    present: Option<Vec<bool>>,
    values: I,
    row: usize,
    num_rows: usize,
    failed: bool,
}

impl<I> PresentGate<I>
where
    I: Iterator<Item = Result<Option<Value>>>,
{
    /// `present` must be `None` or hold exactly `num_rows` flags, as returned
    /// by [`read_present`].
    pub fn new(
        column: u32,
        stream: StreamKind,
        present: Option<Vec<bool>>,
        values: I,
        num_rows: usize,
    ) -> Self {
        Self::with_source(column, Some(stream), present, values, num_rows)
    }

    /// Gate over the rows assembled from a struct's child columns.
    pub fn for_children(column: u32, present: Option<Vec<bool>>, values: I, num_rows: usize) -> Self {
        Self::with_source(column, None, present, values, num_rows)
    }

    fn with_source(
        column: u32,
        stream: Option<StreamKind>,
        present: Option<Vec<bool>>,
        values: I,
        num_rows: usize,
    ) -> Self {
        PresentGate {
            column,
            stream,
            present,
            values,
            row: 0,
            num_rows,
            failed: false,
        }
    }

    fn mismatch(&self, problem: &str, row: usize) -> Error {
        let message = match self.stream {
            Some(kind) => format!(
                "PRESENT/{:?} length mismatch: column {} {} at row {}",
                kind, self.column, problem, row
            ),
            None => format!(
                "PRESENT/child length mismatch: struct column {} {} at row {}",
                self.column, problem, row
            ),
        };
        Error::StreamLengthMismatch(message)
    }

    /// After the last row every value must have been consumed.
    fn check_exhausted(&mut self) -> Option<Error> {
        match self.values.next() {
            None => None,
            Some(Err(e)) => Some(e),
            Some(Ok(_)) => Some(self.mismatch("has values left over", self.num_rows - 1)),
        }
    }
}

impl<I> Iterator for PresentGate<I>
where
    I: Iterator<Item = Result<Option<Value>>>,
{
    type Item = Result<Option<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.row == self.num_rows {
            return None;
        }

        let row = self.row;
        self.row += 1;

        let is_present = match &self.present {
            Some(present) => present.get(row).copied().unwrap_or(false),
            None => true,
        };

        let item = if is_present {
            match self.values.next() {
                Some(Ok(value)) => Ok(value),
                Some(Err(e)) => Err(e),
                None => Err(self.mismatch("ran out of values", row)),
            }
        } else {
            Ok(None)
        };

        let item = match item {
            Ok(value) if self.row == self.num_rows => match self.check_exhausted() {
                Some(e) => Err(e),
                None => Ok(value),
            },
            other => other,
        };

        if item.is_err() {
            self.failed = true;
        }
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.failed {
            0
        } else {
            self.num_rows - self.row
        };
        (0, Some(remaining))
    }
}

/// Present bitmap of a column plus the number of values its data streams must supply.
pub(crate) fn load_present(
    stripe: &Stripe,
    column: u32,
    num_rows: usize,
) -> Result<(Option<Vec<bool>>, usize)> {
    let stream = stripe.stream(column, StreamKind::Present)?;
    let present = read_present(stream.as_deref(), num_rows)?;
    let needed = present_count(present.as_deref(), num_rows);
    Ok((present, needed))
}

/// A data stream that must exist unless no present row needs it.
pub(crate) fn value_stream(
    stripe: &Stripe,
    column: u32,
    kind: StreamKind,
    needed: usize,
) -> Result<Vec<u8>> {
    if needed == 0 {
        return Ok(stripe.stream(column, kind)?.unwrap_or_default());
    }
    stripe.require_stream(column, kind)
}

/// Eagerly decode a Length stream, rejecting negative lengths.
pub(crate) fn read_lengths(bytes: Vec<u8>, column: u32) -> Result<Vec<u64>> {
    RleV2Reader::new(Cursor::new(bytes), false)
        .map(|length| {
            let length = length?;
            u64::try_from(length).map_err(|_| {
                Error::StreamLengthMismatch(format!(
                    "negative length {} in LENGTH stream of column {}",
                    length, column
                ))
            })
        })
        .collect()
}

pub(crate) fn unsupported_shape(kind: &str, column: u32, shape: &Shape) -> Error {
    Error::UnsupportedFeature(format!(
        "{} column {} cannot be read as {:?}",
        kind, column, shape
    ))
}
