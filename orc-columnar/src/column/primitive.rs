//! Columns whose values live in a single Data stream.

use super::{load_present, unsupported_shape, value_stream, ColumnValues, PresentGate, Shape, Value};
use crate::decode::{present::present_count, BooleanReader, ByteRleReader, RleV2Reader};
use crate::error::{Error, Result};
use crate::stripe::{StreamKind, Stripe};
use chrono::{NaiveDate, NaiveTime};
use std::io::Cursor;

/// Days from 0001-01-01 to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    /// Byte RLE, one bit per value.
    Boolean,
    /// Byte RLE, one byte per value.
    Byte,
    /// Signed RLE v2 (short, int, long).
    Integer,
    /// Little-endian IEEE 754 single precision.
    Float,
    /// Little-endian IEEE 754 double precision.
    Double,
    /// Signed RLE v2 days since 1970-01-01.
    Date,
}

pub struct PrimitiveDecoder {
    column: u32,
    num_rows: usize,
    kind: PrimitiveKind,
    present: Option<Vec<bool>>,
    data: Vec<u8>,
}

impl PrimitiveDecoder {
    pub fn new(stripe: &Stripe, column: u32, num_rows: usize, kind: PrimitiveKind) -> Result<Self> {
        let (present, needed) = load_present(stripe, column, num_rows)?;
        let data = value_stream(stripe, column, StreamKind::Data, needed)?;

        Ok(PrimitiveDecoder {
            column,
            num_rows,
            kind,
            present,
            data,
        })
    }

    pub fn read(self, shape: &Shape) -> Result<ColumnValues> {
        let PrimitiveDecoder {
            column,
            num_rows,
            kind,
            present,
            data,
        } = self;

        let needed = present_count(present.as_deref(), num_rows);
        let values: Box<dyn Iterator<Item = Result<Option<Value>>>> = match (kind, shape) {
            // Bits past the last value only pad the final byte
            (PrimitiveKind::Boolean, Shape::Native) => Box::new(
                BooleanReader::new(Cursor::new(data))
                    .take(needed)
                    .map(|bit| bit.map(|b| Some(Value::Boolean(b)))),
            ),
            (PrimitiveKind::Byte, Shape::Native) => Box::new(
                ByteRleReader::new(Cursor::new(data))
                    .map(|byte| byte.map(|b| Some(Value::Byte(b as i8)))),
            ),
            (PrimitiveKind::Integer, Shape::Native) => Box::new(
                RleV2Reader::new(Cursor::new(data), true).map(|v| v.map(|v| Some(Value::Long(v)))),
            ),
            (PrimitiveKind::Float, Shape::Native) => {
                let count = data.len() / 4;
                Box::new((0..count).map(move |i| {
                    let mut bytes = [0u8; 4];
                    bytes.copy_from_slice(&data[i * 4..i * 4 + 4]);
                    Ok(Some(Value::Float(f32::from_le_bytes(bytes))))
                }))
            }
            (PrimitiveKind::Double, Shape::Native) => {
                let count = data.len() / 8;
                Box::new((0..count).map(move |i| {
                    let mut bytes = [0u8; 8];
                    bytes.copy_from_slice(&data[i * 8..i * 8 + 8]);
                    Ok(Some(Value::Double(f64::from_le_bytes(bytes))))
                }))
            }
            (PrimitiveKind::Date, Shape::Native) => Box::new(
                RleV2Reader::new(Cursor::new(data), true)
                    .map(move |days| Ok(Some(Value::Date(date_from_days(days?, column)?)))),
            ),
            (PrimitiveKind::Date, Shape::Timestamp) => Box::new(
                RleV2Reader::new(Cursor::new(data), true).map(move |days| {
                    let date = date_from_days(days?, column)?;
                    Ok(Some(Value::Timestamp(date.and_time(NaiveTime::default()))))
                }),
            ),
            (kind, shape) => return Err(unsupported_shape(&format!("{:?}", kind), column, shape)),
        };

        Ok(Box::new(PresentGate::new(
            column,
            StreamKind::Data,
            present,
            values,
            num_rows,
        )))
    }
}

fn date_from_days(days: i64, column: u32) -> Result<NaiveDate> {
    i32::try_from(days)
        .ok()
        .and_then(|days| days.checked_add(UNIX_EPOCH_DAYS_FROM_CE))
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or_else(|| {
            Error::InvalidFormat(format!("date {} days from epoch out of range in column {}", days, column))
        })
}
