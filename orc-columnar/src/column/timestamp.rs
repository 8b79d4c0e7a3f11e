use super::{
    load_present, unsupported_shape, value_stream, ColumnValues, PresentGate, Shape, Value,
};
use crate::decode::RleV2Reader;
use crate::error::{Error, Result};
use crate::stripe::{StreamKind, Stripe};
use chrono::{DateTime, NaiveDateTime};
use std::io::Cursor;

/// 2015-01-01 00:00:00 UTC, the zero point of ORC timestamp seconds.
pub const ORC_EPOCH_SECONDS: i64 = 1_420_070_400;

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Timestamp columns: signed seconds from the ORC epoch in Data, encoded
/// nanoseconds in Secondary. Values are read as UTC.
pub struct TimestampDecoder {
    column: u32,
    num_rows: usize,
    present: Option<Vec<bool>>,
    seconds: Vec<u8>,
    nanos: Vec<u8>,
}

impl TimestampDecoder {
    pub fn new(stripe: &Stripe, column: u32, num_rows: usize) -> Result<Self> {
        let (present, needed) = load_present(stripe, column, num_rows)?;
        let seconds = value_stream(stripe, column, StreamKind::Data, needed)?;
        let nanos = value_stream(stripe, column, StreamKind::Secondary, needed)?;

        Ok(TimestampDecoder {
            column,
            num_rows,
            present,
            seconds,
            nanos,
        })
    }

    pub fn read(self, shape: &Shape) -> Result<ColumnValues> {
        match shape {
            Shape::Native | Shape::Timestamp => {}
            _ => return Err(unsupported_shape("Timestamp", self.column, shape)),
        }

        let column = self.column;
        let mut nanos = RleV2Reader::new(Cursor::new(self.nanos), false);
        let values = RleV2Reader::new(Cursor::new(self.seconds), true).map(move |seconds| {
            let seconds = seconds?;
            let raw_nanos = match nanos.next() {
                Some(raw) => raw?,
                None => {
                    return Err(Error::StreamLengthMismatch(format!(
                        "DATA/SECONDARY length mismatch in timestamp column {}",
                        column
                    )))
                }
            };
            Ok(Some(Value::Timestamp(to_timestamp(seconds, raw_nanos as u64, column)?)))
        });

        Ok(Box::new(PresentGate::new(
            self.column,
            StreamKind::Data,
            self.present,
            values,
            self.num_rows,
        )))
    }
}

/// Undo the trailing-zero compression of a Secondary value: the low 3 bits
/// count the stripped zeros (minus one), the rest is the remaining digits.
pub fn decode_nanos(raw: u64) -> u64 {
    let zeros = raw & 0x07;
    let nanos = raw >> 3;
    if zeros == 0 {
        nanos
    } else {
        nanos.saturating_mul(10u64.pow(zeros as u32 + 1))
    }
}

fn to_timestamp(seconds: i64, raw_nanos: u64, column: u32) -> Result<NaiveDateTime> {
    let out_of_range = || {
        Error::InvalidFormat(format!(
            "timestamp {}s/{}ns out of range in column {}",
            seconds, raw_nanos, column
        ))
    };

    let nanos = decode_nanos(raw_nanos);
    if nanos >= NANOS_PER_SECOND {
        return Err(out_of_range());
    }

    let mut unix_seconds = seconds.checked_add(ORC_EPOCH_SECONDS).ok_or_else(out_of_range)?;
    // Pre-1970 seconds are stored rounded toward zero
    if unix_seconds < 0 && nanos > 999_999 {
        unix_seconds -= 1;
    }

    DateTime::from_timestamp(unix_seconds, nanos as u32)
        .map(|ts| ts.naive_utc())
        .ok_or_else(out_of_range)
}
