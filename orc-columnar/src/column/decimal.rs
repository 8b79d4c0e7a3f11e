use super::{
    load_present, unsupported_shape, value_stream, ColumnValues, Decimal, PresentGate, Shape,
    Value, MAX_DECIMAL_SCALE,
};
use crate::decode::{zigzag_decode_i128, ByteSource, RleV2Reader};
use crate::error::{Error, Result};
use crate::stripe::{StreamKind, Stripe};
use std::io::Cursor;

/// Decimal column: zig-zag varint mantissas in Data, one signed RLE v2 scale
/// per value in Secondary.
pub struct DecimalDecoder {
    column: u32,
    num_rows: usize,
    present: Option<Vec<bool>>,
    data: Vec<u8>,
    scales: Vec<u8>,
}

impl DecimalDecoder {
    pub fn new(stripe: &Stripe, column: u32, num_rows: usize) -> Result<Self> {
        let (present, needed) = load_present(stripe, column, num_rows)?;
        let data = value_stream(stripe, column, StreamKind::Data, needed)?;
        let scales = value_stream(stripe, column, StreamKind::Secondary, needed)?;

        Ok(DecimalDecoder {
            column,
            num_rows,
            present,
            data,
            scales,
        })
    }

    pub fn read(self, shape: &Shape) -> Result<ColumnValues> {
        match shape {
            Shape::Native | Shape::Decimal => {}
            _ => return Err(unsupported_shape("Decimal", self.column, shape)),
        }

        let values = DecimalValues {
            column: self.column,
            mantissas: ByteSource::new(Cursor::new(self.data)),
            scales: RleV2Reader::new(Cursor::new(self.scales), true),
        };
        Ok(Box::new(PresentGate::new(
            self.column,
            StreamKind::Data,
            self.present,
            values,
            self.num_rows,
        )))
    }
}

struct DecimalValues {
    column: u32,
    mantissas: ByteSource<Cursor<Vec<u8>>>,
    scales: RleV2Reader<Cursor<Vec<u8>>>,
}

impl DecimalValues {
    fn decode(&mut self, raw: u128) -> Result<Option<Value>> {
        let scale = match self.scales.next() {
            Some(scale) => scale?,
            None => {
                return Err(Error::StreamLengthMismatch(format!(
                    "DATA/SECONDARY length mismatch in decimal column {}",
                    self.column
                )))
            }
        };

        let scale = u32::try_from(scale)
            .ok()
            .filter(|&scale| scale <= MAX_DECIMAL_SCALE)
            .ok_or_else(|| {
                Error::InvalidFormat(format!(
                    "decimal scale {} out of range in column {}",
                    scale, self.column
                ))
            })?;

        Ok(Some(Value::Decimal(Decimal::new(zigzag_decode_i128(raw), scale))))
    }
}

impl Iterator for DecimalValues {
    type Item = Result<Option<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.mantissas.next_varint_u128("a decimal value") {
            Ok(Some(raw)) => Some(self.decode(raw)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
