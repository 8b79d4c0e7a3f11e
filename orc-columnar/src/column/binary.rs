use super::{
    load_present, read_lengths, unsupported_shape, value_stream, ColumnValues, PresentGate, Shape,
    Value,
};
use crate::error::{Error, Result};
use crate::stripe::{StreamKind, Stripe};
use std::vec;

/// Consecutive slices of a Data buffer, the n-th spanning `lengths[n]` bytes.
pub(crate) struct LengthSlices {
    data: Vec<u8>,
    lengths: vec::IntoIter<u64>,
    offset: usize,
}

impl LengthSlices {
    /// Fails up front when the lengths add up to more than `data` holds.
    pub(crate) fn new(data: Vec<u8>, lengths: Vec<u64>, column: u32) -> Result<Self> {
        let total = lengths
            .iter()
            .try_fold(0u64, |sum, &length| sum.checked_add(length));

        match total {
            Some(total) if total <= data.len() as u64 => Ok(LengthSlices {
                data,
                lengths: lengths.into_iter(),
                offset: 0,
            }),
            _ => Err(Error::StreamLengthMismatch(format!(
                "LENGTH stream of column {} sums past its {} byte DATA stream",
                column,
                data.len()
            ))),
        }
    }
}

impl Iterator for LengthSlices {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        let length = self.lengths.next()? as usize;
        let end = self.offset + length;
        let slice = self.data[self.offset..end].to_vec();
        self.offset = end;
        Some(slice)
    }
}

/// Read the Present, Data and Length streams of a length-prefixed column.
pub(crate) fn load_length_prefixed(
    stripe: &Stripe,
    column: u32,
    num_rows: usize,
) -> Result<(Option<Vec<bool>>, LengthSlices)> {
    let (present, needed) = load_present(stripe, column, num_rows)?;
    let data = value_stream(stripe, column, StreamKind::Data, needed)?;
    let lengths = read_lengths(value_stream(stripe, column, StreamKind::Length, needed)?, column)?;
    let slices = LengthSlices::new(data, lengths, column)?;
    Ok((present, slices))
}

pub struct BinaryDecoder {
    column: u32,
    num_rows: usize,
    present: Option<Vec<bool>>,
    slices: LengthSlices,
}

impl BinaryDecoder {
    pub fn new(stripe: &Stripe, column: u32, num_rows: usize) -> Result<Self> {
        let (present, slices) = load_length_prefixed(stripe, column, num_rows)?;
        Ok(BinaryDecoder {
            column,
            num_rows,
            present,
            slices,
        })
    }

    pub fn read(self, shape: &Shape) -> Result<ColumnValues> {
        if *shape != Shape::Native {
            return Err(unsupported_shape("Binary", self.column, shape));
        }

        let values = self.slices.map(|bytes| Ok(Some(Value::Binary(bytes))));
        Ok(Box::new(PresentGate::new(
            self.column,
            StreamKind::Length,
            self.present,
            values,
            self.num_rows,
        )))
    }
}
