use super::{load_present, ColumnDecoder, ColumnValues, PresentGate, Shape, StringDecoder, Value};
use crate::error::{Error, Result};
use crate::stripe::Stripe;
use log::trace;

/// Struct column. A `Record` shape splits it into child columns; any other
/// shape reads it as a single string leaf over its first child.
pub struct StructDecoder<'a> {
    stripe: &'a Stripe,
    column: u32,
    num_rows: usize,
    children: Vec<u32>,
}

impl<'a> StructDecoder<'a> {
    pub fn new(stripe: &'a Stripe, column: u32, num_rows: usize) -> Result<Self> {
        let children = stripe.column_type(column)?.sub_type_ids.clone();
        Ok(StructDecoder {
            stripe,
            column,
            num_rows,
            children,
        })
    }

    pub fn read(self, shape: &Shape) -> Result<ColumnValues> {
        let (present, child_rows) = load_present(self.stripe, self.column, self.num_rows)?;

        let fields = match shape {
            Shape::Record(fields) => fields,
            leaf => {
                let first = *self.children.first().ok_or_else(|| {
                    Error::InvalidFormat(format!("struct column {} has no children", self.column))
                })?;
                trace!("Reading struct column {} as leaf column {}", self.column, first);
                // The child holds values only for rows where the struct is present
                let values = StringDecoder::new(self.stripe, first, child_rows)?.read(leaf)?;
                return Ok(Box::new(PresentGate::for_children(
                    self.column,
                    present,
                    values,
                    self.num_rows,
                )));
            }
        };

        let mut children = Vec::with_capacity(fields.len());
        for field in fields {
            if !self.children.contains(&field.column) {
                return Err(Error::ColumnNotFound(format!(
                    "column {} is not a child of struct column {}",
                    field.column, self.column
                )));
            }
            let decoder = ColumnDecoder::new(self.stripe, field.column, child_rows)?;
            children.push(decoder.read(&field.shape)?);
        }

        Ok(Box::new(PresentGate::for_children(
            self.column,
            present,
            StructRows {
                children,
                remaining: child_rows,
            },
            self.num_rows,
        )))
    }
}

/// Zips child sequences into struct values, one per present parent row.
struct StructRows {
    children: Vec<ColumnValues>,
    remaining: usize,
}

impl Iterator for StructRows {
    type Item = Result<Option<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let mut fields = Vec::with_capacity(self.children.len());
        for child in &mut self.children {
            match child.next()? {
                Ok(value) => fields.push(value),
                Err(e) => return Some(Err(e)),
            }
        }
        Some(Ok(Some(Value::Struct(fields))))
    }
}
