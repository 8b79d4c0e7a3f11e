use crate::binding::{FieldRequest, ReadOptions, RowBinding};
use crate::error::{Error, Result};
use log::{debug, trace};
use orc_columnar::{ColumnValues, OrcReader, Value};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use std::sync::Arc;

/// One assembled record, values in binding order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    names: Arc<[String]>,
    values: Vec<Option<Value>>,
}

impl Row {
    /// Value of the field requested as `name`; `None` for unknown names and nulls alike.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let index = self.names.iter().position(|n| n == name)?;
        self.value(index)
    }

    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)?.as_ref()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[Option<Value>] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Option<Value>> {
        self.values
    }
}

/// Column sequences of the stripe being read.
struct StripeCursor {
    columns: Vec<ColumnValues>,
    remaining: usize,
}

/// Assembles rows from the bound columns, one stripe at a time.
pub struct RowReader<R> {
    reader: OrcReader<R>,
    binding: RowBinding,
    names: Arc<[String]>,
    next_stripe: usize,
    current: Option<StripeCursor>,
    failed: bool,
}

impl RowReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(
        path: P,
        requests: &[FieldRequest],
        options: &ReadOptions,
    ) -> Result<Self> {
        Self::new(OrcReader::open(path)?, requests, options)
    }
}

impl<R: Read + Seek> RowReader<R> {
    pub fn new(reader: OrcReader<R>, requests: &[FieldRequest], options: &ReadOptions) -> Result<Self> {
        let binding = RowBinding::bind(reader.metadata(), requests, options)?;
        Ok(Self::with_binding(reader, binding))
    }

    pub fn with_binding(reader: OrcReader<R>, binding: RowBinding) -> Self {
        let names: Arc<[String]> = binding.names().into();
        RowReader {
            reader,
            binding,
            names,
            next_stripe: 0,
            current: None,
            failed: false,
        }
    }

    pub fn binding(&self) -> &RowBinding {
        &self.binding
    }

    /// Open the next stripe that has rows, or `None` past the last one.
    fn advance_stripe(&mut self) -> Result<Option<StripeCursor>> {
        while self.next_stripe < self.reader.num_stripes() {
            let index = self.next_stripe;
            self.next_stripe += 1;

            let stripe = self.reader.read_stripe(index)?;
            if stripe.num_rows() == 0 {
                trace!("Skipping empty stripe {}", index);
                continue;
            }

            let columns = self
                .binding
                .fields()
                .iter()
                .map(|field| stripe.read_column(field.column, &field.shape))
                .collect::<orc_columnar::Result<Vec<_>>>()?;

            debug!(
                "Reading {} rows from stripe {} over {} columns",
                stripe.num_rows(),
                index,
                columns.len()
            );
            return Ok(Some(StripeCursor {
                columns,
                remaining: stripe.num_rows(),
            }));
        }
        Ok(None)
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        loop {
            if let Some(cursor) = self.current.as_mut() {
                if cursor.remaining > 0 {
                    cursor.remaining -= 1;
                    let mut values = Vec::with_capacity(cursor.columns.len());
                    for (field, column) in self.binding.fields().iter().zip(&mut cursor.columns) {
                        match column.next() {
                            Some(value) => values.push(value?),
                            None => {
                                return Err(Error::RowAlignment(format!(
                                    "column {} ({}) ended {} rows early",
                                    field.column,
                                    field.name,
                                    cursor.remaining + 1
                                )))
                            }
                        }
                    }
                    return Ok(Some(Row {
                        names: Arc::clone(&self.names),
                        values,
                    }));
                }
            }

            match self.advance_stripe()? {
                Some(cursor) => self.current = Some(cursor),
                None => {
                    self.current = None;
                    return Ok(None);
                }
            }
        }
    }
}

impl<R: Read + Seek> Iterator for RowReader<R> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_row() {
            Ok(row) => row.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
