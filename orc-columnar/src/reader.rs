use crate::column::{Shape, Value};
use crate::error::Result;
use crate::metadata::FileMetadata;
use crate::stripe::Stripe;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use std::sync::Arc;

pub struct OrcReader<R> {
    source: R,
    metadata: Arc<FileMetadata>,
}

impl OrcReader<BufReader<File>> {
    /// Open an ORC file on disk
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> OrcReader<R> {
    /// Parse the file tail of `source`. Fails with `UnsupportedCodec` before
    /// any stripe is read when the file's compression is not available.
    pub fn new(mut source: R) -> Result<Self> {
        let metadata = FileMetadata::read(&mut source)?;
        Ok(OrcReader {
            source,
            metadata: Arc::new(metadata),
        })
    }

    pub fn metadata(&self) -> &FileMetadata {
        &self.metadata
    }

    pub fn num_rows(&self) -> u64 {
        self.metadata.num_rows
    }

    pub fn num_stripes(&self) -> usize {
        self.metadata.stripes.len()
    }

    pub fn read_stripe(&mut self, index: usize) -> Result<Stripe> {
        Stripe::load(&mut self.source, Arc::clone(&self.metadata), index)
    }

    /// Stripes in file order, each read in full when reached.
    pub fn stripes(&mut self) -> Stripes<'_, R> {
        Stripes {
            reader: self,
            next: 0,
        }
    }

    /// Decode one column across every stripe.
    pub fn read_column(&mut self, column: u32, shape: &Shape) -> Result<Vec<Option<Value>>> {
        let mut values = Vec::new();
        for stripe in self.stripes() {
            for value in stripe?.read_column(column, shape)? {
                values.push(value?);
            }
        }
        Ok(values)
    }
}

pub struct Stripes<'a, R> {
    reader: &'a mut OrcReader<R>,
    next: usize,
}

impl<R: Read + Seek> Iterator for Stripes<'_, R> {
    type Item = Result<Stripe>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.reader.num_stripes() {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some(self.reader.read_stripe(index))
    }
}
