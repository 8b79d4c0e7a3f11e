use crate::error::{Error, Result};

/// Strings of a dictionary-encoded column, indexed by dictionary id.
#[derive(Debug, Clone, PartialEq)]
pub struct StringDictionary {
    values: Vec<String>,
}

impl StringDictionary {
    /// Slice `data` into consecutive entries, the n-th spanning `lengths[n]` bytes.
    ///
    /// `expected_size` is the dictionary size declared by the column encoding, if any.
    pub fn build(lengths: &[u64], data: &[u8], expected_size: Option<usize>) -> Result<Self> {
        if let Some(expected) = expected_size {
            if expected != lengths.len() {
                return Err(Error::StreamLengthMismatch(format!(
                    "dictionary declares {} entries, LENGTH stream holds {}",
                    expected,
                    lengths.len()
                )));
            }
        }

        let mut values = Vec::with_capacity(lengths.len());
        let mut offset = 0usize;

        for (id, &length) in lengths.iter().enumerate() {
            let end = usize::try_from(length)
                .ok()
                .and_then(|length| offset.checked_add(length))
                .filter(|&end| end <= data.len())
                .ok_or_else(|| {
                    Error::StreamLengthMismatch(format!(
                        "dictionary entry {} of {} bytes at offset {} overruns {} bytes of DICTIONARY_DATA",
                        id,
                        length,
                        offset,
                        data.len()
                    ))
                })?;

            let value = std::str::from_utf8(&data[offset..end]).map_err(|e| {
                Error::InvalidFormat(format!("Invalid UTF-8 in dictionary entry {}: {}", id, e))
            })?;
            values.push(value.to_string());
            offset = end;
        }

        Ok(StringDictionary { values })
    }

    pub fn get(&self, id: u64) -> Option<&str> {
        usize::try_from(id)
            .ok()
            .and_then(|id| self.values.get(id))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
