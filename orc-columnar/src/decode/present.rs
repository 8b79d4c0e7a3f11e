use super::BooleanReader;
use crate::error::{Error, Result};

/// Decode a column's Present stream into one flag per row.
///
/// `None` in means the column has no nulls, and `None` comes back out.
pub fn read_present(stream: Option<&[u8]>, num_rows: usize) -> Result<Option<Vec<bool>>> {
    let bytes = match stream {
        Some(bytes) => bytes,
        None => return Ok(None),
    };

    // Capacity hint only; the row count comes from the file
    let mut present = Vec::with_capacity(num_rows.min(bytes.len().saturating_mul(8)));
    for bit in BooleanReader::new(bytes).take(num_rows) {
        present.push(bit?);
    }

    if present.len() < num_rows {
        return Err(Error::StreamLengthMismatch(format!(
            "PRESENT stream holds {} bits for {} rows",
            present.len(),
            num_rows
        )));
    }

    Ok(Some(present))
}

/// Number of rows with a value.
pub(crate) fn present_count(present: Option<&[bool]>, num_rows: usize) -> usize {
    match present {
        Some(bits) => bits.iter().filter(|&&bit| bit).count(),
        None => num_rows,
    }
}
