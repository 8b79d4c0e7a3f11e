// Row assembly over orc-columnar column sequences

pub mod binding;
pub mod error;
pub mod rows;

pub use binding::{BoundField, FieldRequest, ReadOptions, RowBinding, Target};
pub use error::{Error, Result};
pub use rows::{Row, RowReader};
