use crate::error::{Error, Result};
use log::debug;
use orc_columnar::{ChildColumn, ColumnKind, ColumnType, FileMetadata, Shape};

/// How a requested field should be decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// The column's own value type.
    Value,
    /// Text column parsed as a decimal.
    Decimal,
    /// Text column parsed as a timestamp.
    Timestamp,
    /// Struct column split into named sub-fields.
    Record(Vec<FieldRequest>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldRequest {
    pub name: String,
    pub target: Target,
}

impl FieldRequest {
    pub fn new(name: impl Into<String>, target: Target) -> Self {
        FieldRequest {
            name: name.into(),
            target,
        }
    }

    pub fn value(name: impl Into<String>) -> Self {
        Self::new(name, Target::Value)
    }

    pub fn record(name: impl Into<String>, fields: Vec<FieldRequest>) -> Self {
        Self::new(name, Target::Record(fields))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Skip requested fields the file does not have instead of failing.
    pub ignore_missing_columns: bool,
}

/// A request resolved against the file's type tree.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundField {
    pub name: String,
    pub column: u32,
    pub shape: Shape,
    /// Bound sub-fields of a record target, in `Value::Struct` order.
    pub children: Vec<BoundField>,
}

/// Requested fields resolved to column ids, built once per read.
#[derive(Debug, Clone, PartialEq)]
pub struct RowBinding {
    fields: Vec<BoundField>,
}

impl RowBinding {
    /// Resolve top-level `requests` against the root struct of `metadata`.
    ///
    /// Names match case-insensitively, ignoring leading underscores on the file's side.
    pub fn bind(
        metadata: &FileMetadata,
        requests: &[FieldRequest],
        options: &ReadOptions,
    ) -> Result<Self> {
        let fields = bind_children(metadata, 0, requests, options)?;
        debug!(
            "Bound {} of {} requested fields",
            fields.len(),
            requests.len()
        );
        Ok(RowBinding { fields })
    }

    pub fn fields(&self) -> &[BoundField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }
}

/// File-side field name in its comparable form.
pub fn normalize_field_name(name: &str) -> String {
    name.trim_start_matches('_').to_lowercase()
}

fn find_field(parent: &ColumnType, requested: &str) -> Option<u32> {
    let requested = requested.to_lowercase();
    parent
        .field_names
        .iter()
        .position(|name| normalize_field_name(name) == requested)
        .map(|index| parent.sub_type_ids[index])
}

fn bind_children(
    metadata: &FileMetadata,
    parent: u32,
    requests: &[FieldRequest],
    options: &ReadOptions,
) -> Result<Vec<BoundField>> {
    let parent_type = metadata.column_type(parent)?;
    let mut fields = Vec::with_capacity(requests.len());

    for request in requests {
        let column = match find_field(parent_type, &request.name) {
            Some(column) => column,
            None if options.ignore_missing_columns => {
                debug!("Skipping missing field {:?}", request.name);
                continue;
            }
            None => {
                return Err(Error::ColumnNotFound(format!(
                    "{} (in column {})",
                    request.name, parent
                )))
            }
        };

        let (shape, children) = match &request.target {
            Target::Value => (Shape::Native, Vec::new()),
            Target::Decimal => (Shape::Decimal, Vec::new()),
            Target::Timestamp => (Shape::Timestamp, Vec::new()),
            Target::Record(sub_requests) => {
                let kind = metadata.column_type(column)?.kind;
                if kind != ColumnKind::Struct {
                    return Err(Error::InvalidBinding(format!(
                        "field {} is {:?}, a record needs a struct column",
                        request.name, kind
                    )));
                }

                let children = bind_children(metadata, column, sub_requests, options)?;
                let shape = Shape::Record(
                    children
                        .iter()
                        .map(|child| ChildColumn::new(child.column, child.shape.clone()))
                        .collect(),
                );
                (shape, children)
            }
        };

        fields.push(BoundField {
            name: request.name.clone(),
            column,
            shape,
            children,
        });
    }

    Ok(fields)
}
