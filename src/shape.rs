use crate::constant::ColumnType;
use crate::error::{Error, Result};
use crate::metadata::ColumnMetadata;

/// The declared shape of one expected column.
///
/// A shape names the derived column type and, optionally, the column name
/// and signedness. Columns are expected NOT NULL unless marked
/// [`nullable`](ColumnShape::nullable), mirroring how callers map rows onto
/// plain versus optional fields.
///
/// Name checks compare against server metadata, so they need
/// [`MetadataMode::Full`](crate::MetadataMode::Full); in minimal mode leave
/// the name undeclared.
#[derive(Debug, Clone)]
pub struct ColumnShape {
    name: Option<String>,
    column_type: ColumnType,
    nullable: bool,
    unsigned: Option<bool>,
}

impl ColumnShape {
    pub fn new(column_type: ColumnType) -> Self {
        Self {
            name: None,
            column_type,
            nullable: false,
            unsigned: None,
        }
    }

    pub fn named(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(column_type)
        }
    }

    /// Accept columns that may hold NULL.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Require the unsigned flag.
    pub fn unsigned(mut self) -> Self {
        self.unsigned = Some(true);
        self
    }

    /// Require the unsigned flag to be absent.
    pub fn signed(mut self) -> Self {
        self.unsigned = Some(false);
        self
    }
}

/// Check one resultset's metadata against a declared row shape.
pub fn check_meta(meta: &[ColumnMetadata], expected: &[ColumnShape]) -> Result<()> {
    if meta.len() != expected.len() {
        return Err(Error::MetadataCheckFailed(format!(
            "expected {} columns, the resultset has {}",
            expected.len(),
            meta.len()
        )));
    }
    for (index, (column, shape)) in meta.iter().zip(expected).enumerate() {
        check_column(index, column, shape)?;
    }
    Ok(())
}

fn check_column(index: usize, column: &ColumnMetadata, shape: &ColumnShape) -> Result<()> {
    let fail = |reason: String| Err(Error::MetadataCheckFailed(reason));

    if let Some(name) = &shape.name {
        if column.column_name() != name {
            return fail(format!(
                "column {index}: expected name '{name}', the server sent '{}'",
                column.column_name()
            ));
        }
    }
    if column.column_type() != shape.column_type {
        return fail(format!(
            "column {index}: expected type {:?}, the server sent {:?}",
            shape.column_type,
            column.column_type()
        ));
    }
    if !shape.nullable && !column.is_not_null() {
        return fail(format!(
            "column {index}: declared non-nullable but the database column may hold NULL"
        ));
    }
    if let Some(unsigned) = shape.unsigned {
        if column.is_unsigned() != unsigned {
            return fail(format!(
                "column {index}: signedness does not match the declaration"
            ));
        }
    }
    Ok(())
}
