//! Column and table specifications.

use alloc::string::String;
use alloc::vec::Vec;
use trellis_core::DataType;

/// Specification of a single column.
///
/// A column may be dynamically typed (`data_type` of `None`), which temp
/// tables use when the type of a projected value cannot be inferred at
/// translation time. Key columns, in declaration order, form the table key.
#[derive(Clone, Debug)]
pub struct ColumnSpec {
    name: String,
    data_type: Option<DataType>,
    key: bool,
    nullable: bool,
}

impl ColumnSpec {
    /// Creates a typed, non-key, non-nullable column.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type: Some(data_type),
            key: false,
            nullable: false,
        }
    }

    /// Creates a dynamically typed column. Any storable value is accepted.
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
            key: false,
            nullable: false,
        }
    }

    /// Marks this column as part of the table key.
    pub fn key(mut self) -> Self {
        self.key = true;
        self
    }

    /// Marks this column as nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Returns the column name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared type, or None if dynamically typed.
    #[inline]
    pub fn data_type(&self) -> Option<DataType> {
        self.data_type
    }

    /// Returns whether this column is part of the table key.
    #[inline]
    pub fn is_key(&self) -> bool {
        self.key
    }

    /// Returns whether this column accepts nulls.
    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// Specification of a table: a name and an ordered list of columns.
#[derive(Clone, Debug)]
pub struct TableSpec {
    name: String,
    columns: Vec<ColumnSpec>,
}

impl TableSpec {
    /// Creates a new table specification.
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSpec>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Returns the table name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the columns in declaration order.
    #[inline]
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Returns the number of columns.
    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Gets a column position by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    /// Returns the positions of the key columns, in declaration order.
    pub fn key_positions(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_key())
            .map(|(i, _)| i)
            .collect()
    }

    /// Returns whether the table has a key.
    pub fn is_keyed(&self) -> bool {
        self.columns.iter().any(|c| c.is_key())
    }
}
