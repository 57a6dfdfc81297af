//! Data type definitions for the Trellis query engine.

/// Supported data types for values flowing through the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Boolean type (true/false)
    Boolean,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 64-bit floating point number
    Float64,
    /// UTF-8 string
    String,
    /// Binary data
    Bytes,
    /// Composite value built by a projection; not storable in a column.
    Record,
}

impl DataType {
    /// Returns whether values of this type can live in a store column.
    pub fn is_storable(&self) -> bool {
        !matches!(self, DataType::Record)
    }

    /// Returns whether this type can be used as an index key.
    pub fn is_indexable(&self) -> bool {
        !matches!(self, DataType::Bytes | DataType::Record)
    }
}
