//! Error types for the Trellis query engine.

use crate::types::DataType;
use alloc::string::String;
use core::fmt;

/// Result type alias for Trellis operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for translation, evaluation and storage operations.
#[derive(Debug)]
pub enum Error {
    /// Type mismatch when writing a value into a typed column.
    TypeMismatch {
        expected: DataType,
        got: Option<DataType>,
    },
    /// Null written into a non-nullable column.
    NullConstraint {
        column: String,
    },
    /// Duplicate key inserted into a keyed table.
    UniqueConstraint {
        table: String,
    },
    /// Table not found in the store.
    TableNotFound {
        name: String,
    },
    /// Column not found in a table.
    ColumnNotFound {
        table: String,
        column: String,
    },
    /// Cursor is not positioned on a row.
    CursorNotPositioned,
    /// The translator has no rule for an expression node.
    UnsupportedExpression {
        kind: String,
    },
    /// A lambda parameter is not bound in the lexical environment.
    UnknownParameter {
        name: String,
    },
    /// A record has no field with the requested name.
    FieldNotFound {
        field: String,
    },
    /// The scalar evaluator has no rule for a binary operator / operand combination.
    UnsupportedBinaryOp {
        op: &'static str,
        left: Option<DataType>,
        right: Option<DataType>,
    },
    /// A plan was referenced during calc binding without ever being compiled.
    /// This is a bug in the plan compiler, not a user-facing condition.
    PlanNotCompiled,
    /// Invalid operation.
    InvalidOperation {
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TypeMismatch { expected, got } => {
                write!(f, "Type mismatch: expected {:?}, got {:?}", expected, got)
            }
            Error::NullConstraint { column } => {
                write!(f, "Null constraint violation on column: {}", column)
            }
            Error::UniqueConstraint { table } => {
                write!(f, "Unique key violation in table: {}", table)
            }
            Error::TableNotFound { name } => {
                write!(f, "Table not found: {}", name)
            }
            Error::ColumnNotFound { table, column } => {
                write!(f, "Column {} not found in table {}", column, table)
            }
            Error::CursorNotPositioned => {
                write!(f, "Cursor is not positioned on a row")
            }
            Error::UnsupportedExpression { kind } => {
                write!(f, "No translation rule for expression: {}", kind)
            }
            Error::UnknownParameter { name } => {
                write!(f, "Parameter not bound in this scope: {}", name)
            }
            Error::FieldNotFound { field } => {
                write!(f, "Record has no field named {}", field)
            }
            Error::UnsupportedBinaryOp { op, left, right } => {
                write!(
                    f,
                    "No evaluation rule for operator {} over {:?} and {:?}",
                    op, left, right
                )
            }
            Error::PlanNotCompiled => {
                write!(f, "Plan referenced without being compiled (compiler bug)")
            }
            Error::InvalidOperation { message } => {
                write!(f, "Invalid operation: {}", message)
            }
        }
    }
}

impl Error {
    /// Creates a type mismatch error.
    pub fn type_mismatch(expected: DataType, got: Option<DataType>) -> Self {
        Error::TypeMismatch { expected, got }
    }

    /// Creates a null constraint error.
    pub fn null_constraint(column: impl Into<String>) -> Self {
        Error::NullConstraint {
            column: column.into(),
        }
    }

    /// Creates a unique key violation error.
    pub fn unique_constraint(table: impl Into<String>) -> Self {
        Error::UniqueConstraint {
            table: table.into(),
        }
    }

    /// Creates a table not found error.
    pub fn table_not_found(name: impl Into<String>) -> Self {
        Error::TableNotFound { name: name.into() }
    }

    /// Creates a column not found error.
    pub fn column_not_found(table: impl Into<String>, column: impl Into<String>) -> Self {
        Error::ColumnNotFound {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Creates an unsupported expression error naming the offending node.
    pub fn unsupported_expression(kind: impl Into<String>) -> Self {
        Error::UnsupportedExpression { kind: kind.into() }
    }

    /// Creates an unknown parameter error.
    pub fn unknown_parameter(name: impl Into<String>) -> Self {
        Error::UnknownParameter { name: name.into() }
    }

    /// Creates a field not found error.
    pub fn field_not_found(field: impl Into<String>) -> Self {
        Error::FieldNotFound {
            field: field.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation {
            message: message.into(),
        }
    }
}
