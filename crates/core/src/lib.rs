//! Trellis Core - Value, type and error definitions for the Trellis query engine.
//!
//! This crate provides the foundational types shared by the store and the
//! query compiler:
//!
//! - `DataType`: Supported column types (Boolean, Int32, Int64, Float64, String, Bytes, Record)
//! - `Value`: Runtime values, including the `Record` composite built by projections
//! - `Error`: Error types for translation, evaluation and storage operations
//!
//! # Example
//!
//! ```rust
//! use trellis_core::{DataType, Record, Value};
//!
//! let row = Record::new(vec![
//!     ("id".into(), Value::Int64(1)),
//!     ("name".into(), Value::String("Alice".into())),
//! ]);
//!
//! assert_eq!(row.get("id"), Some(&Value::Int64(1)));
//! assert_eq!(Value::Record(row).data_type(), Some(DataType::Record));
//! ```

#![no_std]

extern crate alloc;

mod error;
mod types;
mod value;

pub use error::{Error, Result};
pub use types::DataType;
pub use value::{Record, Value};
