//! Trellis Store - Cursor-based in-memory record store.
//!
//! This crate provides the storage collaborator consumed by the query engine:
//!
//! - `schema`: Column and table specifications (`ColumnSpec`, `TableSpec`)
//! - `Store`: Table registry and temporary table factory
//! - `Table`: A single table; keyed tables keep rows sorted by their key tuple
//! - `Cursor`: Shared-position scrolling over a table's rows
//! - `RecordWriter`: Begin/set/commit record insertion and replacement
//!
//! Execution is single-threaded; handles are cheap `Rc` clones and every
//! resource is released when its last handle drops.
//!
//! # Example
//!
//! ```rust
//! use trellis_core::{DataType, Value};
//! use trellis_store::{ColumnSpec, Store, TableSpec};
//!
//! let store = Store::new();
//! let table = store
//!     .create_table(TableSpec::new(
//!         "items",
//!         vec![
//!             ColumnSpec::new("id", DataType::Int64).key(),
//!             ColumnSpec::new("name", DataType::String),
//!         ],
//!     ))
//!     .unwrap();
//!
//! table.insert_row(vec![Value::Int64(1), Value::String("widget".into())]).unwrap();
//!
//! let mut cursor = table.cursor();
//! assert!(cursor.move_by(1));
//! assert_eq!(cursor.retrieve(1).unwrap(), Value::String("widget".into()));
//! ```

#![no_std]

extern crate alloc;

mod cursor;
mod record;
mod schema;
mod store;

pub use cursor::Cursor;
pub use record::RecordWriter;
pub use schema::{ColumnSpec, TableSpec};
pub use store::{Store, Table};
