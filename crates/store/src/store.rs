//! Table registry and table handles.

use crate::cursor::Cursor;
use crate::record::RecordWriter;
use crate::schema::{ColumnSpec, TableSpec};
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use trellis_core::{Error, Result, Value};

/// Backing data of a single table. Rows of keyed tables are kept sorted by
/// the key tuple at all times.
pub(crate) struct TableData {
    pub(crate) spec: TableSpec,
    pub(crate) rows: Vec<Vec<Value>>,
    /// Cached `spec.key_positions()`.
    pub(crate) key_positions: Vec<usize>,
}

impl TableData {
    pub(crate) fn new(spec: TableSpec) -> Self {
        let key_positions = spec.key_positions();
        Self {
            spec,
            rows: Vec::new(),
            key_positions,
        }
    }
}

/// A handle to a single table. Cloning shares the same backing data; the
/// table is freed when the last handle drops.
#[derive(Clone)]
pub struct Table {
    pub(crate) data: Rc<RefCell<TableData>>,
}

impl Table {
    fn new(spec: TableSpec) -> Self {
        Self {
            data: Rc::new(RefCell::new(TableData::new(spec))),
        }
    }

    /// Returns a copy of the table specification.
    pub fn spec(&self) -> TableSpec {
        self.data.borrow().spec.clone()
    }

    /// Returns the table name.
    pub fn name(&self) -> String {
        self.data.borrow().spec.name().into()
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.data.borrow().rows.len()
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Opens a cursor positioned immediately before the first row.
    pub fn cursor(&self) -> Cursor {
        Cursor::new(self.data.clone())
    }

    /// Begins an insert. Column values are set on the returned writer and
    /// committed with [`RecordWriter::insert`].
    pub fn insert(&self) -> RecordWriter {
        RecordWriter::for_insert(self.data.clone())
    }

    /// Inserts a full row given positionally, validating against the spec.
    pub fn insert_row(&self, values: Vec<Value>) -> Result<()> {
        let column_count = self.data.borrow().spec.column_count();
        if values.len() != column_count {
            return Err(Error::invalid_operation(format!(
                "row has {} values but table {} has {} columns",
                values.len(),
                self.name(),
                column_count
            )));
        }
        let mut writer = self.insert();
        for (i, value) in values.into_iter().enumerate() {
            writer.set(i, value)?;
        }
        writer.insert()
    }
}

struct StoreInner {
    tables: BTreeMap<String, Table>,
    temp_seq: u64,
}

/// The table registry and temporary table factory. Cloning shares the store.
#[derive(Clone)]
pub struct Store {
    inner: Rc<RefCell<StoreInner>>,
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(StoreInner {
                tables: BTreeMap::new(),
                temp_seq: 0,
            })),
        }
    }

    /// Creates a named table from a specification.
    pub fn create_table(&self, spec: TableSpec) -> Result<Table> {
        let mut inner = self.inner.borrow_mut();
        let name = String::from(spec.name());
        if inner.tables.contains_key(&name) {
            return Err(Error::invalid_operation(format!(
                "table {} already exists",
                name
            )));
        }
        log::debug!("create table {}", name);
        let table = Table::new(spec);
        inner.tables.insert(name, table.clone());
        Ok(table)
    }

    /// Looks up a named table.
    pub fn table(&self, name: &str) -> Result<Table> {
        self.inner
            .borrow()
            .tables
            .get(name)
            .cloned()
            .ok_or_else(|| Error::table_not_found(name))
    }

    /// Creates an anonymous temporary table. The table is not registered by
    /// name and is freed when the last handle to it drops.
    pub fn create_temp_table(&self, columns: Vec<ColumnSpec>) -> Table {
        let mut inner = self.inner.borrow_mut();
        inner.temp_seq += 1;
        let name = format!("#temp{}", inner.temp_seq);
        log::debug!("create temp table {} ({} columns)", name, columns.len());
        Table::new(TableSpec::new(name, columns))
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
