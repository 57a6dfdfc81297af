//! Record insertion and replacement.

use crate::store::TableData;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::cmp::Ordering;
use trellis_core::{Error, Result, Value};

enum Mode {
    Insert,
    /// Replace the row at this position.
    Replace(usize),
}

/// A record in progress: begin with [`crate::Table::insert`] or
/// [`crate::Cursor::replace`], set column values, then commit with
/// [`RecordWriter::insert`]. Nothing is visible to cursors until commit.
pub struct RecordWriter {
    table: Rc<RefCell<TableData>>,
    values: Vec<Value>,
    mode: Mode,
}

impl RecordWriter {
    pub(crate) fn for_insert(table: Rc<RefCell<TableData>>) -> Self {
        let column_count = table.borrow().spec.column_count();
        Self {
            table,
            values: alloc::vec![Value::Null; column_count],
            mode: Mode::Insert,
        }
    }

    pub(crate) fn for_replace(table: Rc<RefCell<TableData>>, pos: usize) -> Self {
        let values = table.borrow().rows[pos].clone();
        Self {
            table,
            values,
            mode: Mode::Replace(pos),
        }
    }

    /// Sets one column of the record in progress.
    pub fn set(&mut self, column: usize, value: Value) -> Result<()> {
        let table = self.table.borrow();
        let spec = table
            .spec
            .columns()
            .get(column)
            .ok_or_else(|| Error::column_not_found(table.spec.name(), format_column(column)))?;
        if let Some(value_type) = value.data_type() {
            if !value_type.is_storable() {
                return Err(Error::invalid_operation(
                    "record values cannot be stored in a column",
                ));
            }
            if let Some(expected) = spec.data_type() {
                if expected != value_type {
                    return Err(Error::type_mismatch(expected, Some(value_type)));
                }
            }
        }
        drop(table);
        self.values[column] = value;
        Ok(())
    }

    /// Commits the record: null checks run, then the row lands in key order
    /// (keyed tables) or at the end (unkeyed tables).
    pub fn insert(self) -> Result<()> {
        let mut table = self.table.borrow_mut();
        for (i, spec) in table.spec.columns().iter().enumerate() {
            if self.values[i].is_null() && !spec.is_nullable() {
                return Err(Error::null_constraint(String::from(spec.name())));
            }
        }

        if let Mode::Replace(pos) = self.mode {
            table.rows.remove(pos);
        }

        if table.key_positions.is_empty() {
            table.rows.push(self.values);
            return Ok(());
        }

        let key: Vec<&Value> = table.key_positions.iter().map(|&i| &self.values[i]).collect();
        let idx = table
            .rows
            .partition_point(|row| compare_to_key(row, &key, &table.key_positions) == Ordering::Less);
        if idx < table.rows.len()
            && compare_to_key(&table.rows[idx], &key, &table.key_positions) == Ordering::Equal
        {
            return Err(Error::unique_constraint(String::from(table.spec.name())));
        }
        table.rows.insert(idx, self.values);
        Ok(())
    }
}

/// Compares a stored row's key tuple against a candidate key.
fn compare_to_key(row: &[Value], key: &[&Value], key_positions: &[usize]) -> Ordering {
    for (&pos, &candidate) in key_positions.iter().zip(key) {
        let ord = row[pos].cmp(candidate);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn format_column(column: usize) -> String {
    alloc::format!("#{}", column)
}
