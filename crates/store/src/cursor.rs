//! Scrolling cursors over a table's rows.

use crate::record::RecordWriter;
use crate::store::TableData;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use trellis_core::{Error, Result, Value};

struct CursorState {
    table: Rc<RefCell<TableData>>,
    /// -1 is before the first row; `rows.len()` is after the last.
    pos: isize,
}

/// A cursor over a table's rows.
///
/// Cloning shares the position: a calc bound to an operator's cursor observes
/// the operator's movement. A fresh cursor is positioned before the first row.
#[derive(Clone)]
pub struct Cursor {
    state: Rc<RefCell<CursorState>>,
}

impl Cursor {
    pub(crate) fn new(table: Rc<RefCell<TableData>>) -> Self {
        Self {
            state: Rc::new(RefCell::new(CursorState { table, pos: -1 })),
        }
    }

    /// Moves the cursor by `delta` rows (negative moves backward). The
    /// position clamps to before-first / after-last. Returns true if the
    /// cursor lands on a row.
    pub fn move_by(&mut self, delta: isize) -> bool {
        let mut state = self.state.borrow_mut();
        let len = state.table.borrow().rows.len() as isize;
        state.pos = (state.pos + delta).clamp(-1, len);
        state.pos >= 0 && state.pos < len
    }

    /// Positions the cursor on the first row. Returns false on an empty table.
    pub fn move_first(&mut self) -> bool {
        let mut state = self.state.borrow_mut();
        let len = state.table.borrow().rows.len();
        state.pos = 0;
        len > 0
    }

    /// Rewinds to before the first row.
    pub fn rewind(&mut self) {
        self.state.borrow_mut().pos = -1;
    }

    /// Returns true if the cursor is positioned on a row.
    pub fn is_on_row(&self) -> bool {
        let state = self.state.borrow();
        let len = state.table.borrow().rows.len() as isize;
        state.pos >= 0 && state.pos < len
    }

    /// Retrieves the value of one column at the current row.
    pub fn retrieve(&self, column: usize) -> Result<Value> {
        let state = self.state.borrow();
        let table = state.table.borrow();
        let row = table
            .rows
            .get(usize::try_from(state.pos).map_err(|_| Error::CursorNotPositioned)?)
            .ok_or(Error::CursorNotPositioned)?;
        row.get(column).cloned().ok_or_else(|| {
            Error::column_not_found(table.spec.name(), format_column(column))
        })
    }

    /// Reads all column values of the current row.
    pub fn read_row(&self) -> Result<Vec<Value>> {
        let state = self.state.borrow();
        let table = state.table.borrow();
        table
            .rows
            .get(usize::try_from(state.pos).map_err(|_| Error::CursorNotPositioned)?)
            .cloned()
            .ok_or(Error::CursorNotPositioned)
    }

    /// Begins a replacement of the current row. The writer starts from the
    /// existing column values; committing removes the old row and reinserts
    /// in key order.
    pub fn replace(&self) -> Result<RecordWriter> {
        let state = self.state.borrow();
        let pos = usize::try_from(state.pos).map_err(|_| Error::CursorNotPositioned)?;
        if pos >= state.table.borrow().rows.len() {
            return Err(Error::CursorNotPositioned);
        }
        Ok(RecordWriter::for_replace(state.table.clone(), pos))
    }
}

fn format_column(column: usize) -> alloc::string::String {
    alloc::format!("#{}", column)
}

#[cfg(test)]
mod tests {
    use crate::schema::{ColumnSpec, TableSpec};
    use crate::store::Store;
    use alloc::vec;
    use trellis_core::{DataType, Error, Value};

    fn table_with(values: &[i64]) -> crate::store::Table {
        let store = Store::new();
        let table = store
            .create_table(TableSpec::new(
                "t",
                vec![ColumnSpec::new("v", DataType::Int64)],
            ))
            .unwrap();
        for v in values {
            table.insert_row(vec![Value::Int64(*v)]).unwrap();
        }
        table
    }

    #[test]
    fn test_fresh_cursor_is_before_first() {
        let table = table_with(&[10, 20]);
        let cursor = table.cursor();
        assert!(!cursor.is_on_row());
        assert!(matches!(
            cursor.retrieve(0),
            Err(Error::CursorNotPositioned)
        ));
    }

    #[test]
    fn test_forward_and_backward_movement() {
        let table = table_with(&[10, 20, 30]);
        let mut cursor = table.cursor();
        assert!(cursor.move_by(1));
        assert_eq!(cursor.retrieve(0).unwrap(), Value::Int64(10));
        assert!(cursor.move_by(2));
        assert_eq!(cursor.retrieve(0).unwrap(), Value::Int64(30));
        assert_eq!(cursor.read_row().unwrap(), vec![Value::Int64(30)]);
        assert!(!cursor.move_by(1)); // after last
        assert!(cursor.move_by(-1));
        assert_eq!(cursor.retrieve(0).unwrap(), Value::Int64(30));
    }

    #[test]
    fn test_position_clamps() {
        let table = table_with(&[10]);
        let mut cursor = table.cursor();
        assert!(!cursor.move_by(-5));
        assert!(cursor.move_by(1));
        assert!(!cursor.move_by(100));
        // a single step back lands on the last row again
        assert!(cursor.move_by(-1));
    }

    #[test]
    fn test_rewind_and_move_first() {
        let table = table_with(&[10, 20]);
        let mut cursor = table.cursor();
        assert!(cursor.move_first());
        assert_eq!(cursor.retrieve(0).unwrap(), Value::Int64(10));
        cursor.rewind();
        assert!(!cursor.is_on_row());
        assert!(cursor.move_by(1));
        assert_eq!(cursor.retrieve(0).unwrap(), Value::Int64(10));
    }

    #[test]
    fn test_clones_share_position() {
        let table = table_with(&[10, 20]);
        let mut cursor = table.cursor();
        let reader = cursor.clone();
        assert!(cursor.move_by(2));
        assert_eq!(reader.retrieve(0).unwrap(), Value::Int64(20));
    }

    #[test]
    fn test_replace_current_row() {
        let table = table_with(&[10, 20]);
        let mut cursor = table.cursor();
        assert!(cursor.move_by(1));
        let mut writer = cursor.replace().unwrap();
        writer.set(0, Value::Int64(11)).unwrap();
        writer.insert().unwrap();

        let mut check = table.cursor();
        assert!(check.move_by(1));
        assert_eq!(check.retrieve(0).unwrap(), Value::Int64(11));
    }
}
