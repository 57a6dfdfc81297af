//! Row ↔ record mapping.
//!
//! A `RowBridge` pairs the field names of a composite `Value::Record` with
//! column positions in a table, so whole rows can be read off a cursor or
//! written through a `RecordWriter` without per-field lookups.

use alloc::string::String;
use alloc::vec::Vec;

use trellis_core::{Error, Record, Result, Value};
use trellis_store::{Cursor, RecordWriter, Table, TableSpec};

/// Name-to-position registry for a table's columns.
#[derive(Clone, Debug)]
pub struct RowBridge {
    fields: Vec<(String, usize)>,
}

impl RowBridge {
    /// Builds a bridge covering every column of `spec`, in column order.
    pub fn from_spec(spec: &TableSpec) -> RowBridge {
        let fields = spec
            .columns()
            .iter()
            .enumerate()
            .map(|(i, c)| (String::from(c.name()), i))
            .collect();
        RowBridge { fields }
    }

    /// Reads the current row off `cursor` as a composite record value.
    pub fn read(&self, cursor: &Cursor) -> Result<Value> {
        let mut fields = Vec::with_capacity(self.fields.len());
        for (name, pos) in &self.fields {
            fields.push((name.clone(), cursor.retrieve(*pos)?));
        }
        Ok(Value::Record(Record::new(fields)))
    }

    /// Writes the fields of a composite record into `rec`, matching by
    /// bridge field name.
    pub fn write(&self, value: &Value, rec: &mut RecordWriter) -> Result<()> {
        let record = value
            .as_record()
            .ok_or_else(|| Error::type_mismatch(trellis_core::DataType::Record, value.data_type()))?;
        for (name, pos) in &self.fields {
            let field = record
                .get(name)
                .ok_or_else(|| Error::field_not_found(name.clone()))?;
            rec.set(*pos, field.clone())?;
        }
        Ok(())
    }
}

/// Inserts a composite record into `table`, matching fields to columns by
/// name, in the table's column order.
pub fn insert_record(table: &Table, record: &Record) -> Result<()> {
    let bridge = RowBridge::from_spec(&table.spec());
    let mut rec = table.insert();
    bridge.write(&Value::Record(record.clone()), &mut rec)?;
    rec.insert()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use trellis_core::DataType;
    use trellis_store::{ColumnSpec, Store};

    fn sample_store() -> (Store, Table) {
        let store = Store::new();
        let table = store
            .create_table(TableSpec::new(
                "t",
                vec![
                    ColumnSpec::new("a", DataType::Int64).key(),
                    ColumnSpec::new("b", DataType::String),
                ],
            ))
            .unwrap();
        (store, table)
    }

    #[test]
    fn test_insert_and_read_round_trip() {
        let (_store, table) = sample_store();
        let record = Record::new(vec![
            ("a".into(), Value::Int64(7)),
            ("b".into(), Value::String("x".into())),
        ]);
        insert_record(&table, &record).unwrap();

        let mut cursor = table.cursor();
        assert!(cursor.move_by(1));
        let bridge = RowBridge::from_spec(&table.spec());
        let row = bridge.read(&cursor).unwrap();
        assert_eq!(row, Value::Record(record));
    }

    #[test]
    fn test_missing_field_rejected() {
        let (_store, table) = sample_store();
        let record = Record::new(vec![("a".into(), Value::Int64(1))]);
        let err = insert_record(&table, &record).unwrap_err();
        assert!(matches!(err, Error::FieldNotFound { .. }));
    }
}
