use alloc::vec::Vec;

use trellis_core::{Result, Value};
use trellis_store::{ColumnSpec, Cursor, Store, Table};

use super::{Operator, OperatorMap, OperatorRef, PlanRef};
use crate::writer::{Writer, WriterPlanRef};

/// Materializes the source rows into an anonymous temp table, then scans
/// the copy. With `sorted` set, the temp table's key columns order the
/// copy, and a trailing sequence column keeps equal keys in arrival order.
/// The source is drained on the first advance and released.
pub struct SpoolPlan {
    pub src: PlanRef,
    pub store: Store,
    pub columns: Vec<ColumnSpec>,
    pub writer: WriterPlanRef,
    pub sorted: bool,
}

pub(super) fn compile(plan: &SpoolPlan, om: &mut OperatorMap) -> Result<SpoolOp> {
    let child = om.demand(&plan.src)?;
    let writer = plan.writer.to_writer(om)?;
    let table = plan.store.create_temp_table(plan.columns.clone());
    let cursor = table.cursor();
    let seq_column = plan.sorted.then(|| plan.columns.len() - 1);
    Ok(SpoolOp {
        input: Some((child, writer)),
        table,
        cursor,
        seq_column,
        next_seq: 0,
        built: false,
    })
}

pub struct SpoolOp {
    input: Option<(OperatorRef, Writer)>,
    table: Table,
    cursor: Cursor,
    // position of the arrival-order column, when sorting
    seq_column: Option<usize>,
    next_seq: i64,
    built: bool,
}

impl SpoolOp {
    fn populate(&mut self) -> Result<()> {
        if self.built {
            return Ok(());
        }
        if let Some((child, writer)) = self.input.take() {
            loop {
                let advanced = child.borrow_mut().advance()?;
                if !advanced {
                    break;
                }
                let mut rec = self.table.insert();
                writer.write(&mut rec)?;
                if let Some(seq) = self.seq_column {
                    rec.set(seq, Value::Int64(self.next_seq))?;
                    self.next_seq += 1;
                }
                rec.insert()?;
            }
            log::debug!("spooled {} rows into {}", self.table.len(), self.table.name());
        }
        self.built = true;
        Ok(())
    }
}

impl Operator for SpoolOp {
    fn advance(&mut self) -> Result<bool> {
        self.populate()?;
        Ok(self.cursor.move_by(1))
    }

    fn reset(&mut self) -> Result<()> {
        self.cursor.rewind();
        Ok(())
    }

    fn cursor(&self) -> Option<Cursor> {
        Some(self.cursor.clone())
    }
}
