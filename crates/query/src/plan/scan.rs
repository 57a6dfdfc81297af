use trellis_core::Result;
use trellis_store::{Cursor, Table};

use super::Operator;

/// Full scan over a table, in key order for keyed tables and insertion
/// order otherwise.
pub struct ScanPlan {
    pub table: Table,
}

pub(super) fn compile(plan: &ScanPlan) -> ScanOp {
    ScanOp {
        cursor: plan.table.cursor(),
    }
}

pub struct ScanOp {
    cursor: Cursor,
}

impl Operator for ScanOp {
    fn advance(&mut self) -> Result<bool> {
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
