use trellis_core::{Result, Value};
use trellis_store::Cursor;

use super::{Operator, OperatorMap, OperatorRef, PlanRef};
use crate::calc::{Calc, CalcPlanRef};

/// Keeps only the source rows for which the predicate evaluates to true.
pub struct FilterPlan {
    pub src: PlanRef,
    pub predicate: CalcPlanRef,
}

pub(super) fn compile(plan: &FilterPlan, om: &mut OperatorMap) -> Result<FilterOp> {
    let child = om.demand(&plan.src)?;
    let predicate = plan.predicate.to_calc(om)?;
    Ok(FilterOp { child, predicate })
}

pub struct FilterOp {
    child: OperatorRef,
    predicate: Calc,
}

impl Operator for FilterOp {
    fn advance(&mut self) -> Result<bool> {
        loop {
            let advanced = self.child.borrow_mut().advance()?;
            if !advanced {
                return Ok(false);
            }
            if matches!(self.predicate.eval()?, Value::Boolean(true)) {
                return Ok(true);
            }
        }
    }

    fn reset(&mut self) -> Result<()> {
        self.child.borrow_mut().reset()
    }

    fn cursor(&self) -> Option<Cursor> {
        self.child.borrow().cursor()
    }

    fn current(&self) -> Result<Value> {
        self.child.borrow().current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::vec;
    use trellis_core::DataType;
    use trellis_store::{ColumnSpec, Store, TableSpec};

    use crate::ast::BinaryOp;
    use crate::calc::CalcPlan;
    use crate::plan::{Plan, ScanPlan};

    #[test]
    fn test_filter_skips_non_matching_rows() {
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
        for (a, b) in [(1, "x"), (2, "y"), (3, "x"), (4, "x")] {
            table
                .insert_row(vec![Value::Int64(a), Value::String(b.into())])
                .unwrap();
        }

        let scan: PlanRef = Rc::new(Plan::Scan(ScanPlan { table }));
        let predicate: CalcPlanRef = Rc::new(CalcPlan::Binary {
            op: BinaryOp::Eq,
            left: Rc::new(CalcPlan::Retrieve {
                plan: scan.clone(),
                column: 1,
            }),
            right: Rc::new(CalcPlan::Constant(Value::String("x".into()))),
        });
        let filter: PlanRef = Rc::new(Plan::Filter(FilterPlan {
            src: scan,
            predicate,
        }));

        let mut om = OperatorMap::new();
        let op = om.demand(&filter).unwrap();
        let mut seen = vec![];
        loop {
            let advanced = op.borrow_mut().advance().unwrap();
            if !advanced {
                break;
            }
            let cursor = op.borrow().cursor().unwrap();
            seen.push(cursor.retrieve(0).unwrap());
        }
        assert_eq!(
            seen,
            vec![Value::Int64(1), Value::Int64(3), Value::Int64(4)]
        );
    }
}
