use alloc::vec::Vec;

use hashbrown::HashSet;
use trellis_core::{Error, Result, Value};

use super::{Operator, OperatorMap, OperatorRef, PlanRef};
use crate::calc::{Calc, CalcPlanRef};

/// Distinct values of a calculation over the source rows, kept in first
/// occurrence order. The source is drained on the first advance and
/// released; resets replay the collected values.
pub struct HashDistinctPlan {
    pub src: PlanRef,
    pub value: CalcPlanRef,
}

pub(super) fn compile(plan: &HashDistinctPlan, om: &mut OperatorMap) -> Result<DistinctOp> {
    let child = om.demand(&plan.src)?;
    let value = plan.value.to_calc(om)?;
    Ok(DistinctOp {
        input: Some((child, value)),
        rows: Vec::new(),
        built: false,
        pos: -1,
    })
}

pub struct DistinctOp {
    input: Option<(OperatorRef, Calc)>,
    rows: Vec<Value>,
    built: bool,
    pos: isize,
}

impl DistinctOp {
    fn populate(&mut self) -> Result<()> {
        if self.built {
            return Ok(());
        }
        let (child, value) = self
            .input
            .take()
            .ok_or_else(|| Error::invalid_operation("distinct input already released"))?;
        let mut seen = HashSet::new();
        loop {
            let advanced = child.borrow_mut().advance()?;
            if !advanced {
                break;
            }
            let v = value.eval()?;
            if seen.insert(v.clone()) {
                self.rows.push(v);
            }
        }
        log::debug!("distinct collected {} values", self.rows.len());
        self.built = true;
        Ok(())
    }
}

impl Operator for DistinctOp {
    fn advance(&mut self) -> Result<bool> {
        self.populate()?;
        if (self.pos + 1) as usize >= self.rows.len() {
            self.pos = self.rows.len() as isize;
            return Ok(false);
        }
        self.pos += 1;
        Ok(true)
    }

    fn reset(&mut self) -> Result<()> {
        self.pos = -1;
        Ok(())
    }

    fn current(&self) -> Result<Value> {
        if self.pos >= 0 && (self.pos as usize) < self.rows.len() {
            Ok(self.rows[self.pos as usize].clone())
        } else {
            Err(Error::CursorNotPositioned)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::vec;
    use trellis_core::DataType;
    use trellis_store::{ColumnSpec, Store, TableSpec};

    use crate::calc::CalcPlan;
    use crate::plan::{Plan, ScanPlan};

    fn distinct_over(values: &[f64]) -> (OperatorMap, DistinctOp) {
        let store = Store::new();
        let table = store
            .create_table(TableSpec::new(
                "t",
                vec![ColumnSpec::new("v", DataType::Float64)],
            ))
            .unwrap();
        for v in values {
            table.insert_row(vec![Value::Float64(*v)]).unwrap();
        }
        let scan: PlanRef = Rc::new(Plan::Scan(ScanPlan { table }));
        let value: CalcPlanRef = Rc::new(CalcPlan::Retrieve {
            plan: scan.clone(),
            column: 0,
        });
        let mut om = OperatorMap::new();
        let op = compile(&HashDistinctPlan { src: scan, value }, &mut om).unwrap();
        (om, op)
    }

    #[test]
    fn test_distinct_keeps_first_occurrence_order() {
        let (_om, mut op) = distinct_over(&[2.0, 1.0, 2.0, 3.0, 1.0]);
        let mut seen = vec![];
        while op.advance().unwrap() {
            seen.push(op.current().unwrap());
        }
        assert_eq!(
            seen,
            vec![Value::Float64(2.0), Value::Float64(1.0), Value::Float64(3.0)]
        );
    }

    #[test]
    fn test_distinct_replays_after_reset() {
        let (_om, mut op) = distinct_over(&[1.0, 1.0]);
        assert!(op.advance().unwrap());
        assert!(!op.advance().unwrap());
        op.reset().unwrap();
        assert!(op.advance().unwrap());
        assert_eq!(op.current().unwrap(), Value::Float64(1.0));
    }

    #[test]
    fn test_current_off_row_is_an_error() {
        let (_om, op) = distinct_over(&[1.0]);
        assert!(matches!(
            op.current().unwrap_err(),
            Error::CursorNotPositioned
        ));
    }
}
