use alloc::vec::Vec;

use hashbrown::HashMap;
use trellis_core::{Error, Result, Value};

use super::{Operator, OperatorMap, OperatorRef, PlanRef};
use crate::calc::{Calc, CalcPlanRef};

/// Hash equijoin. The inner source is drained into a key → values multimap
/// on the first advance and released; the outer source is then probed row
/// by row, in order, yielding one position per matching inner value.
/// Unmatched outer rows produce nothing.
pub struct HashJoinPlan {
    pub inner: PlanRef,
    pub inner_key: CalcPlanRef,
    pub inner_value: CalcPlanRef,
    pub outer: PlanRef,
    pub outer_key: CalcPlanRef,
}

pub(super) fn compile(plan: &HashJoinPlan, om: &mut OperatorMap) -> Result<JoinOp> {
    let inner = om.demand(&plan.inner)?;
    let inner_key = plan.inner_key.to_calc(om)?;
    let inner_value = plan.inner_value.to_calc(om)?;
    let outer = om.demand(&plan.outer)?;
    let outer_key = plan.outer_key.to_calc(om)?;
    Ok(JoinOp {
        build_input: Some((inner, inner_key, inner_value)),
        table: HashMap::new(),
        built: false,
        outer,
        outer_key,
        bucket: Vec::new(),
        pos: 0,
    })
}

pub struct JoinOp {
    build_input: Option<(OperatorRef, Calc, Calc)>,
    table: HashMap<Value, Vec<Value>>,
    built: bool,
    outer: OperatorRef,
    outer_key: Calc,
    // inner values matching the current outer row
    bucket: Vec<Value>,
    pos: usize,
}

impl JoinOp {
    fn populate(&mut self) -> Result<()> {
        if self.built {
            return Ok(());
        }
        let (inner, inner_key, inner_value) = self
            .build_input
            .take()
            .ok_or_else(|| Error::invalid_operation("join build input already released"))?;
        loop {
            let advanced = inner.borrow_mut().advance()?;
            if !advanced {
                break;
            }
            let key = inner_key.eval()?;
            let value = inner_value.eval()?;
            self.table.entry(key).or_insert_with(Vec::new).push(value);
        }
        log::debug!("join built {} key buckets", self.table.len());
        self.built = true;
        Ok(())
    }
}

impl Operator for JoinOp {
    fn advance(&mut self) -> Result<bool> {
        self.populate()?;
        if !self.bucket.is_empty() && self.pos + 1 < self.bucket.len() {
            self.pos += 1;
            return Ok(true);
        }
        loop {
            let advanced = self.outer.borrow_mut().advance()?;
            if !advanced {
                self.bucket.clear();
                return Ok(false);
            }
            let key = self.outer_key.eval()?;
            if let Some(values) = self.table.get(&key) {
                self.bucket = values.clone();
                self.pos = 0;
                return Ok(true);
            }
        }
    }

    fn reset(&mut self) -> Result<()> {
        self.outer.borrow_mut().reset()?;
        self.bucket.clear();
        self.pos = 0;
        Ok(())
    }

    /// The inner value matched to the current outer row.
    fn current(&self) -> Result<Value> {
        self.bucket
            .get(self.pos)
            .cloned()
            .ok_or(Error::CursorNotPositioned)
    }
}
