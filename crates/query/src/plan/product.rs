use trellis_core::Result;

use super::{Operator, OperatorMap, OperatorRef, PlanRef};

/// Cross product of two sources, outer-major: the inner source is rescanned
/// once per outer row. Empty on either side means an empty product.
pub struct ProductPlan {
    pub outer: PlanRef,
    pub inner: PlanRef,
}

pub(super) fn compile(plan: &ProductPlan, om: &mut OperatorMap) -> Result<ProductOp> {
    let outer = om.demand(&plan.outer)?;
    let inner = om.demand(&plan.inner)?;
    let outer_live = outer.borrow_mut().advance()?;
    Ok(ProductOp {
        outer,
        inner,
        outer_live,
    })
}

pub struct ProductOp {
    outer: OperatorRef,
    inner: OperatorRef,
    // whether the outer operator is positioned on a row
    outer_live: bool,
}

impl Operator for ProductOp {
    fn advance(&mut self) -> Result<bool> {
        if !self.outer_live {
            return Ok(false);
        }
        if self.inner.borrow_mut().advance()? {
            return Ok(true);
        }
        loop {
            if !self.outer.borrow_mut().advance()? {
                self.outer_live = false;
                return Ok(false);
            }
            self.inner.borrow_mut().reset()?;
            if self.inner.borrow_mut().advance()? {
                return Ok(true);
            }
        }
    }

    fn reset(&mut self) -> Result<()> {
        self.outer.borrow_mut().reset()?;
        self.inner.borrow_mut().reset()?;
        self.outer_live = self.outer.borrow_mut().advance()?;
        Ok(())
    }
}
