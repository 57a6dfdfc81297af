//! Query construction and execution.

use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;

use trellis_core::{Error, Result, Value};
use trellis_store::Store;

use crate::ast::{Expr, QueryOp};
use crate::calc::Calc;
use crate::plan::{OperatorMap, OperatorRef, Plan, PlanRef, ScanPlan};
use crate::translator::{translate, Channel, Downstream};

/// A composable query over a store.
///
/// A query pairs a plan graph with the channel describing its output
/// value. Combinators build a fresh query by wrapping the current one in
/// an expression call and translating it; nothing runs until `rows`.
/// Queries are cheap to clone and can be spliced into other queries,
/// including into themselves, since every splice remaps plan identity.
#[derive(Clone)]
pub struct Query {
    store: Store,
    plan: PlanRef,
    channel: Channel,
}

impl Query {
    #[cfg(test)]
    pub(crate) fn from_parts(store: Store, plan: PlanRef, channel: Channel) -> Query {
        Query {
            store,
            plan,
            channel,
        }
    }

    /// Starts a query scanning every row of a named table.
    pub fn scan(store: &Store, table: &str) -> Result<Query> {
        let table = store.table(table)?;
        let plan: PlanRef = Rc::new(Plan::Scan(ScanPlan {
            table: table.clone(),
        }));
        Ok(Query {
            store: store.clone(),
            plan: plan.clone(),
            channel: Channel::Table { plan, table },
        })
    }

    pub(crate) fn plan(&self) -> &PlanRef {
        &self.plan
    }

    pub(crate) fn channel(&self) -> &Channel {
        &self.channel
    }

    fn apply(&self, op: QueryOp, mut extra: Vec<Expr>) -> Result<Query> {
        let mut args = vec![Expr::Query(self.clone())];
        args.append(&mut extra);
        let down = Downstream::new(self.store.clone());
        let up = translate(&Expr::Call { op, args }, &down)?;
        let plan = up
            .plan
            .ok_or_else(|| Error::unsupported_expression("combinator produced no rows"))?;
        Ok(Query {
            store: self.store.clone(),
            plan,
            channel: up.chan,
        })
    }

    /// Keeps only the rows for which `predicate` is true. `param` names
    /// the current row inside the predicate.
    pub fn filter(&self, param: &str, predicate: Expr) -> Result<Query> {
        self.apply(
            QueryOp::Where,
            vec![Expr::lambda(vec![param.into()], predicate)],
        )
    }

    /// Projects each row through `body`.
    pub fn select(&self, param: &str, body: Expr) -> Result<Query> {
        self.apply(
            QueryOp::Select,
            vec![Expr::lambda(vec![param.into()], body)],
        )
    }

    /// Pairs each row with every row of `source`, projecting the pair
    /// through `body`. `params` names the outer and inner rows in `body`.
    pub fn select_many(
        &self,
        source_param: &str,
        source: Expr,
        params: (&str, &str),
        body: Expr,
    ) -> Result<Query> {
        self.apply(
            QueryOp::SelectMany,
            vec![
                Expr::lambda(vec![source_param.into()], source),
                Expr::lambda(vec![params.0.into(), params.1.into()], body),
            ],
        )
    }

    /// Collapses the output to its distinct values, keeping first
    /// occurrence order.
    pub fn distinct(&self) -> Result<Query> {
        self.apply(QueryOp::Distinct, vec![])
    }

    /// Equijoins this query (outer side) with `inner`, projecting each
    /// matched pair through the result selector. Outer rows without a
    /// match are dropped.
    pub fn join(
        &self,
        inner: &Query,
        outer_key: (&str, Expr),
        inner_key: (&str, Expr),
        result: ((&str, &str), Expr),
    ) -> Result<Query> {
        let ((p1, p2), body) = result;
        self.apply(
            QueryOp::Join,
            vec![
                Expr::Query(inner.clone()),
                Expr::lambda(vec![outer_key.0.into()], outer_key.1),
                Expr::lambda(vec![inner_key.0.into()], inner_key.1),
                Expr::lambda(vec![p1.into(), p2.into()], body),
            ],
        )
    }

    /// Sorts the output by `key`, ascending, stably: rows with equal keys
    /// keep their prior relative order. The rows are materialized into a
    /// temp table on first advance.
    pub fn order_by(&self, param: &str, key: Expr) -> Result<Query> {
        self.apply(
            QueryOp::OrderBy,
            vec![Expr::lambda(vec![param.into()], key)],
        )
    }

    /// Compiles the plan graph and returns an iterator over the output
    /// values. Each call is an independent execution with its own
    /// operators; the plan graph itself is untouched and reusable.
    pub fn rows(&self) -> Result<Rows> {
        let mut om = OperatorMap::new();
        let top = om.demand(&self.plan)?;
        let calc = self.channel.as_calc_plan()?.to_calc(&om)?;
        Ok(Rows { top, calc })
    }
}

/// Iterator over one execution of a query.
pub struct Rows {
    top: OperatorRef,
    calc: Calc,
}

impl Iterator for Rows {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Result<Value>> {
        let advanced = self.top.borrow_mut().advance();
        match advanced {
            Ok(true) => Some(self.calc.eval()),
            Ok(false) => None,
            Err(err) => Some(Err(err)),
        }
    }
}
