//! Physical plans and live operators.
//!
//! A `Plan` node describes an operator to build; compiling a plan graph
//! through an `OperatorMap` produces the live `Operator` graph for one
//! execution. The map is keyed by plan identity so that a plan node shared
//! by several parents compiles to exactly one live operator, which is what
//! lets calcs bound to that plan observe the rows the operator graph is
//! positioned on.

mod distinct;
mod filter;
mod join;
mod product;
mod scan;
mod spool;

pub use distinct::{DistinctOp, HashDistinctPlan};
pub use filter::{FilterOp, FilterPlan};
pub use join::{HashJoinPlan, JoinOp};
pub use product::{ProductOp, ProductPlan};
pub use scan::{ScanOp, ScanPlan};
pub use spool::{SpoolOp, SpoolPlan};

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use hashbrown::HashMap;
use trellis_core::{Error, Result, Value};
use trellis_store::Cursor;

use crate::calc::{CalcPlan, CalcPlanRef};
use crate::writer::{WriterPlan, WriterPlanRef};

/// Shared handle to a plan node.
pub type PlanRef = Rc<Plan>;

/// Shared handle to a live operator.
pub type OperatorRef = Rc<RefCell<dyn Operator>>;

/// A physical plan node.
pub enum Plan {
    Scan(ScanPlan),
    Filter(FilterPlan),
    Product(ProductPlan),
    HashDistinct(HashDistinctPlan),
    HashJoin(HashJoinPlan),
    Spool(SpoolPlan),
}

impl Plan {
    /// Diagnostic name of the node kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Plan::Scan(_) => "scan",
            Plan::Filter(_) => "filter",
            Plan::Product(_) => "product",
            Plan::HashDistinct(_) => "hash_distinct",
            Plan::HashJoin(_) => "hash_join",
            Plan::Spool(_) => "spool",
        }
    }
}

/// A live, pull-driven operator.
///
/// Operators start before their first row. `advance` moves to the next row
/// and reports whether one exists; after it returns false the operator is
/// exhausted until `reset`, which rewinds to before the first row again.
pub trait Operator {
    fn advance(&mut self) -> Result<bool>;

    fn reset(&mut self) -> Result<()>;

    /// The cursor positioned on this operator's current row, for operators
    /// whose rows live in a table.
    fn cursor(&self) -> Option<Cursor> {
        None
    }

    /// The value this operator is positioned on, for operators that
    /// produce values directly rather than table rows.
    fn current(&self) -> Result<Value> {
        Err(Error::invalid_operation("operator yields no direct value"))
    }
}

/// Identity-keyed compilation map for one execution.
///
/// `demand` builds the operator for a plan node, or returns the one already
/// built for that same node; `expect` only looks up, and fails when a calc
/// references a plan that never went through compilation.
pub struct OperatorMap {
    built: HashMap<usize, OperatorRef>,
}

impl OperatorMap {
    pub fn new() -> Self {
        Self {
            built: HashMap::new(),
        }
    }

    fn key(plan: &PlanRef) -> usize {
        Rc::as_ptr(plan) as usize
    }

    /// Builds (or returns the already-built) operator for `plan`.
    pub fn demand(&mut self, plan: &PlanRef) -> Result<OperatorRef> {
        let key = Self::key(plan);
        if let Some(op) = self.built.get(&key) {
            return Ok(op.clone());
        }
        log::trace!("compiling {} operator", plan.kind());
        let op: OperatorRef = match &**plan {
            Plan::Scan(p) => Rc::new(RefCell::new(scan::compile(p))),
            Plan::Filter(p) => Rc::new(RefCell::new(filter::compile(p, self)?)),
            Plan::Product(p) => Rc::new(RefCell::new(product::compile(p, self)?)),
            Plan::HashDistinct(p) => Rc::new(RefCell::new(distinct::compile(p, self)?)),
            Plan::HashJoin(p) => Rc::new(RefCell::new(join::compile(p, self)?)),
            Plan::Spool(p) => Rc::new(RefCell::new(spool::compile(p, self)?)),
        };
        self.built.insert(key, op.clone());
        Ok(op)
    }

    /// Looks up the operator already built for `plan`.
    pub fn expect(&self, plan: &PlanRef) -> Result<OperatorRef> {
        self.built
            .get(&Self::key(plan))
            .cloned()
            .ok_or(Error::PlanNotCompiled)
    }
}

impl Default for OperatorMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity-keyed remapping used when splicing a pre-built query into a
/// larger one.
///
/// Splicing must give the spliced plan fresh identity so it compiles to its
/// own operators, while still sharing nodes that the spliced graph itself
/// shares. Calc plans are remapped alongside plans, so predicates and
/// projections inside the spliced graph point at the cloned nodes rather
/// than the originals.
pub struct CloneMap {
    plans: HashMap<usize, PlanRef>,
    calcs: HashMap<usize, CalcPlanRef>,
}

impl CloneMap {
    pub fn new() -> Self {
        Self {
            plans: HashMap::new(),
            calcs: HashMap::new(),
        }
    }

    /// Clones `plan` with fresh identity, reusing already-cloned nodes.
    pub fn demand(&mut self, plan: &PlanRef) -> PlanRef {
        let key = Rc::as_ptr(plan) as usize;
        if let Some(cloned) = self.plans.get(&key) {
            return cloned.clone();
        }
        let cloned: PlanRef = match &**plan {
            Plan::Scan(p) => Rc::new(Plan::Scan(ScanPlan {
                table: p.table.clone(),
            })),
            Plan::Filter(p) => {
                let src = self.demand(&p.src);
                let predicate = self.demand_calc(&p.predicate);
                Rc::new(Plan::Filter(FilterPlan { src, predicate }))
            }
            Plan::Product(p) => {
                let outer = self.demand(&p.outer);
                let inner = self.demand(&p.inner);
                Rc::new(Plan::Product(ProductPlan { outer, inner }))
            }
            Plan::HashDistinct(p) => {
                let src = self.demand(&p.src);
                let value = self.demand_calc(&p.value);
                Rc::new(Plan::HashDistinct(HashDistinctPlan { src, value }))
            }
            Plan::HashJoin(p) => {
                let inner = self.demand(&p.inner);
                let inner_key = self.demand_calc(&p.inner_key);
                let inner_value = self.demand_calc(&p.inner_value);
                let outer = self.demand(&p.outer);
                let outer_key = self.demand_calc(&p.outer_key);
                Rc::new(Plan::HashJoin(HashJoinPlan {
                    inner,
                    inner_key,
                    inner_value,
                    outer,
                    outer_key,
                }))
            }
            Plan::Spool(p) => {
                let src = self.demand(&p.src);
                let writer = self.demand_writer(&p.writer);
                Rc::new(Plan::Spool(SpoolPlan {
                    src,
                    store: p.store.clone(),
                    columns: p.columns.clone(),
                    writer,
                    sorted: p.sorted,
                }))
            }
        };
        self.plans.insert(key, cloned.clone());
        cloned
    }

    /// Clones `calc`, remapping the plan nodes it references.
    pub fn demand_calc(&mut self, calc: &CalcPlanRef) -> CalcPlanRef {
        let key = Rc::as_ptr(calc) as usize;
        if let Some(cloned) = self.calcs.get(&key) {
            return cloned.clone();
        }
        let cloned: CalcPlanRef = match &**calc {
            CalcPlan::Retrieve { plan, column } => Rc::new(CalcPlan::Retrieve {
                plan: self.demand(plan),
                column: *column,
            }),
            CalcPlan::Constant(value) => Rc::new(CalcPlan::Constant(value.clone())),
            CalcPlan::Binary { op, left, right } => Rc::new(CalcPlan::Binary {
                op: *op,
                left: self.demand_calc(left),
                right: self.demand_calc(right),
            }),
            CalcPlan::Field { src, field } => Rc::new(CalcPlan::Field {
                src: self.demand_calc(src),
                field: field.clone(),
            }),
            CalcPlan::MakeRecord { fields } => {
                let fields = fields
                    .iter()
                    .map(|(name, plan)| (name.clone(), self.demand_calc(plan)))
                    .collect();
                Rc::new(CalcPlan::MakeRecord { fields })
            }
            CalcPlan::RowValue { plan, bridge } => Rc::new(CalcPlan::RowValue {
                plan: self.demand(plan),
                bridge: bridge.clone(),
            }),
            CalcPlan::TableValue { plan } => Rc::new(CalcPlan::TableValue {
                plan: self.demand(plan),
            }),
        };
        self.calcs.insert(key, cloned.clone());
        cloned
    }

    fn demand_writer(&mut self, writer: &WriterPlanRef) -> WriterPlanRef {
        match &**writer {
            WriterPlan::Copy { src, dst_index } => Rc::new(WriterPlan::Copy {
                src: self.demand_calc(src),
                dst_index: *dst_index,
            }),
            WriterPlan::Composite(parts) => {
                let parts: Vec<_> = parts.iter().map(|p| self.demand_writer(p)).collect();
                Rc::new(WriterPlan::Composite(parts))
            }
        }
    }
}

impl Default for CloneMap {
    fn default() -> Self {
        Self::new()
    }
}
