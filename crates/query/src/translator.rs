//! Expression tree → plan graph translation.
//!
//! Translation threads a `Downstream` context (lambda environment and the
//! store for temp tables) down the expression tree and returns an
//! `Upstream` result: the `Channel` describing how to read a value out of
//! the compiled operators, and the scrolling plan that drives row movement.
//! The two travel separately on purpose: a filter, for instance, replaces
//! the scrolling plan while the channel keeps pointing at the scanned
//! table, whose operator the filter advances.

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use trellis_core::{DataType, Error, Result, Value};
use trellis_store::{ColumnSpec, Store, Table};

use crate::ast::{Expr, QueryOp};
use crate::bridge::RowBridge;
use crate::calc::{CalcPlan, CalcPlanRef};
use crate::plan::{
    CloneMap, FilterPlan, HashDistinctPlan, HashJoinPlan, Plan, PlanRef, ProductPlan, SpoolPlan,
};
use crate::writer::{WriterPlan, WriterPlanRef};

/// Name of the arrival-order column appended to sorted spools.
pub(crate) const SEQ_COLUMN: &str = "__seq";

/// Compile-time description of how a value is read out of the live
/// operator graph.
#[derive(Clone)]
pub enum Channel {
    /// An arbitrary scalar calculation. `plan` is set when the calculation
    /// reads a materializing operator directly.
    Calc {
        plan: Option<PlanRef>,
        cplan: CalcPlanRef,
    },
    /// One column of the rows a plan's operator scrolls over.
    Column {
        plan: PlanRef,
        column: usize,
        name: String,
        data_type: Option<DataType>,
    },
    /// Whole rows of a table a plan's operator scrolls over.
    Table { plan: PlanRef, table: Table },
    /// A named bundle of sub-channels, as produced by record construction.
    Fields { fields: Vec<(String, Channel)> },
}

impl Channel {
    /// Lowers this channel to a calculation plan.
    pub fn as_calc_plan(&self) -> Result<CalcPlanRef> {
        match self {
            Channel::Calc { cplan, .. } => Ok(cplan.clone()),
            Channel::Column { plan, column, .. } => Ok(Rc::new(CalcPlan::Retrieve {
                plan: plan.clone(),
                column: *column,
            })),
            Channel::Table { plan, table } => Ok(Rc::new(CalcPlan::RowValue {
                plan: plan.clone(),
                bridge: RowBridge::from_spec(&table.spec()),
            })),
            Channel::Fields { fields } => {
                let mut calcs = Vec::with_capacity(fields.len());
                for (name, chan) in fields {
                    calcs.push((name.clone(), chan.as_calc_plan()?));
                }
                Ok(Rc::new(CalcPlan::MakeRecord { fields: calcs }))
            }
        }
    }

    /// Best-effort type of the values this channel yields.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Channel::Calc { cplan, .. } => cplan.data_type(),
            Channel::Column { data_type, .. } => *data_type,
            Channel::Table { .. } | Channel::Fields { .. } => Some(DataType::Record),
        }
    }

    /// Whether two channels denote the same value source. Used to match a
    /// sort key against the fields of the row being sorted.
    fn same_source(&self, other: &Channel) -> bool {
        match (self, other) {
            (
                Channel::Column {
                    plan: p1,
                    column: c1,
                    ..
                },
                Channel::Column {
                    plan: p2,
                    column: c2,
                    ..
                },
            ) => Rc::ptr_eq(p1, p2) && c1 == c2,
            (Channel::Calc { cplan: a, .. }, Channel::Calc { cplan: b, .. }) => Rc::ptr_eq(a, b),
            (Channel::Table { plan: a, .. }, Channel::Table { plan: b, .. }) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Deep copy with all referenced plan nodes remapped through `cm`.
    pub fn clone_with(&self, cm: &mut CloneMap) -> Channel {
        match self {
            Channel::Calc { plan, cplan } => Channel::Calc {
                plan: plan.as_ref().map(|p| cm.demand(p)),
                cplan: cm.demand_calc(cplan),
            },
            Channel::Column {
                plan,
                column,
                name,
                data_type,
            } => Channel::Column {
                plan: cm.demand(plan),
                column: *column,
                name: name.clone(),
                data_type: *data_type,
            },
            Channel::Table { plan, table } => Channel::Table {
                plan: cm.demand(plan),
                table: table.clone(),
            },
            Channel::Fields { fields } => Channel::Fields {
                fields: fields
                    .iter()
                    .map(|(name, chan)| (name.clone(), chan.clone_with(cm)))
                    .collect(),
            },
        }
    }
}

/// Context threaded down the expression tree.
#[derive(Clone)]
pub struct Downstream {
    env: BTreeMap<String, Channel>,
    store: Store,
}

impl Downstream {
    pub fn new(store: Store) -> Self {
        Self {
            env: BTreeMap::new(),
            store,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    fn with_binding(&self, name: &str, chan: Channel) -> Self {
        let mut child = self.clone();
        child.env.insert(String::from(name), chan);
        child
    }
}

/// Result of translating an expression: the value channel and the plan
/// that scrolls it, when the expression produces rows.
pub struct Upstream {
    pub chan: Channel,
    pub plan: Option<PlanRef>,
}

/// Translates an expression tree into a plan graph.
pub fn translate(expr: &Expr, down: &Downstream) -> Result<Upstream> {
    match expr {
        Expr::Constant(value) => Ok(Upstream {
            chan: Channel::Calc {
                plan: None,
                cplan: Rc::new(CalcPlan::Constant(value.clone())),
            },
            plan: None,
        }),
        Expr::Parameter(name) => {
            let chan = down
                .env
                .get(name)
                .cloned()
                .ok_or_else(|| Error::unknown_parameter(name.clone()))?;
            Ok(Upstream { chan, plan: None })
        }
        Expr::Member { base, field } => {
            let base_up = translate(base, down)?;
            let chan = translate_member(base_up.chan, field)?;
            Ok(Upstream {
                chan,
                plan: base_up.plan,
            })
        }
        Expr::Binary { op, left, right } => {
            let left_up = translate(left, down)?;
            let right_up = translate(right, down)?;
            let cplan = Rc::new(CalcPlan::Binary {
                op: *op,
                left: left_up.chan.as_calc_plan()?,
                right: right_up.chan.as_calc_plan()?,
            });
            Ok(Upstream {
                chan: Channel::Calc { plan: None, cplan },
                plan: None,
            })
        }
        Expr::NewRecord { fields } => {
            let mut chans = Vec::with_capacity(fields.len());
            for (name, value) in fields {
                chans.push((name.clone(), translate(value, down)?.chan));
            }
            Ok(Upstream {
                chan: Channel::Fields { fields: chans },
                plan: None,
            })
        }
        Expr::Lambda { .. } => Err(Error::unsupported_expression(
            "lambda outside a query combinator",
        )),
        Expr::Call { op, args } => translate_call(*op, args, down),
        Expr::Query(query) => {
            let mut cm = CloneMap::new();
            let plan = cm.demand(query.plan());
            let chan = query.channel().clone_with(&mut cm);
            Ok(Upstream {
                chan,
                plan: Some(plan),
            })
        }
    }
}

fn translate_member(base: Channel, field: &str) -> Result<Channel> {
    match base {
        Channel::Table { plan, table } => {
            let spec = table.spec();
            let column = spec
                .column_index(field)
                .ok_or_else(|| Error::column_not_found(table.name(), field))?;
            Ok(Channel::Column {
                plan,
                column,
                name: String::from(field),
                data_type: spec.columns()[column].data_type(),
            })
        }
        Channel::Fields { fields } => fields
            .into_iter()
            .find(|(name, _)| name == field)
            .map(|(_, chan)| chan)
            .ok_or_else(|| Error::field_not_found(field)),
        Channel::Calc { plan, cplan } => {
            if let CalcPlan::Constant(Value::Record(record)) = &*cplan {
                let value = record
                    .get(field)
                    .cloned()
                    .ok_or_else(|| Error::field_not_found(field))?;
                return Ok(Channel::Calc {
                    plan: None,
                    cplan: Rc::new(CalcPlan::Constant(value)),
                });
            }
            Ok(Channel::Calc {
                plan,
                cplan: Rc::new(CalcPlan::Field {
                    src: cplan,
                    field: String::from(field),
                }),
            })
        }
        Channel::Column { .. } => Err(Error::unsupported_expression(
            "member access on a scalar column",
        )),
    }
}

fn translate_call(op: QueryOp, args: &[Expr], down: &Downstream) -> Result<Upstream> {
    log::trace!("translating {} call", op.name());
    match op {
        QueryOp::Where => {
            let src = translate(arg(args, 0)?, down)?;
            let src_plan = rows_plan(&src)?;
            let (param, body) = lambda1(arg(args, 1)?)?;
            let scope = down.with_binding(param, src.chan.clone());
            let predicate = translate(body, &scope)?.chan.as_calc_plan()?;
            let plan = Rc::new(Plan::Filter(FilterPlan {
                src: src_plan,
                predicate,
            }));
            Ok(Upstream {
                chan: src.chan,
                plan: Some(plan),
            })
        }
        QueryOp::Select => {
            let src = translate(arg(args, 0)?, down)?;
            let (param, body) = lambda1(arg(args, 1)?)?;
            let scope = down.with_binding(param, src.chan);
            let chan = translate(body, &scope)?.chan;
            Ok(Upstream {
                chan,
                plan: src.plan,
            })
        }
        QueryOp::SelectMany => {
            let outer = translate(arg(args, 0)?, down)?;
            let outer_plan = rows_plan(&outer)?;
            let (cparam, csource) = lambda1(arg(args, 1)?)?;
            let cscope = down.with_binding(cparam, outer.chan.clone());
            let inner = translate(csource, &cscope)?;
            let inner_plan = rows_plan(&inner)?;
            let plan = Rc::new(Plan::Product(ProductPlan {
                outer: outer_plan,
                inner: inner_plan,
            }));
            let (p1, p2, body) = lambda2(arg(args, 2)?)?;
            let scope = down
                .with_binding(p1, outer.chan)
                .with_binding(p2, inner.chan);
            let chan = translate(body, &scope)?.chan;
            Ok(Upstream {
                chan,
                plan: Some(plan),
            })
        }
        QueryOp::Distinct => {
            let src = translate(arg(args, 0)?, down)?;
            let src_plan = rows_plan(&src)?;
            let value = src.chan.as_calc_plan()?;
            let plan = Rc::new(Plan::HashDistinct(HashDistinctPlan {
                src: src_plan,
                value,
            }));
            let chan = Channel::Calc {
                plan: Some(plan.clone()),
                cplan: Rc::new(CalcPlan::TableValue { plan: plan.clone() }),
            };
            Ok(Upstream {
                chan,
                plan: Some(plan),
            })
        }
        QueryOp::Join => {
            let outer = translate(arg(args, 0)?, down)?;
            let inner = translate(arg(args, 1)?, down)?;
            let outer_plan = rows_plan(&outer)?;
            let inner_plan = rows_plan(&inner)?;

            let (ok_param, ok_body) = lambda1(arg(args, 2)?)?;
            let outer_key = translate(ok_body, &down.with_binding(ok_param, outer.chan.clone()))?
                .chan
                .as_calc_plan()?;
            let (ik_param, ik_body) = lambda1(arg(args, 3)?)?;
            let inner_key = translate(ik_body, &down.with_binding(ik_param, inner.chan.clone()))?
                .chan
                .as_calc_plan()?;
            let inner_value = inner.chan.as_calc_plan()?;

            let plan = Rc::new(Plan::HashJoin(HashJoinPlan {
                inner: inner_plan,
                inner_key,
                inner_value,
                outer: outer_plan,
                outer_key,
            }));
            let matched = Channel::Calc {
                plan: Some(plan.clone()),
                cplan: Rc::new(CalcPlan::TableValue { plan: plan.clone() }),
            };

            let (p1, p2, body) = lambda2(arg(args, 4)?)?;
            let scope = down.with_binding(p1, outer.chan).with_binding(p2, matched);
            let chan = translate(body, &scope)?.chan;
            Ok(Upstream {
                chan,
                plan: Some(plan),
            })
        }
        QueryOp::OrderBy => {
            let src = translate(arg(args, 0)?, down)?;
            let src_plan = rows_plan(&src)?;
            let (param, body) = lambda1(arg(args, 1)?)?;
            let key = translate(body, &down.with_binding(param, src.chan.clone()))?.chan;
            translate_order_by(src.chan, src_plan, key, down)
        }
    }
}

/// Builds a sorted spool for an order-by: the row channel is reflected
/// into named fields, key fields move to the front of the temp table
/// layout, and a trailing sequence column keeps the sort stable.
fn translate_order_by(
    row: Channel,
    src_plan: PlanRef,
    key: Channel,
    down: &Downstream,
) -> Result<Upstream> {
    let row_fields = reflect(&row);
    let keys: Vec<Channel> = match &key {
        Channel::Fields { fields } => fields.iter().map(|(_, c)| c.clone()).collect(),
        other => vec![other.clone()],
    };

    // layout: key fields first, then the remaining row fields
    let mut layout: Vec<(String, Channel, bool)> = Vec::new();
    let mut consumed = vec![false; row_fields.len()];
    for (ki, kchan) in keys.iter().enumerate() {
        match row_fields.iter().position(|(_, c)| c.same_source(kchan)) {
            Some(idx) => {
                consumed[idx] = true;
                layout.push((row_fields[idx].0.clone(), kchan.clone(), true));
            }
            None => layout.push((format!("__key{ki}"), kchan.clone(), true)),
        }
    }
    for (idx, (name, chan)) in row_fields.iter().enumerate() {
        if !consumed[idx] {
            layout.push((name.clone(), chan.clone(), false));
        }
    }

    let mut columns = Vec::with_capacity(layout.len() + 1);
    let mut writers: Vec<WriterPlanRef> = Vec::with_capacity(layout.len());
    for (dst_index, (name, chan, is_key)) in layout.iter().enumerate() {
        let mut column = match chan.data_type() {
            Some(dt) if dt.is_storable() => ColumnSpec::new(name.clone(), dt),
            _ => ColumnSpec::untyped(name.clone()),
        }
        .nullable();
        if *is_key {
            column = column.key();
        }
        columns.push(column);
        writers.push(Rc::new(WriterPlan::Copy {
            src: chan.as_calc_plan()?,
            dst_index,
        }));
    }
    columns.push(ColumnSpec::new(SEQ_COLUMN, DataType::Int64).key());

    let spool = Rc::new(Plan::Spool(SpoolPlan {
        src: src_plan,
        store: down.store.clone(),
        columns,
        writer: Rc::new(WriterPlan::Composite(writers)),
        sorted: true,
    }));

    // rebuild the row channel over the spooled copy, preserving shape
    let column_of = |name: &str| -> Result<Channel> {
        let idx = layout
            .iter()
            .position(|(n, _, _)| n == name)
            .ok_or_else(|| Error::column_not_found("#spool", name))?;
        Ok(Channel::Column {
            plan: spool.clone(),
            column: idx,
            name: String::from(name),
            data_type: layout[idx].1.data_type(),
        })
    };
    let chan = match &row {
        Channel::Calc { .. } | Channel::Column { .. } => column_of(&row_fields[0].0)?,
        _ => Channel::Fields {
            fields: row_fields
                .iter()
                .map(|(name, _)| Ok((name.clone(), column_of(name)?)))
                .collect::<Result<Vec<_>>>()?,
        },
    };
    Ok(Upstream {
        chan,
        plan: Some(spool),
    })
}

/// Reflects a row channel into an ordered list of named scalar fields.
fn reflect(chan: &Channel) -> Vec<(String, Channel)> {
    match chan {
        Channel::Table { plan, table } => {
            let spec = table.spec();
            spec.columns()
                .iter()
                .enumerate()
                .map(|(column, c)| {
                    (
                        String::from(c.name()),
                        Channel::Column {
                            plan: plan.clone(),
                            column,
                            name: String::from(c.name()),
                            data_type: c.data_type(),
                        },
                    )
                })
                .collect()
        }
        Channel::Fields { fields } => fields.clone(),
        other => vec![(String::from("value"), other.clone())],
    }
}

fn rows_plan(up: &Upstream) -> Result<PlanRef> {
    up.plan
        .clone()
        .ok_or_else(|| Error::unsupported_expression("source expression produces no rows"))
}

fn arg(args: &[Expr], index: usize) -> Result<&Expr> {
    args.get(index)
        .ok_or_else(|| Error::unsupported_expression("combinator is missing an argument"))
}

fn lambda1(expr: &Expr) -> Result<(&str, &Expr)> {
    match expr {
        Expr::Lambda { params, body } if params.len() == 1 => Ok((&params[0], body)),
        _ => Err(Error::unsupported_expression(
            "expected a one-parameter lambda",
        )),
    }
}

fn lambda2(expr: &Expr) -> Result<(&str, &str, &Expr)> {
    match expr {
        Expr::Lambda { params, body } if params.len() == 2 => Ok((&params[0], &params[1], body)),
        _ => Err(Error::unsupported_expression(
            "expected a two-parameter lambda",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use trellis_store::TableSpec;

    use crate::plan::ScanPlan;

    fn scan_channel() -> (Downstream, Channel, PlanRef) {
        let store = Store::new();
        let table = store
            .create_table(TableSpec::new(
                "t",
                vec![
                    ColumnSpec::new("a", DataType::Int64).key(),
                    ColumnSpec::new("b", DataType::Float64),
                ],
            ))
            .unwrap();
        let plan: PlanRef = Rc::new(Plan::Scan(ScanPlan {
            table: table.clone(),
        }));
        let chan = Channel::Table {
            plan: plan.clone(),
            table,
        };
        (Downstream::new(store), chan, plan)
    }

    #[test]
    fn test_unknown_parameter() {
        let (down, _, _) = scan_channel();
        let err = translate(&Expr::param("nope"), &down).err().unwrap();
        assert!(matches!(err, Error::UnknownParameter { .. }));
    }

    #[test]
    fn test_member_on_table_becomes_column() {
        let (down, chan, plan) = scan_channel();
        let down = down.with_binding("r", chan);
        let up = translate(&Expr::member(Expr::param("r"), "b"), &down).unwrap();
        match up.chan {
            Channel::Column {
                plan: p,
                column,
                data_type,
                ..
            } => {
                assert!(Rc::ptr_eq(&p, &plan));
                assert_eq!(column, 1);
                assert_eq!(data_type, Some(DataType::Float64));
            }
            _ => panic!("expected column channel"),
        }
    }

    #[test]
    fn test_member_on_missing_column() {
        let (down, chan, _) = scan_channel();
        let down = down.with_binding("r", chan);
        let err = translate(&Expr::member(Expr::param("r"), "zzz"), &down).err().unwrap();
        assert!(matches!(err, Error::ColumnNotFound { .. }));
    }

    #[test]
    fn test_member_on_column_is_unsupported() {
        let (down, chan, _) = scan_channel();
        let down = down.with_binding("r", chan);
        let expr = Expr::member(Expr::member(Expr::param("r"), "a"), "x");
        let err = translate(&expr, &down).err().unwrap();
        assert!(matches!(err, Error::UnsupportedExpression { .. }));
    }

    #[test]
    fn test_where_keeps_source_channel() {
        let (down, chan, plan) = scan_channel();
        let call = Expr::Call {
            op: QueryOp::Where,
            args: vec![
                Expr::Query(crate::query::Query::from_parts(
                    down.store().clone(),
                    plan.clone(),
                    chan,
                )),
                Expr::lambda(
                    vec!["r".into()],
                    Expr::eq(Expr::member(Expr::param("r"), "a"), Expr::lit(1i64)),
                ),
            ],
        };
        let up = translate(&call, &down).unwrap();
        assert!(matches!(&*up.plan.unwrap(), Plan::Filter(_)));
        // splicing gives the source fresh identity; the channel follows it
        match up.chan {
            Channel::Table { plan: p, .. } => assert!(!Rc::ptr_eq(&p, &plan)),
            _ => panic!("expected table channel"),
        }
    }

    #[test]
    fn test_order_by_maps_fields_to_spool_layout() {
        let (down, chan, plan) = scan_channel();
        let call = Expr::Call {
            op: QueryOp::OrderBy,
            args: vec![
                Expr::Query(crate::query::Query::from_parts(
                    down.store().clone(),
                    plan,
                    chan,
                )),
                Expr::lambda(
                    vec!["r".into()],
                    Expr::member(Expr::param("r"), "b"),
                ),
            ],
        };
        let up = translate(&call, &down).unwrap();
        let spool = up.plan.unwrap();
        assert!(matches!(&*spool, Plan::Spool(_)));
        // key field "b" moves to the front of the spool layout
        match up.chan {
            Channel::Fields { fields } => {
                let columns: Vec<(&str, usize)> = fields
                    .iter()
                    .map(|(name, c)| match c {
                        Channel::Column { plan: p, column, .. } => {
                            assert!(Rc::ptr_eq(p, &spool));
                            (name.as_str(), *column)
                        }
                        _ => panic!("expected column channel"),
                    })
                    .collect();
                assert_eq!(columns, vec![("a", 1), ("b", 0)]);
            }
            _ => panic!("expected fields channel"),
        }
    }
}
