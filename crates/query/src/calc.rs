//! Scalar calculation plans and their live evaluators.
//!
//! A `CalcPlan` is the logical description of a scalar computation over the
//! rows produced by the operator graph. `to_calc` binds it against an
//! `OperatorMap`, yielding a `Calc` whose cursors track the live operators,
//! so each `eval` sees the rows the operators are currently positioned on.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

use trellis_core::{DataType, Error, Record, Result, Value};
use trellis_store::Cursor;

use crate::ast::BinaryOp;
use crate::bridge::RowBridge;
use crate::plan::{OperatorMap, OperatorRef, PlanRef};

/// Shared handle to a calculation plan node.
pub type CalcPlanRef = Rc<CalcPlan>;

/// Logical scalar computation.
pub enum CalcPlan {
    /// A single column of the row a plan's operator is positioned on.
    Retrieve { plan: PlanRef, column: usize },
    /// A literal value.
    Constant(Value),
    /// A binary operation over two sub-calculations.
    Binary {
        op: BinaryOp,
        left: CalcPlanRef,
        right: CalcPlanRef,
    },
    /// A named field of a composite record sub-calculation.
    Field { src: CalcPlanRef, field: String },
    /// Construction of a composite record from named sub-calculations.
    MakeRecord { fields: Vec<(String, CalcPlanRef)> },
    /// The whole row a plan's operator is positioned on, as a record.
    RowValue { plan: PlanRef, bridge: RowBridge },
    /// The value a materializing operator is positioned on.
    TableValue { plan: PlanRef },
}

impl CalcPlan {
    /// Binds this plan against the operators in `om`, producing a live
    /// evaluator. Every plan referenced by a `Retrieve`, `RowValue` or
    /// `TableValue` node must already have been compiled into `om`.
    pub fn to_calc(&self, om: &OperatorMap) -> Result<Calc> {
        match self {
            CalcPlan::Retrieve { plan, column } => Ok(Calc::Retrieve {
                cursor: operator_cursor(om, plan)?,
                column: *column,
            }),
            CalcPlan::Constant(value) => Ok(Calc::Constant(value.clone())),
            CalcPlan::Binary { op, left, right } => Ok(Calc::Binary {
                op: *op,
                left: Box::new(left.to_calc(om)?),
                right: Box::new(right.to_calc(om)?),
            }),
            CalcPlan::Field { src, field } => Ok(Calc::Field {
                src: Box::new(src.to_calc(om)?),
                field: field.clone(),
            }),
            CalcPlan::MakeRecord { fields } => {
                let mut calcs = Vec::with_capacity(fields.len());
                for (name, plan) in fields {
                    calcs.push((name.clone(), plan.to_calc(om)?));
                }
                Ok(Calc::MakeRecord { fields: calcs })
            }
            CalcPlan::RowValue { plan, bridge } => Ok(Calc::RowValue {
                cursor: operator_cursor(om, plan)?,
                bridge: bridge.clone(),
            }),
            CalcPlan::TableValue { plan } => Ok(Calc::TableValue(om.expect(plan)?)),
        }
    }

    /// Best-effort result type inference. `None` means the type is only
    /// known at evaluation time.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            CalcPlan::Constant(value) => value.data_type(),
            CalcPlan::Binary { op, left, right } => match op {
                BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::Gt
                | BinaryOp::Ge
                | BinaryOp::And
                | BinaryOp::Or => Some(DataType::Boolean),
                BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                    promote(left.data_type()?, right.data_type()?)
                }
            },
            CalcPlan::MakeRecord { .. } | CalcPlan::RowValue { .. } => Some(DataType::Record),
            CalcPlan::Retrieve { .. } | CalcPlan::Field { .. } | CalcPlan::TableValue { .. } => {
                None
            }
        }
    }
}

fn operator_cursor(om: &OperatorMap, plan: &PlanRef) -> Result<Cursor> {
    let op = om.expect(plan)?;
    let cursor = op.borrow().cursor();
    cursor.ok_or_else(|| Error::invalid_operation("operator exposes no cursor"))
}

/// Live scalar evaluator bound to the operators of one execution.
pub enum Calc {
    Retrieve { cursor: Cursor, column: usize },
    Constant(Value),
    Binary {
        op: BinaryOp,
        left: Box<Calc>,
        right: Box<Calc>,
    },
    Field { src: Box<Calc>, field: String },
    MakeRecord { fields: Vec<(String, Calc)> },
    RowValue { cursor: Cursor, bridge: RowBridge },
    TableValue(OperatorRef),
}

impl Calc {
    /// Evaluates against the rows the bound operators are positioned on.
    pub fn eval(&self) -> Result<Value> {
        match self {
            Calc::Retrieve { cursor, column } => cursor.retrieve(*column),
            Calc::Constant(value) => Ok(value.clone()),
            Calc::Binary { op, left, right } => eval_binary(*op, left.eval()?, right.eval()?),
            Calc::Field { src, field } => {
                let value = src.eval()?;
                let record = value
                    .as_record()
                    .ok_or_else(|| Error::type_mismatch(DataType::Record, value.data_type()))?;
                record
                    .get(field)
                    .cloned()
                    .ok_or_else(|| Error::field_not_found(field.clone()))
            }
            Calc::MakeRecord { fields } => {
                let mut out = Vec::with_capacity(fields.len());
                for (name, calc) in fields {
                    out.push((name.clone(), calc.eval()?));
                }
                Ok(Value::Record(Record::new(out)))
            }
            Calc::RowValue { cursor, bridge } => bridge.read(cursor),
            Calc::TableValue(op) => op.borrow().current(),
        }
    }
}

fn promote(left: DataType, right: DataType) -> Option<DataType> {
    use DataType::*;
    match (left, right) {
        (Float64, Int32 | Int64 | Float64) | (Int32 | Int64, Float64) => Some(Float64),
        (Int64, Int32 | Int64) | (Int32, Int64) => Some(Int64),
        (Int32, Int32) => Some(Int32),
        _ => None,
    }
}

fn unsupported(op: BinaryOp, left: &Value, right: &Value) -> Error {
    Error::UnsupportedBinaryOp {
        op: op.name(),
        left: left.data_type(),
        right: right.data_type(),
    }
}

fn is_numeric(value: &Value) -> bool {
    matches!(value, Value::Int32(_) | Value::Int64(_) | Value::Float64(_))
}

/// Applies a binary operator to two evaluated values.
///
/// Equality is total over all value types. Ordering comparisons require
/// two numbers or two values of the same type. Logical operators require
/// booleans; arithmetic promotes Int32 → Int64 → Float64.
pub fn eval_binary(op: BinaryOp, left: Value, right: Value) -> Result<Value> {
    match op {
        BinaryOp::Eq => Ok(Value::Boolean(left == right)),
        BinaryOp::Ne => Ok(Value::Boolean(left != right)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let comparable = (is_numeric(&left) && is_numeric(&right))
                || (!matches!(left, Value::Null)
                    && core::mem::discriminant(&left) == core::mem::discriminant(&right));
            if !comparable {
                return Err(unsupported(op, &left, &right));
            }
            let ord = left.cmp(&right);
            let result = match op {
                BinaryOp::Lt => ord.is_lt(),
                BinaryOp::Le => ord.is_le(),
                BinaryOp::Gt => ord.is_gt(),
                _ => ord.is_ge(),
            };
            Ok(Value::Boolean(result))
        }
        BinaryOp::And | BinaryOp::Or => match (&left, &right) {
            (Value::Boolean(l), Value::Boolean(r)) => Ok(Value::Boolean(match op {
                BinaryOp::And => *l && *r,
                _ => *l || *r,
            })),
            _ => Err(unsupported(op, &left, &right)),
        },
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            arith(op, left, right)
        }
    }
}

fn arith(op: BinaryOp, left: Value, right: Value) -> Result<Value> {
    use Value::*;
    if !is_numeric(&left) || !is_numeric(&right) {
        return Err(unsupported(op, &left, &right));
    }
    if matches!(left, Float64(_)) || matches!(right, Float64(_)) {
        let l = to_f64(&left);
        let r = to_f64(&right);
        return Ok(Float64(match op {
            BinaryOp::Add => l + r,
            BinaryOp::Sub => l - r,
            BinaryOp::Mul => l * r,
            _ => l / r,
        }));
    }
    if matches!(left, Int64(_)) || matches!(right, Int64(_)) {
        let l = to_i64(&left);
        let r = to_i64(&right);
        return int_arith(op, l, r).map(Int64);
    }
    let (l, r) = match (&left, &right) {
        (Int32(l), Int32(r)) => (*l, *r),
        _ => unreachable!(),
    };
    int_arith(op, i64::from(l), i64::from(r)).map(|v| Int32(v as i32))
}

fn int_arith(op: BinaryOp, l: i64, r: i64) -> Result<i64> {
    Ok(match op {
        BinaryOp::Add => l.wrapping_add(r),
        BinaryOp::Sub => l.wrapping_sub(r),
        BinaryOp::Mul => l.wrapping_mul(r),
        _ => {
            if r == 0 {
                return Err(Error::invalid_operation("division by zero"));
            }
            l.wrapping_div(r)
        }
    })
}

fn to_f64(value: &Value) -> f64 {
    match value {
        Value::Int32(v) => f64::from(*v),
        Value::Int64(v) => *v as f64,
        Value::Float64(v) => *v,
        _ => 0.0,
    }
}

fn to_i64(value: &Value) -> i64 {
    match value {
        Value::Int32(v) => i64::from(*v),
        Value::Int64(v) => *v,
        _ => 0,
    }
}
