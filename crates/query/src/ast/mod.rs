//! Query expression tree.

mod expr;

pub use expr::{BinaryOp, Expr, QueryOp};
