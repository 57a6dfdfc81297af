use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use trellis_core::Value;

use crate::query::Query;

/// Binary operators usable inside query expressions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    /// Symbolic name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }
}

/// Query combinators expressible as `Expr::Call` nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryOp {
    Where,
    Select,
    SelectMany,
    Distinct,
    Join,
    OrderBy,
}

impl QueryOp {
    pub fn name(self) -> &'static str {
        match self {
            QueryOp::Where => "where",
            QueryOp::Select => "select",
            QueryOp::SelectMany => "select_many",
            QueryOp::Distinct => "distinct",
            QueryOp::Join => "join",
            QueryOp::OrderBy => "order_by",
        }
    }
}

/// A query expression node.
///
/// Expressions are built by the `Query` combinators and translated into a
/// plan graph by the translator. `Parameter` nodes are resolved against the
/// lambda environment in scope at translation time; `Query` nodes splice a
/// previously built query's plan into the current one.
#[derive(Clone)]
pub enum Expr {
    /// A literal value.
    Constant(Value),
    /// A named lambda parameter.
    Parameter(String),
    /// Field or column access on a base expression.
    Member { base: Box<Expr>, field: String },
    /// A binary operation.
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Construction of a composite record from named sub-expressions.
    NewRecord { fields: Vec<(String, Expr)> },
    /// A lambda abstraction. Parameters bind positionally against the
    /// context rows supplied by the enclosing operator.
    Lambda { params: Vec<String>, body: Box<Expr> },
    /// Application of a query combinator.
    Call { op: QueryOp, args: Vec<Expr> },
    /// Splice of a pre-built query.
    Query(Query),
}

impl Expr {
    pub fn lit(value: impl Into<Value>) -> Expr {
        Expr::Constant(value.into())
    }

    pub fn param(name: impl Into<String>) -> Expr {
        Expr::Parameter(name.into())
    }

    pub fn member(base: Expr, field: impl Into<String>) -> Expr {
        Expr::Member {
            base: Box::new(base),
            field: field.into(),
        }
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn eq(left: Expr, right: Expr) -> Expr {
        Expr::binary(BinaryOp::Eq, left, right)
    }

    pub fn record(fields: Vec<(String, Expr)>) -> Expr {
        Expr::NewRecord { fields }
    }

    pub fn lambda(params: Vec<String>, body: Expr) -> Expr {
        Expr::Lambda {
            params,
            body: Box::new(body),
        }
    }

    /// Diagnostic name of the node kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Expr::Constant(_) => "constant",
            Expr::Parameter(_) => "parameter",
            Expr::Member { .. } => "member",
            Expr::Binary { .. } => "binary",
            Expr::NewRecord { .. } => "new_record",
            Expr::Lambda { .. } => "lambda",
            Expr::Call { .. } => "call",
            Expr::Query(_) => "query",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_expr_builders() {
        let e = Expr::eq(Expr::member(Expr::param("x"), "a"), Expr::lit(3i32));
        match e {
            Expr::Binary { op, left, right } => {
                assert_eq!(op, BinaryOp::Eq);
                assert_eq!(left.kind(), "member");
                assert_eq!(right.kind(), "constant");
            }
            _ => panic!("expected binary"),
        }
    }

    #[test]
    fn test_lambda_params() {
        let l = Expr::lambda(vec!["a".into(), "b".into()], Expr::param("a"));
        match l {
            Expr::Lambda { params, body } => {
                assert_eq!(params.len(), 2);
                assert_eq!(body.kind(), "parameter");
            }
            _ => panic!("expected lambda"),
        }
    }

    #[test]
    fn test_op_names() {
        assert_eq!(BinaryOp::Le.name(), "<=");
        assert_eq!(QueryOp::SelectMany.name(), "select_many");
    }
}
