//! Trellis Query - Expression-to-plan compiler and pull-based executor.
//!
//! This crate turns a declarative query expression tree into a physical,
//! lazily-built operator graph over the cursor-based record store:
//!
//! - `ast`: Query expression tree (`Expr`, `BinaryOp`, `QueryOp`)
//! - `plan`: Logical `Plan` nodes, live `Operator`s, the per-execution
//!   `OperatorMap` and the `CloneMap` used for splicing pre-built queries
//! - `calc`: Logical `CalcPlan` and live `Calc` scalar evaluators
//! - `writer`: Output-side writer nodes used while spooling
//! - `bridge`: Row ↔ record mapping over a table's columns
//! - `translator`: Expression tree → plan graph translation
//! - `query`: The `Query` entry point and its `Rows` iterator
//!
//! # Example
//!
//! ```no_run
//! use trellis_query::ast::{BinaryOp, Expr};
//! use trellis_query::Query;
//! use trellis_store::Store;
//!
//! # fn demo(store: &Store) -> trellis_core::Result<()> {
//! let rows = Query::scan(store, "items")?
//!     .filter("n", Expr::binary(
//!         BinaryOp::Eq,
//!         Expr::member(Expr::param("n"), "a"),
//!         Expr::lit(3i64),
//!     ))?
//!     .rows()?;
//! for row in rows {
//!     let _ = row?;
//! }
//! # Ok(())
//! # }
//! ```

#![no_std]

extern crate alloc;

pub mod ast;
pub mod bridge;
pub mod calc;
pub mod plan;
pub mod query;
pub mod translator;
pub mod writer;

pub use query::{Query, Rows};
