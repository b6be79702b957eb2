//! Lazy query composition and materialization.
//!
//! A [`QueryPlan`] is an immutable accumulated-operations value: every method
//! takes `&self` and returns a new plan, and no I/O or computation happens
//! until [`QueryPlan::materialize`] is called. Filters on partition columns
//! still prune at the storage layer via
//! [`RemoteDataset::scan_partitions`](crate::RemoteDataset::scan_partitions);
//! everything composed here is pushed down by the engine's optimizer where
//! possible.

use crate::query::aggregate::Aggregate;
use crate::query::error::QueryError;
use crate::table::{JoinMode, TimeSeriesTable};
use polars::prelude::*;

/// An unevaluated sequence of query steps over a dataset scan or an
/// in-memory table.
///
/// Materialization is idempotent: re-materializing the same plan against
/// unchanged data yields the same table.
///
/// # Example
///
/// ```
/// use ecocast::{Aggregate, QueryPlan};
/// use polars::prelude::*;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let frame = df!(
///     "site_id" => ["S1", "S1", "S2"],
///     "temp" => [10.0, 12.0, 20.0],
/// )?;
///
/// let table = QueryPlan::new(frame.lazy())
///     .filter(col("temp").gt(lit(5.0)))
///     .group_by(&["site_id"], &[Aggregate::mean("temp")])
///     .materialize()?;
/// assert_eq!(table.height(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct QueryPlan {
    frame: LazyFrame,
}

impl QueryPlan {
    /// Wraps a lazy computation in a plan.
    ///
    /// Usually obtained from [`RemoteDataset::scan`](crate::RemoteDataset::scan);
    /// this constructor exists for plans over local frames.
    pub fn new(frame: LazyFrame) -> Self {
        Self { frame }
    }

    /// Starts a plan from an already-materialized table.
    pub fn from_table(table: &TimeSeriesTable) -> Self {
        Self::new(table.frame.clone().lazy())
    }

    /// Keeps only rows matching the predicate.
    pub fn filter(&self, predicate: Expr) -> QueryPlan {
        QueryPlan::new(self.frame.clone().filter(predicate))
    }

    /// Computes a new column from an expression.
    pub fn derive(&self, name: &str, expr: Expr) -> QueryPlan {
        QueryPlan::new(self.frame.clone().with_column(expr.alias(name)))
    }

    /// Truncates a timestamp column to its calendar day as a new column.
    pub fn derive_date(&self, name: &str, source: &str) -> QueryPlan {
        self.derive(name, col(source).cast(DataType::Date))
    }

    /// Restricts the output to the named columns, in the given order.
    pub fn select(&self, columns: &[&str]) -> QueryPlan {
        let exprs: Vec<Expr> = columns.iter().map(|c| col(*c)).collect();
        QueryPlan::new(self.frame.clone().select(exprs))
    }

    /// Renames one column. A missing source column surfaces as
    /// [`QueryError::Schema`] at materialization, like any other missing
    /// reference.
    pub fn rename(&self, from: &str, to: &str) -> QueryPlan {
        QueryPlan::new(self.frame.clone().rename([from], [to], true))
    }

    /// Groups by the key columns and applies the given reducers.
    ///
    /// Group order follows first appearance in the input, so repeated
    /// materializations are deterministic.
    pub fn group_by(&self, keys: &[&str], aggregates: &[Aggregate]) -> QueryPlan {
        let key_exprs: Vec<Expr> = keys.iter().map(|k| col(*k)).collect();
        let agg_exprs: Vec<Expr> = aggregates.iter().map(|a| a.expr()).collect();
        QueryPlan::new(self.frame.clone().group_by_stable(key_exprs).agg(agg_exprs))
    }

    /// Joins against another plan on the given key columns.
    ///
    /// See [`JoinMode`] for the left-vs-inner trade-off around sparse
    /// covariates.
    pub fn join(&self, other: &QueryPlan, on: &[&str], mode: JoinMode) -> QueryPlan {
        let keys: Vec<Expr> = on.iter().map(|k| col(*k)).collect();
        QueryPlan::new(self.frame.clone().join(
            other.frame.clone(),
            keys.clone(),
            keys,
            JoinArgs::new(mode.join_type()),
        ))
    }

    /// Resolves the output schema without pulling row data.
    pub fn collect_schema(&self) -> Result<SchemaRef, QueryError> {
        self.frame
            .clone()
            .collect_schema()
            .map_err(QueryError::from_polars)
    }

    /// Executes the plan and pulls the result into memory.
    ///
    /// This is the only operation that performs row I/O. It blocks until the
    /// full result is available; there are no partial results and no built-in
    /// retry, so callers needing timeouts must wrap this call themselves.
    pub fn materialize(&self) -> Result<TimeSeriesTable, QueryError> {
        self.frame
            .clone()
            .collect()
            .map(TimeSeriesTable::new)
            .map_err(QueryError::from_polars)
    }
}
