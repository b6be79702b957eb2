//! Named reducers for grouped aggregation.

use polars::prelude::*;

/// A reducer applied to one column within each group.
///
/// Every reducer skips nulls. A group whose values are all null aggregates to
/// null rather than failing; for [`Reducer::Sum`] this overrides the engine
/// default of zero so that "no data" and "sums to zero" stay distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    Mean,
    Min,
    Max,
    Sum,
}

/// One aggregation step: `reducer(column)`, optionally renamed.
#[derive(Debug, Clone)]
pub struct Aggregate {
    column: String,
    reducer: Reducer,
    alias: Option<String>,
}

impl Aggregate {
    pub fn new(column: impl Into<String>, reducer: Reducer) -> Self {
        Self {
            column: column.into(),
            reducer,
            alias: None,
        }
    }

    pub fn mean(column: impl Into<String>) -> Self {
        Self::new(column, Reducer::Mean)
    }

    pub fn min(column: impl Into<String>) -> Self {
        Self::new(column, Reducer::Min)
    }

    pub fn max(column: impl Into<String>) -> Self {
        Self::new(column, Reducer::Max)
    }

    pub fn sum(column: impl Into<String>) -> Self {
        Self::new(column, Reducer::Sum)
    }

    /// Names the output column; defaults to the input column name.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub(crate) fn expr(&self) -> Expr {
        let column = col(self.column.as_str());
        let agg = match self.reducer {
            Reducer::Mean => column.mean(),
            Reducer::Min => column.min(),
            Reducer::Max => column.max(),
            // count() is the non-null count, so an all-null group takes the
            // null branch instead of the engine's zero-sum.
            Reducer::Sum => when(column.clone().count().gt(lit(0u32)))
                .then(column.sum())
                .otherwise(lit(NULL)),
        };
        match &self.alias {
            Some(alias) => agg.alias(alias.as_str()),
            None => agg,
        }
    }
}
