//! Materialized time-series tables and the join layer.
//!
//! A [`TimeSeriesTable`] is the finite, in-memory output of
//! [`QueryPlan::materialize`](crate::QueryPlan::materialize). Records are keyed
//! by a site identifier and a calendar day; duplicate (site, date) keys are a
//! data-quality condition upstream data may exhibit, not something the table
//! detects or rejects.

use polars::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Column '{0}' not found in table")]
    ColumnNotFound(String),

    #[error("Column '{column}' cannot be read as numeric")]
    NonNumericColumn {
        column: String,
        #[source]
        source: PolarsError,
    },

    #[error("Join on {on:?} failed")]
    Join {
        on: Vec<String>,
        #[source]
        source: PolarsError,
    },
}

/// Join semantics for aligning two tables on shared key columns.
///
/// There is no single universally-correct mode: left-joining a sparse covariate
/// (precipitation is a common example) against a denser target table introduces
/// pervasive nulls, while an inner join is the right choice when a downstream
/// model requires that covariate as a non-null predictor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinMode {
    /// Keep every left row; unmatched right-side columns become null.
    Left,
    /// Keep only rows whose key is present in both tables.
    Inner,
}

impl JoinMode {
    pub(crate) fn join_type(&self) -> JoinType {
        match self {
            JoinMode::Left => JoinType::Left,
            JoinMode::Inner => JoinType::Inner,
        }
    }
}

/// An owned, materialized table of time-series records.
///
/// The underlying frame is exposed directly for callers that want to keep
/// working with the engine's own API; the methods here cover what the pipeline
/// stages need.
#[derive(Debug, Clone)]
pub struct TimeSeriesTable {
    /// The underlying materialized frame.
    pub frame: DataFrame,
}

impl TimeSeriesTable {
    pub fn new(frame: DataFrame) -> Self {
        Self { frame }
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.column(name).is_ok()
    }

    /// Reads a column as `f64` values, casting if needed. Nulls stay `None`.
    pub fn column_f64(&self, name: &str) -> Result<Vec<Option<f64>>, TableError> {
        let column = self
            .frame
            .column(name)
            .map_err(|_| TableError::ColumnNotFound(name.to_string()))?;
        let casted = column
            .as_materialized_series()
            .cast(&DataType::Float64)
            .map_err(|source| TableError::NonNumericColumn {
                column: name.to_string(),
                source,
            })?;
        let values = casted
            .f64()
            .map_err(|source| TableError::NonNumericColumn {
                column: name.to_string(),
                source,
            })?;
        Ok(values.into_iter().collect())
    }

    /// Joins this table with another on the given key columns.
    ///
    /// With [`JoinMode::Left`] the result never has fewer rows than `self`;
    /// with [`JoinMode::Inner`] it never has more rows than either input
    /// (assuming unique keys on both sides).
    ///
    /// # Example
    ///
    /// ```
    /// use ecocast::{JoinMode, TimeSeriesTable};
    /// use polars::prelude::*;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let targets = TimeSeriesTable::new(df!(
    ///     "site_id" => ["S1", "S1"],
    ///     "date" => ["2022-06-01", "2022-06-02"],
    ///     "temp" => [10.0, 12.0],
    /// )?);
    /// let drivers = TimeSeriesTable::new(df!(
    ///     "site_id" => ["S1"],
    ///     "date" => ["2022-06-01"],
    ///     "rh" => [50.0],
    /// )?);
    ///
    /// let joined = targets.join(&drivers, &["site_id", "date"], JoinMode::Left)?;
    /// assert_eq!(joined.height(), 2);
    /// # Ok(())
    /// # }
    /// ```
    pub fn join(
        &self,
        other: &TimeSeriesTable,
        on: &[&str],
        mode: JoinMode,
    ) -> Result<TimeSeriesTable, TableError> {
        let keys: Vec<Expr> = on.iter().map(|k| col(*k)).collect();
        self.frame
            .clone()
            .lazy()
            .join(
                other.frame.clone().lazy(),
                keys.clone(),
                keys,
                JoinArgs::new(mode.join_type()),
            )
            .collect()
            .map(TimeSeriesTable::new)
            .map_err(|source| TableError::Join {
                on: on.iter().map(|k| k.to_string()).collect(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets() -> TimeSeriesTable {
        TimeSeriesTable::new(
            df!(
                "site_id" => ["S1", "S1"],
                "date" => ["2022-06-01", "2022-06-02"],
                "temp" => [10.0f64, 12.0],
            )
            .unwrap(),
        )
    }

    fn drivers() -> TimeSeriesTable {
        TimeSeriesTable::new(
            df!(
                "site_id" => ["S1"],
                "date" => ["2022-06-01"],
                "rh" => [50.0f64],
            )
            .unwrap(),
        )
    }

    #[test]
    fn left_join_keeps_every_left_row() -> Result<(), TableError> {
        let joined = targets().join(&drivers(), &["site_id", "date"], JoinMode::Left)?;

        assert_eq!(joined.height(), 2);
        let rh = joined.column_f64("rh")?;
        assert_eq!(rh, vec![Some(50.0), None]);
        Ok(())
    }

    #[test]
    fn inner_join_keeps_only_matched_keys() -> Result<(), TableError> {
        let joined = targets().join(&drivers(), &["site_id", "date"], JoinMode::Inner)?;

        assert_eq!(joined.height(), 1);
        let rh = joined.column_f64("rh")?;
        assert_eq!(rh, vec![Some(50.0)]);
        Ok(())
    }

    #[test]
    fn join_cardinality_bounds() -> Result<(), TableError> {
        let a = targets();
        let b = drivers();

        let left = a.join(&b, &["site_id", "date"], JoinMode::Left)?;
        assert!(left.height() >= a.height());

        let inner = a.join(&b, &["site_id", "date"], JoinMode::Inner)?;
        assert!(inner.height() <= a.height().min(b.height()));
        Ok(())
    }

    #[test]
    fn join_on_missing_key_column_fails() {
        let result = targets().join(&drivers(), &["station"], JoinMode::Inner);
        assert!(matches!(result, Err(TableError::Join { .. })));
    }

    #[test]
    fn column_f64_casts_integers() -> Result<(), TableError> {
        let table = TimeSeriesTable::new(
            df!(
                "site_id" => ["S1"],
                "count" => [3i64],
            )
            .unwrap(),
        );
        assert_eq!(table.column_f64("count")?, vec![Some(3.0)]);
        Ok(())
    }

    #[test]
    fn column_f64_missing_column() {
        let result = targets().column_f64("nope");
        assert!(matches!(result, Err(TableError::ColumnNotFound(_))));
    }
}
