use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    /// A column referenced by the plan does not exist in the dataset schema.
    #[error("Referenced column missing from query input")]
    Schema(#[source] PolarsError),

    /// Network or I/O failure while pulling data during materialization.
    #[error("Remote read failed during materialization")]
    RemoteRead(#[source] PolarsError),

    #[error("Query evaluation failed")]
    Polars(#[from] PolarsError),
}

impl QueryError {
    /// Sorts an engine error into the kinds callers are expected to match on.
    pub(crate) fn from_polars(error: PolarsError) -> Self {
        match error {
            PolarsError::ColumnNotFound(_)
            | PolarsError::SchemaFieldNotFound(_)
            | PolarsError::SchemaMismatch(_) => QueryError::Schema(error),
            PolarsError::IO { .. } => QueryError::RemoteRead(error),
            other => QueryError::Polars(other),
        }
    }
}
