use crate::table::TableError;
use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    /// Fewer data rows remain than the model's degrees of freedom.
    #[error(
        "Not enough rows to fit {predictors} predictor(s): \
         need at least {required}, had {actual} after null handling"
    )]
    InsufficientData {
        predictors: usize,
        required: usize,
        actual: usize,
    },

    /// The forecast input is missing a predictor the model was fit with.
    #[error("Forecast input is missing required predictor column '{column}'")]
    SchemaMismatch { column: String },

    #[error("Column '{column}' contains {nulls} null value(s) and the null policy is Fail")]
    NullsInFit { column: String, nulls: usize },

    #[error("Numerical failure while solving the normal equations: {0}")]
    Numerical(String),

    #[error("Failed to build forecast output")]
    Output(#[source] PolarsError),

    #[error(transparent)]
    Table(#[from] TableError),
}
