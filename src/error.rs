use crate::dataset::error::DatasetError;
use crate::model::error::ModelError;
use crate::query::error::QueryError;
use crate::table::TableError;
use thiserror::Error;

/// Top-level error for the crate.
///
/// Each pipeline stage has its own error enum; this type wraps them so a whole
/// pipeline run can be written against a single error type.
#[derive(Debug, Error)]
pub enum EcocastError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Model(#[from] ModelError),
}
