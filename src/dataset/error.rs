use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    /// The endpoint is unreachable or the base path does not exist.
    #[error("Failed to connect to dataset at '{uri}'")]
    Connection {
        uri: String,
        #[source]
        source: PolarsError,
    },

    #[error("Invalid cloud configuration for '{uri}'")]
    CloudConfig {
        uri: String,
        #[source]
        source: PolarsError,
    },

    #[error("Unknown partition key '{key}' (declared keys: {declared:?})")]
    UnknownPartitionKey { key: String, declared: Vec<String> },

    #[error("Partition key '{key}' is bound more than once")]
    DuplicatePartitionBinding { key: String },

    #[error(
        "Directory-style partition bindings must follow the declared key order; \
         expected '{expected}' at position {position}, got '{got}'"
    )]
    NonPrefixBinding {
        expected: String,
        got: String,
        position: usize,
    },

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
