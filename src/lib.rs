mod dataset;
mod error;
mod model;
mod query;
mod table;

pub use error::EcocastError;

pub use dataset::error::DatasetError;
pub use dataset::remote::*;

pub use query::aggregate::*;
pub use query::error::QueryError;
pub use query::plan::*;

pub use table::*;

pub use model::error::ModelError;
pub use model::linear::*;
