pub mod aggregate;
pub mod error;
pub mod plan;
