pub mod error;
pub mod remote;
