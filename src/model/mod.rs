pub mod error;
pub mod linear;
