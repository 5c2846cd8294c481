//! Common types, protocol definitions, and errors shared across `kms` crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
