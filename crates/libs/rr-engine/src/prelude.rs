//! Common types and utilities.

/// Engine error type.
pub use crate::error::Error;

/// Engine result type.
pub type Result<T> = core::result::Result<T, Error>;
