//! Model error types.

/// Model errors.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Unknown run status name.
    #[error("Invalid run status '{0}'")]
    InvalidRunStatus(String),

    /// JSON serialization/deserialization failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
