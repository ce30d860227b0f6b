//! Error types for the RR daemon.
//!
//! Handler errors are turned into JSON error responses. Not-found conditions
//! map to 404 and collaborator failures to 502.

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tracing::error;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] rr_config::error::Error),

    #[error(transparent)]
    Engine(#[from] rr_engine::error::Error),

    #[error(transparent)]
    Request(#[from] rr_requests::Error),
}

impl Error {
    fn status(&self) -> StatusCode {
        match self {
            Error::Engine(err) if err.is_not_found() => StatusCode::NOT_FOUND,
            Error::Engine(rr_engine::error::Error::Collaborator(_)) | Error::Request(_) => {
                StatusCode::BAD_GATEWAY
            }
            Error::Engine(_) | Error::IO(_) | Error::Json(_) | Error::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        error!("Creating API error response for error: {:?}", self);
        let status = self.status();
        let message = match status {
            StatusCode::NOT_FOUND => self.to_string(),
            StatusCode::BAD_GATEWAY => String::from("Run management unavailable"),
            _ => String::from("Internal server error"),
        };

        let body = Json(json!({
            "error": {
                "message": message,
                "status": status.as_u16()
            }
        }));
        (status, body).into_response()
    }
}
