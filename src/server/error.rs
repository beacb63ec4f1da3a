//! Error type returned by the handlers
//!
//! Every failure becomes a status code plus a `{"error": ...}` JSON body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::upstream::FetchError;

/// Errors surfaced to inbound clients
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed body, missing field, or a required field left empty
    #[error("{0}")]
    Validation(String),

    /// Upstream answered with an error status or could not be reached
    #[error(transparent)]
    Upstream(#[from] FetchError),

    /// Upstream answered 200 with a body that is not a JSON document
    #[error("API returned a body that is not valid JSON: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) | ApiError::InvalidPayload(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON body of every error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}
