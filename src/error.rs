use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failure kinds surfaced by the user API.
///
/// Every variant except [`ApiError::Internal`] is caused by the client and can
/// be fixed by correcting the request. `Internal` carries only a generic,
/// operation-specific message; the underlying cause is logged where it occurs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Invalid user ID")]
    InvalidIdentifier,

    #[error("Username, email, and phone are required")]
    MissingFields,

    #[error("Invalid request body")]
    MalformedBody,

    #[error("Email already exists")]
    DuplicateEmail,

    #[error("User not found")]
    NotFound,

    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidIdentifier | ApiError::MissingFields | ApiError::MalformedBody => {
                StatusCode::BAD_REQUEST
            }
            ApiError::DuplicateEmail => StatusCode::CONFLICT,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failure half of the response envelope.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
