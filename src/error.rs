//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] covers request validation, missing resources and
//! infrastructure failures. Expected check-in results (unknown code, out of
//! range, duplicate) are not errors; they are
//! [`crate::domain::CheckInOutcome`] values.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::event::{EventValidationError, MissingLocation};
use crate::domain::{CodeFormatError, CoordinateError, EventId};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1002,
///     "message": "malformed check-in code: scanned payload is empty",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see the table on [`GatewayError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status               |
/// |-----------|-----------------|---------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request           |
/// | 2000–2999 | Not Found       | 404 Not Found             |
/// | 3000–3999 | Server          | 500 Internal Server Error |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The scanned payload is neither a bare code nor a check-in URI.
    #[error("malformed check-in code: {0}")]
    MalformedCode(#[from] CodeFormatError),

    /// Latitude, longitude or radius out of range.
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(#[from] CoordinateError),

    /// Event with the given ID was not found.
    #[error("event not found: {0}")]
    EventNotFound(EventId),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::MalformedCode(_) => 1002,
            Self::InvalidCoordinate(_) => 1003,
            Self::EventNotFound(_) => 2001,
            Self::PersistenceError(_) => 3001,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::MalformedCode(_) | Self::InvalidCoordinate(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::EventNotFound(_) => StatusCode::NOT_FOUND,
            Self::PersistenceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<EventValidationError> for GatewayError {
    fn from(err: EventValidationError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

impl From<JsonRejection> for GatewayError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for GatewayError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<MissingLocation> for GatewayError {
    fn from(err: MissingLocation) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_statuses_line_up() {
        let cases = [
            (
                GatewayError::InvalidRequest("x".into()),
                1001,
                StatusCode::BAD_REQUEST,
            ),
            (
                GatewayError::MalformedCode(CodeFormatError::Empty),
                1002,
                StatusCode::BAD_REQUEST,
            ),
            (
                GatewayError::InvalidCoordinate(CoordinateError::Latitude(100.0)),
                1003,
                StatusCode::BAD_REQUEST,
            ),
            (
                GatewayError::EventNotFound(EventId::new(1)),
                2001,
                StatusCode::NOT_FOUND,
            ),
            (
                GatewayError::PersistenceError("down".into()),
                3001,
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, code, status) in cases {
            assert_eq!(err.error_code(), code);
            assert_eq!(err.status_code(), status);
        }
    }

    #[test]
    fn into_response_sets_status() {
        let response = GatewayError::EventNotFound(EventId::new(3)).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn missing_location_becomes_invalid_request() {
        let err = GatewayError::from(MissingLocation);
        assert_eq!(err.error_code(), 1001);
    }
}
