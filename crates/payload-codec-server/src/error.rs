//! API error types and responses.
//!
//! Every failure the server returns uses the same JSON body:
//! `{"error": {"code": "...", "message": "..."}}`. Diagnostics stay in the
//! logs; clients only see the short message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Why a request was refused before reaching the codec chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthRejection {
    /// No `Authorization` header, or an empty one.
    #[error("Authorization header required")]
    MissingHeader,

    /// The header is not `Bearer <token>`.
    #[error("Invalid authorization format. Use 'Bearer <token>'")]
    MalformedHeader,

    /// The token failed validation, or the key set was unavailable.
    #[error("Invalid JWT token")]
    InvalidToken,
}

/// API error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or rejected credentials.
    #[error(transparent)]
    Unauthorized(#[from] AuthRejection),

    /// Unknown namespace or unmatched route.
    #[error("Not found")]
    NotFound,

    /// Request body could not be read as a payload envelope.
    #[error("{0}")]
    BadRequest(&'static str),

    /// Codec routes only accept `POST`.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Request body exceeds the configured limit.
    #[error("Request body too large")]
    PayloadTooLarge,

    /// A codec stage failed; details are logged.
    #[error("Codec error")]
    Codec,

    /// Internal server error.
    #[error("Internal server error")]
    Internal,
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

/// Error details.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Codec | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "unauthorized",
            Self::NotFound => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::MethodNotAllowed => "method_not_allowed",
            Self::PayloadTooLarge => "payload_too_large",
            Self::Codec => "codec_error",
            Self::Internal => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_codes() {
        assert_eq!(
            ApiError::Unauthorized(AuthRejection::MissingHeader).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::BadRequest("Invalid JSON in request body").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::MethodNotAllowed.status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            ApiError::PayloadTooLarge.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::Codec.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Internal.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_codes() {
        assert_eq!(
            ApiError::from(AuthRejection::InvalidToken).code(),
            "unauthorized"
        );
        assert_eq!(ApiError::NotFound.code(), "not_found");
        assert_eq!(ApiError::MethodNotAllowed.code(), "method_not_allowed");
        assert_eq!(ApiError::Codec.code(), "codec_error");
    }

    #[test]
    fn rejection_messages() {
        assert_eq!(
            ApiError::from(AuthRejection::MissingHeader).to_string(),
            "Authorization header required"
        );
        assert_eq!(
            ApiError::from(AuthRejection::MalformedHeader).to_string(),
            "Invalid authorization format. Use 'Bearer <token>'"
        );
        assert_eq!(
            ApiError::from(AuthRejection::InvalidToken).to_string(),
            "Invalid JWT token"
        );
    }
}
