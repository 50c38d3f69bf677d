//! Application-level error type returned by handlers.
//!
//! All variants serialise to the [`ErrorResponse`] JSON format and map to the
//! appropriate HTTP status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use riverdata::{FormatError, MaskError};
use riverdata_api::{codes, ErrorResponse};

use crate::storage::StorageError;

/// An error that a handler can return; converts directly to an HTTP response.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    NotAcceptable(String),
    NotImplemented(String),
    Integrity(String),
    Formatting(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, codes::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, codes::INVALID_PARAMETER, msg),
            AppError::NotAcceptable(msg) => (StatusCode::NOT_ACCEPTABLE, codes::NOT_ACCEPTABLE, msg),
            AppError::NotImplemented(msg) => {
                (StatusCode::NOT_IMPLEMENTED, codes::NOT_IMPLEMENTED, msg)
            }
            AppError::Integrity(msg) => {
                tracing::warn!("integrity violation: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, codes::INTEGRITY_VIOLATION, msg)
            }
            AppError::Formatting(msg) => {
                tracing::warn!("formatting failed: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, codes::FORMATTING_FAILED, msg)
            }
            AppError::Internal(msg) => {
                tracing::warn!("internal error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, codes::INTERNAL_ERROR, msg)
            }
        };
        let body = ErrorResponse::new(code, message);
        (status, Json(body)).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => AppError::NotFound("not found".into()),
            StorageError::Invalid(msg) => AppError::BadRequest(msg),
            StorageError::Integrity(v) => AppError::Integrity(v.to_string()),
            // Reads never conflict.
            StorageError::Conflict(msg) => AppError::Internal(msg),
            StorageError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<FormatError> for AppError {
    fn from(e: FormatError) -> Self {
        let msg = e.to_string();
        match e {
            FormatError::NotAcceptable { .. } => AppError::NotAcceptable(msg),
            FormatError::NotImplemented { .. } => AppError::NotImplemented(msg),
            FormatError::Formatting(_) => AppError::Formatting(msg),
        }
    }
}

impl From<MaskError> for AppError {
    fn from(e: MaskError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riverdata::{EntityKind, IntegrityViolation};

    #[test]
    fn format_errors_map_to_406_and_501() {
        let e: AppError = FormatError::NotAcceptable {
            requested: "text/plain".into(),
            kind: EntityKind::Office,
        }
        .into();
        assert_eq!(e.into_response().status(), StatusCode::NOT_ACCEPTABLE);

        let e: AppError = FormatError::NotImplemented {
            content_type: "text/csv;version=1".into(),
            kind: EntityKind::Location,
        }
        .into();
        assert_eq!(e.into_response().status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[test]
    fn integrity_is_a_server_error() {
        let e: AppError = StorageError::Integrity(IntegrityViolation {
            what: "rating template X".into(),
            found: 2,
        })
        .into();
        assert!(matches!(e, AppError::Integrity(_)));
        assert_eq!(e.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
