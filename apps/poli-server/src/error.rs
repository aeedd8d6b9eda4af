//! # API Errors
//!
//! Every failure leaves the server as `{ "code": "<KIND>", "message": "..." }`.
//!
//! ## Status Mapping
//! ```text
//! ErrorKind::InvalidInput       → 400  INVALID_INPUT
//! (missing caller headers)      → 401  UNAUTHORIZED
//! ErrorKind::Forbidden          → 403  FORBIDDEN
//! ErrorKind::NotFound           → 404  NOT_FOUND
//! ErrorKind::InvalidState       → 409  INVALID_STATE
//! ErrorKind::RegisterClosed     → 409  REGISTER_CLOSED
//! ErrorKind::InsufficientFunds  → 422  INSUFFICIENT_FUNDS
//! ErrorKind::Internal           → 500  INTERNAL (detail only in the log)
//! ```

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use poli_core::{CoreError, ErrorKind};
use poli_db::{DbError, PosError};

/// Message shown for every internal failure.
const INTERNAL_MESSAGE: &str = "Internal server error";

/// Wire form of an error.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

/// An error ready to be turned into an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        let (status, code) = match kind {
            ErrorKind::InvalidInput => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            ErrorKind::InvalidState => (StatusCode::CONFLICT, "INVALID_STATE"),
            ErrorKind::InsufficientFunds => (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_FUNDS"),
            ErrorKind::RegisterClosed => (StatusCode::CONFLICT, "REGISTER_CLOSED"),
            ErrorKind::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        };

        ApiError {
            status,
            code,
            message: message.into(),
        }
    }

    /// Missing or malformed caller identity.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::UNAUTHORIZED,
            code: "UNAUTHORIZED",
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::from_kind(ErrorKind::Forbidden, message)
    }

    pub fn not_found(entity: &str, id: &str) -> Self {
        Self::from_kind(ErrorKind::NotFound, format!("{entity} not found: {id}"))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::from_kind(ErrorKind::InvalidInput, message)
    }

    /// Logs the detail and hides it from the client.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        error!(error = %detail, "Request failed");
        Self::from_kind(ErrorKind::Internal, INTERNAL_MESSAGE)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<PosError> for ApiError {
    fn from(err: PosError) -> Self {
        match err {
            PosError::Rejected(e) => e.into(),
            PosError::Store(e) => e.into(),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::from_kind(err.kind(), err.to_string())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err.kind() {
            ErrorKind::Internal => ApiError::internal(err),
            kind => ApiError::from_kind(kind, err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use poli_core::{Money, ValidationError};

    #[test]
    fn test_rejections_map_to_status() {
        let err: ApiError = PosError::Rejected(CoreError::InsufficientFunds {
            available: Money::new(30_000),
            requested: Money::new(40_000),
        })
        .into();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), "INSUFFICIENT_FUNDS");

        let err: ApiError = PosError::from(CoreError::RegisterClosed).into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "REGISTER_CLOSED");

        let err: ApiError = PosError::from(ValidationError::Empty {
            field: "items".into(),
        })
        .into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_store_errors_hide_detail() {
        let err: ApiError = DbError::QueryFailed("no such table: sales".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, INTERNAL_MESSAGE);

        let err: ApiError = DbError::duplicate("users.username", "ana").into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
