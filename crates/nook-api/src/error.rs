use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use nook_types::ParseEnumError;

/// Marker carried by `PrivateLocked` so clients can route to the unlock flow.
pub const PRIVATE_LOCKED: &str = "private locked";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed input: bad enum, length violation, kind mismatch, missing
    /// field, duplicate name.
    #[error("{0}")]
    Validation(String),

    /// Absent, or absent from the set the caller is allowed to see.
    #[error("{0}")]
    NotFound(String),

    /// Private-surface miss. Deliberately says nothing about existence.
    #[error("forbidden")]
    Forbidden,

    /// The target exists behind an unlock the caller has not performed.
    #[error("private locked")]
    PrivateLocked,

    /// State-machine violation (PIN already set, PIN not set).
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden | Self::PrivateLocked => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ParseEnumError> for AppError {
    fn from(e: ParseEnumError) -> Self {
        Self::Validation(e.to_string())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    success: bool,
    status_code: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, code) = match &self {
            Self::PrivateLocked => (PRIVATE_LOCKED.to_string(), Some("PRIVATE_LOCKED")),
            Self::Internal(e) => {
                error!("Internal error: {:#}", e);
                ("Internal server error".to_string(), None)
            }
            other => (other.to_string(), None),
        };

        let body = ErrorBody {
            success: false,
            status_code: status.as_u16(),
            message,
            code,
        };
        (status, Json(body)).into_response()
    }
}

/// Successful response envelope: `{"success": true, "data": ...}`.
pub struct Success<T>(pub T);

impl<T: Serialize> IntoResponse for Success<T> {
    fn into_response(self) -> Response {
        Json(serde_json::json!({ "success": true, "data": self.0 })).into_response()
    }
}

/// Body for operations that return nothing but an acknowledgement.
pub fn done() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "success": true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_and_forbidden_share_status_but_not_message() {
        assert_eq!(AppError::PrivateLocked.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_ne!(AppError::PrivateLocked.to_string(), AppError::Forbidden.to_string());
        assert_eq!(AppError::PrivateLocked.to_string(), PRIVATE_LOCKED);
    }

    #[test]
    fn internal_errors_map_to_500() {
        let err: AppError = anyhow::anyhow!("disk on fire").into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
