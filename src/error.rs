use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Error surface shared by every handler. Each variant maps to one HTTP
/// status; the body is always `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum AppError {
    /// Validation or business-rule violation (400).
    #[error("{0}")]
    Validation(String),

    /// Missing/invalid credentials or token (401).
    #[error("{0}")]
    Auth(String),

    /// Unknown resource: email, account id, reset challenge (404).
    #[error("{0}")]
    NotFound(String),

    /// Duplicate email within a role store (409).
    #[error("{0}")]
    Conflict(String),

    /// Outbound email could not be dispatched (500).
    #[error("{0}")]
    Delivery(String),

    /// Anything unexpected: database, storage, crypto (500).
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Delivery(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_taxonomy() {
        assert_eq!(
            AppError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Auth("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::NotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::Delivery("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn body_carries_message() {
        let err = AppError::Conflict("Email already registered".into());
        assert_eq!(err.to_string(), "Email already registered");
    }
}
