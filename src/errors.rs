use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::auth::PasswordHashError;
use crate::db::StoreError;
use crate::services::BookingError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Password(#[from] PasswordHashError),

    #[error("token signing failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: admins only")]
    Forbidden,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Booking(err) => match err {
                BookingError::InvalidTimeRange => StatusCode::BAD_REQUEST,
                BookingError::FieldNotFound(_) => StatusCode::NOT_FOUND,
                BookingError::NotFound(_) => StatusCode::NOT_FOUND,
                BookingError::SlotUnavailable => StatusCode::CONFLICT,
                BookingError::InvalidTransition { .. } => StatusCode::CONFLICT,
                BookingError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Store(_) | AppError::Password(_) | AppError::Token(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Store details stay in the logs.
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}
