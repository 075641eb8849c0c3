use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::db::StoreError;
use crate::handlers::flash_redirect;
use crate::services::auth::AuthError;
use crate::services::booking::BookingError;

/// Errors as they surface at the request boundary. Each variant carries the
/// message shown to the user.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Inactive(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Sends the user back to `path` with the error as a flash message.
    /// Missing entities and internal failures keep their status codes.
    pub fn redirect_to(self, path: &str) -> Response {
        match self {
            AppError::NotFound(_) | AppError::Internal(_) => self.into_response(),
            other => flash_redirect(path, &other.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => AppError::NotFound(format!("{what} not found")),
            StoreError::DuplicateEmail => AppError::Conflict("Email already registered".into()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<BookingError> for AppError {
    fn from(e: BookingError) -> Self {
        match e {
            BookingError::ChargerInactive => AppError::Inactive(e.to_string()),
            BookingError::NoSlotsAvailable
            | BookingError::AlreadyCancelled
            | BookingError::AlreadyPaid => AppError::Conflict(e.to_string()),
            BookingError::NotFound(_) => AppError::NotFound(e.to_string()),
            BookingError::Unauthorized => AppError::Auth(e.to_string()),
            BookingError::Validation(msg) => AppError::Validation(msg),
            BookingError::Store(inner) => inner.into(),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => AppError::Auth(e.to_string()),
            AuthError::EmailTaken => AppError::Conflict(e.to_string()),
            AuthError::Validation(msg) => AppError::Validation(msg),
            AuthError::Credential(inner) => AppError::Internal(inner.to_string()),
            AuthError::Signing => AppError::Internal(e.to_string()),
            AuthError::Store(inner) => inner.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Inactive(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if let AppError::Internal(detail) = &self {
            tracing::error!(error = %detail, "request failed");
            return (status, "Something went wrong").into_response();
        }

        (status, self.to_string()).into_response()
    }
}
