//! Error types for auth middleware and extractors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use turnstile_auth_core::AuthError;

/// Rejection produced by the layers and extractors.
#[derive(Debug, thiserror::Error)]
pub enum AuthRejection {
    /// No verified identity on the request.
    #[error("authentication required")]
    Unauthenticated,

    /// Request body could not be read.
    #[error("unreadable request body")]
    InvalidBody,

    /// Protocol failure from the auth core.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl AuthRejection {
    /// HTTP status for this rejection.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::InvalidBody => StatusCode::BAD_REQUEST,
            Self::Auth(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::InvalidBody => "INVALID_BODY",
            Self::Auth(e) => e.error_code(),
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Auth(e) if e.is_infrastructure() => {
                tracing::error!(error = %e, "Auth infrastructure failure");
                if status == StatusCode::SERVICE_UNAVAILABLE {
                    "service temporarily unavailable".to_string()
                } else {
                    "internal error".to_string()
                }
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
