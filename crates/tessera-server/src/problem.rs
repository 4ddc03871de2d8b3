//! Problem payloads (`application/problem+json`) for every error the HTTP
//! surface can return.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tessera_auth::AuthError;
use tracing::error;

const TYPE_BASE: &str = "https://tessera/errors/";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Problem {
    #[serde(rename = "type")]
    pub type_uri: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
}

impl Problem {
    pub fn new(status: StatusCode, kind: &str, title: &str, detail: impl Into<String>) -> Self {
        Self {
            type_uri: format!("{TYPE_BASE}{kind}"),
            title: title.to_owned(),
            status: status.as_u16(),
            detail: detail.into(),
        }
    }

    pub fn not_authenticated() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "not-authenticated",
            "Not authenticated",
            "No session cookie was presented.",
        )
    }

    pub fn invalid_email(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid-email",
            "Invalid email",
            detail,
        )
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal",
            "Internal server error",
            "The request could not be completed.",
        )
    }

    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<AuthError> for Problem {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UserAlreadyExists => Self::new(
                StatusCode::CONFLICT,
                "user-already-exists",
                "User already exists",
                "An account with this email is already registered.",
            ),
            AuthError::UserNotFound => Self::new(
                StatusCode::NOT_FOUND,
                "user-not-found",
                "User not found",
                "No account matches the given identity.",
            ),
            AuthError::UserInactive => Self::new(
                StatusCode::FORBIDDEN,
                "user-inactive",
                "User inactive",
                "This account has been deactivated.",
            ),
            AuthError::SessionNotFound => Self::new(
                StatusCode::UNAUTHORIZED,
                "invalid-session",
                "Invalid session",
                "The session token is not recognised.",
            ),
            AuthError::SessionExpired => Self::new(
                StatusCode::UNAUTHORIZED,
                "session-expired",
                "Session expired",
                "The session has expired; log in again.",
            ),
            AuthError::SessionRevoked => Self::new(
                StatusCode::UNAUTHORIZED,
                "session-revoked",
                "Session revoked",
                "The session has been logged out.",
            ),
            AuthError::Storage(e) => {
                error!(error = %e, "Storage failure while handling request");
                Self::internal()
            }
        }
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut response = (status, Json(self)).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        response
    }
}
