//! Authentication error types.

use tessera_core::error::CoreError;
use thiserror::Error;

/// Every way an auth operation can fail.
///
/// The first six variants are expected outcomes the caller can act on.
/// `Storage` wraps an unexpected persistence failure.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("user already exists")]
    UserAlreadyExists,

    #[error("user not found")]
    UserNotFound,

    #[error("user is inactive")]
    UserInactive,

    #[error("session not found")]
    SessionNotFound,

    #[error("session has been revoked")]
    SessionRevoked,

    #[error("session has expired")]
    SessionExpired,

    #[error("storage error: {0}")]
    Storage(CoreError),
}

impl From<CoreError> for AuthError {
    fn from(err: CoreError) -> Self {
        if err.is_conflict_on("user") {
            AuthError::UserAlreadyExists
        } else if err.is_stale_on("session") {
            // Another logout revoked the session first.
            AuthError::SessionRevoked
        } else {
            AuthError::Storage(err)
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
