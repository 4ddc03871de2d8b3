//! Authentication service: registration, login, logout and session
//! resolution.

use std::sync::Arc;

use tessera_core::models::session::Session;
use tessera_core::models::user::{User, normalize_email};
use tessera_core::repository::AuthRepository;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::token;

/// A freshly created session together with its plaintext token.
///
/// This is the only place the plaintext token ever exists server-side;
/// it cannot be recovered from storage later.
#[derive(Debug, Clone)]
pub struct SessionGrant {
    pub user: User,
    pub session: Session,
    /// Raw opaque token (return to client, not stored).
    pub token: String,
}

/// Authentication service.
///
/// Holds no storage handle: every operation receives the repository of
/// the caller's unit of work, so one service instance can serve any
/// number of concurrent requests.
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    clock: Arc<dyn Clock>,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: AuthConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    /// Register a new user and open their first session.
    pub async fn register_user<R: AuthRepository>(
        &self,
        repo: &R,
        email: &str,
    ) -> AuthResult<SessionGrant> {
        let email = normalize_email(email);
        if repo.find_user_by_email(&email).await?.is_some() {
            debug!(email = %email, "Registration refused: email already on file");
            return Err(AuthError::UserAlreadyExists);
        }

        let now = self.clock.now();
        let mut user = User::new(email, now);
        // Registration counts as the first login.
        user.last_login_at = Some(now);
        repo.add_user(&user).await?;
        repo.flush().await?;

        let (session, token) = self.create_session(repo, &user).await?;
        info!(user_id = %user.id, session_id = %session.id, "User registered");
        Ok(SessionGrant {
            user,
            session,
            token,
        })
    }

    /// Log in an existing, active user and open a new session.
    ///
    /// Existing sessions of the user are left untouched.
    pub async fn login_user<R: AuthRepository>(
        &self,
        repo: &R,
        email: &str,
    ) -> AuthResult<SessionGrant> {
        let email = normalize_email(email);
        let mut user = repo
            .find_user_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if !user.is_active {
            warn!(user_id = %user.id, "Login refused: user inactive");
            return Err(AuthError::UserInactive);
        }

        user.last_login_at = Some(self.clock.now());
        repo.add_user(&user).await?;

        let (session, token) = self.create_session(repo, &user).await?;
        info!(user_id = %user.id, session_id = %session.id, "User logged in");
        Ok(SessionGrant {
            user,
            session,
            token,
        })
    }

    /// Revoke the session identified by `token`.
    pub async fn logout_session<R: AuthRepository>(&self, repo: &R, token: &str) -> AuthResult<()> {
        let mut session = self.live_session(repo, token).await?;

        session.revoked_at = Some(self.clock.now());
        repo.add_session(&session).await?;
        info!(session_id = %session.id, user_id = %session.user_id, "Session revoked");
        Ok(())
    }

    /// Resolve the user owning a valid session.
    pub async fn get_user_for_session<R: AuthRepository>(
        &self,
        repo: &R,
        token: &str,
    ) -> AuthResult<User> {
        let session = self.live_session(repo, token).await?;

        let user = match repo.find_user_by_id(session.user_id).await? {
            Some(user) => user,
            None => {
                warn!(
                    session_id = %session.id,
                    user_id = %session.user_id,
                    "Session references a missing user"
                );
                return Err(AuthError::UserNotFound);
            }
        };
        if !user.is_active {
            debug!(user_id = %user.id, "Session refused: user inactive");
            return Err(AuthError::UserInactive);
        }
        Ok(user)
    }

    /// Look up the session for `token` and require it to be neither
    /// revoked nor expired. Revocation is checked first.
    async fn live_session<R: AuthRepository>(&self, repo: &R, token: &str) -> AuthResult<Session> {
        let token_hash = token::hash_token(token);
        let session = repo
            .find_session_by_token_hash(&token_hash)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        if session.is_revoked() {
            debug!(session_id = %session.id, "Session refused: revoked");
            return Err(AuthError::SessionRevoked);
        }
        if session.is_expired_at(self.clock.now()) {
            debug!(session_id = %session.id, "Session refused: expired");
            return Err(AuthError::SessionExpired);
        }
        Ok(session)
    }

    async fn create_session<R: AuthRepository>(
        &self,
        repo: &R,
        user: &User,
    ) -> AuthResult<(Session, String)> {
        let raw = token::generate_token();
        let session = Session::new(
            user.id,
            token::hash_token(&raw),
            self.clock.now(),
            self.config.session_ttl(),
        );
        repo.add_session(&session).await?;
        Ok((session, raw))
    }
}
