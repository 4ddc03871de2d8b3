//! Auth endpoints.
//!
//! - `POST /auth/register`: create a user and open a session
//! - `POST /auth/login`: open a session for an existing user
//! - `POST /auth/logout`: revoke the presented session, always clears the cookie
//! - `GET /auth/me`: resolve the session cookie to its user
//!
//! Each handler runs exactly one auth operation inside its own unit of
//! work. The unit is committed only on success; any early return drops it.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::CookieJar;
use tessera_auth::AuthError;
use tessera_core::{AuthStore, UnitOfWork};
use tracing::{debug, info, warn};

use crate::cookie::{SessionToken, removal_cookie, session_cookie};
use crate::problem::Problem;
use crate::schemas::{AuthEmailIn, UserSummary};
use crate::state::AppState;

pub fn router<S: AuthStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/auth/register", post(register::<S>))
        .route("/auth/login", post(login::<S>))
        .route("/auth/logout", post(logout::<S>))
        .route("/auth/me", get(me::<S>))
}

async fn register<S: AuthStore>(
    State(state): State<AppState<S>>,
    jar: CookieJar,
    Json(body): Json<AuthEmailIn>,
) -> Result<(StatusCode, CookieJar, Json<UserSummary>), Problem> {
    body.validate()?;

    let uow = state.store.begin();
    let grant = state.auth.register_user(&uow, &body.email).await?;
    // A concurrent registration can still win at commit time.
    uow.commit().await.map_err(AuthError::from)?;

    let jar = jar.add(session_cookie(&grant.token, &state.settings));
    Ok((StatusCode::CREATED, jar, Json(UserSummary::from(&grant.user))))
}

async fn login<S: AuthStore>(
    State(state): State<AppState<S>>,
    jar: CookieJar,
    Json(body): Json<AuthEmailIn>,
) -> Result<(CookieJar, Json<UserSummary>), Problem> {
    body.validate()?;

    let uow = state.store.begin();
    let grant = state.auth.login_user(&uow, &body.email).await?;
    uow.commit().await.map_err(AuthError::from)?;

    let jar = jar.add(session_cookie(&grant.token, &state.settings));
    Ok((jar, Json(UserSummary::from(&grant.user))))
}

async fn logout<S: AuthStore>(
    State(state): State<AppState<S>>,
    jar: CookieJar,
) -> (StatusCode, CookieJar) {
    if let Some(SessionToken(token)) = SessionToken::from_jar(&jar) {
        let uow = state.store.begin();
        match state.auth.logout_session(&uow, &token).await {
            Ok(()) => {
                if let Err(e) = uow.commit().await {
                    warn!(error = %e, "Logout commit failed; clearing cookie anyway");
                }
            }
            Err(e) => debug!(error = %e, "Logout refused; clearing cookie anyway"),
        }
    } else {
        debug!("Logout without session cookie");
    }

    info!("Session cookie cleared");
    (StatusCode::NO_CONTENT, jar.add(removal_cookie(&state.settings)))
}

async fn me<S: AuthStore>(
    State(state): State<AppState<S>>,
    SessionToken(token): SessionToken,
) -> Result<Json<UserSummary>, Problem> {
    let uow = state.store.begin();
    let user = state.auth.get_user_for_session(&uow, &token).await?;
    Ok(Json(UserSummary::from(&user)))
}
