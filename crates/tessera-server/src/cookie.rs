//! Session cookie construction and extraction.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::config::Settings;
use crate::problem::Problem;

pub const SESSION_COOKIE: &str = "tessera_session";

/// Cookie carrying the plaintext session token.
pub fn session_cookie(token: &str, settings: &Settings) -> Cookie<'static> {
    let max_age = i64::try_from(settings.auth.session_ttl_secs).unwrap_or(i64::MAX);
    Cookie::build((SESSION_COOKIE, token.to_owned()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(settings.secure_cookies())
        .path("/")
        .max_age(time::Duration::seconds(max_age))
        .build()
}

/// Cookie that instructs the client to drop its session cookie.
pub fn removal_cookie(settings: &Settings) -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(settings.secure_cookies())
        .path("/")
        .build();
    cookie.make_removal();
    cookie
}

/// Session token read from the request cookie.
///
/// Rejects with a 401 `not-authenticated` problem when the cookie is
/// missing or empty, before any domain code runs.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

impl SessionToken {
    pub fn from_jar(jar: &CookieJar) -> Option<Self> {
        jar.get(SESSION_COOKIE)
            .map(|c| c.value().to_owned())
            .filter(|v| !v.is_empty())
            .map(Self)
    }
}

impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = Problem;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_jar(&CookieJar::from_headers(&parts.headers)).ok_or_else(Problem::not_authenticated)
    }
}
