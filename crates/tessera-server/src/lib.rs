//! Tessera Server — HTTP boundary over the auth service.
//!
//! Translates requests into auth operations and domain outcomes into
//! status codes, session cookies and problem payloads.

pub mod config;
pub mod cookie;
pub mod error;
pub mod problem;
pub mod routes;
pub mod schemas;
pub mod state;

use axum::Router;
use tessera_core::AuthStore;

pub use config::{ConfigError, Environment, Settings};
pub use error::ServerError;
pub use state::AppState;

/// Build the full application router over any storage backend.
pub fn router<S: AuthStore>(state: AppState<S>) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::auth::router())
        .with_state(state)
}
