//! Liveness endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tessera_core::AuthStore;

use crate::schemas::Health;
use crate::state::AppState;

pub fn router<S: AuthStore>() -> Router<AppState<S>> {
    Router::new().route("/health", get(health::<S>))
}

async fn health<S: AuthStore>(State(state): State<AppState<S>>) -> Json<Health> {
    Json(Health {
        status: "ok",
        service: state.settings.service_name.clone(),
        version: state.settings.version.clone(),
    })
}
