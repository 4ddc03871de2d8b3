//! Shared application state handed to every handler.

use std::sync::Arc;

use tessera_auth::AuthService;
use tessera_core::AuthStore;

use crate::config::Settings;

#[derive(Clone)]
pub struct AppState<S: AuthStore> {
    pub store: S,
    pub auth: AuthService,
    pub settings: Arc<Settings>,
}

impl<S: AuthStore> AppState<S> {
    pub fn new(store: S, auth: AuthService, settings: Settings) -> Self {
        Self {
            store,
            auth,
            settings: Arc::new(settings),
        }
    }
}
