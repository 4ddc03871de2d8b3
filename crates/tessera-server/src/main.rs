//! Tessera Server — application entry point.

use tessera_auth::AuthService;
use tessera_db::DbManager;
use tessera_server::{AppState, ServerError, Settings};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tessera=info".parse()?))
        .json()
        .init();

    let settings = Settings::from_env()?;
    info!(
        service = %settings.service_name,
        version = %settings.version,
        environment = %settings.environment,
        "Starting tessera server"
    );

    let db = DbManager::connect(&settings.db).await?;
    db.migrate().await?;

    let store = db.auth_store();
    let auth = AuthService::new(settings.auth.clone());
    let bind_addr = settings.bind_addr;
    let app = tessera_server::router(AppState::new(store, auth, settings));

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(addr = %bind_addr, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Tessera server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
