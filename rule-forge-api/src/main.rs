//! rule-forge - main application entry point
//!
//! A multi-tenant rule-execution service: user-submitted transform
//! programs compiled ahead-of-time to sandboxed WASM and served over
//! an HTTP/JSON API.

use std::sync::Arc;

use rule_forge_api::{create_router, AppState};
use rule_forge_core::Config;
use rule_forge_storage::{PgStorage, Storage};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,rule_forge=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Missing DATABASE_URL / JWT_SECRET or a failed pool open are fatal.
    let config = Config::from_env()?;

    let storage = PgStorage::connect(&config.database_url).await?;
    storage.migrate().await?;
    let storage: Arc<dyn Storage> = Arc::new(storage);

    let state = Arc::new(AppState::from_config(storage, &config));
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!(%addr, "starting rule-forge server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
