//! Loyalty API server: loads config, prepares the store backend, mounts routes.

use pet_loyalty::{
    app, apply_migrations, ensure_database_exists, AppConfig, AppState, InMemoryStore, PgStore, Seed,
    StoreBackend, Stores,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pet_loyalty=info,tower_http=info")),
        )
        .init();
    let config = AppConfig::from_env()?;
    tracing::info!(env = config.env.as_str(), store = ?config.store, "starting");

    let stores = match config.store {
        StoreBackend::Postgres => {
            ensure_database_exists(&config.db).await?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.db.max_connections)
                .connect_with(config.db.connect_options())
                .await?;
            apply_migrations(&pool).await?;
            Stores::shared(Arc::new(PgStore::new(pool)))
        }
        StoreBackend::Memory => {
            let store = match &config.seed_file {
                Some(path) => {
                    tracing::info!(path = %path.display(), "seeding memory store");
                    InMemoryStore::from_seed(Seed::from_file(path).await?)?
                }
                None => InMemoryStore::new(),
            };
            Stores::shared(Arc::new(store))
        }
    };

    let router = app(AppState::new(stores));
    let listener = TcpListener::bind(SocketAddr::new(config.host, config.port)).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
