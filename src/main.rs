//! Wallet ledger service - application entry point.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Wire the ledger, notifier, duplicate-request guard and gateway client
//! 5. Start server on configured port

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use wallet_ledger::{
    config::Config,
    db,
    gateway::RazorpayGateway,
    idempotency::MemoryIdempotencyGuard,
    router,
    services::notification_service::{Notifier, PgNotificationSink},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG, defaults to "info"
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let gateway = RazorpayGateway::new(
        &config.gateway_base_url,
        config.gateway_key_id.clone(),
        config.gateway_key_secret.clone(),
    )?;
    let notifier = Notifier::new(Arc::new(PgNotificationSink::new(pool.clone())));
    let idempotency = MemoryIdempotencyGuard::new(config.idempotency_ttl());

    let state = AppState::new(
        pool,
        &config,
        notifier,
        Arc::new(idempotency),
        Arc::new(gateway),
    );
    let app = router(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
