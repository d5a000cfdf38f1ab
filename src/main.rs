use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use csv_explorer::app::{router, AppState};
use csv_explorer::auth::bootstrap_admin;
use csv_explorer::config;
use csv_explorer::database::{schema, DatabaseManager, PgGateway};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so DATABASE_URL, SMTP_* etc. are picked up
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    tracing::info!("Starting CSV Explorer in {:?} mode", config.environment);
    if csv_explorer::is_production!() && config.security.bootstrap_admin_password == "admin" {
        tracing::warn!("BOOTSTRAP_ADMIN_PASSWORD is unset; a fresh database gets the default admin password");
    }

    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("database is unreachable")?;
    schema::migrate(&pool).await.context("schema migration failed")?;

    let gateway = Arc::new(PgGateway::new(pool));
    bootstrap_admin(gateway.as_ref(), &config.security.bootstrap_admin_password)
        .await
        .context("admin bootstrap failed")?;

    let app = router(AppState::new(config.clone(), gateway));

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("CSV Explorer listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
