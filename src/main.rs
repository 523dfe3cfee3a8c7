// Parking Vecinal - Web Server

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

use parking_vecinal::{db, router, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();

    std::fs::create_dir_all(&config.upload_dir)
        .with_context(|| format!("Failed to create upload dir {:?}", config.upload_dir))?;

    let conn = Connection::open(&config.db_path)
        .with_context(|| format!("Failed to open database {:?}", config.db_path))?;
    db::setup_database(&conn)?;
    tracing::info!(db = ?config.db_path, "database ready");

    let state = AppState::new(conn, &config);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, version = parking_vecinal::VERSION, "server running");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
