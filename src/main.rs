use clap::Parser;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

use tuiter::auth::accounts;
use tuiter::config::{Cli, Config};
use tuiter::db;
use tuiter::routes;
use tuiter::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    let state = AppState::new(pool, config.clone())?;
    tracing::info!("Media stored under {}", config.media_path().display());

    if let (Some(username), Some(password)) = (
        config.auth.admin_username.as_deref(),
        config.auth.admin_password.as_deref(),
    ) {
        accounts::ensure_admin(&state.db, &state.hasher, username, password).await?;
    }

    let app = routes::app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
