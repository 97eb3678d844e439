use tracing::info;
use tracing_subscriber::EnvFilter;

use cidadao_api::app::{router, AppState};
use cidadao_api::config::config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config();
    info!("Starting Cidadao API in {:?} mode", config.environment);

    let state = AppState::from_config(config).await?;
    let app = router(state);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Cidadao API listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
