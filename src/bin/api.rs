use anyhow::Result;
use siteinfo::{
    api,
    app_state::AppState,
    config::{Config, LogFormat},
    fetcher::HttpFetcher,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format() {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }

    let fetcher = HttpFetcher::new(config.fetcher())?;
    let state = AppState::new(Arc::new(fetcher), &config);
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!(
        addr = config.bind_addr(),
        allowed_hosts = ?config.allowed_hosts(),
        cache_capacity = config.cache_capacity().get(),
        cache_max_bytes = config.cache_max_bytes(),
        "listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
