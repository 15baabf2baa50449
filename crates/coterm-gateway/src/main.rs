use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod app;
mod http;
mod ws;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coterm_gateway=info,tower_http=debug".into()),
        )
        .init();

    // load config: explicit path > COTERM_CONFIG env > ~/.coterm/coterm.toml
    let config_path = std::env::var("COTERM_CONFIG").ok();
    let config = coterm_core::config::CotermConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        coterm_core::config::CotermConfig::default()
    });

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;
    let registry = coterm_terminal::SessionRegistry::new(
        config.terminal.replay_capacity_bytes,
        Duration::from_millis(config.terminal.exit_grace_ms),
    );

    let state = Arc::new(app::AppState::new(config, registry.clone()));
    let router = app::build_router(state.clone());

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("coterm gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(registry))
        .await?;

    Ok(())
}

/// Waits for Ctrl-C, then signals every live PTY and clears the registry
/// before the process exits.
async fn shutdown_signal(registry: Arc<coterm_terminal::SessionRegistry>) {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown requested, terminating live sessions");
    registry.shutdown().await;
}
