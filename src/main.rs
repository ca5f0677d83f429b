// ABOUTME: Entry point for the listing-scout binary.
// ABOUTME: Parses CLI arguments, loads .env, initializes tracing, and starts the HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use scout_server::{AppState, ScoutConfig, create_router};

#[derive(Parser, Debug)]
#[command(name = "listing-scout", version, about = "Real-estate listing search agent over HTTP")]
struct Cli {
    /// Socket address to bind; overrides SCOUT_BIND.
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    "listing_scout=info,scout_server=info,scout_agent=info,tower_http=info",
                )
            }),
        )
        .init();

    let cli = Cli::parse();
    let mut config = ScoutConfig::from_env().context("invalid configuration")?;
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }

    let bind = config.bind;
    tracing::info!(
        service = %config.service_name,
        model = %config.model,
        moderation = config.moderation,
        "listing-scout starting up"
    );

    let state = Arc::new(AppState::from_config(config));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;
    tracing::info!("listening on http://{}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("listing-scout shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
