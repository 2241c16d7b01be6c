//! onchain-chat - conversational agent with its own on-chain wallet
//!
//! Serves a single conversation over HTTP. Each user message runs one turn of
//! a tool-calling agent whose tools act on an EVM wallet.

mod api;
mod config;
mod engine;
mod llm;
mod session;
mod tools;
mod transcript;
mod turn;

use api::{create_router, AppState};
use config::AppConfig;
use engine::WalletAgentBinder;
use session::SessionController;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use turn::TurnDriver;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "onchain_chat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };
    tracing::info!(config = ?config, "Configuration loaded");

    // The engine is bound lazily on the first chat message
    let driver = TurnDriver::new(config.max_steps);
    let port = config.port;
    let binder = Arc::new(WalletAgentBinder::new(config));
    let controller = SessionController::new(binder, driver);
    tracing::info!(max_steps = driver.max_steps(), "Session controller ready");

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(AppState::new(controller))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("onchain-chat server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
