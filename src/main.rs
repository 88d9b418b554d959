//! Combat State Server - authoritative character health, ammo and ragdoll replication
//!
//! This is the main entry point for the server. It handles:
//! - WebSocket connections for observers and their remote calls
//! - The authoritative arena tick loop
//! - Hosting and searching game sessions over HTTP

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use combat_state_server::app::AppState;
use combat_state_server::combat::{DefaultHooks, Notifier, TracingNotifier};
use combat_state_server::config::Config;
use combat_state_server::game::{Arena, ArenaSettings};
use combat_state_server::http::build_router;
use combat_state_server::matchmaking::{LocalSessionService, SessionCoordinator};
use combat_state_server::util::time::init_server_time;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    // Initialize server time tracking
    init_server_time();

    info!("Starting Combat State Server");
    info!("Server address: {}", config.server_addr);
    info!(
        max_health = config.combat.max_health,
        max_ammo = config.combat.max_ammo,
        auto_respawn = config.auto_respawn,
        tick_rate = config.tick_rate,
        "Combat settings"
    );

    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);

    // Spawn the authoritative arena
    let (arena, arena_handle) = Arena::new(
        ArenaSettings::from_config(&config),
        Arc::new(DefaultHooks),
        notifier.clone(),
    );
    tokio::spawn(arena.run());

    // Host the game session
    let sessions = Arc::new(SessionCoordinator::new(
        LocalSessionService::new(),
        notifier,
        config.host_name.clone(),
        config.match_type.clone(),
        config.public_connections,
    ));
    let hosted_session = sessions.create_game_session().await;
    if hosted_session.is_none() {
        warn!("Running without an advertised session");
    }

    // Create application state
    let addr: SocketAddr = config.server_addr;
    let state = AppState::new(config, arena_handle, sessions, hosted_session);

    // Build router
    let router = build_router(state);

    // Start server
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
