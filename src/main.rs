//! service-map server entry point.
//!
//! Starts the expiry scheduler and the Axum HTTP server with REST and
//! WebSocket endpoints, and shuts both down on Ctrl-C.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use service_map::api;
use service_map::app_state::AppState;
use service_map::config::{LogFormat, RegistryConfig};
use service_map::domain::{Clock, EventBus, MonotonicClock, RegistryStore};
use service_map::service::{ExpiryScheduler, RegistryService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RegistryConfig::from_env().context("loading configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    tracing::info!(
        addr = %config.listen_addr,
        ttl_secs = config.service_ttl.as_secs(),
        tick_secs = config.expiry_tick.as_secs(),
        "starting service-map"
    );

    // Build domain layer
    let store = Arc::new(RegistryStore::new());
    let event_bus = EventBus::new(config.event_bus_capacity);
    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());

    // Build service layer
    let registry_service = Arc::new(RegistryService::new(
        Arc::clone(&store),
        event_bus.clone(),
        Arc::clone(&clock),
    ));
    let scheduler = ExpiryScheduler::new(
        store,
        Arc::clone(registry_service.sessions()),
        event_bus,
        clock,
        config.service_ttl,
        config.expiry_tick,
    )
    .with_session_idle(config.session_idle);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_task = scheduler.spawn(shutdown_rx);

    let app = api::build_app(AppState::new(registry_service), config.request_timeout);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    let _ = shutdown_tx.send(true);
    scheduler_task.await.context("joining expiry scheduler")?;
    tracing::info!("service-map stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
