mod config;
mod metrics;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::AppConfig;
use crate::metrics::LogMetrics;
use crate::services::push::{PushSender, WebPushSender};
use crate::services::subscription::InMemorySubscriptionStore;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env().expect("invalid configuration");

    let sender: Option<Arc<dyn PushSender>> = if let Some(private_key) = config.notifications.private_key.as_deref() {
        match WebPushSender::new(private_key, &config.notifications.subject, config.notifications.ttl_secs) {
            Ok(sender) => Some(Arc::new(sender)),
            Err(e) => {
                warn!(error = %e, "push sender unavailable; notifications disabled");
                None
            }
        }
    } else {
        info!("SW_PRIVATE_KEY not set; notifications disabled");
        None
    };

    let state = state::AppState::new(
        &config,
        Arc::new(InMemorySubscriptionStore::new()),
        sender,
        Arc::new(LogMetrics),
    );

    let app = routes::app(state);
    let port = config.port;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    info!(
        %port,
        min_group_size = config.matching.min_group_size,
        max_group_size = config.matching.max_group_size,
        "watercooler listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");
}

async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }
}
