//! Lighter Stream Trigger Binary
//!
//! Subscribes to one Lighter channel and writes every message to stdout as
//! a JSON line.
//!
//! # Usage
//!
//! ```bash
//! LIGHTER_CHANNEL=trade LIGHTER_MARKET_INDEX=0 cargo run --bin lighter-stream-trigger
//! ```
//!
//! # Environment Variables
//!
//! - `LIGHTER_ENVIRONMENT`: mainnet | testnet (default: mainnet)
//! - `LIGHTER_AUTH_TOKEN`: auth token for account channels
//! - `LIGHTER_CHANNEL`: channel kind (default: `order_book`)
//! - `LIGHTER_MARKET_INDEX`: market index for market channels
//! - `LIGHTER_ACCOUNT_INDEX`: account index for account channels
//! - `LIGHTER_ALL_MARKETS`: subscribe to all markets (default: false)
//! - `LIGHTER_RECONNECT`: reconnect after a close (default: true)
//! - `LIGHTER_RECONNECT_INTERVAL_MS`: reconnect interval (default: 5000)
//! - `LIGHTER_STREAM_URL`: feed URL override
//! - `LIGHTER_TRIGGER_METRICS_PORT`: Prometheus metrics port (default: 0, disabled)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: false)
//! - `RUST_LOG`: Log filter (default: `lighter_stream_trigger=info`)

use std::io::Write;
use std::net::SocketAddr;

use lighter_stream_trigger::infrastructure::telemetry;
use lighter_stream_trigger::{
    ConnectionManager, InboundMessage, TriggerConfig, WebSocketConnector, init_metrics,
};
use tokio::signal;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    load_dotenv();

    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting Lighter Stream Trigger");

    let config = TriggerConfig::from_env()?;
    log_config(&config);

    if config.metrics_port != 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
        match init_metrics(addr) {
            Ok(addr) => tracing::info!(%addr, "Prometheus metrics listening"),
            Err(e) => tracing::warn!(error = %e, "Failed to start metrics exporter"),
        }
    }

    let (tx, rx) = mpsc::unbounded_channel::<InboundMessage>();
    let writer = tokio::spawn(write_messages(rx));

    let manager = ConnectionManager::new(WebSocketConnector::new(), config.stream_url());
    let channel = manager.start(config.subscription.clone(), tx)?;
    tracing::info!(%channel, "Subscription started");

    let stop = manager.stop_handle();
    tokio::select! {
        () = await_shutdown() => {}
        () = stop.stopped() => {
            tracing::warn!("Stream stopped (reconnect disabled)");
        }
    }

    manager.stop().await;
    let stats = manager.stats();
    // The finished task has dropped the sink, so the writer drains and exits.
    let _ = writer.await;

    tracing::info!(
        connect_attempts = stats.connect_attempts,
        subscriptions = stats.subscriptions,
        messages_delivered = stats.messages_delivered,
        decode_errors = stats.decode_errors,
        "Lighter Stream Trigger stopped"
    );
    Ok(())
}

/// Print each message as one JSON line on stdout.
async fn write_messages(mut rx: mpsc::UnboundedReceiver<InboundMessage>) {
    let stdout = std::io::stdout();
    while let Some(message) = rx.recv().await {
        let mut out = stdout.lock();
        if let Err(e) = writeln!(out, "{message}").and_then(|()| out.flush()) {
            tracing::error!(error = %e, "Failed to write message to stdout");
            break;
        }
    }
}

fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }
}

/// Log the parsed configuration.
fn log_config(config: &TriggerConfig) {
    tracing::info!(
        environment = config.credentials.environment().as_str(),
        channel = %config.subscription.channel_kind,
        market_index = ?config.subscription.market_index,
        account_index = ?config.subscription.account_index,
        all_markets = config.subscription.subscribe_to_all_markets,
        reconnect = config.subscription.reconnect,
        reconnect_interval_ms = config.subscription.reconnect_interval.as_millis(),
        metrics_port = config.metrics_port,
        "Configuration loaded"
    );
    tracing::debug!(
        stream_url = %config.stream_url(),
        api_base_url = config.credentials.environment().api_base_url(),
        "Lighter endpoints"
    );
}

/// Load .env file from any ancestor directory.
fn load_dotenv_from_ancestors() {
    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
