//! AES67 Console Service
//!
//! Serves the channel/packet calculator API and polls the daemon for PTP
//! status and discovered sources.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aes67_console::{
    api::{DaemonApi, RestClient},
    calc::ClockContext,
    config::AppConfig,
    poll::{poll_ptp_status, poll_remote_sources},
    ui::{AppState, WebServer},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting AES67 console");

    // Config path from args, else the platform default
    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => AppConfig::load(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => match AppConfig::default_path() {
            Some(path) => AppConfig::load_or_default(&path)?,
            None => AppConfig::default(),
        },
    };

    let client = Arc::new(RestClient::new(
        config.daemon.base_url.clone(),
        config.daemon.timeout(),
    )?);
    tracing::info!("Daemon API at {}", client.base_url());

    match client.version().await {
        Ok(version) => tracing::info!("Daemon version {}", version.version),
        Err(e) => tracing::warn!("Daemon not reachable yet: {}", e),
    }

    if let Ok(daemon_config) = client.config().await {
        match ClockContext::from_config(&daemon_config, config.calc.rate_policy) {
            Ok(clock) => tracing::info!(
                "Clock: {} Hz, multiplier {}, max {} samples/packet",
                clock.sample_rate(),
                clock.frame_multiplier(),
                clock.max_samples_per_packet()
            ),
            Err(e) => tracing::warn!("Daemon clock not usable: {}", e),
        }
    }

    let ptp_poller = poll_ptp_status(client.clone(), config.polling.ptp_status_period());
    let sources_poller =
        poll_remote_sources(client.clone(), config.polling.remote_sources_period());

    let state = AppState::new(&config)
        .with_ptp_status(ptp_poller.reader())
        .with_remote_sources(sources_poller.reader());
    let web_server = WebServer::new(config.ui.clone(), state);
    let web_handle = web_server.start_background();

    tracing::info!(
        "Console available at http://{}:{}",
        config.ui.bind_address,
        config.ui.http_port
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    web_handle.abort();
    ptp_poller.stop().await;
    sources_poller.stop().await;

    Ok(())
}
