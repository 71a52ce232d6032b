//! Console HTTP service

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::calc::RatePolicy;
use crate::config::{AppConfig, UiConfig};
use crate::error::{Error, Result};
use crate::form::{SinkDraft, SourceDraft};
use crate::poll::SnapshotReader;
use crate::protocol::{PtpStatus, RemoteSource};
use crate::ui::handlers;

/// Shared state of the HTTP handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub rate_policy: RatePolicy,
    pub max_packet_bytes: usize,
    /// Used to build default sink source URLs
    pub daemon_base_url: String,
    pub ptp_status: Option<SnapshotReader<PtpStatus>>,
    pub remote_sources: Option<SnapshotReader<Vec<RemoteSource>>>,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            rate_policy: config.calc.rate_policy,
            max_packet_bytes: config.calc.max_packet_size,
            daemon_base_url: config.daemon.base_url.trim_end_matches('/').to_string(),
            ptp_status: None,
            remote_sources: None,
        }
    }

    pub fn with_ptp_status(mut self, reader: SnapshotReader<PtpStatus>) -> Self {
        self.ptp_status = Some(reader);
        self
    }

    pub fn with_remote_sources(mut self, reader: SnapshotReader<Vec<RemoteSource>>) -> Self {
        self.remote_sources = Some(reader);
        self
    }
}

/// Build the API router, serving `static_dir` for everything else when set
pub fn router(state: Arc<AppState>, static_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/api/calc/packet-options", get(handlers::get_packet_options))
        .route("/api/calc/max-channels", get(handlers::get_max_channels))
        .route("/api/calc/channel-map", get(handlers::get_channel_map))
        .route("/api/calc/source", post(handlers::evaluate_form::<SourceDraft>))
        .route("/api/calc/sink", post(handlers::evaluate_form::<SinkDraft>))
        .route("/api/calc/config", post(handlers::evaluate_config))
        .route("/api/calc/ptp-config", post(handlers::evaluate_ptp_config))
        .route("/api/calc/source/default/:id", get(handlers::get_default_source))
        .route("/api/calc/sink/default/:id", get(handlers::get_default_sink))
        .route("/api/ptp/status", get(handlers::get_ptp_status))
        .route("/api/remote-sources", get(handlers::get_remote_sources))
        .with_state(state);

    let app = match static_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    };

    app.layer(CorsLayer::permissive())
}

/// Web server for the console
pub struct WebServer {
    config: UiConfig,
    state: Arc<AppState>,
}

impl WebServer {
    pub fn new(config: UiConfig, state: AppState) -> Self {
        Self {
            config,
            state: Arc::new(state),
        }
    }

    fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.config.bind_address, self.config.http_port)
            .parse()
            .map_err(|e| {
                Error::Config(format!(
                    "invalid bind address {}:{}: {}",
                    self.config.bind_address, self.config.http_port, e
                ))
            })
    }

    /// Serve until the listener fails
    pub async fn run(self) -> Result<()> {
        let addr = self.bind_addr()?;
        let app = router(self.state, self.config.static_dir.as_deref());

        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Console listening on http://{}", listener.local_addr()?);

        axum::serve(listener, app).await?;
        Ok(())
    }

    /// Run on a background task
    pub fn start_background(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.run().await {
                error!("Web server error: {}", e);
            }
        })
    }
}
