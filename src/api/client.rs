//! HTTP client for the daemon REST API

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::api::DaemonApi;
use crate::error::ApiError;
use crate::protocol::{
    ConfigUpdate, DaemonConfig, PtpConfig, PtpStatus, RemoteSource, RemoteSourceList, SinkList,
    SinkRecord, SinkStatus, SourceList, SourceRecord, StreamList, Version,
};

/// Daemon client over `reqwest`
#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
}

impl RestClient {
    /// Client for the daemon at `base_url`, e.g. `http://127.0.0.1:8080`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        debug!(%url, "GET");
        let response = check(self.client.get(&url).send().await?, path).await?;

        response
            .json()
            .await
            .map_err(|e| ApiError::Decode(format!("{}: {}", path, e)))
    }

    async fn put_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<(), ApiError> {
        let url = self.url(path);
        debug!(%url, "PUT");
        check(self.client.put(&url).json(body).send().await?, path).await?;
        Ok(())
    }

    async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<(), ApiError> {
        let url = self.url(path);
        debug!(%url, "POST");
        check(self.client.post(&url).json(body).send().await?, path).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let url = self.url(path);
        debug!(%url, "DELETE");
        check(self.client.delete(&url).send().await?, path).await?;
        Ok(())
    }
}

/// Turn a non-2xx response into [`ApiError`]
async fn check(response: reqwest::Response, path: &str) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!(path, status = status.as_u16(), %body, "Daemon rejected request");

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(path.to_string()));
    }
    Err(ApiError::Rejected {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl DaemonApi for RestClient {
    async fn config(&self) -> Result<DaemonConfig, ApiError> {
        self.get_json("/config").await
    }

    async fn set_config(&self, update: &ConfigUpdate) -> Result<(), ApiError> {
        self.post_json("/config", update).await
    }

    async fn version(&self) -> Result<Version, ApiError> {
        self.get_json("/version").await
    }

    async fn ptp_config(&self) -> Result<PtpConfig, ApiError> {
        self.get_json("/ptp/config").await
    }

    async fn set_ptp_config(&self, config: &PtpConfig) -> Result<(), ApiError> {
        self.post_json("/ptp/config", config).await
    }

    async fn ptp_status(&self) -> Result<PtpStatus, ApiError> {
        self.get_json("/ptp/status").await
    }

    async fn sources(&self) -> Result<Vec<SourceRecord>, ApiError> {
        let list: SourceList = self.get_json("/sources").await?;
        Ok(list.sources)
    }

    async fn sinks(&self) -> Result<Vec<SinkRecord>, ApiError> {
        let list: SinkList = self.get_json("/sinks").await?;
        Ok(list.sinks)
    }

    async fn streams(&self) -> Result<StreamList, ApiError> {
        self.get_json("/streams").await
    }

    async fn sink_status(&self, id: u8) -> Result<SinkStatus, ApiError> {
        self.get_json(&format!("/sink/status/{}", id)).await
    }

    async fn remote_sources(&self) -> Result<Vec<RemoteSource>, ApiError> {
        let list: RemoteSourceList = self.get_json("/browse/sources/all").await?;
        Ok(list.remote_sources)
    }

    async fn source_sdp(&self, id: u8) -> Result<String, ApiError> {
        let path = format!("/source/sdp/{}", id);
        let url = self.url(&path);
        let response = check(self.client.get(&url).send().await?, &path).await?;
        Ok(response.text().await?)
    }

    async fn put_source(&self, record: &SourceRecord) -> Result<(), ApiError> {
        self.put_json(&format!("/source/{}", record.id), record).await
    }

    async fn delete_source(&self, id: u8) -> Result<(), ApiError> {
        self.delete(&format!("/source/{}", id)).await
    }

    async fn put_sink(&self, record: &SinkRecord) -> Result<(), ApiError> {
        self.put_json(&format!("/sink/{}", record.id), record).await
    }

    async fn delete_sink(&self, id: u8) -> Result<(), ApiError> {
        self.delete(&format!("/sink/{}", id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Codec, SinkFlags};
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::routing::{get, post, put};
    use axum::{Json, Router};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeDaemon {
        sources: Mutex<Vec<SourceRecord>>,
        config: Mutex<Option<ConfigUpdate>>,
        ptp: Mutex<PtpConfig>,
    }

    async fn list_sources(State(daemon): State<Arc<FakeDaemon>>) -> Json<SourceList> {
        Json(SourceList {
            sources: daemon.sources.lock().clone(),
        })
    }

    async fn put_source(
        State(daemon): State<Arc<FakeDaemon>>,
        Path(id): Path<u8>,
        Json(mut record): Json<SourceRecord>,
    ) -> StatusCode {
        if record.map.len() > 64 {
            return StatusCode::BAD_REQUEST;
        }
        record.id = id;
        let mut sources = daemon.sources.lock();
        sources.retain(|s| s.id != id);
        sources.push(record);
        StatusCode::OK
    }

    async fn set_config(
        State(daemon): State<Arc<FakeDaemon>>,
        Json(update): Json<ConfigUpdate>,
    ) -> StatusCode {
        *daemon.config.lock() = Some(update);
        StatusCode::OK
    }

    async fn set_ptp_config(
        State(daemon): State<Arc<FakeDaemon>>,
        Json(config): Json<PtpConfig>,
    ) -> StatusCode {
        *daemon.ptp.lock() = config;
        StatusCode::OK
    }

    async fn list_streams(State(daemon): State<Arc<FakeDaemon>>) -> Json<StreamList> {
        Json(StreamList {
            sources: daemon.sources.lock().clone(),
            sinks: Vec::new(),
        })
    }

    // only sink 0 exists
    async fn sink_status(Path(id): Path<u8>) -> Result<Json<SinkStatus>, StatusCode> {
        if id > 0 {
            return Err(StatusCode::NOT_FOUND);
        }
        Ok(Json(SinkStatus {
            sink_flags: SinkFlags {
                receiving_rtp_packet: true,
                ..Default::default()
            },
            sink_min_time: 2,
        }))
    }

    async fn spawn_daemon() -> (RestClient, Arc<FakeDaemon>) {
        let daemon = Arc::new(FakeDaemon::default());
        let app = Router::new()
            .route("/api/sources", get(list_sources))
            .route("/api/source/:id", put(put_source))
            .route("/api/config", post(set_config))
            .route("/api/ptp/config", post(set_ptp_config))
            .route("/api/streams", get(list_streams))
            .route("/api/sink/status/:id", get(sink_status))
            .route(
                "/api/ptp/status",
                get(|| async {
                    Json(PtpStatus {
                        status: "locked".to_string(),
                        gmid: "00-1D-C1-FF-FE-0E-10-C4".to_string(),
                        jitter: 3,
                    })
                }),
            )
            .route(
                "/api/source/sdp/:id",
                get(|Path(id): Path<u8>| async move { format!("v=0\r\ns=ALSA Source {}\r\n", id) }),
            )
            .route(
                "/api/sink/:id",
                put(|| async { (StatusCode::BAD_REQUEST, "invalid sink map") }),
            )
            .with_state(daemon.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = RestClient::new(format!("http://{}/", addr), Duration::from_secs(5)).unwrap();
        (client, daemon)
    }

    fn record(id: u8) -> SourceRecord {
        SourceRecord {
            id,
            enabled: true,
            name: format!("ALSA Source {}", id),
            io: "Audio Device".to_string(),
            max_samples_per_packet: 48,
            codec: Codec::L24,
            address: String::new(),
            ttl: 15,
            payload_type: 98,
            dscp: 34,
            refclk_ptp_traceable: false,
            map: vec![2, 3],
        }
    }

    #[test]
    fn test_base_url_normalized() {
        let client = RestClient::new("http://10.0.0.1:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://10.0.0.1:8080");
        assert_eq!(client.url("/config"), "http://10.0.0.1:8080/api/config");
    }

    #[tokio::test]
    async fn test_put_then_list_sources() {
        let (client, daemon) = spawn_daemon().await;

        client.put_source(&record(1)).await.unwrap();
        assert_eq!(daemon.sources.lock().len(), 1);

        let sources = client.sources().await.unwrap();
        assert_eq!(sources, vec![record(1)]);
    }

    #[tokio::test]
    async fn test_ptp_status_and_sdp() {
        let (client, _daemon) = spawn_daemon().await;

        let status = client.ptp_status().await.unwrap();
        assert_eq!(status.status, "locked");

        let sdp = client.source_sdp(4).await.unwrap();
        assert!(sdp.contains("ALSA Source 4"));
    }

    #[tokio::test]
    async fn test_rejection_carries_status_and_body() {
        let (client, _daemon) = spawn_daemon().await;
        let sink = SinkRecord {
            id: 0,
            name: "ALSA Sink 0".to_string(),
            io: "Audio Device".to_string(),
            use_sdp: false,
            source: "http://127.0.0.1:8080/api/source/sdp/0".to_string(),
            sdp: String::new(),
            delay: 576,
            ignore_refclk_gmid: true,
            map: vec![0, 1],
        };

        match client.put_sink(&sink).await {
            Err(ApiError::Rejected { status, body }) => {
                assert_eq!(status, 400);
                assert_eq!(body, "invalid sink map");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_config_writes_are_posted() {
        let (client, daemon) = spawn_daemon().await;

        let update = ConfigUpdate {
            sample_rate: 96000,
            tic_frame_size_at_1fs: 64,
            rtp_mcast_base: "239.1.0.1".to_string(),
            ..Default::default()
        };
        client.set_config(&update).await.unwrap();
        assert_eq!(daemon.config.lock().as_ref(), Some(&update));

        client
            .set_ptp_config(&PtpConfig { domain: 2, dscp: 46 })
            .await
            .unwrap();
        assert_eq!(*daemon.ptp.lock(), PtpConfig { domain: 2, dscp: 46 });
    }

    #[tokio::test]
    async fn test_streams_and_sink_status() {
        let (client, _daemon) = spawn_daemon().await;
        client.put_source(&record(5)).await.unwrap();

        let streams = client.streams().await.unwrap();
        assert_eq!(streams.sources, vec![record(5)]);
        assert!(streams.sinks.is_empty());

        let status = client.sink_status(0).await.unwrap();
        assert_eq!(status.sink_flags.activity(), vec!["receiving"]);
        assert_eq!(status.sink_min_time, 2);
        assert!(matches!(client.sink_status(7).await, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_missing_route_is_not_found() {
        let (client, _daemon) = spawn_daemon().await;
        assert!(matches!(client.version().await, Err(ApiError::NotFound(_))));
    }
}
