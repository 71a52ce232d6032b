//! Daemon REST collaborator
//!
//! [`DaemonApi`] is the seam between edit forms and the daemon. The HTTP
//! implementation lives in [`client`]; [`memory`] keeps everything in process
//! for tests and offline use.

pub mod client;
pub mod memory;

use async_trait::async_trait;

pub use client::RestClient;
pub use memory::InMemoryDaemon;

use crate::error::ApiError;
use crate::form::StreamUpdate;
use crate::protocol::{
    ConfigUpdate, DaemonConfig, PtpConfig, PtpStatus, RemoteSource, SinkRecord, SinkStatus,
    SourceRecord, StreamList, Version,
};

#[async_trait]
pub trait DaemonApi: Send + Sync {
    async fn config(&self) -> Result<DaemonConfig, ApiError>;

    /// Replace the writable daemon settings
    async fn set_config(&self, update: &ConfigUpdate) -> Result<(), ApiError>;

    async fn version(&self) -> Result<Version, ApiError>;

    async fn ptp_config(&self) -> Result<PtpConfig, ApiError>;

    async fn set_ptp_config(&self, config: &PtpConfig) -> Result<(), ApiError>;

    async fn ptp_status(&self) -> Result<PtpStatus, ApiError>;

    async fn sources(&self) -> Result<Vec<SourceRecord>, ApiError>;

    async fn sinks(&self) -> Result<Vec<SinkRecord>, ApiError>;

    /// Local sources and sinks in one request
    async fn streams(&self) -> Result<StreamList, ApiError>;

    /// Receive status of local sink `id`
    async fn sink_status(&self, id: u8) -> Result<SinkStatus, ApiError>;

    /// Sources discovered on the network
    async fn remote_sources(&self) -> Result<Vec<RemoteSource>, ApiError>;

    /// SDP the daemon announces for local source `id`
    async fn source_sdp(&self, id: u8) -> Result<String, ApiError>;

    /// Create or replace source `record.id`
    async fn put_source(&self, record: &SourceRecord) -> Result<(), ApiError>;

    async fn delete_source(&self, id: u8) -> Result<(), ApiError>;

    /// Create or replace sink `record.id`
    async fn put_sink(&self, record: &SinkRecord) -> Result<(), ApiError>;

    async fn delete_sink(&self, id: u8) -> Result<(), ApiError>;
}

/// Send a validated update to the matching endpoint
pub async fn apply_update<A>(api: &A, update: &StreamUpdate) -> Result<(), ApiError>
where
    A: DaemonApi + ?Sized,
{
    match update {
        StreamUpdate::Source(record) => api.put_source(record).await,
        StreamUpdate::Sink(record) => api.put_sink(record).await,
    }
}
