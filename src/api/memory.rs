//! In-process daemon

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

use crate::api::DaemonApi;
use crate::error::ApiError;
use crate::protocol::{
    ConfigUpdate, DaemonConfig, PtpConfig, PtpStatus, RemoteSource, SinkRecord, SinkStatus,
    SourceRecord, StreamList, Version,
};

#[derive(Debug, Default)]
struct State {
    config: DaemonConfig,
    ptp_status: PtpStatus,
    sources: BTreeMap<u8, SourceRecord>,
    sinks: BTreeMap<u8, SinkRecord>,
    sink_status: BTreeMap<u8, SinkStatus>,
    remote_sources: Vec<RemoteSource>,
    /// Status and body returned by the next write instead of applying it
    reject_next: Option<(u16, String)>,
}

/// [`DaemonApi`] backed by in-memory tables
#[derive(Debug, Default)]
pub struct InMemoryDaemon {
    state: RwLock<State>,
}

impl InMemoryDaemon {
    pub fn new(config: DaemonConfig) -> Self {
        Self {
            state: RwLock::new(State {
                config,
                ..Default::default()
            }),
        }
    }

    pub fn set_ptp_status(&self, status: PtpStatus) {
        self.state.write().ptp_status = status;
    }

    pub fn set_remote_sources(&self, sources: Vec<RemoteSource>) {
        self.state.write().remote_sources = sources;
    }

    /// Status reported for sink `id` while it exists
    pub fn set_sink_status(&self, id: u8, status: SinkStatus) {
        self.state.write().sink_status.insert(id, status);
    }

    /// Make the next write fail with `status`
    pub fn reject_next(&self, status: u16, body: impl Into<String>) {
        self.state.write().reject_next = Some((status, body.into()));
    }

    fn take_rejection(state: &mut State) -> Result<(), ApiError> {
        match state.reject_next.take() {
            Some((status, body)) => Err(ApiError::Rejected { status, body }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DaemonApi for InMemoryDaemon {
    async fn config(&self) -> Result<DaemonConfig, ApiError> {
        Ok(self.state.read().config.clone())
    }

    async fn set_config(&self, update: &ConfigUpdate) -> Result<(), ApiError> {
        let mut state = self.state.write();
        Self::take_rejection(&mut state)?;
        state.config.apply(update);
        Ok(())
    }

    async fn version(&self) -> Result<Version, ApiError> {
        Ok(Version {
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    async fn ptp_config(&self) -> Result<PtpConfig, ApiError> {
        let state = self.state.read();
        Ok(PtpConfig {
            domain: state.config.ptp_domain,
            dscp: state.config.ptp_dscp,
        })
    }

    async fn set_ptp_config(&self, config: &PtpConfig) -> Result<(), ApiError> {
        let mut state = self.state.write();
        Self::take_rejection(&mut state)?;
        state.config.ptp_domain = config.domain;
        state.config.ptp_dscp = config.dscp;
        Ok(())
    }

    async fn ptp_status(&self) -> Result<PtpStatus, ApiError> {
        Ok(self.state.read().ptp_status.clone())
    }

    async fn sources(&self) -> Result<Vec<SourceRecord>, ApiError> {
        Ok(self.state.read().sources.values().cloned().collect())
    }

    async fn sinks(&self) -> Result<Vec<SinkRecord>, ApiError> {
        Ok(self.state.read().sinks.values().cloned().collect())
    }

    async fn streams(&self) -> Result<StreamList, ApiError> {
        let state = self.state.read();
        Ok(StreamList {
            sources: state.sources.values().cloned().collect(),
            sinks: state.sinks.values().cloned().collect(),
        })
    }

    async fn sink_status(&self, id: u8) -> Result<SinkStatus, ApiError> {
        let state = self.state.read();
        if !state.sinks.contains_key(&id) {
            return Err(ApiError::NotFound(format!("/sink/status/{}", id)));
        }
        Ok(state.sink_status.get(&id).copied().unwrap_or_default())
    }

    async fn remote_sources(&self) -> Result<Vec<RemoteSource>, ApiError> {
        Ok(self.state.read().remote_sources.clone())
    }

    async fn source_sdp(&self, id: u8) -> Result<String, ApiError> {
        let state = self.state.read();
        let source = state
            .sources
            .get(&id)
            .ok_or_else(|| ApiError::NotFound(format!("/source/sdp/{}", id)))?;

        Ok(format!(
            "v=0\r\ns={}\r\nm=audio 5004 RTP/AVP {}\r\na=rtpmap:{} {}/{}/{}\r\n",
            source.name,
            source.payload_type,
            source.payload_type,
            source.codec,
            state.config.sample_rate,
            source.map.len()
        ))
    }

    async fn put_source(&self, record: &SourceRecord) -> Result<(), ApiError> {
        let mut state = self.state.write();
        Self::take_rejection(&mut state)?;
        state.sources.insert(record.id, record.clone());
        Ok(())
    }

    async fn delete_source(&self, id: u8) -> Result<(), ApiError> {
        let mut state = self.state.write();
        Self::take_rejection(&mut state)?;
        state
            .sources
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ApiError::NotFound(format!("/source/{}", id)))
    }

    async fn put_sink(&self, record: &SinkRecord) -> Result<(), ApiError> {
        let mut state = self.state.write();
        Self::take_rejection(&mut state)?;
        state.sinks.insert(record.id, record.clone());
        Ok(())
    }

    async fn delete_sink(&self, id: u8) -> Result<(), ApiError> {
        let mut state = self.state.write();
        Self::take_rejection(&mut state)?;
        state.sink_status.remove(&id);
        state
            .sinks
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ApiError::NotFound(format!("/sink/{}", id)))
    }
}
