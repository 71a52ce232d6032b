//! Editable stream drafts
//!
//! A draft is the mutable copy of a source or sink that lives for one edit
//! session. It is seeded from a daemon record or from generated defaults and
//! turned back into a record on submit.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::calc::{max_channels_within, ChannelMap};
use crate::constants::{MAX_DEVICE_CHANNELS, MAX_STREAMS};
use crate::error::CalcError;
use crate::form::validate::{validate_sink, validate_source, FormContext, Validation};
use crate::protocol::{Codec, SinkRecord, SourceRecord};

/// Stream direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Source,
    Sink,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Source => f.write_str("Source"),
            StreamKind::Sink => f.write_str("Sink"),
        }
    }
}

/// Validated record ready for the daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamUpdate {
    Source(SourceRecord),
    Sink(SinkRecord),
}

impl StreamUpdate {
    pub fn id(&self) -> u8 {
        match self {
            StreamUpdate::Source(record) => record.id,
            StreamUpdate::Sink(record) => record.id,
        }
    }

    pub fn kind(&self) -> StreamKind {
        match self {
            StreamUpdate::Source(_) => StreamKind::Source,
            StreamUpdate::Sink(_) => StreamKind::Sink,
        }
    }
}

/// Behaviour shared by source and sink drafts
pub trait StreamDraft: Clone {
    const KIND: StreamKind;

    fn id(&self) -> u8;

    fn channel_map(&self) -> &ChannelMap;

    fn set_channel_map(&mut self, map: ChannelMap);

    /// Largest channel count the draft's current settings allow
    fn max_channels(&self, ctx: &FormContext) -> usize;

    fn validate(&self, ctx: &FormContext) -> Validation;

    fn to_update(&self) -> Result<StreamUpdate, CalcError>;
}

/// Source being edited
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDraft {
    pub id: u8,
    pub enabled: bool,
    pub name: String,
    pub io: String,
    pub max_samples_per_packet: u32,
    pub codec: Codec,
    #[serde(default)]
    pub address: String,
    pub ttl: u32,
    pub payload_type: u32,
    pub dscp: u8,
    pub refclk_ptp_traceable: bool,
    pub map: ChannelMap,
}

impl SourceDraft {
    /// Draft for a new source with id `id`
    pub fn with_defaults(id: u8) -> Self {
        Self {
            id,
            enabled: true,
            name: format!("ALSA Source {}", id),
            io: "Audio Device".to_string(),
            max_samples_per_packet: 48,
            codec: Codec::L16,
            address: String::new(),
            ttl: 15,
            payload_type: 98,
            dscp: 34,
            refclk_ptp_traceable: false,
            map: ChannelMap::stereo_pair(id),
        }
    }

    /// Draft seeded from a daemon record
    pub fn from_record(record: &SourceRecord) -> Result<Self, CalcError> {
        Ok(Self {
            id: record.id,
            enabled: record.enabled,
            name: record.name.clone(),
            io: record.io.clone(),
            max_samples_per_packet: record.max_samples_per_packet,
            codec: record.codec,
            address: record.address.clone(),
            ttl: u32::from(record.ttl),
            payload_type: u32::from(record.payload_type),
            dscp: record.dscp,
            refclk_ptp_traceable: record.refclk_ptp_traceable,
            map: load_map(StreamKind::Source, record.id, &record.map)?,
        })
    }

    pub fn to_record(&self) -> Result<SourceRecord, CalcError> {
        Ok(SourceRecord {
            id: self.id,
            enabled: self.enabled,
            name: self.name.clone(),
            io: self.io.clone(),
            max_samples_per_packet: self.max_samples_per_packet,
            codec: self.codec,
            address: self.address.clone(),
            ttl: narrow("ttl", self.ttl)?,
            payload_type: narrow("payload_type", self.payload_type)?,
            dscp: self.dscp,
            refclk_ptp_traceable: self.refclk_ptp_traceable,
            map: self.map.as_slice().to_vec(),
        })
    }
}

impl StreamDraft for SourceDraft {
    const KIND: StreamKind = StreamKind::Source;

    fn id(&self) -> u8 {
        self.id
    }

    fn channel_map(&self) -> &ChannelMap {
        &self.map
    }

    fn set_channel_map(&mut self, map: ChannelMap) {
        self.map = map;
    }

    fn max_channels(&self, ctx: &FormContext) -> usize {
        max_channels_within(self.codec, self.max_samples_per_packet, ctx.max_packet_bytes)
            .unwrap_or(0)
    }

    fn validate(&self, ctx: &FormContext) -> Validation {
        validate_source(self, ctx)
    }

    fn to_update(&self) -> Result<StreamUpdate, CalcError> {
        self.to_record().map(StreamUpdate::Source)
    }
}

/// Sink being edited
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkDraft {
    pub id: u8,
    pub name: String,
    pub io: String,
    pub use_sdp: bool,
    /// URL the daemon fetches the remote SDP from
    pub source: String,
    pub sdp: String,
    pub delay: u32,
    pub ignore_refclk_gmid: bool,
    pub map: ChannelMap,
}

impl SinkDraft {
    /// Draft for a new sink with id `id`, pointing at the daemon's own
    /// source of the same id
    pub fn with_defaults(id: u8, daemon_base_url: &str) -> Self {
        Self {
            id,
            name: format!("ALSA Sink {}", id),
            io: "Audio Device".to_string(),
            use_sdp: false,
            source: format!(
                "{}/api/source/sdp/{}",
                daemon_base_url.trim_end_matches('/'),
                id
            ),
            sdp: String::new(),
            delay: 576,
            ignore_refclk_gmid: true,
            map: ChannelMap::stereo_pair(id),
        }
    }

    pub fn from_record(record: &SinkRecord) -> Result<Self, CalcError> {
        Ok(Self {
            id: record.id,
            name: record.name.clone(),
            io: record.io.clone(),
            use_sdp: record.use_sdp,
            source: record.source.clone(),
            sdp: record.sdp.clone(),
            delay: record.delay,
            ignore_refclk_gmid: record.ignore_refclk_gmid,
            map: load_map(StreamKind::Sink, record.id, &record.map)?,
        })
    }

    pub fn to_record(&self) -> SinkRecord {
        SinkRecord {
            id: self.id,
            name: self.name.clone(),
            io: self.io.clone(),
            use_sdp: self.use_sdp,
            source: self.source.clone(),
            sdp: self.sdp.clone(),
            delay: self.delay,
            ignore_refclk_gmid: self.ignore_refclk_gmid,
            map: self.map.as_slice().to_vec(),
        }
    }
}

impl StreamDraft for SinkDraft {
    const KIND: StreamKind = StreamKind::Sink;

    fn id(&self) -> u8 {
        self.id
    }

    fn channel_map(&self) -> &ChannelMap {
        &self.map
    }

    fn set_channel_map(&mut self, map: ChannelMap) {
        self.map = map;
    }

    fn max_channels(&self, _ctx: &FormContext) -> usize {
        MAX_DEVICE_CHANNELS
    }

    fn validate(&self, _ctx: &FormContext) -> Validation {
        validate_sink(self)
    }

    fn to_update(&self) -> Result<StreamUpdate, CalcError> {
        Ok(StreamUpdate::Sink(self.to_record()))
    }
}

/// Smallest stream id not in `used`, or `None` when every id is taken
pub fn first_free_id<I>(used: I) -> Option<u8>
where
    I: IntoIterator<Item = u8>,
{
    let mut taken = [false; MAX_STREAMS];
    for id in used {
        if let Some(slot) = taken.get_mut(id as usize) {
            *slot = true;
        }
    }
    taken.iter().position(|t| !t).map(|id| id as u8)
}

fn load_map(kind: StreamKind, id: u8, indices: &[u8]) -> Result<ChannelMap, CalcError> {
    match ChannelMap::from_indices(indices.to_vec()) {
        Ok(map) => Ok(map),
        Err(CalcError::NonContiguousMap(_)) | Err(CalcError::MapOverflow { .. }) => {
            let map = ChannelMap::anchored(indices)?;
            warn!(
                kind = %kind,
                id,
                received = ?indices,
                anchored = ?map.as_slice(),
                "Channel map re-anchored to a contiguous run"
            );
            Ok(map)
        }
        Err(e) => Err(e),
    }
}

fn narrow(field: &str, value: u32) -> Result<u8, CalcError> {
    u8::try_from(value)
        .map_err(|_| CalcError::InvalidArgument(format!("{} out of range: {}", field, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SourceRecord {
        SourceRecord {
            id: 5,
            enabled: true,
            name: "Studio A".to_string(),
            io: "Audio Device".to_string(),
            max_samples_per_packet: 96,
            codec: Codec::L24,
            address: "239.1.0.5".to_string(),
            ttl: 15,
            payload_type: 98,
            dscp: 46,
            refclk_ptp_traceable: true,
            map: vec![8, 9, 10, 11],
        }
    }

    #[test]
    fn test_source_defaults() {
        let draft = SourceDraft::with_defaults(3);
        assert_eq!(draft.name, "ALSA Source 3");
        assert_eq!(draft.map.as_slice(), &[6, 7]);
        assert_eq!(draft.codec, Codec::L16);
        assert_eq!(draft.max_samples_per_packet, 48);
        assert_eq!(draft.payload_type, 98);
    }

    #[test]
    fn test_default_map_wraps() {
        assert_eq!(SourceDraft::with_defaults(31).map.as_slice(), &[62, 63]);
        assert_eq!(SourceDraft::with_defaults(32).map.as_slice(), &[0, 1]);
        assert_eq!(SourceDraft::with_defaults(63).map.as_slice(), &[62, 63]);
    }

    #[test]
    fn test_sink_defaults() {
        let draft = SinkDraft::with_defaults(2, "http://10.0.0.1:8080/");
        assert_eq!(draft.name, "ALSA Sink 2");
        assert_eq!(draft.source, "http://10.0.0.1:8080/api/source/sdp/2");
        assert_eq!(draft.delay, 576);
        assert!(draft.ignore_refclk_gmid);
        assert!(!draft.use_sdp);
    }

    #[test]
    fn test_source_record_round_trip() {
        let record = record();
        let draft = SourceDraft::from_record(&record).unwrap();
        assert_eq!(draft.to_record().unwrap(), record);
    }

    #[test]
    fn test_non_contiguous_record_is_anchored() {
        let mut record = record();
        record.map = vec![8, 12, 3];
        let draft = SourceDraft::from_record(&record).unwrap();
        assert_eq!(draft.map.as_slice(), &[8, 9, 10]);
    }

    #[test]
    fn test_empty_record_map_rejected() {
        let mut record = record();
        record.map.clear();
        assert_eq!(
            SourceDraft::from_record(&record),
            Err(CalcError::InvalidChannelCount(0))
        );
    }

    #[test]
    fn test_out_of_range_ttl_not_narrowed() {
        let mut draft = SourceDraft::with_defaults(0);
        draft.ttl = 256;
        assert!(matches!(draft.to_record(), Err(CalcError::InvalidArgument(_))));
    }

    #[test]
    fn test_first_free_id() {
        assert_eq!(first_free_id([]), Some(0));
        assert_eq!(first_free_id([0, 1, 3]), Some(2));
        assert_eq!(first_free_id([2, 0, 1]), Some(3));
        assert_eq!(first_free_id(0..64u8), None);
        assert_eq!(first_free_id((0..64u8).filter(|&id| id != 63)), Some(63));
    }

    #[test]
    fn test_update_carries_kind_and_id() {
        let update = SinkDraft::with_defaults(7, "http://127.0.0.1:8080")
            .to_update()
            .unwrap();
        assert_eq!(update.kind(), StreamKind::Sink);
        assert_eq!(update.id(), 7);
    }
}
