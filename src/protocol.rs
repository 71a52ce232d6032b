//! Daemon REST wire types
//!
//! Records mirror the JSON documents the daemon serves and accepts under
//! `/api`. Field names are the daemon's; they are not renamed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CalcError;

/// Linear PCM sample encoding of a stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Codec {
    #[default]
    L16,
    L24,
    AM824,
}

impl Codec {
    pub const ALL: [Codec; 3] = [Codec::L16, Codec::L24, Codec::AM824];

    /// Bytes one sample of one channel occupies in a packet
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            Codec::L16 => 2,
            Codec::L24 | Codec::AM824 => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Codec::L16 => "L16",
            Codec::L24 => "L24",
            Codec::AM824 => "AM824",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Codec {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Codec::ALL
            .into_iter()
            .find(|codec| codec.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CalcError::UnknownCodec(s.to_string()))
    }
}

/// IP DSCP codepoints offered for source traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Dscp {
    /// Expedited forwarding
    Ef,
    Af41,
    Af31,
    /// Best effort
    BestEffort,
}

impl Dscp {
    pub const ALL: [Dscp; 4] = [Dscp::Ef, Dscp::Af41, Dscp::Af31, Dscp::BestEffort];

    pub const fn codepoint(self) -> u8 {
        match self {
            Dscp::Ef => 46,
            Dscp::Af41 => 34,
            Dscp::Af31 => 26,
            Dscp::BestEffort => 0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Dscp::Ef => "EF",
            Dscp::Af41 => "AF41",
            Dscp::Af31 => "AF31",
            Dscp::BestEffort => "BE",
        }
    }
}

impl TryFrom<u8> for Dscp {
    type Error = CalcError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Dscp::ALL
            .into_iter()
            .find(|dscp| dscp.codepoint() == value)
            .ok_or(CalcError::UnsupportedDscp(value))
    }
}

impl From<Dscp> for u8 {
    fn from(dscp: Dscp) -> Self {
        dscp.codepoint()
    }
}

impl fmt::Display for Dscp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.codepoint(), self.label())
    }
}

/// Daemon configuration as served by `GET /api/config`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub http_port: u16,
    pub rtsp_port: u16,
    pub log_severity: i32,
    pub playout_delay: u32,
    pub tic_frame_size_at_1fs: u32,
    pub max_tic_frame_size: u32,
    pub sample_rate: u32,
    pub rtp_mcast_base: String,
    pub rtp_port: u16,
    pub ptp_domain: u8,
    pub ptp_dscp: u8,
    pub sap_mcast_addr: String,
    pub sap_interval: u32,
    pub mdns_enabled: bool,
    pub syslog_proto: String,
    pub syslog_server: String,
    pub status_file: String,
    pub interface_name: String,
    pub mac_addr: String,
    pub ip_addr: String,
    pub node_id: String,
    pub custom_node_id: String,
    pub auto_sinks_update: bool,
}

impl DaemonConfig {
    /// Writable subset of this configuration
    pub fn to_update(&self) -> ConfigUpdate {
        ConfigUpdate {
            log_severity: self.log_severity,
            syslog_proto: self.syslog_proto.clone(),
            syslog_server: self.syslog_server.clone(),
            rtp_mcast_base: self.rtp_mcast_base.clone(),
            rtp_port: self.rtp_port,
            rtsp_port: self.rtsp_port,
            playout_delay: self.playout_delay,
            tic_frame_size_at_1fs: self.tic_frame_size_at_1fs,
            sample_rate: self.sample_rate,
            max_tic_frame_size: self.max_tic_frame_size,
            sap_mcast_addr: self.sap_mcast_addr.clone(),
            sap_interval: self.sap_interval,
            mdns_enabled: self.mdns_enabled,
            custom_node_id: self.custom_node_id.clone(),
            auto_sinks_update: self.auto_sinks_update,
        }
    }

    /// Overwrite the writable keys with `update`
    pub fn apply(&mut self, update: &ConfigUpdate) {
        self.log_severity = update.log_severity;
        self.syslog_proto = update.syslog_proto.clone();
        self.syslog_server = update.syslog_server.clone();
        self.rtp_mcast_base = update.rtp_mcast_base.clone();
        self.rtp_port = update.rtp_port;
        self.rtsp_port = update.rtsp_port;
        self.playout_delay = update.playout_delay;
        self.tic_frame_size_at_1fs = update.tic_frame_size_at_1fs;
        self.sample_rate = update.sample_rate;
        self.max_tic_frame_size = update.max_tic_frame_size;
        self.sap_mcast_addr = update.sap_mcast_addr.clone();
        self.sap_interval = update.sap_interval;
        self.mdns_enabled = update.mdns_enabled;
        self.custom_node_id = update.custom_node_id.clone();
        self.auto_sinks_update = update.auto_sinks_update;
    }
}

/// Body of `POST /api/config`
///
/// Network identity and PTP settings are not writable here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    pub log_severity: i32,
    pub syslog_proto: String,
    pub syslog_server: String,
    pub rtp_mcast_base: String,
    pub rtp_port: u16,
    pub rtsp_port: u16,
    pub playout_delay: u32,
    pub tic_frame_size_at_1fs: u32,
    pub sample_rate: u32,
    pub max_tic_frame_size: u32,
    pub sap_mcast_addr: String,
    pub sap_interval: u32,
    pub mdns_enabled: bool,
    pub custom_node_id: String,
    pub auto_sinks_update: bool,
}

/// Daemon version banner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub version: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PtpConfig {
    pub domain: u8,
    pub dscp: u8,
}

/// PTP slave status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PtpStatus {
    /// "unlocked", "locking" or "locked"
    pub status: String,
    /// Grandmaster clock identity
    pub gmid: String,
    pub jitter: i64,
}

/// Local source as stored by the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    #[serde(default)]
    pub id: u8,
    pub enabled: bool,
    pub name: String,
    pub io: String,
    pub max_samples_per_packet: u32,
    pub codec: Codec,
    #[serde(default)]
    pub address: String,
    pub ttl: u8,
    pub payload_type: u8,
    pub dscp: u8,
    pub refclk_ptp_traceable: bool,
    pub map: Vec<u8>,
}

/// Local sink as stored by the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkRecord {
    #[serde(default)]
    pub id: u8,
    pub name: String,
    pub io: String,
    pub use_sdp: bool,
    pub source: String,
    pub sdp: String,
    pub delay: u32,
    pub ignore_refclk_gmid: bool,
    pub map: Vec<u8>,
}

/// Receive state flags of a sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkFlags {
    pub rtp_seq_id_error: bool,
    pub rtp_ssrc_error: bool,
    pub rtp_payload_type_error: bool,
    pub rtp_sac_error: bool,
    pub receiving_rtp_packet: bool,
    #[serde(rename = "_some_muted")]
    pub some_muted: bool,
    #[serde(rename = "_all_muted")]
    pub all_muted: bool,
    #[serde(rename = "_muted")]
    pub muted: bool,
}

impl SinkFlags {
    /// Short names of the RTP errors currently raised
    pub fn errors(&self) -> Vec<&'static str> {
        [
            (self.rtp_seq_id_error, "SEQID"),
            (self.rtp_ssrc_error, "SSRC"),
            (self.rtp_payload_type_error, "payload type"),
            (self.rtp_sac_error, "SAC"),
        ]
        .into_iter()
        .filter_map(|(set, label)| set.then_some(label))
        .collect()
    }

    /// Short names of the activity flags currently raised
    pub fn activity(&self) -> Vec<&'static str> {
        [
            (self.receiving_rtp_packet, "receiving"),
            (self.some_muted, "some muted"),
            (self.all_muted, "all muted"),
            (self.muted, "muted"),
        ]
        .into_iter()
        .filter_map(|(set, label)| set.then_some(label))
        .collect()
    }
}

/// Sink receive status as served by `GET /api/sink/status/{id}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkStatus {
    pub sink_flags: SinkFlags,
    /// Minimum packet arrival time in milliseconds
    #[serde(default)]
    pub sink_min_time: u32,
}

/// Source announced on the network (SAP or mDNS)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSource {
    /// Discovery mechanism, "SAP" or "mDNS"
    pub source: String,
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub domain: String,
    pub address: String,
    pub sdp: String,
    /// Seconds since the last announcement
    #[serde(default)]
    pub last_seen: u32,
    #[serde(default)]
    pub announce_period: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceList {
    pub sources: Vec<SourceRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkList {
    pub sinks: Vec<SinkRecord>,
}

/// Local sources and sinks together, as served by `GET /api/streams`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamList {
    #[serde(default)]
    pub sources: Vec<SourceRecord>,
    #[serde(default)]
    pub sinks: Vec<SinkRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSourceList {
    pub remote_sources: Vec<RemoteSource>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_record_from_daemon_json() {
        let json = r#"{
            "id": 3,
            "enabled": true,
            "name": "ALSA (on ubuntu)_1",
            "io": "Audio Device",
            "max_samples_per_packet": 48,
            "codec": "L24",
            "address": "",
            "ttl": 15,
            "payload_type": 98,
            "dscp": 34,
            "refclk_ptp_traceable": false,
            "map": [ 0, 1, 2, 3, 4, 5, 6, 7 ]
        }"#;

        let record: SourceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, 3);
        assert_eq!(record.codec, Codec::L24);
        assert_eq!(record.map, (0..8).collect::<Vec<u8>>());
    }

    #[test]
    fn test_config_tolerates_missing_keys() {
        let config: DaemonConfig =
            serde_json::from_str(r#"{ "sample_rate": 96000, "tic_frame_size_at_1fs": 48 }"#)
                .unwrap();
        assert_eq!(config.sample_rate, 96000);
        assert_eq!(config.tic_frame_size_at_1fs, 48);
        assert!(config.node_id.is_empty());
    }

    #[test]
    fn test_codec_parsing() {
        assert_eq!("l24".parse::<Codec>().unwrap(), Codec::L24);
        assert_eq!("AM824".parse::<Codec>().unwrap(), Codec::AM824);
        assert!(matches!(
            "DSD64".parse::<Codec>(),
            Err(CalcError::UnknownCodec(_))
        ));
    }

    #[test]
    fn test_dscp_codepoints() {
        assert_eq!(Dscp::try_from(46).unwrap(), Dscp::Ef);
        assert_eq!(Dscp::try_from(26).unwrap(), Dscp::Af31);
        assert_eq!(Dscp::try_from(36), Err(CalcError::UnsupportedDscp(36)));
        assert_eq!(serde_json::to_string(&Dscp::Af41).unwrap(), "34");
    }

    #[test]
    fn test_sink_status_flags() {
        let json = r#"{ "sink_flags": {
            "rtp_seq_id_error": true, "rtp_ssrc_error": false,
            "rtp_payload_type_error": false, "rtp_sac_error": true,
            "receiving_rtp_packet": true, "_some_muted": false,
            "_all_muted": false, "_muted": true },
            "sink_min_time": 3 }"#;
        let status: SinkStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.sink_min_time, 3);
        assert_eq!(status.sink_flags.errors(), vec!["SEQID", "SAC"]);
        assert_eq!(status.sink_flags.activity(), vec!["receiving", "muted"]);
        assert!(SinkFlags::default().errors().is_empty());
    }

    #[test]
    fn test_config_update_round_trips_through_config() {
        let mut config = DaemonConfig {
            sample_rate: 48000,
            node_id: "AES67 daemon d9aca383".to_string(),
            ..Default::default()
        };
        let mut update = config.to_update();
        update.sample_rate = 96000;
        update.playout_delay = 512;

        config.apply(&update);
        assert_eq!(config.sample_rate, 96000);
        assert_eq!(config.playout_delay, 512);
        assert_eq!(config.node_id, "AES67 daemon d9aca383");

        let json = serde_json::to_value(&update).unwrap();
        assert!(json.get("node_id").is_none());
        assert_eq!(json["sample_rate"], 96000);
    }

    #[test]
    fn test_remote_sources_list() {
        let json = r#"{ "remote_sources": [ {
            "source": "SAP", "id": "d00d", "name": "ALSA Source 0",
            "domain": "", "address": "10.0.0.12", "sdp": "v=0\r\n",
            "last_seen": 4, "announce_period": 30 } ] }"#;
        let list: RemoteSourceList = serde_json::from_str(json).unwrap();
        assert_eq!(list.remote_sources.len(), 1);
        assert_eq!(list.remote_sources[0].announce_period, 30);
    }
}
