//! Draft validation
//!
//! One pass over a draft produces every field issue at once. Nothing keeps
//! per-field error flags between passes. Daemon and PTP settings edits are
//! checked the same way.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::ops::RangeInclusive;

use crate::calc::{max_channels_within, ClockContext};
use crate::constants::{
    CONFIG_SAMPLE_RATE_CANDIDATES, CUSTOM_NODE_ID_LEN, LOG_SEVERITY_RANGE, MAX_PACKET_SIZE,
    MAX_STREAMS, MAX_TIC_FRAME_SIZE_RANGE, PAYLOAD_TYPE_RANGE, PLAYOUT_DELAY_RANGE, PORT_RANGE,
    PTP_DOMAIN_RANGE, PTP_DSCP_CANDIDATES, SAMPLES_PER_PACKET_CANDIDATES, SAP_INTERVAL_RANGE,
    SINK_DELAY_CANDIDATES, SYSLOG_PROTOCOLS, TIC_FRAME_SIZE_CANDIDATES, TTL_RANGE,
};
use crate::form::draft::{SinkDraft, SourceDraft};
use crate::protocol::{ConfigUpdate, Dscp, PtpConfig};

/// Inputs a validation pass needs besides the draft itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FormContext {
    pub clock: ClockContext,
    /// RTP payload budget in bytes
    pub max_packet_bytes: usize,
}

impl FormContext {
    pub fn new(clock: ClockContext) -> Self {
        Self {
            clock,
            max_packet_bytes: MAX_PACKET_SIZE,
        }
    }

    pub fn with_packet_budget(mut self, max_packet_bytes: usize) -> Self {
        self.max_packet_bytes = max_packet_bytes;
        self
    }
}

/// Form fields that can carry an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    Id,
    Name,
    Address,
    Ttl,
    PayloadType,
    Dscp,
    MaxSamplesPerPacket,
    Channels,
    Source,
    Sdp,
    Delay,
    LogSeverity,
    SyslogProto,
    SyslogServer,
    RtpMcastBase,
    RtpPort,
    RtspPort,
    PlayoutDelay,
    #[serde(rename = "tic_frame_size_at_1fs")]
    TicFrameSize,
    SampleRate,
    MaxTicFrameSize,
    SapMcastAddr,
    SapInterval,
    CustomNodeId,
    Domain,
}

impl FieldName {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldName::Id => "id",
            FieldName::Name => "name",
            FieldName::Address => "address",
            FieldName::Ttl => "ttl",
            FieldName::PayloadType => "payload_type",
            FieldName::Dscp => "dscp",
            FieldName::MaxSamplesPerPacket => "max_samples_per_packet",
            FieldName::Channels => "channels",
            FieldName::Source => "source",
            FieldName::Sdp => "sdp",
            FieldName::Delay => "delay",
            FieldName::LogSeverity => "log_severity",
            FieldName::SyslogProto => "syslog_proto",
            FieldName::SyslogServer => "syslog_server",
            FieldName::RtpMcastBase => "rtp_mcast_base",
            FieldName::RtpPort => "rtp_port",
            FieldName::RtspPort => "rtsp_port",
            FieldName::PlayoutDelay => "playout_delay",
            FieldName::TicFrameSize => "tic_frame_size_at_1fs",
            FieldName::SampleRate => "sample_rate",
            FieldName::MaxTicFrameSize => "max_tic_frame_size",
            FieldName::SapMcastAddr => "sap_mcast_addr",
            FieldName::SapInterval => "sap_interval",
            FieldName::CustomNodeId => "custom_node_id",
            FieldName::Domain => "domain",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a field is invalid
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldIssue {
    /// Empty where a value is required
    Required,
    OutOfRange { value: u64, min: u64, max: u64 },
    /// Does not match the expected pattern
    Malformed,
    /// Not one of the offered choices
    NotOffered,
    /// Exceeds a ceiling derived from the clock or the packet budget
    CapacityExceeded { value: u64, limit: u64 },
}

impl FieldIssue {
    pub fn is_capacity(&self) -> bool {
        matches!(self, FieldIssue::CapacityExceeded { .. })
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldIssue::Required => f.write_str("required"),
            FieldIssue::OutOfRange { value, min, max } => {
                write!(f, "{} outside {}..={}", value, min, max)
            }
            FieldIssue::Malformed => f.write_str("malformed"),
            FieldIssue::NotOffered => f.write_str("not an offered choice"),
            FieldIssue::CapacityExceeded { value, limit } => {
                write!(f, "{} exceeds limit {}", value, limit)
            }
        }
    }
}

/// Result of one validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Validation {
    errors: BTreeMap<FieldName, FieldIssue>,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &BTreeMap<FieldName, FieldIssue> {
        &self.errors
    }

    pub fn issue(&self, field: FieldName) -> Option<&FieldIssue> {
        self.errors.get(&field)
    }

    pub fn has_error(&self, field: FieldName) -> bool {
        self.errors.contains_key(&field)
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn into_errors(self) -> BTreeMap<FieldName, FieldIssue> {
        self.errors
    }

    /// First issue per field wins
    fn flag(&mut self, field: FieldName, issue: FieldIssue) {
        self.errors.entry(field).or_insert(issue);
    }

    fn require_in_range(&mut self, field: FieldName, value: u64, range: RangeInclusive<u64>) {
        if !range.contains(&value) {
            self.flag(
                field,
                FieldIssue::OutOfRange {
                    value,
                    min: *range.start(),
                    max: *range.end(),
                },
            );
        }
    }

    fn require_non_empty(&mut self, field: FieldName, value: &str) {
        if value.is_empty() {
            self.flag(field, FieldIssue::Required);
        }
    }

    fn require_multicast(&mut self, field: FieldName, value: &str) {
        if value.is_empty() {
            self.flag(field, FieldIssue::Required);
        } else if !value.parse::<Ipv4Addr>().is_ok_and(|addr| addr.is_multicast()) {
            self.flag(field, FieldIssue::Malformed);
        }
    }
}

fn widen(range: RangeInclusive<u32>) -> RangeInclusive<u64> {
    u64::from(*range.start())..=u64::from(*range.end())
}

/// Validate a source draft against the form context
pub fn validate_source(draft: &SourceDraft, ctx: &FormContext) -> Validation {
    let mut v = Validation::default();

    v.require_in_range(FieldName::Id, u64::from(draft.id), 0..=(MAX_STREAMS as u64 - 1));
    v.require_non_empty(FieldName::Name, &draft.name);

    if !draft.address.is_empty() && draft.address.parse::<Ipv4Addr>().is_err() {
        v.flag(FieldName::Address, FieldIssue::Malformed);
    }

    v.require_in_range(FieldName::Ttl, u64::from(draft.ttl), widen(TTL_RANGE));
    v.require_in_range(
        FieldName::PayloadType,
        u64::from(draft.payload_type),
        widen(PAYLOAD_TYPE_RANGE),
    );

    if Dscp::try_from(draft.dscp).is_err() {
        v.flag(FieldName::Dscp, FieldIssue::NotOffered);
    }

    let samples = draft.max_samples_per_packet;
    if !SAMPLES_PER_PACKET_CANDIDATES.contains(&samples) {
        v.flag(FieldName::MaxSamplesPerPacket, FieldIssue::NotOffered);
    } else if !ctx.clock.allows(samples) {
        v.flag(
            FieldName::MaxSamplesPerPacket,
            FieldIssue::CapacityExceeded {
                value: u64::from(samples),
                limit: u64::from(ctx.clock.max_samples_per_packet()),
            },
        );
    }

    // A zero packet size is already flagged above as not offered
    if let Ok(limit) = max_channels_within(draft.codec, samples, ctx.max_packet_bytes) {
        let channels = draft.map.len();
        if channels > limit {
            v.flag(
                FieldName::Channels,
                FieldIssue::CapacityExceeded {
                    value: channels as u64,
                    limit: limit as u64,
                },
            );
        }
    }

    v
}

/// Validate a sink draft
pub fn validate_sink(draft: &SinkDraft) -> Validation {
    let mut v = Validation::default();

    v.require_in_range(FieldName::Id, u64::from(draft.id), 0..=(MAX_STREAMS as u64 - 1));
    v.require_non_empty(FieldName::Name, &draft.name);

    if draft.use_sdp {
        v.require_non_empty(FieldName::Sdp, draft.sdp.trim());
    } else if draft.source.is_empty() {
        v.flag(FieldName::Source, FieldIssue::Required);
    } else if reqwest::Url::parse(&draft.source).is_err() {
        v.flag(FieldName::Source, FieldIssue::Malformed);
    }

    if !SINK_DELAY_CANDIDATES.contains(&draft.delay) {
        v.flag(FieldName::Delay, FieldIssue::NotOffered);
    }

    v
}

/// `host:port` with a numeric port
fn is_host_port(value: &str) -> bool {
    value
        .rsplit_once(':')
        .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
}

fn is_node_id(value: &str) -> bool {
    CUSTOM_NODE_ID_LEN.contains(&value.len())
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '_')
}

/// Validate an edit of the daemon settings
pub fn validate_config(update: &ConfigUpdate) -> Validation {
    let mut v = Validation::default();

    if !LOG_SEVERITY_RANGE.contains(&update.log_severity) {
        v.flag(FieldName::LogSeverity, FieldIssue::NotOffered);
    }

    if !SYSLOG_PROTOCOLS.contains(&update.syslog_proto.as_str()) {
        v.flag(FieldName::SyslogProto, FieldIssue::NotOffered);
    } else if update.syslog_proto == "udp" {
        if update.syslog_server.is_empty() {
            v.flag(FieldName::SyslogServer, FieldIssue::Required);
        } else if !is_host_port(&update.syslog_server) {
            v.flag(FieldName::SyslogServer, FieldIssue::Malformed);
        }
    }

    v.require_multicast(FieldName::RtpMcastBase, &update.rtp_mcast_base);
    v.require_in_range(FieldName::RtpPort, u64::from(update.rtp_port), widen(PORT_RANGE));
    v.require_in_range(FieldName::RtspPort, u64::from(update.rtsp_port), widen(PORT_RANGE));
    v.require_in_range(
        FieldName::PlayoutDelay,
        u64::from(update.playout_delay),
        widen(PLAYOUT_DELAY_RANGE),
    );

    if !TIC_FRAME_SIZE_CANDIDATES.contains(&update.tic_frame_size_at_1fs) {
        v.flag(FieldName::TicFrameSize, FieldIssue::NotOffered);
    }
    if !CONFIG_SAMPLE_RATE_CANDIDATES.contains(&update.sample_rate) {
        v.flag(FieldName::SampleRate, FieldIssue::NotOffered);
    }
    v.require_in_range(
        FieldName::MaxTicFrameSize,
        u64::from(update.max_tic_frame_size),
        widen(MAX_TIC_FRAME_SIZE_RANGE),
    );

    v.require_multicast(FieldName::SapMcastAddr, &update.sap_mcast_addr);
    v.require_in_range(
        FieldName::SapInterval,
        u64::from(update.sap_interval),
        widen(SAP_INTERVAL_RANGE),
    );

    // empty means the daemon-generated id is used
    if !update.custom_node_id.is_empty() && !is_node_id(&update.custom_node_id) {
        v.flag(FieldName::CustomNodeId, FieldIssue::Malformed);
    }

    v
}

/// Validate an edit of the PTP settings
pub fn validate_ptp_config(config: &PtpConfig) -> Validation {
    let mut v = Validation::default();

    v.require_in_range(FieldName::Domain, u64::from(config.domain), widen(PTP_DOMAIN_RANGE));
    if !PTP_DSCP_CANDIDATES.contains(&config.dscp) {
        v.flag(FieldName::Dscp, FieldIssue::NotOffered);
    }

    v
}
