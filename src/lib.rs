//! # AES67 Console
//!
//! Configuration console core for an AES67 audio-over-IP daemon.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                              BROWSER CONSOLE                                │
//! │   Source edit form          Sink edit form           PTP / status panels    │
//! └──────────┬─────────────────────────┬──────────────────────────┬────────────┘
//!            │ draft + clock           │ draft + clock            │ poll
//!            ▼                         ▼                          ▼
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                         Console service (ui::server)                        │
//! │  ┌───────────────────────────────────────────────┐   ┌──────────────────┐  │
//! │  │           Edit form model (form::editor)      │   │  Poller (poll)   │  │
//! │  │  Editing ──► Submitting ──► Submitted         │   │  PTP status 5s   │  │
//! │  │     ▲             │                           │   │  remote src 10s  │  │
//! │  │     └── Failure ──┘                           │   └────────┬─────────┘  │
//! │  │                                               │            │            │
//! │  │  ┌─────────────────────────────────────────┐  │            │            │
//! │  │  │        Calculator (calc)                │  │            │            │
//! │  │  │  rate ─► frame multiplier ─► ceiling    │  │            │            │
//! │  │  │  codec + samples ─► max channels        │  │            │            │
//! │  │  │  count + start ─► channel map           │  │            │            │
//! │  │  └─────────────────────────────────────────┘  │            │            │
//! │  └──────────────────────┬────────────────────────┘            │            │
//! │                         │ validated record                    │            │
//! │                         ▼                                     ▼            │
//! │  ┌─────────────────────────────────────────────────────────────────────┐   │
//! │  │                 Daemon REST client (api::client)                    │   │
//! │  └─────────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────┼───────────────────────────────────────┘
//!                                       │ JSON over HTTP
//!                                       ▼
//!                              AES67 daemon /api/*
//! ```

pub mod api;
pub mod calc;
pub mod config;
pub mod error;
pub mod form;
pub mod poll;
pub mod protocol;
pub mod ui;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    use std::ops::RangeInclusive;

    /// RTP payload budget for one packet, MTU-safe
    pub const MAX_PACKET_SIZE: usize = 1440;

    /// Channels in one audio-device bank
    pub const MAX_DEVICE_CHANNELS: usize = 64;

    /// Maximum number of sources (and of sinks) the daemon manages
    pub const MAX_STREAMS: usize = 64;

    /// Samples-per-packet choices offered by the source form
    pub const SAMPLES_PER_PACKET_CANDIDATES: [u32; 6] = [6, 12, 16, 48, 96, 192];

    /// Sink playout delay choices in samples
    pub const SINK_DELAY_CANDIDATES: [u32; 5] = [192, 384, 576, 768, 960];

    /// Valid multicast TTL values
    pub const TTL_RANGE: RangeInclusive<u32> = 1..=255;

    /// Dynamic RTP payload types accepted for sources
    pub const PAYLOAD_TYPE_RANGE: RangeInclusive<u32> = 77..=127;

    /// PTP domains accepted by the daemon
    pub const PTP_DOMAIN_RANGE: RangeInclusive<u32> = 0..=127;

    /// DSCP codepoints offered for PTP traffic
    pub const PTP_DSCP_CANDIDATES: [u8; 6] = [56, 48, 46, 36, 34, 0];

    /// Packet timing choices at 1x base rate, in samples
    pub const TIC_FRAME_SIZE_CANDIDATES: [u32; 5] = [48, 64, 96, 128, 192];

    /// Sample rates offered in the daemon settings
    pub const CONFIG_SAMPLE_RATE_CANDIDATES: [u32; 5] = [44_100, 48_000, 96_000, 192_000, 384_000];

    /// Largest tic frame size the daemon may allocate, in samples
    pub const MAX_TIC_FRAME_SIZE_RANGE: RangeInclusive<u32> = 192..=8192;

    /// Default sink playout delay bounds in samples
    pub const PLAYOUT_DELAY_RANGE: RangeInclusive<u32> = 0..=4000;

    /// Unprivileged ports for RTP and RTSP
    pub const PORT_RANGE: RangeInclusive<u32> = 1024..=65535;

    /// SAP announcement interval in seconds, 0 lets the daemon derive it
    pub const SAP_INTERVAL_RANGE: RangeInclusive<u32> = 0..=255;

    /// Daemon log severities, debug through fatal
    pub const LOG_SEVERITY_RANGE: RangeInclusive<i32> = 1..=5;

    /// Syslog transports: disabled, local, remote UDP
    pub const SYSLOG_PROTOCOLS: [&str; 3] = ["none", "", "udp"];

    /// Length bounds of a custom node id
    pub const CUSTOM_NODE_ID_LEN: RangeInclusive<usize> = 5..=48;

    /// Default daemon REST endpoint
    pub const DEFAULT_DAEMON_URL: &str = "http://127.0.0.1:8080";

    /// Default HTTP port for the console service
    pub const DEFAULT_HTTP_PORT: u16 = 8081;

    /// Default PTP status refresh period in seconds
    pub const DEFAULT_PTP_POLL_SECS: u64 = 5;

    /// Default remote sources refresh period in seconds
    pub const DEFAULT_REMOTE_SOURCES_POLL_SECS: u64 = 10;

    /// Shortest poll period a poller will run at, in milliseconds
    pub const MIN_POLL_PERIOD_MS: u64 = 10;
}
