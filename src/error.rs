//! Error types for the console core

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Calculator error: {0}")]
    Calc(#[from] CalcError),

    #[error("Form error: {0}")]
    Form(#[from] FormError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Channel-map and packet-sizing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalcError {
    #[error("Unsupported sample rate: {0} Hz")]
    UnsupportedSampleRate(u32),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid channel count: {0}")]
    InvalidChannelCount(usize),

    #[error("Channel map overflow: start {start} + {count} channels exceeds {limit}")]
    MapOverflow {
        start: usize,
        count: usize,
        limit: usize,
    },

    #[error("Channel map is not contiguous: {0:?}")]
    NonContiguousMap(Vec<u8>),

    #[error("Unknown codec: {0}")]
    UnknownCodec(String),

    #[error("Unsupported DSCP codepoint: {0}")]
    UnsupportedDscp(u8),
}

/// Edit form lifecycle errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("Form is {0}, edits are not accepted")]
    NotEditing(&'static str),

    #[error("Form is not waiting for a submit result")]
    NotSubmitting,

    #[error("Draft has {0} invalid field(s)")]
    Invalid(usize),

    #[error("Stream id cannot change within an edit session")]
    ImmutableId,
}

/// Daemon REST errors
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Daemon rejected request: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;
