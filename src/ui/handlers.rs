//! HTTP API handlers

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::calc::{
    channel_map, max_channels_within, packet_size_options, start_offsets, ChannelMap,
    ClockContext, PacketSizeOption,
};
use crate::constants::MAX_STREAMS;
use crate::error::CalcError;
use crate::form::{
    validate_config, validate_ptp_config, EditForm, EditMode, FormConstraints, FormContext,
    SinkDraft, SourceDraft, StreamDraft, Validation,
};
use crate::poll::{Snapshot, SnapshotReader};
use crate::protocol::{Codec, ConfigUpdate, PtpConfig, PtpStatus, RemoteSource};
use crate::ui::server::AppState;

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

fn ok<T>(data: T) -> Reply<T> {
    (StatusCode::OK, Json(ApiResponse::ok(data)))
}

fn bad_request<T>(e: impl ToString) -> Reply<T> {
    (StatusCode::BAD_REQUEST, Json(ApiResponse::error(e.to_string())))
}

fn reply<T>(result: Result<T, CalcError>) -> Reply<T> {
    match result {
        Ok(data) => ok(data),
        Err(e) => bad_request(e),
    }
}

/// Clock parameters as reported by the daemon config
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ClockQuery {
    pub sample_rate: u32,
    pub tic_frame_size_at_1fs: u32,
}

#[derive(Debug, Serialize)]
pub struct PacketOptions {
    pub frame_multiplier: u32,
    pub max_samples_per_packet: u32,
    pub options: Vec<PacketSizeOption>,
}

/// Samples-per-packet choices for a clock
pub async fn get_packet_options(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ClockQuery>,
) -> Reply<PacketOptions> {
    reply(
        ClockContext::resolve(query.sample_rate, query.tic_frame_size_at_1fs, state.rate_policy)
            .map(|clock| PacketOptions {
                frame_multiplier: clock.frame_multiplier(),
                max_samples_per_packet: clock.max_samples_per_packet(),
                options: packet_size_options(&clock),
            }),
    )
}

#[derive(Debug, Deserialize)]
pub struct MaxChannelsQuery {
    pub codec: String,
    pub samples_per_packet: u32,
}

#[derive(Debug, Serialize)]
pub struct MaxChannels {
    pub codec: Codec,
    pub samples_per_packet: u32,
    pub max_channels: usize,
}

pub async fn get_max_channels(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MaxChannelsQuery>,
) -> Reply<MaxChannels> {
    let result = query.codec.parse::<Codec>().and_then(|codec| {
        let max_channels =
            max_channels_within(codec, query.samples_per_packet, state.max_packet_bytes)?;
        Ok(MaxChannels {
            codec,
            samples_per_packet: query.samples_per_packet,
            max_channels,
        })
    });
    reply(result)
}

#[derive(Debug, Deserialize)]
pub struct ChannelMapQuery {
    pub channels: usize,
    #[serde(default)]
    pub start: usize,
}

#[derive(Debug, Serialize)]
pub struct ChannelMapLayout {
    pub channel_map: ChannelMap,
    /// Start offsets valid for this channel count
    pub start_offsets: Vec<usize>,
}

pub async fn get_channel_map(Query(query): Query<ChannelMapQuery>) -> Reply<ChannelMapLayout> {
    let result = channel_map(query.channels, query.start).and_then(|map| {
        Ok(ChannelMapLayout {
            start_offsets: start_offsets(map.len())?.collect(),
            channel_map: map,
        })
    });
    reply(result)
}

/// Draft plus the clock the form was opened with
#[derive(Debug, Deserialize)]
pub struct FormRequest<D> {
    pub draft: D,
    pub clock: ClockQuery,
    #[serde(default)]
    pub mode: EditMode,
}

/// Constraints and validation for a draft
pub async fn evaluate_form<D>(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FormRequest<D>>, JsonRejection>,
) -> Reply<FormConstraints>
where
    D: StreamDraft + DeserializeOwned + Send + 'static,
{
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    let clock = match ClockContext::resolve(
        request.clock.sample_rate,
        request.clock.tic_frame_size_at_1fs,
        state.rate_policy,
    ) {
        Ok(clock) => clock,
        Err(e) => return bad_request(e),
    };

    let context = FormContext::new(clock).with_packet_budget(state.max_packet_bytes);
    ok(EditForm::open(request.mode, request.draft, context).constraints())
}

/// Field issues of a daemon settings edit
pub async fn evaluate_config(
    payload: Result<Json<ConfigUpdate>, JsonRejection>,
) -> Reply<Validation> {
    match payload {
        Ok(Json(update)) => ok(validate_config(&update)),
        Err(rejection) => bad_request(rejection.body_text()),
    }
}

/// Field issues of a PTP settings edit
pub async fn evaluate_ptp_config(
    payload: Result<Json<PtpConfig>, JsonRejection>,
) -> Reply<Validation> {
    match payload {
        Ok(Json(config)) => ok(validate_ptp_config(&config)),
        Err(rejection) => bad_request(rejection.body_text()),
    }
}

fn stream_id(path: Result<Path<u8>, PathRejection>) -> Result<u8, CalcError> {
    let Path(id) = path.map_err(|rejection| CalcError::InvalidArgument(rejection.body_text()))?;
    if usize::from(id) >= MAX_STREAMS {
        return Err(CalcError::InvalidArgument(format!(
            "stream id {} outside 0..{}",
            id, MAX_STREAMS
        )));
    }
    Ok(id)
}

/// Defaults for a new source
pub async fn get_default_source(path: Result<Path<u8>, PathRejection>) -> Reply<SourceDraft> {
    reply(stream_id(path).map(SourceDraft::with_defaults))
}

/// Defaults for a new sink
pub async fn get_default_sink(
    State(state): State<Arc<AppState>>,
    path: Result<Path<u8>, PathRejection>,
) -> Reply<SinkDraft> {
    reply(stream_id(path).map(|id| SinkDraft::with_defaults(id, &state.daemon_base_url)))
}

fn latest<T: Clone>(reader: Option<&SnapshotReader<T>>, what: &str) -> Reply<Snapshot<T>> {
    match reader.and_then(SnapshotReader::latest) {
        Some(snapshot) => ok(snapshot),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::error(format!("No {} available yet", what))),
        ),
    }
}

/// Latest polled PTP status
pub async fn get_ptp_status(State(state): State<Arc<AppState>>) -> Reply<Snapshot<PtpStatus>> {
    latest(state.ptp_status.as_ref(), "PTP status")
}

/// Latest polled list of discovered sources
pub async fn get_remote_sources(
    State(state): State<Arc<AppState>>,
) -> Reply<Snapshot<Vec<RemoteSource>>> {
    latest(state.remote_sources.as_ref(), "remote source list")
}
