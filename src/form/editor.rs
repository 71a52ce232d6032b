//! Edit form state machine
//!
//! ```text
//! Editing ──begin_submit──► Submitting ──Ok──► Submitted
//!    ▲                          │
//!    └────────── Err ───────────┘   (message kept in last_error)
//! ```
//!
//! Each form owns one draft for one session. Edits are only accepted while
//! `Editing`; cancelling drops the form and its draft.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::{apply_update, DaemonApi};
use crate::calc::{packet_size_options, start_offsets, ChannelMap, PacketSizeOption};
use crate::error::{ApiError, Error, FormError};
use crate::form::draft::{SinkDraft, SourceDraft, StreamDraft, StreamKind, StreamUpdate};
use crate::form::validate::{FieldIssue, FieldName, FormContext, Validation};
use crate::protocol::{Codec, RemoteSource};

/// Lifecycle state of an edit form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormState {
    Editing,
    Submitting,
    Submitted,
}

impl FormState {
    pub fn as_str(self) -> &'static str {
        match self {
            FormState::Editing => "editing",
            FormState::Submitting => "submitting",
            FormState::Submitted => "submitted",
        }
    }
}

/// Whether the form creates a new stream or edits an existing one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditMode {
    #[default]
    Add,
    Edit,
}

/// Everything a form view needs to render its selectors and error marks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormConstraints {
    pub kind: StreamKind,
    pub frame_multiplier: u32,
    pub max_samples_per_packet: u32,
    /// Empty for sinks
    pub packet_options: Vec<PacketSizeOption>,
    pub max_channels: usize,
    /// Start offsets valid for the current channel count
    pub start_offsets: Vec<usize>,
    pub channel_map: ChannelMap,
    pub valid: bool,
    pub errors: BTreeMap<FieldName, FieldIssue>,
}

/// One edit session over a source or sink draft
#[derive(Debug, Clone)]
pub struct EditForm<D: StreamDraft> {
    session: Uuid,
    mode: EditMode,
    context: FormContext,
    draft: D,
    state: FormState,
    last_error: Option<String>,
}

impl<D: StreamDraft> EditForm<D> {
    pub fn open(mode: EditMode, draft: D, context: FormContext) -> Self {
        let session = Uuid::new_v4();
        info!(
            %session,
            kind = %D::KIND,
            id = draft.id(),
            ?mode,
            sample_rate = context.clock.sample_rate(),
            "Edit form opened"
        );

        Self {
            session,
            mode,
            context,
            draft,
            state: FormState::Editing,
            last_error: None,
        }
    }

    pub fn session(&self) -> Uuid {
        self.session
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn context(&self) -> &FormContext {
        &self.context
    }

    pub fn draft(&self) -> &D {
        &self.draft
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    /// Message of the last rejected submit, if any
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn ensure_editing(&self) -> Result<(), FormError> {
        if self.state != FormState::Editing {
            return Err(FormError::NotEditing(self.state.as_str()));
        }
        Ok(())
    }

    /// Apply an edit to the draft.
    ///
    /// In [`EditMode::Edit`] the stream id is fixed; an edit that changes it
    /// is discarded.
    pub fn update<F>(&mut self, edit: F) -> Result<(), FormError>
    where
        F: FnOnce(&mut D),
    {
        self.ensure_editing()?;

        let mut next = self.draft.clone();
        edit(&mut next);
        if self.mode == EditMode::Edit && next.id() != self.draft.id() {
            return Err(FormError::ImmutableId);
        }

        self.draft = next;
        Ok(())
    }

    /// Change the channel count, keeping the start when the run still fits
    pub fn set_channels(&mut self, count: usize) -> Result<(), Error> {
        self.ensure_editing()?;
        let map = self.draft.channel_map().resized(count)?;
        self.draft.set_channel_map(map);
        Ok(())
    }

    pub fn set_start_offset(&mut self, start: usize) -> Result<(), Error> {
        self.ensure_editing()?;
        let map = self.draft.channel_map().with_start(start)?;
        self.draft.set_channel_map(map);
        Ok(())
    }

    pub fn validate(&self) -> Validation {
        self.draft.validate(&self.context)
    }

    pub fn can_submit(&self) -> bool {
        self.state == FormState::Editing && self.validate().is_valid()
    }

    pub fn constraints(&self) -> FormConstraints {
        let clock = &self.context.clock;
        let map = self.draft.channel_map().clone();
        let validation = self.validate();
        let packet_options = match D::KIND {
            StreamKind::Source => packet_size_options(clock),
            StreamKind::Sink => Vec::new(),
        };

        FormConstraints {
            kind: D::KIND,
            frame_multiplier: clock.frame_multiplier(),
            max_samples_per_packet: clock.max_samples_per_packet(),
            packet_options,
            max_channels: self.draft.max_channels(&self.context),
            start_offsets: start_offsets(map.len())
                .map(|offsets| offsets.collect())
                .unwrap_or_default(),
            channel_map: map,
            valid: validation.is_valid(),
            errors: validation.into_errors(),
        }
    }

    /// Validate and move to `Submitting`, returning the update to send
    pub fn begin_submit(&mut self) -> Result<StreamUpdate, Error> {
        self.ensure_editing()?;

        let validation = self.validate();
        if !validation.is_valid() {
            debug!(session = %self.session, errors = ?validation.errors(), "Submit refused");
            return Err(FormError::Invalid(validation.error_count()).into());
        }

        let update = self.draft.to_update()?;
        self.state = FormState::Submitting;
        Ok(update)
    }

    /// Record the daemon's answer to the update from [`Self::begin_submit`]
    pub fn finish_submit(&mut self, outcome: Result<(), ApiError>) -> Result<FormState, FormError> {
        if self.state != FormState::Submitting {
            return Err(FormError::NotSubmitting);
        }

        match outcome {
            Ok(()) => {
                info!(session = %self.session, kind = %D::KIND, id = self.draft.id(), "Submitted");
                self.last_error = None;
                self.state = FormState::Submitted;
            }
            Err(e) => {
                warn!(session = %self.session, error = %e, "Submit failed, back to editing");
                self.last_error = Some(e.to_string());
                self.state = FormState::Editing;
            }
        }
        Ok(self.state)
    }

    /// Submit through `daemon`. A daemon rejection is not an error here: the
    /// form returns to `Editing` with the message in [`Self::last_error`].
    pub async fn submit<A>(&mut self, daemon: &A) -> Result<FormState, Error>
    where
        A: DaemonApi + ?Sized,
    {
        let update = self.begin_submit()?;
        let outcome = apply_update(daemon, &update).await;
        Ok(self.finish_submit(outcome)?)
    }

    /// Discard the draft
    pub fn cancel(self) {
        debug!(session = %self.session, state = self.state.as_str(), "Edit form cancelled");
    }
}

impl EditForm<SourceDraft> {
    pub fn set_codec(&mut self, codec: Codec) -> Result<(), FormError> {
        self.update(|draft| draft.codec = codec)
    }

    pub fn set_max_samples_per_packet(&mut self, samples: u32) -> Result<(), FormError> {
        self.update(|draft| draft.max_samples_per_packet = samples)
    }
}

impl EditForm<SinkDraft> {
    pub fn set_use_sdp(&mut self, use_sdp: bool) -> Result<(), FormError> {
        self.update(|draft| draft.use_sdp = use_sdp)
    }

    /// Copy a discovered source's SDP into the draft; an announcement without
    /// SDP leaves the draft unchanged
    pub fn select_remote_source(&mut self, remote: &RemoteSource) -> Result<(), FormError> {
        if remote.sdp.is_empty() {
            return self.ensure_editing();
        }
        self.update(|draft| draft.sdp = remote.sdp.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InMemoryDaemon;
    use crate::calc::{max_channels, ClockContext, RatePolicy, SampleRate};
    use crate::protocol::DaemonConfig;

    fn ctx(rate: SampleRate) -> FormContext {
        FormContext::new(ClockContext::new(rate, 48).unwrap())
    }

    fn source_form() -> EditForm<SourceDraft> {
        EditForm::open(EditMode::Add, SourceDraft::with_defaults(0), ctx(SampleRate::Hz48000))
    }

    fn sink_form() -> EditForm<SinkDraft> {
        EditForm::open(
            EditMode::Add,
            SinkDraft::with_defaults(0, "http://127.0.0.1:8080"),
            ctx(SampleRate::Hz48000),
        )
    }

    #[test]
    fn test_resize_and_move_map() {
        let mut form = source_form();
        form.set_start_offset(10).unwrap();
        form.set_channels(4).unwrap();
        assert_eq!(form.draft().map.as_slice(), &[10, 11, 12, 13]);

        assert!(form.set_start_offset(62).is_err());
        assert_eq!(form.draft().map.start(), 10);
    }

    #[test]
    fn test_channel_count_boundary() {
        let mut form = source_form();
        form.set_codec(Codec::L24).unwrap();
        let limit = max_channels(Codec::L24, 48).unwrap();
        assert_eq!(limit, 10);

        form.set_channels(limit).unwrap();
        assert!(form.can_submit());

        form.set_channels(limit + 1).unwrap();
        let constraints = form.constraints();
        assert!(!constraints.valid);
        assert_eq!(constraints.max_channels, 10);
        assert!(constraints.errors[&FieldName::Channels].is_capacity());
        assert!(matches!(
            form.begin_submit(),
            Err(Error::Form(FormError::Invalid(1)))
        ));
        assert_eq!(form.state(), FormState::Editing);
    }

    #[test]
    fn test_constraints_at_48k() {
        let form = source_form();
        let constraints = form.constraints();

        assert_eq!(constraints.frame_multiplier, 1);
        assert_eq!(constraints.max_samples_per_packet, 48);
        assert_eq!(constraints.max_channels, 15);
        assert_eq!(constraints.start_offsets.len(), 63);
        let disabled: Vec<u32> = constraints
            .packet_options
            .iter()
            .filter(|o| !o.allowed)
            .map(|o| o.samples)
            .collect();
        assert_eq!(disabled, vec![96, 192]);
    }

    #[test]
    fn test_sink_constraints_have_no_packet_options() {
        let constraints = sink_form().constraints();
        assert!(constraints.packet_options.is_empty());
        assert_eq!(constraints.max_channels, 64);
        assert!(constraints.valid);
    }

    #[test]
    fn test_id_fixed_in_edit_mode() {
        let mut form = EditForm::open(
            EditMode::Edit,
            SourceDraft::with_defaults(4),
            ctx(SampleRate::Hz48000),
        );
        assert_eq!(form.update(|d| d.id = 5), Err(FormError::ImmutableId));
        assert_eq!(form.draft().id, 4);

        let mut form = source_form();
        form.update(|d| d.id = 5).unwrap();
        assert_eq!(form.draft().id, 5);
    }

    #[test]
    fn test_edits_refused_while_submitting() {
        let mut form = source_form();
        form.begin_submit().unwrap();
        assert_eq!(form.state(), FormState::Submitting);
        assert_eq!(
            form.set_codec(Codec::L24),
            Err(FormError::NotEditing("submitting"))
        );
        assert!(form.begin_submit().is_err());
    }

    #[test]
    fn test_failure_returns_to_editing() {
        let mut form = source_form();
        form.begin_submit().unwrap();

        let state = form
            .finish_submit(Err(ApiError::Rejected {
                status: 400,
                body: "invalid map".to_string(),
            }))
            .unwrap();

        assert_eq!(state, FormState::Editing);
        assert!(form.last_error().unwrap().contains("invalid map"));
        assert_eq!(form.finish_submit(Ok(())), Err(FormError::NotSubmitting));
    }

    #[test]
    fn test_remote_source_selection() {
        let mut form = sink_form();
        form.set_use_sdp(true).unwrap();
        assert!(!form.can_submit());

        let mut remote = RemoteSource {
            source: "SAP".to_string(),
            id: "d00d".to_string(),
            name: "Stage Box".to_string(),
            domain: String::new(),
            address: "10.0.0.12".to_string(),
            sdp: String::new(),
            last_seen: 2,
            announce_period: 30,
        };
        form.select_remote_source(&remote).unwrap();
        assert!(form.draft().sdp.is_empty());

        remote.sdp = "v=0\r\ns=Stage Box\r\n".to_string();
        form.select_remote_source(&remote).unwrap();
        assert_eq!(form.draft().sdp, remote.sdp);
        assert!(form.can_submit());
    }

    #[tokio::test]
    async fn test_submit_refetch_round_trip() {
        let daemon = InMemoryDaemon::new(DaemonConfig {
            sample_rate: 96_000,
            tic_frame_size_at_1fs: 48,
            ..Default::default()
        });
        let config = daemon.config().await.unwrap();
        let clock = ClockContext::from_config(&config, RatePolicy::Reject).unwrap();

        let mut form = EditForm::open(
            EditMode::Add,
            SourceDraft::with_defaults(2),
            FormContext::new(clock),
        );
        form.set_codec(Codec::L24).unwrap();
        form.set_max_samples_per_packet(96).unwrap();
        form.set_start_offset(20).unwrap();
        form.set_channels(5).unwrap();
        let submitted = form.draft().clone();

        assert_eq!(form.submit(&daemon).await.unwrap(), FormState::Submitted);

        let records = daemon.sources().await.unwrap();
        assert_eq!(records.len(), 1);
        let reloaded = SourceDraft::from_record(&records[0]).unwrap();
        assert_eq!(reloaded, submitted);
        assert_eq!(reloaded.map.as_slice(), &[20, 21, 22, 23, 24]);
    }

    #[tokio::test]
    async fn test_rejected_submit_keeps_draft() {
        let daemon = InMemoryDaemon::default();
        daemon.reject_next(500, "sink busy");

        let mut form = sink_form();
        form.set_channels(8).unwrap();

        assert_eq!(form.submit(&daemon).await.unwrap(), FormState::Editing);
        assert!(form.last_error().unwrap().contains("sink busy"));
        assert_eq!(form.draft().map.len(), 8);

        assert_eq!(form.submit(&daemon).await.unwrap(), FormState::Submitted);
        assert_eq!(form.last_error(), None);
    }
}
