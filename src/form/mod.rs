//! Stream edit forms
//!
//! Drafts, their validation, and the per-form state machine that turns a
//! valid draft into a daemon update.

pub mod draft;
pub mod editor;
pub mod validate;

pub use draft::{first_free_id, SinkDraft, SourceDraft, StreamDraft, StreamKind, StreamUpdate};
pub use editor::{EditForm, EditMode, FormConstraints, FormState};
pub use validate::{
    validate_config, validate_ptp_config, validate_sink, validate_source, FieldIssue, FieldName,
    FormContext, Validation,
};
