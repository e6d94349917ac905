//! Error types for the resume-review library.
//!
//! Two error types reflect two different audiences:
//!
//! * [`SubmissionError`]: **terminal** for one submission. Every variant is
//!   tied to the pipeline stage that failed, and maps onto the status label
//!   pushed to the [`crate::progress::StatusReporter`] via
//!   [`SubmissionError::status`]. Returned from [`crate::Pipeline::submit`].
//!
//! * [`BackendError`]: what a collaborator (document store, record store,
//!   renderer, LLM provider) reports when a single call fails. The pipeline
//!   never propagates it as-is; it is folded into the stage-specific
//!   `SubmissionError` with its message kept as the `reason`.

use crate::progress::{FailureKind, Stage, SubmissionStatus};
use std::path::PathBuf;
use thiserror::Error;

/// All terminal errors of a résumé submission.
#[derive(Debug, Error)]
pub enum SubmissionError {
    // ── Upload stages ─────────────────────────────────────────────────────
    /// The document store did not accept the original résumé.
    #[error("Résumé upload failed: {reason}")]
    UploadFailed { reason: String },

    /// The converter produced no image for the résumé.
    #[error("Conversion to image failed: {reason}")]
    ConversionFailed { reason: String },

    /// The document store did not accept the rendered image.
    #[error("Image upload failed: {reason}")]
    ImageUploadFailed { reason: String },

    // ── Record stages ─────────────────────────────────────────────────────
    /// Writing the submission record to the key-value store failed.
    ///
    /// `record_id` is set when the placeholder was already stored and only
    /// the feedback write failed.
    #[error("Failed to write record '{key}': {reason}")]
    RecordWriteFailed {
        key: String,
        reason: String,
        record_id: Option<String>,
    },

    // ── Analysis stages ───────────────────────────────────────────────────
    /// The feedback client returned no result.
    ///
    /// The placeholder record for `record_id` stays persisted.
    #[error("Analysis failed for record {record_id}: {reason}")]
    AnalysisFailed { record_id: String, reason: String },

    /// The feedback payload could not be turned into structured feedback.
    #[error("Feedback for record {record_id} could not be parsed: {reason}")]
    ParseFailed { record_id: String, reason: String },

    // ── Flow control ──────────────────────────────────────────────────────
    /// The caller cancelled the submission while `stage` was running.
    #[error("Submission cancelled during {stage}")]
    Cancelled {
        stage: Stage,
        record_id: Option<String>,
    },

    /// A collaborator call did not finish within its stage timeout.
    #[error("{stage} timed out after {secs}s")]
    TimedOut {
        stage: Stage,
        secs: u64,
        record_id: Option<String>,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SubmissionError {
    /// Which failure bucket this error belongs to, if it came from a stage.
    ///
    /// Timeouts count as a failure of the stage that timed out.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            SubmissionError::UploadFailed { .. } => Some(FailureKind::Upload),
            SubmissionError::ConversionFailed { .. } => Some(FailureKind::Conversion),
            SubmissionError::ImageUploadFailed { .. } => Some(FailureKind::ImageUpload),
            SubmissionError::RecordWriteFailed { .. } => Some(FailureKind::RecordWrite),
            SubmissionError::AnalysisFailed { .. } => Some(FailureKind::Analysis),
            SubmissionError::ParseFailed { .. } => Some(FailureKind::Parse),
            SubmissionError::TimedOut { stage, .. } => Some(stage.failure_kind()),
            SubmissionError::Cancelled { .. } | SubmissionError::InvalidConfig(_) => None,
        }
    }

    /// The terminal status shown to the user for this error.
    ///
    /// `None` for configuration errors, which happen before any submission
    /// starts.
    pub fn status(&self) -> Option<SubmissionStatus> {
        match self {
            SubmissionError::Cancelled { .. } => Some(SubmissionStatus::Cancelled),
            other => other.kind().map(SubmissionStatus::Failed),
        }
    }

    /// The id of the record that was persisted before the failure, if any.
    pub fn record_id(&self) -> Option<&str> {
        match self {
            SubmissionError::AnalysisFailed { record_id, .. }
            | SubmissionError::ParseFailed { record_id, .. } => Some(record_id),
            SubmissionError::RecordWriteFailed { record_id, .. }
            | SubmissionError::Cancelled { record_id, .. }
            | SubmissionError::TimedOut { record_id, .. } => record_id.as_deref(),
            _ => None,
        }
    }

    /// Tag a stage error with the id of the placeholder already stored.
    ///
    /// Variants that always carry an id, or that cannot follow the
    /// placeholder write, are returned unchanged.
    pub fn with_record(mut self, id: &str) -> Self {
        match &mut self {
            SubmissionError::RecordWriteFailed { record_id, .. }
            | SubmissionError::Cancelled { record_id, .. }
            | SubmissionError::TimedOut { record_id, .. } => {
                *record_id = Some(id.to_string());
            }
            _ => {}
        }
        self
    }
}

/// Error reported by a single collaborator call.
#[derive(Debug, Error)]
pub enum BackendError {
    /// A local file or stored object does not exist.
    #[error("File not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read or write permission.
    #[error("Permission denied for '{path}'")]
    PermissionDenied { path: PathBuf },

    /// A stored reference tried to leave the store root or was malformed.
    #[error("Invalid storage reference '{reference}'")]
    InvalidPath { reference: String },

    /// Any other I/O failure.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// pdfium could not be bound or failed to render.
    #[error("Rendering failed: {0}")]
    Render(String),

    /// The LLM provider is missing or returned an error.
    #[error("LLM provider error: {0}")]
    Provider(String),

    /// A record could not be (de)serialised.
    #[error("Record serialisation failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl BackendError {
    /// Classify an `std::io::Error` raised while touching `path`.
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => BackendError::FileNotFound { path },
            std::io::ErrorKind::PermissionDenied => BackendError::PermissionDenied { path },
            _ => BackendError::Io { path, source },
        }
    }
}
