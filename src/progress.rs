//! Status reporting for a résumé submission.
//!
//! Inject an [`Arc<dyn StatusReporter>`] via
//! [`crate::config::PipelineConfigBuilder::status_reporter`] to receive the
//! human-readable label of every stage as the pipeline moves through it, and
//! the navigation target once the analysis is stored.
//!
//! The reporter is a passive sink: the pipeline never waits on it and never
//! reads anything back. A view layer typically forwards the label to a
//! heading, a terminal spinner, or a websocket.
//!
//! # Example
//!
//! ```rust
//! use resume_review::{StatusReporter, SubmissionStatus, PipelineConfig};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct Recorder {
//!     labels: Mutex<Vec<String>>,
//! }
//!
//! impl StatusReporter for Recorder {
//!     fn on_status(&self, status: &SubmissionStatus) {
//!         self.labels.lock().unwrap().push(status.to_string());
//!     }
//! }
//!
//! let config = PipelineConfig::builder()
//!     .status_reporter(Arc::new(Recorder::default()) as Arc<dyn StatusReporter>)
//!     .build()
//!     .unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

/// The stages of a submission, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Upload the original résumé to the document store.
    Upload,
    /// Render the résumé to an image.
    ConvertImage,
    /// Upload the rendered image.
    UploadImage,
    /// Write the placeholder record.
    PersistRecord,
    /// Ask the feedback client for an analysis.
    Analyze,
    /// Re-write the record with parsed feedback.
    PersistFeedback,
}

impl Stage {
    /// The failure bucket a problem in this stage falls into.
    pub fn failure_kind(self) -> FailureKind {
        match self {
            Stage::Upload => FailureKind::Upload,
            Stage::ConvertImage => FailureKind::Conversion,
            Stage::UploadImage => FailureKind::ImageUpload,
            Stage::PersistRecord | Stage::PersistFeedback => FailureKind::RecordWrite,
            Stage::Analyze => FailureKind::Analysis,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Upload => "résumé upload",
            Stage::ConvertImage => "image conversion",
            Stage::UploadImage => "image upload",
            Stage::PersistRecord => "record write",
            Stage::Analyze => "analysis",
            Stage::PersistFeedback => "feedback write",
        };
        f.write_str(name)
    }
}

/// Why a submission stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Upload,
    Conversion,
    ImageUpload,
    RecordWrite,
    Analysis,
    Parse,
}

/// The single current-stage label of a submission.
///
/// `Display` renders the text shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    /// Nothing submitted yet.
    Idle,
    UploadingFile,
    ConvertingToImage,
    UploadingImage,
    PreparingRecord,
    Analyzing,
    /// Feedback stored; the view is about to navigate to the record.
    Complete,
    /// Terminal failure.
    Failed(FailureKind),
    /// Terminal: the caller cancelled the submission.
    Cancelled,
}

impl SubmissionStatus {
    /// `true` once no further status will follow for this submission.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmissionStatus::Complete | SubmissionStatus::Failed(_) | SubmissionStatus::Cancelled
        )
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SubmissionStatus::Idle => "Drop your resume for an ATS score and improvement tips",
            SubmissionStatus::UploadingFile => "Uploading the file...",
            SubmissionStatus::ConvertingToImage => "Converting to image...",
            SubmissionStatus::UploadingImage => "Uploading the image...",
            SubmissionStatus::PreparingRecord => "Preparing data...",
            SubmissionStatus::Analyzing => "Analyzing...",
            SubmissionStatus::Complete => "Analysis complete, redirecting...",
            SubmissionStatus::Failed(FailureKind::Upload) => "Error: failed to upload the file",
            SubmissionStatus::Failed(FailureKind::Conversion) => {
                "Error: failed to convert PDF to image"
            }
            SubmissionStatus::Failed(FailureKind::ImageUpload) => {
                "Error: failed to upload the image"
            }
            SubmissionStatus::Failed(FailureKind::RecordWrite) => {
                "Error: failed to save the submission record"
            }
            SubmissionStatus::Failed(FailureKind::Analysis) => "Error: failed to analyze resume",
            SubmissionStatus::Failed(FailureKind::Parse) => {
                "Error: failed to read the analysis feedback"
            }
            SubmissionStatus::Cancelled => "Submission cancelled",
        };
        f.write_str(label)
    }
}

/// Receives status updates from the submission pipeline.
///
/// Implementations must be `Send + Sync`: one pipeline may run several
/// submissions from different tasks. Both methods default to no-ops so
/// callers only override what they care about.
pub trait StatusReporter: Send + Sync {
    /// Called synchronously on every stage transition, on failure, and once
    /// with [`SubmissionStatus::Idle`] before a submission starts.
    fn on_status(&self, status: &SubmissionStatus) {
        let _ = status;
    }

    /// Called once after the final record is stored.
    ///
    /// # Arguments
    /// * `target`: route of the record's detail view, e.g. `/resume/<id>`
    fn on_navigate(&self, target: &str) {
        let _ = target;
    }
}

/// A no-op reporter for callers that don't display progress.
///
/// This is the default when no reporter is configured.
pub struct NoopStatusReporter;

impl StatusReporter for NoopStatusReporter {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type SharedStatusReporter = Arc<dyn StatusReporter>;

/// Per-submission holder of the current status.
///
/// Every [`StatusTracker::set`] overwrites the label and forwards it to the
/// reporter; the pipeline keeps one tracker per `submit` call.
pub struct StatusTracker {
    current: SubmissionStatus,
    reporter: SharedStatusReporter,
}

impl StatusTracker {
    /// Start tracking, reporting [`SubmissionStatus::Idle`] immediately.
    pub fn new(reporter: SharedStatusReporter) -> Self {
        reporter.on_status(&SubmissionStatus::Idle);
        Self {
            current: SubmissionStatus::Idle,
            reporter,
        }
    }

    pub fn set(&mut self, status: SubmissionStatus) {
        self.current = status;
        self.reporter.on_status(&status);
    }

    pub fn current(&self) -> SubmissionStatus {
        self.current
    }

    pub fn navigate(&self, target: &str) {
        self.reporter.on_navigate(target);
    }
}
