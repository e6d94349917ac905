//! # resume-review
//!
//! Submit a résumé together with the job it targets and get structured
//! ATS-style feedback from a vision language model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! résumé + job context
//!  │
//!  ├─ 1. Upload     store the original document
//!  ├─ 2. Convert    render page 1 to a PNG preview (pdfium, spawn_blocking)
//!  ├─ 3. Upload     store the preview
//!  ├─ 4. Record     write "resume:<id>" with empty feedback
//!  ├─ 5. Analyze    send the pages + job-specific prompt to the model
//!  ├─ 6. Parse      text or content-block payload → typed Feedback
//!  └─ 7. Commit     re-write the record, navigate to /resume/<id>
//! ```
//!
//! Each stage reports a human-readable [`SubmissionStatus`] to an optional
//! [`StatusReporter`], and the first failure ends the submission with a typed
//! [`SubmissionError`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resume_review::{load_document, Pipeline, PipelineConfig, SubmissionRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let pipeline = Pipeline::local("./data", PipelineConfig::default())?;
//!     let file = load_document("resume.pdf").await?;
//!     let outcome = pipeline
//!         .submit(SubmissionRequest::new("Acme", "SWE", "Build things", file))
//!         .await?;
//!     println!("{}", outcome.navigation);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `resume-review` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! resume-review = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod error;
pub mod id;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod record;
pub mod submit;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{
    Blob, ContentPart, DocumentStore, FeedbackClient, FeedbackContent, FeedbackResponse,
    ImageConversion, ImageConverter, KeyValueStore, StoredFile,
};
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use error::{BackendError, SubmissionError};
pub use id::{IdGenerator, UuidGenerator};
pub use pipeline::input::load_document;
pub use pipeline::llm::LlmFeedbackClient;
pub use pipeline::postprocess::FeedbackParseError;
pub use pipeline::render::PdfiumConverter;
pub use pipeline::storage::{FileKvStore, LocalDocumentStore, MemoryKvStore};
pub use progress::{
    FailureKind, NoopStatusReporter, SharedStatusReporter, Stage, StatusReporter, StatusTracker,
    SubmissionStatus,
};
pub use prompts::prepare_instructions;
pub use record::{
    navigation_target, record_key, AtsFeedback, AtsTip, CategoryFeedback, DetailedTip, Feedback,
    FeedbackSlot, RecordState, SubmissionRecord, TipKind,
};
pub use submit::{load_record, Pipeline, PipelineBuilder, SubmissionOutcome, SubmissionRequest};
pub use tokio_util::sync::CancellationToken;
