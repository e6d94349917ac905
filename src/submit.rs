//! The submission pipeline.
//!
//! [`Pipeline::submit`] drives one résumé through every stage in strict
//! order, each gated on the previous one:
//!
//! ```text
//! upload ─▶ convert ─▶ upload image ─▶ write placeholder ─▶ analyze ─▶ parse ─▶ write feedback
//! ```
//!
//! There is no parallelism, retry, or rollback. The first failing stage ends
//! the submission, reports its status label, and returns a typed
//! [`SubmissionError`]. Anything already stored (uploads, the placeholder
//! record) stays stored.
//!
//! Every collaborator call is raced against the caller's
//! [`CancellationToken`] and the stage timeout from [`PipelineConfig`].

use crate::backend::{
    Blob, DocumentStore, FeedbackClient, ImageConversion, ImageConverter, KeyValueStore,
    StoredFile,
};
use crate::config::PipelineConfig;
use crate::error::{BackendError, SubmissionError};
use crate::id::{IdGenerator, UuidGenerator};
use crate::pipeline::llm::LlmFeedbackClient;
use crate::pipeline::postprocess;
use crate::pipeline::render::PdfiumConverter;
use crate::pipeline::storage::{FileKvStore, LocalDocumentStore};
use crate::progress::{NoopStatusReporter, Stage, StatusTracker, SubmissionStatus};
use crate::prompts::prepare_instructions;
use crate::record::{navigation_target, record_key, FeedbackSlot, SubmissionRecord};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What the caller submits: the résumé plus the job it targets.
///
/// The text fields may be empty; they are stored and forwarded as given.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub company: String,
    pub job_title: String,
    pub job_description: String,
    pub file: Blob,
}

impl SubmissionRequest {
    pub fn new(
        company: impl Into<String>,
        job_title: impl Into<String>,
        job_description: impl Into<String>,
        file: Blob,
    ) -> Self {
        Self {
            company: company.into(),
            job_title: job_title.into(),
            job_description: job_description.into(),
            file,
        }
    }
}

/// A completed submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionOutcome {
    /// The record as finally stored, with feedback.
    pub record: SubmissionRecord,
    /// Route of the record's detail view, `/resume/<id>`.
    pub navigation: String,
}

/// Orchestrates résumé submissions over injected collaborators.
///
/// Cheap to share: hold it in an `Arc` and call [`Pipeline::submit`] from as
/// many tasks as needed. Each call keeps its own status and record.
pub struct Pipeline {
    documents: Arc<dyn DocumentStore>,
    converter: Arc<dyn ImageConverter>,
    records: Arc<dyn KeyValueStore>,
    feedback: Arc<dyn FeedbackClient>,
    ids: Arc<dyn IdGenerator>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// A pipeline storing everything under `data_dir`.
    ///
    /// Uploads go to `<data_dir>/files`, records to `<data_dir>/records`.
    /// Rendering uses pdfium and analysis uses the provider resolved from
    /// `config` and the environment.
    pub fn local(
        data_dir: impl AsRef<Path>,
        config: PipelineConfig,
    ) -> Result<Self, SubmissionError> {
        let data_dir = data_dir.as_ref();
        let documents: Arc<dyn DocumentStore> =
            Arc::new(LocalDocumentStore::new(data_dir.join("files")));
        let feedback = LlmFeedbackClient::from_config(&config, Arc::clone(&documents))
            .map_err(|e| SubmissionError::InvalidConfig(e.to_string()))?;

        Pipeline::builder()
            .converter(Arc::new(PdfiumConverter::from_config(&config)))
            .records(Arc::new(FileKvStore::new(data_dir.join("records"))))
            .feedback_client(Arc::new(feedback))
            .documents(documents)
            .config(config)
            .build()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Submit a résumé and wait for its feedback.
    pub async fn submit(
        &self,
        request: SubmissionRequest,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        self.submit_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Like [`Pipeline::submit`], stopping early once `cancel` fires.
    ///
    /// Cancellation is terminal: the status becomes
    /// [`SubmissionStatus::Cancelled`] and whatever was already stored stays.
    pub async fn submit_with_cancel(
        &self,
        request: SubmissionRequest,
        cancel: &CancellationToken,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        let reporter = self
            .config
            .status_reporter
            .clone()
            .unwrap_or_else(|| Arc::new(NoopStatusReporter));
        let mut tracker = StatusTracker::new(reporter);
        let start = Instant::now();

        match self.run(request, cancel, &mut tracker).await {
            Ok(outcome) => {
                info!(
                    "Submission {} complete in {}ms",
                    outcome.record.id,
                    start.elapsed().as_millis()
                );
                tracker.set(SubmissionStatus::Complete);
                tracker.navigate(&outcome.navigation);
                Ok(outcome)
            }
            Err(e) => {
                warn!("Submission stopped: {}", e);
                if let Some(status) = e.status() {
                    tracker.set(status);
                }
                Err(e)
            }
        }
    }

    /// Read a stored record back, in either its processing or complete form.
    pub async fn load_record(&self, id: &str) -> Result<Option<SubmissionRecord>, BackendError> {
        load_record(self.records.as_ref(), id).await
    }

    async fn run(
        &self,
        request: SubmissionRequest,
        cancel: &CancellationToken,
        tracker: &mut StatusTracker,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        let SubmissionRequest {
            company,
            job_title,
            job_description,
            file,
        } = request;

        // ── Step 1: Upload the résumé ────────────────────────────────────
        tracker.set(SubmissionStatus::UploadingFile);
        info!("Uploading {} ({} bytes)", file.name, file.len());
        let resume = self
            .upload(Stage::Upload, &file, cancel, |reason| {
                SubmissionError::UploadFailed { reason }
            })
            .await?;

        // ── Step 2: Render a preview ─────────────────────────────────────
        tracker.set(SubmissionStatus::ConvertingToImage);
        let ImageConversion { image, error } = guard(
            Stage::ConvertImage,
            self.config.convert_timeout(),
            cancel,
            self.converter.convert(&file),
        )
        .await?;
        let image = image.ok_or_else(|| SubmissionError::ConversionFailed {
            reason: error.unwrap_or_else(|| "no image produced".to_string()),
        })?;

        // ── Step 3: Upload the preview ───────────────────────────────────
        tracker.set(SubmissionStatus::UploadingImage);
        let preview = self
            .upload(Stage::UploadImage, &image, cancel, |reason| {
                SubmissionError::ImageUploadFailed { reason }
            })
            .await?;

        // ── Step 4: Persist the placeholder ──────────────────────────────
        tracker.set(SubmissionStatus::PreparingRecord);
        let id = self.ids.generate();
        let record = SubmissionRecord {
            id: id.clone(),
            resume_path: resume.path,
            image_path: preview.path,
            company,
            job_title,
            job_description,
            feedback: FeedbackSlot::Pending,
        };
        self.write_record(&record, Stage::PersistRecord, cancel)
            .await?;
        info!("Record {} stored, requesting analysis", record.key());

        // From here on the placeholder exists; every error names it.
        self.analyze_and_commit(record, cancel, tracker)
            .await
            .map_err(|e| e.with_record(&id))
    }

    /// Steps 5 to 7: analyze the stored résumé and write the feedback back.
    async fn analyze_and_commit(
        &self,
        mut record: SubmissionRecord,
        cancel: &CancellationToken,
        tracker: &mut StatusTracker,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        let id = record.id.clone();

        // ── Step 5: Analyze ──────────────────────────────────────────────
        tracker.set(SubmissionStatus::Analyzing);
        let instructions = prepare_instructions(&record.job_title, &record.job_description);
        let limit = self.config.analysis_timeout();
        let response = match guard(
            Stage::Analyze,
            limit,
            cancel,
            self.feedback.analyze(&record.resume_path, &instructions),
        )
        .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return Err(SubmissionError::AnalysisFailed {
                    record_id: id,
                    reason: e.to_string(),
                })
            }
            Err(SubmissionError::TimedOut { secs, .. }) => {
                return Err(SubmissionError::AnalysisFailed {
                    record_id: id,
                    reason: format!("no answer within {secs}s"),
                })
            }
            Err(e) => return Err(e),
        };

        // ── Step 6: Parse ────────────────────────────────────────────────
        let feedback = postprocess::feedback_from_content(response.content).map_err(|e| {
            SubmissionError::ParseFailed {
                record_id: id.clone(),
                reason: e.to_string(),
            }
        })?;
        debug!("Parsed feedback for {}: overall {}", id, feedback.overall_score);

        // ── Step 7: Commit ───────────────────────────────────────────────
        record.feedback = FeedbackSlot::Ready(feedback);
        self.write_record(&record, Stage::PersistFeedback, cancel)
            .await?;

        let navigation = navigation_target(&record.id);
        Ok(SubmissionOutcome { record, navigation })
    }

    /// Upload one blob, wrapping a store failure with `failed`.
    async fn upload(
        &self,
        stage: Stage,
        blob: &Blob,
        cancel: &CancellationToken,
        failed: fn(String) -> SubmissionError,
    ) -> Result<StoredFile, SubmissionError> {
        let limit = self.config.upload_timeout();
        let stored = guard(stage, limit, cancel, self.documents.upload(blob))
            .await?
            .map_err(|e| failed(e.to_string()))?;
        if stored.path.is_empty() {
            return Err(failed("document store returned no path".to_string()));
        }
        debug!("{} stored at {}", blob.name, stored.path);
        Ok(stored)
    }

    async fn write_record(
        &self,
        record: &SubmissionRecord,
        stage: Stage,
        cancel: &CancellationToken,
    ) -> Result<(), SubmissionError> {
        let key = record.key();
        let value = record
            .to_json()
            .map_err(|e| SubmissionError::RecordWriteFailed {
                key: key.clone(),
                reason: e.to_string(),
                record_id: None,
            })?;
        guard(stage, self.config.record_timeout(), cancel, self.records.set(&key, value))
            .await?
            .map_err(|e| SubmissionError::RecordWriteFailed {
                key,
                reason: e.to_string(),
                record_id: None,
            })
    }
}

/// Read the record with `id` from `store`.
pub async fn load_record(
    store: &dyn KeyValueStore,
    id: &str,
) -> Result<Option<SubmissionRecord>, BackendError> {
    match store.get(&record_key(id)).await? {
        Some(json) => Ok(Some(SubmissionRecord::from_json(&json)?)),
        None => Ok(None),
    }
}

/// Run `fut` unless `cancel` fires or `limit` elapses first.
async fn guard<F>(
    stage: Stage,
    limit: Duration,
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, SubmissionError>
where
    F: Future,
{
    if cancel.is_cancelled() {
        return Err(SubmissionError::Cancelled {
            stage,
            record_id: None,
        });
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SubmissionError::Cancelled { stage, record_id: None }),
        res = tokio::time::timeout(limit, fut) => res.map_err(|_| SubmissionError::TimedOut {
            stage,
            secs: limit.as_secs(),
            record_id: None,
        }),
    }
}

/// Builder for [`Pipeline`].
///
/// Every collaborator except the id generator must be set; the id generator
/// defaults to [`UuidGenerator`] and the config to [`PipelineConfig::default`].
#[derive(Default)]
pub struct PipelineBuilder {
    documents: Option<Arc<dyn DocumentStore>>,
    converter: Option<Arc<dyn ImageConverter>>,
    records: Option<Arc<dyn KeyValueStore>>,
    feedback: Option<Arc<dyn FeedbackClient>>,
    ids: Option<Arc<dyn IdGenerator>>,
    config: Option<PipelineConfig>,
}

impl PipelineBuilder {
    pub fn documents(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.documents = Some(store);
        self
    }

    pub fn converter(mut self, converter: Arc<dyn ImageConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn records(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.records = Some(store);
        self
    }

    pub fn feedback_client(mut self, client: Arc<dyn FeedbackClient>) -> Self {
        self.feedback = Some(client);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<Pipeline, SubmissionError> {
        fn required<T>(value: Option<T>, what: &str) -> Result<T, SubmissionError> {
            value.ok_or_else(|| SubmissionError::InvalidConfig(format!("no {what} configured")))
        }

        Ok(Pipeline {
            documents: required(self.documents, "document store")?,
            converter: required(self.converter, "image converter")?,
            records: required(self.records, "record store")?,
            feedback: required(self.feedback, "feedback client")?,
            ids: self.ids.unwrap_or_else(|| Arc::new(UuidGenerator)),
            config: self.config.unwrap_or_default(),
        })
    }
}
