//! Integration tests for the submission pipeline.
//!
//! Every collaborator is an in-process fake that records its calls, so these
//! tests run without pdfium, a network, or an API key.

use async_trait::async_trait;
use resume_review::{
    Blob, BackendError, CancellationToken, ContentPart, DocumentStore, FailureKind,
    FeedbackClient, FeedbackContent, FeedbackResponse, FeedbackSlot, IdGenerator,
    ImageConversion, ImageConverter, KeyValueStore, MemoryKvStore, Pipeline, PipelineConfig,
    RecordState, Stage, StatusReporter, StoredFile, SubmissionError, SubmissionRecord,
    SubmissionRequest, SubmissionStatus,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_test::{assert_err, assert_ok};

// ── Fakes ────────────────────────────────────────────────────────────────────

/// Document store that fails on chosen upload calls (0-based).
#[derive(Default)]
struct FakeDocuments {
    fail_on: Option<usize>,
    empty_path: bool,
    hang: bool,
    uploads: Mutex<Vec<String>>,
}

impl FakeDocuments {
    fn failing_on(call: usize) -> Self {
        Self {
            fail_on: Some(call),
            ..Self::default()
        }
    }

    fn uploaded(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentStore for FakeDocuments {
    async fn upload(&self, blob: &Blob) -> Result<StoredFile, BackendError> {
        let call = {
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push(blob.name.clone());
            uploads.len() - 1
        };
        if self.hang {
            std::future::pending::<()>().await;
        }
        if self.fail_on == Some(call) {
            return Err(BackendError::Provider("bucket unavailable".into()));
        }
        let path = if self.empty_path {
            String::new()
        } else {
            format!("/u/{}", blob.name)
        };
        Ok(StoredFile {
            path,
            name: blob.name.clone(),
            size: blob.len() as u64,
        })
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, BackendError> {
        Err(BackendError::InvalidPath {
            reference: path.to_string(),
        })
    }
}

struct FakeConverter {
    produce: bool,
    hang: bool,
    calls: AtomicUsize,
}

impl FakeConverter {
    fn new(produce: bool) -> Self {
        Self {
            produce,
            hang: false,
            calls: AtomicUsize::new(0),
        }
    }

    fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::new(true)
        }
    }
}

#[async_trait]
impl ImageConverter for FakeConverter {
    async fn convert(&self, document: &Blob) -> ImageConversion {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }
        if self.produce {
            let name = format!("{}.png", document.stem());
            ImageConversion::rendered(Blob::new(name, "image/png", vec![0x89, b'P', b'N', b'G']))
        } else {
            ImageConversion::failed("page 1: not a PDF")
        }
    }
}

enum Answer {
    Content(FeedbackContent),
    Fail(&'static str),
    /// Cancel the token, then never answer.
    CancelAndHang(CancellationToken),
    Hang,
}

struct FakeFeedback {
    answer: Answer,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeFeedback {
    fn new(answer: Answer) -> Self {
        Self {
            answer,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedbackClient for FakeFeedback {
    async fn analyze(
        &self,
        document_ref: &str,
        prompt: &str,
    ) -> Result<FeedbackResponse, BackendError> {
        self.calls
            .lock()
            .unwrap()
            .push((document_ref.to_string(), prompt.to_string()));
        match &self.answer {
            Answer::Content(content) => Ok(FeedbackResponse {
                content: content.clone(),
            }),
            Answer::Fail(reason) => Err(BackendError::Provider(reason.to_string())),
            Answer::CancelAndHang(token) => {
                token.cancel();
                std::future::pending().await
            }
            Answer::Hang => std::future::pending().await,
        }
    }
}

/// Record store whose writes always fail.
struct BrokenKv;

#[async_trait]
impl KeyValueStore for BrokenKv {
    async fn set(&self, _key: &str, _value: String) -> Result<(), BackendError> {
        Err(BackendError::Provider("connection reset".into()))
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, BackendError> {
        Ok(None)
    }
}

/// Record store that fails one chosen write (0-based) and keeps the rest.
struct FlakyKv {
    fail_on: usize,
    calls: AtomicUsize,
    inner: MemoryKvStore,
}

impl FlakyKv {
    fn failing_on(call: usize) -> Self {
        Self {
            fail_on: call,
            calls: AtomicUsize::new(0),
            inner: MemoryKvStore::new(),
        }
    }
}

#[async_trait]
impl KeyValueStore for FlakyKv {
    async fn set(&self, key: &str, value: String) -> Result<(), BackendError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == self.fail_on {
            return Err(BackendError::Provider("connection reset".into()));
        }
        self.inner.set(key, value).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        self.inner.get(key).await
    }
}

struct FixedId(&'static str);

impl IdGenerator for FixedId {
    fn generate(&self) -> String {
        self.0.to_string()
    }
}

#[derive(Default)]
struct Recorder {
    labels: Mutex<Vec<String>>,
    targets: Mutex<Vec<String>>,
}

impl Recorder {
    fn labels(&self) -> Vec<String> {
        self.labels.lock().unwrap().clone()
    }

    fn last(&self) -> String {
        self.labels().last().cloned().unwrap_or_default()
    }

    fn targets(&self) -> Vec<String> {
        self.targets.lock().unwrap().clone()
    }
}

impl StatusReporter for Recorder {
    fn on_status(&self, status: &SubmissionStatus) {
        self.labels.lock().unwrap().push(status.to_string());
    }

    fn on_navigate(&self, target: &str) {
        self.targets.lock().unwrap().push(target.to_string());
    }
}

// ── Test helpers ─────────────────────────────────────────────────────────────

const FEEDBACK_JSON: &str = r#"{
  "overallScore": 72,
  "ATS": { "score": 80, "tips": [ { "type": "good", "tip": "Standard headings" } ] },
  "toneAndStyle": { "score": 70, "tips": [ { "type": "improve", "tip": "Fewer adjectives", "explanation": "Plain verbs read stronger." } ] },
  "content": { "score": 65, "tips": [] },
  "structure": { "score": 75, "tips": [] },
  "skills": { "score": 68, "tips": [] }
}"#;

fn text_answer() -> Answer {
    Answer::Content(FeedbackContent::Text(FEEDBACK_JSON.to_string()))
}

fn request() -> SubmissionRequest {
    SubmissionRequest::new(
        "Acme",
        "SWE",
        "Build things",
        Blob::new("resume.pdf", "application/pdf", b"%PDF-1.7".to_vec()),
    )
}

struct Harness {
    documents: Arc<FakeDocuments>,
    converter: Arc<FakeConverter>,
    records: Arc<MemoryKvStore>,
    feedback: Arc<FakeFeedback>,
    reporter: Arc<Recorder>,
    pipeline: Pipeline,
}

fn harness(documents: FakeDocuments, produce_image: bool, answer: Answer) -> Harness {
    harness_with(documents, produce_image, answer, PipelineConfig::builder())
}

fn harness_with(
    documents: FakeDocuments,
    produce_image: bool,
    answer: Answer,
    config: resume_review::PipelineConfigBuilder,
) -> Harness {
    let documents = Arc::new(documents);
    let converter = Arc::new(FakeConverter::new(produce_image));
    let records = Arc::new(MemoryKvStore::new());
    let feedback = Arc::new(FakeFeedback::new(answer));
    let reporter = Arc::new(Recorder::default());

    let config = config
        .status_reporter(reporter.clone())
        .build()
        .expect("valid config");
    let pipeline = Pipeline::builder()
        .documents(documents.clone())
        .converter(converter.clone())
        .records(records.clone())
        .feedback_client(feedback.clone())
        .id_generator(Arc::new(FixedId("abc")))
        .config(config)
        .build()
        .expect("all collaborators set");

    Harness {
        documents,
        converter,
        records,
        feedback,
        reporter,
        pipeline,
    }
}

/// A pipeline over explicit collaborators, reporting to a fresh recorder.
fn pipeline_over(
    converter: Arc<dyn ImageConverter>,
    records: Arc<dyn KeyValueStore>,
    config: resume_review::PipelineConfigBuilder,
) -> (Pipeline, Arc<Recorder>) {
    let reporter = Arc::new(Recorder::default());
    let pipeline = Pipeline::builder()
        .documents(Arc::new(FakeDocuments::default()))
        .converter(converter)
        .records(records)
        .feedback_client(Arc::new(FakeFeedback::new(text_answer())))
        .id_generator(Arc::new(FixedId("abc")))
        .config(config.status_reporter(reporter.clone()).build().unwrap())
        .build()
        .unwrap();
    (pipeline, reporter)
}

fn stored(json: &str) -> SubmissionRecord {
    SubmissionRecord::from_json(json).expect("stored record parses")
}

// ── Happy path ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_success_writes_placeholder_then_feedback() {
    let h = harness(FakeDocuments::default(), true, text_answer());

    let outcome = assert_ok!(h.pipeline.submit(request()).await);

    let writes = h.records.writes().await;
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0].0, "resume:abc");
    assert_eq!(writes[1].0, "resume:abc");

    let first: serde_json::Value = serde_json::from_str(&writes[0].1).unwrap();
    assert_eq!(first["feedback"], "");
    let second: serde_json::Value = serde_json::from_str(&writes[1].1).unwrap();
    assert_eq!(second["feedback"]["overallScore"], 72);

    assert_eq!(outcome.navigation, "/resume/abc");
    assert_eq!(outcome.record, stored(&writes[1].1));
}

#[tokio::test]
async fn test_example_submission_record_fields() {
    let h = harness(FakeDocuments::default(), true, text_answer());

    let outcome = h.pipeline.submit(request()).await.unwrap();
    let record = outcome.record;

    assert_eq!(record.id, "abc");
    assert_eq!(record.company, "Acme");
    assert_eq!(record.job_title, "SWE");
    assert_eq!(record.job_description, "Build things");
    assert_eq!(record.resume_path, "/u/resume.pdf");
    assert_eq!(record.image_path, "/u/resume.png");
    assert_eq!(record.state(), RecordState::Complete);
    assert_eq!(h.documents.uploaded(), vec!["resume.pdf", "resume.png"]);
}

#[tokio::test]
async fn test_statuses_in_order_and_navigation() {
    let h = harness(FakeDocuments::default(), true, text_answer());

    h.pipeline.submit(request()).await.unwrap();

    assert_eq!(
        h.reporter.labels(),
        vec![
            "Drop your resume for an ATS score and improvement tips",
            "Uploading the file...",
            "Converting to image...",
            "Uploading the image...",
            "Preparing data...",
            "Analyzing...",
            "Analysis complete, redirecting...",
        ]
    );
    assert_eq!(h.reporter.targets(), vec!["/resume/abc"]);
}

#[tokio::test]
async fn test_analysis_uses_resume_path_and_job_prompt() {
    let h = harness(FakeDocuments::default(), true, text_answer());

    h.pipeline.submit(request()).await.unwrap();

    let calls = h.feedback.calls();
    assert_eq!(calls.len(), 1);
    let (document_ref, prompt) = &calls[0];
    assert_eq!(document_ref, "/u/resume.pdf");
    assert!(prompt.contains("The job title is: SWE"));
    assert!(prompt.contains("The job description is: Build things"));
}

#[tokio::test]
async fn test_empty_job_fields_are_accepted() {
    let h = harness(FakeDocuments::default(), true, text_answer());
    let req = SubmissionRequest::new(
        "",
        "",
        "",
        Blob::new("cv.pdf", "application/pdf", b"%PDF".to_vec()),
    );

    let outcome = assert_ok!(h.pipeline.submit(req).await);
    assert_eq!(outcome.record.company, "");
    assert_eq!(outcome.record.job_title, "");
}

#[tokio::test]
async fn test_text_and_parts_payloads_give_same_feedback() {
    let text = harness(FakeDocuments::default(), true, text_answer());
    let parts = harness(
        FakeDocuments::default(),
        true,
        Answer::Content(FeedbackContent::Parts(vec![ContentPart {
            text: FEEDBACK_JSON.to_string(),
        }])),
    );

    let a = text.pipeline.submit(request()).await.unwrap();
    let b = parts.pipeline.submit(request()).await.unwrap();

    assert_eq!(a.record.feedback, b.record.feedback);
    assert!(matches!(a.record.feedback, FeedbackSlot::Ready(_)));
}

#[tokio::test]
async fn test_fenced_payload_is_accepted() {
    let fenced = format!("```json\n{FEEDBACK_JSON}\n```");
    let h = harness(
        FakeDocuments::default(),
        true,
        Answer::Content(FeedbackContent::Text(fenced)),
    );

    let outcome = assert_ok!(h.pipeline.submit(request()).await);
    let feedback = outcome.record.feedback.as_ready().unwrap();
    assert_eq!(feedback.overall_score, 72);
}

// ── Failures before the record exists ────────────────────────────────────────

#[tokio::test]
async fn test_upload_failure_stops_everything() {
    let h = harness(FakeDocuments::failing_on(0), true, text_answer());

    let err = assert_err!(h.pipeline.submit(request()).await);

    assert!(matches!(err, SubmissionError::UploadFailed { .. }));
    assert_eq!(h.converter.calls.load(Ordering::SeqCst), 0);
    assert!(h.records.writes().await.is_empty());
    assert!(h.feedback.calls().is_empty());
    assert_eq!(h.reporter.last(), "Error: failed to upload the file");
    assert!(h.reporter.targets().is_empty());
}

#[tokio::test]
async fn test_upload_without_path_counts_as_failure() {
    let docs = FakeDocuments {
        empty_path: true,
        ..FakeDocuments::default()
    };
    let h = harness(docs, true, text_answer());

    let err = assert_err!(h.pipeline.submit(request()).await);

    assert_eq!(err.status(), Some(SubmissionStatus::Failed(FailureKind::Upload)));
    assert!(h.records.writes().await.is_empty());
    assert_eq!(h.reporter.last(), "Error: failed to upload the file");
}

#[tokio::test]
async fn test_conversion_failure_skips_image_upload() {
    let h = harness(FakeDocuments::default(), false, text_answer());

    let err = assert_err!(h.pipeline.submit(request()).await);

    match err {
        SubmissionError::ConversionFailed { reason } => assert!(reason.contains("not a PDF")),
        other => panic!("expected ConversionFailed, got {other:?}"),
    }
    assert_eq!(h.documents.uploaded(), vec!["resume.pdf"]);
    assert!(h.records.writes().await.is_empty());
    assert!(h.feedback.calls().is_empty());
    assert_eq!(h.reporter.last(), "Error: failed to convert PDF to image");
}

#[tokio::test]
async fn test_image_upload_failure_writes_nothing() {
    let h = harness(FakeDocuments::failing_on(1), true, text_answer());

    let err = assert_err!(h.pipeline.submit(request()).await);

    assert!(matches!(err, SubmissionError::ImageUploadFailed { .. }));
    assert!(h.records.writes().await.is_empty());
    assert!(h.feedback.calls().is_empty());
    assert_eq!(h.reporter.last(), "Error: failed to upload the image");
}

#[tokio::test]
async fn test_record_write_failure_skips_analysis() {
    let feedback = Arc::new(FakeFeedback::new(text_answer()));
    let reporter = Arc::new(Recorder::default());
    let pipeline = Pipeline::builder()
        .documents(Arc::new(FakeDocuments::default()))
        .converter(Arc::new(FakeConverter::new(true)))
        .records(Arc::new(BrokenKv))
        .feedback_client(feedback.clone())
        .config(
            PipelineConfig::builder()
                .status_reporter(reporter.clone())
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    let err = assert_err!(pipeline.submit(request()).await);

    assert!(matches!(err, SubmissionError::RecordWriteFailed { .. }));
    assert_eq!(err.record_id(), None);
    assert!(feedback.calls().is_empty());
    assert_eq!(
        reporter.last(),
        "Error: failed to save the submission record"
    );
}

// ── Failures after the placeholder ───────────────────────────────────────────

#[tokio::test]
async fn test_analysis_failure_keeps_placeholder() {
    let h = harness(FakeDocuments::default(), true, Answer::Fail("503 overloaded"));

    let err = assert_err!(h.pipeline.submit(request()).await);

    assert_eq!(err.record_id(), Some("abc"));
    assert!(err.to_string().contains("503 overloaded"));

    let writes = h.records.writes().await;
    assert_eq!(writes.len(), 1);
    assert_eq!(stored(&writes[0].1).feedback, FeedbackSlot::Pending);
    assert_eq!(h.reporter.last(), "Error: failed to analyze resume");
    assert!(h.reporter.targets().is_empty());

    let record = h.pipeline.load_record("abc").await.unwrap().unwrap();
    assert_eq!(record.state(), RecordState::Processing);
}

#[tokio::test]
async fn test_feedback_write_failure_keeps_placeholder() {
    let records = Arc::new(FlakyKv::failing_on(1));
    let (pipeline, reporter) = pipeline_over(
        Arc::new(FakeConverter::new(true)),
        records.clone(),
        PipelineConfig::builder(),
    );

    let err = assert_err!(pipeline.submit(request()).await);

    assert!(matches!(err, SubmissionError::RecordWriteFailed { .. }));
    assert_eq!(err.record_id(), Some("abc"));
    let writes = records.inner.writes().await;
    assert_eq!(writes.len(), 1);
    assert_eq!(stored(&writes[0].1).feedback, FeedbackSlot::Pending);
    assert_eq!(reporter.last(), "Error: failed to save the submission record");
    assert!(reporter.targets().is_empty());

    let record = pipeline.load_record("abc").await.unwrap().unwrap();
    assert_eq!(record.state(), RecordState::Processing);
}

#[tokio::test]
async fn test_unparseable_feedback_keeps_placeholder() {
    let h = harness(
        FakeDocuments::default(),
        true,
        Answer::Content(FeedbackContent::Text("I cannot review this file.".into())),
    );

    let err = assert_err!(h.pipeline.submit(request()).await);

    assert!(matches!(err, SubmissionError::ParseFailed { .. }));
    assert_eq!(h.records.writes().await.len(), 1);
    assert_eq!(h.reporter.last(), "Error: failed to read the analysis feedback");
}

#[tokio::test]
async fn test_empty_parts_payload_is_parse_failure() {
    let h = harness(
        FakeDocuments::default(),
        true,
        Answer::Content(FeedbackContent::Parts(vec![])),
    );

    let err = assert_err!(h.pipeline.submit(request()).await);

    assert_eq!(err.status(), Some(SubmissionStatus::Failed(FailureKind::Parse)));
    assert_eq!(h.records.writes().await.len(), 1);
}

// ── Cancellation and timeouts ────────────────────────────────────────────────

#[tokio::test]
async fn test_cancel_before_start_touches_nothing() {
    let h = harness(FakeDocuments::default(), true, text_answer());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = assert_err!(h.pipeline.submit_with_cancel(request(), &cancel).await);

    assert!(matches!(err, SubmissionError::Cancelled { stage: Stage::Upload, .. }));
    assert_eq!(err.record_id(), None);
    assert!(h.documents.uploaded().is_empty());
    assert_eq!(h.reporter.last(), "Submission cancelled");
}

#[tokio::test]
async fn test_cancel_during_analysis() {
    let cancel = CancellationToken::new();
    let h = harness(
        FakeDocuments::default(),
        true,
        Answer::CancelAndHang(cancel.clone()),
    );

    let err = assert_err!(h.pipeline.submit_with_cancel(request(), &cancel).await);

    assert!(matches!(err, SubmissionError::Cancelled { stage: Stage::Analyze, .. }));
    assert_eq!(err.status(), Some(SubmissionStatus::Cancelled));
    assert_eq!(err.record_id(), Some("abc"));
    // The placeholder written before the call stays; nothing is rolled back.
    assert_eq!(h.records.writes().await.len(), 1);
    assert_eq!(h.reporter.last(), "Submission cancelled");
}

#[tokio::test(start_paused = true)]
async fn test_analysis_timeout_is_analysis_failure() {
    let h = harness_with(
        FakeDocuments::default(),
        true,
        Answer::Hang,
        PipelineConfig::builder().analysis_timeout_secs(5),
    );

    let err = assert_err!(h.pipeline.submit(request()).await);

    match &err {
        SubmissionError::AnalysisFailed { record_id, reason } => {
            assert_eq!(record_id, "abc");
            assert!(reason.contains("5s"), "got: {reason}");
        }
        other => panic!("expected AnalysisFailed, got {other:?}"),
    }
    assert_eq!(h.records.writes().await.len(), 1);
    assert_eq!(h.reporter.last(), "Error: failed to analyze resume");
}

#[tokio::test(start_paused = true)]
async fn test_upload_timeout_is_upload_failure() {
    let docs = FakeDocuments {
        hang: true,
        ..FakeDocuments::default()
    };
    let h = harness_with(
        docs,
        true,
        text_answer(),
        PipelineConfig::builder().upload_timeout_secs(5),
    );

    let err = assert_err!(h.pipeline.submit(request()).await);

    assert!(matches!(
        err,
        SubmissionError::TimedOut {
            stage: Stage::Upload,
            secs: 5,
            ..
        }
    ));
    assert_eq!(h.converter.calls.load(Ordering::SeqCst), 0);
    assert!(h.records.writes().await.is_empty());
    assert_eq!(h.reporter.last(), "Error: failed to upload the file");
}

#[tokio::test(start_paused = true)]
async fn test_conversion_timeout_is_conversion_failure() {
    let records = Arc::new(MemoryKvStore::new());
    let (pipeline, reporter) = pipeline_over(
        Arc::new(FakeConverter::hanging()),
        records.clone(),
        PipelineConfig::builder().convert_timeout_secs(5),
    );

    let err = assert_err!(pipeline.submit(request()).await);

    assert!(matches!(
        err,
        SubmissionError::TimedOut {
            stage: Stage::ConvertImage,
            ..
        }
    ));
    assert_eq!(err.record_id(), None);
    assert!(records.writes().await.is_empty());
    assert_eq!(reporter.last(), "Error: failed to convert PDF to image");
}

// ── Sharing ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_concurrent_submissions_get_distinct_records() {
    let records = Arc::new(MemoryKvStore::new());
    let pipeline = Arc::new(
        Pipeline::builder()
            .documents(Arc::new(FakeDocuments::default()))
            .converter(Arc::new(FakeConverter::new(true)))
            .records(records.clone())
            .feedback_client(Arc::new(FakeFeedback::new(text_answer())))
            .build()
            .unwrap(),
    );

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move { pipeline.submit(request()).await })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().record.id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);
    assert_eq!(records.writes().await.len(), 8);

    for id in &ids {
        let record = pipeline.load_record(id).await.unwrap().unwrap();
        assert_eq!(record.state(), RecordState::Complete);
    }
}
