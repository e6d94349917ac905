//! Configuration for the submission pipeline and its bundled collaborators.
//!
//! All knobs live in [`PipelineConfig`], built via [`PipelineConfigBuilder`].
//! The same struct feeds the orchestrator (stage timeouts, status reporter)
//! and the default collaborators (render size, LLM model and sampling), so
//! one value describes a whole deployment.

use crate::error::SubmissionError;
use crate::progress::SharedStatusReporter;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for résumé submissions.
///
/// # Example
/// ```rust
/// use resume_review::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .analysis_timeout_secs(180)
///     .model("gpt-4.1-mini")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Timeout for each document-store upload. Default: 60.
    pub upload_timeout_secs: u64,

    /// Timeout for rendering the résumé to an image. Default: 60.
    pub convert_timeout_secs: u64,

    /// Timeout for the feedback call. Default: 120.
    ///
    /// Vision models reading two dense pages routinely take 20–40 s; the
    /// default leaves room for a slow provider without hanging forever.
    pub analysis_timeout_secs: u64,

    /// Timeout for each record write. Default: 30.
    pub record_timeout_secs: u64,

    /// Width of a rendered page in pixels; its height is capped at the same
    /// value. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Pages sent to the vision model. Default: 2.
    ///
    /// Résumés rarely exceed two pages; anything beyond that costs tokens
    /// without changing the verdict.
    pub max_analysis_pages: usize,

    /// LLM model identifier. If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 4096.
    pub max_tokens: usize,

    /// Custom system prompt. If None, uses [`crate::prompts::FEEDBACK_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Path to a pdfium shared library. If None, `PDFIUM_LIB_PATH` or the
    /// system library is used.
    pub pdfium_library: Option<PathBuf>,

    /// Receives every status label. If None, statuses are dropped.
    pub status_reporter: Option<SharedStatusReporter>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            upload_timeout_secs: 60,
            convert_timeout_secs: 60,
            analysis_timeout_secs: 120,
            record_timeout_secs: 30,
            max_rendered_pixels: 2000,
            max_analysis_pages: 2,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.2,
            max_tokens: 4096,
            system_prompt: None,
            pdfium_library: None,
            status_reporter: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("upload_timeout_secs", &self.upload_timeout_secs)
            .field("convert_timeout_secs", &self.convert_timeout_secs)
            .field("analysis_timeout_secs", &self.analysis_timeout_secs)
            .field("record_timeout_secs", &self.record_timeout_secs)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("max_analysis_pages", &self.max_analysis_pages)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("pdfium_library", &self.pdfium_library)
            .field(
                "status_reporter",
                &self.status_reporter.as_ref().map(|_| "<dyn StatusReporter>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    pub(crate) fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub(crate) fn convert_timeout(&self) -> Duration {
        Duration::from_secs(self.convert_timeout_secs)
    }

    pub(crate) fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }

    pub(crate) fn record_timeout(&self) -> Duration {
        Duration::from_secs(self.record_timeout_secs)
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn upload_timeout_secs(mut self, secs: u64) -> Self {
        self.config.upload_timeout_secs = secs;
        self
    }

    pub fn convert_timeout_secs(mut self, secs: u64) -> Self {
        self.config.convert_timeout_secs = secs;
        self
    }

    pub fn analysis_timeout_secs(mut self, secs: u64) -> Self {
        self.config.analysis_timeout_secs = secs;
        self
    }

    pub fn record_timeout_secs(mut self, secs: u64) -> Self {
        self.config.record_timeout_secs = secs;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn max_analysis_pages(mut self, n: usize) -> Self {
        self.config.max_analysis_pages = n.max(1);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    pub fn status_reporter(mut self, reporter: SharedStatusReporter) -> Self {
        self.config.status_reporter = Some(reporter);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, SubmissionError> {
        let c = &self.config;
        let timeouts = [
            ("upload", c.upload_timeout_secs),
            ("convert", c.convert_timeout_secs),
            ("analysis", c.analysis_timeout_secs),
            ("record", c.record_timeout_secs),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, secs)| *secs == 0) {
            return Err(SubmissionError::InvalidConfig(format!(
                "{name} timeout must be ≥ 1 second"
            )));
        }
        if c.max_tokens < 256 {
            return Err(SubmissionError::InvalidConfig(format!(
                "max_tokens must be ≥ 256 to fit a feedback object, got {}",
                c.max_tokens
            )));
        }
        Ok(self.config)
    }
}
