//! Vision-model feedback client built on `edgequake-llm`.
//!
//! The client reads the stored résumé back through the [`DocumentStore`],
//! renders its first pages, and sends them as image attachments together
//! with the job-specific instructions. All prompt wording lives in
//! [`crate::prompts`].
//!
//! ## Message layout
//!
//! 1. **System message**: [`FEEDBACK_SYSTEM_PROMPT`] or the configured override
//! 2. **User message**: the instructions text plus one PNG per rendered page
//!
//! There is no retry loop. A failed call is terminal for the submission.

use crate::backend::{DocumentStore, FeedbackClient, FeedbackResponse};
use crate::config::PipelineConfig;
use crate::error::BackendError;
use crate::pipeline::encode;
use crate::pipeline::render::PdfiumConverter;
use crate::prompts::FEEDBACK_SYSTEM_PROMPT;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Model used when a provider is named without one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// [`FeedbackClient`] that asks a vision LLM to review the rendered résumé.
pub struct LlmFeedbackClient {
    provider: Arc<dyn LLMProvider>,
    documents: Arc<dyn DocumentStore>,
    renderer: PdfiumConverter,
    max_pages: usize,
    system_prompt: String,
    options: CompletionOptions,
}

impl LlmFeedbackClient {
    /// Build a client around an already-resolved provider.
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        documents: Arc<dyn DocumentStore>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            provider,
            documents,
            renderer: PdfiumConverter::from_config(config),
            max_pages: config.max_analysis_pages,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| FEEDBACK_SYSTEM_PROMPT.to_string()),
            options: build_options(config),
        }
    }

    /// Build a client, resolving the provider from `config` and the environment.
    pub fn from_config(
        config: &PipelineConfig,
        documents: Arc<dyn DocumentStore>,
    ) -> Result<Self, BackendError> {
        let provider = resolve_provider(config)?;
        info!(
            "LLM provider resolved (provider={}, model={})",
            config.provider_name.as_deref().unwrap_or("auto"),
            config.model.as_deref().unwrap_or("default")
        );
        Ok(Self::new(provider, documents, config))
    }

    async fn page_images(&self, document_ref: &str) -> Result<Vec<ImageData>, BackendError> {
        let bytes = self.documents.read(document_ref).await?;
        let pages = self.renderer.render_pages(bytes, self.max_pages).await?;
        if pages.is_empty() {
            return Err(BackendError::Render("document has no pages".into()));
        }

        pages
            .iter()
            .map(|page| {
                encode::encode_png(page)
                    .map(|png| encode::to_image_data(&png))
                    .map_err(|e| BackendError::Render(format!("PNG encoding failed: {e}")))
            })
            .collect()
    }
}

#[async_trait]
impl FeedbackClient for LlmFeedbackClient {
    async fn analyze(
        &self,
        document_ref: &str,
        prompt: &str,
    ) -> Result<FeedbackResponse, BackendError> {
        let start = Instant::now();
        let images = self.page_images(document_ref).await?;
        debug!("Sending {} page image(s) for {}", images.len(), document_ref);

        let messages = vec![
            ChatMessage::system(&self.system_prompt),
            ChatMessage::user_with_images(prompt, images),
        ];

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| BackendError::Provider(e.to_string()))?;

        debug!(
            "{} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );
        Ok(FeedbackResponse::text(response.content))
    }
}

/// Build `CompletionOptions` from the pipeline config.
fn build_options(config: &PipelineConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, BackendError> {
    ProviderFactory::create_llm_provider(provider_name, model)
        .map_err(|e| BackendError::Provider(format!("{provider_name}: {e}")))
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider** (`config.provider_name`) with `config.model` or
///    [`DEFAULT_MODEL`]; the factory reads the matching API key.
/// 3. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, both
///    non-empty.
/// 4. **`OPENAI_API_KEY`** present: OpenAI with the configured model.
/// 5. **Auto-detection** via [`ProviderFactory::from_env`].
pub fn resolve_provider(config: &PipelineConfig) -> Result<Arc<dyn LLMProvider>, BackendError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) = ProviderFactory::from_env().map_err(|e| {
        BackendError::Provider(format!(
            "no LLM provider could be auto-detected; set OPENAI_API_KEY, \
             ANTHROPIC_API_KEY, or configure a provider ({e})"
        ))
    })?;

    Ok(llm_provider)
}
