//! Contracts the pipeline expects from its collaborators.
//!
//! The orchestrator in [`crate::submit`] only talks to these traits. The
//! crate ships one implementation of each under [`crate::pipeline`]
//! (local directory store, file-backed record store, pdfium renderer,
//! edgequake-llm feedback client); any of them can be swapped for a cloud
//! bucket, Redis, or a hosted converter without touching the orchestrator.

use crate::error::BackendError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque named byte blob: the uploaded résumé or its rendered image.
#[derive(Clone, PartialEq, Eq)]
pub struct Blob {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Blob {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// File name without its last extension.
    pub fn stem(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.name,
        }
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// What the document store hands back for an accepted upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    /// Stable reference used to read the blob back.
    pub path: String,
    pub name: String,
    pub size: u64,
}

/// Converter output. `image` is `None` when rendering failed.
#[derive(Debug, Clone, Default)]
pub struct ImageConversion {
    pub image: Option<Blob>,
    pub error: Option<String>,
}

impl ImageConversion {
    pub fn rendered(image: Blob) -> Self {
        Self {
            image: Some(image),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            image: None,
            error: Some(error.into()),
        }
    }
}

/// The content of a feedback response.
///
/// Providers return either a plain string or a list of content blocks whose
/// first element carries the text. Both shapes deserialise into this enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeedbackContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One block of a multi-part response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(default)]
    pub text: String,
}

/// A feedback client's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub content: FeedbackContent,
}

impl FeedbackResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: FeedbackContent::Text(text.into()),
        }
    }
}

/// Blob storage returning stable references.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn upload(&self, blob: &Blob) -> Result<StoredFile, BackendError>;

    /// Read back a blob previously returned by [`DocumentStore::upload`].
    async fn read(&self, path: &str) -> Result<Vec<u8>, BackendError>;
}

/// Renders a paginated document into a displayable image.
///
/// Infallible by signature: problems are reported inside
/// [`ImageConversion::error`] with `image` left empty.
#[async_trait]
pub trait ImageConverter: Send + Sync {
    async fn convert(&self, document: &Blob) -> ImageConversion;
}

/// String-keyed store of JSON records. `set` overwrites.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn set(&self, key: &str, value: String) -> Result<(), BackendError>;

    async fn get(&self, key: &str) -> Result<Option<String>, BackendError>;
}

/// AI service that reviews a stored document against a prompt.
#[async_trait]
pub trait FeedbackClient: Send + Sync {
    async fn analyze(
        &self,
        document_ref: &str,
        prompt: &str,
    ) -> Result<FeedbackResponse, BackendError>;
}
