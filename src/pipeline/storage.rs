//! Local storage backends.
//!
//! * [`LocalDocumentStore`] keeps uploaded blobs under a root directory.
//! * [`FileKvStore`] keeps one JSON file per record key.
//! * [`MemoryKvStore`] keeps records in memory and remembers every write.
//!
//! These back the CLI and the tests. A deployment talking to a bucket or a
//! hosted key-value service implements the same traits.

use crate::backend::{Blob, DocumentStore, KeyValueStore, StoredFile};
use crate::error::BackendError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

// ── Documents ────────────────────────────────────────────────────────────

/// Blob store rooted at a directory.
///
/// Each upload lands in its own `<root>/<uuid>/` folder so two résumés with
/// the same file name never collide. The returned reference is
/// `/<uuid>/<name>`.
#[derive(Debug, Clone)]
pub struct LocalDocumentStore {
    root: PathBuf,
}

impl LocalDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a stored reference back to a path under the root.
    fn resolve(&self, reference: &str) -> Result<PathBuf, BackendError> {
        let relative = Path::new(reference.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if reference.is_empty() || escapes {
            return Err(BackendError::InvalidPath {
                reference: reference.to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

/// Keep only the final path segment of a client-supplied file name.
fn sanitise_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("").trim();
    match base {
        "" | "." | ".." => "file".to_string(),
        other => other.to_string(),
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn upload(&self, blob: &Blob) -> Result<StoredFile, BackendError> {
        let folder = Uuid::new_v4().to_string();
        let name = sanitise_name(&blob.name);
        let dir = self.root.join(&folder);

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| BackendError::from_io(&dir, e))?;

        let path = dir.join(&name);
        tokio::fs::write(&path, &blob.bytes)
            .await
            .map_err(|e| BackendError::from_io(&path, e))?;

        debug!("Stored {} bytes at {}", blob.len(), path.display());
        Ok(StoredFile {
            path: format!("/{folder}/{name}"),
            name,
            size: blob.len() as u64,
        })
    }

    async fn read(&self, reference: &str) -> Result<Vec<u8>, BackendError> {
        let path = self.resolve(reference)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| BackendError::from_io(&path, e))
    }
}

// ── Records ──────────────────────────────────────────────────────────────

/// One file per key under a directory, written atomically.
///
/// Keys are percent-encoded into file names, so `resume:abc` is stored as
/// `resume%3Aabc.json` and distinct keys never share a file.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    dir: PathBuf,
}

impl FileKvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", urlencoding::encode(key)))
    }
}

#[async_trait]
impl KeyValueStore for FileKvStore {
    async fn set(&self, key: &str, value: String) -> Result<(), BackendError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| BackendError::from_io(&self.dir, e))?;

        // Write to a sibling temp file, then rename over the target.
        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, value.as_bytes())
            .await
            .map_err(|e| BackendError::from_io(&tmp_path, e))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| BackendError::from_io(&path, e))?;

        debug!("Wrote record {} → {}", key, path.display());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BackendError::from_io(&path, e)),
        }
    }
}

/// In-memory record store that also keeps the full write history.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    entries: HashMap<String, String>,
    writes: Vec<(String, String)>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(key, value)` passed to `set`, oldest first.
    pub async fn writes(&self) -> Vec<(String, String)> {
        self.inner.lock().await.writes.clone()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn set(&self, key: &str, value: String) -> Result<(), BackendError> {
        let mut inner = self.inner.lock().await;
        inner.writes.push((key.to_string(), value.clone()));
        inner.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        Ok(self.inner.lock().await.entries.get(key).cloned())
    }
}
