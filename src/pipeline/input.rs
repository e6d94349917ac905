//! Input loading: read a local résumé file into a [`Blob`].
//!
//! No content validation happens here. Whether the file is a readable
//! document is decided by the converter; a bad file surfaces as a
//! conversion failure, not an input error.

use crate::backend::Blob;
use crate::error::BackendError;
use std::path::Path;
use tracing::debug;

/// Read `path` into memory, naming the blob after the file.
pub async fn load_document(path: impl AsRef<Path>) -> Result<Blob, BackendError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| BackendError::from_io(path, e))?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "resume".to_string());
    let mime_type = guess_mime(&name);

    debug!("Loaded {} ({} bytes, {})", path.display(), bytes.len(), mime_type);
    Ok(Blob::new(name, mime_type, bytes))
}

/// MIME type from the file extension.
pub fn guess_mime(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}
