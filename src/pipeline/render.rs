//! PDF rasterisation via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and is CPU-bound while rendering. All pdfium work runs on the
//! blocking pool so Tokio worker threads never stall on a dense page.
//!
//! ## Pixels, not DPI
//!
//! Page sizes vary (Letter, A4, the occasional poster-sized export).
//! Every page is rendered `max_rendered_pixels` wide, scaling small pages up
//! and large ones down, and its height is capped at the same value so tall
//! pages shrink to fit. Both edges stay within the limit regardless of
//! physical size.

use crate::backend::{Blob, ImageConversion, ImageConverter};
use crate::config::PipelineConfig;
use crate::error::BackendError;
use crate::pipeline::encode;
use async_trait::async_trait;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming a pdfium shared library to bind.
pub const PDFIUM_LIB_ENV: &str = "PDFIUM_LIB_PATH";

/// Renders the first page of a PDF résumé to a PNG preview.
#[derive(Debug, Clone)]
pub struct PdfiumConverter {
    library: Option<PathBuf>,
    max_rendered_pixels: u32,
}

impl PdfiumConverter {
    pub fn new(library: Option<PathBuf>, max_rendered_pixels: u32) -> Self {
        Self {
            library,
            max_rendered_pixels,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.pdfium_library.clone(), config.max_rendered_pixels)
    }

    /// Rasterise up to `max_pages` pages from the start of the document.
    pub async fn render_pages(
        &self,
        bytes: Vec<u8>,
        max_pages: usize,
    ) -> Result<Vec<DynamicImage>, BackendError> {
        let library = self.library.clone();
        let max_pixels = self.max_rendered_pixels;

        tokio::task::spawn_blocking(move || {
            render_pages_blocking(library.as_deref(), bytes, max_pixels, max_pages)
        })
        .await
        .map_err(|e| BackendError::Render(format!("render task panicked: {e}")))?
    }
}

#[async_trait]
impl ImageConverter for PdfiumConverter {
    async fn convert(&self, document: &Blob) -> ImageConversion {
        let pages = match self.render_pages(document.bytes.clone(), 1).await {
            Ok(pages) => pages,
            Err(e) => {
                warn!("Could not render '{}': {}", document.name, e);
                return ImageConversion::failed(e.to_string());
            }
        };

        let Some(first) = pages.first() else {
            return ImageConversion::failed("document has no pages");
        };

        match encode::encode_png(first) {
            Ok(png) => {
                let name = format!("{}.png", document.stem());
                debug!("Preview '{}' is {} bytes", name, png.len());
                ImageConversion::rendered(Blob::new(name, "image/png", png))
            }
            Err(e) => ImageConversion::failed(format!("PNG encoding failed: {e}")),
        }
    }
}

/// Bind pdfium: explicit path, then `PDFIUM_LIB_PATH`, then the system library.
fn bind_pdfium(library: Option<&Path>) -> Result<Pdfium, BackendError> {
    let env_path = std::env::var_os(PDFIUM_LIB_ENV).map(PathBuf::from);
    let bindings = match library.map(Path::to_path_buf).or(env_path) {
        Some(path) => {
            debug!("Binding pdfium from {}", path.display());
            Pdfium::bind_to_library(&path)
        }
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| BackendError::Render(format!("pdfium library unavailable: {e:?}")))?;
    Ok(Pdfium::new(bindings))
}

fn render_pages_blocking(
    library: Option<&Path>,
    bytes: Vec<u8>,
    max_pixels: u32,
    max_pages: usize,
) -> Result<Vec<DynamicImage>, BackendError> {
    let pdfium = bind_pdfium(library)?;

    let document = pdfium
        .load_pdf_from_byte_vec(bytes, None)
        .map_err(|e| BackendError::Render(format!("not a readable PDF: {e:?}")))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let count = total_pages.min(max_pages);
    let mut results = Vec::with_capacity(count);

    for idx in 0..count {
        let page = pages
            .get(idx as u16)
            .map_err(|e| BackendError::Render(format!("page {}: {e:?}", idx + 1)))?;

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| BackendError::Render(format!("page {}: {e:?}", idx + 1)))?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        results.push(image);
    }

    Ok(results)
}
