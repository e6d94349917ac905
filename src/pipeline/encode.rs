//! Image encoding: `DynamicImage` → PNG bytes, and PNG bytes → `ImageData`.
//!
//! PNG is lossless; text crispness matters more than file size both for the
//! stored preview and for what the vision model can read.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rendered page as PNG bytes.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!("Encoded {}x{} page → {} bytes PNG", img.width(), img.height(), buf.len());
    Ok(buf)
}

/// Wrap PNG bytes as a base64 image attachment for the vision API.
///
/// `detail: "high"` keeps small print legible; the low-detail mode collapses
/// a page to a single 512 px tile.
pub fn to_image_data(png: &[u8]) -> ImageData {
    let b64 = STANDARD.encode(png);
    ImageData::new(b64, "image/png").with_detail("high")
}
