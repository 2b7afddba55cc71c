//! # Byte-Level Dimension Decoding
//!
//! Resolves an image source to raw bytes and reads the natural
//! dimensions without a full pixel decode. JPEG and PNG dimensions come
//! straight from the header; nothing is re-encoded.
//!
//! Supported source strings:
//! - `data:image/...;base64,...` — data URI
//! - File path (absolute or relative) — reads from disk
//! - Raw base64-encoded image data

use std::io::Cursor;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};

use crate::error::ProbeError;
use crate::model::{Dimension, GalleryImage};
use crate::probe::ProbeSource;
use crate::source::Transport;

/// Resolve a source string to raw image bytes.
fn read_source_bytes(src: &str) -> Result<Vec<u8>, ProbeError> {
    // Data URI: data:image/png;base64,iVBOR...
    if src.starts_with("data:image/") {
        let comma_pos = src.find(',').ok_or_else(|| {
            ProbeError::UnsupportedSource("invalid data URI: missing comma".to_string())
        })?;
        return base64_decode(&src[comma_pos + 1..]);
    }

    // File path — try reading from disk (not available in WASM).
    // Only match explicit path prefixes to avoid treating base64 strings
    // (which contain '/') as file paths.
    if src.starts_with('/') || src.starts_with("./") || src.starts_with("../") {
        #[cfg(not(target_arch = "wasm32"))]
        {
            return std::fs::read(src)
                .map_err(|e| ProbeError::Decode(format!("failed to read '{}': {}", src, e)));
        }
        #[cfg(target_arch = "wasm32")]
        {
            return Err(ProbeError::UnsupportedSource(format!(
                "file path images not supported in WASM: '{}'",
                src
            )));
        }
    }

    // Try raw base64
    base64_decode(src)
}

fn base64_decode(input: &str) -> Result<Vec<u8>, ProbeError> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(input)
        .map_err(|e| ProbeError::UnsupportedSource(format!("base64 decode error: {}", e)))
}

/// Read natural dimensions from encoded image bytes.
///
/// Format is detected from magic bytes first, so arbitrary garbage gets
/// a clear error instead of a guessed-format decode attempt.
pub fn decode_dimensions(data: &[u8]) -> Result<Dimension, ProbeError> {
    if data.len() < 4 {
        return Err(ProbeError::Decode("image data too short".to_string()));
    }
    if !is_jpeg(data) && !is_png(data) && !is_webp(data) {
        return Err(ProbeError::Decode(
            "unsupported image format (expected JPEG, PNG, or WebP)".to_string(),
        ));
    }

    let reader = image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ProbeError::Decode(format!("format detection error: {}", e)))?;

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| ProbeError::Decode(format!("failed to read dimensions: {}", e)))?;

    if width == 0 || height == 0 {
        return Err(ProbeError::Decode("zero-sized image".to_string()));
    }
    Ok(Dimension::new(width as f64, height as f64))
}

fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}

fn is_png(data: &[u8]) -> bool {
    data.len() >= 4 && data[0] == 0x89 && data[1] == 0x50 && data[2] == 0x4E && data[3] == 0x47
}

fn is_webp(data: &[u8]) -> bool {
    data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP"
}

/// Probe source for galleries whose `download_url` fields are data
/// URIs, raw base64 payloads, or file paths. No network involved.
#[derive(Default)]
pub struct InlineProbe;

impl ProbeSource for InlineProbe {
    fn probe<'a>(
        &'a self,
        image: &'a GalleryImage,
    ) -> LocalBoxFuture<'a, Result<Dimension, ProbeError>> {
        let result = read_source_bytes(&image.download_url).and_then(|bytes| decode_dimensions(&bytes));
        futures::future::ready(result).boxed_local()
    }
}

/// Probe source that fetches asset bytes over a [`Transport`] and
/// decodes the header. This is the "off-screen decode" for remote
/// galleries.
pub struct BytesProbe {
    transport: Rc<dyn Transport>,
}

impl BytesProbe {
    pub fn new(transport: Rc<dyn Transport>) -> Self {
        Self { transport }
    }
}

impl ProbeSource for BytesProbe {
    fn probe<'a>(
        &'a self,
        image: &'a GalleryImage,
    ) -> LocalBoxFuture<'a, Result<Dimension, ProbeError>> {
        async move {
            let bytes = self.transport.get(&image.download_url).await?;
            decode_dimensions(&bytes)
        }
        .boxed_local()
    }
}
