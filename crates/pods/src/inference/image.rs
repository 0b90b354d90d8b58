//! Image inputs sent inline as data URLs.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Value};

use super::pdf::is_pdf;
use super::InferenceError;

/// MIME type for an image path, by extension. Unknown extensions are sent as
/// JPEG and left to the server to sniff.
#[must_use]
pub fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("tif" | "tiff") => "image/tiff",
        _ => "image/jpeg",
    }
}

/// An image loaded into memory and base64-encoded.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Label used in output (file name).
    pub label: String,
    pub mime: &'static str,
    data: String,
}

impl ImageInput {
    /// Load and encode the image at `path`.
    ///
    /// # Errors
    /// Returns an error for PDF input (see [`super::pdf`]) or if the file
    /// cannot be read.
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        if is_pdf(path) {
            return Err(InferenceError::UnsupportedInput(path.display().to_string()));
        }

        let bytes = std::fs::read(path).map_err(|source| InferenceError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::from_bytes(
            path.file_name()
                .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned()),
            mime_for(path),
            &bytes,
        ))
    }

    #[must_use]
    pub fn from_bytes(label: impl Into<String>, mime: &'static str, bytes: &[u8]) -> Self {
        Self {
            label: label.into(),
            mime,
            data: STANDARD.encode(bytes),
        }
    }

    /// `data:<mime>;base64,<data>`
    #[must_use]
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.data)
    }

    /// Chat message content part carrying the image.
    #[must_use]
    pub fn content_part(&self) -> Value {
        json!({
            "type": "image_url",
            "image_url": { "url": self.data_url() },
        })
    }
}

/// A user message with a text prompt followed by the image.
#[must_use]
pub fn user_message(prompt: &str, image: &ImageInput) -> Value {
    json!({
        "role": "user",
        "content": [
            { "type": "text", "text": prompt },
            image.content_part(),
        ],
    })
}
