//! OCR of images through a vision-language model.

use std::fmt;
use std::str::FromStr;

use serde_json::{json, Value};
use tracing::info;

use super::image::{user_message, ImageInput};
use super::parse::{normalize_fill_zones, normalize_regions, parse_bbox_response, strip_html};
use super::{InferenceClient, InferenceError};

const FILL_ZONE_RULE: &str = "Ignore dotted lines. Only transcribe actual alphanumeric text.";

const PROMPT_TEXT: &str = "Extract all the alphanumeric text from this image. \
Return plain text only, preserving the reading order. \
Ignore dotted lines. Only transcribe actual alphanumeric text. \
Do NOT use HTML tags, XML, or any markup: plain text only. \
Do not describe the image, just return the extracted text.";

const PROMPT_HTML: &str = "Extract all the alphanumeric text from this image and return it as clean HTML. \
Use semantic tags: <h1> to <h4> for headings, <p> for paragraphs, \
<table>/<tr>/<th>/<td> for tables, <ul>/<li> for lists. \
Preserve reading order and document structure. \
Return ONLY the HTML body content, no <html>/<head>/<body> wrapper. ";

const PROMPT_BBOX: &str = "Perform OCR on this image. Return a JSON array where each element corresponds \
to one visually distinct text chunk: a group of characters that are close \
together and separated from neighbouring text by a visible gap. \
A single visual line may contain several independent chunks (e.g. a label on \
the left and a value on the right of the same row); each must be its own entry. \
Never merge text from different chunks into one entry, and never split a \
continuous block of characters into multiple entries. ";

const PROMPT_BBOX_FIELDS: &str = "\nEach element must have:\n\
  - \"text\": the extracted text of that chunk\n\
  - \"bbox\": [x, y, w, h] where x,y are the top-left corner coordinates and \
w,h are width and height, all as relative values between 0.0 and 1.0 \
(proportional to image dimensions)\n\n\
Return ONLY the JSON array, no explanation, no markdown fences.";

/// Output format of `pods ocr`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OcrFormat {
    /// Plain text.
    #[default]
    Text,
    /// HTML document.
    Html,
    /// JSON regions with relative bounding boxes.
    Json,
}

impl OcrFormat {
    /// Prompt sent with the image.
    #[must_use]
    pub fn prompt(self) -> String {
        match self {
            Self::Text => PROMPT_TEXT.to_string(),
            Self::Html => format!("{PROMPT_HTML}{FILL_ZONE_RULE}"),
            Self::Json => format!("{PROMPT_BBOX}{FILL_ZONE_RULE}{PROMPT_BBOX_FIELDS}"),
        }
    }
}

impl fmt::Display for OcrFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Html => write!(f, "html"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OcrFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "html" => Ok(Self::Html),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown format {other} (expected text, html or json)")),
        }
    }
}

/// Cleaned OCR result of one image.
#[derive(Debug, Clone, PartialEq)]
pub enum OcrResult {
    Text(String),
    Regions(Vec<Value>),
}

/// Turn a raw model reply into the requested format.
#[must_use]
pub fn postprocess(format: OcrFormat, raw: &str) -> OcrResult {
    match format {
        OcrFormat::Text => OcrResult::Text(normalize_fill_zones(&strip_html(raw))),
        OcrFormat::Html => OcrResult::Text(normalize_fill_zones(raw)),
        OcrFormat::Json => {
            let mut regions = parse_bbox_response(raw);
            normalize_regions(&mut regions);
            OcrResult::Regions(regions)
        }
    }
}

/// OCR one image.
///
/// # Errors
/// Returns any request error.
pub async fn ocr_image(
    client: &InferenceClient,
    image: &ImageInput,
    format: OcrFormat,
) -> Result<OcrResult, InferenceError> {
    info!(image = %image.label, format = %format, "running OCR");
    let messages = [user_message(&format.prompt(), image)];
    let completion = client
        .chat(&messages, client.settings().max_tokens)
        .await?;
    Ok(postprocess(format, &completion.text))
}

/// Assemble the final document from per-image results.
///
/// JSON output is a bare region array for a single image and a list of
/// `{"source", "regions"}` otherwise.
///
/// # Errors
/// Returns an error if JSON serialization fails.
pub fn render_results(
    format: OcrFormat,
    results: Vec<(String, OcrResult)>,
) -> Result<String, InferenceError> {
    let texts = |results: Vec<(String, OcrResult)>| -> Vec<String> {
        results
            .into_iter()
            .map(|(_, r)| match r {
                OcrResult::Text(t) => t,
                OcrResult::Regions(v) => Value::Array(v).to_string(),
            })
            .collect()
    };

    match format {
        OcrFormat::Json => {
            let mut pages: Vec<Value> = results
                .into_iter()
                .map(|(source, r)| {
                    let regions = match r {
                        OcrResult::Regions(v) => v,
                        OcrResult::Text(t) => vec![json!({ "text": t, "bbox": null })],
                    };
                    json!({ "source": source, "regions": regions })
                })
                .collect();
            let doc = if pages.len() == 1 {
                let mut only = pages.remove(0);
                only["regions"].take()
            } else {
                Value::Array(pages)
            };
            Ok(serde_json::to_string_pretty(&doc)?)
        }
        OcrFormat::Html => {
            let body = texts(results).join("\n\n");
            Ok(format!(
                "<!DOCTYPE html>\n<html>\n<head><meta charset=\"UTF-8\"></head>\n<body>\n{body}\n</body>\n</html>"
            ))
        }
        OcrFormat::Text => Ok(texts(results).join("\n\n")),
    }
}
