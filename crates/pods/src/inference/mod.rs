//! Client for the OpenAI-compatible API served by a running pod.
//!
//! Requests always stream: the provider proxy cuts idle connections after
//! about 100 seconds, and long OCR pages take longer than that to generate.

pub mod ask;
pub mod image;
pub mod ocr;
pub mod parse;
pub mod pdf;

use std::time::Duration;

use futures::StreamExt;
use pod_config::profile::{InferenceSettings, ModelProfile};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::runpod::service_urls;

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Errors raised by the inference client and its commands.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("inference API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported input {0}: PDF files are only accepted by `ocr`")]
    UnsupportedInput(String),

    #[error("invalid page selection {0:?}: expected forms like 3, 1-5 or 2,4,7-9")]
    InvalidPages(String),

    #[error("failed to rasterize {path}: {message}")]
    Rasterize { path: String, message: String },

    #[error("no questions given (pass them as arguments or with --questions-file)")]
    NoQuestions,

    #[error("stream ended without a [DONE] marker")]
    Truncated,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One server-sent event of a streaming completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Payload of a `data:` line.
    Data(String),
    /// The `[DONE]` terminator.
    Done,
}

/// Splits a byte stream into `data:` events.
///
/// Bytes are buffered until a full line arrives, so multi-byte characters
/// split across network chunks decode correctly.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every event it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buf.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();
            if data == "[DONE]" {
                events.push(SseEvent::Done);
            } else if !data.is_empty() {
                events.push(SseEvent::Data(data.to_string()));
            }
        }
        events
    }
}

/// Result of one chat completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub finish_reason: Option<String>,
}

impl Completion {
    /// Whether generation stopped at the token limit.
    #[must_use]
    pub fn truncated(&self) -> bool {
        self.finish_reason.as_deref() == Some("length")
    }

    /// Apply one streamed chunk. Returns the content delta, if any.
    fn apply(&mut self, chunk: &Value) -> Option<String> {
        let choice = chunk.get("choices")?.get(0)?;
        if let Some(reason) = choice.get("finish_reason").and_then(Value::as_str) {
            self.finish_reason = Some(reason.to_string());
        }
        let delta = choice
            .get("delta")
            .and_then(|d| d.get("content"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())?;
        self.text.push_str(delta);
        Some(delta.to_string())
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Value],
    temperature: f32,
    max_tokens: u32,
    repetition_penalty: f32,
    stream: bool,
}

/// Streaming chat client bound to one served model.
#[derive(Clone)]
pub struct InferenceClient {
    client: Client,
    base_url: String,
    model: String,
    settings: InferenceSettings,
}

impl InferenceClient {
    /// Client for `profile` served by pod `pod_id` through the proxy.
    ///
    /// # Errors
    /// Returns error if HTTP client cannot be created.
    pub fn for_pod(profile: &ModelProfile, pod_id: &str) -> Result<Self, InferenceError> {
        Self::with_base_url(
            service_urls(pod_id).api,
            profile.served_model_name,
            profile.inference.clone(),
        )
    }

    /// Client against an explicit API base (ending in `/v1`).
    ///
    /// # Errors
    /// Returns error if HTTP client cannot be created.
    pub fn with_base_url(
        base_url: impl Into<String>,
        model: impl Into<String>,
        settings: InferenceSettings,
    ) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            settings,
        })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn settings(&self) -> &InferenceSettings {
        &self.settings
    }

    /// Run a streaming chat completion and collect the reply.
    ///
    /// # Errors
    /// Returns an error on transport failure, a non-success status, or a
    /// stream that ends without `[DONE]`.
    pub async fn chat(
        &self,
        messages: &[Value],
        max_tokens: u32,
    ) -> Result<Completion, InferenceError> {
        self.chat_with(messages, max_tokens, |_| {}).await
    }

    /// Like [`chat`](Self::chat), calling `on_delta` for every content chunk.
    ///
    /// # Errors
    /// See [`chat`](Self::chat).
    pub async fn chat_with<F>(
        &self,
        messages: &[Value],
        max_tokens: u32,
        mut on_delta: F,
    ) -> Result<Completion, InferenceError>
    where
        F: FnMut(&str) + Send,
    {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: 0.0,
            max_tokens,
            repetition_penalty: self.settings.repetition_penalty,
            stream: true,
        };
        debug!(url = %url, model = %self.model, max_tokens, "chat completion request");

        let resp = self.client.post(&url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(InferenceError::Api {
                status: status.as_u16(),
                message: crate::runpod::pretty_body(&message),
            });
        }

        let mut completion = Completion::default();
        let mut decoder = SseDecoder::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            for event in decoder.push(&chunk?) {
                match event {
                    SseEvent::Done => {
                        if completion.truncated() {
                            warn!(
                                max_tokens,
                                "reply hit the token limit and is truncated"
                            );
                        }
                        debug!(chars = completion.text.len(), "chat completion done");
                        return Ok(completion);
                    }
                    SseEvent::Data(data) => match serde_json::from_str::<Value>(&data) {
                        Ok(chunk) => {
                            if let Some(delta) = completion.apply(&chunk) {
                                on_delta(&delta);
                            }
                        }
                        Err(e) => debug!(error = %e, "skipping malformed stream chunk"),
                    },
                }
            }
        }
        Err(InferenceError::Truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sse_decoder_handles_split_lines() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"a\"").is_empty());
        let events = decoder.push(b":1}\n\n: keep-alive\ndata: [DONE]\n");
        assert_eq!(
            events,
            vec![SseEvent::Data("{\"a\":1}".into()), SseEvent::Done]
        );
    }

    #[test]
    fn test_sse_decoder_keeps_split_utf8() {
        let mut decoder = SseDecoder::new();
        let line = "data: été\n".as_bytes();
        // Split inside the two-byte 'é'.
        assert!(decoder.push(&line[..7]).is_empty());
        assert_eq!(decoder.push(&line[7..]), vec![SseEvent::Data("été".into())]);
    }

    #[test]
    fn test_completion_apply() {
        let mut c = Completion::default();
        assert_eq!(
            c.apply(&json!({"choices":[{"delta":{"content":"Hel"}}]})),
            Some("Hel".to_string())
        );
        c.apply(&json!({"choices":[{"delta":{"content":"lo"},"finish_reason":null}]}));
        assert_eq!(c.apply(&json!({"choices":[{"delta":{},"finish_reason":"length"}]})), None);
        assert_eq!(c.text, "Hello");
        assert!(c.truncated());
        assert_eq!(c.apply(&json!({"choices":[]})), None);
    }
}
