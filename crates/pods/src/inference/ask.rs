//! Targeted questions about one image.

use std::path::Path;

use serde_json::{json, Map, Value};
use tracing::info;

use super::image::{user_message, ImageInput};
use super::parse::parse_answers;
use super::{InferenceClient, InferenceError};

/// Token limit for a batch of answers.
pub const BATCH_MAX_TOKENS: u32 = 1024;
/// Token limit for one conversational turn.
pub const TURN_MAX_TOKENS: u32 = 512;

const SYSTEM_PROMPT: &str = "You are a precise document analysis assistant. \
Answer each question using only information visible in the provided image. \
Be concise and exact: return only the extracted value, no explanation.";

fn system_message() -> Value {
    json!({ "role": "system", "content": SYSTEM_PROMPT })
}

/// Prompt asking for all `questions` at once as a numbered JSON object.
#[must_use]
pub fn build_batch_prompt(questions: &[String]) -> String {
    let mut lines = vec![
        "Answer the following questions about the image.".to_string(),
        "Return a JSON object with question numbers as keys (\"1\", \"2\", ...) \
         and the extracted answers as string values."
            .to_string(),
        "If the answer is not visible, use null.".to_string(),
        "Return ONLY the JSON object, no markdown fences.".to_string(),
        String::new(),
    ];
    lines.extend(
        questions
            .iter()
            .enumerate()
            .map(|(i, q)| format!("{}. {q}", i + 1)),
    );
    lines.join("\n")
}

/// Questions from a text file: one per line, blank lines and `#` comments skipped.
#[must_use]
pub fn parse_questions(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(ToString::to_string)
        .collect()
}

/// Read questions from `path`.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn read_questions_file(path: &Path) -> Result<Vec<String>, InferenceError> {
    let text = std::fs::read_to_string(path).map_err(|source| InferenceError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parse_questions(&text))
}

/// Pair each question with its answer: `{"1": {"question", "answer"}, ...}`.
///
/// If the model reply could not be parsed, its raw text is kept under
/// `"error"` and every answer is null.
#[must_use]
pub fn format_answers(questions: &[String], answers: &Value) -> Value {
    let mut out = Map::new();
    for (i, question) in questions.iter().enumerate() {
        let key = (i + 1).to_string();
        let answer = answers.get(&key).cloned().unwrap_or(Value::Null);
        out.insert(key, json!({ "question": question, "answer": answer }));
    }
    if let Some(error) = answers.get("error") {
        out.insert("error".to_string(), error.clone());
    }
    Value::Object(out)
}

/// Ask all `questions` about `image` in one request.
///
/// # Errors
/// Returns [`InferenceError::NoQuestions`] for an empty list, or any request
/// error.
pub async fn ask_batch(
    client: &InferenceClient,
    image: &ImageInput,
    questions: &[String],
) -> Result<Value, InferenceError> {
    if questions.is_empty() {
        return Err(InferenceError::NoQuestions);
    }
    info!(count = questions.len(), image = %image.label, "asking questions");

    let messages = [
        system_message(),
        user_message(&build_batch_prompt(questions), image),
    ];
    let completion = client.chat(&messages, BATCH_MAX_TOKENS).await?;
    Ok(format_answers(questions, &parse_answers(&completion.text)))
}

/// Multi-turn conversation about one image.
///
/// The image is sent with the first question only; later turns rely on the
/// server's prefix cache.
pub struct Conversation<'a> {
    client: &'a InferenceClient,
    image: &'a ImageInput,
    messages: Vec<Value>,
}

impl<'a> Conversation<'a> {
    #[must_use]
    pub fn new(client: &'a InferenceClient, image: &'a ImageInput) -> Self {
        Self {
            client,
            image,
            messages: vec![system_message()],
        }
    }

    /// Ask one question and record the exchange.
    ///
    /// # Errors
    /// Returns any request error; the question is not recorded on failure.
    pub async fn ask<F>(&mut self, question: &str, on_delta: F) -> Result<String, InferenceError>
    where
        F: FnMut(&str) + Send,
    {
        let message = if self.messages.len() == 1 {
            user_message(question, self.image)
        } else {
            json!({ "role": "user", "content": question })
        };
        self.messages.push(message);

        match self
            .client
            .chat_with(&self.messages, TURN_MAX_TOKENS, on_delta)
            .await
        {
            Ok(completion) => {
                self.messages
                    .push(json!({ "role": "assistant", "content": completion.text }));
                Ok(completion.text)
            }
            Err(e) => {
                self.messages.pop();
                Err(e)
            }
        }
    }

    /// Number of completed exchanges.
    #[must_use]
    pub fn turns(&self) -> usize {
        (self.messages.len() - 1) / 2
    }
}
