//! Cleanup of model output.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Value};

static FILL_ZONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.{4,}|-{4,}|_{4,}").expect("valid fill-zone regex"));
static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));
static MULTI_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" {2,}").expect("valid space regex"));
static JSON_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*\]").expect("valid array regex"));

/// Remove a surrounding markdown code fence (with optional language tag).
#[must_use]
pub fn strip_fences(raw: &str) -> String {
    let text = raw.trim();
    if !text.starts_with("```") {
        return text.to_string();
    }
    let mut lines: Vec<&str> = text.lines().skip(1).collect();
    if lines.last().is_some_and(|l| l.trim() == "```") {
        lines.pop();
    }
    lines.join("\n")
}

/// Collapse runs of four or more `.`, `-` or `_` (form fill-in zones) to `___`.
#[must_use]
pub fn normalize_fill_zones(text: &str) -> String {
    FILL_ZONE.replace_all(text, "___").into_owned()
}

/// Replace HTML tags with spaces and squeeze the result.
#[must_use]
pub fn strip_html(text: &str) -> String {
    let no_tags = HTML_TAG.replace_all(text, " ");
    MULTI_SPACE.replace_all(&no_tags, " ").trim().to_string()
}

/// The array hidden in a `{"text": ...}` wrapper, if any.
fn unwrap_text(value: &Value) -> Option<Vec<Value>> {
    match value.get("text")? {
        Value::Array(items) => Some(items.clone()),
        Value::String(s) => match serde_json::from_str(s) {
            Ok(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

/// Parse a bounding-box OCR reply into regions.
///
/// Tolerates code fences, a single `{"text": "<array>"}` wrapper and prose
/// around the array. Unparseable replies become one region flagged with
/// `parse_error`.
#[must_use]
pub fn parse_bbox_response(raw: &str) -> Vec<Value> {
    let text = strip_fences(raw);
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Array(items)) => {
            if let [only] = items.as_slice() {
                if only.get("bbox").is_none() {
                    if let Some(inner) = unwrap_text(only) {
                        return inner;
                    }
                }
            }
            items
        }
        Ok(obj @ Value::Object(_)) => unwrap_text(&obj).unwrap_or_else(|| vec![obj]),
        Ok(other) => vec![other],
        Err(_) => JSON_ARRAY
            .find(&text)
            .and_then(|m| serde_json::from_str::<Vec<Value>>(m.as_str()).ok())
            .unwrap_or_else(|| vec![json!({ "text": raw, "bbox": null, "parse_error": true })]),
    }
}

/// Normalize fill zones inside every region's `text`.
pub fn normalize_regions(regions: &mut [Value]) {
    for region in regions {
        if let Some(Value::String(text)) = region.get_mut("text") {
            *text = normalize_fill_zones(text);
        }
    }
}

/// Parse a numbered-answer JSON object, or wrap the raw reply as `{"error": raw}`.
#[must_use]
pub fn parse_answers(raw: &str) -> Value {
    match serde_json::from_str::<Value>(&strip_fences(raw)) {
        Ok(v @ Value::Object(_)) => v,
        _ => json!({ "error": raw.trim() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_fences("```json\n{\"1\": \"a\"}\n```"), "{\"1\": \"a\"}");
        assert_eq!(strip_fences("  plain  "), "plain");
        assert_eq!(strip_fences("```\n[1]"), "[1]");
    }

    #[test]
    fn test_normalize_fill_zones() {
        assert_eq!(normalize_fill_zones("Name: ........ Date: ----"), "Name: ___ Date: ___");
        assert_eq!(normalize_fill_zones("a...b"), "a...b");
        assert_eq!(normalize_fill_zones("x________y"), "x___y");
        // Mixed characters are not a run.
        assert_eq!(normalize_fill_zones(".-.-"), ".-.-");
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<p>Hello <b>world</b></p>"), "Hello world");
    }

    #[test]
    fn test_bbox_plain_array() {
        let regions = parse_bbox_response(r#"[{"text":"A","bbox":[0,0,1,1]}]"#);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0]["text"], "A");
    }

    #[test]
    fn test_bbox_fenced_and_wrapped() {
        let raw = "```json\n[{\"text\": \"[{\\\"text\\\":\\\"B\\\",\\\"bbox\\\":[0,0,1,1]}]\"}]\n```";
        let regions = parse_bbox_response(raw);
        assert_eq!(regions[0]["text"], "B");

        let obj = r#"{"text": [{"text":"C","bbox":[0,0,1,1]}]}"#;
        assert_eq!(parse_bbox_response(obj)[0]["text"], "C");
    }

    #[test]
    fn test_bbox_array_inside_prose() {
        let raw = "Here you go: [{\"text\":\"D\",\"bbox\":[0,0,1,1]}] hope it helps";
        assert_eq!(parse_bbox_response(raw)[0]["text"], "D");
    }

    #[test]
    fn test_bbox_unparseable() {
        let regions = parse_bbox_response("no json here");
        assert_eq!(regions[0]["parse_error"], true);
        assert_eq!(regions[0]["text"], "no json here");
    }

    #[test]
    fn test_normalize_regions() {
        let mut regions = vec![json!({"text": "Sign.........", "bbox": [0, 0, 1, 1]}), json!({"bbox": null})];
        normalize_regions(&mut regions);
        assert_eq!(regions[0]["text"], "Sign___");
    }

    #[test]
    fn test_parse_answers() {
        assert_eq!(parse_answers("```\n{\"1\": \"Paris\"}\n```")["1"], "Paris");
        assert_eq!(parse_answers("I cannot see")["error"], "I cannot see");
    }
}
