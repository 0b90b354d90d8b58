//! Startup payload packaging.
//!
//! The boot script is shipped to the pod as a single-line base64 value in the
//! `STARTUP_B64` environment variable. The container start command decodes it
//! to `/startup.sh` and runs it, so quotes, `$` and backticks in the script
//! never have to be escaped inside the JSON request.

use std::path::Path;
use std::string::FromUtf8Error;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

/// Environment variable carrying the encoded script.
pub const PAYLOAD_ENV: &str = "STARTUP_B64";

/// Path the script is decoded to inside the container.
pub const SCRIPT_PATH: &str = "/startup.sh";

/// Errors raised while packaging or unpacking a payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("startup script is empty")]
    Empty,

    #[error("failed to read startup script {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("decoded payload is not UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),
}

/// Encode `script` as standard base64 on a single line.
#[must_use]
pub fn encode_payload(script: &str) -> String {
    let mut encoded = STANDARD.encode(script.as_bytes());
    // Wrapped output from other encoders must still fit in one env value.
    encoded.retain(|c| c != '\n' && c != '\r');
    encoded
}

/// Decode a payload back to the original script.
///
/// Line wrapping and surrounding whitespace in `encoded` are ignored.
///
/// # Errors
/// Returns an error if the input is not base64 or not UTF-8 once decoded.
pub fn decode_payload(encoded: &str) -> Result<String, PayloadError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact)?;
    Ok(String::from_utf8(bytes)?)
}

/// An encoded boot script ready to embed in a create request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupPayload {
    encoded: String,
}

impl StartupPayload {
    /// Package a script.
    ///
    /// # Errors
    /// Returns [`PayloadError::Empty`] for a blank script.
    pub fn new(script: &str) -> Result<Self, PayloadError> {
        if script.trim().is_empty() {
            return Err(PayloadError::Empty);
        }
        Ok(Self {
            encoded: encode_payload(script),
        })
    }

    /// Package the script stored at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is blank.
    pub fn from_path(path: &Path) -> Result<Self, PayloadError> {
        let script = std::fs::read_to_string(path).map_err(|source| PayloadError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::new(&script)
    }

    /// Value for the [`PAYLOAD_ENV`] variable.
    #[must_use]
    pub fn env_value(&self) -> &str {
        &self.encoded
    }

    /// Container start command that decodes and runs the script.
    #[must_use]
    pub fn start_command() -> Vec<String> {
        vec![
            "bash".to_string(),
            "-c".to_string(),
            format!(
                "echo ${PAYLOAD_ENV} | base64 -d > {SCRIPT_PATH} && chmod +x {SCRIPT_PATH} && bash {SCRIPT_PATH}"
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NASTY: &str = r#"#!/usr/bin/env bash
set -euo pipefail
echo "model: $MODEL_NAME" 'single $quoted'
VERSION=`python -c 'import vllm; print(vllm.__version__)'`
json='{"key": "value", "list": [1, 2]}'
printf '%s\n' "tab	and é ü 日本"
"#;

    #[test]
    fn test_round_trip_is_byte_identical() {
        let encoded = encode_payload(NASTY);
        let decoded = decode_payload(&encoded).unwrap();
        assert_eq!(decoded.as_bytes(), NASTY.as_bytes());
    }

    #[test]
    fn test_encoded_is_single_line_and_shell_safe() {
        let long = NASTY.repeat(50);
        let encoded = encode_payload(&long);
        assert!(!encoded.contains('\n'));
        assert!(encoded
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '='));
    }

    #[test]
    fn test_decode_tolerates_wrapped_input() {
        let encoded = encode_payload(NASTY);
        let wrapped: String = encoded
            .as_bytes()
            .chunks(76)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(decode_payload(&wrapped).unwrap(), NASTY);
    }

    #[test]
    fn test_survives_json_embedding() {
        let payload = StartupPayload::new(NASTY).unwrap();
        let body = serde_json::json!({ "env": { PAYLOAD_ENV: payload.env_value() } });
        let text = serde_json::to_string(&body).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        let value = parsed["env"][PAYLOAD_ENV].as_str().unwrap();
        assert_eq!(decode_payload(value).unwrap(), NASTY);
    }

    #[test]
    fn test_empty_script_rejected() {
        assert!(matches!(StartupPayload::new("  \n"), Err(PayloadError::Empty)));
    }

    #[test]
    fn test_invalid_base64_rejected() {
        assert!(matches!(decode_payload("not*base64"), Err(PayloadError::Decode(_))));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("startup.sh");
        std::fs::write(&path, NASTY).unwrap();
        let payload = StartupPayload::from_path(&path).unwrap();
        assert_eq!(decode_payload(payload.env_value()).unwrap(), NASTY);

        let missing = StartupPayload::from_path(&dir.path().join("nope.sh"));
        assert!(matches!(missing, Err(PayloadError::Read { .. })));
    }

    #[test]
    fn test_start_command_decodes_env_value() {
        let cmd = StartupPayload::start_command();
        assert_eq!(cmd[0], "bash");
        assert_eq!(cmd[1], "-c");
        assert_eq!(
            cmd[2],
            "echo $STARTUP_B64 | base64 -d > /startup.sh && chmod +x /startup.sh && bash /startup.sh"
        );
    }
}
