//! Credential and override loading.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

use tracing::debug;

use crate::error::ConfigError;
use crate::profile::{self, ModelProfile};

/// RunPod API key.
pub const ENV_API_KEY: &str = "RUNPOD_API_KEY";
/// Hugging Face token forwarded to the pod for weight downloads.
pub const ENV_HF_TOKEN: &str = "HF_TOKEN";
/// Preferred datacenter override.
pub const ENV_DATACENTER: &str = "PREFERRED_DATACENTER";
/// Provider API base URL override.
pub const ENV_API_URL: &str = "RUNPOD_API_URL";

/// Datacenter used when none is configured.
pub const DEFAULT_DATACENTER: &str = "EU-RO-1";
/// RunPod REST API base URL.
pub const DEFAULT_API_URL: &str = "https://rest.runpod.io/v1";

/// A flat source of named configuration values.
pub trait ConfigSource {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSource;

impl ConfigSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// In-memory source, mostly for tests.
#[derive(Debug, Clone, Default)]
pub struct MapSource(HashMap<String, String>);

impl MapSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.0.insert(key.to_string(), value.to_string());
        self
    }
}

impl ConfigSource for MapSource {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

/// Which secrets a command needs before it may touch the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// list / start / stop / delete.
    Lifecycle,
    /// create: also needs the Hugging Face token.
    Deploy,
    /// ask / ocr against an already running pod: no provider key needed.
    Inference,
}

impl Requirement {
    /// Keys that must be present and non-empty.
    #[must_use]
    pub fn required_keys(self) -> &'static [&'static str] {
        match self {
            Self::Lifecycle => &[ENV_API_KEY],
            Self::Deploy => &[ENV_API_KEY, ENV_HF_TOKEN],
            Self::Inference => &[],
        }
    }
}

/// Immutable settings snapshot for one invocation.
#[derive(Clone)]
pub struct Settings {
    api_key: String,
    hf_token: Option<String>,
    datacenter: String,
    api_url: String,
    network_volumes: BTreeMap<&'static str, String>,
    pod_ids: BTreeMap<&'static str, String>,
}

fn non_empty(source: &dyn ConfigSource, key: &str) -> Option<String> {
    source
        .get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Settings {
    /// Snapshot settings from `source`.
    ///
    /// # Errors
    /// Returns [`ConfigError::Missing`] naming the first absent required key.
    pub fn load(source: &dyn ConfigSource, requirement: Requirement) -> Result<Self, ConfigError> {
        for key in requirement.required_keys() {
            if non_empty(source, key).is_none() {
                return Err(ConfigError::Missing((*key).to_string()));
            }
        }

        let mut network_volumes = BTreeMap::new();
        let mut pod_ids = BTreeMap::new();
        for p in profile::all() {
            if let Some(v) = non_empty(source, &p.network_volume_var()) {
                network_volumes.insert(p.name, v);
            }
            if let Some(v) = non_empty(source, &p.pod_id_var()) {
                pod_ids.insert(p.name, v);
            }
        }

        let settings = Self {
            api_key: non_empty(source, ENV_API_KEY).unwrap_or_default(),
            hf_token: non_empty(source, ENV_HF_TOKEN),
            datacenter: non_empty(source, ENV_DATACENTER)
                .unwrap_or_else(|| DEFAULT_DATACENTER.to_string()),
            api_url: non_empty(source, ENV_API_URL)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            network_volumes,
            pod_ids,
        };
        debug!(?settings, "settings loaded");
        Ok(settings)
    }

    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    #[must_use]
    pub fn hf_token(&self) -> Option<&str> {
        self.hf_token.as_deref()
    }

    #[must_use]
    pub fn datacenter(&self) -> &str {
        &self.datacenter
    }

    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Existing network volume configured for `profile`, if any.
    #[must_use]
    pub fn network_volume(&self, profile: &ModelProfile) -> Option<&str> {
        self.network_volumes.get(profile.name).map(String::as_str)
    }

    /// Id of the running pod serving `profile`.
    ///
    /// # Errors
    /// Returns [`ConfigError::Missing`] naming the profile's pod id variable.
    pub fn pod_id(&self, profile: &ModelProfile) -> Result<&str, ConfigError> {
        self.pod_ids
            .get(profile.name)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::Missing(profile.pod_id_var()))
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &"<redacted>")
            .field("hf_token", &self.hf_token.as_ref().map(|_| "<redacted>"))
            .field("datacenter", &self.datacenter)
            .field("api_url", &self.api_url)
            .field("network_volumes", &self.network_volumes)
            .field("pod_ids", &self.pod_ids)
            .finish()
    }
}

/// Load `.env` (or `path`) into the process environment.
///
/// A missing default `.env` is not an error; a missing explicit path is.
///
/// # Errors
/// Returns [`ConfigError::Dotenv`] if the file cannot be read or parsed.
pub fn load_dotenv(path: Option<&Path>) -> Result<(), ConfigError> {
    match path {
        Some(p) => {
            dotenvy::from_path(p)?;
            debug!(path = %p.display(), "loaded env file");
        }
        None => match dotenvy::dotenv() {
            Ok(p) => debug!(path = %p.display(), "loaded .env"),
            Err(e) if e.not_found() => debug!("no .env file found"),
            Err(e) => return Err(e.into()),
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> MapSource {
        MapSource::new()
            .with(ENV_API_KEY, "rp_key")
            .with(ENV_HF_TOKEN, "hf_secret")
    }

    #[test]
    fn test_defaults_applied() {
        let s = Settings::load(&full(), Requirement::Deploy).unwrap();
        assert_eq!(s.api_key(), "rp_key");
        assert_eq!(s.hf_token(), Some("hf_secret"));
        assert_eq!(s.datacenter(), DEFAULT_DATACENTER);
        assert_eq!(s.api_url(), DEFAULT_API_URL);
    }

    #[test]
    fn test_each_required_key_is_enforced() {
        for requirement in [Requirement::Lifecycle, Requirement::Deploy] {
            for missing in requirement.required_keys() {
                let mut source = MapSource::new();
                for key in requirement.required_keys() {
                    if key != missing {
                        source = source.with(key, "x");
                    }
                }
                let err = Settings::load(&source, requirement).unwrap_err();
                assert!(
                    matches!(&err, ConfigError::Missing(k) if k == missing),
                    "expected {missing} missing, got {err}"
                );
            }
        }
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let source = MapSource::new().with(ENV_API_KEY, "   ");
        let err = Settings::load(&source, Requirement::Lifecycle).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(k) if k == ENV_API_KEY));
    }

    #[test]
    fn test_lifecycle_does_not_need_hf_token() {
        let source = MapSource::new().with(ENV_API_KEY, "k");
        let s = Settings::load(&source, Requirement::Lifecycle).unwrap();
        assert!(s.hf_token().is_none());
    }

    #[test]
    fn test_overrides_and_profile_keys() {
        let source = full()
            .with(ENV_DATACENTER, "US-TX-3")
            .with(ENV_API_URL, "http://localhost:9000")
            .with("NETWORK_VOLUME_ID_CHANDRA", "vol-123")
            .with("QWEN3VL_POD_ID", "pod-abc");
        let s = Settings::load(&source, Requirement::Deploy).unwrap();
        let chandra = profile::find("chandra").unwrap();
        let qwen = profile::find("qwen3-vl").unwrap();

        assert_eq!(s.datacenter(), "US-TX-3");
        assert_eq!(s.api_url(), "http://localhost:9000");
        assert_eq!(s.network_volume(chandra), Some("vol-123"));
        assert_eq!(s.network_volume(qwen), None);
        assert_eq!(s.pod_id(qwen).unwrap(), "pod-abc");
        assert!(matches!(
            s.pod_id(chandra),
            Err(ConfigError::Missing(k)) if k == "CHANDRA_POD_ID"
        ));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let s = Settings::load(&full(), Requirement::Deploy).unwrap();
        let rendered = format!("{s:?}");
        assert!(!rendered.contains("rp_key"));
        assert!(!rendered.contains("hf_secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_load_dotenv_explicit_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_dotenv(Some(&dir.path().join("nope.env"))).unwrap_err();
        assert!(matches!(err, ConfigError::Dotenv(_)));
    }
}
