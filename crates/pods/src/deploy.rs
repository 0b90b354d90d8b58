//! Assembly of create requests from a profile and settings.

use std::collections::BTreeMap;

use pod_config::profile::ModelProfile;
use pod_config::settings::{Settings, ENV_HF_TOKEN};
use tracing::debug;

use crate::payload::{StartupPayload, PAYLOAD_ENV};
use crate::providers::traits::{CreatePodRequest, PodProviderError, PodVolume};

/// Overrides accepted by `pods create`.
#[derive(Debug, Clone, Default)]
pub struct DeployOverrides {
    /// Restrict the profile's GPU candidates to these (substring match).
    pub gpus: Vec<String>,
    /// Pod name instead of the profile default.
    pub name: Option<String>,
}

/// Narrow the profile's GPU candidates to those matching any of `filters`.
///
/// Matching is a case-insensitive substring test, so `l40s` selects
/// `NVIDIA L40S`. The profile's preference order is kept.
///
/// # Errors
/// Returns [`PodProviderError::Config`] if no candidate matches.
pub fn select_gpus(
    profile: &ModelProfile,
    filters: &[String],
) -> Result<Vec<String>, PodProviderError> {
    if filters.is_empty() {
        return Ok(profile.gpu_types.iter().map(|g| (*g).to_string()).collect());
    }

    let wanted: Vec<String> = filters.iter().map(|f| f.to_lowercase()).collect();
    let selected: Vec<String> = profile
        .gpu_types
        .iter()
        .filter(|gpu| {
            let gpu = gpu.to_lowercase();
            wanted.iter().any(|w| gpu.contains(w.as_str()))
        })
        .map(|g| (*g).to_string())
        .collect();

    if selected.is_empty() {
        return Err(PodProviderError::Config(format!(
            "no GPU of profile {} matches {}; candidates: {}",
            profile.name,
            filters.join(", "),
            profile.gpu_types.join(", ")
        )));
    }
    Ok(selected)
}

/// Build the create request for `profile`.
///
/// # Errors
/// Returns [`PodProviderError::Config`] if the GPU filter matches nothing or
/// the Hugging Face token is absent.
pub fn build_create_request(
    profile: &ModelProfile,
    settings: &Settings,
    overrides: &DeployOverrides,
    payload: &StartupPayload,
) -> Result<CreatePodRequest, PodProviderError> {
    let hf_token = settings
        .hf_token()
        .ok_or_else(|| PodProviderError::Config(format!("{ENV_HF_TOKEN} is not set")))?;
    let gpu_types = select_gpus(profile, &overrides.gpus)?;

    let volume = match settings.network_volume(profile) {
        Some(id) => PodVolume::Network { id: id.to_string() },
        None => PodVolume::Local {
            size_gb: profile.volume_gb,
        },
    };

    let mut env = BTreeMap::new();
    env.insert(ENV_HF_TOKEN.to_string(), hf_token.to_string());
    env.insert("HF_HOME".to_string(), profile.hf_home());
    env.insert("PYTHONUNBUFFERED".to_string(), "1".to_string());
    env.insert("MODEL_PROFILE".to_string(), profile.name.to_string());
    env.insert(PAYLOAD_ENV.to_string(), payload.env_value().to_string());

    let request = CreatePodRequest {
        name: overrides
            .name
            .clone()
            .unwrap_or_else(|| profile.pod_name.to_string()),
        image: profile.image.to_string(),
        gpu_types,
        gpu_count: profile.gpu_count,
        datacenter: Some(settings.datacenter().to_string()),
        container_disk_gb: profile.container_disk_gb,
        volume,
        volume_mount_path: profile.volume_mount_path.to_string(),
        ports: profile.ports(),
        env,
        start_command: StartupPayload::start_command(),
    };
    debug!(request = ?request.redacted(), "built create request");
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pod_config::settings::{MapSource, Requirement, ENV_API_KEY};
    use pod_config::profile;

    fn settings(extra: &[(&str, &str)]) -> Settings {
        let mut source = MapSource::new()
            .with(ENV_API_KEY, "rp_key")
            .with(ENV_HF_TOKEN, "hf_secret");
        for (k, v) in extra {
            source = source.with(k, v);
        }
        Settings::load(&source, Requirement::Deploy).unwrap()
    }

    fn payload() -> StartupPayload {
        StartupPayload::new("echo hi").unwrap()
    }

    #[test]
    fn test_select_gpus_keeps_profile_order() {
        let qwen = profile::find("qwen3-vl").unwrap();
        let all = select_gpus(qwen, &[]).unwrap();
        assert_eq!(all[0], "NVIDIA L40S");

        let picked = select_gpus(qwen, &["a40".into(), "l40s".into()]).unwrap();
        assert_eq!(picked, vec!["NVIDIA L40S", "NVIDIA A40"]);
    }

    #[test]
    fn test_select_gpus_rejects_unknown() {
        let olmocr = profile::find("olmocr").unwrap();
        let err = select_gpus(olmocr, &["H100".into()]).unwrap_err();
        assert!(matches!(err, PodProviderError::Config(msg) if msg.contains("NVIDIA L40S")));
    }

    #[test]
    fn test_local_volume_by_default() {
        let chandra = profile::find("chandra").unwrap();
        let req =
            build_create_request(chandra, &settings(&[]), &DeployOverrides::default(), &payload())
                .unwrap();
        assert_eq!(req.name, "vlm-chandra");
        assert_eq!(req.volume, PodVolume::Local { size_gb: 60 });
        assert_eq!(req.datacenter.as_deref(), Some("EU-RO-1"));
        assert_eq!(req.env["HF_TOKEN"], "hf_secret");
        assert_eq!(req.env["HF_HOME"], "/workspace/hf_cache");
        assert_eq!(req.env["PYTHONUNBUFFERED"], "1");
        assert_eq!(req.env["STARTUP_B64"], payload().env_value());
        assert_eq!(req.ports, vec!["22/tcp", "8000/http", "3000/http"]);
        assert_eq!(req.start_command, StartupPayload::start_command());
    }

    #[test]
    fn test_network_volume_and_name_override() {
        let chandra = profile::find("chandra").unwrap();
        let overrides = DeployOverrides {
            gpus: vec![],
            name: Some("my-pod".into()),
        };
        let req = build_create_request(
            chandra,
            &settings(&[("NETWORK_VOLUME_ID_CHANDRA", "vol-9")]),
            &overrides,
            &payload(),
        )
        .unwrap();
        assert_eq!(req.name, "my-pod");
        assert_eq!(req.volume, PodVolume::Network { id: "vol-9".into() });
    }

    #[test]
    fn test_redacted_hides_token() {
        let chandra = profile::find("chandra").unwrap();
        let req =
            build_create_request(chandra, &settings(&[]), &DeployOverrides::default(), &payload())
                .unwrap();
        let rendered = serde_json::to_string(&req.redacted()).unwrap();
        assert!(!rendered.contains("hf_secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
