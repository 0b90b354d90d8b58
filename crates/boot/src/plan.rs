//! Everything one boot needs, resolved up front.

use std::path::{Path, PathBuf};

use pod_config::profile::{ModelProfile, CACHE_MARKER, UI_PORT};

/// Resolved paths, commands and endpoints for booting one profile.
#[derive(Debug, Clone)]
pub struct BootPlan {
    pub profile: &'static str,
    pub model_repo: String,
    pub model_dir: PathBuf,
    pub log_dir: PathBuf,
    pub ui_data_dir: PathBuf,
    pub hf_home: PathBuf,
    pub server_log: PathBuf,
    pub ui_log: PathBuf,
    pub pip_packages: Vec<String>,
    /// Arguments after `python -m vllm.entrypoints.openai.api_server`.
    pub server_args: Vec<String>,
    /// Readiness endpoint of the inference server.
    pub health_url: String,
    /// OpenAI base URL handed to the web UI.
    pub api_base_url: String,
    pub ui_port: u16,
    pub enable_ui_auth: bool,
    pub hf_token: Option<String>,
}

impl BootPlan {
    /// Plan a boot of `profile` with persistent data under `workspace`.
    #[must_use]
    pub fn new(
        profile: &'static ModelProfile,
        workspace: &Path,
        hf_token: Option<String>,
        enable_ui_auth: bool,
    ) -> Self {
        let model_dir = workspace.join("models").join(profile.name);
        let log_dir = workspace.join("logs");
        let port = profile.engine.port;
        Self {
            profile: profile.name,
            model_repo: profile.model_repo.to_string(),
            server_args: profile.server_args(&model_dir.to_string_lossy()),
            server_log: log_dir.join(profile.server_log_name()),
            ui_log: log_dir.join("webui.log"),
            ui_data_dir: workspace.join("webui"),
            hf_home: workspace.join("hf_cache"),
            pip_packages: profile.pip_packages.iter().map(|p| (*p).to_string()).collect(),
            health_url: format!("http://127.0.0.1:{port}/v1/models"),
            api_base_url: format!("http://127.0.0.1:{port}/v1"),
            ui_port: UI_PORT,
            model_dir,
            log_dir,
            enable_ui_auth,
            hf_token,
        }
    }

    /// Directories created before anything else runs.
    #[must_use]
    pub fn directories(&self) -> Vec<&Path> {
        vec![
            self.model_dir.as_path(),
            self.log_dir.as_path(),
            self.ui_data_dir.as_path(),
            self.hf_home.as_path(),
        ]
    }

    /// Marker whose presence means the weights are already downloaded.
    #[must_use]
    pub fn cache_marker(&self) -> PathBuf {
        self.model_dir.join(CACHE_MARKER)
    }

    /// Whether the model cache marker is present.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.cache_marker().is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pod_config::profile;

    #[test]
    fn test_plan_paths() {
        let plan = BootPlan::new(
            profile::find("qwen3-vl").unwrap(),
            Path::new("/workspace"),
            None,
            false,
        );
        assert_eq!(plan.model_dir, Path::new("/workspace/models/qwen3-vl"));
        assert_eq!(plan.server_log, Path::new("/workspace/logs/vllm_qwen3vl.log"));
        assert_eq!(plan.health_url, "http://127.0.0.1:8000/v1/models");
        assert_eq!(plan.server_args[1], "/workspace/models/qwen3-vl");
        assert_eq!(plan.directories().len(), 4);
    }

    #[test]
    fn test_cache_marker() {
        let dir = tempfile::tempdir().unwrap();
        let plan = BootPlan::new(profile::find("chandra").unwrap(), dir.path(), None, false);
        assert!(!plan.is_cached());

        std::fs::create_dir_all(&plan.model_dir).unwrap();
        assert!(!plan.is_cached());

        std::fs::write(plan.cache_marker(), "{}").unwrap();
        assert!(plan.is_cached());
    }
}
