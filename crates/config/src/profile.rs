//! Built-in model profiles.
//!
//! A profile pins everything that varies between deployed models: the
//! container image, the ordered GPU candidates handed to the provider, disk
//! sizing, and the vLLM launch flags. Values are documented here rather than
//! computed.

use serde::Serialize;

use crate::error::ConfigError;

/// Port the inference server listens on inside every pod.
pub const INFERENCE_PORT: u16 = 8000;

/// Port of the chat web UI inside every pod.
pub const UI_PORT: u16 = 3000;

/// File whose presence in the model directory means the weights are cached.
pub const CACHE_MARKER: &str = "config.json";

/// vLLM launch settings for one profile.
#[derive(Debug, Clone, Serialize)]
pub struct EngineSettings {
    /// Port the OpenAI-compatible API binds to.
    pub port: u16,
    /// Weight dtype (`--dtype`).
    pub dtype: &'static str,
    /// Maximum context length (`--max-model-len`).
    pub max_model_len: u32,
    /// Maximum concurrent sequences per batch (`--max-num-seqs`).
    pub max_num_seqs: u32,
    /// Fraction of GPU memory vLLM may claim (`--gpu-memory-utilization`).
    pub gpu_memory_utilization: f32,
    /// Additional flags appended verbatim.
    pub extra_args: &'static [&'static str],
}

/// Client-side generation settings used by `ask` and `ocr`.
#[derive(Debug, Clone, Serialize)]
pub struct InferenceSettings {
    pub repetition_penalty: f32,
    pub max_tokens: u32,
}

/// Static deployment description of one model.
#[derive(Debug, Clone, Serialize)]
pub struct ModelProfile {
    /// Profile name used on the command line.
    pub name: &'static str,
    /// Uppercase key fragment for per-profile environment variables,
    /// e.g. `QWEN3VL` for `QWEN3VL_POD_ID` and `NETWORK_VOLUME_ID_QWEN3VL`.
    pub env_key: &'static str,
    /// Default pod name.
    pub pod_name: &'static str,
    /// Hugging Face repository of the weights.
    pub model_repo: &'static str,
    /// Name the model is served under (`--served-model-name`).
    pub served_model_name: &'static str,
    /// Container image.
    pub image: &'static str,
    /// GPU type ids in preference order. The provider picks the first one
    /// with capacity.
    pub gpu_types: &'static [&'static str],
    pub gpu_count: u32,
    pub container_disk_gb: u32,
    /// Size of the pod volume when no network volume is configured.
    pub volume_gb: u32,
    pub volume_mount_path: &'static str,
    /// Python packages installed at boot.
    pub pip_packages: &'static [&'static str],
    pub engine: EngineSettings,
    pub inference: InferenceSettings,
}

impl ModelProfile {
    /// Environment variable holding the id of a running pod for this profile.
    #[must_use]
    pub fn pod_id_var(&self) -> String {
        format!("{}_POD_ID", self.env_key)
    }

    /// Environment variable holding an existing network volume id.
    #[must_use]
    pub fn network_volume_var(&self) -> String {
        format!("NETWORK_VOLUME_ID_{}", self.env_key)
    }

    /// Directory on the volume that holds the downloaded weights.
    #[must_use]
    pub fn model_dir(&self) -> String {
        format!("{}/models/{}", self.volume_mount_path, self.name)
    }

    /// Directory on the volume that receives server and UI logs.
    #[must_use]
    pub fn log_dir(&self) -> String {
        format!("{}/logs", self.volume_mount_path)
    }

    /// Web UI data directory (accounts, chat history).
    #[must_use]
    pub fn ui_data_dir(&self) -> String {
        format!("{}/webui", self.volume_mount_path)
    }

    /// Hugging Face cache directory exported as `HF_HOME`.
    #[must_use]
    pub fn hf_home(&self) -> String {
        format!("{}/hf_cache", self.volume_mount_path)
    }

    /// Server log file name.
    #[must_use]
    pub fn server_log_name(&self) -> String {
        format!("vllm_{}.log", self.name.replace('-', ""))
    }

    /// Arguments for `python -m vllm.entrypoints.openai.api_server`.
    #[must_use]
    pub fn server_args(&self, model_path: &str) -> Vec<String> {
        let engine = &self.engine;
        let mut args: Vec<String> = vec![
            "--model".into(),
            model_path.into(),
            "--served-model-name".into(),
            self.served_model_name.into(),
            "--host".into(),
            "0.0.0.0".into(),
            "--port".into(),
            engine.port.to_string(),
            "--dtype".into(),
            engine.dtype.into(),
            "--max-model-len".into(),
            engine.max_model_len.to_string(),
            "--max-num-seqs".into(),
            engine.max_num_seqs.to_string(),
            "--gpu-memory-utilization".into(),
            format!("{:.2}", engine.gpu_memory_utilization),
        ];
        args.extend(engine.extra_args.iter().map(|a| (*a).to_string()));
        args
    }

    /// Exposed ports in provider notation.
    #[must_use]
    pub fn ports(&self) -> Vec<String> {
        vec![
            "22/tcp".to_string(),
            format!("{}/http", self.engine.port),
            format!("{UI_PORT}/http"),
        ]
    }
}

const VLLM_PACKAGES: &[&str] = &["vllm", "open-webui", "huggingface_hub[cli]"];

static PROFILES: &[ModelProfile] = &[
    ModelProfile {
        name: "qwen3-vl",
        env_key: "QWEN3VL",
        pod_name: "vlm-qwen3-vl",
        model_repo: "Qwen/Qwen3-VL-8B-Instruct",
        served_model_name: "qwen3-vl",
        image: "runpod/pytorch:2.8.0-py3.11-cuda12.8.1-cudnn-devel-ubuntu22.04",
        gpu_types: &[
            "NVIDIA L40S",
            "NVIDIA RTX 6000 Ada Generation",
            "NVIDIA A40",
        ],
        gpu_count: 1,
        container_disk_gb: 50,
        volume_gb: 80,
        volume_mount_path: "/workspace",
        pip_packages: VLLM_PACKAGES,
        engine: EngineSettings {
            port: INFERENCE_PORT,
            dtype: "bfloat16",
            max_model_len: 32768,
            max_num_seqs: 16,
            gpu_memory_utilization: 0.90,
            extra_args: &["--enable-prefix-caching", "--trust-remote-code"],
        },
        inference: InferenceSettings {
            repetition_penalty: 1.15,
            max_tokens: 8192,
        },
    },
    ModelProfile {
        name: "chandra",
        env_key: "CHANDRA",
        pod_name: "vlm-chandra",
        model_repo: "datalab-to/chandra",
        served_model_name: "chandra",
        image: "runpod/pytorch:2.8.0-py3.11-cuda12.8.1-cudnn-devel-ubuntu22.04",
        gpu_types: &["NVIDIA L40S", "NVIDIA RTX 6000 Ada Generation", "NVIDIA A40"],
        gpu_count: 1,
        container_disk_gb: 50,
        volume_gb: 60,
        volume_mount_path: "/workspace",
        pip_packages: VLLM_PACKAGES,
        engine: EngineSettings {
            port: INFERENCE_PORT,
            dtype: "bfloat16",
            max_model_len: 16384,
            max_num_seqs: 8,
            gpu_memory_utilization: 0.90,
            extra_args: &["--enable-prefix-caching", "--trust-remote-code"],
        },
        inference: InferenceSettings {
            repetition_penalty: 1.15,
            max_tokens: 8192,
        },
    },
    ModelProfile {
        name: "olmocr",
        env_key: "OLMOCR",
        pod_name: "vlm-olmocr",
        model_repo: "allenai/olmOCR-7B-0225-preview",
        served_model_name: "olmocr",
        image: "runpod/pytorch:2.4.0-py3.11-cuda12.4.1-devel-ubuntu22.04",
        gpu_types: &["NVIDIA L40S"],
        gpu_count: 1,
        container_disk_gb: 50,
        volume_gb: 60,
        volume_mount_path: "/workspace",
        pip_packages: VLLM_PACKAGES,
        engine: EngineSettings {
            port: INFERENCE_PORT,
            dtype: "bfloat16",
            max_model_len: 16384,
            max_num_seqs: 8,
            gpu_memory_utilization: 0.90,
            extra_args: &[],
        },
        inference: InferenceSettings {
            repetition_penalty: 1.05,
            max_tokens: 4096,
        },
    },
];

/// All built-in profiles.
#[must_use]
pub fn all() -> &'static [ModelProfile] {
    PROFILES
}

/// Look up a built-in profile by name.
#[must_use]
pub fn find(name: &str) -> Option<&'static ModelProfile> {
    PROFILES.iter().find(|p| p.name == name)
}

/// Look up a built-in profile by name, failing with the list of known names.
///
/// # Errors
/// Returns [`ConfigError::UnknownProfile`] if no profile matches.
pub fn resolve(name: &str) -> Result<&'static ModelProfile, ConfigError> {
    find(name).ok_or_else(|| ConfigError::UnknownProfile {
        name: name.to_string(),
        available: PROFILES
            .iter()
            .map(|p| p.name)
            .collect::<Vec<_>>()
            .join(", "),
    })
}
