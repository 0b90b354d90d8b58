//! Pod provider trait and common types.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during pod provider operations.
#[derive(Error, Debug)]
pub enum PodProviderError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The response carried an `error` field.
    #[error("provider error: {0}")]
    Provider(String),

    /// No pod with this id is visible to the credential.
    #[error("pod not found: {0}")]
    NotFound(String),

    /// A create response without a pod id. Holds the response body.
    #[error("create response has no pod id:\n{0}")]
    MissingId(String),

    /// Invalid request configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Desired status reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PodStatus {
    Created,
    Running,
    Restarting,
    /// Stopped: billing halted, volume kept.
    Exited,
    Paused,
    Dead,
    Terminated,
    #[serde(other)]
    Unknown,
}

impl PodStatus {
    /// Whether a start request makes sense for a pod in this state.
    #[must_use]
    pub fn is_startable(self) -> bool {
        matches!(self, Self::Exited | Self::Paused | Self::Dead)
    }
}

impl std::fmt::Display for PodStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Created => "CREATED",
            Self::Running => "RUNNING",
            Self::Restarting => "RESTARTING",
            Self::Exited => "EXITED",
            Self::Paused => "PAUSED",
            Self::Dead => "DEAD",
            Self::Terminated => "TERMINATED",
            Self::Unknown => "UNKNOWN",
        };
        f.pad(name)
    }
}

/// Public endpoints of the services running in a pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceUrls {
    /// OpenAI-compatible API base (`.../v1`).
    pub api: String,
    /// Chat web UI.
    pub ui: String,
}

/// A pod as seen by this tool.
#[derive(Debug, Clone, Serialize)]
pub struct Pod {
    /// Provider-assigned identifier.
    pub id: String,
    pub name: String,
    pub status: PodStatus,
    /// GPU display name, if the pod is placed on a machine.
    pub gpu: Option<String>,
    pub image: Option<String>,
    pub urls: ServiceUrls,
}

/// Where the pod's persistent data lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PodVolume {
    /// Attach an existing network volume by id.
    Network { id: String },
    /// Create a pod-local volume of this size.
    Local { size_gb: u32 },
}

/// Request to create a new pod.
#[derive(Debug, Clone, Serialize)]
pub struct CreatePodRequest {
    pub name: String,
    pub image: String,
    /// GPU type ids in preference order.
    pub gpu_types: Vec<String>,
    pub gpu_count: u32,
    /// Preferred datacenter, if any.
    pub datacenter: Option<String>,
    pub container_disk_gb: u32,
    pub volume: PodVolume,
    pub volume_mount_path: String,
    /// Ports in provider notation, e.g. `8000/http`.
    pub ports: Vec<String>,
    pub env: BTreeMap<String, String>,
    /// Command the container runs at start.
    pub start_command: Vec<String>,
}

/// Environment variables whose values never leave the process in diagnostics.
const SECRET_ENV: &[&str] = &["HF_TOKEN"];

impl CreatePodRequest {
    /// Copy of the request with secret environment values masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for (key, value) in &mut copy.env {
            if SECRET_ENV.contains(&key.as_str()) {
                *value = "<redacted>".to_string();
            }
        }
        copy
    }
}

/// What a halt request did to the pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltOutcome {
    /// Stopped; volume retained, can be resumed.
    Stopped,
    /// Permanently deleted.
    Deleted,
}

/// Trait for GPU pod providers.
#[async_trait]
pub trait PodProvider: Send + Sync {
    /// Create a new pod. Succeeds only when the provider returns an id.
    async fn create_pod(&self, req: CreatePodRequest) -> Result<Pod, PodProviderError>;

    /// List all pods visible to the credential.
    async fn list_pods(&self) -> Result<Vec<Pod>, PodProviderError>;

    /// Get a pod by id.
    async fn get_pod(&self, id: &str) -> Result<Pod, PodProviderError>;

    /// Request a transition to running.
    async fn start_pod(&self, id: &str) -> Result<(), PodProviderError>;

    /// Stop a pod. Billing halts, storage is kept.
    async fn stop_pod(&self, id: &str) -> Result<(), PodProviderError>;

    /// Permanently delete a pod.
    async fn delete_pod(&self, id: &str) -> Result<(), PodProviderError>;

    /// Stop or delete, never both.
    async fn halt_pod(&self, id: &str, delete: bool) -> Result<HaltOutcome, PodProviderError> {
        if delete {
            self.delete_pod(id).await?;
            Ok(HaltOutcome::Deleted)
        } else {
            self.stop_pod(id).await?;
            Ok(HaltOutcome::Stopped)
        }
    }
}
