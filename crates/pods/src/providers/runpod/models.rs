//! RunPod REST API models.
//!
//! Only the fields this tool reads or writes are modelled; unknown response
//! fields are ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::providers::traits::PodStatus;

// ============================================================================
// Pod types
// ============================================================================

/// Pod object returned by `GET /pods`, `GET /pods/{id}` and `POST /pods`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodResource {
    /// Pod ID. Absent on malformed create responses.
    pub id: Option<String>,
    /// Pod name.
    pub name: Option<String>,
    /// Desired status (`RUNNING`, `EXITED`, `TERMINATED`, ...).
    pub desired_status: Option<PodStatus>,
    /// Container image.
    pub image: Option<String>,
    /// Machine the pod is placed on.
    pub machine: Option<MachineInfo>,
}

/// Machine descriptor nested in a pod.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineInfo {
    /// Human-readable GPU name.
    pub gpu_display_name: Option<String>,
    /// GPU type id.
    pub gpu_type_id: Option<String>,
}

// ============================================================================
// Request bodies
// ============================================================================

/// Request body for `POST /pods`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePodBody {
    pub name: String,
    pub image_name: String,
    /// GPU type ids, tried in order.
    pub gpu_type_ids: Vec<String>,
    /// `custom` makes the provider honour the order of `gpu_type_ids`.
    pub gpu_type_priority: String,
    pub gpu_count: u32,
    /// `SECURE` or `COMMUNITY`.
    pub cloud_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data_center_ids: Vec<String>,
    pub container_disk_in_gb: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_in_gb: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_volume_id: Option<String>,
    pub volume_mount_path: String,
    pub ports: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub docker_start_cmd: Vec<String>,
}

/// Extract the `error` field of a response body, if any.
///
/// The provider sends either a string or a structured value; structured values
/// are returned as compact JSON.
#[must_use]
pub fn error_field(body: &serde_json::Value) -> Option<String> {
    match body.get("error")? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
