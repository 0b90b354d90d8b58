//! RunPod REST API client implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use super::models::{error_field, CreatePodBody, PodResource};
use super::{service_urls, DEFAULT_API_URL};
use crate::providers::traits::{
    CreatePodRequest, Pod, PodProvider, PodProviderError, PodStatus, PodVolume,
};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Cloud tier pods are created in.
const CLOUD_TYPE: &str = "SECURE";

/// RunPod pod provider.
#[derive(Clone)]
pub struct RunPod {
    /// HTTP client.
    client: Client,
    /// API key for authentication.
    api_key: String,
    /// API base URL, without trailing slash.
    base_url: String,
}

/// Pretty-print a JSON body, or return it unchanged if it is not JSON.
#[must_use]
pub fn pretty_body(text: &str) -> String {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
        .unwrap_or_else(|| text.to_string())
}

impl RunPod {
    /// Create a provider against the public RunPod API.
    ///
    /// # Errors
    /// Returns error if HTTP client cannot be created.
    pub fn new(api_key: impl Into<String>) -> Result<Self, PodProviderError> {
        Self::with_base_url(api_key, DEFAULT_API_URL)
    }

    /// Create a provider against a custom base URL.
    ///
    /// # Errors
    /// Returns error if HTTP client cannot be created.
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, PodProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Send a request and return status and body text.
    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<(StatusCode, String), PodProviderError> {
        let url = format!("{}{path}", self.base_url);
        debug!(method = %method, url = %url, "RunPod request");

        let mut request = self
            .client
            .request(method, &url)
            .bearer_auth(&self.api_key);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(status = status.as_u16(), len = text.len(), "RunPod response");
        Ok((status, text))
    }

    /// Map a non-success status to an error.
    fn status_error(status: StatusCode, text: &str, id: Option<&str>) -> PodProviderError {
        if status == StatusCode::NOT_FOUND {
            if let Some(id) = id {
                return PodProviderError::NotFound(id.to_string());
            }
        }
        let message = serde_json::from_str::<serde_json::Value>(text)
            .ok()
            .and_then(|v| error_field(&v))
            .unwrap_or_else(|| pretty_body(text));
        PodProviderError::Api {
            status: status.as_u16(),
            message,
        }
    }

    /// Run a lifecycle action whose success is the absence of an `error` field.
    async fn action(
        &self,
        method: reqwest::Method,
        path: &str,
        id: &str,
    ) -> Result<(), PodProviderError> {
        let (status, text) = self.send(method, path, None).await?;
        if !status.is_success() {
            return Err(Self::status_error(status, &text, Some(id)));
        }

        // Empty or non-JSON bodies carry no error field.
        if let Ok(body) = serde_json::from_str::<serde_json::Value>(&text) {
            if let Some(message) = error_field(&body) {
                return Err(PodProviderError::Provider(message));
            }
        }
        Ok(())
    }

    /// Parse a JSON success body.
    fn parse<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, PodProviderError> {
        serde_json::from_str(text).map_err(|e| {
            warn!(error = %e, body = %text, "Failed to parse response");
            PodProviderError::Serialization(e)
        })
    }

    /// Convert an API pod resource to our `Pod` type.
    fn to_pod(resource: PodResource) -> Pod {
        let id = resource.id.unwrap_or_default();
        let gpu = resource.machine.and_then(|m| {
            m.gpu_display_name
                .or(m.gpu_type_id)
                .filter(|name| !name.is_empty())
        });
        Pod {
            urls: service_urls(&id),
            id,
            name: resource.name.unwrap_or_default(),
            status: resource.desired_status.unwrap_or(PodStatus::Unknown),
            gpu,
            image: resource.image,
        }
    }

    /// Build the provider request body.
    fn to_body(req: CreatePodRequest) -> CreatePodBody {
        let (volume_in_gb, network_volume_id) = match req.volume {
            PodVolume::Network { id } => (None, Some(id)),
            PodVolume::Local { size_gb } => (Some(size_gb), None),
        };
        CreatePodBody {
            name: req.name,
            image_name: req.image,
            gpu_type_ids: req.gpu_types,
            gpu_type_priority: "custom".to_string(),
            gpu_count: req.gpu_count,
            cloud_type: CLOUD_TYPE.to_string(),
            data_center_ids: req.datacenter.into_iter().collect(),
            container_disk_in_gb: req.container_disk_gb,
            volume_in_gb,
            network_volume_id,
            volume_mount_path: req.volume_mount_path,
            ports: req.ports,
            env: req.env,
            docker_start_cmd: req.start_command,
        }
    }
}

#[async_trait]
impl PodProvider for RunPod {
    async fn create_pod(&self, req: CreatePodRequest) -> Result<Pod, PodProviderError> {
        info!(
            name = %req.name,
            image = %req.image,
            gpus = ?req.gpu_types,
            datacenter = ?req.datacenter,
            "Creating pod"
        );

        let body = serde_json::to_value(Self::to_body(req))?;
        let (status, text) = self.send(reqwest::Method::POST, "/pods", Some(&body)).await?;
        if !status.is_success() {
            return Err(Self::status_error(status, &text, None));
        }

        let value: serde_json::Value = serde_json::from_str(&text)
            .map_err(|_| PodProviderError::MissingId(pretty_body(&text)))?;
        let has_id = value
            .get("id")
            .and_then(serde_json::Value::as_str)
            .is_some_and(|id| !id.is_empty());
        if !has_id {
            return Err(PodProviderError::MissingId(pretty_body(&text)));
        }

        let pod = Self::to_pod(serde_json::from_value(value)?);
        info!(pod_id = %pod.id, status = %pod.status, "Pod created");
        Ok(pod)
    }

    async fn list_pods(&self) -> Result<Vec<Pod>, PodProviderError> {
        let (status, text) = self.send(reqwest::Method::GET, "/pods", None).await?;
        if !status.is_success() {
            return Err(Self::status_error(status, &text, None));
        }
        let pods: Vec<PodResource> = Self::parse(&text)?;
        Ok(pods.into_iter().map(Self::to_pod).collect())
    }

    async fn get_pod(&self, id: &str) -> Result<Pod, PodProviderError> {
        let (status, text) = self
            .send(reqwest::Method::GET, &format!("/pods/{id}"), None)
            .await?;
        if !status.is_success() {
            return Err(Self::status_error(status, &text, Some(id)));
        }
        Ok(Self::to_pod(Self::parse(&text)?))
    }

    async fn start_pod(&self, id: &str) -> Result<(), PodProviderError> {
        info!(pod_id = %id, "Starting pod");
        self.action(reqwest::Method::POST, &format!("/pods/{id}/start"), id)
            .await?;
        info!(pod_id = %id, "Pod start requested");
        Ok(())
    }

    async fn stop_pod(&self, id: &str) -> Result<(), PodProviderError> {
        info!(pod_id = %id, "Stopping pod");
        self.action(reqwest::Method::POST, &format!("/pods/{id}/stop"), id)
            .await?;
        info!(pod_id = %id, "Pod stopped");
        Ok(())
    }

    async fn delete_pod(&self, id: &str) -> Result<(), PodProviderError> {
        info!(pod_id = %id, "Deleting pod");
        self.action(reqwest::Method::DELETE, &format!("/pods/{id}"), id)
            .await?;
        info!(pod_id = %id, "Pod deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pod_status_display() {
        assert_eq!(PodStatus::Running.to_string(), "RUNNING");
        assert_eq!(PodStatus::Exited.to_string(), "EXITED");
        assert!(PodStatus::Exited.is_startable());
        assert!(!PodStatus::Running.is_startable());
    }

    #[test]
    fn test_pretty_body_falls_back_to_raw() {
        assert_eq!(pretty_body("not json"), "not json");
        assert_eq!(pretty_body(r#"{"a":1}"#), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_to_pod_prefers_display_name() {
        let resource: PodResource = serde_json::from_value(serde_json::json!({
            "id": "abc",
            "name": "vlm",
            "desiredStatus": "RUNNING",
            "machine": { "gpuTypeId": "NVIDIA L40S", "gpuDisplayName": "L40S" }
        }))
        .unwrap();
        let pod = RunPod::to_pod(resource);
        assert_eq!(pod.gpu.as_deref(), Some("L40S"));
        assert_eq!(pod.urls.api, "https://abc-8000.proxy.runpod.net/v1");
    }

    #[test]
    fn test_to_body_maps_volume_choice() {
        let req = CreatePodRequest {
            name: "n".into(),
            image: "img".into(),
            gpu_types: vec!["A".into(), "B".into()],
            gpu_count: 1,
            datacenter: Some("EU-RO-1".into()),
            container_disk_gb: 50,
            volume: PodVolume::Local { size_gb: 60 },
            volume_mount_path: "/workspace".into(),
            ports: vec![],
            env: std::collections::BTreeMap::new(),
            start_command: vec![],
        };
        let body = RunPod::to_body(req);
        assert_eq!(body.volume_in_gb, Some(60));
        assert_eq!(body.network_volume_id, None);
        assert_eq!(body.data_center_ids, vec!["EU-RO-1".to_string()]);
        assert_eq!(body.gpu_type_ids, vec!["A".to_string(), "B".to_string()]);
    }
}
