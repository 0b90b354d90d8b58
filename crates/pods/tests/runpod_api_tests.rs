//! RunPod provider tests against a mock REST API.
//!
//! Run with:
//! ```sh
//! cargo test -p pods --test runpod_api_tests
//! ```

#![allow(clippy::too_many_lines)]

use pod_config::profile;
use pod_config::settings::{MapSource, Requirement, Settings};
use pods::deploy::{build_create_request, DeployOverrides};
use pods::output::{render_halt, render_pod_list, NO_PODS};
use pods::runpod::RunPod;
use pods::{HaltOutcome, PodProvider, PodProviderError, PodStatus, StartupPayload};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Fixtures
// ============================================================================

const API_KEY: &str = "rp_test_key";

async fn setup() -> (MockServer, RunPod) {
    let server = MockServer::start().await;
    let provider = RunPod::with_base_url(API_KEY, server.uri()).unwrap();
    (server, provider)
}

fn create_request(profile_name: &str) -> pods::CreatePodRequest {
    let source = MapSource::new()
        .with("RUNPOD_API_KEY", API_KEY)
        .with("HF_TOKEN", "hf_test");
    let settings = Settings::load(&source, Requirement::Deploy).unwrap();
    let profile = profile::find(profile_name).unwrap();
    let payload = StartupPayload::new("#!/bin/bash\necho \"$HF_TOKEN\" `date`\n").unwrap();
    build_create_request(profile, &settings, &DeployOverrides::default(), &payload).unwrap()
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_create_returns_id_and_urls() {
    let (server, provider) = setup().await;
    Mock::given(method("POST"))
        .and(path("/pods"))
        .and(header("authorization", "Bearer rp_test_key"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "abc123",
            "name": "vlm-qwen3-vl",
            "desiredStatus": "RUNNING"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let pod = provider.create_pod(create_request("qwen3-vl")).await.unwrap();
    assert_eq!(pod.id, "abc123");
    assert_eq!(pod.status, PodStatus::Running);
    assert_eq!(pod.urls.api, "https://abc123-8000.proxy.runpod.net/v1");
    assert_eq!(pod.urls.ui, "https://abc123-3000.proxy.runpod.net");
}

#[tokio::test]
async fn test_create_body_carries_payload_and_gpu_order() {
    let (server, provider) = setup().await;
    let req = create_request("qwen3-vl");
    let encoded = req.env["STARTUP_B64"].clone();

    Mock::given(method("POST"))
        .and(path("/pods"))
        .and(body_partial_json(json!({
            "name": "vlm-qwen3-vl",
            "gpuTypeIds": [
                "NVIDIA L40S",
                "NVIDIA RTX 6000 Ada Generation",
                "NVIDIA A40"
            ],
            "gpuTypePriority": "custom",
            "cloudType": "SECURE",
            "dataCenterIds": ["EU-RO-1"],
            "volumeInGb": 80,
            "volumeMountPath": "/workspace",
            "ports": ["22/tcp", "8000/http", "3000/http"],
            "env": { "STARTUP_B64": encoded, "HF_TOKEN": "hf_test" },
            "dockerStartCmd": [
                "bash",
                "-c",
                "echo $STARTUP_B64 | base64 -d > /startup.sh && chmod +x /startup.sh && bash /startup.sh"
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "p1" })))
        .expect(1)
        .mount(&server)
        .await;

    let pod = provider.create_pod(req).await.unwrap();
    assert_eq!(pod.id, "p1");
}

#[tokio::test]
async fn test_create_without_id_surfaces_body() {
    let (server, provider) = setup().await;
    Mock::given(method("POST"))
        .and(path("/pods"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "message": "no capacity in EU-RO-1" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = provider
        .create_pod(create_request("chandra"))
        .await
        .unwrap_err();
    match err {
        PodProviderError::MissingId(body) => assert!(body.contains("no capacity in EU-RO-1")),
        other => panic!("expected MissingId, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_non_json_body_is_shown_raw() {
    let (server, provider) = setup().await;
    Mock::given(method("POST"))
        .and(path("/pods"))
        .respond_with(ResponseTemplate::new(200).set_body_string("gateway hiccup"))
        .mount(&server)
        .await;

    let err = provider
        .create_pod(create_request("chandra"))
        .await
        .unwrap_err();
    assert!(matches!(err, PodProviderError::MissingId(body) if body == "gateway hiccup"));
}

#[tokio::test]
async fn test_create_http_error_carries_message() {
    let (server, provider) = setup().await;
    Mock::given(method("POST"))
        .and(path("/pods"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid gpuTypeIds" })),
        )
        .mount(&server)
        .await;

    let err = provider
        .create_pod(create_request("olmocr"))
        .await
        .unwrap_err();
    match err {
        PodProviderError::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "invalid gpuTypeIds");
        }
        other => panic!("expected Api, got {other:?}"),
    }
}

// ============================================================================
// List / get
// ============================================================================

#[tokio::test]
async fn test_list_empty() {
    let (server, provider) = setup().await;
    Mock::given(method("GET"))
        .and(path("/pods"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let pods = provider.list_pods().await.unwrap();
    assert!(pods.is_empty());
    assert_eq!(render_pod_list(&pods), NO_PODS);
}

#[tokio::test]
async fn test_list_renders_each_pod() {
    let (server, provider) = setup().await;
    Mock::given(method("GET"))
        .and(path("/pods"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": "aaa111",
                "name": "vlm-qwen3-vl",
                "desiredStatus": "RUNNING",
                "machine": { "gpuDisplayName": "L40S" }
            },
            { "id": "bbb222", "name": "vlm-chandra", "desiredStatus": "EXITED" }
        ])))
        .mount(&server)
        .await;

    let pods = provider.list_pods().await.unwrap();
    assert_eq!(pods.len(), 2);
    assert_eq!(pods[0].gpu.as_deref(), Some("L40S"));
    assert!(pods[1].status.is_startable());

    let rendered = render_pod_list(&pods);
    assert!(rendered.contains("https://aaa111-8000.proxy.runpod.net/v1"));
    assert!(rendered.contains("https://bbb222-3000.proxy.runpod.net"));
    assert!(rendered.contains("vlm-chandra"));
}

#[tokio::test]
async fn test_get_unknown_pod_is_not_found() {
    let (server, provider) = setup().await;
    Mock::given(method("GET"))
        .and(path("/pods/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "not found" })))
        .mount(&server)
        .await;

    let err = provider.get_pod("missing").await.unwrap_err();
    assert!(matches!(err, PodProviderError::NotFound(id) if id == "missing"));
}

// ============================================================================
// Start / stop / delete
// ============================================================================

#[tokio::test]
async fn test_start_sends_post() {
    let (server, provider) = setup().await;
    Mock::given(method("POST"))
        .and(path("/pods/p1/start"))
        .and(header("authorization", "Bearer rp_test_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "p1" })))
        .expect(1)
        .mount(&server)
        .await;

    provider.start_pod("p1").await.unwrap();
}

#[tokio::test]
async fn test_start_error_field_is_reported_verbatim() {
    let (server, provider) = setup().await;
    Mock::given(method("POST"))
        .and(path("/pods/p1/start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": "There are not enough free GPUs on the host machine to start this pod."
        })))
        .mount(&server)
        .await;

    let err = provider.start_pod("p1").await.unwrap_err();
    assert!(matches!(
        err,
        PodProviderError::Provider(msg)
            if msg == "There are not enough free GPUs on the host machine to start this pod."
    ));
}

#[tokio::test]
async fn test_stop_keeps_pod() {
    let (server, provider) = setup().await;
    Mock::given(method("POST"))
        .and(path("/pods/p1/stop"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = provider.halt_pod("p1", false).await.unwrap();
    assert_eq!(outcome, HaltOutcome::Stopped);
    let message = render_halt(outcome, "p1");
    assert!(message.contains("volume is retained"));
    assert!(message.contains("pods start p1"));
}

#[tokio::test]
async fn test_stop_with_delete_removes_pod() {
    let (server, provider) = setup().await;
    Mock::given(method("DELETE"))
        .and(path("/pods/p1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = provider.halt_pod("p1", true).await.unwrap();
    assert_eq!(outcome, HaltOutcome::Deleted);
    assert!(render_halt(outcome, "p1").contains("permanently deleted"));
}

#[tokio::test]
async fn test_stop_invalid_id_is_not_found() {
    let (server, provider) = setup().await;
    Mock::given(method("POST"))
        .and(path("/pods/nope/stop"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = provider.stop_pod("nope").await.unwrap_err();
    assert!(matches!(err, PodProviderError::NotFound(id) if id == "nope"));
}

#[tokio::test]
async fn test_server_error_is_api_error() {
    let (server, provider) = setup().await;
    Mock::given(method("POST"))
        .and(path("/pods/p1/stop"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream failure"))
        .expect(1)
        .mount(&server)
        .await;

    let err = provider.stop_pod("p1").await.unwrap_err();
    match err {
        PodProviderError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "upstream failure");
        }
        other => panic!("expected Api, got {other:?}"),
    }
}
