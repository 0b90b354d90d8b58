//! RunPod pod provider.
//!
//! Implements the [`PodProvider`](crate::providers::PodProvider) trait
//! against the RunPod REST API (`https://rest.runpod.io/v1`):
//!
//! | operation | request |
//! |-----------|---------|
//! | create    | `POST /pods` |
//! | list      | `GET /pods` |
//! | get       | `GET /pods/{id}` |
//! | start     | `POST /pods/{id}/start` |
//! | stop      | `POST /pods/{id}/stop` |
//! | delete    | `DELETE /pods/{id}` |
//!
//! Every call carries `Authorization: Bearer <api key>` and is attempted once.
//!
//! Services in a pod are reachable through the provider proxy at
//! `https://{pod_id}-{port}.proxy.runpod.net`.

mod client;
mod models;

pub use client::{pretty_body, RunPod};
pub use models::*;

pub use pod_config::settings::DEFAULT_API_URL;

use pod_config::profile::{INFERENCE_PORT, UI_PORT};

use crate::providers::traits::ServiceUrls;

/// Proxy URL of `port` in pod `pod_id`.
#[must_use]
pub fn proxy_url(pod_id: &str, port: u16) -> String {
    format!("https://{pod_id}-{port}.proxy.runpod.net")
}

/// Derived API and UI endpoints of a pod.
#[must_use]
pub fn service_urls(pod_id: &str) -> ServiceUrls {
    ServiceUrls {
        api: format!("{}/v1", proxy_url(pod_id, INFERENCE_PORT)),
        ui: proxy_url(pod_id, UI_PORT),
    }
}
