//! Pod lifecycle tooling for vision-language models on RunPod.
//!
//! Each model runs in its own GPU pod: vLLM serves an OpenAI-compatible API on
//! port 8000 and Open WebUI serves a chat UI on port 3000, both reachable
//! through the provider's proxy:
//!
//! ```text
//!   operator                      RunPod                         pod
//! ┌──────────┐  POST /pods   ┌──────────────┐  start cmd  ┌─────────────────┐
//! │ pods CLI │──────────────►│  REST API    │────────────►│ startup.sh      │
//! │          │  start/stop   │              │             │  ├─ pip install │
//! │          │──────────────►│              │             │  ├─ download    │
//! └──────────┘               └──────────────┘             │  ├─ vLLM :8000  │
//!      │                                                  │  ├─ wait ready  │
//!      │  ask / ocr   https://{id}-8000.proxy.runpod.net  │  └─ WebUI :3000 │
//!      └─────────────────────────────────────────────────►└─────────────────┘
//! ```
//!
//! The boot script travels base64-encoded in the `STARTUP_B64` environment
//! variable (see [`payload`]) so shell metacharacters never meet the JSON
//! request body.
//!
//! ## Example
//!
//! ```ignore
//! use pods::providers::runpod::RunPod;
//! use pods::providers::PodProvider;
//!
//! let provider = RunPod::new(settings.api_key())?;
//! for pod in provider.list_pods().await? {
//!     println!("{} {} {}", pod.id, pod.status, pod.urls.api);
//! }
//! ```

pub mod deploy;
pub mod inference;
pub mod output;
pub mod payload;
pub mod providers;
pub mod startup;

pub use payload::{decode_payload, encode_payload, StartupPayload};
pub use providers::runpod;
pub use providers::traits::{
    CreatePodRequest, HaltOutcome, Pod, PodProvider, PodProviderError, PodStatus, PodVolume,
    ServiceUrls,
};
