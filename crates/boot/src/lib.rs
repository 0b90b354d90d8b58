//! In-pod boot orchestrator.
//!
//! Runs once at container start:
//!
//! 1. create working directories
//! 2. install Python dependencies
//! 3. download the model unless the cache marker is present
//! 4. launch vLLM in the background
//! 5. poll `/v1/models` until it answers (the readiness gate)
//! 6. launch Open WebUI against the ready API
//! 7. follow the server log until the container stops
//!
//! Side effects live behind [`BootRuntime`] and the readiness check behind
//! [`HealthProbe`], so the sequence runs in tests without processes or sleeps.

pub mod error;
pub mod orchestrator;
pub mod plan;
pub mod readiness;
pub mod runtime;
pub mod stage;

pub use error::BootError;
pub use orchestrator::Orchestrator;
pub use plan::BootPlan;
pub use readiness::{wait_ready, HealthProbe, HttpProbe, PollPolicy};
pub use runtime::{BootRuntime, SystemRuntime};
pub use stage::BootStage;
