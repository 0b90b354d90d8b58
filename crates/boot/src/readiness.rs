//! Readiness gate.
//!
//! The web UI must not start before the inference server answers. The wait is
//! a fixed-interval poll with an optional deadline; without one it waits
//! forever, since a large model on a slow volume can take many minutes to load.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::BootError;

/// Default pause between probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Give up after this long. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }
}

/// A single readiness check.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// `true` once the service answers.
    async fn probe(&self) -> bool;
}

/// Probes an HTTP endpoint. Any response, whatever its status, counts as ready.
pub struct HttpProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpProbe {
    /// # Errors
    /// Returns error if HTTP client cannot be created.
    pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn probe(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(resp) => {
                debug!(url = %self.url, status = resp.status().as_u16(), "health probe answered");
                true
            }
            Err(e) => {
                debug!(url = %self.url, error = %e, "health probe failed");
                false
            }
        }
    }
}

/// Poll `probe` until it succeeds, returning the number of probes made.
///
/// `alive` runs after every failed probe; an error from it (typically the
/// server process having exited) ends the wait.
///
/// # Errors
/// Returns [`BootError::ReadinessTimeout`] when the policy's deadline passes,
/// or whatever `alive` returns.
pub async fn wait_ready<P, F>(probe: &P, policy: PollPolicy, mut alive: F) -> Result<u32, BootError>
where
    P: HealthProbe + ?Sized,
    F: FnMut() -> Result<(), BootError>,
{
    let start = Instant::now();
    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        if probe.probe().await {
            info!(attempts, elapsed = ?start.elapsed(), "inference server ready");
            return Ok(attempts);
        }
        alive()?;

        if let Some(timeout) = policy.timeout {
            let waited = start.elapsed();
            if waited >= timeout {
                return Err(BootError::ReadinessTimeout { attempts, waited });
            }
        }
        if attempts % 12 == 0 {
            info!(attempts, elapsed = ?start.elapsed(), "still waiting for inference server");
        }
        tokio::time::sleep(policy.interval).await;
    }
}
