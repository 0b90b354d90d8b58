//! The boot sequence.

use tracing::{info, warn};

use crate::error::BootError;
use crate::plan::BootPlan;
use crate::readiness::{wait_ready, HealthProbe, PollPolicy};
use crate::runtime::BootRuntime;
use crate::stage::BootStage;

/// Runs one boot: install, fetch, serve, wait, UI, follow.
///
/// Strictly sequential. Any error aborts the boot at the current stage.
pub struct Orchestrator<R, P> {
    runtime: R,
    probe: P,
    policy: PollPolicy,
    stage: BootStage,
}

impl<R: BootRuntime, P: HealthProbe> Orchestrator<R, P> {
    pub fn new(runtime: R, probe: P, policy: PollPolicy) -> Self {
        Self {
            runtime,
            probe,
            policy,
            stage: BootStage::Unstarted,
        }
    }

    /// Last stage reached.
    pub fn stage(&self) -> BootStage {
        self.stage
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    fn advance(&mut self, stage: BootStage) {
        debug_assert!(stage > self.stage);
        info!(from = %self.stage, to = %stage, "boot stage");
        self.stage = stage;
    }

    /// Run the whole sequence. Returns when log following ends.
    ///
    /// # Errors
    /// Returns the first failing step's error.
    pub async fn run(&mut self, plan: &BootPlan) -> Result<(), BootError> {
        info!(profile = plan.profile, repo = %plan.model_repo, "boot starting");

        self.runtime.ensure_dirs(plan).await?;
        self.runtime.install_dependencies(plan).await?;
        self.advance(BootStage::DependenciesInstalled);

        if plan.is_cached() {
            info!(dir = %plan.model_dir.display(), "model cache hit, skipping download");
        } else {
            info!(repo = %plan.model_repo, dir = %plan.model_dir.display(), "downloading model");
            self.runtime.download_model(plan).await?;
        }
        self.advance(BootStage::ModelReady);

        self.runtime.spawn_server(plan).await?;
        self.advance(BootStage::ServerStarting);

        let runtime = &mut self.runtime;
        let attempts = wait_ready(&self.probe, self.policy, || runtime.check_server()).await?;
        info!(attempts, "readiness gate passed");
        self.advance(BootStage::ServerReady);

        if !plan.enable_ui_auth {
            warn!("web UI authentication is disabled; anyone with the proxy URL can use it");
        }
        self.runtime.spawn_ui(plan).await?;
        self.advance(BootStage::UiStarted);

        self.advance(BootStage::Steady);
        self.runtime.follow_logs(plan).await
    }
}
