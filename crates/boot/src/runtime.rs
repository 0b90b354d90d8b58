//! Side effects of a boot: filesystem, installers and child processes.

use std::fs::OpenOptions;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::error::BootError;
use crate::plan::BootPlan;

/// Operations the orchestrator performs on the machine.
#[async_trait]
pub trait BootRuntime: Send {
    /// Create the plan's working directories.
    async fn ensure_dirs(&mut self, plan: &BootPlan) -> Result<(), BootError>;

    /// Install the Python packages.
    async fn install_dependencies(&mut self, plan: &BootPlan) -> Result<(), BootError>;

    /// Download the model weights into the model directory.
    async fn download_model(&mut self, plan: &BootPlan) -> Result<(), BootError>;

    /// Launch the inference server in the background.
    async fn spawn_server(&mut self, plan: &BootPlan) -> Result<(), BootError>;

    /// Fail if the inference server has exited.
    fn check_server(&mut self) -> Result<(), BootError>;

    /// Launch the web UI in the background.
    async fn spawn_ui(&mut self, plan: &BootPlan) -> Result<(), BootError>;

    /// Follow the server log. Returns only when following ends.
    async fn follow_logs(&mut self, plan: &BootPlan) -> Result<(), BootError>;
}

/// Runs everything for real with `tokio::process`.
#[derive(Default)]
pub struct SystemRuntime {
    server: Option<Child>,
    ui: Option<Child>,
}

impl SystemRuntime {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Run `cmd` to completion, failing on a non-zero exit.
async fn run_step(step: &str, program: &str, cmd: &mut Command) -> Result<(), BootError> {
    info!(step, program, "running");
    let status = cmd.status().await.map_err(|source| BootError::Spawn {
        program: program.to_string(),
        source,
    })?;
    if !status.success() {
        return Err(BootError::CommandFailed {
            step: step.to_string(),
            status: status.to_string(),
        });
    }
    Ok(())
}

/// `huggingface-cli download` for the plan. The token goes in the
/// environment, never in argv.
fn download_command(plan: &BootPlan) -> Command {
    let mut cmd = Command::new("huggingface-cli");
    cmd.arg("download")
        .arg(&plan.model_repo)
        .arg("--local-dir")
        .arg(&plan.model_dir)
        .env("HF_HOME", &plan.hf_home);
    if let Some(token) = &plan.hf_token {
        cmd.env("HF_TOKEN", token);
    }
    cmd
}

/// Open `path` for appending, as stdout and stderr handles.
fn log_handles(path: &Path) -> Result<(Stdio, Stdio), BootError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| BootError::io(format!("failed to open log {}", path.display()), e))?;
    let err = file
        .try_clone()
        .map_err(|e| BootError::io(format!("failed to open log {}", path.display()), e))?;
    Ok((Stdio::from(file), Stdio::from(err)))
}

#[async_trait]
impl BootRuntime for SystemRuntime {
    async fn ensure_dirs(&mut self, plan: &BootPlan) -> Result<(), BootError> {
        for dir in plan.directories() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| BootError::io(format!("failed to create {}", dir.display()), e))?;
        }
        Ok(())
    }

    async fn install_dependencies(&mut self, plan: &BootPlan) -> Result<(), BootError> {
        run_step(
            "install dependencies",
            "pip",
            Command::new("python")
                .args(["-m", "pip", "install", "--no-cache-dir", "--upgrade"])
                .args(&plan.pip_packages),
        )
        .await
    }

    async fn download_model(&mut self, plan: &BootPlan) -> Result<(), BootError> {
        run_step("download model", "huggingface-cli", &mut download_command(plan)).await
    }

    async fn spawn_server(&mut self, plan: &BootPlan) -> Result<(), BootError> {
        let (stdout, stderr) = log_handles(&plan.server_log)?;
        let child = Command::new("python")
            .args(["-m", "vllm.entrypoints.openai.api_server"])
            .args(&plan.server_args)
            .env("HF_HOME", &plan.hf_home)
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|source| BootError::Spawn {
                program: "vllm".to_string(),
                source,
            })?;
        info!(pid = ?child.id(), log = %plan.server_log.display(), "inference server launched");
        self.server = Some(child);
        Ok(())
    }

    fn check_server(&mut self) -> Result<(), BootError> {
        let Some(child) = self.server.as_mut() else {
            return Err(BootError::ServerExited("never started".to_string()));
        };
        match child.try_wait() {
            Ok(None) => Ok(()),
            Ok(Some(status)) => Err(BootError::ServerExited(status.to_string())),
            Err(e) => Err(BootError::io("failed to poll inference server", e)),
        }
    }

    async fn spawn_ui(&mut self, plan: &BootPlan) -> Result<(), BootError> {
        let (stdout, stderr) = log_handles(&plan.ui_log)?;
        let child = Command::new("open-webui")
            .args(["serve", "--host", "0.0.0.0", "--port"])
            .arg(plan.ui_port.to_string())
            .env("WEBUI_AUTH", if plan.enable_ui_auth { "True" } else { "False" })
            .env("DATA_DIR", &plan.ui_data_dir)
            .env("OPENAI_API_BASE_URL", &plan.api_base_url)
            .env("OPENAI_API_KEY", "none")
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|source| BootError::Spawn {
                program: "open-webui".to_string(),
                source,
            })?;
        info!(pid = ?child.id(), port = plan.ui_port, "web UI launched");
        self.ui = Some(child);
        Ok(())
    }

    async fn follow_logs(&mut self, plan: &BootPlan) -> Result<(), BootError> {
        let mut tail = Command::new("tail")
            .arg("-F")
            .arg(&plan.server_log)
            .spawn()
            .map_err(|source| BootError::Spawn {
                program: "tail".to_string(),
                source,
            })?;

        let Some(server) = self.server.as_mut() else {
            return Err(BootError::ServerExited("never started".to_string()));
        };
        tokio::select! {
            status = server.wait() => {
                if let Err(e) = tail.kill().await {
                    debug!(error = %e, "failed to stop log follower");
                }
                let status = status.map_err(|e| BootError::io("failed to wait for inference server", e))?;
                warn!(%status, "inference server exited");
                Err(BootError::ServerExited(status.to_string()))
            }
            status = tail.wait() => {
                let status = status.map_err(|e| BootError::io("failed to wait for tail", e))?;
                warn!(%status, "log follower exited");
                Ok(())
            }
        }
    }
}
