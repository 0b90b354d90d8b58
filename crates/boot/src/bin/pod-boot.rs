//! pod-boot - boot a model profile inside its pod.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pod_boot::{BootPlan, HttpProbe, Orchestrator, PollPolicy, SystemRuntime};
use pod_config::{profile, EnvSource, Requirement, Settings};

/// Install, download, serve and gate the web UI on server readiness.
#[derive(Parser)]
#[command(name = "pod-boot")]
#[command(version)]
#[command(about = "Boot vLLM and Open WebUI for a model profile")]
struct Cli {
    /// Model profile to boot.
    #[arg(long, env = "MODEL_PROFILE")]
    profile: String,

    /// Persistent volume mount.
    #[arg(long, default_value = "/workspace")]
    workspace: PathBuf,

    /// Seconds between readiness probes.
    #[arg(long, default_value = "5")]
    poll_interval_secs: u64,

    /// Abort if the server is not ready after this many seconds (default: wait forever).
    #[arg(long)]
    ready_timeout_secs: Option<u64>,

    /// Require a login on Open WebUI.
    #[arg(long, env = "POD_BOOT_UI_AUTH", default_value = "false")]
    enable_ui_auth: bool,

    /// Enable verbose logging.
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let profile = profile::resolve(&cli.profile)?;
    let settings =
        Settings::load(&EnvSource, Requirement::Inference).context("Configuration error")?;
    let plan = BootPlan::new(
        profile,
        &cli.workspace,
        settings.hf_token().map(ToString::to_string),
        cli.enable_ui_auth,
    );

    let policy = PollPolicy {
        interval: Duration::from_secs(cli.poll_interval_secs.max(1)),
        timeout: cli.ready_timeout_secs.map(Duration::from_secs),
    };
    let probe = HttpProbe::new(plan.health_url.clone()).context("Failed to create health probe")?;

    let mut orchestrator = Orchestrator::new(SystemRuntime::new(), probe, policy);
    orchestrator
        .run(&plan)
        .await
        .with_context(|| format!("boot failed at stage {}", orchestrator.stage()))?;
    Ok(())
}
