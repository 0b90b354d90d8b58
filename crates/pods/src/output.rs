//! Human-readable rendering of command results.
//!
//! Everything here returns a `String` so the binary only prints.

use std::fmt::Write as _;

use pod_config::profile::ModelProfile;

use crate::providers::traits::{CreatePodRequest, HaltOutcome, Pod, PodStatus, PodVolume};

/// Shown by `list` when the account has no pods.
pub const NO_PODS: &str = "No active pods.";

fn status_emoji(status: PodStatus) -> &'static str {
    match status {
        PodStatus::Running => "🟢",
        PodStatus::Created | PodStatus::Restarting => "🟡",
        PodStatus::Exited | PodStatus::Paused => "🔴",
        PodStatus::Dead | PodStatus::Terminated => "⚫",
        PodStatus::Unknown => "⚪",
    }
}

/// Table of pods, one block per pod with its derived URLs.
#[must_use]
pub fn render_pod_list(pods: &[Pod]) -> String {
    if pods.is_empty() {
        return NO_PODS.to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "\n{:<20} {:<25} {:<14} {:<20}",
        "ID", "NAME", "STATUS", "GPU"
    );
    let _ = writeln!(out, "{}", "-".repeat(82));
    for pod in pods {
        let _ = writeln!(
            out,
            "{:<20} {:<25} {} {:<11} {:<20}",
            pod.id,
            pod.name,
            status_emoji(pod.status),
            pod.status,
            pod.gpu.as_deref().unwrap_or("N/A")
        );
        let _ = writeln!(out, "{:<46} API:   {}", "", pod.urls.api);
        let _ = writeln!(out, "{:<46} WebUI: {}", "", pod.urls.ui);
    }
    out
}

/// Summary printed after a successful create.
#[must_use]
pub fn render_created(pod: &Pod, profile: &ModelProfile) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n✅ Pod created successfully!");
    let _ = writeln!(out, "   ID:     {}", pod.id);
    let _ = writeln!(out, "   Name:   {}", pod.name);
    let _ = writeln!(out, "   Status: {}", pod.status);
    let _ = writeln!(out, "\n🌐 Endpoints (ready a few minutes after boot):");
    let _ = writeln!(out, "   API:    {}", pod.urls.api);
    let _ = writeln!(out, "   WebUI:  {}", pod.urls.ui);
    let _ = writeln!(out, "\n📋 Logs on the pod:");
    let _ = writeln!(
        out,
        "   Server: {}/{}",
        profile.log_dir(),
        profile.server_log_name()
    );
    let _ = writeln!(out, "   WebUI:  {}/webui.log", profile.log_dir());
    let _ = writeln!(
        out,
        "\n💡 Set {}={} to use `pods ask` and `pods ocr`",
        profile.pod_id_var(),
        pod.id
    );
    let _ = writeln!(out, "💡 Stop it with `pods stop {}`", pod.id);
    out
}

/// Pre-flight summary of a create request.
#[must_use]
pub fn render_create_plan(req: &CreatePodRequest) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "🚀 Creating pod '{}'", req.name);
    let _ = writeln!(out, "   GPUs:       {}", req.gpu_types.join(" > "));
    let _ = writeln!(
        out,
        "   Datacenter: {}",
        req.datacenter.as_deref().unwrap_or("any")
    );
    let _ = writeln!(out, "   Image:      {}", req.image);
    match &req.volume {
        PodVolume::Network { id } => {
            let _ = writeln!(out, "   Volume:     network volume {id}");
        }
        PodVolume::Local { size_gb } => {
            let _ = writeln!(
                out,
                "   Volume:     new {size_gb} GB at {}",
                req.volume_mount_path
            );
        }
    }
    out
}

/// Message for a completed stop or delete.
#[must_use]
pub fn render_halt(outcome: HaltOutcome, id: &str) -> String {
    match outcome {
        HaltOutcome::Deleted => format!(
            "\n✅ Pod {id} permanently deleted. Its local volume is gone; network volumes are kept."
        ),
        HaltOutcome::Stopped => format!(
            "\n✅ Pod {id} stopped. Billing for GPU time has stopped and the volume is retained.\n\
             💡 Resume it with `pods start {id}`\n\
             💡 Delete it permanently with `pods stop {id} --delete`"
        ),
    }
}

/// Message for an accepted start request.
#[must_use]
pub fn render_started(id: &str) -> String {
    format!(
        "\n✅ Start requested for pod {id}.\n\
         💡 The model reloads from the volume cache; check progress with `pods list`"
    )
}

/// Table of built-in profiles.
#[must_use]
pub fn render_profiles(profiles: &[ModelProfile]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n🎮 Model profiles");
    let _ = writeln!(out, "{}", "=".repeat(70));
    for p in profiles {
        let _ = writeln!(out, "\n{} ({})", p.name, p.model_repo);
        let _ = writeln!(out, "   GPUs:    {}", p.gpu_types.join(" > "));
        let _ = writeln!(
            out,
            "   Context: {} tokens | Batch: {} seqs | dtype: {}",
            p.engine.max_model_len, p.engine.max_num_seqs, p.engine.dtype
        );
        let _ = writeln!(
            out,
            "   Disk:    {} GB container + {} GB volume (or ${})",
            p.container_disk_gb,
            p.volume_gb,
            p.network_volume_var()
        );
        let _ = writeln!(out, "   Pod id:  ${}", p.pod_id_var());
    }
    out
}
