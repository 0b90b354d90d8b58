//! Boot stages.

use std::fmt;

/// Progress of one boot. Stages only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BootStage {
    Unstarted,
    DependenciesInstalled,
    ModelReady,
    ServerStarting,
    ServerReady,
    UiStarted,
    /// Following the server log until the container stops.
    Steady,
}

impl fmt::Display for BootStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unstarted => "unstarted",
            Self::DependenciesInstalled => "dependencies_installed",
            Self::ModelReady => "model_ready",
            Self::ServerStarting => "server_starting",
            Self::ServerReady => "server_ready",
            Self::UiStarted => "ui_started",
            Self::Steady => "steady",
        };
        f.pad(name)
    }
}
