//! Boot errors.

use std::time::Duration;

use thiserror::Error;

/// Errors that abort a boot.
///
/// There is no resume: a failed boot is retried by restarting the container.
#[derive(Debug, Error)]
pub enum BootError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{step} failed with {status}")]
    CommandFailed { step: String, status: String },

    #[error("inference server not ready after {attempts} probes ({waited:?})")]
    ReadinessTimeout { attempts: u32, waited: Duration },

    #[error("inference server exited: {0}")]
    ServerExited(String),
}

impl BootError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
