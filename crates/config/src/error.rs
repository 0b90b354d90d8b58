//! Configuration error types.

use thiserror::Error;

/// Errors raised while loading settings or resolving profiles.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required value is absent or empty.
    #[error("{0} is missing (set it in the environment or in .env)")]
    Missing(String),

    /// No built-in profile carries this name.
    #[error("unknown model profile '{name}', available: {available}")]
    UnknownProfile { name: String, available: String },

    /// The `.env` file exists but could not be read.
    #[error("failed to load env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
}
