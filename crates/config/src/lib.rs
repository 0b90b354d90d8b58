//! Shared configuration for RunPod model deployments.
//!
//! Two concerns live here:
//!
//! - [`Settings`]: credentials and overrides read once per invocation from the
//!   environment (optionally seeded from a `.env` file). The value is immutable
//!   and passed explicitly to every operation.
//! - [`ModelProfile`]: the static, documented deployment settings of each
//!   supported vision-language model (image, GPU preference order, vLLM flags).
//!
//! # Example
//!
//! ```no_run
//! use pod_config::{profile, EnvSource, Requirement, Settings};
//!
//! pod_config::load_dotenv(None)?;
//! let settings = Settings::load(&EnvSource, Requirement::Deploy)?;
//! let qwen = profile::find("qwen3-vl").expect("built-in profile");
//! println!("{} -> {:?}", qwen.name, settings.network_volume(qwen));
//! # Ok::<(), pod_config::ConfigError>(())
//! ```

pub mod error;
pub mod profile;
pub mod settings;

pub use error::ConfigError;
pub use profile::{EngineSettings, InferenceSettings, ModelProfile};
pub use settings::{load_dotenv, ConfigSource, EnvSource, MapSource, Requirement, Settings};
