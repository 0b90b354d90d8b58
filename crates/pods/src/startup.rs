//! Rendering of the default boot script.
//!
//! The script is the shell form of the `pod-boot` sequence, so it runs on
//! stock images that have nothing but bash, curl and Python. Every value that
//! reaches a command line is single-quoted.

use handlebars::Handlebars;
use pod_config::profile::{ModelProfile, CACHE_MARKER, UI_PORT};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

const TEMPLATE_NAME: &str = "startup";
const TEMPLATE: &str = include_str!("../templates/startup.sh.hbs");

/// Default readiness poll interval in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Errors raised while rendering the boot script.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid startup template: {0}")]
    Template(#[from] Box<handlebars::TemplateError>),

    #[error("failed to render startup script: {0}")]
    Render(#[from] handlebars::RenderError),
}

/// Knobs of the rendered script that are not part of the profile.
#[derive(Debug, Clone, Copy)]
pub struct StartupOptions {
    /// Seconds between readiness probes.
    pub poll_interval_secs: u64,
    /// Require a login on the web UI.
    pub enable_ui_auth: bool,
}

impl Default for StartupOptions {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            enable_ui_auth: false,
        }
    }
}

/// Quote `value` for a POSIX shell.
#[must_use]
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn quote_all<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|v| shell_quote(v.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render the boot script for `profile`.
///
/// # Errors
/// Returns an error if the template fails to compile or render.
pub fn render_startup_script(
    profile: &ModelProfile,
    options: &StartupOptions,
) -> Result<String, StartupError> {
    let mut hb = Handlebars::new();
    hb.set_strict_mode(true);
    hb.register_escape_fn(handlebars::no_escape);
    hb.register_template_string(TEMPLATE_NAME, TEMPLATE)
        .map_err(Box::new)?;

    let model_dir = profile.model_dir();
    let context = json!({
        "profile": profile.name,
        "model_repo": shell_quote(profile.model_repo),
        "model_dir": shell_quote(&model_dir),
        "log_dir": shell_quote(&profile.log_dir()),
        "ui_data_dir": shell_quote(&profile.ui_data_dir()),
        "hf_home": shell_quote(&profile.hf_home()),
        "server_log": profile.server_log_name(),
        "marker": CACHE_MARKER,
        "pip_packages": quote_all(profile.pip_packages),
        "server_args": quote_all(profile.server_args(&model_dir)),
        "port": profile.engine.port,
        "ui_port": UI_PORT,
        "poll_interval": options.poll_interval_secs.max(1),
        "ui_auth": options.enable_ui_auth,
        "webui_auth": if options.enable_ui_auth { "True" } else { "False" },
    });

    let script = hb.render(TEMPLATE_NAME, &context)?;
    debug!(profile = profile.name, bytes = script.len(), "rendered startup script");
    Ok(script)
}
