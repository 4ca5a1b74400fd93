//! Logging bootstrap for provider binaries
//!
//! The host captures the plugin's stderr, so log lines must never go to
//! stdout. Verbosity follows `TF_LOG` the same way Terraform's own logs do.

use crate::error::{Result, TfplugError};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "TF_LOG";

const DEFAULT_FILTER: &str = "info";

/// Translates a `TF_LOG` value into a filter directive. Terraform's level
/// names are accepted in any case; anything else is passed through as a
/// tracing directive (e.g. `google=debug`).
pub fn filter_directive(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        None | Some("") => DEFAULT_FILTER.to_string(),
        Some(level) => match level.to_ascii_lowercase().as_str() {
            "json" => "trace".to_string(),
            "off" => "off".to_string(),
            lower @ ("trace" | "debug" | "info" | "warn" | "error") => lower.to_string(),
            _ => level.to_string(),
        },
    }
}

/// Installs the global fmt subscriber. Fails if one is already installed.
pub fn init() -> Result<()> {
    let directive = filter_directive(std::env::var(LOG_ENV).ok().as_deref());
    let filter = EnvFilter::try_new(&directive)
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .map_err(|e| TfplugError::LoggingError(e.to_string()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|e| TfplugError::LoggingError(e.to_string()))
}
