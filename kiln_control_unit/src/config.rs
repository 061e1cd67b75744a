//! TOML configuration loader with validation.
//!
//! Parses [`ControllerConfig`] from a TOML file, runs the bounds checks,
//! and hands the validated bundle to the supervisor. A string-loading
//! variant exists for tests.

use std::path::Path;

use kiln_common::config::ControllerConfig;

/// Configuration loading/validation error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(String),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config validation: {0}")]
    Validation(String),
}

/// Load and validate the controller configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ControllerConfig, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("failed to read {}: {e}", path.display())))?;
    load_config_from_str(&text)
}

/// Load config from a TOML string (for testing).
pub fn load_config_from_str(toml_text: &str) -> Result<ControllerConfig, ConfigError> {
    let config: ControllerConfig = toml::from_str(toml_text)?;
    config.validate().map_err(ConfigError::Validation)?;
    Ok(config)
}

// ─── Tests ──────────────────────────────────────────────────────────
