//! Configuration persistence
//!
//! `AppConfig` lives in lapse-types; this module only knows where confy keeps it.

use std::path::PathBuf;

pub use lapse_types::AppConfig;

use crate::error::ConfigError;

const APP_NAME: &str = "lapse";
const CONFIG_NAME: &str = "config";

/// Load the configuration, writing the defaults out on first use.
pub fn load() -> Result<AppConfig, ConfigError> {
    confy::load(APP_NAME, CONFIG_NAME).map_err(ConfigError::Load)
}

/// Load the configuration, falling back to the defaults if it cannot be read.
pub fn load_or_default() -> AppConfig {
    load().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "Using default configuration");
        AppConfig::default()
    })
}

pub fn path() -> Result<PathBuf, ConfigError> {
    confy::get_configuration_file_path(APP_NAME, CONFIG_NAME).map_err(ConfigError::Locate)
}
