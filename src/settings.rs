//! Root settings for the `usd-to-gltf` binary.

use std::path::Path;

use serde::{Deserialize, Serialize};
use validator::Validate;

use plugin_usd_converter::ConverterConfig;
use plugin_usd_converter::config::BLENDER_PATH_ENV;
use usdconv_core::config::{ConfigLoader, LoggingConfig};
use usdconv_core::result::AppResult;

/// Settings loaded from `config/default.toml`, `--config`, `USDCONV_*`
/// variables and `BLENDER_PATH`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Settings {
    /// Converter settings.
    #[validate(nested)]
    pub converter: ConverterConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl Settings {
    /// Load settings, optionally layering an explicit file.
    pub fn load(config_file: Option<&Path>) -> AppResult<Self> {
        ConfigLoader::new()
            .with_file(config_file)
            .with_override("converter.blender_path", std::env::var(BLENDER_PATH_ENV).ok())
            .load()
    }
}
