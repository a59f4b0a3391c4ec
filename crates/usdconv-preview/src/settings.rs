//! Settings for the `usd-preview` binary.

use std::path::Path;

use serde::{Deserialize, Serialize};
use validator::Validate;

use plugin_usd_converter::ConverterConfig;
use plugin_usd_converter::config::BLENDER_PATH_ENV;
use usdconv_core::config::{AssetStoreConfig, ConfigLoader, LoggingConfig};
use usdconv_core::result::AppResult;

/// Converter, asset store and logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Settings {
    /// Converter settings.
    #[validate(nested)]
    pub converter: ConverterConfig,
    /// Asset platform settings.
    #[validate(nested)]
    pub asset_store: AssetStoreConfig,
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

#[cfg(test)]
mod tests {
    use super::*;
    use usdconv_core::config::AssetStoreProvider;

    #[test]
    fn test_load_local_store_settings() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("items");
        let path = temp.path().join("usd-preview.toml");
        std::fs::write(
            &path,
            format!(
                "[converter]\ntimeout_seconds = 42\n\n[asset_store]\nprovider = \"local\"\nlocal_root = {:?}\npublish_previews = true\n",
                root.display().to_string()
            ),
        )
        .expect("write");

        let settings = Settings::load(Some(&path)).expect("load");
        assert_eq!(settings.converter.timeout_seconds, 42);
        assert_eq!(settings.asset_store.provider, AssetStoreProvider::Local);
        assert_eq!(settings.asset_store.local_root, Some(root));
        assert!(settings.asset_store.publish_previews);
    }

    #[test]
    fn test_invalid_request_timeout_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("bad.toml");
        std::fs::write(&path, "[asset_store]\nrequest_timeout_seconds = 0\n").expect("write");
        assert!(Settings::load(Some(&path)).is_err());
    }
}
