//! Configuration loading.
//!
//! Each binary defines its own root settings struct and loads it through
//! [`ConfigLoader`], which merges (lowest to highest precedence):
//!
//! 1. `config/default.toml` (optional)
//! 2. an explicit file passed on the command line (required when given)
//! 3. environment variables prefixed with `USDCONV_` (`__` separates nesting)
//! 4. explicit overrides registered by the caller (e.g. `BLENDER_PATH`)

pub mod asset;
pub mod logging;

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;
use validator::Validate;

use crate::error::AppError;
use crate::result::AppResult;

pub use self::asset::{AssetStoreConfig, AssetStoreProvider};
pub use self::logging::LoggingConfig;

/// Default environment variable prefix.
pub const ENV_PREFIX: &str = "USDCONV";

/// Builder for layered configuration.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Base name of the optional defaults file.
    defaults: String,
    /// Explicit configuration file.
    file: Option<PathBuf>,
    /// Environment variable prefix.
    env_prefix: String,
    /// Key/value overrides applied last.
    overrides: Vec<(String, String)>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader with the standard defaults file and env prefix.
    pub fn new() -> Self {
        Self {
            defaults: "config/default".to_string(),
            file: None,
            env_prefix: ENV_PREFIX.to_string(),
            overrides: Vec::new(),
        }
    }

    /// Replace the defaults file base name.
    pub fn with_defaults(mut self, name: impl Into<String>) -> Self {
        self.defaults = name.into();
        self
    }

    /// Add an explicit configuration file.
    pub fn with_file(mut self, path: Option<&Path>) -> Self {
        self.file = path.map(Path::to_path_buf);
        self
    }

    /// Replace the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Register an override that wins over every other source.
    ///
    /// `None` values are ignored, so optional env lookups can be passed
    /// straight through.
    pub fn with_override(mut self, key: &str, value: Option<String>) -> Self {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            self.overrides.push((key.to_string(), v));
        }
        self
    }

    /// Build, deserialize, and validate the settings.
    pub fn load<T>(&self) -> AppResult<T>
    where
        T: DeserializeOwned + Validate,
    {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name(&self.defaults).required(false));

        if let Some(ref file) = self.file {
            if !file.exists() {
                return Err(AppError::configuration(format!(
                    "Config file not found: {}",
                    file.display()
                )));
            }
            builder = builder.add_source(config::File::from(file.as_path()).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        for (key, value) in &self.overrides {
            debug!(key = %key, "Applying configuration override");
            builder = builder.set_override(key.as_str(), value.as_str())?;
        }

        let settings: T = builder
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        settings.validate()?;
        Ok(settings)
    }
}
