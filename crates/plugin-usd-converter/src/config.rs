//! Configuration for the conversion subsystem.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use crate::blender::{BlenderDiscovery, BlenderInstallation, DiscoveryMethod};
use crate::models::ExportOptions;

/// Environment variable naming the Blender executable; overrides
/// `converter.blender_path`.
pub const BLENDER_PATH_ENV: &str = "BLENDER_PATH";

/// Configuration for the Blender-based converter.
///
/// If `blender_path` is empty, the executable is discovered on PATH and in
/// common installation directories. The `BLENDER_PATH` environment
/// variable is folded into this field when the configuration is loaded.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Blender executable path or command name. Empty = auto-discover.
    pub blender_path: PathBuf,

    /// Timeout in seconds for a single Blender invocation.
    #[validate(range(min = 1, max = 86400))]
    pub timeout_seconds: u64,

    /// Root directory for per-job scratch directories.
    pub temp_root: Option<PathBuf>,

    /// Minimum output file size (bytes) to consider a conversion successful.
    pub min_output_bytes: u64,

    /// Extra arguments inserted before `-P <script>` (e.g. `--log-level`).
    pub extra_args: Vec<String>,

    /// glTF exporter options.
    pub export: ExportOptions,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            blender_path: PathBuf::new(),
            timeout_seconds: default_timeout_seconds(),
            temp_root: None,
            min_output_bytes: default_min_output_bytes(),
            extra_args: Vec::new(),
            export: ExportOptions::default(),
        }
    }
}

fn default_timeout_seconds() -> u64 {
    600
}

fn default_min_output_bytes() -> u64 {
    1
}

impl ConverterConfig {
    /// Resolve the effective temp root directory.
    pub fn effective_temp_root(&self) -> PathBuf {
        self.temp_root
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("usd-gltf"))
    }

    /// Resolve the Blender executable.
    ///
    /// An explicit setting that cannot be validated is still used as-is, so
    /// the spawn reports the real failure.
    pub fn resolve_blender(&self) -> BlenderInstallation {
        if self.blender_path.as_os_str().is_empty() {
            return BlenderDiscovery::discover();
        }

        match BlenderDiscovery::from_explicit_path(&self.blender_path) {
            Ok(installation) => {
                info!(
                    path = %installation.executable.display(),
                    "Using explicitly configured Blender"
                );
                installation
            }
            Err(e) => {
                warn!(
                    configured = %self.blender_path.display(),
                    error = %e,
                    "Configured Blender could not be validated, using it anyway"
                );
                BlenderInstallation {
                    executable: self.blender_path.clone(),
                    discovery_method: DiscoveryMethod::ExplicitConfig,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConverterConfig::default();
        assert!(config.blender_path.as_os_str().is_empty());
        assert_eq!(config.timeout_seconds, 600);
        assert_eq!(config.min_output_bytes, 1);
        assert!(config.export.y_up);
        assert!(!config.export.include_cameras);
    }

    #[test]
    fn test_explicit_path_is_kept_even_if_missing() {
        let config = ConverterConfig {
            blender_path: PathBuf::from("/opt/custom/blender-4.2"),
            ..Default::default()
        };
        let inst = config.resolve_blender();
        assert_eq!(inst.executable, PathBuf::from("/opt/custom/blender-4.2"));
        assert_eq!(inst.discovery_method, DiscoveryMethod::ExplicitConfig);
    }

    #[test]
    fn test_effective_temp_root_override() {
        let config = ConverterConfig {
            temp_root: Some(PathBuf::from("/scratch")),
            ..Default::default()
        };
        assert_eq!(config.effective_temp_root(), PathBuf::from("/scratch"));
    }

    #[test]
    fn test_validation_rejects_zero_timeout() {
        let config = ConverterConfig {
            timeout_seconds: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_partial_section() {
        let toml_str = "timeout_seconds = 120\n[export]\ninclude_lights = true\n";
        let config: ConverterConfig = toml::from_str(toml_str).expect("parse toml");
        assert_eq!(config.timeout_seconds, 120);
        assert!(config.export.include_lights);
        assert!(config.export.y_up);
        assert!(config.blender_path.as_os_str().is_empty());
    }
}
