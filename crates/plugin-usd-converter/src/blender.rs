//! Blender executable discovery.
//!
//! Locates the Blender binary by checking, in order:
//! 1. An explicitly configured path or command name
//! 2. The system PATH
//! 3. Common installation directories
//!
//! When nothing is found the bare command name `blender` is used and the
//! spawn itself reports the failure.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Command name used when nothing else is configured.
pub const DEFAULT_BLENDER_COMMAND: &str = "blender";

/// Errors from Blender discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// An explicit path was configured but does not point at a file.
    #[error("Configured Blender executable does not exist: {path}")]
    MissingExecutable {
        /// The configured path.
        path: PathBuf,
    },

    /// A bare command name was configured but is not on PATH.
    #[error("'{command}' was not found on PATH")]
    NotOnPath {
        /// The configured command name.
        command: String,
    },
}

/// How the Blender executable was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMethod {
    /// Explicitly configured (config file, `USDCONV_` env, or `BLENDER_PATH`).
    ExplicitConfig,
    /// Found on the system PATH.
    SystemPath,
    /// Found in a common installation directory.
    CommonPath,
    /// Nothing found; relying on the process search path at spawn time.
    Fallback,
}

/// A resolved Blender executable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlenderInstallation {
    /// Executable path or command name passed to the spawn.
    pub executable: PathBuf,
    /// How the executable was found.
    pub discovery_method: DiscoveryMethod,
}

/// Blender discovery engine.
pub struct BlenderDiscovery;

impl BlenderDiscovery {
    /// Validate an explicitly configured path or command name.
    ///
    /// Values containing a path separator must exist as files; bare command
    /// names are looked up on PATH.
    pub fn from_explicit_path(path: &Path) -> Result<BlenderInstallation, DiscoveryError> {
        if path.components().count() > 1 || path.is_absolute() {
            if path.is_file() {
                return Ok(BlenderInstallation {
                    executable: path.to_path_buf(),
                    discovery_method: DiscoveryMethod::ExplicitConfig,
                });
            }
            return Err(DiscoveryError::MissingExecutable {
                path: path.to_path_buf(),
            });
        }

        let command = path.to_string_lossy().to_string();
        match Self::search_path(&command) {
            Some(found) => Ok(BlenderInstallation {
                executable: found,
                discovery_method: DiscoveryMethod::ExplicitConfig,
            }),
            None => Err(DiscoveryError::NotOnPath { command }),
        }
    }

    /// Discover Blender without explicit configuration.
    pub fn discover() -> BlenderInstallation {
        if let Some(found) = Self::search_path(DEFAULT_BLENDER_COMMAND) {
            info!(path = %found.display(), "Found Blender on PATH");
            return BlenderInstallation {
                executable: found,
                discovery_method: DiscoveryMethod::SystemPath,
            };
        }

        for candidate in Self::common_install_paths() {
            if candidate.is_file() {
                info!(path = %candidate.display(), "Found Blender in common install path");
                return BlenderInstallation {
                    executable: candidate,
                    discovery_method: DiscoveryMethod::CommonPath,
                };
            }
        }

        debug!("Blender not found, falling back to bare command name");
        BlenderInstallation {
            executable: PathBuf::from(DEFAULT_BLENDER_COMMAND),
            discovery_method: DiscoveryMethod::Fallback,
        }
    }

    /// Search PATH for an executable named `command`.
    pub fn search_path(command: &str) -> Option<PathBuf> {
        let path_var = std::env::var_os("PATH")?;
        Self::search_dirs(command, std::env::split_paths(&path_var))
    }

    fn search_dirs(command: &str, dirs: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
        let names: Vec<String> = if cfg!(windows) && Path::new(command).extension().is_none() {
            vec![format!("{command}.exe"), command.to_string()]
        } else {
            vec![command.to_string()]
        };

        dirs.into_iter()
            .flat_map(|dir| names.iter().map(move |n| dir.join(n)))
            .find(|p| p.is_file())
    }

    fn common_install_paths() -> Vec<PathBuf> {
        if cfg!(target_os = "macos") {
            vec![PathBuf::from(
                "/Applications/Blender.app/Contents/MacOS/Blender",
            )]
        } else if cfg!(windows) {
            let base = std::env::var_os("ProgramFiles")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(r"C:\Program Files"));
            let foundation = base.join("Blender Foundation");
            let mut found: Vec<PathBuf> = std::fs::read_dir(&foundation)
                .map(|entries| {
                    entries
                        .flatten()
                        .map(|e| e.path().join("blender.exe"))
                        .collect()
                })
                .unwrap_or_default();
            // Newest version directory first.
            found.sort();
            found.reverse();
            found
        } else {
            vec![
                PathBuf::from("/usr/bin/blender"),
                PathBuf::from("/usr/local/bin/blender"),
                PathBuf::from("/snap/bin/blender"),
                PathBuf::from("/opt/blender/blender"),
            ]
        }
    }
}
