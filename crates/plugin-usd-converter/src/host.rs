//! Blender process execution.
//!
//! Runs a generated script in a headless Blender with timeout management
//! and output capturing.

use std::io::ErrorKind as IoErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::{debug, error, info};

use crate::blender::BlenderInstallation;
use crate::error::ConversionError;

/// Longest slice of process output kept in error messages.
const MAX_OUTPUT_CHARS: usize = 16_000;

/// Capability probe: are we already running inside the host application?
pub trait HostProbe {
    /// `true` when host operations can be performed directly, without
    /// spawning a new host process.
    fn inside_host(&self) -> bool;
}

/// Probe driven by the hidden `--blender-mode` flag of the CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeProbe {
    inside: bool,
}

impl ModeProbe {
    /// Build from the flag value; only `"1"` means inside the host.
    pub fn from_flag(value: &str) -> Self {
        Self {
            inside: value.trim() == "1",
        }
    }
}

impl HostProbe for ModeProbe {
    fn inside_host(&self) -> bool {
        self.inside
    }
}

/// Captured output of a finished Blender process.
#[derive(Debug, Clone, Default)]
pub struct HostOutput {
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
    /// Wall-clock duration.
    pub duration: Duration,
}

impl HostOutput {
    /// Stdout followed by stderr.
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
        }
    }
}

/// Launches headless Blender on a script.
#[derive(Debug, Clone)]
pub struct BlenderLauncher {
    /// Resolved executable.
    installation: BlenderInstallation,
    /// Extra arguments placed before `-P`.
    extra_args: Vec<String>,
    /// Timeout for the whole process.
    timeout: Duration,
}

impl BlenderLauncher {
    /// Create a launcher.
    pub fn new(installation: BlenderInstallation, extra_args: Vec<String>, timeout: Duration) -> Self {
        Self {
            installation,
            extra_args,
            timeout,
        }
    }

    /// Executable that will be spawned.
    pub fn executable(&self) -> &Path {
        &self.installation.executable
    }

    /// Command-line arguments for running `script_path`.
    pub fn args(&self, script_path: &Path) -> Vec<String> {
        let mut args = vec![
            "-b".to_string(),
            "--factory-startup".to_string(),
            "--python-exit-code".to_string(),
            "1".to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args.push("-P".to_string());
        args.push(script_path.to_string_lossy().to_string());
        args
    }

    /// Run Blender on `script_path` and wait for it, bounded by the timeout.
    ///
    /// The child is killed when the timeout elapses.
    pub async fn run(&self, script_path: &Path, working_dir: &Path) -> Result<HostOutput, ConversionError> {
        let args = self.args(script_path);

        let mut cmd = Command::new(&self.installation.executable);
        cmd.args(&args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x08000000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        debug!(
            blender = %self.installation.executable.display(),
            args = ?args,
            timeout_s = self.timeout.as_secs(),
            "Spawning Blender process"
        );

        let start = Instant::now();
        let result = tokio::time::timeout(self.timeout, cmd.output()).await;
        let duration = start.elapsed();

        let output = match result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == IoErrorKind::NotFound => {
                error!(
                    blender = %self.installation.executable.display(),
                    "Blender executable not found"
                );
                return Err(ConversionError::HostNotFound {
                    path: self.installation.executable.clone(),
                });
            }
            Ok(Err(e)) => return Err(ConversionError::Io(e)),
            Err(_) => {
                error!(
                    timeout_s = self.timeout.as_secs(),
                    "Blender process timed out, killed"
                );
                return Err(ConversionError::HostTimeout {
                    timeout_seconds: self.timeout.as_secs(),
                });
            }
        };

        let host_output = HostOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration,
        };

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            error!(
                code = code,
                elapsed_ms = duration.as_millis() as u64,
                "Blender failed"
            );
            return Err(ConversionError::HostFailed {
                code,
                output: tail_chars(&host_output.combined(), MAX_OUTPUT_CHARS),
            });
        }

        info!(
            elapsed_ms = duration.as_millis() as u64,
            "Blender conversion completed"
        );
        Ok(host_output)
    }

    /// Resolved installation.
    pub fn installation(&self) -> &BlenderInstallation {
        &self.installation
    }
}

/// Keep the last `max` characters; failures are reported at the end of
/// Blender's log.
fn tail_chars(s: &str, max: usize) -> String {
    let count = s.chars().count();
    if count <= max {
        s.to_string()
    } else {
        s.chars().skip(count - max).collect()
    }
}
