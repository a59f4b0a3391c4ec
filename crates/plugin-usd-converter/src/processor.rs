//! Conversion processor: request validation, stage resolution, delegation
//! to a Blender process, output validation, and scratch cleanup.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::ConverterConfig;
use crate::error::ConversionError;
use crate::filesystem::FsUtils;
use crate::host::{BlenderLauncher, HostProbe};
use crate::locator::StageLocator;
use crate::models::{ConversionOutcome, ConversionRequest, OutputFormat, normalize_output_path};
use crate::scripting::{HostScript, ScriptSession, execute_in_host};

/// A request whose paths have been checked and resolved.
#[derive(Debug, Clone)]
pub struct PreparedConversion {
    /// Absolute input path.
    pub input: PathBuf,
    /// Stage file handed to the importer.
    pub stage_path: PathBuf,
    /// Absolute, extension-corrected output path.
    pub output_path: PathBuf,
    /// Output format.
    pub format: OutputFormat,
}

/// What a probe-driven run produced.
#[derive(Debug, Clone)]
pub enum ConversionHandoff {
    /// A Blender process was spawned and the file was written.
    Converted(ConversionOutcome),
    /// Already inside the host: the script to evaluate there.
    Script(HostScript),
}

/// The main conversion processor.
#[derive(Debug, Clone)]
pub struct ConversionProcessor {
    /// Root directory for per-job scratch directories.
    temp_root: PathBuf,
    /// Converter configuration.
    config: ConverterConfig,
    /// Blender launcher.
    launcher: BlenderLauncher,
}

impl ConversionProcessor {
    /// Create a new processor, resolving the Blender executable once.
    pub fn new(config: ConverterConfig) -> Result<Self, ConversionError> {
        let temp_root = config.effective_temp_root();
        std::fs::create_dir_all(&temp_root)?;

        let launcher = BlenderLauncher::new(
            config.resolve_blender(),
            config.extra_args.clone(),
            Duration::from_secs(config.timeout_seconds),
        );

        Ok(Self {
            temp_root,
            config,
            launcher,
        })
    }

    /// Convert a request by delegating to a headless Blender process.
    ///
    /// The job scratch directory is removed whatever the outcome.
    #[instrument(
        skip(self, request),
        fields(job_id = tracing::field::Empty, input = %request.input.display())
    )]
    pub async fn convert(
        &self,
        request: &ConversionRequest,
    ) -> Result<ConversionOutcome, ConversionError> {
        let job_dir = self.new_job_dir();
        let result = self.run_pipeline(request, &job_dir).await;
        Self::remove_job_dir(&job_dir).await;
        result
    }

    /// Produce the host script for a request without spawning Blender.
    ///
    /// Nothing is left on disk: an archive is only extracted here to pick
    /// its stage, and the script extracts it again into its own temporary
    /// directory which it removes when done.
    #[instrument(skip(self, request), fields(input = %request.input.display()))]
    pub async fn render_host_script(
        &self,
        request: &ConversionRequest,
    ) -> Result<HostScript, ConversionError> {
        let job_dir = self.new_job_dir();
        let result = self.build_host_script(request, &job_dir).await;
        Self::remove_job_dir(&job_dir).await;
        result
    }

    async fn build_host_script(
        &self,
        request: &ConversionRequest,
        job_dir: &Path,
    ) -> Result<HostScript, ConversionError> {
        let prepared = self.prepare(request, job_dir).await?;

        let extracted = job_dir.join("extract");
        let (mut session, stage) = match prepared.stage_path.strip_prefix(&extracted) {
            Ok(relative) => (
                ScriptSession::new().with_archive(&prepared.input),
                relative.to_path_buf(),
            ),
            Err(_) => (ScriptSession::new(), prepared.stage_path.clone()),
        };
        execute_in_host(
            &mut session,
            &stage,
            &prepared.output_path,
            prepared.format,
            &self.config.export,
        )?;
        Ok(session.into_script())
    }

    /// Convert, or render the script when `probe` reports we are already
    /// inside the host.
    pub async fn run<P: HostProbe + ?Sized>(
        &self,
        request: &ConversionRequest,
        probe: &P,
    ) -> Result<ConversionHandoff, ConversionError> {
        if probe.inside_host() {
            debug!("Running inside host, rendering script only");
            self.render_host_script(request)
                .await
                .map(ConversionHandoff::Script)
        } else {
            self.convert(request).await.map(ConversionHandoff::Converted)
        }
    }

    /// Validate the request and resolve the stage.
    ///
    /// Input existence is checked before anything touches the disk.
    /// Archives are extracted into `job_dir/extract`.
    pub async fn prepare(
        &self,
        request: &ConversionRequest,
        job_dir: &Path,
    ) -> Result<PreparedConversion, ConversionError> {
        let input = FsUtils::absolutize(&request.input)?;
        if !input.exists() {
            return Err(ConversionError::InputNotFound { path: input });
        }

        let output_path =
            normalize_output_path(&FsUtils::absolutize(&request.output)?, request.format);

        let scratch = job_dir.join("extract");
        let resolve_input = input.clone();
        let stage_path =
            tokio::task::spawn_blocking(move || StageLocator::resolve(&resolve_input, &scratch))
                .await??;

        debug!(
            input = %input.display(),
            stage = %stage_path.display(),
            output = %output_path.display(),
            "Conversion prepared"
        );

        Ok(PreparedConversion {
            input,
            stage_path,
            output_path,
            format: request.format,
        })
    }

    /// Core pipeline.
    async fn run_pipeline(
        &self,
        request: &ConversionRequest,
        job_dir: &Path,
    ) -> Result<ConversionOutcome, ConversionError> {
        let start = Instant::now();
        if let Some(job_id) = job_dir.file_name() {
            tracing::Span::current().record("job_id", &*job_id.to_string_lossy());
        }

        let prepared = self.prepare(request, job_dir).await?;
        tokio::fs::create_dir_all(job_dir).await?;

        let mut session = ScriptSession::new();
        execute_in_host(
            &mut session,
            &prepared.stage_path,
            &prepared.output_path,
            prepared.format,
            &self.config.export,
        )?;
        let script_path = session.into_script().write_to(job_dir).await?;
        if let Some(parent) = prepared.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        info!(
            blender = %self.launcher.executable().display(),
            stage = %prepared.stage_path.display(),
            output = %prepared.output_path.display(),
            format = %prepared.format,
            "Delegating conversion to Blender"
        );
        self.launcher.run(&script_path, job_dir).await?;

        let output_bytes = self.validate_output(&prepared.output_path).await?;

        Ok(ConversionOutcome {
            output_path: prepared.output_path,
            stage_path: prepared.stage_path,
            format: prepared.format,
            output_bytes,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Validate that the output file exists and meets the minimum size.
    async fn validate_output(&self, output_path: &Path) -> Result<u64, ConversionError> {
        let metadata = match tokio::fs::metadata(output_path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConversionError::OutputNotCreated {
                    path: output_path.to_path_buf(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let size = metadata.len();
        if size < self.config.min_output_bytes {
            return Err(ConversionError::OutputEmpty {
                path: output_path.to_path_buf(),
                size,
            });
        }
        Ok(size)
    }

    fn new_job_dir(&self) -> PathBuf {
        self.temp_root.join(Uuid::now_v7().simple().to_string())
    }

    /// Best-effort removal of a job directory.
    async fn remove_job_dir(job_dir: &Path) {
        match tokio::fs::remove_dir_all(job_dir).await {
            Ok(()) => debug!(job_dir = %job_dir.display(), "Job directory removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                job_dir = %job_dir.display(),
                error = %e,
                "Failed to clean up job directory"
            ),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Get the Blender launcher.
    pub fn launcher(&self) -> &BlenderLauncher {
        &self.launcher
    }

    /// Root of the per-job scratch directories.
    pub fn temp_root(&self) -> &Path {
        &self.temp_root
    }
}
