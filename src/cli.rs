//! Command-line interface.

use std::path::PathBuf;

use clap::Parser;
use tracing::debug;

use plugin_usd_converter::{
    ConversionHandoff, ConversionProcessor, ConversionRequest, ModeProbe, OutputFormat,
};
use usdconv_core::error::AppError;
use usdconv_core::init_logging;

use crate::settings::Settings;

/// Convert a USD stage, directory, or USDZ archive to GLB or glTF using
/// headless Blender.
#[derive(Debug, Parser)]
#[command(name = "usd-to-gltf", version, about, long_about = None)]
pub struct Cli {
    /// Stage file (.usd/.usda/.usdc/.usdb), directory, or .usdz/.zip archive
    #[arg(long)]
    pub input: PathBuf,

    /// Output path; the extension is corrected to match --format
    #[arg(long)]
    pub output: PathBuf,

    /// Output format: GLB, GLTF_EMBEDDED, or GLTF
    #[arg(long, default_value = "GLB")]
    pub format: String,

    /// Path to a configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Timeout in seconds for the Blender process
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// 1 when already running inside Blender
    #[arg(long, hide = true, default_value = "0")]
    pub blender_mode: String,
}

impl Cli {
    /// Run the conversion described by the arguments.
    pub async fn execute(&self) -> Result<ConversionHandoff, AppError> {
        let format: OutputFormat = self.format.parse()?;

        let mut settings = Settings::load(self.config.as_deref())?;
        if let Some(timeout) = self.timeout {
            settings.converter.timeout_seconds = timeout;
        }
        init_logging(&settings.logging);
        debug!(?settings, "Settings loaded");

        let processor = ConversionProcessor::new(settings.converter)?;
        let request = ConversionRequest::new(&self.input, &self.output, format);
        let probe = ModeProbe::from_flag(&self.blender_mode);

        Ok(processor.run(&request, &probe).await?)
    }
}
