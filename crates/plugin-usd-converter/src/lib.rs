//! # Plugin USD Converter
//!
//! Converts USD assets (`.usd`, `.usda`, `.usdc`, `.usdb`, directories and
//! `.usdz`/`.zip` archives) to glTF 2.0 using a headless Blender as the
//! conversion engine.
//!
//! ## Two halves
//!
//! Outside Blender, [`ConversionProcessor::convert`] resolves the stage,
//! writes a Python script and runs `blender -b -P <script>`. Inside
//! Blender, the same steps are expressed through [`HostSession`] and
//! [`execute_in_host`]; [`HostProbe`] decides which half applies.
//!
//! ## Blender Discovery
//!
//! The executable comes from configuration (or `BLENDER_PATH`); when that
//! is empty, PATH and common installation directories are searched.

pub mod blender;
pub mod config;
pub mod error;
pub mod filesystem;
pub mod host;
pub mod locator;
pub mod models;
pub mod processor;
pub mod scripting;

pub use blender::{BlenderDiscovery, BlenderInstallation};
pub use config::ConverterConfig;
pub use error::ConversionError;
pub use host::{BlenderLauncher, HostProbe, ModeProbe};
pub use locator::StageLocator;
pub use models::{
    ConversionOutcome, ConversionRequest, ExportOptions, OutputFormat, StageFormat,
    normalize_output_path,
};
pub use processor::{ConversionHandoff, ConversionProcessor};
pub use scripting::{HostScript, HostSession, ScriptSession, execute_in_host};
