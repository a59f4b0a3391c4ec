//! Domain models: output formats, stage formats, export options, requests
//! and outcomes.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConversionError;

// ---------------------------------------------------------------------------
// Output formats
// ---------------------------------------------------------------------------

/// glTF-family output produced by the host exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputFormat {
    /// Binary-packed glTF (`.glb`).
    Glb,
    /// Text glTF with buffers embedded as data URIs (`.gltf`).
    GltfEmbedded,
}

impl OutputFormat {
    /// Names accepted by [`FromStr`], in help-text order.
    pub const ACCEPTED_NAMES: &'static [&'static str] = &["GLB", "GLTF_EMBEDDED", "GLTF"];

    /// Canonical file extension, including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Glb => ".glb",
            Self::GltfEmbedded => ".gltf",
        }
    }

    /// Value of the exporter's `export_format` option.
    pub fn exporter_name(&self) -> &'static str {
        match self {
            Self::Glb => "GLB",
            Self::GltfEmbedded => "GLTF_EMBEDDED",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.exporter_name())
    }
}

impl FromStr for OutputFormat {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GLB" => Ok(Self::Glb),
            "GLTF_EMBEDDED" | "GLTF" => Ok(Self::GltfEmbedded),
            _ => Err(ConversionError::InvalidFormat {
                format: s.to_string(),
            }),
        }
    }
}

/// Append the canonical extension for `format` unless `path` already ends
/// with it (compared case-insensitively).
pub fn normalize_output_path(path: &Path, format: OutputFormat) -> PathBuf {
    let ext = format.extension();
    let raw = path.as_os_str().to_string_lossy();
    if raw.to_ascii_lowercase().ends_with(ext) {
        path.to_path_buf()
    } else {
        let mut os = path.as_os_str().to_os_string();
        os.push(ext);
        PathBuf::from(os)
    }
}

// ---------------------------------------------------------------------------
// Stage formats
// ---------------------------------------------------------------------------

/// USD-family stage encodings, ordered by import preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageFormat {
    /// Text stage (`.usda`).
    Usda,
    /// Generic stage (`.usd`), text or crate encoded.
    Usd,
    /// Crate (binary) stage (`.usdc`).
    Usdc,
    /// Legacy binary stage (`.usdb`).
    Usdb,
    /// Anything else picked up by a scan.
    Other,
}

impl StageFormat {
    /// Extensions scanned for, in preference order.
    pub const SCANNED_EXTENSIONS: &'static [&'static str] = &["usda", "usd", "usdc", "usdb"];

    /// Classify a path by its extension (case-insensitive).
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("usda") => Self::Usda,
            Some("usd") => Self::Usd,
            Some("usdc") => Self::Usdc,
            Some("usdb") => Self::Usdb,
            _ => Self::Other,
        }
    }

    /// Preference rank; lower wins. `usdc` and `usdb` share a rank.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Usda => 0,
            Self::Usd => 1,
            Self::Usdc | Self::Usdb => 2,
            Self::Other => 3,
        }
    }

    /// Whether a scan should pick this file up.
    pub fn is_stage(&self) -> bool {
        !matches!(self, Self::Other)
    }
}

/// Whether `path` names a zip-format archive (`.usdz` or `.zip`).
pub fn is_archive_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("usdz") || e.eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}

/// A stage file found under a search root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageCandidate {
    /// Path to the stage file.
    pub path: PathBuf,
    /// Encoding inferred from the extension.
    pub format: StageFormat,
    /// Number of path components between the search root and the file.
    pub depth: usize,
}

impl StageCandidate {
    /// Build a candidate for `path` relative to `root`.
    pub fn new(root: &Path, path: PathBuf) -> Self {
        let depth = path
            .strip_prefix(root)
            .map(|rel| rel.components().count())
            .unwrap_or_else(|_| path.components().count());
        Self {
            format: StageFormat::from_path(&path),
            depth,
            path,
        }
    }

    /// Sort key: extension rank first, then depth.
    pub fn score(&self) -> (u8, usize) {
        (self.format.rank(), self.depth)
    }
}

// ---------------------------------------------------------------------------
// Export options
// ---------------------------------------------------------------------------

/// Options forwarded to the host's glTF exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Convert to the +Y up axis convention.
    pub y_up: bool,
    /// Apply modifiers and transforms before export.
    pub apply_transforms: bool,
    /// Export camera objects.
    pub include_cameras: bool,
    /// Export punctual lights.
    pub include_lights: bool,
    /// Export only the current selection.
    pub selected_only: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            y_up: true,
            apply_transforms: true,
            include_cameras: false,
            include_lights: false,
            selected_only: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Requests and outcomes
// ---------------------------------------------------------------------------

/// A single conversion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionRequest {
    /// Stage file, directory, or `.usdz`/`.zip` archive.
    pub input: PathBuf,
    /// Destination path; its extension is corrected to match `format`.
    pub output: PathBuf,
    /// Requested output format.
    pub format: OutputFormat,
}

impl ConversionRequest {
    /// Create a new request.
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            format,
        }
    }
}

/// Result of a completed conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutcome {
    /// Absolute path of the written file.
    pub output_path: PathBuf,
    /// Stage file that was imported (inside the scratch directory for archives).
    pub stage_path: PathBuf,
    /// Output format.
    pub format: OutputFormat,
    /// Size of the written file in bytes.
    pub output_bytes: u64,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}
