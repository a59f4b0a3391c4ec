//! Unified error type for the USD conversion plugin.
//!
//! All subsystem errors (stage discovery, archive extraction, host process
//! execution, output validation) are consolidated into a single
//! `ConversionError` enum that maps cleanly to `usdconv_core::AppError`.

use std::path::PathBuf;

use thiserror::Error;
use usdconv_core::error::{AppError, ErrorKind};

/// Unified error type for all conversion operations.
#[derive(Debug, Error)]
pub enum ConversionError {
    // --- Request errors ---
    /// Requested output format is not supported.
    #[error("format must be GLB, GLTF_EMBEDDED or GLTF (got '{format}')")]
    InvalidFormat {
        /// The rejected format string.
        format: String,
    },

    /// The input path does not exist.
    #[error("Input not found: {path}")]
    InputNotFound {
        /// The absolute input path that was checked.
        path: PathBuf,
    },

    // --- Stage discovery errors ---
    /// No USD stage file exists anywhere below the search root.
    #[error("No USD stage (.usda/.usd/.usdc/.usdb) found in directory: {root}")]
    NoStageFound {
        /// The directory that was searched.
        root: PathBuf,
    },

    /// The archive could not be opened or one of its entries is corrupt.
    #[error("Cannot read archive {path}: {source}")]
    ArchiveRead {
        /// The archive path.
        path: PathBuf,
        /// Underlying ZIP error.
        #[source]
        source: zip::result::ZipError,
    },

    /// Archive contains too many entries.
    #[error("Archive contains {count} entries, exceeding limit of {limit}")]
    ArchiveTooManyFiles {
        /// Actual number of entries.
        count: usize,
        /// Maximum allowed entries.
        limit: usize,
    },

    /// Archive extraction exceeded the total size limit.
    #[error("Archive extraction exceeded {limit} byte size limit")]
    ArchiveTooLarge {
        /// Maximum allowed bytes.
        limit: u64,
    },

    // --- Host process errors ---
    /// Blender exited with a non-zero status.
    #[error("Blender failed (code {code}):\n{output}")]
    HostFailed {
        /// The exit code (`-1` when terminated by a signal).
        code: i32,
        /// Combined stdout and stderr of the process.
        output: String,
    },

    /// Blender did not finish within the configured timeout.
    #[error("Blender timed out after {timeout_seconds}s")]
    HostTimeout {
        /// The timeout that was exceeded.
        timeout_seconds: u64,
    },

    /// The Blender executable could not be launched.
    #[error("Blender executable not found: {path}")]
    HostNotFound {
        /// The executable that was tried.
        path: PathBuf,
    },

    // --- Output errors ---
    /// Blender exited successfully but produced no file.
    #[error("Output file not created: {path}")]
    OutputNotCreated {
        /// Expected output path.
        path: PathBuf,
    },

    /// Output file is smaller than the configured minimum.
    #[error("Output file is too small ({size} bytes): {path}")]
    OutputEmpty {
        /// Path to the undersized file.
        path: PathBuf,
        /// Observed size in bytes.
        size: u64,
    },

    // --- Generic errors ---
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tokio task join error.
    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ConversionError {
    /// Category used when folding into [`AppError`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidFormat { .. } => ErrorKind::Validation,
            Self::InputNotFound { .. } | Self::NoStageFound { .. } => ErrorKind::NotFound,
            Self::ArchiveRead { .. }
            | Self::ArchiveTooManyFiles { .. }
            | Self::ArchiveTooLarge { .. } => ErrorKind::Validation,
            Self::HostFailed { .. } | Self::OutputNotCreated { .. } | Self::OutputEmpty { .. } => {
                ErrorKind::ExternalService
            }
            Self::HostTimeout { .. } => ErrorKind::Timeout,
            Self::HostNotFound { .. } => ErrorKind::Configuration,
            Self::Io(_) => ErrorKind::Storage,
            Self::Join(_) => ErrorKind::Internal,
        }
    }
}

impl From<ConversionError> for AppError {
    fn from(err: ConversionError) -> Self {
        let kind = err.kind();
        AppError::with_source(kind, err.to_string(), err)
    }
}
