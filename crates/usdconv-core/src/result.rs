//! Convenience result type alias for usd-gltf.

use crate::error::AppError;

/// A specialized `Result` type for usd-gltf operations.
pub type AppResult<T> = Result<T, AppError>;
