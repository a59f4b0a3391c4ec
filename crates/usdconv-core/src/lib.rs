//! # usdconv-core
//!
//! Core crate for usd-gltf. Contains the unified error system, layered
//! configuration loading, logging setup, and the [`AssetStore`] trait
//! implemented by `usdconv-asset`.
//!
//! This crate has **no** internal dependencies on other usd-gltf crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod result;
pub mod traits;

pub use error::{AppError, ErrorKind};
pub use logging::init_logging;
pub use result::AppResult;
pub use traits::AssetStore;
