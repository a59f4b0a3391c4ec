//! # usdconv-asset
//!
//! Asset platform integration: [`AssetStore`](usdconv_core::AssetStore)
//! providers for the platform's HTTP API and for a local directory, and
//! the [`PreviewJob`] that turns a stored USD item into a glTF preview.

pub mod job;
pub mod providers;

pub use job::{PreviewJob, PreviewResult};
pub use providers::{HttpAssetStore, LocalAssetStore, build_store};
