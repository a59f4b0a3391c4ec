//! Core traits defined in `usdconv-core` and implemented by other crates.

pub mod asset_store;

pub use asset_store::{AssetItem, AssetStore};
