//! Asset store trait for the remote item platform.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::result::AppResult;

/// An item held by the asset platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetItem {
    /// Platform-assigned identifier.
    pub id: String,
    /// File name of the item (e.g. `"chair.usdz"`).
    pub name: String,
    /// Remote path of the item within its dataset (e.g. `"/models/chair.usdz"`).
    #[serde(default)]
    pub filename: String,
    /// Owning dataset.
    #[serde(default, rename = "datasetId")]
    pub dataset_id: String,
    /// Size in bytes, when reported by the platform.
    #[serde(default)]
    pub size: Option<u64>,
    /// Creation timestamp, when reported by the platform.
    #[serde(default, rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Trait for remote item stores.
///
/// Implementations exist for the platform's HTTP API and for a local
/// directory. Only `get` and `download` are needed to convert an item;
/// `upload` and `link_preview` are used when publishing is enabled.
#[async_trait]
pub trait AssetStore: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "http", "local").
    fn provider_type(&self) -> &str;

    /// Resolve an item by identifier.
    async fn get(&self, item_id: &str) -> AppResult<AssetItem>;

    /// Download an item's content into `dest_dir`, returning the local path.
    async fn download(&self, item: &AssetItem, dest_dir: &Path) -> AppResult<PathBuf>;

    /// Upload a local file into `remote_dir` of a dataset.
    async fn upload(
        &self,
        dataset_id: &str,
        remote_dir: &str,
        local_path: &Path,
    ) -> AppResult<AssetItem>;

    /// Register `preview` as a derived preview of `source`.
    async fn link_preview(&self, source: &AssetItem, preview: &AssetItem) -> AppResult<()>;
}
