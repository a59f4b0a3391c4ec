//! Local directory asset store.
//!
//! Items live at `<root>/<item_id>/<file>`. Uploaded items also carry an
//! `.item.json` metadata file, and preview links are recorded in
//! `.previews.json` next to the source item.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use usdconv_core::error::{AppError, ErrorKind};
use usdconv_core::result::AppResult;
use usdconv_core::traits::{AssetItem, AssetStore};

const ITEM_META_FILE: &str = ".item.json";
const PREVIEWS_FILE: &str = ".previews.json";

/// Dataset reported for items without metadata.
const LOCAL_DATASET: &str = "local";

/// Directory-backed asset store.
#[derive(Debug, Clone)]
pub struct LocalAssetStore {
    /// Directory holding one subdirectory per item.
    root: PathBuf,
}

impl LocalAssetStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub async fn new(root: &Path) -> AppResult<Self> {
        fs::create_dir_all(root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create asset store root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    fn item_dir(&self, item_id: &str) -> AppResult<PathBuf> {
        if item_id.is_empty() || item_id.contains(['/', '\\']) || item_id.starts_with('.') {
            return Err(AppError::validation(format!("Invalid item id: {item_id:?}")));
        }
        Ok(self.root.join(item_id))
    }

    /// First regular, non-metadata file of an item directory, by name.
    async fn content_file(dir: &Path) -> AppResult<Option<PathBuf>> {
        let mut entries = fs::read_dir(dir).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if name.to_string_lossy().starts_with('.') {
                continue;
            }
            if entry.file_type().await?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files.into_iter().next())
    }

    /// Preview item ids linked to `item_id`.
    pub async fn previews_of(&self, item_id: &str) -> AppResult<Vec<String>> {
        let path = self.item_dir(item_id)?.join(PREVIEWS_FILE);
        match fs::read(&path).await {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    fn provider_type(&self) -> &str {
        "local"
    }

    async fn get(&self, item_id: &str) -> AppResult<AssetItem> {
        let dir = self.item_dir(item_id)?;
        if !dir.is_dir() {
            return Err(AppError::not_found(format!("Item not found: {item_id}")));
        }

        if let Ok(data) = fs::read(dir.join(ITEM_META_FILE)).await {
            return Ok(serde_json::from_slice(&data)?);
        }

        let file = Self::content_file(&dir)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Item {item_id} has no content")))?;
        let metadata = fs::metadata(&file).await?;
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(AssetItem {
            id: item_id.to_string(),
            filename: format!("/{name}"),
            name,
            dataset_id: LOCAL_DATASET.to_string(),
            size: Some(metadata.len()),
            created_at: None,
        })
    }

    async fn download(&self, item: &AssetItem, dest_dir: &Path) -> AppResult<PathBuf> {
        let dir = self.item_dir(&item.id)?;
        let file_name = super::local_file_name(&item.name)?;
        let source = dir.join(file_name);
        if !source.is_file() {
            return Err(AppError::not_found(format!(
                "Content of item {} not found",
                item.id
            )));
        }

        fs::create_dir_all(dest_dir).await?;
        let dest = dest_dir.join(file_name);
        let bytes = fs::copy(&source, &dest).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to copy item {}", item.id),
                e,
            )
        })?;

        debug!(item_id = %item.id, dest = %dest.display(), bytes, "Item downloaded");
        Ok(dest)
    }

    async fn upload(
        &self,
        dataset_id: &str,
        remote_dir: &str,
        local_path: &Path,
    ) -> AppResult<AssetItem> {
        let name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                AppError::validation(format!("Not a file path: {}", local_path.display()))
            })?;

        let id = Uuid::now_v7().simple().to_string();
        let dir = self.root.join(&id);
        fs::create_dir_all(&dir).await?;
        let size = fs::copy(local_path, dir.join(&name)).await?;

        let item = AssetItem {
            id,
            filename: format!("{}/{}", remote_dir.trim_end_matches('/'), name),
            name,
            dataset_id: dataset_id.to_string(),
            size: Some(size),
            created_at: Some(Utc::now()),
        };
        fs::write(dir.join(ITEM_META_FILE), serde_json::to_vec_pretty(&item)?).await?;

        debug!(item_id = %item.id, remote = %item.filename, "Item uploaded");
        Ok(item)
    }

    async fn link_preview(&self, source: &AssetItem, preview: &AssetItem) -> AppResult<()> {
        let mut previews = self.previews_of(&source.id).await?;
        if !previews.contains(&preview.id) {
            previews.push(preview.id.clone());
        }
        let path = self.item_dir(&source.id)?.join(PREVIEWS_FILE);
        fs::write(&path, serde_json::to_vec_pretty(&previews)?).await?;
        Ok(())
    }
}
