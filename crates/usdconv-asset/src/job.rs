//! Preview job: fetch a USD item from the asset store, convert it to glTF,
//! and optionally publish the result back as a preview of the item.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, instrument, warn};

use plugin_usd_converter::filesystem::FsUtils;
use plugin_usd_converter::{ConversionProcessor, ConversionRequest, OutputFormat};
use usdconv_core::config::AssetStoreConfig;
use usdconv_core::result::AppResult;
use usdconv_core::traits::{AssetItem, AssetStore};

/// Result of a preview job.
#[derive(Debug, Clone)]
pub struct PreviewResult {
    /// Source item.
    pub item: AssetItem,
    /// Local path of the converted file.
    pub output_path: PathBuf,
    /// Uploaded preview item, when publishing is enabled.
    pub published: Option<AssetItem>,
}

/// Converts stored items into glTF previews.
#[derive(Debug, Clone)]
pub struct PreviewJob {
    store: Arc<dyn AssetStore>,
    processor: ConversionProcessor,
    work_dir: PathBuf,
    publish: bool,
    remote_dir: String,
}

impl PreviewJob {
    /// Create a job from its collaborators and the asset store settings.
    pub fn new(
        store: Arc<dyn AssetStore>,
        processor: ConversionProcessor,
        config: &AssetStoreConfig,
    ) -> Self {
        Self {
            store,
            processor,
            work_dir: config.effective_work_dir(),
            publish: config.publish_previews,
            remote_dir: config.remote_dir.clone(),
        }
    }

    /// Where downloads of `item_id` are placed.
    pub fn download_dir(&self, item_id: &str) -> PathBuf {
        self.work_dir.join("downloads").join(item_id)
    }

    /// Where the preview for a downloaded file is written, before the
    /// format extension is applied.
    pub fn preview_base(&self, downloaded: &Path) -> PathBuf {
        let name = FsUtils::extract_filename_str(downloaded);
        self.work_dir
            .join("previews")
            .join(FsUtils::sanitize_stem(&name))
    }

    /// Run the job for one item.
    #[instrument(skip(self), fields(provider = self.store.provider_type()))]
    pub async fn run(&self, item_id: &str, format: OutputFormat) -> AppResult<PreviewResult> {
        let item = self.store.get(item_id).await?;
        info!(item_id, name = %item.name, "Fetched item");

        let download_dir = self.download_dir(item_id);
        let result = self.convert_and_publish(&item, &download_dir, format).await;

        if let Err(e) = tokio::fs::remove_dir_all(&download_dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(item_id, error = %e, "Failed to remove downloaded item");
            }
        }

        let (output_path, published) = result?;
        Ok(PreviewResult {
            item,
            output_path,
            published,
        })
    }

    async fn convert_and_publish(
        &self,
        item: &AssetItem,
        download_dir: &Path,
        format: OutputFormat,
    ) -> AppResult<(PathBuf, Option<AssetItem>)> {
        let downloaded = self.store.download(item, download_dir).await?;

        let request = ConversionRequest::new(&downloaded, self.preview_base(&downloaded), format);
        let outcome = self.processor.convert(&request).await?;

        let published = if self.publish {
            Some(self.publish(item, &outcome.output_path).await?)
        } else {
            None
        };
        Ok((outcome.output_path, published))
    }

    async fn publish(&self, item: &AssetItem, output: &Path) -> AppResult<AssetItem> {
        let preview = self
            .store
            .upload(&item.dataset_id, &self.remote_dir, output)
            .await?;
        self.store.link_preview(item, &preview).await?;
        info!(item_id = %item.id, preview_id = %preview.id, "Preview published");
        Ok(preview)
    }
}
