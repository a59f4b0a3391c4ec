//! Asset store provider implementations.

pub mod http;
pub mod local;

use std::path::Path;
use std::sync::Arc;

use usdconv_core::config::{AssetStoreConfig, AssetStoreProvider};
use usdconv_core::error::AppError;
use usdconv_core::result::AppResult;
use usdconv_core::traits::AssetStore;

pub use http::HttpAssetStore;
pub use local::LocalAssetStore;

/// Build the configured asset store.
pub async fn build_store(config: &AssetStoreConfig) -> AppResult<Arc<dyn AssetStore>> {
    match config.provider {
        AssetStoreProvider::Http => Ok(Arc::new(HttpAssetStore::new(config)?)),
        AssetStoreProvider::Local => {
            let root = config.local_root.as_deref().ok_or_else(|| {
                AppError::configuration("asset_store.local_root is required for the local provider")
            })?;
            Ok(Arc::new(LocalAssetStore::new(root).await?))
        }
    }
}

/// Local file name for a remote item name, with any directory part dropped.
pub(crate) fn local_file_name(name: &str) -> AppResult<&str> {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AppError::validation(format!("Invalid item name: {name:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use usdconv_core::error::ErrorKind;

    #[test]
    fn test_local_file_name_drops_directories() {
        assert_eq!(local_file_name("chair.usdz").expect("plain"), "chair.usdz");
        assert_eq!(
            local_file_name("../../escaped.usdz").expect("relative"),
            "escaped.usdz"
        );
        assert_eq!(local_file_name("/etc/passwd").expect("absolute"), "passwd");
        for bad in ["", "..", ".", "a/.."] {
            let err = local_file_name(bad).expect_err(bad);
            assert_eq!(err.kind, ErrorKind::Validation);
        }
    }

    #[tokio::test]
    async fn test_local_provider_requires_root() {
        let config = AssetStoreConfig {
            provider: AssetStoreProvider::Local,
            ..Default::default()
        };
        let err = build_store(&config).await.expect_err("missing root");
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_builds_local_provider() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = AssetStoreConfig {
            provider: AssetStoreProvider::Local,
            local_root: Some(temp.path().to_path_buf()),
            ..Default::default()
        };
        let store = build_store(&config).await.expect("build");
        assert_eq!(store.provider_type(), "local");
    }

    #[tokio::test]
    async fn test_builds_http_provider() {
        let store = build_store(&AssetStoreConfig::default())
            .await
            .expect("build");
        assert_eq!(store.provider_type(), "http");
    }
}
