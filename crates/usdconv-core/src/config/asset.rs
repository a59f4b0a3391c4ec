//! Remote asset store configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Which [`AssetStore`](crate::traits::AssetStore) backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStoreProvider {
    /// REST API of the asset platform.
    Http,
    /// A local directory laid out as `<root>/<item_id>/<file>`.
    Local,
}

/// Settings for fetching source items and publishing previews.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetStoreConfig {
    /// Backend selection.
    pub provider: AssetStoreProvider,
    /// Base URL of the asset platform API (HTTP provider).
    pub base_url: String,
    /// Bearer token for the asset platform API.
    pub api_token: Option<String>,
    /// Root directory of the local provider.
    pub local_root: Option<PathBuf>,
    /// Working directory for downloads and generated previews.
    ///
    /// Defaults to `<system temp>/usd-preview`.
    pub work_dir: Option<PathBuf>,
    /// Upload converted previews back to the store and link them to the
    /// source item.
    pub publish_previews: bool,
    /// Remote folder that receives uploaded previews.
    pub remote_dir: String,
    /// HTTP request timeout in seconds.
    #[validate(range(min = 1, max = 3600))]
    pub request_timeout_seconds: u64,
}

impl Default for AssetStoreConfig {
    fn default() -> Self {
        Self {
            provider: AssetStoreProvider::Http,
            base_url: "https://gate.dataloop.ai/api/v1".to_string(),
            api_token: None,
            local_root: None,
            work_dir: None,
            publish_previews: false,
            remote_dir: "/.dataloop/previews".to_string(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    300
}

impl AssetStoreConfig {
    /// Resolve the effective working directory.
    pub fn effective_work_dir(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("usd-preview"))
    }
}
