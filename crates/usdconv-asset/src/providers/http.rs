//! Asset platform REST API client.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::StreamExt;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use usdconv_core::config::AssetStoreConfig;
use usdconv_core::error::{AppError, ErrorKind};
use usdconv_core::result::AppResult;
use usdconv_core::traits::{AssetItem, AssetStore};

/// Body of a modality registration.
#[derive(Debug, Serialize)]
struct ModalityRequest<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    name: &'a str,
    #[serde(rename = "ref")]
    reference: &'a str,
    mimetype: &'a str,
}

/// HTTP asset store.
#[derive(Debug, Clone)]
pub struct HttpAssetStore {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpAssetStore {
    /// Create a client from configuration.
    pub fn new(config: &AssetStoreConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(concat!("usd-gltf/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e)
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    fn url(&self, path: &str) -> AppResult<Url> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        Url::parse(&raw).map_err(|e| {
            AppError::with_source(ErrorKind::Configuration, format!("Invalid URL: {raw}"), e)
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and turn non-success statuses into errors.
    async fn send(&self, request: RequestBuilder, what: &str) -> AppResult<Response> {
        let response = self.authorize(request).send().await.map_err(|e| {
            AppError::with_source(ErrorKind::ExternalService, format!("{what} failed"), e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = format!("{what} failed with HTTP {status}: {}", body.trim());
        Err(match status {
            StatusCode::NOT_FOUND => AppError::not_found(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                AppError::configuration(message)
            }
            _ => AppError::external_service(message),
        })
    }

    async fn json<T: serde::de::DeserializeOwned>(response: Response, what: &str) -> AppResult<T> {
        response.json().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Serialization,
                format!("{what}: invalid response body"),
                e,
            )
        })
    }
}

/// MIME type registered for a preview file.
fn mimetype_for(name: &str) -> &'static str {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".glb") {
        "model/gltf-binary"
    } else if lower.ends_with(".gltf") {
        "model/gltf+json"
    } else {
        "application/octet-stream"
    }
}

#[async_trait]
impl AssetStore for HttpAssetStore {
    fn provider_type(&self) -> &str {
        "http"
    }

    async fn get(&self, item_id: &str) -> AppResult<AssetItem> {
        let url = self.url(&format!("items/{item_id}"))?;
        let what = format!("Get item {item_id}");
        let response = self.send(self.client.get(url), &what).await?;
        Self::json(response, &what).await
    }

    async fn download(&self, item: &AssetItem, dest_dir: &Path) -> AppResult<PathBuf> {
        let url = self.url(&format!("items/{}/stream", item.id))?;
        let what = format!("Download item {}", item.id);
        let response = self.send(self.client.get(url), &what).await?;

        let file_name = super::local_file_name(&item.name)?;
        fs::create_dir_all(dest_dir).await?;
        let dest = dest_dir.join(file_name);
        let mut file = fs::File::create(&dest).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create {}", dest.display()),
                e,
            )
        })?;

        let mut total_bytes = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                AppError::with_source(ErrorKind::ExternalService, "Download stream error", e)
            })?;
            total_bytes += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        info!(item_id = %item.id, dest = %dest.display(), bytes = total_bytes, "Item downloaded");
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
        let remote_path = format!("{}/{}", remote_dir.trim_end_matches('/'), name);

        let mut url = self.url(&format!("datasets/{dataset_id}/items"))?;
        url.query_pairs_mut().append_pair("path", &remote_path);

        let data = Bytes::from(fs::read(local_path).await?);
        let size = data.len();
        let request = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(data);

        let what = format!("Upload {remote_path}");
        let response = self.send(request, &what).await?;
        let item: AssetItem = Self::json(response, &what).await?;

        debug!(item_id = %item.id, remote = %remote_path, bytes = size, "Preview uploaded");
        Ok(item)
    }

    async fn link_preview(&self, source: &AssetItem, preview: &AssetItem) -> AppResult<()> {
        let url = self.url(&format!("items/{}/modalities", source.id))?;
        let body = ModalityRequest {
            kind: "preview",
            name: &preview.name,
            reference: &preview.id,
            mimetype: mimetype_for(&preview.name),
        };
        let what = format!("Link preview {} to {}", preview.id, source.id);
        self.send(self.client.post(url).json(&body), &what).await?;
        Ok(())
    }
}
