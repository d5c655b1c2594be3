//! Object storage backend.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Serialize;
use tracing::{debug, info, instrument};

use notesync_core::{ResolvedUrl, Result, StorageGateway, StoragePath};

use super::{build_client, check_status, endpoint, parse_base_url};
use crate::config::GatewayConfig;

/// Body of `POST /presign`.
#[derive(Debug, Serialize)]
struct PresignRequest<'a> {
    path: &'a str,
    expires_in_secs: u64,
}

/// Image bytes and presigned URLs over HTTP.
///
/// | Operation | Request |
/// |-----------|---------|
/// | upload | `PUT {base}/objects/{path}` with the raw bytes |
/// | resolve_url | `POST {base}/presign` → `{"url", "expires_at"}` |
/// | remove | `DELETE {base}/objects/{path}` (404 counts as removed) |
pub struct HttpStorageGateway {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    url_expiry_secs: u64,
}

impl HttpStorageGateway {
    /// Create a storage gateway from the shared gateway configuration.
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = build_client(config.timeout_secs)?;
        let base_url = parse_base_url(&config.storage_base_url)?;

        info!(
            url = %base_url,
            url_expiry_secs = config.url_expiry_secs,
            "Initializing HTTP storage gateway"
        );

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            url_expiry_secs: config.url_expiry_secs,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(&GatewayConfig::from_env())
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match self.api_key {
            Some(ref api_key) => req.bearer_auth(api_key),
            None => req,
        }
    }

    fn object_url(&self, path: &StoragePath) -> Result<Url> {
        let mut segments = vec!["objects"];
        segments.extend(path.as_str().split(notesync_core::defaults::PATH_DELIMITER));
        endpoint(&self.base_url, &segments)
    }
}

#[async_trait]
impl StorageGateway for HttpStorageGateway {
    #[instrument(skip(self, data), fields(subsystem = "gateway", component = "http_storage", op = "upload", storage_path = %path, size_bytes = data.len()))]
    async fn upload(&self, path: &StoragePath, data: &[u8], content_type: &str) -> Result<()> {
        let url = self.object_url(path)?;

        let response = self
            .authorize(self.client.put(url))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data.to_vec())
            .send()
            .await?;
        check_status(response, "upload").await?;

        debug!("Image uploaded");
        Ok(())
    }

    #[instrument(skip(self), fields(subsystem = "gateway", component = "http_storage", op = "resolve_url", storage_path = %path))]
    async fn resolve_url(&self, path: &StoragePath) -> Result<ResolvedUrl> {
        let url = endpoint(&self.base_url, &["presign"])?;
        let body = PresignRequest {
            path: path.as_str(),
            expires_in_secs: self.url_expiry_secs,
        };

        let response = self
            .authorize(self.client.post(url))
            .json(&body)
            .send()
            .await?;
        let response = check_status(response, "resolve_url").await?;

        let resolved: ResolvedUrl = response.json().await?;
        debug!(url = %resolved.url, "Resolved image URL");
        Ok(resolved)
    }

    #[instrument(skip(self), fields(subsystem = "gateway", component = "http_storage", op = "remove", storage_path = %path))]
    async fn remove(&self, path: &StoragePath) -> Result<()> {
        let url = self.object_url(path)?;

        let response = self.authorize(self.client.delete(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("Object already absent");
            return Ok(());
        }
        check_status(response, "remove").await?;
        Ok(())
    }
}
