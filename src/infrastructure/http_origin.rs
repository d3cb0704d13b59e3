// HTTP origins for tiles and app assets
use crate::application::tile_repository::{AssetOrigin, FetchError, TileSource};
use crate::domain::tiles::TileKey;
use crate::infrastructure::config::{TileSettings, expand_url_template};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use std::time::Duration;

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(err.to_string())
    }
}

async fn fetch_bytes(client: &reqwest::Client, url: &str) -> Result<Bytes, FetchError> {
    let response = client.get(url).send().await.map_err(classify)?;

    if response.status() != StatusCode::OK {
        return Err(FetchError::Status(response.status().as_u16()));
    }

    // The client-level timeout also covers reading the body.
    response.bytes().await.map_err(classify)
}

/// Raster tile origin such as `https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png`.
#[derive(Debug, Clone)]
pub struct HttpTileSource {
    client: reqwest::Client,
    url_template: String,
    mirrors: Vec<String>,
}

impl HttpTileSource {
    pub fn new(settings: &TileSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url_template: settings.url_template.clone(),
            mirrors: settings.subdomains.clone(),
        })
    }

    fn url_for(&self, mirror: &str, key: TileKey) -> String {
        expand_url_template(&self.url_template, mirror, key.z, key.x, key.y)
    }
}

#[async_trait]
impl TileSource for HttpTileSource {
    fn mirrors(&self) -> &[String] {
        &self.mirrors
    }

    async fn fetch(&self, mirror: &str, key: TileKey) -> Result<Bytes, FetchError> {
        let url = self.url_for(mirror, key);
        tracing::debug!("GET {}", url);
        fetch_bytes(&self.client, &url).await
    }
}

/// Upstream copy of the web app, consulted for assets that were not precached.
#[derive(Debug, Clone)]
pub struct HttpAssetOrigin {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAssetOrigin {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AssetOrigin for HttpAssetOrigin {
    async fn fetch(&self, path: &str) -> Result<Bytes, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        fetch_bytes(&self.client, &url).await
    }
}
