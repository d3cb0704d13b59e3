// Asset service - App shell cache-first, network fallback, no write-back
use crate::application::tile_repository::AssetOrigin;
use bytes::Bytes;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

pub struct AssetService {
    precache: HashMap<String, Bytes>,
    origin: Option<Arc<dyn AssetOrigin>>,
}

/// `/` and empty paths resolve to the index page; everything gets a leading slash.
pub fn normalize_asset_path(path: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        "/index.html".to_string()
    } else {
        format!("/{trimmed}")
    }
}

impl AssetService {
    pub fn new(precache: HashMap<String, Bytes>, origin: Option<Arc<dyn AssetOrigin>>) -> Self {
        Self { precache, origin }
    }

    /// Read the app-shell files under `root` into memory. Files that cannot be
    /// read are skipped with a warning and later fall through to the origin.
    pub async fn install(
        root: &Path,
        files: &[String],
        origin: Option<Arc<dyn AssetOrigin>>,
    ) -> Self {
        let mut precache = HashMap::new();
        for file in files {
            let key = normalize_asset_path(file);
            let on_disk = root.join(key.trim_start_matches('/'));
            match tokio::fs::read(&on_disk).await {
                Ok(bytes) => {
                    precache.insert(key, Bytes::from(bytes));
                }
                Err(e) => tracing::warn!("Skipping app asset {}: {}", on_disk.display(), e),
            }
        }
        tracing::info!("Precached {} of {} app assets", precache.len(), files.len());
        Self::new(precache, origin)
    }

    pub async fn serve(&self, path: &str) -> Option<Bytes> {
        let key = normalize_asset_path(path);
        if let Some(bytes) = self.precache.get(&key) {
            return Some(bytes.clone());
        }

        let origin = self.origin.as_ref()?;
        match origin.fetch(&key).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::debug!("Asset {} unavailable: {}", key, e);
                None
            }
        }
    }
}
