// Filesystem tile store - {root}/{z}/{x}/{y}.png, write-once
use crate::application::tile_repository::{StoreError, TileStore};
use crate::domain::tiles::TileKey;
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct FsTileStore {
    root: PathBuf,
    tmp_seq: AtomicU64,
}

impl FsTileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tmp_seq: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: TileKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    fn temp_path_for(&self, final_path: &Path) -> PathBuf {
        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        final_path.with_extension(format!("png.{}.{}.tmp", std::process::id(), seq))
    }
}

#[async_trait]
impl TileStore for FsTileStore {
    async fn contains(&self, key: TileKey) -> bool {
        tokio::fs::try_exists(self.path_for(key))
            .await
            .unwrap_or(false)
    }

    async fn get(&self, key: TileKey) -> Result<Option<Bytes>, StoreError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// The tile is written to a private temporary file and hard-linked into
    /// place, so readers never see a partial file and a second writer for the
    /// same key loses the race harmlessly.
    async fn put(&self, key: TileKey, data: Bytes) -> Result<bool, StoreError> {
        if data.is_empty() {
            return Err(StoreError::Rejected(format!("empty payload for tile {key}")));
        }
        let path = self.path_for(key);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(false);
        }
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        let tmp = self.temp_path_for(&path);
        tokio::fs::write(&tmp, &data).await?;
        let linked = tokio::fs::hard_link(&tmp, &path).await;
        let _ = tokio::fs::remove_file(&tmp).await;

        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
