// Ports for tile storage and tile origins
use crate::domain::tiles::TileKey;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage rejected the write: {0}")]
    Rejected(String),
}

/// Why a single origin fetch produced no tile.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum FetchError {
    #[error("origin answered with status {0}")]
    Status(u16),
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
}

/// Persistent, write-once tile storage.
#[async_trait]
pub trait TileStore: Send + Sync {
    /// Presence check. Presence alone means the tile is valid.
    async fn contains(&self, key: TileKey) -> bool;

    async fn get(&self, key: TileKey) -> Result<Option<Bytes>, StoreError>;

    /// Store a tile unless one is already present. Returns true if this call wrote it.
    async fn put(&self, key: TileKey, data: Bytes) -> Result<bool, StoreError>;
}

/// Remote raster tile origin reachable through several mirror hosts.
#[async_trait]
pub trait TileSource: Send + Sync {
    /// Mirror names used for round-robin selection, e.g. `a`, `b`, `c`.
    fn mirrors(&self) -> &[String];

    async fn fetch(&self, mirror: &str, key: TileKey) -> Result<Bytes, FetchError>;
}

/// Remote origin for non-tile app assets.
#[async_trait]
pub trait AssetOrigin: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<Bytes, FetchError>;
}

/// Picks the mirror for fetch number `n`.
pub fn mirror_for(mirrors: &[String], n: usize) -> &str {
    if mirrors.is_empty() {
        return "";
    }
    &mirrors[n % mirrors.len()]
}

/// Shared round-robin cursor for callers that fetch concurrently.
#[derive(Debug, Default)]
pub struct MirrorCursor {
    next: AtomicUsize,
}

impl MirrorCursor {
    pub fn advance<'a>(&self, mirrors: &'a [String]) -> &'a str {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        mirror_for(mirrors, n)
    }
}
