// Tile gateway - Cache-first tile serving with network fallback
use crate::application::tile_repository::{FetchError, MirrorCursor, TileSource, TileStore};
use crate::domain::tiles::TileKey;
use bytes::Bytes;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum TileResponse {
    /// Served from the store without touching the network.
    Cached(Bytes),
    /// Fetched from the origin (and stored when possible).
    Fetched(Bytes),
    /// Origin answered with a non-success status; passed through, not stored.
    Upstream(u16),
    /// Origin unreachable and nothing stored: empty placeholder.
    Unavailable,
}

pub struct TileGateway {
    store: Arc<dyn TileStore>,
    source: Arc<dyn TileSource>,
    cursor: MirrorCursor,
}

impl TileGateway {
    pub fn new(store: Arc<dyn TileStore>, source: Arc<dyn TileSource>) -> Self {
        Self {
            store,
            source,
            cursor: MirrorCursor::default(),
        }
    }

    pub async fn serve(&self, key: TileKey) -> TileResponse {
        match self.store.get(key).await {
            Ok(Some(bytes)) => return TileResponse::Cached(bytes),
            Ok(None) => {}
            Err(e) => tracing::warn!("Tile store read failed for {}: {}", key, e),
        }

        let mirror = self.cursor.advance(self.source.mirrors());
        match self.source.fetch(mirror, key).await {
            Ok(bytes) => {
                if let Err(e) = self.store.put(key, bytes.clone()).await {
                    tracing::warn!("Could not cache tile {}: {}", key, e);
                }
                TileResponse::Fetched(bytes)
            }
            Err(FetchError::Status(status)) => TileResponse::Upstream(status),
            Err(e) => {
                tracing::debug!("Tile {} unavailable offline: {}", key, e);
                TileResponse::Unavailable
            }
        }
    }
}
