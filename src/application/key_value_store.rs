// Port for the best-effort string key-value store
use crate::application::tile_repository::StoreError;
use async_trait::async_trait;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;

    /// May fail when the backing store is full or unavailable; callers keep
    /// their in-memory state either way.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Write `value` and log instead of failing when the store refuses it.
pub async fn persist_best_effort(store: &dyn KeyValueStore, key: &str, value: &str) -> bool {
    match store.set(key, value).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Could not persist {}: {}", key, e);
            false
        }
    }
}
