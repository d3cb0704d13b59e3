// In-memory doubles for the application ports
use crate::application::key_value_store::KeyValueStore;
use crate::application::tile_repository::{AssetOrigin, FetchError, StoreError, TileSource, TileStore};
use crate::domain::tiles::TileKey;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
pub struct MemoryTileStore {
    tiles: Mutex<HashMap<TileKey, Bytes>>,
    pub fail_writes: AtomicBool,
}

impl MemoryTileStore {
    pub fn with_tiles(keys: impl IntoIterator<Item = TileKey>) -> Self {
        let store = Self::default();
        {
            let mut tiles = store.tiles.lock().unwrap();
            for key in keys {
                tiles.insert(key, Bytes::from_static(b"seeded"));
            }
        }
        store
    }

    pub fn len(&self) -> usize {
        self.tiles.lock().unwrap().len()
    }

    pub fn bytes(&self, key: TileKey) -> Option<Bytes> {
        self.tiles.lock().unwrap().get(&key).cloned()
    }
}

#[async_trait]
impl TileStore for MemoryTileStore {
    async fn contains(&self, key: TileKey) -> bool {
        self.tiles.lock().unwrap().contains_key(&key)
    }

    async fn get(&self, key: TileKey) -> Result<Option<Bytes>, StoreError> {
        Ok(self.bytes(key))
    }

    async fn put(&self, key: TileKey, data: Bytes) -> Result<bool, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected("disk full".into()));
        }
        let mut tiles = self.tiles.lock().unwrap();
        if tiles.contains_key(&key) {
            return Ok(false);
        }
        tiles.insert(key, data);
        Ok(true)
    }
}

/// Origin that answers from a script and records every request it sees.
pub struct ScriptedTileSource {
    mirrors: Vec<String>,
    failures: HashMap<TileKey, FetchError>,
    pub calls: Mutex<Vec<(String, TileKey)>>,
}

impl ScriptedTileSource {
    pub fn new() -> Self {
        Self {
            mirrors: ["a", "b", "c"].iter().map(|s| s.to_string()).collect(),
            failures: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self, key: TileKey, error: FetchError) -> Self {
        self.failures.insert(key, error);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn mirrors_used(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }
}

#[async_trait]
impl TileSource for ScriptedTileSource {
    fn mirrors(&self) -> &[String] {
        &self.mirrors
    }

    async fn fetch(&self, mirror: &str, key: TileKey) -> Result<Bytes, FetchError> {
        self.calls.lock().unwrap().push((mirror.to_string(), key));
        match self.failures.get(&key) {
            Some(err) => Err(err.clone()),
            None => Ok(Bytes::from(format!("png:{key}"))),
        }
    }
}

pub struct ScriptedAssetOrigin {
    pub assets: HashMap<String, Bytes>,
    pub calls: Mutex<Vec<String>>,
}

#[async_trait]
impl AssetOrigin for ScriptedAssetOrigin {
    async fn fetch(&self, path: &str) -> Result<Bytes, FetchError> {
        self.calls.lock().unwrap().push(path.to_string());
        self.assets
            .get(path)
            .cloned()
            .ok_or(FetchError::Status(404))
    }
}

#[derive(Default)]
pub struct MemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
    pub fail_writes: AtomicBool,
}

impl MemoryKeyValueStore {
    pub fn with(key: &str, value: &str) -> Self {
        let store = Self::default();
        store
            .values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        store
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.raw(key)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected("quota exceeded".into()));
        }
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
