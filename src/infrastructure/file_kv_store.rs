// File-backed key-value store - one file per key under a data directory
use crate::application::key_value_store::KeyValueStore;
use crate::application::tile_repository::StoreError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct FileKeyValueStore {
    dir: PathBuf,
    tmp_seq: AtomicU64,
}

impl FileKeyValueStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            tmp_seq: AtomicU64::new(0),
        }
    }

    /// Private scratch file per write; concurrent writers never share one.
    fn temp_path_for(&self, final_path: &Path) -> PathBuf {
        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        final_path.with_extension(format!("json.{}.{}.tmp", std::process::id(), seq))
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", urlencoding::encode(key)))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Option<String> {
        tokio::fs::read_to_string(self.path_for(key)).await.ok()
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(key);
        let tmp = self.temp_path_for(&path);
        tokio::fs::write(&tmp, value).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path().join("nested"));

        assert_eq!(store.get("mmap_buildings").await, None);
        store.set("mmap_buildings", "[]").await.unwrap();
        assert_eq!(store.get("mmap_buildings").await.as_deref(), Some("[]"));
        store.set("mmap_buildings", "[1]").await.unwrap();
        assert_eq!(store.get("mmap_buildings").await.as_deref(), Some("[1]"));
    }

    #[tokio::test]
    async fn test_keys_are_escaped_into_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path());

        store.set("../escape/attempt", "x").await.unwrap();
        assert_eq!(store.get("../escape/attempt").await.as_deref(), Some("x"));
        assert!(dir.path().join("..%2Fescape%2Fattempt.json").is_file());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_on_one_key_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(FileKeyValueStore::new(dir.path()));
        let long = "x".repeat(64 * 1024);

        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            let value = if i % 2 == 0 { long.clone() } else { "short".to_string() };
            handles.push(tokio::spawn(async move { store.set("k", &value).await }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let stored = store.get("k").await.unwrap();
        assert!(stored == long || stored == "short");
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("k.json")]);
    }
}
