//! # File Partition Store
//!
//! Persistent partition tier. Each partition is a directory under the cache
//! root; each entry is a body file named by the hash of its key plus a
//! `.meta` JSON sidecar.

use std::path::PathBuf;

use bytes::Bytes;
use tokio::fs;
use tokio::io;
use tracing::{debug, warn};

use crate::cache::providers::PartitionStore;
use crate::cache::types::{CacheKey, CacheLookupResult, CacheMetadata, CacheResult, CacheStatus};

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    initialized: std::sync::Arc<std::sync::atomic::AtomicBool>,
    enabled: bool,
}

impl FileStore {
    /// Create a new file store rooted at the specified directory.
    pub fn new(root: PathBuf, enabled: bool) -> Self {
        Self {
            root,
            initialized: std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false)),
            enabled,
        }
    }

    /// Initialize the cache root directory.
    pub(crate) async fn ensure_initialized(&self) -> io::Result<()> {
        use std::sync::atomic::Ordering;

        // Fast path - already initialized
        if self.initialized.load(Ordering::Relaxed) {
            return Ok(());
        }

        // Not enabled, nothing to initialize
        if !self.enabled {
            return Ok(());
        }

        // Use compare_exchange to ensure only one task initializes
        if self
            .initialized
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            fs::create_dir_all(&self.root).await?;
            self.initialized.store(true, Ordering::Release);
        } else {
            // Another task is initializing, wait for it to complete
            while !self.initialized.load(Ordering::Acquire) {
                tokio::task::yield_now().await;
            }
        }

        Ok(())
    }

    fn partition_dir(&self, partition: &str) -> PathBuf {
        self.root.join(partition)
    }

    /// Path of the body file for a key.
    fn data_path(&self, partition: &str, key: &CacheKey) -> PathBuf {
        self.partition_dir(partition)
            .join(format!("{}.body", key.to_filename()))
    }

    /// Path of the metadata sidecar for a key.
    fn meta_path(&self, partition: &str, key: &CacheKey) -> PathBuf {
        self.partition_dir(partition)
            .join(format!("{}.meta", key.to_filename()))
    }
}

#[async_trait::async_trait]
impl PartitionStore for FileStore {
    async fn open(&self, partition: &str) -> CacheResult<()> {
        if !self.enabled {
            return Ok(());
        }

        self.ensure_initialized().await?;
        fs::create_dir_all(self.partition_dir(partition)).await?;
        debug!(partition = %partition, "Opened disk partition");
        Ok(())
    }

    async fn list(&self) -> CacheResult<Vec<String>> {
        if !self.enabled {
            return Ok(Vec::new());
        }

        self.ensure_initialized().await?;

        let mut partitions = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                if let Ok(name) = entry.file_name().into_string() {
                    partitions.push(name);
                }
            }
        }

        Ok(partitions)
    }

    async fn delete(&self, partition: &str) -> CacheResult<bool> {
        if !self.enabled {
            return Ok(false);
        }

        self.ensure_initialized().await?;

        let dir = self.partition_dir(partition);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!(partition = %partition, "Deleted disk partition");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => {
                warn!(partition = %partition, error = %e, "Failed to delete disk partition");
                Err(e)
            }
        }
    }

    async fn contains(&self, partition: &str, key: &CacheKey) -> CacheResult<bool> {
        if !self.enabled {
            return Ok(false);
        }

        self.ensure_initialized().await?;

        let data_exists = fs::try_exists(self.data_path(partition, key)).await?;
        let meta_exists = fs::try_exists(self.meta_path(partition, key)).await?;

        Ok(data_exists && meta_exists)
    }

    async fn get(&self, partition: &str, key: &CacheKey) -> CacheLookupResult {
        if !self.enabled {
            return Ok(None);
        }

        self.ensure_initialized().await?;

        let data_path = self.data_path(partition, key);
        let meta_path = self.meta_path(partition, key);

        if !fs::try_exists(&data_path).await? || !fs::try_exists(&meta_path).await? {
            return Ok(None);
        }

        let metadata_bytes = match fs::read(&meta_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = ?meta_path, error = %e, "Failed to read cache metadata file");
                return Ok(None);
            }
        };

        let metadata: CacheMetadata = match serde_json::from_slice(&metadata_bytes) {
            Ok(m) => m,
            Err(e) => {
                warn!(path = ?meta_path, error = %e, "Failed to parse cache metadata");

                // Drop the invalid entry in the background rather than
                // blocking this lookup on the cleanup.
                let data_path = data_path.clone();
                let meta_path = meta_path.clone();
                tokio::spawn(async move {
                    let _ = fs::remove_file(&data_path).await;
                    let _ = fs::remove_file(&meta_path).await;
                });

                return Ok(None);
            }
        };

        let status = if metadata.is_expired() {
            CacheStatus::Expired
        } else {
            CacheStatus::Hit
        };

        let data = match fs::read(&data_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = ?data_path, error = %e, "Failed to read cache data file");
                return Ok(None);
            }
        };

        Ok(Some((Bytes::from(data), metadata, status)))
    }

    async fn put(
        &self,
        partition: &str,
        key: CacheKey,
        data: Bytes,
        metadata: CacheMetadata,
    ) -> CacheResult<()> {
        if !self.enabled {
            return Ok(());
        }

        self.ensure_initialized().await?;

        let dir = self.partition_dir(partition);
        fs::create_dir_all(&dir).await?;

        let filename = key.to_filename();
        let data_path = dir.join(format!("{filename}.body"));
        let meta_path = dir.join(format!("{filename}.meta"));

        let metadata_json = serde_json::to_vec(&metadata).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to serialize metadata: {e}"),
            )
        })?;

        // Write both files through temp names, then rename into place so a
        // reader never observes a half-written entry.
        let temp_data_path = dir.join(format!("{filename}.body.tmp"));
        let temp_meta_path = dir.join(format!("{filename}.meta.tmp"));

        if let Err(e) = fs::write(&temp_data_path, &data).await {
            warn!(path = ?temp_data_path, error = %e, "Failed to write cache data file");
            return Err(e);
        }

        if let Err(e) = fs::write(&temp_meta_path, &metadata_json).await {
            warn!(path = ?temp_meta_path, error = %e, "Failed to write cache metadata file");
            let _ = fs::remove_file(&temp_data_path).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp_data_path, &data_path).await {
            warn!(
                from = ?temp_data_path,
                to = ?data_path,
                error = %e,
                "Failed to rename temporary data file"
            );
            let _ = fs::remove_file(&temp_data_path).await;
            let _ = fs::remove_file(&temp_meta_path).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp_meta_path, &meta_path).await {
            warn!(
                from = ?temp_meta_path,
                to = ?meta_path,
                error = %e,
                "Failed to rename temporary metadata file"
            );
            // The body landed but the sidecar did not; remove the body so
            // the entry is absent rather than inconsistent.
            let _ = fs::remove_file(&data_path).await;
            let _ = fs::remove_file(&temp_meta_path).await;
            return Err(e);
        }

        debug!(key = ?key, partition = %partition, "Cached entry to disk");
        Ok(())
    }

    async fn clear(&self) -> CacheResult<()> {
        if !self.enabled {
            return Ok(());
        }

        self.ensure_initialized().await?;

        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_dir() {
                if let Err(e) = fs::remove_dir_all(&path).await {
                    warn!(path = ?path, error = %e, "Failed to remove cache partition directory");
                }
            } else if let Err(e) = fs::remove_file(&path).await {
                warn!(path = ?path, error = %e, "Failed to remove cache file");
            }
        }

        debug!("Disk store cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use reqwest::header::{HeaderMap, HeaderValue};
    use std::time::Duration;
    use tempfile::TempDir;

    fn key(url: &str) -> CacheKey {
        CacheKey::from_parts("GET", url)
    }

    fn store(dir: &TempDir) -> FileStore {
        FileStore::new(dir.path().to_path_buf(), true)
    }

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let k = key("https://example.com/a.html");
        let body = Bytes::from_static(b"<html>hello</html>");
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("text/html"),
        );
        let meta = CacheMetadata::new(StatusCode::OK, &headers, body.len() as u64);

        store
            .put("static-v1", k.clone(), body.clone(), meta)
            .await
            .unwrap();

        let (res_body, res_meta, status) =
            store.get("static-v1", &k).await.unwrap().expect("entry stored");
        assert_eq!(res_body, body);
        assert_eq!(res_meta.status_code(), StatusCode::OK);
        assert_eq!(
            res_meta.header_map().get(reqwest::header::CONTENT_TYPE).unwrap(),
            "text/html"
        );
        assert_eq!(status, CacheStatus::Hit);
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let result = store.get("static-v1", &key("https://example.com/none")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_sidecar_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let k = key("https://example.com/broken");
        let body = Bytes::from_static(b"data");
        let meta = CacheMetadata::new(StatusCode::OK, &HeaderMap::new(), body.len() as u64);
        store.put("static-v1", k.clone(), body, meta).await.unwrap();

        // Clobber the sidecar
        let meta_path = store.meta_path("static-v1", &k);
        fs::write(&meta_path, b"not json").await.unwrap();

        let result = store.get("static-v1", &k).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_reported_stale() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let k = key("https://example.com/api/old");
        let body = Bytes::from_static(b"{}");
        let mut meta = CacheMetadata::new(StatusCode::OK, &HeaderMap::new(), body.len() as u64)
            .with_expiration(Duration::from_secs(1));
        meta.cached_at = meta.cached_at.saturating_sub(100);
        meta.expires_at = Some(meta.cached_at + 1);

        store.put("dynamic-v1", k.clone(), body.clone(), meta).await.unwrap();

        let (res_body, _, status) =
            store.get("dynamic-v1", &k).await.unwrap().expect("stale entry kept");
        assert_eq!(res_body, body);
        assert_eq!(status, CacheStatus::Expired);
    }

    #[tokio::test]
    async fn test_open_list_delete_partitions() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.open("static-v2").await.unwrap();
        store.open("static-v3").await.unwrap();
        store.open("dynamic-v3").await.unwrap();

        let mut listed = store.list().await.unwrap();
        listed.sort();
        assert_eq!(listed, vec!["dynamic-v3", "static-v2", "static-v3"]);

        assert!(store.delete("static-v2").await.unwrap());
        assert!(!store.delete("static-v2").await.unwrap());

        let mut listed = store.list().await.unwrap();
        listed.sort();
        assert_eq!(listed, vec!["dynamic-v3", "static-v3"]);
    }

    #[tokio::test]
    async fn test_delete_removes_entries() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let k = key("https://example.com/gone");
        let body = Bytes::from_static(b"bye");
        let meta = CacheMetadata::new(StatusCode::OK, &HeaderMap::new(), body.len() as u64);
        store.put("static-v1", k.clone(), body, meta).await.unwrap();

        assert!(store.delete("static-v1").await.unwrap());
        assert!(!store.contains("static-v1", &k).await.unwrap());
        assert!(store.get("static-v1", &k).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_disabled_store_is_inert() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().to_path_buf(), false);

        let k = key("https://example.com/x");
        let body = Bytes::from_static(b"x");
        let meta = CacheMetadata::new(StatusCode::OK, &HeaderMap::new(), 1);

        store.put("static-v1", k.clone(), body, meta).await.unwrap();
        assert!(store.get("static-v1", &k).await.unwrap().is_none());
        assert!(store.list().await.unwrap().is_empty());
        assert!(!store.delete("static-v1").await.unwrap());
    }
}
